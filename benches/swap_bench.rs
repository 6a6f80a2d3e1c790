use clmm_replay::{Address, ConfigurableCorePool, CorePool, FeeAmount, I256, PoolConfig, Q96, U256};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn pool(ranges: i32) -> CorePool {
    let mut pool = CorePool::new(PoolConfig::new(
        Address::with_last_byte(1),
        Address::with_last_byte(2),
        FeeAmount::Medium,
    ));
    pool.initialize(Q96).unwrap();
    for i in 1..=ranges {
        pool.mint(
            Address::with_last_byte((i % 200) as u8),
            -60 * i,
            60 * i,
            1_000_000_000_000_000_000,
        )
        .unwrap();
    }
    pool
}

fn bench_swap(c: &mut Criterion) {
    let pool = pool(100);
    let small = I256::from_raw(U256::from(1_000_000u64));
    // enough to cross most of the ranges
    let large = I256::from_raw(U256::from(10u64).pow(U256::from(20)));

    c.bench_function("query_swap_within_range", |b| {
        b.iter(|| pool.query_swap(true, black_box(small), None).unwrap())
    });
    c.bench_function("query_swap_crossing_ticks", |b| {
        b.iter(|| pool.query_swap(true, black_box(large), None).unwrap())
    });
    c.bench_function("swap_crossing_ticks", |b| {
        b.iter_batched(
            || pool.clone(),
            |mut pool| pool.swap(true, black_box(large), None).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_history(c: &mut Criterion) {
    let config = PoolConfig::new(
        Address::with_last_byte(1),
        Address::with_last_byte(2),
        FeeAmount::Medium,
    );
    let mut recorded = ConfigurableCorePool::new(config);
    recorded.initialize(Q96).unwrap();
    recorded
        .mint(Address::with_last_byte(9), -6000, 6000, 1_000_000_000_000_000_000)
        .unwrap();
    for i in 0..200u64 {
        let amount = I256::from_raw(U256::from(1_000_000_000 + i));
        recorded.swap(i % 2 == 0, amount, None).unwrap();
    }

    c.bench_function("step_back_replay_200", |b| {
        b.iter(|| black_box(recorded.state().rebuild().unwrap()))
    });
    c.bench_function("fork", |b| b.iter(|| black_box(recorded.fork())));
}

criterion_group!(swap_benches, bench_swap, bench_history);
criterion_main!(swap_benches);
