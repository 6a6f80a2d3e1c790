use clmm_replay::math::{
    bit_math, math_helpers, sqrt_price_math, swap_math,
    tick_math::{self, MAX_TICK, MIN_TICK},
};
use clmm_replay::{I256, U256};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_tick_math(c: &mut Criterion) {
    let ticks: Vec<i32> = (MIN_TICK..=MAX_TICK).step_by(7919).collect();
    let prices: Vec<U256> = ticks
        .iter()
        .map(|&t| tick_math::get_sqrt_ratio_at_tick(t).unwrap())
        .collect();

    c.bench_function("get_sqrt_ratio_at_tick", |b| {
        b.iter(|| {
            for &tick in &ticks {
                black_box(tick_math::get_sqrt_ratio_at_tick(black_box(tick)).unwrap());
            }
        })
    });
    c.bench_function("get_tick_at_sqrt_ratio", |b| {
        b.iter(|| {
            for &price in &prices {
                black_box(tick_math::get_tick_at_sqrt_ratio(black_box(price)).unwrap());
            }
        })
    });
}

fn bench_sqrt_price_math(c: &mut Criterion) {
    let price = tick_math::get_sqrt_ratio_at_tick(-1200).unwrap();
    let target = tick_math::get_sqrt_ratio_at_tick(1200).unwrap();
    let liquidity = 1_000_000_000_000_000_000u128;
    let amount = U256::from(1_000_000_000_000_000u64);

    c.bench_function("get_next_sqrt_price_from_input", |b| {
        b.iter(|| {
            sqrt_price_math::get_next_sqrt_price_from_input(
                black_box(price),
                black_box(liquidity),
                black_box(amount),
                true,
            )
            .unwrap()
        })
    });
    c.bench_function("get_amount_0_delta", |b| {
        b.iter(|| {
            sqrt_price_math::get_amount_0_delta(
                black_box(price),
                black_box(target),
                black_box(liquidity as i128),
            )
            .unwrap()
        })
    });
}

fn bench_swap_step(c: &mut Criterion) {
    let current = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
    let target = tick_math::get_sqrt_ratio_at_tick(-600).unwrap();
    let remaining = I256::from_raw(U256::from(1_000_000_000_000_000u64));

    c.bench_function("compute_swap_step", |b| {
        b.iter(|| {
            swap_math::compute_swap_step(
                black_box(current),
                black_box(target),
                black_box(1_000_000_000_000_000_000u128),
                black_box(remaining),
                3000,
            )
            .unwrap()
        })
    });
}

fn bench_helpers(c: &mut Criterion) {
    let a = U256::MAX >> 1;
    let b = U256::from(3_000_000_007u64);
    let d = U256::from(997_000_000_003u64);

    c.bench_function("mul_div_rounding_up", |bench| {
        bench.iter(|| {
            math_helpers::mul_div_rounding_up(black_box(a), black_box(b), black_box(d)).unwrap()
        })
    });
    c.bench_function("most_significant_bit", |bench| {
        bench.iter(|| bit_math::most_significant_bit(black_box(a)).unwrap())
    });
}

criterion_group!(
    math_benches,
    bench_tick_math,
    bench_sqrt_price_math,
    bench_swap_step,
    bench_helpers,
);
criterion_main!(math_benches);
