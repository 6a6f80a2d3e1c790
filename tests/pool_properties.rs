use clmm_replay::math::tick_math::{MAX_SQRT_RATIO, MIN_SQRT_RATIO, get_tick_at_sqrt_ratio};
use clmm_replay::{Address, ConfigurableCorePool, CorePool, FeeAmount, I256, PoolConfig, Q96, U256};
use proptest::prelude::*;

const SPACING: i32 = 60;

#[derive(Debug, Clone)]
enum Op {
    Mint {
        owner: u8,
        lower: i32,
        width: i32,
        amount: u128,
    },
    Burn {
        owner: u8,
        lower: i32,
        width: i32,
        percent: u8,
    },
    Swap {
        zero_for_one: bool,
        amount: u64,
        exact_input: bool,
    },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3, -40i32..40, 1i32..20, 1u128..1_000_000_000_000_000_000_000).prop_map(
            |(owner, lower, width, amount)| Op::Mint {
                owner,
                lower,
                width,
                amount,
            }
        ),
        (0u8..3, -40i32..40, 1i32..20, 0u8..=100).prop_map(|(owner, lower, width, percent)| {
            Op::Burn {
                owner,
                lower,
                width,
                percent,
            }
        }),
        (any::<bool>(), 1u64..1_000_000_000_000_000_000, any::<bool>()).prop_map(
            |(zero_for_one, amount, exact_input)| Op::Swap {
                zero_for_one,
                amount,
                exact_input,
            }
        ),
    ]
}

fn config() -> PoolConfig {
    PoolConfig::new(
        Address::with_last_byte(1),
        Address::with_last_byte(2),
        FeeAmount::Medium,
    )
}

fn range(lower: i32, width: i32) -> (i32, i32) {
    (lower * SPACING, (lower + width) * SPACING)
}

fn swap_amount(amount: u64, exact_input: bool) -> I256 {
    let amount = I256::from_raw(U256::from(amount));
    if exact_input { amount } else { -amount }
}

// Applies `op` to a plain pool. Returns false when the op was skipped or
// rejected, in which case the pool must be untouched.
fn apply(pool: &mut CorePool, op: &Op) -> bool {
    match *op {
        Op::Mint {
            owner,
            lower,
            width,
            amount,
        } => {
            let (lower, upper) = range(lower, width);
            pool.mint(Address::with_last_byte(owner), lower, upper, amount)
                .is_ok()
        }
        Op::Burn {
            owner,
            lower,
            width,
            percent,
        } => {
            let (lower, upper) = range(lower, width);
            let owner = Address::with_last_byte(owner);
            let Some(liquidity) = pool
                .get_position(owner, lower, upper)
                .map(|p| p.liquidity)
                .filter(|&l| l > 0)
            else {
                return false;
            };
            let amount = liquidity / 100 * percent as u128;
            pool.burn(owner, lower, upper, amount).is_ok()
        }
        Op::Swap {
            zero_for_one,
            amount,
            exact_input,
        } => pool
            .swap(zero_for_one, swap_amount(amount, exact_input), None)
            .is_ok(),
    }
}

fn apply_recorded(pool: &mut ConfigurableCorePool, op: &Op) -> bool {
    match *op {
        Op::Mint {
            owner,
            lower,
            width,
            amount,
        } => {
            let (lower, upper) = range(lower, width);
            pool.mint(Address::with_last_byte(owner), lower, upper, amount)
                .is_ok()
        }
        Op::Burn {
            owner,
            lower,
            width,
            percent,
        } => {
            let (lower, upper) = range(lower, width);
            let owner = Address::with_last_byte(owner);
            let Some(liquidity) = pool
                .core()
                .get_position(owner, lower, upper)
                .map(|p| p.liquidity)
                .filter(|&l| l > 0)
            else {
                return false;
            };
            pool.burn(owner, lower, upper, liquidity / 100 * percent as u128)
                .is_ok()
        }
        Op::Swap {
            zero_for_one,
            amount,
            exact_input,
        } => pool
            .swap(zero_for_one, swap_amount(amount, exact_input), None)
            .is_ok(),
    }
}

fn active_liquidity(pool: &CorePool) -> i128 {
    pool.ticks()
        .iter()
        .filter(|&(&tick, _)| tick <= pool.tick_current())
        .map(|(_, info)| info.liquidity_net)
        .sum()
}

fn initialized() -> CorePool {
    let mut pool = CorePool::new(config());
    pool.initialize(Q96).unwrap();
    pool
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tick_and_liquidity_invariants_hold(ops in prop::collection::vec(op(), 1..40)) {
        let mut pool = initialized();
        for op in &ops {
            let before = pool.clone();
            if !apply(&mut pool, op) {
                prop_assert_eq!(&pool, &before);
            }

            prop_assert_eq!(pool.ticks().liquidity_net_sum(), 0);
            prop_assert_eq!(active_liquidity(&pool), pool.liquidity() as i128);

            let price = pool.sqrt_price_x96();
            prop_assert!(price >= MIN_SQRT_RATIO && price < MAX_SQRT_RATIO);
            let tick = get_tick_at_sqrt_ratio(price).unwrap();
            prop_assert!(pool.tick_current() == tick || pool.tick_current() == tick - 1);

            for (_, info) in pool.ticks().iter() {
                prop_assert!(info.liquidity_gross > 0);
            }
            for (_, position) in pool.positions().iter() {
                prop_assert!(!position.is_empty());
            }
        }
    }

    #[test]
    fn swaps_move_price_in_their_direction(
        mints in prop::collection::vec(op(), 1..10),
        zero_for_one in any::<bool>(),
        amount in 1u64..1_000_000_000_000_000_000,
        exact_input in any::<bool>(),
    ) {
        let mut pool = initialized();
        for op in mints.iter().filter(|op| matches!(op, Op::Mint { .. })) {
            apply(&mut pool, op);
        }

        let before = pool.sqrt_price_x96();
        let quoted = pool.query_swap(zero_for_one, swap_amount(amount, exact_input), None);
        let swapped = pool.swap(zero_for_one, swap_amount(amount, exact_input), None);
        prop_assert_eq!(&quoted, &swapped);

        if let Ok(result) = swapped {
            let (paid, received) = if zero_for_one {
                (result.amount0, result.amount1)
            } else {
                (result.amount1, result.amount0)
            };
            prop_assert!(!paid.is_negative());
            prop_assert!(!received.is_positive());
            if zero_for_one {
                prop_assert!(result.sqrt_price_x96 <= before);
            } else {
                prop_assert!(result.sqrt_price_x96 >= before);
            }
            prop_assert_eq!(result.sqrt_price_x96, pool.sqrt_price_x96());
        }
    }

    #[test]
    fn step_back_undoes_any_operation(ops in prop::collection::vec(op(), 1..20)) {
        let mut pool = ConfigurableCorePool::new(config());
        pool.initialize(Q96).unwrap();

        for (i, op) in ops.iter().enumerate() {
            if i % 5 == 4 {
                pool.take_snapshot("checkpoint");
            }
            let before = pool.core().clone();
            let mut expected = before.clone();
            if !apply(&mut expected, op) {
                prop_assert!(!apply_recorded(&mut pool, op));
                prop_assert_eq!(pool.core(), &before);
                continue;
            }

            prop_assert!(apply_recorded(&mut pool, op));
            prop_assert_eq!(pool.core(), &expected);

            pool.step_back().unwrap();
            prop_assert_eq!(pool.core(), &before);

            prop_assert!(apply_recorded(&mut pool, op));
            prop_assert_eq!(pool.core(), &expected);
        }
    }
}
