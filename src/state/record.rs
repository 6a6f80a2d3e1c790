use crate::error::Error;
use crate::pool::core_pool::{CorePool, TokenAmounts};
use alloy_primitives::{Address, I256, U256};

/// A pool operation with its inputs, enough to apply it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Initialize {
        sqrt_price_x96: U256,
    },
    Mint {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    },
    Burn {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    },
    Collect {
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_requested: u128,
        amount_1_requested: u128,
    },
    Swap {
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    },
    /// Start of a branch; leaves the pool untouched.
    Fork {
        parent_id: String,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Initialize { .. } => "initialize",
            Action::Mint { .. } => "mint",
            Action::Burn { .. } => "burn",
            Action::Collect { .. } => "collect",
            Action::Swap { .. } => "swap",
            Action::Fork { .. } => "fork",
        }
    }

    /// Applies the action to `pool` and returns the signed token deltas
    /// from the pool's point of view.
    pub fn apply(&self, pool: &mut CorePool) -> Result<(I256, I256), Error> {
        match *self {
            Action::Initialize { sqrt_price_x96 } => {
                pool.initialize(sqrt_price_x96)?;
                Ok((I256::ZERO, I256::ZERO))
            }
            Action::Mint {
                owner,
                tick_lower,
                tick_upper,
                amount,
            } => {
                let amounts = pool.mint(owner, tick_lower, tick_upper, amount)?;
                Ok(inflow(amounts))
            }
            Action::Burn {
                owner,
                tick_lower,
                tick_upper,
                amount,
            } => {
                let amounts = pool.burn(owner, tick_lower, tick_upper, amount)?;
                Ok(outflow(amounts))
            }
            Action::Collect {
                owner,
                tick_lower,
                tick_upper,
                amount_0_requested,
                amount_1_requested,
            } => {
                let amounts = pool.collect(
                    owner,
                    tick_lower,
                    tick_upper,
                    amount_0_requested,
                    amount_1_requested,
                )?;
                Ok(outflow(amounts))
            }
            Action::Swap {
                zero_for_one,
                amount_specified,
                sqrt_price_limit_x96,
            } => {
                let result = pool.swap(zero_for_one, amount_specified, sqrt_price_limit_x96)?;
                Ok((result.amount0, result.amount1))
            }
            Action::Fork { .. } => Ok((I256::ZERO, I256::ZERO)),
        }
    }
}

pub(crate) fn inflow(amounts: TokenAmounts) -> (I256, I256) {
    (
        I256::from_raw(amounts.amount0),
        I256::from_raw(amounts.amount1),
    )
}

pub(crate) fn outflow(amounts: TokenAmounts) -> (I256, I256) {
    (
        -I256::from_raw(amounts.amount0),
        -I256::from_raw(amounts.amount1),
    )
}

/// An applied action and its outcome. `id` is the id of the state the
/// action produced.
///
/// Amounts are signed from the pool's point of view: mints and swap
/// inputs are positive, burns, collects and swap outputs negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub action: Action,
    pub amount0: I256,
    pub amount1: I256,
    pub timestamp: u64,
}

/// Edge of the state tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub source_id: String,
    pub record: Record,
}

impl Transition {
    #[inline]
    pub fn target_id(&self) -> &str {
        &self.record.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::core_pool::tests::{config, initialized_pool, owner};

    #[test]
    fn replaying_actions_reproduces_the_pool() {
        let actions = [
            Action::Mint {
                owner: owner(),
                tick_lower: -600,
                tick_upper: 600,
                amount: 1_000_000_000,
            },
            Action::Swap {
                zero_for_one: true,
                amount_specified: I256::from_raw(U256::from(10_000u64)),
                sqrt_price_limit_x96: None,
            },
            Action::Burn {
                owner: owner(),
                tick_lower: -600,
                tick_upper: 600,
                amount: 400_000_000,
            },
            Action::Collect {
                owner: owner(),
                tick_lower: -600,
                tick_upper: 600,
                amount_0_requested: u128::MAX,
                amount_1_requested: 5,
            },
        ];

        let mut first = initialized_pool();
        let mut second = initialized_pool();
        for action in &actions {
            let a = action.apply(&mut first).unwrap();
            let b = action.apply(&mut second).unwrap();
            assert_eq!(a, b);
        }
        assert_eq!(first, second);
    }

    #[test]
    fn deltas_are_signed_from_pool_view() {
        let mut pool = CorePool::new(config());
        Action::Initialize {
            sqrt_price_x96: crate::Q96,
        }
        .apply(&mut pool)
        .unwrap();

        let (minted0, minted1) = Action::Mint {
            owner: owner(),
            tick_lower: -60,
            tick_upper: 60,
            amount: 1_000_000,
        }
        .apply(&mut pool)
        .unwrap();
        assert!(minted0.is_positive() && minted1.is_positive());

        let (burned0, burned1) = Action::Burn {
            owner: owner(),
            tick_lower: -60,
            tick_upper: 60,
            amount: 1_000_000,
        }
        .apply(&mut pool)
        .unwrap();
        assert!(burned0.is_negative() && burned1.is_negative());

        let fork = Action::Fork {
            parent_id: "root".into(),
        };
        assert_eq!(fork.apply(&mut pool).unwrap(), (I256::ZERO, I256::ZERO));
        assert_eq!(fork.name(), "fork");
    }
}
