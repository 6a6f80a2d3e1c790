use crate::error::PoolError;
use alloy_primitives::{Address, U160};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fee tiers enabled on the canonical factory, in hundredths of a bip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeAmount {
    Lowest,
    Low,
    Medium,
    High,
}

impl FeeAmount {
    #[inline]
    pub const fn pips(self) -> u32 {
        match self {
            FeeAmount::Lowest => 100,
            FeeAmount::Low => 500,
            FeeAmount::Medium => 3000,
            FeeAmount::High => 10000,
        }
    }

    #[inline]
    pub const fn tick_spacing(self) -> i32 {
        match self {
            FeeAmount::Lowest => 1,
            FeeAmount::Low => 10,
            FeeAmount::Medium => 60,
            FeeAmount::High => 200,
        }
    }

    pub fn from_pips(fee_pips: u32) -> Option<Self> {
        match fee_pips {
            100 => Some(FeeAmount::Lowest),
            500 => Some(FeeAmount::Low),
            3000 => Some(FeeAmount::Medium),
            10000 => Some(FeeAmount::High),
            _ => None,
        }
    }
}

/// Converts an `Address` into its `U160` numeric representation.
#[inline(always)]
pub fn address_to_u160(address: Address) -> U160 {
    address.into()
}

/// Returns the token pair sorted by numeric address, as used by Uniswap V3.
pub fn sort_tokens(token0: Address, token1: Address) -> (Address, Address) {
    if address_to_u160(token0) < address_to_u160(token1) {
        (token0, token1)
    } else {
        (token1, token0)
    }
}

/// Immutable parameters of a pool. Two pools with equal configs are the
/// same market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub token0: Address,
    pub token1: Address,
    pub fee_pips: u32,
    pub tick_spacing: i32,
}

impl PoolConfig {
    /// Builds the config of a standard fee tier, sorting the tokens.
    pub fn new(token_a: Address, token_b: Address, fee: FeeAmount) -> Self {
        let (token0, token1) = sort_tokens(token_a, token_b);
        Self {
            token0,
            token1,
            fee_pips: fee.pips(),
            tick_spacing: fee.tick_spacing(),
        }
    }

    /// Builds a config for a non-standard fee tier.
    pub fn with_spacing(
        token_a: Address,
        token_b: Address,
        fee_pips: u32,
        tick_spacing: i32,
    ) -> Result<Self, PoolError> {
        if fee_pips >= 1_000_000 {
            return Err(PoolError::InvalidConfig {
                reason: "fee must be below 1_000_000 pips",
            });
        }
        if !(1..16384).contains(&tick_spacing) {
            return Err(PoolError::InvalidConfig {
                reason: "tick spacing must be in [1, 16384)",
            });
        }
        if token_a == token_b {
            return Err(PoolError::InvalidConfig {
                reason: "tokens must differ",
            });
        }
        let (token0, token1) = sort_tokens(token_a, token_b);
        Ok(Self {
            token0,
            token1,
            fee_pips,
            tick_spacing,
        })
    }

    /// Stable identifier used to group snapshots of the same market.
    pub fn pool_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.token0, self.token1, self.fee_pips, self.tick_spacing
        )
    }
}
