use crate::error::MathError;
use alloy_primitives::U256;

const U256_ONE: U256 = U256::ONE;
const U256_TWO: U256 = U256::from_limbs([2, 0, 0, 0]);
const U256_THREE: U256 = U256::from_limbs([3, 0, 0, 0]);

#[cold]
#[inline(never)]
fn cold_path() {}

#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if !b {
        cold_path();
    }
    b
}

#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold_path();
    }
    b
}

/// Computes `a * b / denominator` with full 256‑bit precision,
/// returning a `MathError` on overflow or division by zero.
///
/// This mirrors the Solidity `FullMath.mulDiv` behavior and underpins
/// many of the higher‑level swap and liquidity calculations.
#[inline(always)]
pub fn mul_div(a: U256, b: U256, mut denominator: U256) -> Result<U256, MathError> {
    if unlikely(denominator.is_zero()) {
        return Err(MathError::DivisionByZero);
    }

    let mm = a.mul_mod(b, U256::MAX);
    let mut prod0 = a.wrapping_mul(b);

    let (mut prod1, borrow1) = mm.overflowing_sub(prod0);
    if borrow1 {
        prod1 = prod1.wrapping_sub(U256_ONE);
    }

    if likely(prod1.is_zero()) {
        return Ok(prod0.wrapping_div(denominator));
    }

    if unlikely(denominator <= prod1) {
        return Err(MathError::Overflow);
    }

    let remainder = a.mul_mod(b, denominator);
    let (prod0_new, borrow2) = prod0.overflowing_sub(remainder);
    prod0 = prod0_new;
    if borrow2 {
        prod1 = prod1.wrapping_sub(U256_ONE);
    }

    let twos = denominator & denominator.wrapping_neg();
    denominator = denominator.wrapping_div(twos);
    prod0 = prod0.wrapping_div(twos);

    let twos_adj = twos
        .wrapping_neg()
        .wrapping_div(twos)
        .wrapping_add(U256_ONE);
    prod0 |= prod1.wrapping_mul(twos_adj);

    let mut inv = U256_THREE.wrapping_mul(denominator) ^ U256_TWO;

    macro_rules! newton_iteration {
        () => {
            inv = inv.wrapping_mul(U256_TWO.wrapping_sub(denominator.wrapping_mul(inv)))
        };
    }

    newton_iteration!();
    newton_iteration!();
    newton_iteration!();
    newton_iteration!();
    newton_iteration!();
    newton_iteration!();

    Ok(prod0.wrapping_mul(inv))
}

/// Like [`mul_div`], but rounds the result up when there is a
/// non‑zero remainder, returning an overflow error if the result
/// would exceed `U256::MAX`.
#[inline(always)]
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    let mut result = mul_div(a, b, denominator)?;

    if a.mul_mod(b, denominator) > U256::ZERO {
        if result >= U256::MAX {
            return Err(MathError::Overflow);
        }
        result += U256::ONE;
    }
    Ok(result)
}

/// Divides `a` by `b`, rounding the result up to the next integer
/// when there is a non‑zero remainder.
///
/// This will panic on division by zero, mirroring primitive integer
/// division, so callers must ensure `b != 0`.
#[inline(always)]
pub fn div_rounding_up(a: U256, b: U256) -> U256 {
    let (quotient, remainder) = a.div_rem(b);
    if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::ONE
    }
}

/// `(a - b) mod 2^256`. Fee growth accumulators wrap instead of going
/// negative, exactly like unchecked `uint256` subtraction on chain.
#[inline(always)]
pub fn mod256_sub(a: U256, b: U256) -> U256 {
    a.wrapping_sub(b)
}

/// Truncates to the low 128 bits, the equivalent of a Solidity `uint128(x)` cast.
#[inline(always)]
pub fn low_u128(x: U256) -> u128 {
    let limbs = x.as_limbs();
    (limbs[0] as u128) | ((limbs[1] as u128) << 64)
}

/// Converts to `u128`, failing when any of the upper 128 bits are set.
#[inline(always)]
pub fn checked_u128(x: U256) -> Result<u128, MathError> {
    let limbs = x.as_limbs();
    if limbs[2] != 0 || limbs[3] != 0 {
        return Err(MathError::Overflow);
    }
    Ok(low_u128(x))
}
