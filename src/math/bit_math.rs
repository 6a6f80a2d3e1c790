use crate::error::MathError;
use alloy_primitives::U256;

/// Returns the index (0–255) of the most significant set bit in a `U256`,
/// or `MathError::ZeroValue` if the input is zero.
///
/// The tick logarithm uses this to normalize the ratio before squaring.
pub fn most_significant_bit(x: U256) -> Result<u8, MathError> {
    if x.is_zero() {
        return Err(MathError::ZeroValue);
    }
    Ok(255 - x.leading_zeros() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_errors_on_zero() {
        let res = most_significant_bit(U256::ZERO);
        assert!(matches!(res, Err(MathError::ZeroValue)));
    }

    #[test]
    fn msb_of_power_of_two() {
        let x = U256::from(1u64 << 7);
        assert_eq!(most_significant_bit(x).unwrap(), 7);
    }

    #[test]
    fn msb_of_multiple_bits() {
        // binary: 1001_0100
        let x = U256::from(0b1001_0100u64);
        assert_eq!(most_significant_bit(x).unwrap(), 7);
    }

    #[test]
    fn msb_of_q96_and_max() {
        assert_eq!(most_significant_bit(crate::Q96).unwrap(), 96);
        assert_eq!(most_significant_bit(U256::MAX).unwrap(), 255);
    }
}
