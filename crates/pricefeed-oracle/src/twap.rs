//! TWAP (Time-Weighted Average Price) calculation.
//!
//! The exchange accumulates `price * seconds` into a UQ112x112 counter, so
//! the average over a window is
//!
//! ```text
//! average = (counter_now - counter_then) / (t_now - t_then)
//! ```
//!
//! with both differences taken modulo their width (2^256 for counters, 2^32
//! for time). The average is then decoded to an 18-decimal mantissa and
//! rescaled to a 6-decimal USD anchor.

use alloy_primitives::U256;
use pricefeed_types::observation::Observation;
use pricefeed_types::{EXP_SCALE, RESOLUTION};

use crate::{OracleError, Result};

/// Width of a UQ112x112 value.
const UQ112X112_BITS: usize = 224;

/// Average UQ112x112 price between `old` and `current`.
///
/// # Errors
///
/// - [`OracleError::EmptyWindow`] if both observations share a timestamp
///
/// # Examples
///
/// ```
/// use alloy_primitives::U256;
/// use pricefeed_oracle::twap::average_price;
/// use pricefeed_types::observation::Observation;
///
/// let old = Observation::new(1_000, U256::from(0u64));
/// let current = Observation::new(1_010, U256::from(300u64));
/// assert_eq!(average_price(&old, &current).unwrap(), U256::from(30u64));
/// ```
pub fn average_price(old: &Observation, current: &Observation) -> Result<U256> {
    let elapsed = current.timestamp.wrapping_sub(old.timestamp);
    if elapsed == 0 {
        return Err(OracleError::EmptyWindow);
    }
    let delta = current.accumulator.wrapping_sub(old.accumulator);
    let average = delta / U256::from(elapsed);
    Ok(average & uq_mask())
}

/// Decode a UQ112x112 value to an 18-decimal mantissa, exactly:
/// `whole * 1e18 + (fraction * 1e18) >> 112`.
pub fn decode_with_18(value: U256) -> U256 {
    let value = value & uq_mask();
    let whole = value >> RESOLUTION;
    let fraction = value & ((U256::from(1u8) << RESOLUTION) - U256::from(1u8));
    let scale = U256::from(EXP_SCALE);
    whole * scale + ((fraction * scale) >> RESOLUTION)
}

/// Rescale an 18-decimal exchange rate to a 6-decimal USD anchor:
///
/// ```text
/// anchor = rate * conversion * base_unit / counter_unit / 1e18
/// ```
///
/// `conversion` is the USD value (6 decimals) of one whole counter asset and
/// `counter_unit` its base unit.
///
/// # Errors
///
/// - [`OracleError::Overflow`] if an intermediate product or the result
///   does not fit
/// - [`OracleError::InvalidBaseUnit`] if `counter_unit` is zero
pub fn anchor_price(
    rate: U256,
    conversion: U256,
    base_unit: U256,
    counter_unit: U256,
) -> Result<u64> {
    if counter_unit.is_zero() {
        return Err(OracleError::InvalidBaseUnit);
    }
    let scaled = rate
        .checked_mul(conversion)
        .and_then(|v| v.checked_mul(base_unit))
        .ok_or(OracleError::Overflow)?;
    let anchor = scaled / counter_unit / U256::from(EXP_SCALE);
    u64::try_from(anchor).map_err(|_| OracleError::Overflow)
}

fn uq_mask() -> U256 {
    U256::MAX >> (256 - UQ112X112_BITS)
}
