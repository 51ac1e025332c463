//! Anchor tolerance check.
//!
//! A reporter price `p` is accepted against anchor `a` when
//! `lower <= p * 1e18 / a <= upper`, with `upper = 1e18 + tolerance`
//! (saturating) and `lower = 1e18 - tolerance`, floored at 1.

use alloy_primitives::U256;
use pricefeed_types::EXP_SCALE;
use serde::{Deserialize, Serialize};

/// Inclusive ratio bounds, as 18-decimal mantissas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorBounds {
    lower: U256,
    upper: U256,
}

impl AnchorBounds {
    /// Bounds for a tolerance mantissa (`1e17` is 10 %).
    pub fn from_tolerance(tolerance: U256) -> Self {
        let one = U256::from(EXP_SCALE);
        let upper = one.saturating_add(tolerance);
        let lower = if tolerance < one {
            one - tolerance
        } else {
            U256::from(1u8)
        };
        Self { lower, upper }
    }

    pub fn lower(&self) -> U256 {
        self.lower
    }

    pub fn upper(&self) -> U256 {
        self.upper
    }

    /// `reporter * 1e18 / anchor`, or `None` when the anchor is zero.
    pub fn ratio(reporter: u64, anchor: u64) -> Option<U256> {
        if anchor == 0 {
            return None;
        }
        Some(U256::from(reporter) * U256::from(EXP_SCALE) / U256::from(anchor))
    }

    /// Whether `reporter` lies within tolerance of `anchor`.
    pub fn contains(&self, reporter: u64, anchor: u64) -> bool {
        Self::ratio(reporter, anchor)
            .map(|ratio| ratio >= self.lower && ratio <= self.upper)
            .unwrap_or(false)
    }
}
