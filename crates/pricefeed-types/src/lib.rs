//! # pricefeed-types
//!
//! Shared domain types for the anchored price feed workspace.
//!
//! Prices are carried as 6-decimal USD fixed point (`u64`), ratios and
//! decoded exchange rates as 18-decimal mantissas, and raw exchange
//! accumulators as `U256` UQ112x112 sums.
//!
//! ## Modules
//!
//! - [`token`]: Per-asset pricing configuration
//! - [`observation`]: Accumulator snapshots and the per-asset TWAP window
//! - [`events`]: Observable outcomes of oracle calls

pub mod events;
pub mod observation;
pub mod token;

pub use alloy_primitives::{Address, B256, U256};

/// Keccak-256 of the uppercase ticker; the canonical asset key.
pub type SymbolHash = B256;

/// Scale of published USD prices (6 decimals).
pub const PRICE_SCALE: u64 = 1_000_000;

/// Scale of ratio and rate mantissas (18 decimals).
pub const EXP_SCALE: u128 = 1_000_000_000_000_000_000;

/// Scale applied by `underlying_value`: `1e36 / PRICE_SCALE`.
pub const UNDERLYING_PRICE_SCALE: u128 = 1_000_000_000_000_000_000_000_000_000_000;

/// Fractional bits of the exchange's UQ112x112 price encoding.
pub const RESOLUTION: usize = 112;

/// Latest signed value stored for one `(signer, symbol)` pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SignedRecord {
    /// Seconds since the Unix epoch, as signed by the reporter.
    pub timestamp: u64,
    /// 6-decimal USD value.
    pub value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underlying_scale_is_exp36_over_price_scale() {
        assert_eq!(UNDERLYING_PRICE_SCALE * PRICE_SCALE as u128, EXP_SCALE * EXP_SCALE);
    }

    #[test]
    fn test_default_record_is_zero() {
        let record = SignedRecord::default();
        assert_eq!(record.timestamp, 0);
        assert_eq!(record.value, 0);
    }
}
