//! Per-asset pricing configuration.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::SymbolHash;

/// Where an asset's published price comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// A fixed amount of the native asset (`fixed_price` scaled 1e18).
    FixedEth,
    /// A fixed USD price (`fixed_price` scaled 1e6).
    FixedUsd,
    /// Signed reporter prices, bounded by the exchange TWAP.
    Reporter,
}

/// Immutable pricing configuration for one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Key used by the lending protocol (e.g. the receipt-token address).
    pub asset: Address,
    /// Address of the priced asset itself.
    pub underlying: Address,
    /// Keccak-256 of the uppercase ticker.
    pub symbol_hash: SymbolHash,
    /// Native fixed-point scale of the underlying, e.g. `10^18`.
    pub base_unit: U256,
    pub price_source: PriceSource,
    /// Meaning depends on `price_source`; ignored for [`PriceSource::Reporter`].
    pub fixed_price: U256,
    /// Exchange pair anchoring reporter prices. Only set for reporter assets.
    pub market: Option<Address>,
    /// Selects the pair's second cumulative counter instead of the first.
    pub market_reversed: bool,
}

impl TokenConfig {
    /// Whether this asset's price is posted by the reporter.
    pub fn is_reported(&self) -> bool {
        self.price_source == PriceSource::Reporter
    }
}
