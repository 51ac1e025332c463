//! TOML configuration of an anchored price view.
//!
//! ```toml
//! reporter = "0xfceadafab14d46e20144f48824d0c09b1a03f2bc"
//! anchor_tolerance = 200000000000000000
//!
//! [[tokens]]
//! symbol = "ETH"
//! asset = "0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5"
//! base_unit = 1000000000000000000
//! market = "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc"
//! market_reversed = true
//! ```

use std::path::Path;

use alloy_primitives::{Address, U256};
use pricefeed_crypto::keccak;
use pricefeed_types::token::{PriceSource, TokenConfig};
use serde::{Deserialize, Serialize};

use crate::view::{ViewParams, DEFAULT_ANCHOR_PERIOD, DEFAULT_NATIVE_SYMBOL, DEFAULT_QUOTE_BASE_UNIT};
use crate::{OracleError, Result};

/// Oracle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSettings {
    /// The trusted reporter.
    pub reporter: Address,
    /// Allowed deviation from the anchor (1e17 = 10 %).
    #[serde(default = "default_anchor_tolerance")]
    pub anchor_tolerance: u128,
    /// Minimum seconds between window rotations.
    #[serde(default = "default_anchor_period")]
    pub anchor_period: u64,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    /// Base unit of the native asset's quote stablecoin.
    #[serde(default = "default_quote_base_unit")]
    pub quote_base_unit: u128,
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,
}

/// One configured asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSettings {
    pub symbol: String,
    #[serde(default)]
    pub asset: Address,
    #[serde(default)]
    pub underlying: Address,
    pub base_unit: u128,
    #[serde(default = "default_price_source")]
    pub price_source: PriceSource,
    /// USD (6 decimals) or native (18 decimals) amount; see [`PriceSource`].
    #[serde(default)]
    pub fixed_price: u128,
    /// Reference pair. Required for reporter assets.
    #[serde(default)]
    pub market: Option<Address>,
    #[serde(default)]
    pub market_reversed: bool,
}

// Default value functions

fn default_anchor_tolerance() -> u128 {
    200_000_000_000_000_000
}

fn default_anchor_period() -> u64 {
    DEFAULT_ANCHOR_PERIOD
}

fn default_native_symbol() -> String {
    DEFAULT_NATIVE_SYMBOL.to_string()
}

fn default_quote_base_unit() -> u128 {
    u128::from(DEFAULT_QUOTE_BASE_UNIT)
}

fn default_price_source() -> PriceSource {
    PriceSource::Reporter
}

impl OracleSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| OracleError::Settings(e.to_string()))
    }

    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| OracleError::Settings(format!("{}: {e}", path.display())))?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), tokens = settings.tokens.len(), "settings loaded");
        Ok(settings)
    }

    /// Token configs in file order. A zero market address counts as absent.
    pub fn token_configs(&self) -> Vec<TokenConfig> {
        self.tokens.iter().map(TokenSettings::to_config).collect()
    }

    pub fn view_params(&self) -> ViewParams {
        ViewParams {
            reporter: self.reporter,
            anchor_tolerance: U256::from(self.anchor_tolerance),
            anchor_period: self.anchor_period,
            native_symbol: self.native_symbol.clone(),
            quote_base_unit: U256::from(self.quote_base_unit),
        }
    }
}

impl TokenSettings {
    pub fn to_config(&self) -> TokenConfig {
        TokenConfig {
            asset: self.asset,
            underlying: self.underlying,
            symbol_hash: keccak::symbol_hash(&self.symbol),
            base_unit: U256::from(self.base_unit),
            price_source: self.price_source,
            fixed_price: U256::from(self.fixed_price),
            market: self.market.filter(|market| !market.is_zero()),
            market_reversed: self.market_reversed,
        }
    }
}
