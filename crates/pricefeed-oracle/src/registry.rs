//! Immutable token configuration lookup.
//!
//! Configs are stored once in an arena and reached through four indices:
//! position, symbol hash, asset address and underlying address. Every index
//! resolves to the same arena slot, so all lookups of one logical entry
//! return the identical value.

use std::collections::HashMap;

use alloy_primitives::Address;
use pricefeed_crypto::keccak;
use pricefeed_types::token::TokenConfig;
use pricefeed_types::SymbolHash;

use crate::{OracleError, Result};

/// Configs fixed at construction, indexed four ways.
#[derive(Clone, Debug, Default)]
pub struct TokenConfigRegistry {
    configs: Vec<TokenConfig>,
    by_symbol_hash: HashMap<SymbolHash, usize>,
    by_asset: HashMap<Address, usize>,
    by_underlying: HashMap<Address, usize>,
}

impl TokenConfigRegistry {
    /// Build the registry.
    ///
    /// Assets and underlyings shared by several configs resolve to the first
    /// one. The zero address is never indexed.
    ///
    /// # Errors
    ///
    /// - [`OracleError::InvalidBaseUnit`] if any config has a zero base unit
    /// - [`OracleError::DuplicateSymbol`] if two configs share a symbol hash
    pub fn new(configs: Vec<TokenConfig>) -> Result<Self> {
        let mut by_symbol_hash = HashMap::with_capacity(configs.len());
        let mut by_asset = HashMap::with_capacity(configs.len());
        let mut by_underlying = HashMap::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            if config.base_unit.is_zero() {
                return Err(OracleError::InvalidBaseUnit);
            }
            if by_symbol_hash.insert(config.symbol_hash, index).is_some() {
                return Err(OracleError::DuplicateSymbol(config.symbol_hash));
            }
            if !config.asset.is_zero() {
                by_asset.entry(config.asset).or_insert(index);
            }
            if !config.underlying.is_zero() {
                by_underlying.entry(config.underlying).or_insert(index);
            }
        }

        Ok(Self {
            configs,
            by_symbol_hash,
            by_asset,
            by_underlying,
        })
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Configs in construction order.
    pub fn iter(&self) -> impl Iterator<Item = &TokenConfig> {
        self.configs.iter()
    }

    pub fn by_index(&self, index: usize) -> Result<&TokenConfig> {
        self.configs
            .get(index)
            .ok_or_else(|| OracleError::ConfigNotFound(format!("index {index}")))
    }

    pub fn by_symbol_hash(&self, symbol_hash: &SymbolHash) -> Result<&TokenConfig> {
        self.by_symbol_hash
            .get(symbol_hash)
            .map(|index| &self.configs[*index])
            .ok_or_else(|| OracleError::ConfigNotFound(format!("symbol hash {symbol_hash}")))
    }

    /// Look up by ticker, case-insensitively.
    pub fn by_symbol(&self, symbol: &str) -> Result<&TokenConfig> {
        self.by_symbol_hash
            .get(&keccak::symbol_hash(symbol))
            .map(|index| &self.configs[*index])
            .ok_or_else(|| OracleError::ConfigNotFound(symbol.to_uppercase()))
    }

    pub fn by_asset(&self, asset: &Address) -> Result<&TokenConfig> {
        self.by_asset
            .get(asset)
            .map(|index| &self.configs[*index])
            .ok_or_else(|| OracleError::ConfigNotFound(format!("asset {asset}")))
    }

    pub fn by_underlying(&self, underlying: &Address) -> Result<&TokenConfig> {
        self.by_underlying
            .get(underlying)
            .map(|index| &self.configs[*index])
            .ok_or_else(|| OracleError::ConfigNotFound(format!("underlying {underlying}")))
    }
}
