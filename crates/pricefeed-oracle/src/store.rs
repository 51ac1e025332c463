//! Replay-resistant checkpoint of signed price reports.
//!
//! Each `(signer, symbol)` pair keeps only its latest report. A report
//! replaces the stored one when its timestamp is strictly newer and not in
//! the future; anything else is a no-op observed as
//! [`OracleEvent::UpdateFailed`]. Malformed signatures or messages are
//! errors and never reach storage.

use std::collections::HashMap;

use alloy_primitives::Address;
use pricefeed_crypto::{keccak, secp256k1};
use pricefeed_types::events::OracleEvent;
use pricefeed_types::{SignedRecord, SymbolHash};

use crate::message::decode_price_message;
use crate::Result;

/// A price report whose signer has been recovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedReport {
    pub signer: Address,
    /// Uppercased symbol.
    pub symbol: String,
    pub symbol_hash: SymbolHash,
    pub timestamp: u64,
    pub value: u64,
}

impl SignedReport {
    /// Recover the signer of `message` and decode it.
    ///
    /// # Errors
    ///
    /// - [`OracleError::Crypto`](crate::OracleError::Crypto) if the signature is malformed
    /// - [`OracleError::MalformedMessage`](crate::OracleError::MalformedMessage) or
    ///   [`OracleError::InvalidMessageKind`](crate::OracleError::InvalidMessageKind)
    ///   if the message does not decode as a price report
    pub fn verify(message: &[u8], signature: &[u8]) -> Result<Self> {
        let signer = secp256k1::recover_signer(message, signature)?;
        let decoded = decode_price_message(message)?;
        let symbol = decoded.symbol.to_uppercase();
        Ok(Self {
            signer,
            symbol_hash: keccak::symbol_hash(&symbol),
            symbol,
            timestamp: decoded.timestamp,
            value: decoded.value,
        })
    }
}

/// Result of applying one report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOutcome {
    pub accepted: bool,
    /// `Updated` when accepted, `UpdateFailed` otherwise.
    pub event: OracleEvent,
}

/// Latest signed value per `(signer, symbol)`.
#[derive(Clone, Debug, Default)]
pub struct SignedPriceStore {
    records: HashMap<(Address, SymbolHash), SignedRecord>,
}

impl SignedPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify and apply one signed message.
    pub fn put(&mut self, message: &[u8], signature: &[u8], now: u64) -> Result<PutOutcome> {
        let report = SignedReport::verify(message, signature)?;
        Ok(self.apply(&report, now))
    }

    /// Apply an already verified report.
    pub fn apply(&mut self, report: &SignedReport, now: u64) -> PutOutcome {
        let key = (report.signer, report.symbol_hash);
        let prior = self.records.get(&key).copied().unwrap_or_default();

        if report.timestamp > prior.timestamp && report.timestamp <= now {
            self.records.insert(
                key,
                SignedRecord {
                    timestamp: report.timestamp,
                    value: report.value,
                },
            );
            tracing::debug!(
                signer = %report.signer,
                symbol = %report.symbol,
                timestamp = report.timestamp,
                value = report.value,
                "signed price stored"
            );
            PutOutcome {
                accepted: true,
                event: OracleEvent::Updated {
                    signer: report.signer,
                    symbol: report.symbol.clone(),
                    timestamp: report.timestamp,
                    value: report.value,
                },
            }
        } else {
            tracing::warn!(
                signer = %report.signer,
                symbol = %report.symbol,
                prior = prior.timestamp,
                timestamp = report.timestamp,
                now,
                "signed price not written"
            );
            PutOutcome {
                accepted: false,
                event: OracleEvent::UpdateFailed {
                    signer: report.signer,
                    symbol: report.symbol.clone(),
                    prior_timestamp: prior.timestamp,
                    message_timestamp: report.timestamp,
                    current_time: now,
                },
            }
        }
    }

    /// Stored record for `signer` and `symbol`, `(0, 0)` if none.
    pub fn get(&self, signer: &Address, symbol: &str) -> SignedRecord {
        self.get_by_hash(signer, &keccak::symbol_hash(symbol))
    }

    pub fn get_by_hash(&self, signer: &Address, symbol_hash: &SymbolHash) -> SignedRecord {
        self.records
            .get(&(*signer, *symbol_hash))
            .copied()
            .unwrap_or_default()
    }

    /// Stored value for `signer` and `symbol`, 0 if none.
    pub fn price(&self, signer: &Address, symbol: &str) -> u64 {
        self.get(signer, symbol).value
    }
}
