//! Observable outcomes of oracle calls.
//!
//! Business-rule rejections (stale or future reports, prices outside the
//! anchor bounds) never fail a call; they surface here instead. Callers
//! receive the events of a call in emission order.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::SymbolHash;

/// Every event the oracle can emit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OracleEvent {
    /// A signed report was checkpointed.
    Updated {
        signer: Address,
        symbol: String,
        timestamp: u64,
        value: u64,
    },
    /// A signed report was older than the stored one or from the future.
    UpdateFailed {
        signer: Address,
        symbol: String,
        prior_timestamp: u64,
        message_timestamp: u64,
        current_time: u64,
    },
    /// An observation window rotated.
    WindowUpdated {
        symbol_hash: SymbolHash,
        old_timestamp: u32,
        new_timestamp: u32,
        old_accumulator: U256,
        new_accumulator: U256,
    },
    /// An anchor price was computed over `[old_timestamp, new_timestamp]`.
    AnchorPriceUpdated {
        symbol: String,
        anchor_price: u64,
        old_timestamp: u32,
        new_timestamp: u32,
    },
    /// A price was published.
    PriceUpdated { symbol: String, price: u64 },
    /// A reporter price fell outside the anchor bounds and was not published.
    PriceGuarded {
        symbol: String,
        reporter: u64,
        anchor: u64,
    },
    /// The reporter key was permanently invalidated.
    ReporterInvalidated { reporter: Address },
}

/// What happened to one symbol of a posted batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntryOutcome {
    /// The price was published (reporter value, or anchor once invalidated).
    Published { symbol: String, price: u64 },
    /// The reporter value was outside the anchor bounds.
    Guarded {
        symbol: String,
        reporter: u64,
        anchor: u64,
    },
    /// No fresh report from the trusted reporter for this symbol.
    Ignored { symbol: String },
    /// The anchor could not be computed (zero-width window, overflow,
    /// unreadable market). Nothing was published.
    AnchorUnavailable { symbol: String },
}

impl EntryOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Published { symbol, .. }
            | Self::Guarded { symbol, .. }
            | Self::Ignored { symbol }
            | Self::AnchorUnavailable { symbol } => symbol,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = OracleEvent::PriceGuarded {
            symbol: "ETH".to_string(),
            reporter: 100_000_000,
            anchor: 89_900_000,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["event"], "price_guarded");
        assert_eq!(value["anchor"], 89_900_000);
    }

    #[test]
    fn test_outcome_symbol() {
        let outcome = EntryOutcome::Ignored {
            symbol: "BTC".to_string(),
        };
        assert_eq!(outcome.symbol(), "BTC");
        assert!(!outcome.is_published());
    }
}
