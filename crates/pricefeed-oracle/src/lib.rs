//! # pricefeed-oracle
//!
//! Anchored price feed: signed reporter prices, bounded by an exchange TWAP.
//!
//! A reporter signs `("prices", timestamp, symbol, value)` messages off-chain.
//! [`view::AnchoredPriceView`] checkpoints them in a [`store::SignedPriceStore`],
//! computes an anchor price for each posted symbol from the cumulative-price
//! counters of its reference market, and publishes the reporter's value only
//! when it lies within a configured tolerance of that anchor. Once the
//! reporter key is invalidated, anchors are published directly.
//!
//! Every time-sensitive operation takes `now` explicitly; nothing here reads
//! a clock.
//!
//! ## Modules
//!
//! - [`message`]: ABI encoding of price and rotation messages
//! - [`store`]: Replay-resistant checkpoint of signed reports
//! - [`registry`]: Immutable token configuration lookup
//! - [`market`]: Reference-market snapshots and readers
//! - [`twap`]: Window averaging and fixed-point decoding
//! - [`bounds`]: Anchor tolerance check
//! - [`view`]: The orchestrating price view
//! - [`settings`]: TOML configuration

use alloy_primitives::Address;
use pricefeed_types::SymbolHash;

pub mod bounds;
pub mod market;
pub mod message;
pub mod registry;
pub mod settings;
pub mod store;
pub mod twap;
pub mod view;

/// Error types for oracle operations.
///
/// All of these abort the call that produced them without changing state.
/// Rejected prices are reported through events, not errors.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Messages and signatures were not paired 1:1.
    #[error("messages and signatures must be 1:1: {messages} messages, {signatures} signatures")]
    LengthMismatch {
        /// Number of messages supplied.
        messages: usize,
        /// Number of signatures supplied.
        signatures: usize,
    },

    /// No token config matches the lookup key.
    #[error("token config not found: {0}")]
    ConfigNotFound(String),

    /// Only reporter-priced assets may be posted.
    #[error("only reporter prices get posted: {symbol}")]
    PriceSourceMismatch {
        /// The offending symbol.
        symbol: String,
    },

    /// A token or the quote asset was configured with a zero base unit.
    #[error("base unit must be greater than zero")]
    InvalidBaseUnit,

    /// A reporter-priced asset has no reference market.
    #[error("reported prices must have an anchor: {0}")]
    MissingAnchor(SymbolHash),

    /// A fixed-price asset names a reference market.
    #[error("only reported prices utilize an anchor: {0}")]
    UnexpectedAnchor(SymbolHash),

    /// Reporter assets are anchored through the native asset, which is not
    /// configured as a reporter asset.
    #[error("native asset {0} must be a reporter asset with an anchor")]
    NativeAnchorMissing(String),

    /// Two configs share a symbol.
    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(SymbolHash),

    /// The reference market could not be read.
    #[error("reference market unavailable: {0}")]
    MarketUnavailable(Address),

    /// The observation window has zero width.
    #[error("no time elapsed in observation window")]
    EmptyWindow,

    /// The message is not a well-formed ABI encoding.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The message decoded but carries an unexpected kind tag.
    #[error("unexpected message kind: {0:?}")]
    InvalidMessageKind(String),

    /// The message was not signed by the trusted reporter.
    #[error("invalidation message must come from the reporter, got {signer}")]
    NotReporter {
        /// The recovered signer.
        signer: Address,
    },

    /// The reporter has already been invalidated.
    #[error("reporter already invalidated")]
    ReporterAlreadyInvalidated,

    /// The native asset has no published price yet.
    #[error("native price not set, cannot convert {0} to dollars")]
    PriceNotSet(String),

    /// Fixed-point arithmetic left the representable range.
    #[error("arithmetic overflow")]
    Overflow,

    /// Invalid settings file.
    #[error("settings error: {0}")]
    Settings(String),

    /// Signature recovery failed.
    #[error(transparent)]
    Crypto(#[from] pricefeed_crypto::CryptoError),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
