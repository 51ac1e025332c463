//! The anchored price view.
//!
//! [`AnchoredPriceView`] owns every piece of mutable oracle state: the signed
//! price store, the observation window of each reporter asset, the published
//! price map and the reporter status. Calls run to completion; a call that
//! returns an error has changed nothing.
//!
//! ## Posting a batch
//!
//! 1. Messages and signatures must pair up 1:1.
//! 2. Every signature is recovered, every message decoded, and every posted
//!    symbol resolved to a reporter asset before anything is written.
//! 3. All reports are checkpointed in the store.
//! 4. Each posted symbol is then anchored. While the reporter is active,
//!    only symbols it freshly reported in this batch are considered; the
//!    rest are ignored without side effects. Once invalidated, the anchor
//!    itself is published.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, U256};
use pricefeed_crypto::{keccak, secp256k1};
use pricefeed_types::events::{EntryOutcome, OracleEvent};
use pricefeed_types::observation::{Observation, ObservationWindow};
use pricefeed_types::token::{PriceSource, TokenConfig};
use pricefeed_types::{SymbolHash, EXP_SCALE, PRICE_SCALE, UNDERLYING_PRICE_SCALE};

use crate::bounds::AnchorBounds;
use crate::market::MarketReader;
use crate::message::decode_rotation_message;
use crate::registry::TokenConfigRegistry;
use crate::store::{SignedPriceStore, SignedReport};
use crate::twap;
use crate::{OracleError, Result};

/// Default observation window length in seconds.
pub const DEFAULT_ANCHOR_PERIOD: u64 = 30 * 60;

/// Default ticker of the chain's native asset.
pub const DEFAULT_NATIVE_SYMBOL: &str = "ETH";

/// Default base unit of the stablecoin the native asset is quoted against.
pub const DEFAULT_QUOTE_BASE_UNIT: u64 = PRICE_SCALE;

/// Construction parameters of an [`AnchoredPriceView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewParams {
    /// The single trusted reporter.
    pub reporter: Address,
    /// Allowed deviation from the anchor, as an 18-decimal mantissa.
    pub anchor_tolerance: U256,
    /// Minimum seconds between window rotations.
    pub anchor_period: u64,
    /// Ticker of the native asset other reporter assets are anchored through.
    pub native_symbol: String,
    /// Base unit of the asset on the other side of the native asset's pair.
    pub quote_base_unit: U256,
}

impl ViewParams {
    pub fn new(reporter: Address, anchor_tolerance: U256) -> Self {
        Self {
            reporter,
            anchor_tolerance,
            anchor_period: DEFAULT_ANCHOR_PERIOD,
            native_symbol: DEFAULT_NATIVE_SYMBOL.to_string(),
            quote_base_unit: U256::from(DEFAULT_QUOTE_BASE_UNIT),
        }
    }
}

/// Whether reporter prices are still considered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReporterStatus {
    Active(Address),
    /// Permanent. Anchors are published directly.
    Invalidated,
}

/// Per-entry outcomes and emitted events of one posted batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One per posted symbol, in order.
    pub outcomes: Vec<EntryOutcome>,
    /// Every event of the call, in emission order.
    pub events: Vec<OracleEvent>,
}

impl BatchReport {
    /// First outcome for `symbol`, compared case-insensitively.
    pub fn outcome(&self, symbol: &str) -> Option<&EntryOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.symbol().eq_ignore_ascii_case(symbol))
    }
}

/// Publishes one price per configured asset, anchored to exchange TWAPs.
#[derive(Debug)]
pub struct AnchoredPriceView<M> {
    registry: TokenConfigRegistry,
    store: SignedPriceStore,
    markets: M,
    windows: HashMap<SymbolHash, ObservationWindow>,
    prices: HashMap<SymbolHash, u64>,
    status: ReporterStatus,
    bounds: AnchorBounds,
    anchor_period: u64,
    native_symbol: String,
    native_hash: SymbolHash,
    quote_base_unit: U256,
}

impl<M: MarketReader> AnchoredPriceView<M> {
    /// Validate `configs` and open an observation window for every reporter
    /// asset at its market's current counter.
    ///
    /// # Errors
    ///
    /// - [`OracleError::InvalidBaseUnit`] if a base unit is zero
    /// - [`OracleError::DuplicateSymbol`] if two configs share a symbol
    /// - [`OracleError::MissingAnchor`] if a reporter asset has no market
    /// - [`OracleError::UnexpectedAnchor`] if a fixed-price asset has one
    /// - [`OracleError::NativeAnchorMissing`] if reporter assets exist but
    ///   the native asset is not one of them
    /// - [`OracleError::MarketUnavailable`] if a market cannot be read
    pub fn new(params: ViewParams, configs: Vec<TokenConfig>, markets: M, now: u64) -> Result<Self> {
        if params.quote_base_unit.is_zero() {
            return Err(OracleError::InvalidBaseUnit);
        }
        let registry = TokenConfigRegistry::new(configs)?;
        let native_symbol = params.native_symbol.to_uppercase();
        let native_hash = keccak::symbol_hash(&native_symbol);

        for config in registry.iter() {
            let has_market = config.market.is_some_and(|market| !market.is_zero());
            if config.is_reported() && !has_market {
                return Err(OracleError::MissingAnchor(config.symbol_hash));
            }
            if !config.is_reported() && has_market {
                return Err(OracleError::UnexpectedAnchor(config.symbol_hash));
            }
        }

        let needs_native = registry
            .iter()
            .any(|config| config.is_reported() && config.symbol_hash != native_hash);
        let native_reported = registry
            .by_symbol_hash(&native_hash)
            .map(TokenConfig::is_reported)
            .unwrap_or(false);
        if needs_native && !native_reported {
            return Err(OracleError::NativeAnchorMissing(native_symbol));
        }

        let now32 = block_time(now);
        let mut windows = HashMap::new();
        for config in registry.iter().filter(|config| config.is_reported()) {
            let market = config
                .market
                .ok_or(OracleError::MissingAnchor(config.symbol_hash))?;
            let snapshot = markets
                .snapshot(&market)
                .ok_or(OracleError::MarketUnavailable(market))?;
            let start = Observation::new(now32, snapshot.cumulative_at(config.market_reversed, now32));
            windows.insert(config.symbol_hash, ObservationWindow::starting_at(start));
        }

        tracing::info!(
            reporter = %params.reporter,
            assets = registry.len(),
            anchored = windows.len(),
            anchor_period = params.anchor_period,
            "anchored price view initialized"
        );

        Ok(Self {
            registry,
            store: SignedPriceStore::new(),
            markets,
            windows,
            prices: HashMap::new(),
            status: ReporterStatus::Active(params.reporter),
            bounds: AnchorBounds::from_tolerance(params.anchor_tolerance),
            anchor_period: params.anchor_period,
            native_symbol,
            native_hash,
            quote_base_unit: params.quote_base_unit,
        })
    }

    /// Checkpoint a batch of signed reports and anchor each posted symbol.
    ///
    /// # Errors
    ///
    /// - [`OracleError::LengthMismatch`] if messages and signatures differ in count
    /// - [`OracleError::Crypto`], [`OracleError::MalformedMessage`] or
    ///   [`OracleError::InvalidMessageKind`] if any entry is malformed
    /// - [`OracleError::ConfigNotFound`] if a posted symbol is unknown
    /// - [`OracleError::PriceSourceMismatch`] if a posted symbol is not a
    ///   reporter asset
    pub fn post_prices<B, S>(
        &mut self,
        messages: &[B],
        signatures: &[B],
        symbols: &[S],
        now: u64,
    ) -> Result<BatchReport>
    where
        B: AsRef<[u8]>,
        S: AsRef<str>,
    {
        if messages.len() != signatures.len() {
            return Err(OracleError::LengthMismatch {
                messages: messages.len(),
                signatures: signatures.len(),
            });
        }

        let reports = messages
            .iter()
            .zip(signatures)
            .map(|(message, signature)| SignedReport::verify(message.as_ref(), signature.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut posted = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.as_ref().to_uppercase();
            let config = self.registry.by_symbol(&symbol)?;
            if config.price_source != PriceSource::Reporter {
                return Err(OracleError::PriceSourceMismatch { symbol });
            }
            posted.push((config.symbol_hash, symbol));
        }

        let mut report = BatchReport::default();
        let mut fresh = HashSet::new();
        for signed in &reports {
            let put = self.store.apply(signed, now);
            if put.accepted && self.status == ReporterStatus::Active(signed.signer) {
                fresh.insert(signed.symbol_hash);
            }
            report.events.push(put.event);
        }

        let mut native_anchor = None;
        let status = self.status;
        for (symbol_hash, symbol) in posted {
            let outcome = match status {
                ReporterStatus::Invalidated => {
                    match self.anchor(&symbol_hash, &symbol, now, &mut native_anchor, &mut report.events) {
                        Some(anchor) => {
                            self.publish(symbol_hash, &symbol, anchor, &mut report.events);
                            EntryOutcome::Published {
                                symbol,
                                price: anchor,
                            }
                        }
                        None => EntryOutcome::AnchorUnavailable { symbol },
                    }
                }
                ReporterStatus::Active(_) if !fresh.contains(&symbol_hash) => {
                    tracing::debug!(symbol = %symbol, "no fresh reporter price");
                    EntryOutcome::Ignored { symbol }
                }
                ReporterStatus::Active(reporter) => {
                    match self.anchor(&symbol_hash, &symbol, now, &mut native_anchor, &mut report.events) {
                        Some(anchor) => {
                            let value = self.store.get_by_hash(&reporter, &symbol_hash).value;
                            if self.bounds.contains(value, anchor) {
                                self.publish(symbol_hash, &symbol, value, &mut report.events);
                                EntryOutcome::Published {
                                    symbol,
                                    price: value,
                                }
                            } else {
                                tracing::warn!(
                                    symbol = %symbol,
                                    reporter = value,
                                    anchor,
                                    "reporter price outside anchor bounds"
                                );
                                report.events.push(OracleEvent::PriceGuarded {
                                    symbol: symbol.clone(),
                                    reporter: value,
                                    anchor,
                                });
                                EntryOutcome::Guarded {
                                    symbol,
                                    reporter: value,
                                    anchor,
                                }
                            }
                        }
                        None => EntryOutcome::AnchorUnavailable { symbol },
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    /// Permanently stop trusting the reporter.
    ///
    /// `message` must be a rotation message signed by the active reporter.
    /// The rotation target is informational; it is not trusted.
    ///
    /// # Errors
    ///
    /// - [`OracleError::ReporterAlreadyInvalidated`] on a repeat call
    /// - [`OracleError::MalformedMessage`] or [`OracleError::InvalidMessageKind`]
    ///   if `message` is not a rotation message
    /// - [`OracleError::Crypto`] if the signature is malformed
    /// - [`OracleError::NotReporter`] if someone else signed it
    pub fn invalidate_reporter(&mut self, message: &[u8], signature: &[u8]) -> Result<OracleEvent> {
        let ReporterStatus::Active(reporter) = self.status else {
            return Err(OracleError::ReporterAlreadyInvalidated);
        };
        let rotate_to = decode_rotation_message(message)?;
        let signer = secp256k1::recover_signer(message, signature)?;
        if signer != reporter {
            return Err(OracleError::NotReporter { signer });
        }

        self.status = ReporterStatus::Invalidated;
        tracing::warn!(reporter = %reporter, rotate_to = %rotate_to, "reporter invalidated");
        Ok(OracleEvent::ReporterInvalidated { reporter })
    }

    /// Published 6-decimal USD price of `symbol`.
    ///
    /// Reporter assets read 0 until their first publication.
    ///
    /// # Errors
    ///
    /// - [`OracleError::ConfigNotFound`] if `symbol` is unknown
    /// - [`OracleError::PriceNotSet`] for a native-denominated asset while
    ///   the native price is unpublished
    pub fn price(&self, symbol: &str) -> Result<u64> {
        let config = self.registry.by_symbol(symbol)?;
        self.price_of(config)
    }

    /// Price of one whole underlying unit, scaled to 36 decimals minus the
    /// underlying's own: `price * 1e30 / base_unit`.
    ///
    /// # Errors
    ///
    /// As [`price`](Self::price), plus [`OracleError::Overflow`].
    pub fn underlying_value(&self, asset: &Address) -> Result<U256> {
        let config = self.registry.by_asset(asset)?;
        let price = self.price_of(config)?;
        U256::from(price)
            .checked_mul(U256::from(UNDERLYING_PRICE_SCALE))
            .map(|scaled| scaled / config.base_unit)
            .ok_or(OracleError::Overflow)
    }

    /// The current observation window of a reporter asset.
    pub fn observations(&self, symbol: &str) -> Option<&ObservationWindow> {
        self.windows.get(&keccak::symbol_hash(symbol))
    }

    pub fn registry(&self) -> &TokenConfigRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SignedPriceStore {
        &self.store
    }

    pub fn markets(&self) -> &M {
        &self.markets
    }

    /// Mutable access to the market source, e.g. to feed it fresh pair state.
    pub fn markets_mut(&mut self) -> &mut M {
        &mut self.markets
    }

    pub fn reporter_status(&self) -> ReporterStatus {
        self.status
    }

    pub fn bounds(&self) -> AnchorBounds {
        self.bounds
    }

    pub fn anchor_period(&self) -> u64 {
        self.anchor_period
    }

    pub fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    fn price_of(&self, config: &TokenConfig) -> Result<u64> {
        match config.price_source {
            PriceSource::Reporter => Ok(self.prices.get(&config.symbol_hash).copied().unwrap_or(0)),
            PriceSource::FixedUsd => {
                u64::try_from(config.fixed_price).map_err(|_| OracleError::Overflow)
            }
            PriceSource::FixedEth => {
                let native = self.prices.get(&self.native_hash).copied().unwrap_or(0);
                if native == 0 {
                    return Err(OracleError::PriceNotSet(self.native_symbol.clone()));
                }
                let value = U256::from(native)
                    .checked_mul(config.fixed_price)
                    .ok_or(OracleError::Overflow)?
                    / U256::from(EXP_SCALE);
                u64::try_from(value).map_err(|_| OracleError::Overflow)
            }
        }
    }

    fn publish(&mut self, symbol_hash: SymbolHash, symbol: &str, price: u64, events: &mut Vec<OracleEvent>) {
        self.prices.insert(symbol_hash, price);
        tracing::info!(symbol = %symbol, price, "price updated");
        events.push(OracleEvent::PriceUpdated {
            symbol: symbol.to_string(),
            price,
        });
    }

    /// Anchor of `symbol_hash`, or `None` if it cannot be computed now.
    ///
    /// The native anchor is computed at most once per batch and reused as
    /// the USD conversion for every other asset.
    fn anchor(
        &mut self,
        symbol_hash: &SymbolHash,
        symbol: &str,
        now: u64,
        native_anchor: &mut Option<Option<u64>>,
        events: &mut Vec<OracleEvent>,
    ) -> Option<u64> {
        let native = match *native_anchor {
            Some(cached) => cached,
            None => {
                let native_hash = self.native_hash;
                let native_symbol = self.native_symbol.clone();
                let computed = self.fetch_anchor(
                    &native_hash,
                    &native_symbol,
                    U256::from(PRICE_SCALE),
                    self.quote_base_unit,
                    now,
                    events,
                );
                *native_anchor = Some(computed);
                computed
            }
        };
        if *symbol_hash == self.native_hash {
            return native;
        }

        let native = native?;
        let native_base_unit = self.registry.by_symbol_hash(&self.native_hash).ok()?.base_unit;
        self.fetch_anchor(symbol_hash, symbol, U256::from(native), native_base_unit, now, events)
    }

    /// Poke the window of `symbol_hash` and price it over `[old, now]`.
    fn fetch_anchor(
        &mut self,
        symbol_hash: &SymbolHash,
        symbol: &str,
        conversion: U256,
        counter_unit: U256,
        now: u64,
        events: &mut Vec<OracleEvent>,
    ) -> Option<u64> {
        match self.try_fetch_anchor(symbol_hash, symbol, conversion, counter_unit, now, events) {
            Ok(anchor) => Some(anchor),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "anchor price unavailable");
                None
            }
        }
    }

    fn try_fetch_anchor(
        &mut self,
        symbol_hash: &SymbolHash,
        symbol: &str,
        conversion: U256,
        counter_unit: U256,
        now: u64,
        events: &mut Vec<OracleEvent>,
    ) -> Result<u64> {
        let config = self.registry.by_symbol_hash(symbol_hash)?;
        let (base_unit, reversed) = (config.base_unit, config.market_reversed);
        let market = config.market.ok_or(OracleError::MissingAnchor(*symbol_hash))?;
        let snapshot = self
            .markets
            .snapshot(&market)
            .ok_or(OracleError::MarketUnavailable(market))?;

        let now32 = block_time(now);
        let current = Observation::new(now32, snapshot.cumulative_at(reversed, now32));
        let window = self
            .windows
            .get_mut(symbol_hash)
            .ok_or(OracleError::MissingAnchor(*symbol_hash))?;

        if u64::from(window.age(now32)) >= self.anchor_period {
            window.rotate(current);
            tracing::debug!(
                symbol = %symbol,
                old_timestamp = window.old.timestamp,
                new_timestamp = window.new.timestamp,
                "observation window rotated"
            );
            events.push(OracleEvent::WindowUpdated {
                symbol_hash: *symbol_hash,
                old_timestamp: window.old.timestamp,
                new_timestamp: window.new.timestamp,
                old_accumulator: window.old.accumulator,
                new_accumulator: window.new.accumulator,
            });
        }

        let average = twap::average_price(&window.old, &current)?;
        let rate = twap::decode_with_18(average);
        let anchor = twap::anchor_price(rate, conversion, base_unit, counter_unit)?;

        events.push(OracleEvent::AnchorPriceUpdated {
            symbol: symbol.to_string(),
            anchor_price: anchor,
            old_timestamp: window.old.timestamp,
            new_timestamp: now32,
        });
        Ok(anchor)
    }
}

/// The exchange's 32-bit clock.
fn block_time(now: u64) -> u32 {
    (now & u64::from(u32::MAX)) as u32
}
