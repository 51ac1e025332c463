//! Reference-market snapshots and readers.
//!
//! A reference market is a two-asset exchange pair exposing two cumulative
//! price counters in UQ112x112 (one per direction) and the 32-bit time of
//! their last update. The oracle only reads them.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use pricefeed_types::RESOLUTION;
use serde::{Deserialize, Serialize};

/// State of a pair at the time it was read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Cumulative price of the first asset in terms of the second.
    pub cumulative_a: U256,
    /// Cumulative price of the second asset in terms of the first.
    pub cumulative_b: U256,
    /// Pair clock at the last counter update, modulo 2^32.
    pub last_update: u32,
    /// Current `(reserve_a, reserve_b)`, when the pair exposes them.
    #[serde(default)]
    pub reserves: Option<(u128, u128)>,
}

impl MarketSnapshot {
    /// Counter value as of `now`.
    ///
    /// When reserves are known and the pair has not been touched this
    /// second, the elapsed interval since `last_update` is accrued at the
    /// current spot price, as the pair itself would on its next update.
    pub fn cumulative_at(&self, reversed: bool, now: u32) -> U256 {
        let stored = if reversed {
            self.cumulative_b
        } else {
            self.cumulative_a
        };

        let Some((reserve_a, reserve_b)) = self.reserves else {
            return stored;
        };
        if self.last_update == now || reserve_a == 0 || reserve_b == 0 {
            return stored;
        }

        let (numerator, denominator) = if reversed {
            (reserve_a, reserve_b)
        } else {
            (reserve_b, reserve_a)
        };
        let spot = (U256::from(numerator) << RESOLUTION) / U256::from(denominator);
        let elapsed = U256::from(now.wrapping_sub(self.last_update));
        stored.wrapping_add(spot.wrapping_mul(elapsed))
    }
}

/// Read access to reference markets.
pub trait MarketReader {
    /// Current snapshot of `market`, or `None` if it cannot be read.
    fn snapshot(&self, market: &Address) -> Option<MarketSnapshot>;
}

/// Markets held in memory, for replaying recorded pair state and for tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMarkets {
    markets: HashMap<Address, MarketSnapshot>,
}

impl InMemoryMarkets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a market, returning the previous snapshot.
    pub fn insert(&mut self, market: Address, snapshot: MarketSnapshot) -> Option<MarketSnapshot> {
        self.markets.insert(market, snapshot)
    }

    pub fn get(&self, market: &Address) -> Option<&MarketSnapshot> {
        self.markets.get(market)
    }

    pub fn get_mut(&mut self, market: &Address) -> Option<&mut MarketSnapshot> {
        self.markets.get_mut(market)
    }

    /// Accrue both counters at constant UQ112x112 prices up to `now`.
    ///
    /// Returns `false` if the market is unknown.
    pub fn accrue(&mut self, market: &Address, price_a: U256, price_b: U256, now: u32) -> bool {
        let Some(snapshot) = self.markets.get_mut(market) else {
            return false;
        };
        let elapsed = U256::from(now.wrapping_sub(snapshot.last_update));
        snapshot.cumulative_a = snapshot.cumulative_a.wrapping_add(price_a.wrapping_mul(elapsed));
        snapshot.cumulative_b = snapshot.cumulative_b.wrapping_add(price_b.wrapping_mul(elapsed));
        snapshot.last_update = now;
        true
    }
}

impl MarketReader for InMemoryMarkets {
    fn snapshot(&self, market: &Address) -> Option<MarketSnapshot> {
        self.markets.get(market).copied()
    }
}

impl<T: MarketReader + ?Sized> MarketReader for &T {
    fn snapshot(&self, market: &Address) -> Option<MarketSnapshot> {
        (**self).snapshot(market)
    }
}
