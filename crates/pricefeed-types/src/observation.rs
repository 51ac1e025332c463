//! Accumulator snapshots and the per-asset TWAP window.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// A cumulative-price counter read at a point in time.
///
/// Timestamps are 32-bit and wrap, matching the exchange's own clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: u32,
    pub accumulator: U256,
}

impl Observation {
    pub fn new(timestamp: u32, accumulator: U256) -> Self {
        Self {
            timestamp,
            accumulator,
        }
    }
}

/// The `(old, new)` observation pair for one reporter asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub old: Observation,
    pub new: Observation,
}

impl ObservationWindow {
    /// A zero-width window where both ends are the same snapshot.
    pub fn starting_at(observation: Observation) -> Self {
        Self {
            old: observation,
            new: observation,
        }
    }

    /// Seconds since the newest observation, modulo 2^32.
    pub fn age(&self, now: u32) -> u32 {
        now.wrapping_sub(self.new.timestamp)
    }

    /// Shift `new` into `old` and record `latest` as the new end.
    pub fn rotate(&mut self, latest: Observation) {
        self.old = self.new;
        self.new = latest;
    }
}
