//! Waveform sample instants.

use serde::Serialize;
use std::fmt;

/// A monotonically increasing waveform timestamp.
///
/// A tick counts recorded trace samples, not clock toggles: it only moves
/// when a sample is written, so consecutive samples always carry strictly
/// increasing tick values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Tick(u64);

impl Tick {
    /// The first tick of a run.
    pub const ZERO: Tick = Tick(0);

    /// Creates a tick from a raw counter value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the current value and advances the counter by one.
    pub fn advance(&mut self) -> Tick {
        let current = *self;
        self.0 += 1;
        current
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
