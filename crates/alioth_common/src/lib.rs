//! Shared foundational types for the Alioth SoC testbench.
//!
//! This crate provides the value types passed between the configuration
//! layer, the peripheral models, and the simulation driver: clock and line
//! rate frequencies, and waveform tick counters.

#![warn(missing_docs)]

pub mod frequency;
pub mod tick;

pub use frequency::{Frequency, ParseFrequencyError};
pub use tick::Tick;
