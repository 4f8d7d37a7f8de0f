//! The boundary between the testbench and the hardware model it drives.
//!
//! The harness treats the SoC as an opaque stepping function: it writes
//! input pins, calls [`HardwareModel::eval`], and reads back a handful of
//! observable flags. Nothing else about the model is inspected.

use std::path::Path;

use alioth_common::Tick;

use crate::error::SimError;

/// Levels driven onto the model's JTAG TAP inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TapInputs {
    /// Test clock.
    pub tck: bool,
    /// Test mode select.
    pub tms: bool,
    /// Test data in.
    pub tdi: bool,
}

/// A model-specific value exposed for harness-side waveform dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Signal name as it appears in the trace.
    pub name: &'static str,
    /// Width in bits (1..=64).
    pub width: u32,
    /// Current value; bits above `width` are ignored.
    pub value: u64,
}

impl Probe {
    /// Creates a probe.
    pub const fn new(name: &'static str, width: u32, value: u64) -> Self {
        Self { name, width, value }
    }
}

/// A steppable hardware model.
///
/// Setters only latch pin levels; they take effect on the next
/// [`eval`](HardwareModel::eval).
pub trait HardwareModel {
    /// Drives the clock input.
    fn set_clk(&mut self, level: bool);

    /// Current clock input level.
    fn clk(&self) -> bool;

    /// Drives the active-low reset input.
    fn set_rst_n(&mut self, level: bool);

    /// Current reset input level.
    fn rst_n(&self) -> bool;

    /// Drives the serial receive pin.
    fn set_uart_rx(&mut self, level: bool);

    /// Current serial receive pin level.
    fn uart_rx(&self) -> bool;

    /// Evaluates the model once with the current inputs.
    fn eval(&mut self);

    /// The model has signalled completion.
    fn finished(&self) -> bool;

    /// The model wants a trace sample taken after this evaluation.
    fn dump_enabled(&self) -> bool;

    /// Returns `true` if the model exposes JTAG TAP pins.
    fn has_tap(&self) -> bool {
        false
    }

    /// Drives the TAP inputs.
    fn drive_tap(&mut self, _tap: TapInputs) {}

    /// Current TAP input levels.
    fn tap(&self) -> TapInputs {
        TapInputs::default()
    }

    /// Current TAP data output.
    fn tdo(&self) -> bool {
        false
    }

    /// Opens the model's own hierarchical tracer.
    fn trace_open(&mut self, _path: &Path, _depth: u32) -> Result<(), SimError> {
        Err(SimError::Unsupported {
            reason: "model has no native tracer".into(),
        })
    }

    /// Writes one sample through the model's own tracer.
    fn trace_dump(&mut self, _tick: Tick) -> Result<(), SimError> {
        Err(SimError::Unsupported {
            reason: "model has no native tracer".into(),
        })
    }

    /// Flushes and closes the model's own tracer.
    fn trace_close(&mut self) -> Result<(), SimError> {
        Err(SimError::Unsupported {
            reason: "model has no native tracer".into(),
        })
    }

    /// Extra values to include in harness-side traces.
    fn probes(&self) -> Vec<Probe> {
        Vec::new()
    }
}
