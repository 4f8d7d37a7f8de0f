//! Cycle-driven testbench for the Alioth RISC-V SoC.
//!
//! This crate drives a hardware model of the SoC through reset and
//! execution, optionally records a waveform trace, injects bytes from an
//! input stream onto the model's serial RX pin with bit-exact timing, and
//! optionally bridges an OpenOCD `remote_bitbang` session onto the model's
//! JTAG TAP.
//!
//! # Architecture
//!
//! The main loop is single threaded. A background thread reads the input
//! stream into a shared [`ByteQueue`]; the loop polls that queue once per
//! rising clock edge and hands bytes to the [`UartFrameEncoder`], which
//! drives the RX pin for `round(clock / baud)` edges per bit. Trace samples
//! are taken whenever the model asks for one and are counted in ticks,
//! independent of clock toggles.
//!
//! # Usage
//!
//! ```ignore
//! use alioth_sim::{simulate, ReferenceSoc, ReferenceSocConfig, SimConfig};
//!
//! let mut soc = ReferenceSoc::new(ReferenceSocConfig::default());
//! let input: Box<dyn std::io::Read + Send> = Box::new(std::io::stdin());
//! let summary = simulate(&mut soc, &SimConfig::default(), Some(input))?;
//! println!("{} bytes injected", summary.bytes_injected);
//! ```
//!
//! # Modules
//!
//! - `error`: Testbench error types
//! - `model`: The hardware model seam
//! - `queue`: Byte FIFO shared with the input thread
//! - `producer`: The input thread
//! - `uart`: Bit period and frame encoder
//! - `clock`: Clock toggling and the reset window
//! - `waveform`: Trace sinks and the sampling recorder
//! - `jtag`: OpenOCD remote-bitbang bridge
//! - `native`: Models loaded from a shared library
//! - `reference`: Behavioral SoC built from the peripheral models
//! - `harness`: The simulation loop

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod harness;
pub mod jtag;
pub mod model;
pub mod native;
pub mod producer;
pub mod queue;
pub mod reference;
pub mod uart;
pub mod waveform;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use alioth_common::Frequency;

pub use clock::{ClockDriver, Edge};
pub use error::SimError;
pub use harness::{Phase, RunSummary, SimulationLoop};
pub use jtag::{JtagBridge, RemoteBitbang};
pub use model::{HardwareModel, Probe, TapInputs};
pub use native::NativeModel;
pub use producer::StdinProducer;
pub use queue::ByteQueue;
pub use reference::{ReferenceSoc, ReferenceSocConfig};
pub use uart::{BitPeriod, FrameState, UartFrameEncoder};
pub use waveform::{NativeSink, TraceSink, VcdSink, WaveformRecorder};

/// Trace sink selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceFormat {
    /// Harness-side VCD.
    #[default]
    Vcd,
    /// The model's own tracer.
    Native,
}

/// Where and how to trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSettings {
    /// Output file.
    pub path: PathBuf,
    /// Hierarchy depth for native traces.
    pub depth: u32,
    /// Sink selection.
    pub format: TraceFormat,
}

/// JTAG bridge settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JtagSettings {
    /// Loopback TCP port.
    pub port: u16,
    /// Simulation steps per TAP update.
    pub tck_period: u32,
}

/// Configuration for a testbench run.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Model clock frequency.
    pub clock: Frequency,
    /// Serial line rate for injected bytes.
    pub baud: u32,
    /// Whether bytes from the input stream are injected.
    pub uart_enabled: bool,
    /// Byte queue depth; `0` is unbounded.
    pub queue_depth: usize,
    /// Clock toggles with reset asserted.
    pub reset_cycles: u64,
    /// Clock toggles after reset release.
    pub warmup_cycles: u64,
    /// Tracing, or `None` to skip opening a sink entirely.
    pub trace: Option<TraceSettings>,
    /// JTAG bridge, or `None` to leave the TAP idle.
    pub jtag: Option<JtagSettings>,
    /// Stop the main loop after this many rising edges.
    pub max_cycles: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clock: Frequency::from_mhz(242),
            baud: 115_200,
            uart_enabled: true,
            queue_depth: 0,
            reset_cycles: 100,
            warmup_cycles: 50_000,
            trace: None,
            jtag: None,
            max_cycles: None,
        }
    }
}

/// High-level entry point: runs one model from power-on to completion.
///
/// When UART injection is enabled and `input` is given, a background thread
/// copies `input` into the byte queue. That thread is detached at the end
/// of the run rather than joined, since it may be blocked on a console read
/// forever; process exit reclaims it.
pub fn simulate(
    model: &mut dyn HardwareModel,
    config: &SimConfig,
    input: Option<Box<dyn Read + Send>>,
) -> Result<RunSummary, SimError> {
    let jtag = match config.jtag {
        Some(settings) if model.has_tap() => Some(RemoteBitbang::bind(
            settings.port,
            settings.tck_period,
        )?),
        Some(_) => {
            log::warn!("model has no TAP pins, JTAG bridge not started");
            None
        }
        None => None,
    };

    let queue = config
        .uart_enabled
        .then(|| Arc::new(ByteQueue::with_depth(config.queue_depth)));

    let mut sim = SimulationLoop::new(model, config, queue.clone())?;
    if let Some(bridge) = jtag {
        sim = sim.with_jtag(Box::new(bridge));
    }

    let producer = match (&queue, input) {
        (Some(queue), Some(input)) => Some(
            StdinProducer::spawn(input, Arc::clone(queue)).map_err(SimError::InputThread)?,
        ),
        _ => None,
    };

    let result = sim.run();
    drop(sim);
    if let Some(producer) = producer {
        producer.detach();
    }
    result
}
