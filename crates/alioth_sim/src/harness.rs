//! The simulation loop.
//!
//! [`SimulationLoop`] owns every per-run component and walks the model
//! through `Resetting → WarmingUp → Running → Finished`. It is single
//! threaded and never blocks: the only shared state is the [`ByteQueue`],
//! polled once per rising edge.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::clock::{ClockDriver, Edge};
use crate::error::SimError;
use crate::jtag::JtagBridge;
use crate::model::HardwareModel;
use crate::queue::ByteQueue;
use crate::uart::{BitPeriod, UartFrameEncoder};
use crate::waveform::{NativeSink, VcdSink, WaveformRecorder};
use crate::{SimConfig, TraceFormat};

/// Run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Reset asserted, fixed toggle burst.
    Resetting,
    /// Reset released, fixed settle burst.
    WarmingUp,
    /// Main loop until the model finishes.
    Running,
    /// Sink closed, run over.
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resetting => "resetting",
            Phase::WarmingUp => "warming up",
            Phase::Running => "running",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Counters reported at the end of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Clock toggles across all phases.
    pub toggles: u64,
    /// Rising edges across all phases.
    pub rising_edges: u64,
    /// Trace samples written.
    pub samples: u64,
    /// Tick the next sample would have used.
    pub final_tick: u64,
    /// Bytes taken from the queue and framed onto the RX pin.
    pub bytes_injected: u64,
    /// Frames whose stop bit fully elapsed.
    pub frames_completed: u64,
    /// `false` when the run was cut short by the cycle limit.
    pub finished_by_model: bool,
    /// Phase the run ended in.
    pub phase: Phase,
}

/// Drives one model through a full run.
pub struct SimulationLoop<'m> {
    model: &'m mut dyn HardwareModel,
    clock: ClockDriver,
    recorder: WaveformRecorder,
    uart: Option<(UartFrameEncoder, Arc<ByteQueue>)>,
    jtag: Option<Box<dyn JtagBridge>>,
    reset_toggles: u64,
    warmup_toggles: u64,
    max_cycles: Option<u64>,
    phase: Phase,
}

impl<'m> SimulationLoop<'m> {
    /// Prepares a run.
    ///
    /// Opens the trace sink when tracing is configured; a sink that cannot be
    /// opened is an error rather than a silently untraced run. The UART
    /// encoder is created only when `queue` is given.
    pub fn new(
        model: &'m mut dyn HardwareModel,
        config: &SimConfig,
        queue: Option<Arc<ByteQueue>>,
    ) -> Result<Self, SimError> {
        let uart = match queue {
            Some(queue) => {
                let period = BitPeriod::from_rates(config.clock, config.baud)?;
                log::debug!(
                    "UART injection at {} baud, {} edges per bit",
                    config.baud,
                    period.get()
                );
                Some((UartFrameEncoder::new(period), queue))
            }
            None => None,
        };

        let recorder = match &config.trace {
            Some(trace) => {
                log::info!("Trace is enabled.");
                let recorder = match trace.format {
                    TraceFormat::Vcd => {
                        WaveformRecorder::with_sink(Box::new(VcdSink::create(&trace.path)?))
                    }
                    TraceFormat::Native => WaveformRecorder::with_sink(Box::new(
                        NativeSink::open(&mut *model, &trace.path, trace.depth)?,
                    )),
                };
                log::info!("writing trace to {}", trace.path.display());
                recorder
            }
            None => {
                log::info!("Trace is disabled.");
                WaveformRecorder::disabled()
            }
        };

        Ok(Self {
            model,
            clock: ClockDriver::new(),
            recorder,
            uart,
            jtag: None,
            reset_toggles: config.reset_cycles,
            warmup_toggles: config.warmup_cycles,
            max_cycles: config.max_cycles.filter(|&n| n > 0),
            phase: Phase::Resetting,
        })
    }

    /// Attaches a JTAG bridge, called once per main-loop step.
    pub fn with_jtag(mut self, bridge: Box<dyn JtagBridge>) -> Self {
        self.jtag = Some(bridge);
        self
    }

    /// Replaces the recorder opened from the configuration, closing the one
    /// it replaces first.
    pub fn with_recorder(mut self, recorder: WaveformRecorder) -> Result<Self, SimError> {
        self.recorder.close(&mut *self.model)?;
        self.recorder = recorder;
        Ok(self)
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::info!("{} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Runs to completion.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        self.clock.power_on(&mut *self.model);
        self.recorder.sample_once(&mut *self.model)?;

        self.phase = Phase::Resetting;
        log::info!("{} for {} toggles", self.phase, self.reset_toggles);
        let recorder = &mut self.recorder;
        let phase = &mut self.phase;
        self.clock.reset_sequence(
            &mut *self.model,
            self.reset_toggles,
            self.warmup_toggles,
            |step_phase, model| {
                if *phase != step_phase {
                    log::info!("{} -> {}", phase, step_phase);
                    *phase = step_phase;
                }
                recorder.maybe_sample(model).map(|_| ())
            },
        )?;

        self.model.set_uart_rx(true);
        self.enter(Phase::Running);
        let finished_by_model = self.main_loop()?;

        self.enter(Phase::Finished);
        self.recorder.close(&mut *self.model)?;

        let summary = self.summary(finished_by_model);
        log::info!(
            "run {}: {} toggles, {} samples, {} bytes injected",
            if finished_by_model { "finished" } else { "stopped at cycle limit" },
            summary.toggles,
            summary.samples,
            summary.bytes_injected
        );
        Ok(summary)
    }

    /// Steps until the model finishes or the cycle limit is hit. Returns
    /// `true` if the model finished.
    fn main_loop(&mut self) -> Result<bool, SimError> {
        let mut edges = 0u64;
        while !self.model.finished() {
            if self.max_cycles.is_some_and(|max| edges >= max) {
                log::warn!("stopping after {edges} cycles without a finish from the model");
                return Ok(false);
            }

            if self.clock.step(&mut *self.model) == Edge::Rising {
                edges += 1;
                if let Some((encoder, queue)) = self.uart.as_mut() {
                    let level = encoder.on_tick(queue.has_pending(), || queue.try_pop());
                    self.model.set_uart_rx(level);
                }
            }

            if let Some(jtag) = self.jtag.as_mut() {
                let mut tap = self.model.tap();
                jtag.on_tick(self.recorder.tick(), &mut tap, self.model.tdo());
                self.model.drive_tap(tap);
            }

            self.recorder.maybe_sample(&mut *self.model)?;
        }
        Ok(true)
    }

    fn summary(&self, finished_by_model: bool) -> RunSummary {
        let (bytes_injected, frames_completed) = self
            .uart
            .as_ref()
            .map(|(enc, _)| (enc.frames_started(), enc.frames_completed()))
            .unwrap_or((0, 0));
        RunSummary {
            toggles: self.clock.toggles(),
            rising_edges: self.clock.rising_edges(),
            samples: self.recorder.samples(),
            final_tick: self.recorder.tick().get(),
            bytes_injected,
            frames_completed,
            finished_by_model,
            phase: self.phase,
        }
    }
}

impl Drop for SimulationLoop<'_> {
    fn drop(&mut self) {
        // No-op after a normal run; closes the sink on early exits.
        if let Err(e) = self.recorder.close(&mut *self.model) {
            log::warn!("closing trace: {e}");
        }
    }
}
