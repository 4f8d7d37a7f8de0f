//! Waveform tracing.
//!
//! The [`TraceSink`] trait abstracts where samples go. [`VcdSink`] writes an
//! IEEE 1364 Value Change Dump of the pins the harness drives plus any
//! model probes; [`NativeSink`] hands each sample to the model's own
//! hierarchical tracer. [`WaveformRecorder`] decides when to sample and owns
//! the tick counter.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use alioth_common::Tick;

use crate::error::SimError;
use crate::model::HardwareModel;

/// Destination for trace samples.
pub trait TraceSink {
    /// Records the model's current state at `tick`.
    fn dump(&mut self, tick: Tick, model: &mut dyn HardwareModel) -> Result<(), SimError>;

    /// Flushes and finalizes the trace.
    fn close(&mut self, model: &mut dyn HardwareModel) -> Result<(), SimError>;
}

/// Harness pins included in every VCD, in declaration order.
const PIN_NAMES: [&str; 8] = [
    "clk", "rst_n", "uart_rx", "tck", "tms", "tdi", "tdo", "finished",
];

fn pin_values(model: &dyn HardwareModel) -> [bool; 8] {
    let tap = model.tap();
    [
        model.clk(),
        model.rst_n(),
        model.uart_rx(),
        tap.tck,
        tap.tms,
        tap.tdi,
        model.tdo(),
        model.finished(),
    ]
}

struct VcdVar {
    code: String,
    width: u32,
    last: Option<u64>,
}

/// VCD writer for harness-side traces.
///
/// Variables are declared on the first sample, so model probes must keep a
/// fixed set and order for the whole run.
pub struct VcdSink<W: Write> {
    writer: W,
    vars: Vec<VcdVar>,
    header_written: bool,
}

impl VcdSink<BufWriter<File>> {
    /// Creates a buffered VCD file.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        let file = File::create(path).map_err(|source| SimError::TraceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> VcdSink<W> {
    /// Creates a VCD sink writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            vars: Vec::new(),
            header_written: false,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Generates a VCD identifier code from a sequential index.
    ///
    /// Uses printable ASCII characters starting from `!` (0x21).
    fn make_id_code(index: usize) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push(char::from(b'!' + (idx % 94) as u8));
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn write_header(&mut self, probes: &[(&str, u32)]) -> Result<(), SimError> {
        writeln!(self.writer, "$date")?;
        writeln!(self.writer, "  Simulation date")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  Alioth testbench")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1ns")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$scope module tb_top $end")?;

        let decls = PIN_NAMES.iter().map(|name| (*name, 1)).chain(probes.iter().copied());
        for (index, (name, width)) in decls.enumerate() {
            let code = Self::make_id_code(index);
            writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
            self.vars.push(VcdVar {
                code,
                width,
                last: None,
            });
        }

        writeln!(self.writer, "$upscope $end")?;
        writeln!(self.writer, "$enddefinitions $end")?;
        self.header_written = true;
        Ok(())
    }

    fn write_value(&mut self, index: usize, value: u64) -> Result<(), SimError> {
        let var = &self.vars[index];
        if var.width == 1 {
            writeln!(self.writer, "{}{}", value & 1, var.code)?;
        } else {
            writeln!(self.writer, "b{:b} {}", value, var.code)?;
        }
        Ok(())
    }
}

impl<W: Write> TraceSink for VcdSink<W> {
    fn dump(&mut self, tick: Tick, model: &mut dyn HardwareModel) -> Result<(), SimError> {
        let probes = model.probes();
        let first = !self.header_written;
        if first {
            let decls: Vec<(&str, u32)> = probes.iter().map(|p| (p.name, p.width)).collect();
            self.write_header(&decls)?;
        }

        let values: Vec<u64> = pin_values(model)
            .iter()
            .map(|&b| u64::from(b))
            .chain(probes.iter().map(|p| {
                if p.width >= 64 {
                    p.value
                } else {
                    p.value & ((1u64 << p.width) - 1)
                }
            }))
            .collect();

        writeln!(self.writer, "{tick}")?;
        if first {
            writeln!(self.writer, "$dumpvars")?;
        }
        for (index, value) in values.into_iter().enumerate().take(self.vars.len()) {
            if self.vars[index].last != Some(value) {
                self.write_value(index, value)?;
                self.vars[index].last = Some(value);
            }
        }
        if first {
            writeln!(self.writer, "$end")?;
        }
        Ok(())
    }

    fn close(&mut self, _model: &mut dyn HardwareModel) -> Result<(), SimError> {
        if !self.header_written {
            self.write_header(&[])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards samples to the model's own tracer.
#[derive(Debug)]
pub struct NativeSink;

impl NativeSink {
    /// Opens the model's tracer on `path` with the given hierarchy depth.
    pub fn open(
        model: &mut dyn HardwareModel,
        path: &Path,
        depth: u32,
    ) -> Result<Self, SimError> {
        model.trace_open(path, depth)?;
        Ok(Self)
    }
}

impl TraceSink for NativeSink {
    fn dump(&mut self, tick: Tick, model: &mut dyn HardwareModel) -> Result<(), SimError> {
        model.trace_dump(tick)
    }

    fn close(&mut self, model: &mut dyn HardwareModel) -> Result<(), SimError> {
        model.trace_close()
    }
}

/// Samples the model into an optional sink.
///
/// The tick advances by exactly one per sample written. Without a sink
/// every method is a no-op.
pub struct WaveformRecorder {
    sink: Option<Box<dyn TraceSink>>,
    tick: Tick,
    samples: u64,
}

impl WaveformRecorder {
    /// A recorder that never writes.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            tick: Tick::ZERO,
            samples: 0,
        }
    }

    /// A recorder writing to `sink`.
    pub fn with_sink(sink: Box<dyn TraceSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::disabled()
        }
    }

    /// Returns `true` while a sink is attached and open.
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Next tick to be written.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Samples written so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    fn write_one(&mut self, model: &mut dyn HardwareModel) -> Result<(), SimError> {
        if let Some(sink) = self.sink.as_mut() {
            sink.dump(self.tick.advance(), model)?;
            self.samples += 1;
        }
        Ok(())
    }

    /// Writes one sample if the model wants one. Returns the number written.
    pub fn sample_once(&mut self, model: &mut dyn HardwareModel) -> Result<u64, SimError> {
        if self.sink.is_none() || !model.dump_enabled() {
            return Ok(0);
        }
        self.write_one(model)?;
        Ok(1)
    }

    /// Writes two samples on consecutive ticks if the model wants one.
    /// Returns the number written.
    pub fn maybe_sample(&mut self, model: &mut dyn HardwareModel) -> Result<u64, SimError> {
        if self.sink.is_none() || !model.dump_enabled() {
            return Ok(0);
        }
        self.write_one(model)?;
        self.write_one(model)?;
        Ok(2)
    }

    /// Closes the sink. Later calls do nothing.
    pub fn close(&mut self, model: &mut dyn HardwareModel) -> Result<(), SimError> {
        match self.sink.take() {
            Some(mut sink) => {
                log::debug!("closing trace after {} samples", self.samples);
                sink.close(model)
            }
            None => Ok(()),
        }
    }
}
