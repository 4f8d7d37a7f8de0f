//! Configuration types deserialized from `alioth.toml`.
//!
//! Every section is optional. Defaults reproduce the board testbench as it
//! ships: a 242 MHz model clock, 115200 baud serial injection, 100 reset
//! toggles followed by 50000 warm-up toggles, tracing to `tb_top.vcd`.

use alioth_common::Frequency;
use serde::Deserialize;
use std::path::PathBuf;

/// The top-level harness configuration parsed from `alioth.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Which hardware model to drive.
    #[serde(default)]
    pub model: ModelConfig,
    /// Model clock settings.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Reset and warm-up burst lengths.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Serial RX injection.
    #[serde(default)]
    pub uart: UartConfig,
    /// Waveform tracing.
    #[serde(default)]
    pub trace: TraceConfig,
    /// JTAG remote-bitbang bridge.
    #[serde(default)]
    pub jtag: JtagConfig,
    /// Run bounds.
    #[serde(default)]
    pub run: RunConfig,
}

/// Hardware model selection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Shared library exporting the `alioth_tb_*` entry points. When absent
    /// the built-in behavioral reference SoC is used.
    #[serde(default)]
    pub library: Option<PathBuf>,
    /// Byte that makes the reference SoC report completion when it arrives
    /// on its serial receiver.
    #[serde(default = "default_terminator")]
    pub terminator: u8,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            library: None,
            terminator: default_terminator(),
        }
    }
}

fn default_terminator() -> u8 {
    0x04
}

/// Model clock configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// Frequency of the model clock, e.g. `"242MHz"` or a bare number of Hertz.
    #[serde(default = "default_frequency")]
    pub frequency: Frequency,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
        }
    }
}

fn default_frequency() -> Frequency {
    Frequency::from_mhz(242)
}

/// Reset and warm-up burst configuration, both counted in clock toggles.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetConfig {
    /// Toggles with reset asserted.
    #[serde(default = "default_reset_cycles")]
    pub cycles: u64,
    /// Toggles after reset is released, before the main loop.
    #[serde(default = "default_warmup")]
    pub warmup: u64,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            cycles: default_reset_cycles(),
            warmup: default_warmup(),
        }
    }
}

fn default_reset_cycles() -> u64 {
    100
}

fn default_warmup() -> u64 {
    50_000
}

/// Serial RX injection configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UartConfig {
    /// Whether standard input is forwarded onto the model's RX pin.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Line rate in bits per second.
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Maximum number of pending bytes; `0` means unbounded.
    #[serde(default)]
    pub queue_depth: usize,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            baud: default_baud(),
            queue_depth: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_baud() -> u32 {
    115_200
}

/// Waveform trace configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// Output file.
    #[serde(default = "default_trace_path")]
    pub path: PathBuf,
    /// Hierarchy depth passed to the model's own tracer.
    #[serde(default = "default_trace_depth")]
    pub depth: u32,
    /// Which sink writes the trace.
    #[serde(default)]
    pub format: TraceFormat,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            path: default_trace_path(),
            depth: default_trace_depth(),
            format: TraceFormat::default(),
        }
    }
}

fn default_trace_path() -> PathBuf {
    PathBuf::from("tb_top.vcd")
}

fn default_trace_depth() -> u32 {
    99
}

/// Trace sink selection.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Harness-side VCD of the pins the harness drives plus model probes.
    #[default]
    Vcd,
    /// The model's own hierarchical dumper.
    Native,
}

/// JTAG remote-bitbang bridge configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JtagConfig {
    /// Whether the TCP listener is started.
    #[serde(default)]
    pub enabled: bool,
    /// TCP port on the loopback interface.
    #[serde(default = "default_jtag_port")]
    pub port: u16,
    /// Simulation steps between two TAP updates.
    #[serde(default = "default_tck_period")]
    pub tck_period: u32,
}

impl Default for JtagConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_jtag_port(),
            tck_period: default_tck_period(),
        }
    }
}

fn default_jtag_port() -> u16 {
    5555
}

fn default_tck_period() -> u32 {
    10
}

/// Run bounds.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Stop after this many rising edges of the main loop; `0` runs until the
    /// model finishes.
    #[serde(default)]
    pub max_cycles: u64,
}
