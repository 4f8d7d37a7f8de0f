//! Alioth testbench CLI: drives the SoC hardware model from the terminal.
//!
//! Provides `alioth-tb run` for a full reset-and-run session with standard
//! input forwarded onto the model's serial receiver, and `alioth-tb check` for
//! printing the effective configuration without starting a run.

#![warn(missing_docs)]

mod check;
mod run;
mod settings;

use std::path::PathBuf;
use std::process;

use alioth_common::Frequency;
use clap::{Parser, Subcommand, ValueEnum};

/// Alioth: testbench driver for the Alioth RISC-V SoC.
#[derive(Parser, Debug)]
#[command(name = "alioth-tb", version, about = "Alioth SoC testbench")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored log output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to an `alioth.toml` file, or a directory containing one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reset the model and run it until it finishes.
    Run(RunArgs),
    /// Validate the configuration and print the effective settings.
    Check(RunArgs),
}

/// Arguments shared by `alioth-tb run` and `alioth-tb check`.
///
/// Every option overrides the matching `alioth.toml` key.
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Record a waveform trace.
    #[arg(long)]
    pub trace: bool,

    /// Output path for the waveform trace.
    #[arg(long)]
    pub trace_file: Option<PathBuf>,

    /// Which sink writes the trace.
    #[arg(long, value_enum)]
    pub trace_format: Option<TraceFormatArg>,

    /// Shared library exporting the `alioth_tb_*` entry points.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Model clock frequency (e.g. "242MHz").
    #[arg(long)]
    pub clock: Option<Frequency>,

    /// Serial line rate for injected bytes.
    #[arg(long)]
    pub baud: Option<u32>,

    /// Do not forward standard input to the model.
    #[arg(long)]
    pub no_uart: bool,

    /// Start the JTAG remote-bitbang listener.
    #[arg(long)]
    pub jtag: bool,

    /// TCP port for the JTAG listener.
    #[arg(long)]
    pub jtag_port: Option<u16>,

    /// Stop after this many rising edges of the main loop (0 = no limit).
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Byte that ends a run of the built-in reference SoC (e.g. "0x04").
    #[arg(long, value_parser = parse_byte)]
    pub terminator: Option<u8>,

    /// Output format for the run summary.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

/// Trace sink selection on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TraceFormatArg {
    /// Harness-side Value Change Dump of the pins and model probes.
    Vcd,
    /// The model's own hierarchical dumper.
    Native,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Summary output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable lines on stderr.
    #[default]
    Text,
    /// Machine-readable JSON on stdout.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte '{s}': {e}"))
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Warn
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let style = match cli.color {
        ColorChoice::Auto => env_logger::WriteStyle::Auto,
        ColorChoice::Always => env_logger::WriteStyle::Always,
        ColorChoice::Never => env_logger::WriteStyle::Never,
    };
    env_logger::builder()
        .filter_level(level)
        .write_style(style)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_default() {
        let cli = Cli::parse_from(["alioth-tb", "run"]);
        match cli.command {
            Command::Run(ref args) => {
                assert!(!args.trace);
                assert!(args.trace_file.is_none());
                assert!(args.trace_format.is_none());
                assert!(args.model.is_none());
                assert!(args.clock.is_none());
                assert!(args.baud.is_none());
                assert!(!args.no_uart);
                assert!(!args.jtag);
                assert!(args.max_cycles.is_none());
                assert_eq!(args.report, ReportFormat::Text);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_trace() {
        let cli = Cli::parse_from([
            "alioth-tb",
            "run",
            "--trace",
            "--trace-file",
            "out/soc.vcd",
            "--trace-format",
            "native",
        ]);
        match cli.command {
            Command::Run(ref args) => {
                assert!(args.trace);
                assert_eq!(args.trace_file, Some(PathBuf::from("out/soc.vcd")));
                assert_eq!(args.trace_format, Some(TraceFormatArg::Native));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_rates() {
        let cli = Cli::parse_from(["alioth-tb", "run", "--clock", "50MHz", "--baud", "9600"]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.clock, Some(Frequency::from_mhz(50)));
                assert_eq!(args.baud, Some(9600));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_rejects_bad_clock() {
        assert!(Cli::try_parse_from(["alioth-tb", "run", "--clock", "fast"]).is_err());
    }

    #[test]
    fn parse_run_jtag_and_limits() {
        let cli = Cli::parse_from([
            "alioth-tb",
            "run",
            "--jtag",
            "--jtag-port",
            "6000",
            "--max-cycles",
            "1000",
            "--no-uart",
            "--report",
            "json",
        ]);
        match cli.command {
            Command::Run(ref args) => {
                assert!(args.jtag);
                assert_eq!(args.jtag_port, Some(6000));
                assert_eq!(args.max_cycles, Some(1000));
                assert!(args.no_uart);
                assert_eq!(args.report, ReportFormat::Json);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_terminator_hex_and_decimal() {
        let cli = Cli::parse_from(["alioth-tb", "run", "--terminator", "0x1b"]);
        match cli.command {
            Command::Run(ref args) => assert_eq!(args.terminator, Some(0x1B)),
            _ => panic!("expected Run command"),
        }
        assert_eq!(parse_byte("4"), Ok(4));
        assert!(parse_byte("0x100").is_err());
    }

    #[test]
    fn parse_check_with_model() {
        let cli = Cli::parse_from(["alioth-tb", "check", "--model", "obj_dir/libtb.so"]);
        match cli.command {
            Command::Check(ref args) => {
                assert_eq!(args.model, Some(PathBuf::from("obj_dir/libtb.so")));
            }
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["alioth-tb", "--quiet", "--color", "never", "run"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["alioth-tb", "run", "--verbose"]);
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["alioth-tb", "--config", "/path/to/alioth.toml", "check"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/alioth.toml"));
    }
}
