//! Configuration resolution shared by the CLI commands.
//!
//! The harness configuration comes from, in order: the `--config` path (a file
//! or a directory holding `alioth.toml`), `alioth.toml` in the working
//! directory, or built-in defaults. Command-line options are layered on top
//! and the result is validated again before it is turned into a
//! [`SimConfig`].

use std::path::Path;

use alioth_config::{
    load_config, load_config_file, validate_config, ConfigError, HarnessConfig, TraceFormat,
    CONFIG_FILE_NAME,
};
use alioth_sim::{JtagSettings, SimConfig, TraceSettings};

use crate::{GlobalArgs, RunArgs, TraceFormatArg};

/// Loads the harness configuration selected by the global flags.
pub fn resolve_config(global: &GlobalArgs) -> Result<HarnessConfig, ConfigError> {
    resolve_config_in(global, &std::env::current_dir()?)
}

/// Like [`resolve_config`], with an explicit working directory.
pub fn resolve_config_in(global: &GlobalArgs, cwd: &Path) -> Result<HarnessConfig, ConfigError> {
    if let Some(ref config_path) = global.config {
        let p = Path::new(config_path);
        return if p.is_dir() {
            load_config(p)
        } else {
            load_config_file(p)
        };
    }

    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        log::debug!("using {}", candidate.display());
        load_config_file(&candidate)
    } else {
        Ok(HarnessConfig::default())
    }
}

/// Applies command-line overrides and re-validates.
pub fn apply_overrides(config: &mut HarnessConfig, args: &RunArgs) -> Result<(), ConfigError> {
    if let Some(ref path) = args.model {
        config.model.library = Some(path.clone());
    }
    if let Some(byte) = args.terminator {
        config.model.terminator = byte;
    }
    if let Some(clock) = args.clock {
        config.clock.frequency = clock;
    }
    if let Some(baud) = args.baud {
        config.uart.baud = baud;
    }
    if args.no_uart {
        config.uart.enabled = false;
    }
    if let Some(ref path) = args.trace_file {
        config.trace.path = path.clone();
    }
    if let Some(format) = args.trace_format {
        config.trace.format = match format {
            TraceFormatArg::Vcd => TraceFormat::Vcd,
            TraceFormatArg::Native => TraceFormat::Native,
        };
    }
    if args.jtag {
        config.jtag.enabled = true;
    }
    if let Some(port) = args.jtag_port {
        config.jtag.port = port;
    }
    if let Some(max) = args.max_cycles {
        config.run.max_cycles = max;
    }
    validate_config(config)
}

/// Converts the file-level configuration into driver settings.
///
/// Tracing is only switched on by `trace`; the `[trace]` section just says
/// where and how.
pub fn to_sim_config(config: &HarnessConfig, trace: bool) -> SimConfig {
    SimConfig {
        clock: config.clock.frequency,
        baud: config.uart.baud,
        uart_enabled: config.uart.enabled,
        queue_depth: config.uart.queue_depth,
        reset_cycles: config.reset.cycles,
        warmup_cycles: config.reset.warmup,
        trace: trace.then(|| TraceSettings {
            path: config.trace.path.clone(),
            depth: config.trace.depth,
            format: match config.trace.format {
                TraceFormat::Vcd => alioth_sim::TraceFormat::Vcd,
                TraceFormat::Native => alioth_sim::TraceFormat::Native,
            },
        }),
        jtag: config.jtag.enabled.then_some(JtagSettings {
            port: config.jtag.port,
            tck_period: config.jtag.tck_period,
        }),
        max_cycles: (config.run.max_cycles != 0).then_some(config.run.max_cycles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alioth_common::Frequency;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: false,
            config: config.map(|p| p.to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn defaults_without_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = resolve_config_in(&global(None), tmp.path()).unwrap();
        assert_eq!(config.clock.frequency, Frequency::from_mhz(242));
        assert_eq!(config.uart.baud, 115_200);
    }

    #[test]
    fn picks_up_config_in_working_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("alioth.toml"), "[uart]\nbaud = 9600\n").unwrap();
        let config = resolve_config_in(&global(None), tmp.path()).unwrap();
        assert_eq!(config.uart.baud, 9600);
    }

    #[test]
    fn config_flag_accepts_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("board.toml");
        fs::write(&path, "[clock]\nfrequency = \"50MHz\"\n").unwrap();
        let cwd = TempDir::new().unwrap();
        let config = resolve_config_in(&global(Some(&path)), cwd.path()).unwrap();
        assert_eq!(config.clock.frequency, Frequency::from_mhz(50));
    }

    #[test]
    fn config_flag_accepts_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("alioth.toml"), "[jtag]\nenabled = true\n").unwrap();
        let cwd = TempDir::new().unwrap();
        let config = resolve_config_in(&global(Some(tmp.path())), cwd.path()).unwrap();
        assert!(config.jtag.enabled);
    }

    #[test]
    fn config_flag_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        let err = resolve_config_in(&global(Some(&path)), tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = HarnessConfig::default();
        let args = RunArgs {
            model: Some(PathBuf::from("libtb.so")),
            clock: Some(Frequency::from_mhz(100)),
            baud: Some(9600),
            no_uart: true,
            trace_file: Some(PathBuf::from("out.vcd")),
            trace_format: Some(TraceFormatArg::Native),
            jtag: true,
            jtag_port: Some(6000),
            max_cycles: Some(42),
            terminator: Some(0x1B),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args).unwrap();

        assert_eq!(config.model.library, Some(PathBuf::from("libtb.so")));
        assert_eq!(config.model.terminator, 0x1B);
        assert_eq!(config.clock.frequency, Frequency::from_mhz(100));
        assert_eq!(config.uart.baud, 9600);
        assert!(!config.uart.enabled);
        assert_eq!(config.trace.path, PathBuf::from("out.vcd"));
        assert_eq!(config.trace.format, TraceFormat::Native);
        assert!(config.jtag.enabled);
        assert_eq!(config.jtag.port, 6000);
        assert_eq!(config.run.max_cycles, 42);
    }

    #[test]
    fn overrides_are_validated() {
        let mut config = HarnessConfig::default();
        let args = RunArgs {
            baud: Some(0),
            ..RunArgs::default()
        };
        let err = apply_overrides(&mut config, &args).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "uart.baud", .. }));
    }

    #[test]
    fn sim_config_without_trace_flag() {
        let sim = to_sim_config(&HarnessConfig::default(), false);
        assert!(sim.trace.is_none());
        assert!(sim.jtag.is_none());
        assert!(sim.max_cycles.is_none());
        assert!(sim.uart_enabled);
        assert_eq!(sim.reset_cycles, 100);
        assert_eq!(sim.warmup_cycles, 50_000);
    }

    #[test]
    fn sim_config_with_trace_and_jtag() {
        let mut config = HarnessConfig::default();
        config.jtag.enabled = true;
        config.run.max_cycles = 10;
        let sim = to_sim_config(&config, true);

        let trace = sim.trace.unwrap();
        assert_eq!(trace.path, PathBuf::from("tb_top.vcd"));
        assert_eq!(trace.depth, 99);
        assert_eq!(trace.format, alioth_sim::TraceFormat::Vcd);
        assert_eq!(
            sim.jtag,
            Some(JtagSettings {
                port: 5555,
                tck_period: 10
            })
        );
        assert_eq!(sim.max_cycles, Some(10));
    }
}
