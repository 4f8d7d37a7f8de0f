//! `alioth-tb run`: reset the model and run it to completion.
//!
//! Standard input is forwarded onto the model's serial receiver unless UART
//! injection is disabled. The run summary goes to stderr as text, or to
//! stdout as JSON with `--report json`.

use std::io::{self, Read};

use alioth_config::HarnessConfig;
use alioth_sim::{HardwareModel, NativeModel, ReferenceSoc, ReferenceSocConfig, RunSummary};

use crate::settings::{apply_overrides, resolve_config, to_sim_config};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Exit status when the cycle limit stopped the run before the model finished.
pub const EXIT_CYCLE_LIMIT: i32 = 2;

/// Runs the `alioth-tb run` command.
///
/// Returns exit code 0 when the model finished on its own, or
/// [`EXIT_CYCLE_LIMIT`] when `--max-cycles` cut the run short.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = resolve_config(global)?;
    apply_overrides(&mut config, args)?;
    let sim_config = to_sim_config(&config, args.trace);

    let mut model = open_model(&config, args.trace)?;

    if !global.quiet {
        eprintln!(
            "   Running {} at {}, {} baud",
            model_name(&config),
            sim_config.clock,
            sim_config.baud
        );
    }

    let input: Option<Box<dyn Read + Send>> = Some(Box::new(io::stdin()));
    let summary = alioth_sim::simulate(model.as_mut(), &sim_config, input)?;

    match args.report {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        ReportFormat::Text => {
            if !global.quiet {
                print_summary(&summary);
                if let Some(ref trace) = sim_config.trace {
                    eprintln!("   Trace: {}", trace.path.display());
                }
            }
        }
    }

    if summary.finished_by_model {
        Ok(0)
    } else {
        if !global.quiet {
            eprintln!("   Stopped: cycle limit reached before the model finished");
        }
        Ok(EXIT_CYCLE_LIMIT)
    }
}

/// Instantiates the configured model, or the reference SoC when no library
/// is configured.
fn open_model(
    config: &HarnessConfig,
    trace: bool,
) -> Result<Box<dyn HardwareModel>, Box<dyn std::error::Error>> {
    match config.model.library {
        Some(ref path) => Ok(Box::new(NativeModel::load(path)?)),
        None => Ok(Box::new(ReferenceSoc::new(ReferenceSocConfig {
            clock: config.clock.frequency,
            baud: config.uart.baud,
            terminator: Some(config.model.terminator),
            dump_enabled: trace,
        }))),
    }
}

/// Short label for the model in status lines.
pub fn model_name(config: &HarnessConfig) -> String {
    match config.model.library {
        Some(ref path) => path.display().to_string(),
        None => "reference SoC".to_string(),
    }
}

fn print_summary(summary: &RunSummary) {
    eprintln!(
        "   Finished after {} rising edges ({} toggles)",
        summary.rising_edges, summary.toggles
    );
    eprintln!(
        "   Injected {} byte(s), {} frame(s) completed",
        summary.bytes_injected, summary.frames_completed
    );
    if summary.samples > 0 {
        eprintln!(
            "   Recorded {} sample(s), last tick {}",
            summary.samples, summary.final_tick
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn model_name_defaults_to_reference() {
        assert_eq!(model_name(&HarnessConfig::default()), "reference SoC");
    }

    #[test]
    fn model_name_uses_library_path() {
        let mut config = HarnessConfig::default();
        config.model.library = Some(PathBuf::from("obj_dir/libtb.so"));
        assert_eq!(model_name(&config), "obj_dir/libtb.so");
    }

    #[test]
    fn reference_model_follows_config() {
        let mut config = HarnessConfig::default();
        config.model.terminator = 0x1B;
        let model = open_model(&config, true).unwrap();
        assert!(model.dump_enabled());
        assert!(model.has_tap());
        let model = open_model(&config, false).unwrap();
        assert!(!model.dump_enabled());
    }

    #[test]
    fn missing_library_fails_to_open() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = HarnessConfig::default();
        config.model.library = Some(tmp.path().join("libabsent.so"));
        match open_model(&config, false) {
            Err(e) => assert!(e.to_string().starts_with("cannot load model")),
            Ok(_) => panic!("loading a missing library succeeded"),
        }
    }
}
