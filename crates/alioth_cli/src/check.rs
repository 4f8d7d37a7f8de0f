//! `alioth-tb check`: print the effective configuration.
//!
//! Runs the same resolution and override layering as `run`, including
//! validation, then reports the settings a run would use.

use alioth_config::HarnessConfig;
use alioth_sim::BitPeriod;

use crate::run::model_name;
use crate::settings::{apply_overrides, resolve_config};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Runs the `alioth-tb check` command. Always returns exit code 0 once the
/// configuration validates.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = resolve_config(global)?;
    apply_overrides(&mut config, args)?;
    let bit = BitPeriod::from_rates(config.clock.frequency, config.uart.baud)?;

    match args.report {
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&to_json(&config, args.trace, bit))?
        ),
        ReportFormat::Text => {
            if !global.quiet {
                for line in describe(&config, args.trace, bit) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(0)
}

fn describe(config: &HarnessConfig, trace: bool, bit: BitPeriod) -> Vec<String> {
    let mut lines = vec![
        format!("model:     {}", model_name(config)),
        format!("clock:     {}", config.clock.frequency),
        format!(
            "reset:     {} toggles, then {} warm-up toggles",
            config.reset.cycles, config.reset.warmup
        ),
    ];
    if config.uart.enabled {
        lines.push(format!(
            "uart:      {} baud, {} edges per bit",
            config.uart.baud,
            bit.get()
        ));
    } else {
        lines.push("uart:      disabled".to_string());
    }
    if trace {
        lines.push(format!(
            "trace:     {} ({:?})",
            config.trace.path.display(),
            config.trace.format
        ));
    } else {
        lines.push("trace:     disabled".to_string());
    }
    if config.jtag.enabled {
        lines.push(format!(
            "jtag:      127.0.0.1:{}, every {} steps",
            config.jtag.port, config.jtag.tck_period
        ));
    } else {
        lines.push("jtag:      disabled".to_string());
    }
    if config.run.max_cycles != 0 {
        lines.push(format!("limit:     {} rising edges", config.run.max_cycles));
    }
    lines
}

fn to_json(config: &HarnessConfig, trace: bool, bit: BitPeriod) -> serde_json::Value {
    serde_json::json!({
        "model": model_name(config),
        "clock_hz": config.clock.frequency.hz(),
        "reset_cycles": config.reset.cycles,
        "warmup_cycles": config.reset.warmup,
        "uart": {
            "enabled": config.uart.enabled,
            "baud": config.uart.baud,
            "bit_period": bit.get(),
            "queue_depth": config.uart.queue_depth,
        },
        "trace": trace.then(|| config.trace.path.display().to_string()),
        "jtag_port": config.jtag.enabled.then_some(config.jtag.port),
        "max_cycles": config.run.max_cycles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_bit(config: &HarnessConfig) -> BitPeriod {
        BitPeriod::from_rates(config.clock.frequency, config.uart.baud).unwrap()
    }

    #[test]
    fn describe_board_defaults() {
        let config = HarnessConfig::default();
        let lines = describe(&config, false, board_bit(&config));
        assert_eq!(lines[0], "model:     reference SoC");
        assert_eq!(lines[1], "clock:     242MHz");
        assert!(lines.contains(&"uart:      115200 baud, 2101 edges per bit".to_string()));
        assert!(lines.contains(&"trace:     disabled".to_string()));
        assert!(lines.contains(&"jtag:      disabled".to_string()));
    }

    #[test]
    fn describe_trace_and_jtag() {
        let mut config = HarnessConfig::default();
        config.jtag.enabled = true;
        config.run.max_cycles = 500;
        let lines = describe(&config, true, board_bit(&config));
        assert!(lines.contains(&"trace:     tb_top.vcd (Vcd)".to_string()));
        assert!(lines.contains(&"jtag:      127.0.0.1:5555, every 10 steps".to_string()));
        assert!(lines.contains(&"limit:     500 rising edges".to_string()));
    }

    #[test]
    fn json_reports_bit_period() {
        let config = HarnessConfig::default();
        let value = to_json(&config, false, board_bit(&config));
        assert_eq!(value["clock_hz"], 242_000_000);
        assert_eq!(value["uart"]["bit_period"], 2101);
        assert!(value["trace"].is_null());
        assert!(value["jtag_port"].is_null());
    }
}
