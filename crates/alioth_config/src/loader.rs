//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::HarnessConfig;
use alioth_common::Frequency;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "alioth.toml";

/// Loads and validates `<dir>/alioth.toml`.
pub fn load_config(dir: &Path) -> Result<HarnessConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates an explicit configuration file.
pub fn load_config_file(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.message().to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks that the configured values describe a runnable harness.
///
/// Also applied by the CLI after command-line overrides are layered on.
pub fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
    let clock = config.clock.frequency;
    if clock.is_zero() {
        return Err(ConfigError::invalid("clock.frequency", "must be non-zero"));
    }
    if config.uart.baud == 0 {
        return Err(ConfigError::invalid("uart.baud", "must be non-zero"));
    }
    // Fewer than one clock edge per bit cannot be framed.
    let line = Frequency::from_hz(u64::from(config.uart.baud));
    if clock.cycles_per(line).unwrap_or(0) == 0 {
        return Err(ConfigError::invalid(
            "uart.baud",
            format!("{} is too fast for a {clock} clock", config.uart.baud),
        ));
    }
    if config.trace.path.as_os_str().is_empty() {
        return Err(ConfigError::invalid("trace.path", "must not be empty"));
    }
    if config.jtag.tck_period == 0 {
        return Err(ConfigError::invalid("jtag.tck_period", "must be at least 1"));
    }
    Ok(())
}
