//! Parsing and validation of `alioth.toml` harness configuration files.
//!
//! This crate reads the testbench configuration and produces a strongly-typed
//! [`HarnessConfig`]. Converting it into the runtime settings of the
//! simulation driver is left to the front end, which layers command-line
//! overrides on top first.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, validate_config, CONFIG_FILE_NAME};
pub use types::*;
