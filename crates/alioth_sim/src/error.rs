//! Simulation error types for the testbench driver.
//!
//! All errors that can occur while setting up or running a testbench are
//! represented as variants of [`SimError`]. Ordinary completion of the model
//! is not an error.

use std::io;
use std::path::PathBuf;

/// Errors that can occur during testbench setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Tracing was requested but the trace file could not be created.
    #[error("cannot open trace file {}: {source}", path.display())]
    TraceOpen {
        /// The trace file that was requested.
        path: PathBuf,
        /// The underlying I/O failure.
        source: io::Error,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// The hardware model library could not be loaded or instantiated.
    #[error("cannot load model {}: {reason}", path.display())]
    ModelLoad {
        /// Path of the shared library.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A required entry point is missing from the model library.
    #[error("model library does not export `{symbol}`")]
    MissingSymbol {
        /// Name of the missing symbol.
        symbol: String,
    },

    /// The clock is too slow for the requested line rate.
    #[error("{clock_hz} Hz clock gives a zero-length bit at {baud} baud")]
    InvalidBitPeriod {
        /// Model clock frequency in Hertz.
        clock_hz: u64,
        /// Requested line rate.
        baud: u32,
    },

    /// The JTAG remote-bitbang listener could not be bound.
    #[error("cannot listen for JTAG on port {port}: {source}")]
    JtagBind {
        /// Requested TCP port.
        port: u16,
        /// The underlying socket failure.
        source: io::Error,
    },

    /// The thread reading injected bytes could not be started.
    #[error("cannot start input thread: {0}")]
    InputThread(io::Error),

    /// The model does not provide a requested capability.
    #[error("unsupported: {reason}")]
    Unsupported {
        /// Description of the missing capability.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trace_open() {
        let err = SimError::TraceOpen {
            path: PathBuf::from("out/tb_top.vcd"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        assert_eq!(
            err.to_string(),
            "cannot open trace file out/tb_top.vcd: no such directory"
        );
    }

    #[test]
    fn display_waveform_io() {
        let err = SimError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert_eq!(err.to_string(), "waveform I/O error: disk full");
    }

    #[test]
    fn display_model_load() {
        let err = SimError::ModelLoad {
            path: PathBuf::from("libtb.so"),
            reason: "file not found".into(),
        };
        assert_eq!(err.to_string(), "cannot load model libtb.so: file not found");
    }

    #[test]
    fn display_missing_symbol() {
        let err = SimError::MissingSymbol {
            symbol: "alioth_tb_eval".into(),
        };
        assert_eq!(
            err.to_string(),
            "model library does not export `alioth_tb_eval`"
        );
    }

    #[test]
    fn display_invalid_bit_period() {
        let err = SimError::InvalidBitPeriod {
            clock_hz: 1000,
            baud: 9600,
        };
        assert_eq!(
            err.to_string(),
            "1000 Hz clock gives a zero-length bit at 9600 baud"
        );
    }

    #[test]
    fn display_jtag_bind() {
        let err = SimError::JtagBind {
            port: 5555,
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            err.to_string(),
            "cannot listen for JTAG on port 5555: address in use"
        );
    }

    #[test]
    fn display_input_thread() {
        let err = SimError::InputThread(io::Error::new(io::ErrorKind::Other, "no threads"));
        assert_eq!(err.to_string(), "cannot start input thread: no threads");
    }

    #[test]
    fn display_unsupported() {
        let err = SimError::Unsupported {
            reason: "model has no native tracer".into(),
        };
        assert_eq!(err.to_string(), "unsupported: model has no native tracer");
    }
}
