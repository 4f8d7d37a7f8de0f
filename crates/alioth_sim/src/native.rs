//! Hardware models loaded from a shared library.
//!
//! The library wraps the generated model (for example a Verilator build of
//! `tb_top`) behind a small C ABI. Required exports:
//!
//! ```c
//! void *alioth_tb_new(void);
//! void  alioth_tb_destroy(void *tb);
//! void  alioth_tb_eval(void *tb, const TbSigIn *in, TbSigOut *out);
//! ```
//!
//! Optional exports, used when the trace format is `native`:
//!
//! ```c
//! int   alioth_tb_trace_open(void *tb, const char *path, int depth);
//! void  alioth_tb_trace_dump(void *tb, uint64_t tick);
//! void  alioth_tb_trace_close(void *tb);
//! ```

use std::ffi::{c_char, c_int, c_void, CString};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use alioth_common::Tick;
use libloading::Library;

use crate::error::SimError;
use crate::model::{HardwareModel, TapInputs};

/// Input pins, passed to `alioth_tb_eval`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TbSigIn {
    /// Clock.
    pub clk: bool,
    /// Active-low reset.
    pub rst_n: bool,
    /// Serial receive.
    pub uart_rx: bool,
    /// JTAG test clock.
    pub tck: bool,
    /// JTAG test mode select.
    pub tms: bool,
    /// JTAG test data in.
    pub tdi: bool,
}

/// Observable outputs, filled by `alioth_tb_eval`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TbSigOut {
    /// The model has executed its finish condition.
    pub finished: bool,
    /// The model wants a trace sample.
    pub dump_en: bool,
    /// JTAG test data out.
    pub tdo: bool,
}

type NewFn = unsafe extern "C" fn() -> *mut c_void;
type DestroyFn = unsafe extern "C" fn(*mut c_void);
type EvalFn = unsafe extern "C" fn(*mut c_void, *const TbSigIn, *mut TbSigOut);
type TraceOpenFn = unsafe extern "C" fn(*mut c_void, *const c_char, c_int) -> c_int;
type TraceDumpFn = unsafe extern "C" fn(*mut c_void, u64);
type TraceCloseFn = unsafe extern "C" fn(*mut c_void);

struct TraceFns {
    open: TraceOpenFn,
    dump: TraceDumpFn,
    close: TraceCloseFn,
}

/// A model instance living in a dynamically loaded library.
///
/// The instance is destroyed on drop, before the library is unloaded.
pub struct NativeModel {
    tb: NonNull<c_void>,
    eval_fn: EvalFn,
    destroy_fn: DestroyFn,
    trace: Option<TraceFns>,
    trace_open: bool,
    sig_in: TbSigIn,
    sig_out: TbSigOut,
    path: PathBuf,
    // Declared last so it is dropped after the function pointers are dead.
    _lib: Library,
}

fn required<T: Copy>(lib: &Library, symbol: &str) -> Result<T, SimError> {
    // SAFETY: the symbol type is fixed by the C ABI documented above.
    unsafe { lib.get::<T>(symbol.as_bytes()) }
        .map(|s| *s)
        .map_err(|_| SimError::MissingSymbol {
            symbol: symbol.to_string(),
        })
}

fn optional<T: Copy>(lib: &Library, symbol: &str) -> Option<T> {
    // SAFETY: as in `required`.
    unsafe { lib.get::<T>(symbol.as_bytes()) }.ok().map(|s| *s)
}

impl NativeModel {
    /// Loads the library and instantiates the model.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        // SAFETY: loading runs the library's initializers; the user chose it.
        let lib = unsafe { Library::new(path) }.map_err(|e| SimError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let new_fn: NewFn = required(&lib, "alioth_tb_new")?;
        let destroy_fn: DestroyFn = required(&lib, "alioth_tb_destroy")?;
        let eval_fn: EvalFn = required(&lib, "alioth_tb_eval")?;

        let trace = match (
            optional::<TraceOpenFn>(&lib, "alioth_tb_trace_open"),
            optional::<TraceDumpFn>(&lib, "alioth_tb_trace_dump"),
            optional::<TraceCloseFn>(&lib, "alioth_tb_trace_close"),
        ) {
            (Some(open), Some(dump), Some(close)) => Some(TraceFns { open, dump, close }),
            _ => None,
        };

        // SAFETY: `alioth_tb_new` takes no arguments and returns an owned handle.
        let raw = unsafe { new_fn() };
        let tb = NonNull::new(raw).ok_or_else(|| SimError::ModelLoad {
            path: path.to_path_buf(),
            reason: "alioth_tb_new returned null".into(),
        })?;

        log::info!(
            "loaded model {} (native tracing {})",
            path.display(),
            if trace.is_some() { "available" } else { "unavailable" }
        );

        Ok(Self {
            tb,
            eval_fn,
            destroy_fn,
            trace,
            trace_open: false,
            sig_in: TbSigIn {
                uart_rx: true,
                ..TbSigIn::default()
            },
            sig_out: TbSigOut::default(),
            path: path.to_path_buf(),
            _lib: lib,
        })
    }

    /// Library the model was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn trace_fns(&self) -> Result<&TraceFns, SimError> {
        self.trace.as_ref().ok_or_else(|| SimError::Unsupported {
            reason: format!("{} does not export the trace entry points", self.path.display()),
        })
    }
}

impl HardwareModel for NativeModel {
    fn set_clk(&mut self, level: bool) {
        self.sig_in.clk = level;
    }

    fn clk(&self) -> bool {
        self.sig_in.clk
    }

    fn set_rst_n(&mut self, level: bool) {
        self.sig_in.rst_n = level;
    }

    fn rst_n(&self) -> bool {
        self.sig_in.rst_n
    }

    fn set_uart_rx(&mut self, level: bool) {
        self.sig_in.uart_rx = level;
    }

    fn uart_rx(&self) -> bool {
        self.sig_in.uart_rx
    }

    fn eval(&mut self) {
        // SAFETY: `tb` is live until drop; both structs are #[repr(C)].
        unsafe { (self.eval_fn)(self.tb.as_ptr(), &self.sig_in, &mut self.sig_out) }
    }

    fn finished(&self) -> bool {
        self.sig_out.finished
    }

    fn dump_enabled(&self) -> bool {
        self.sig_out.dump_en
    }

    fn has_tap(&self) -> bool {
        true
    }

    fn drive_tap(&mut self, tap: TapInputs) {
        self.sig_in.tck = tap.tck;
        self.sig_in.tms = tap.tms;
        self.sig_in.tdi = tap.tdi;
    }

    fn tap(&self) -> TapInputs {
        TapInputs {
            tck: self.sig_in.tck,
            tms: self.sig_in.tms,
            tdi: self.sig_in.tdi,
        }
    }

    fn tdo(&self) -> bool {
        self.sig_out.tdo
    }

    fn trace_open(&mut self, path: &Path, depth: u32) -> Result<(), SimError> {
        let open = self.trace_fns()?.open;
        let c_path = CString::new(path.to_string_lossy().into_owned()).map_err(|_| {
            SimError::TraceOpen {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path contains a NUL byte",
                ),
            }
        })?;
        let depth = c_int::try_from(depth).unwrap_or(c_int::MAX);
        // SAFETY: `tb` is live and `c_path` outlives the call.
        let rc = unsafe { open(self.tb.as_ptr(), c_path.as_ptr(), depth) };
        if rc != 0 {
            return Err(SimError::TraceOpen {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("alioth_tb_trace_open returned {rc}"),
                ),
            });
        }
        self.trace_open = true;
        Ok(())
    }

    fn trace_dump(&mut self, tick: Tick) -> Result<(), SimError> {
        let dump = self.trace_fns()?.dump;
        // SAFETY: `tb` is live.
        unsafe { dump(self.tb.as_ptr(), tick.get()) };
        Ok(())
    }

    fn trace_close(&mut self) -> Result<(), SimError> {
        let close = self.trace_fns()?.close;
        if self.trace_open {
            // SAFETY: `tb` is live and its tracer was opened.
            unsafe { close(self.tb.as_ptr()) };
            self.trace_open = false;
        }
        Ok(())
    }
}

impl Drop for NativeModel {
    fn drop(&mut self) {
        if self.trace_open {
            let _ = self.trace_close();
        }
        // SAFETY: `tb` came from `alioth_tb_new` and is not used after this.
        unsafe { (self.destroy_fn)(self.tb.as_ptr()) };
    }
}
