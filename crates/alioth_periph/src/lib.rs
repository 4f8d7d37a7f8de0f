//! Register-level models of the Alioth SoC peripherals the testbench touches.
//!
//! The serial port receiver is modeled bit-accurately so that frames driven
//! onto the RX pin by the harness can be checked end to end. The interrupt
//! controllers are modeled at the register level.

#![warn(missing_docs)]

pub mod clint;
pub mod error;
pub mod map;
pub mod plic;
pub mod regs;
pub mod uart;

pub use clint::Clint;
pub use error::BusError;
pub use map::Region;
pub use plic::{Plic, Source};
pub use regs::{Field, RegisterBlock};
pub use uart::{RxTrigger, Uart};
