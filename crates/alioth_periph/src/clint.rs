//! Core-local interruptor: machine timer and software interrupt.

use crate::error::BusError;
use crate::regs::RegisterBlock;

/// Machine software interrupt pending (bit 0).
pub const MSIP: usize = 0x0000;
/// Machine timer compare, 64 bits.
pub const MTIMECMP: usize = 0x4000;
/// Machine timer, 64 bits.
pub const MTIME: usize = 0xBFF8;
/// Size of the register window in bytes.
pub const CLINT_SIZE: usize = 0xC000;

/// CLINT state. `mtime` advances once per [`Clint::tick`].
#[derive(Debug)]
pub struct Clint {
    regs: RegisterBlock,
}

impl Default for Clint {
    fn default() -> Self {
        Self::new()
    }
}

impl Clint {
    /// Creates a CLINT with `mtime = 0` and the compare register parked at
    /// its maximum so no timer interrupt is pending.
    pub fn new() -> Self {
        let mut clint = Self {
            regs: RegisterBlock::new(CLINT_SIZE),
        };
        clint.reset();
        clint
    }

    /// Returns the registers to their reset values.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.regs.set64(MTIMECMP, u64::MAX);
    }

    /// Advances `mtime` by one.
    pub fn tick(&mut self) {
        let now = self.mtime();
        self.regs.set64(MTIME, now.wrapping_add(1));
    }

    /// Current timer value.
    pub fn mtime(&self) -> u64 {
        self.regs.read64(MTIME).unwrap_or(0)
    }

    /// Current compare value.
    pub fn mtimecmp(&self) -> u64 {
        self.regs.read64(MTIMECMP).unwrap_or(u64::MAX)
    }

    /// `mtime >= mtimecmp`.
    pub fn timer_pending(&self) -> bool {
        self.mtime() >= self.mtimecmp()
    }

    /// MSIP bit 0.
    pub fn software_pending(&self) -> bool {
        self.regs.read32(MSIP).map(|v| v & 1 != 0).unwrap_or(false)
    }

    fn check_mapped(offset: usize) -> Result<(), BusError> {
        let word = offset & !0x3;
        let mapped = word == MSIP
            || (MTIMECMP..MTIMECMP + 8).contains(&word)
            || (MTIME..MTIME + 8).contains(&word);
        if mapped {
            Ok(())
        } else {
            Err(BusError::Unmapped { offset })
        }
    }

    /// 32-bit bus read.
    pub fn read32(&self, offset: usize) -> Result<u32, BusError> {
        Self::check_mapped(offset)?;
        self.regs.read32(offset)
    }

    /// 32-bit bus write. Only bit 0 of MSIP is implemented.
    pub fn write32(&mut self, offset: usize, value: u32) -> Result<(), BusError> {
        Self::check_mapped(offset)?;
        let value = if offset == MSIP { value & 1 } else { value };
        self.regs.write32(offset, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state() {
        let clint = Clint::new();
        assert_eq!(clint.mtime(), 0);
        assert_eq!(clint.mtimecmp(), u64::MAX);
        assert!(!clint.timer_pending());
        assert!(!clint.software_pending());
    }

    #[test]
    fn timer_fires_at_compare() {
        let mut clint = Clint::new();
        clint.write32(MTIMECMP, 3).unwrap();
        clint.write32(MTIMECMP + 4, 0).unwrap();
        clint.tick();
        clint.tick();
        assert!(!clint.timer_pending());
        clint.tick();
        assert!(clint.timer_pending());
        assert_eq!(clint.read32(MTIME).unwrap(), 3);
        assert_eq!(clint.read32(MTIME + 4).unwrap(), 0);
    }

    #[test]
    fn msip_keeps_bit_zero_only() {
        let mut clint = Clint::new();
        clint.write32(MSIP, 0xFFFF_FFFF).unwrap();
        assert_eq!(clint.read32(MSIP).unwrap(), 1);
        assert!(clint.software_pending());
    }

    #[test]
    fn gaps_are_unmapped() {
        let clint = Clint::new();
        assert_eq!(clint.read32(0x100), Err(BusError::Unmapped { offset: 0x100 }));
    }
}
