//! Vectored platform interrupt controller.
//!
//! Each source has an enable bit in `INT_EN`, an 8-bit priority, a handler
//! vector and an argument word. [`Plic::update`] selects the highest priority
//! pending and enabled source (lowest id on ties) and latches its vector and
//! argument into `MVEC` and `MARG`.

use crate::error::BusError;
use crate::regs::RegisterBlock;

/// Interrupt enable bitmap, one bit per source.
pub const INT_EN: usize = 0x0000;
/// Vector of the currently selected source.
pub const MVEC: usize = 0x0100;
/// Argument of the currently selected source.
pub const MARG: usize = 0x0104;
/// Per-source priority bytes.
pub const PRI: usize = 0x1000;
/// Per-source handler vectors.
pub const VECTABLE: usize = 0x2000;
/// Per-source handler arguments.
pub const OBJS: usize = 0x3000;
/// Size of the register window in bytes.
pub const PLIC_SIZE: usize = 0x4000;

/// Number of interrupt sources.
pub const NUM_SOURCES: usize = 11;

/// Interrupt source ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Source {
    /// Timer channel 0.
    Timer0 = 0,
    /// Timer channel 1.
    Timer1 = 1,
    /// Timer channel 2.
    Timer2 = 2,
    /// Timer channel 3.
    Timer3 = 3,
    /// SPI controller.
    Spi = 4,
    /// I2C controller 0.
    I2c0 = 5,
    /// I2C controller 1.
    I2c1 = 6,
    /// Serial port 0.
    Uart0 = 7,
    /// Serial port 1.
    Uart1 = 8,
    /// GPIO bank 0.
    Gpio0 = 9,
    /// GPIO bank 1.
    Gpio1 = 10,
}

impl Source {
    /// All sources in id order.
    pub const ALL: [Source; NUM_SOURCES] = [
        Source::Timer0,
        Source::Timer1,
        Source::Timer2,
        Source::Timer3,
        Source::Spi,
        Source::I2c0,
        Source::I2c1,
        Source::Uart0,
        Source::Uart1,
        Source::Gpio0,
        Source::Gpio1,
    ];

    /// Numeric source id.
    pub fn id(self) -> usize {
        self as usize
    }
}

/// PLIC state.
#[derive(Debug)]
pub struct Plic {
    regs: RegisterBlock,
    pending: u32,
    selected: Option<Source>,
}

impl Default for Plic {
    fn default() -> Self {
        Self::new()
    }
}

impl Plic {
    /// Creates a PLIC with every source disabled.
    pub fn new() -> Self {
        Self {
            regs: RegisterBlock::new(PLIC_SIZE),
            pending: 0,
            selected: None,
        }
    }

    /// Returns the registers to their reset values.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.pending = 0;
        self.selected = None;
    }

    /// Asserts a source's request line.
    pub fn raise(&mut self, source: Source) {
        self.pending |= 1 << source.id();
    }

    /// Deasserts a source's request line.
    pub fn lower(&mut self, source: Source) {
        self.pending &= !(1 << source.id());
    }

    /// Drives a source's request line to `level`.
    pub fn set_line(&mut self, source: Source, level: bool) {
        if level {
            self.raise(source);
        } else {
            self.lower(source);
        }
    }

    /// Returns `true` if the source's request line is asserted.
    pub fn is_pending(&self, source: Source) -> bool {
        self.pending & (1 << source.id()) != 0
    }

    fn enabled_mask(&self) -> u32 {
        self.regs.read32(INT_EN).unwrap_or(0)
    }

    /// Sets the source's enable bit.
    pub fn enable(&mut self, source: Source) {
        self.regs.update32(INT_EN, 0, 1 << source.id());
    }

    /// Clears the source's enable bit.
    pub fn disable(&mut self, source: Source) {
        self.regs.update32(INT_EN, 1 << source.id(), 0);
    }

    /// Sets the source's priority.
    pub fn set_priority(&mut self, source: Source, priority: u8) {
        self.regs.set8(PRI + source.id(), priority);
    }

    /// Installs a handler vector and argument for the source.
    pub fn set_handler(&mut self, source: Source, vector: u32, arg: u32) {
        self.regs.set32(VECTABLE + 4 * source.id(), vector);
        self.regs.set32(OBJS + 4 * source.id(), arg);
    }

    fn priority(&self, source: Source) -> u8 {
        self.regs.read8(PRI + source.id()).unwrap_or(0)
    }

    /// Re-evaluates arbitration and returns the selected source.
    pub fn update(&mut self) -> Option<Source> {
        let active = self.pending & self.enabled_mask();
        let mut best: Option<Source> = None;
        for source in Source::ALL {
            if active & (1 << source.id()) == 0 {
                continue;
            }
            // Strictly greater keeps the lowest id on ties.
            if best.map_or(true, |b| self.priority(source) > self.priority(b)) {
                best = Some(source);
            }
        }

        if best != self.selected {
            log::trace!("plic selected {best:?}");
        }
        self.selected = best;
        let (vec, arg) = match best {
            Some(s) => (
                self.regs.read32(VECTABLE + 4 * s.id()).unwrap_or(0),
                self.regs.read32(OBJS + 4 * s.id()).unwrap_or(0),
            ),
            None => (0, 0),
        };
        self.regs.set32(MVEC, vec);
        self.regs.set32(MARG, arg);
        best
    }

    /// Source selected by the last [`Plic::update`].
    pub fn selected(&self) -> Option<Source> {
        self.selected
    }

    /// Returns `true` while some enabled source is selected.
    pub fn irq(&self) -> bool {
        self.selected.is_some()
    }

    fn check_region(offset: usize, width: usize) -> Result<(), BusError> {
        let ok = match offset {
            INT_EN | MVEC | MARG => width == 4,
            o if (PRI..PRI + NUM_SOURCES).contains(&o) => true,
            o if (VECTABLE..VECTABLE + 4 * NUM_SOURCES).contains(&o) => width == 4,
            o if (OBJS..OBJS + 4 * NUM_SOURCES).contains(&o) => width == 4,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(BusError::Unmapped { offset })
        }
    }

    /// Byte read. Only priority bytes are byte-addressable.
    pub fn read8(&self, offset: usize) -> Result<u8, BusError> {
        Self::check_region(offset, 1)?;
        self.regs.read8(offset)
    }

    /// Word read.
    pub fn read32(&self, offset: usize) -> Result<u32, BusError> {
        Self::check_region(offset, 4)?;
        self.regs.read32(offset)
    }

    /// Byte write. Only priority bytes are byte-addressable.
    pub fn write8(&mut self, offset: usize, value: u8) -> Result<(), BusError> {
        Self::check_region(offset, 1)?;
        self.regs.write8(offset, value)
    }

    /// Word write. `MVEC` and `MARG` are read-only.
    pub fn write32(&mut self, offset: usize, value: u32) -> Result<(), BusError> {
        Self::check_region(offset, 4)?;
        if offset == MVEC || offset == MARG {
            return Ok(());
        }
        let mask = if offset == INT_EN {
            (1u32 << NUM_SOURCES) - 1
        } else {
            u32::MAX
        };
        self.regs.write32(offset, value & mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_match_board_numbering() {
        assert_eq!(Source::Uart0.id(), 7);
        assert_eq!(Source::Gpio1.id(), 10);
        assert_eq!(Source::ALL.len(), NUM_SOURCES);
    }

    #[test]
    fn disabled_source_is_not_selected() {
        let mut plic = Plic::new();
        plic.raise(Source::Uart0);
        assert_eq!(plic.update(), None);
        assert!(!plic.irq());
    }

    #[test]
    fn selects_and_latches_vector() {
        let mut plic = Plic::new();
        plic.set_handler(Source::Uart0, 0x8000_1000, 0x42);
        plic.enable(Source::Uart0);
        plic.raise(Source::Uart0);
        assert_eq!(plic.update(), Some(Source::Uart0));
        assert_eq!(plic.read32(MVEC).unwrap(), 0x8000_1000);
        assert_eq!(plic.read32(MARG).unwrap(), 0x42);

        plic.lower(Source::Uart0);
        assert_eq!(plic.update(), None);
        assert_eq!(plic.read32(MVEC).unwrap(), 0);
    }

    #[test]
    fn priority_then_lowest_id() {
        let mut plic = Plic::new();
        for s in [Source::Timer1, Source::Uart0, Source::Gpio0] {
            plic.enable(s);
            plic.raise(s);
        }
        assert_eq!(plic.update(), Some(Source::Timer1));

        plic.set_priority(Source::Gpio0, 5);
        assert_eq!(plic.update(), Some(Source::Gpio0));

        plic.set_priority(Source::Uart0, 5);
        assert_eq!(plic.update(), Some(Source::Uart0));
    }

    #[test]
    fn bus_regions() {
        let mut plic = Plic::new();
        plic.write8(PRI + 7, 3).unwrap();
        assert_eq!(plic.read8(PRI + 7).unwrap(), 3);
        plic.write32(INT_EN, u32::MAX).unwrap();
        assert_eq!(plic.read32(INT_EN).unwrap(), 0x7FF);
        plic.write32(MVEC, 0x1234).unwrap();
        assert_eq!(plic.read32(MVEC).unwrap(), 0);
        assert_eq!(plic.read8(INT_EN), Err(BusError::Unmapped { offset: INT_EN }));
        assert_eq!(
            plic.read32(PRI + NUM_SOURCES + 1),
            Err(BusError::Unmapped {
                offset: PRI + NUM_SOURCES + 1
            })
        );
    }

    #[test]
    fn every_source_fits_the_register_map() {
        let mut plic = Plic::new();
        for s in Source::ALL {
            plic.set_priority(s, s.id() as u8);
            plic.set_handler(s, 0x100 + s.id() as u32, s.id() as u32);
            plic.enable(s);
        }
        plic.raise(Source::Gpio1);
        assert_eq!(plic.update(), Some(Source::Gpio1));
        assert_eq!(plic.read32(MVEC).unwrap(), 0x100 + 10);
        assert_eq!(plic.read32(MARG).unwrap(), 10);

        plic.disable(Source::Gpio1);
        assert_eq!(plic.update(), None);
    }
}
