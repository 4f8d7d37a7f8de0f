//! Alioth SoC physical memory map.

/// Base address of the APB peripheral window.
pub const PERIPH_BASE: u32 = 0x8400_0000;

/// Timer / PWM block.
pub const PWM_BASE: u32 = PERIPH_BASE;
/// SPI controller 0.
pub const SPI0_BASE: u32 = PERIPH_BASE + 0x1000;
/// I2C controller 0.
pub const I2C0_BASE: u32 = PERIPH_BASE + 0x2000;
/// I2C controller 1.
pub const I2C1_BASE: u32 = PERIPH_BASE + 0x3000;
/// Serial port 0, the console and RX injection target.
pub const UART0_BASE: u32 = PERIPH_BASE + 0x4000;
/// Serial port 1.
pub const UART1_BASE: u32 = PERIPH_BASE + 0x5000;
/// GPIO bank 0.
pub const GPIO0_BASE: u32 = PERIPH_BASE + 0x6000;
/// GPIO bank 1.
pub const GPIO1_BASE: u32 = PERIPH_BASE + 0x7000;

/// Core-local interruptor.
pub const CLINT_BASE: u32 = 0x0200_0000;
/// Platform interrupt controller.
pub const PLIC_BASE: u32 = 0x0C00_0000;

/// Clock the board support package assumes when it programs divisors.
pub const SYSTEM_CLOCK_HZ: u64 = 100_000_000;

/// A decoded peripheral window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    /// Timer / PWM block.
    Pwm,
    /// SPI controller 0.
    Spi0,
    /// I2C controller 0.
    I2c0,
    /// I2C controller 1.
    I2c1,
    /// Serial port 0.
    Uart0,
    /// Serial port 1.
    Uart1,
    /// GPIO bank 0.
    Gpio0,
    /// GPIO bank 1.
    Gpio1,
    /// Core-local interruptor.
    Clint,
    /// Platform interrupt controller.
    Plic,
}

impl Region {
    /// Decodes a physical address into a peripheral window and the offset
    /// inside it.
    pub fn decode(addr: u32) -> Option<(Region, usize)> {
        const APB_SLOT: u32 = 0x1000;
        const APB_SLOTS: [Region; 8] = [
            Region::Pwm,
            Region::Spi0,
            Region::I2c0,
            Region::I2c1,
            Region::Uart0,
            Region::Uart1,
            Region::Gpio0,
            Region::Gpio1,
        ];

        if let Some(off) = addr.checked_sub(PERIPH_BASE) {
            let slot = (off / APB_SLOT) as usize;
            if slot < APB_SLOTS.len() {
                return Some((APB_SLOTS[slot], (off % APB_SLOT) as usize));
            }
        }
        if (CLINT_BASE..CLINT_BASE + crate::clint::CLINT_SIZE as u32).contains(&addr) {
            return Some((Region::Clint, (addr - CLINT_BASE) as usize));
        }
        if (PLIC_BASE..PLIC_BASE + crate::plic::PLIC_SIZE as u32).contains(&addr) {
            return Some((Region::Plic, (addr - PLIC_BASE) as usize));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_uart0() {
        assert_eq!(Region::decode(UART0_BASE + 0x14), Some((Region::Uart0, 0x14)));
    }

    #[test]
    fn decode_apb_edges() {
        assert_eq!(Region::decode(PWM_BASE), Some((Region::Pwm, 0)));
        assert_eq!(Region::decode(GPIO1_BASE + 0xFFF), Some((Region::Gpio1, 0xFFF)));
        assert_eq!(Region::decode(PERIPH_BASE + 0x8000), None);
    }

    #[test]
    fn decode_interrupt_controllers() {
        assert_eq!(Region::decode(CLINT_BASE + 0xBFF8), Some((Region::Clint, 0xBFF8)));
        assert_eq!(Region::decode(PLIC_BASE + 0x2000), Some((Region::Plic, 0x2000)));
        assert_eq!(Region::decode(0x1000_0000), None);
    }
}
