//! Behavioral stand-in for the SoC.
//!
//! [`ReferenceSoc`] wires the peripheral models from `alioth_periph` to the
//! testbench pins. On the first rising edge after reset it programs UART0
//! the way the board support package does (`SYSTEM_CLOCK / baud - 1`, 8N1,
//! FIFO enabled, receive interrupt routed through the PLIC) and from then on
//! services the receive interrupt in place of firmware, collecting every
//! byte it reads. Receiving the terminator byte raises `finished`.
//!
//! The TAP is a single bypass flip-flop: TDI is captured on each rising TCK
//! and presented on TDO.

use alioth_common::Frequency;
use alioth_periph::{plic, uart, BusError, Clint, Plic, Source, Uart};

use crate::model::{HardwareModel, Probe, TapInputs};

/// Vector the boot code installs for UART0 in the PLIC.
pub const UART0_VECTOR: u32 = 0x8000_0400;

/// Builder-style configuration for [`ReferenceSoc`].
#[derive(Clone, Copy, Debug)]
pub struct ReferenceSocConfig {
    /// Frequency of the clock the harness drives.
    pub clock: Frequency,
    /// Line rate the boot code programs.
    pub baud: u32,
    /// Byte that ends the run; `None` never finishes.
    pub terminator: Option<u8>,
    /// Whether the model asks for trace samples.
    pub dump_enabled: bool,
}

impl Default for ReferenceSocConfig {
    fn default() -> Self {
        Self {
            clock: Frequency::from_mhz(242),
            baud: 115_200,
            terminator: Some(0x04),
            dump_enabled: true,
        }
    }
}

/// Behavioral SoC model.
#[derive(Debug)]
pub struct ReferenceSoc {
    config: ReferenceSocConfig,
    clk: bool,
    prev_clk: bool,
    rst_n: bool,
    uart_rx: bool,
    tap: TapInputs,
    prev_tck: bool,
    tdo: bool,
    booted: bool,
    finished: bool,
    uart0: Uart,
    clint: Clint,
    plic: Plic,
    received: Vec<u8>,
    interrupts: u64,
}

impl ReferenceSoc {
    /// Creates a model in power-on state.
    pub fn new(config: ReferenceSocConfig) -> Self {
        Self {
            config,
            clk: false,
            prev_clk: false,
            rst_n: false,
            uart_rx: true,
            tap: TapInputs::default(),
            prev_tck: false,
            tdo: false,
            booted: false,
            finished: false,
            uart0: Uart::new(),
            clint: Clint::new(),
            plic: Plic::new(),
            received: Vec::new(),
            interrupts: 0,
        }
    }

    /// Bytes read from UART0 by the interrupt handler, in arrival order.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// UART0 receive interrupts serviced.
    pub fn interrupts(&self) -> u64 {
        self.interrupts
    }

    /// Current machine timer value.
    pub fn mtime(&self) -> u64 {
        self.clint.mtime()
    }

    /// UART0 model.
    pub fn uart0(&self) -> &Uart {
        &self.uart0
    }

    /// Divisor the boot code programs for the configured rates.
    pub fn boot_divisor(&self) -> u16 {
        let div = self
            .config
            .clock
            .cycles_per_floor(Frequency::from_hz(u64::from(self.config.baud)))
            .unwrap_or(0)
            .saturating_sub(1);
        u16::try_from(div).unwrap_or_else(|_| {
            log::warn!("UART divisor {div} does not fit in 16 bits, clamping");
            u16::MAX
        })
    }

    fn reset(&mut self) {
        self.uart0.reset();
        self.clint.reset();
        self.plic.reset();
        self.booted = false;
        self.finished = false;
    }

    fn boot(&mut self) -> Result<(), BusError> {
        let div = u32::from(self.boot_divisor());
        self.uart0.write(uart::LCR, 0x80)?;
        self.uart0.write(uart::DLM, (div >> 8) & 0xFF)?;
        self.uart0.write(uart::DLL, div & 0xFF)?;
        self.uart0.write(uart::FCR, 0xC6)?;
        self.uart0.write(uart::LCR, 0x03)?;
        // The BSP arms the 14-byte trigger; service every byte instead.
        self.uart0.write(uart::FCR, 0x06)?;
        self.uart0.write(uart::IER, 0x05)?;

        self.plic.write32(plic::VECTABLE + 4 * Source::Uart0.id(), UART0_VECTOR)?;
        self.plic.write32(plic::OBJS + 4 * Source::Uart0.id(), 0)?;
        self.plic.write8(plic::PRI + Source::Uart0.id(), 1)?;
        self.plic.write32(plic::INT_EN, 1 << Source::Uart0.id())?;
        log::debug!("reference SoC booted, UART0 divisor {div}");
        Ok(())
    }

    fn service_uart0(&mut self) -> Result<(), BusError> {
        self.interrupts += 1;
        let lsr = self.uart0.read(uart::LSR)?;
        if lsr & (uart::LSR_FE | uart::LSR_OE) != 0 {
            log::warn!("reference SoC UART0 line error, LSR={lsr:#04x}");
        }
        if lsr & uart::LSR_DR == 0 {
            return Ok(());
        }
        while self.uart0.read(uart::LSR)? & uart::LSR_DR != 0 {
            let byte = self.uart0.read(uart::RBR)? as u8;
            self.received.push(byte);
            if Some(byte) == self.config.terminator {
                log::info!("reference SoC received terminator {byte:#04x}");
                self.finished = true;
            }
        }
        Ok(())
    }

    fn rising_edge(&mut self) -> Result<(), BusError> {
        if !self.rst_n {
            self.reset();
            return Ok(());
        }
        if !self.booted {
            self.boot()?;
            self.booted = true;
        }

        self.clint.tick();
        self.uart0.clock(self.uart_rx);
        self.plic.set_line(Source::Uart0, self.uart0.interrupt_pending());
        if self.plic.update().is_some() && self.plic.read32(plic::MVEC)? == UART0_VECTOR {
            self.service_uart0()?;
            self.plic.set_line(Source::Uart0, self.uart0.interrupt_pending());
            self.plic.update();
        }
        Ok(())
    }
}

impl HardwareModel for ReferenceSoc {
    fn set_clk(&mut self, level: bool) {
        self.clk = level;
    }

    fn clk(&self) -> bool {
        self.clk
    }

    fn set_rst_n(&mut self, level: bool) {
        self.rst_n = level;
    }

    fn rst_n(&self) -> bool {
        self.rst_n
    }

    fn set_uart_rx(&mut self, level: bool) {
        self.uart_rx = level;
    }

    fn uart_rx(&self) -> bool {
        self.uart_rx
    }

    fn eval(&mut self) {
        if self.clk && !self.prev_clk {
            if let Err(e) = self.rising_edge() {
                log::error!("reference SoC bus fault: {e}");
            }
        }
        self.prev_clk = self.clk;

        if self.tap.tck && !self.prev_tck {
            self.tdo = self.tap.tdi;
        }
        self.prev_tck = self.tap.tck;
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn dump_enabled(&self) -> bool {
        self.config.dump_enabled
    }

    fn has_tap(&self) -> bool {
        true
    }

    fn drive_tap(&mut self, tap: TapInputs) {
        self.tap = tap;
    }

    fn tap(&self) -> TapInputs {
        self.tap
    }

    fn tdo(&self) -> bool {
        self.tdo
    }

    fn probes(&self) -> Vec<Probe> {
        vec![
            Probe::new("uart0_rx_count", 32, self.uart0.rx_count()),
            Probe::new("uart0_rx_pending", 5, self.uart0.rx_pending() as u64),
            Probe::new("uart0_irq", 1, u64::from(self.uart0.interrupt_pending())),
            Probe::new("mtime", 64, self.clint.mtime()),
            Probe::new("plic_irq", 1, u64::from(self.plic.irq())),
            Probe::new(
                "last_rx",
                8,
                self.received.last().copied().map_or(0, u64::from),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_soc() -> ReferenceSoc {
        ReferenceSoc::new(ReferenceSocConfig {
            clock: Frequency::from_hz(1_000_000),
            baud: 62_500,
            ..ReferenceSocConfig::default()
        })
    }

    fn cycle(soc: &mut ReferenceSoc, rx: bool) {
        soc.set_uart_rx(rx);
        soc.set_clk(true);
        soc.eval();
        soc.set_clk(false);
        soc.eval();
    }

    fn send(soc: &mut ReferenceSoc, byte: u8, bit: u32) {
        let frame = (1u16 << 9) | (u16::from(byte) << 1);
        for i in 0..10 {
            for _ in 0..bit {
                cycle(soc, (frame >> i) & 1 == 1);
            }
        }
    }

    #[test]
    fn boot_divisor_matches_bsp_formula() {
        assert_eq!(small_soc().boot_divisor(), 15);
        let board = ReferenceSoc::new(ReferenceSocConfig::default());
        assert_eq!(board.boot_divisor(), 2099);
    }

    #[test]
    fn stays_in_reset_while_asserted() {
        let mut soc = small_soc();
        for _ in 0..10 {
            cycle(&mut soc, true);
        }
        assert_eq!(soc.mtime(), 0);
        assert!(!soc.uart0().is_configured());
    }

    #[test]
    fn boots_after_reset_release() {
        let mut soc = small_soc();
        soc.set_rst_n(true);
        cycle(&mut soc, true);
        assert!(soc.uart0().is_configured());
        assert_eq!(soc.uart0().bit_cycles(), 16);
        assert_eq!(soc.mtime(), 1);
    }

    #[test]
    fn receives_bytes_through_interrupt() {
        let mut soc = small_soc();
        soc.set_rst_n(true);
        cycle(&mut soc, true);
        send(&mut soc, b'o', 16);
        send(&mut soc, b'k', 16);
        for _ in 0..16 {
            cycle(&mut soc, true);
        }
        assert_eq!(soc.received(), b"ok");
        assert_eq!(soc.interrupts(), 2);
        assert!(!soc.finished());
    }

    #[test]
    fn terminator_finishes() {
        let mut soc = small_soc();
        soc.set_rst_n(true);
        cycle(&mut soc, true);
        send(&mut soc, 0x04, 16);
        for _ in 0..16 {
            cycle(&mut soc, true);
        }
        assert!(soc.finished());
    }

    #[test]
    fn reset_clears_finish() {
        let mut soc = small_soc();
        soc.set_rst_n(true);
        cycle(&mut soc, true);
        send(&mut soc, 0x04, 16);
        for _ in 0..16 {
            cycle(&mut soc, true);
        }
        soc.set_rst_n(false);
        cycle(&mut soc, true);
        assert!(!soc.finished());
        assert_eq!(soc.mtime(), 0);
    }

    #[test]
    fn tap_bypass_captures_tdi_on_tck_rise() {
        let mut soc = small_soc();
        soc.drive_tap(TapInputs {
            tck: false,
            tms: false,
            tdi: true,
        });
        soc.eval();
        assert!(!soc.tdo());
        soc.drive_tap(TapInputs {
            tck: true,
            tms: false,
            tdi: true,
        });
        soc.eval();
        assert!(soc.tdo());
    }

    #[test]
    fn probes_have_fixed_layout() {
        let soc = small_soc();
        let names: Vec<&str> = soc.probes().iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            ["uart0_rx_count", "uart0_rx_pending", "uart0_irq", "mtime", "plic_irq", "last_rx"]
        );
    }
}
