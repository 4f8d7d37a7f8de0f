//! 16550-style serial port.
//!
//! Registers are 32 bits wide on a 4-byte stride. Offsets `0x00` and `0x04`
//! are shared between the data/interrupt-enable registers and the divisor
//! latch, selected by `LCR.DLAB`; `0x08` reads IIR and writes FCR.
//!
//! Only the receive direction is modeled behaviorally: [`Uart::clock`]
//! samples the RX pin once per rising clock edge and assembles 8N1 frames
//! into a 16-entry FIFO. Transmit writes are accepted and counted.

use std::collections::VecDeque;

use crate::error::BusError;
use crate::regs::{Field, RegisterBlock};

/// Receive buffer (read, DLAB=0) / transmit holding (write, DLAB=0) / divisor low (DLAB=1).
pub const RBR: usize = 0x00;
/// Transmit holding register.
pub const THR: usize = 0x00;
/// Divisor latch low byte.
pub const DLL: usize = 0x00;
/// Interrupt enable (DLAB=0) / divisor high (DLAB=1).
pub const IER: usize = 0x04;
/// Divisor latch high byte.
pub const DLM: usize = 0x04;
/// Interrupt identification (read).
pub const IIR: usize = 0x08;
/// FIFO control (write).
pub const FCR: usize = 0x08;
/// Line control.
pub const LCR: usize = 0x0C;
/// Modem control.
pub const MCR: usize = 0x10;
/// Line status.
pub const LSR: usize = 0x14;
/// Modem status.
pub const MSR: usize = 0x18;
/// Scratch.
pub const SCR: usize = 0x1C;

/// Size of the register window in bytes.
pub const UART_SIZE: usize = 0x20;

/// Divisor latch access bit.
pub const LCR_DLAB: Field = Field::bit(LCR, 7);
/// Word length select (3 = 8 bits).
pub const LCR_WLS: Field = Field::new(LCR, 0, 2);
/// Stop bit select.
pub const LCR_STB: Field = Field::bit(LCR, 2);
/// Parity enable.
pub const LCR_PEN: Field = Field::bit(LCR, 3);

/// RX data available / threshold interrupt enable.
pub const IER_RX_TH: Field = Field::bit(IER, 0);
/// TX holding empty interrupt enable.
pub const IER_TX_EMPTY: Field = Field::bit(IER, 1);
/// RX line error interrupt enable.
pub const IER_RX_ERR: Field = Field::bit(IER, 2);

/// Data ready.
pub const LSR_DR: u32 = 0x01;
/// Overrun error.
pub const LSR_OE: u32 = 0x02;
/// Framing error.
pub const LSR_FE: u32 = 0x08;
/// Transmit holding register empty.
pub const LSR_THRE: u32 = 0x20;
/// Transmitter empty.
pub const LSR_TEMT: u32 = 0x40;

/// FCR: clear the receive FIFO.
pub const FCR_CLEAR_RX: u32 = 0x02;
/// FCR: clear the transmit FIFO.
pub const FCR_CLEAR_TX: u32 = 0x04;
/// FCR receive trigger level selector (bits 7:6).
pub const FCR_RX_TRIGGER_SHIFT: u32 = 6;

/// Receive FIFO depth.
pub const RX_FIFO_DEPTH: usize = 16;

/// Receive FIFO trigger level programmed through FCR bits 7:6.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RxTrigger {
    /// Interrupt on every byte.
    #[default]
    OneByte,
    /// Interrupt at 4 bytes.
    FourBytes,
    /// Interrupt at 8 bytes.
    EightBytes,
    /// Interrupt at 14 bytes.
    FourteenBytes,
}

impl RxTrigger {
    fn from_fcr(fcr: u32) -> Self {
        match (fcr >> FCR_RX_TRIGGER_SHIFT) & 0x3 {
            0 => RxTrigger::OneByte,
            1 => RxTrigger::FourBytes,
            2 => RxTrigger::EightBytes,
            _ => RxTrigger::FourteenBytes,
        }
    }

    /// Number of buffered bytes that raises the receive interrupt.
    pub fn level(self) -> usize {
        match self {
            RxTrigger::OneByte => 1,
            RxTrigger::FourBytes => 4,
            RxTrigger::EightBytes => 8,
            RxTrigger::FourteenBytes => 14,
        }
    }
}

/// Receiver sampling state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RxState {
    Idle,
    Start { count: u32 },
    Data { bit: u8, shift: u8, count: u32 },
    Stop { shift: u8, count: u32 },
}

/// Behavioral 16550-style UART.
#[derive(Debug)]
pub struct Uart {
    /// IER, LCR, MCR, LSR, MSR and SCR live here at their bus offsets.
    regs: RegisterBlock,
    dll: u8,
    dlm: u8,
    trigger: RxTrigger,
    rx_fifo: VecDeque<u8>,
    rx: RxState,
    tx_count: u64,
    rx_count: u64,
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}

impl Uart {
    /// Creates a UART in its reset state.
    pub fn new() -> Self {
        let mut uart = Self {
            regs: RegisterBlock::new(UART_SIZE),
            dll: 0,
            dlm: 0,
            trigger: RxTrigger::default(),
            rx_fifo: VecDeque::with_capacity(RX_FIFO_DEPTH),
            rx: RxState::Idle,
            tx_count: 0,
            rx_count: 0,
        };
        uart.reset();
        uart
    }

    /// Returns every register and the receiver to their reset values.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.dll = 0;
        self.dlm = 0;
        self.trigger = RxTrigger::default();
        self.rx_fifo.clear();
        self.rx = RxState::Idle;
        self.refresh_lsr();
    }

    fn dlab(&self) -> bool {
        self.regs.is_set(LCR_DLAB).unwrap_or(false)
    }

    fn lsr(&self) -> u32 {
        self.regs.read32(LSR).unwrap_or(0)
    }

    fn refresh_lsr(&mut self) {
        let mut lsr = self.lsr() & (LSR_OE | LSR_FE);
        lsr |= LSR_THRE | LSR_TEMT;
        if !self.rx_fifo.is_empty() {
            lsr |= LSR_DR;
        }
        self.regs.set32(LSR, lsr);
    }

    fn flag_line_error(&mut self, bits: u32) {
        self.regs.update32(LSR, 0, bits);
    }

    /// The 16-bit divisor latch value.
    pub fn divisor(&self) -> u16 {
        u16::from_le_bytes([self.dll, self.dlm])
    }

    /// Clock cycles per bit implied by the divisor latch (`divisor + 1`, as
    /// the board support package computes `clock / baud - 1`).
    pub fn bit_cycles(&self) -> u32 {
        u32::from(self.divisor()) + 1
    }

    /// Returns `true` once a non-zero divisor has been programmed.
    pub fn is_configured(&self) -> bool {
        self.divisor() != 0
    }

    /// Number of bytes waiting in the receive FIFO.
    pub fn rx_pending(&self) -> usize {
        self.rx_fifo.len()
    }

    /// Total bytes received since construction.
    pub fn rx_count(&self) -> u64 {
        self.rx_count
    }

    /// Total bytes written to THR since construction.
    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    /// Current receive trigger level.
    pub fn rx_trigger(&self) -> RxTrigger {
        self.trigger
    }

    /// Returns `true` while the receive or receive-error interrupt is asserted.
    pub fn interrupt_pending(&self) -> bool {
        self.rx_data_interrupt() || self.rx_error_interrupt()
    }

    fn rx_data_interrupt(&self) -> bool {
        self.regs.is_set(IER_RX_TH).unwrap_or(false) && self.rx_fifo.len() >= self.trigger.level()
    }

    fn rx_error_interrupt(&self) -> bool {
        self.regs.is_set(IER_RX_ERR).unwrap_or(false) && self.lsr() & (LSR_OE | LSR_FE) != 0
    }

    /// Reads a register. Reading RBR pops the receive FIFO and reading LSR
    /// clears the sticky error bits.
    pub fn read(&mut self, offset: usize) -> Result<u32, BusError> {
        match offset {
            RBR if self.dlab() => Ok(u32::from(self.dll)),
            RBR => {
                let byte = self.rx_fifo.pop_front().unwrap_or(0);
                self.refresh_lsr();
                Ok(u32::from(byte))
            }
            IER if self.dlab() => Ok(u32::from(self.dlm)),
            IIR => Ok(self.iir()),
            LSR => {
                let lsr = self.lsr();
                self.regs.modify32(LSR, LSR_OE | LSR_FE, 0)?;
                Ok(lsr)
            }
            IER | LCR | MCR | MSR | SCR => self.regs.read32(offset),
            _ => Err(BusError::Unmapped { offset }),
        }
    }

    /// Writes a register.
    pub fn write(&mut self, offset: usize, value: u32) -> Result<(), BusError> {
        match offset {
            DLL if self.dlab() => self.dll = value as u8,
            THR => {
                self.tx_count += 1;
                log::trace!("uart THR <- {:#04x}", value as u8);
            }
            DLM if self.dlab() => self.dlm = value as u8,
            IER => self.regs.write32(IER, value & 0x0F)?,
            FCR => {
                if value & FCR_CLEAR_RX != 0 {
                    self.rx_fifo.clear();
                }
                self.trigger = RxTrigger::from_fcr(value);
                self.refresh_lsr();
            }
            LCR | MCR | SCR => self.regs.write32(offset, value & 0xFF)?,
            LSR | MSR => {}
            _ => return Err(BusError::Unmapped { offset }),
        }
        Ok(())
    }

    fn iir(&self) -> u32 {
        const FIFO_ENABLED: u32 = 0xC0;
        if self.rx_error_interrupt() {
            FIFO_ENABLED | 0x06
        } else if self.rx_data_interrupt() {
            FIFO_ENABLED | 0x04
        } else {
            FIFO_ENABLED | 0x01
        }
    }

    /// Samples the RX pin. Call once per rising clock edge.
    ///
    /// Returns the byte completed on this edge, if any.
    pub fn clock(&mut self, rx: bool) -> Option<u8> {
        if !self.is_configured() {
            return None;
        }
        let bit = self.bit_cycles();
        let half = bit / 2;

        let (next, done) = match self.rx {
            RxState::Idle if !rx => (RxState::Start { count: 1 }, None),
            RxState::Idle => (RxState::Idle, None),
            RxState::Start { count } if count >= half => {
                if rx {
                    // Glitch shorter than half a bit.
                    (RxState::Idle, None)
                } else {
                    (
                        RxState::Data {
                            bit: 0,
                            shift: 0,
                            count: 1,
                        },
                        None,
                    )
                }
            }
            RxState::Start { count } => (RxState::Start { count: count + 1 }, None),
            RxState::Data { bit: b, shift, count } if count >= bit => {
                let shift = shift | (u8::from(rx) << b);
                if b == 7 {
                    (RxState::Stop { shift, count: 1 }, None)
                } else {
                    (
                        RxState::Data {
                            bit: b + 1,
                            shift,
                            count: 1,
                        },
                        None,
                    )
                }
            }
            RxState::Data { bit: b, shift, count } => (
                RxState::Data {
                    bit: b,
                    shift,
                    count: count + 1,
                },
                None,
            ),
            RxState::Stop { shift, count } if count >= bit => (RxState::Idle, Some((shift, rx))),
            RxState::Stop { shift, count } => (
                RxState::Stop {
                    shift,
                    count: count + 1,
                },
                None,
            ),
        };
        self.rx = next;

        let (byte, stop_ok) = done?;
        if !stop_ok {
            log::debug!("uart framing error on {byte:#04x}");
            self.flag_line_error(LSR_FE);
            return None;
        }
        if self.rx_fifo.len() >= RX_FIFO_DEPTH {
            log::debug!("uart overrun, dropping {byte:#04x}");
            self.flag_line_error(LSR_OE);
            return None;
        }
        self.rx_fifo.push_back(byte);
        self.rx_count += 1;
        self.refresh_lsr();
        Some(byte)
    }
}
