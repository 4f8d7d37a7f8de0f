//! Serial frame generation for the model's RX pin.
//!
//! Frames are 8N1: a low start bit, eight data bits LSB first, and a high
//! stop bit, each held for [`BitPeriod`] rising clock edges. The line idles
//! high between frames.

use std::num::NonZeroU64;

use alioth_common::Frequency;

use crate::error::SimError;

/// Bits per frame: start, eight data bits, stop.
pub const FRAME_BITS: u8 = 10;

/// Rising clock edges per serial bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitPeriod(NonZeroU64);

impl BitPeriod {
    /// Computes `round(clock / baud)`, rounding halves up.
    ///
    /// The rounding error is not carried across bits or frames.
    pub fn from_rates(clock: Frequency, baud: u32) -> Result<Self, SimError> {
        let invalid = SimError::InvalidBitPeriod {
            clock_hz: clock.hz(),
            baud,
        };
        clock
            .cycles_per(Frequency::from_hz(u64::from(baud)))
            .and_then(NonZeroU64::new)
            .map(Self)
            .ok_or(invalid)
    }

    /// A period of exactly `edges` rising edges, or `None` for zero.
    pub fn from_edges(edges: u64) -> Option<Self> {
        NonZeroU64::new(edges).map(Self)
    }

    /// Number of rising edges per bit.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Encoder state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    /// Line held high, waiting for a byte.
    Idle,
    /// Shifting out a frame.
    Sending {
        /// Frame bits, start bit in bit 0.
        frame: u16,
        /// Bit currently on the line, `0..10`.
        bit_index: u8,
        /// Rising edges already spent on the current bit.
        tick_in_bit: u64,
    },
}

/// Drives one frame at a time onto the RX line.
#[derive(Debug)]
pub struct UartFrameEncoder {
    period: BitPeriod,
    state: FrameState,
    level: bool,
    frames_started: u64,
    frames_completed: u64,
}

impl UartFrameEncoder {
    /// Creates an idle encoder.
    pub fn new(period: BitPeriod) -> Self {
        Self {
            period,
            state: FrameState::Idle,
            level: true,
            frames_started: 0,
            frames_completed: 0,
        }
    }

    /// Builds the ten-bit line pattern for `byte`, start bit first.
    pub fn frame(byte: u8) -> u16 {
        (1 << 9) | (u16::from(byte) << 1)
    }

    /// Advances by one rising clock edge and returns the level to drive.
    ///
    /// `pop_byte` is only called when the encoder is idle and
    /// `has_pending_byte` is set. Must not be called on falling edges.
    pub fn on_tick<F>(&mut self, has_pending_byte: bool, pop_byte: F) -> bool
    where
        F: FnOnce() -> Option<u8>,
    {
        if self.state == FrameState::Idle && has_pending_byte {
            if let Some(byte) = pop_byte() {
                log::trace!("uart tx {byte:#04x}");
                self.frames_started += 1;
                self.state = FrameState::Sending {
                    frame: Self::frame(byte),
                    bit_index: 0,
                    tick_in_bit: 0,
                };
            }
        }

        if let FrameState::Sending {
            frame,
            bit_index,
            tick_in_bit,
        } = self.state
        {
            if tick_in_bit == 0 {
                self.level = (frame >> bit_index) & 1 == 1;
            }
            let tick_in_bit = tick_in_bit + 1;
            self.state = if tick_in_bit < self.period.get() {
                FrameState::Sending {
                    frame,
                    bit_index,
                    tick_in_bit,
                }
            } else if bit_index + 1 < FRAME_BITS {
                FrameState::Sending {
                    frame,
                    bit_index: bit_index + 1,
                    tick_in_bit: 0,
                }
            } else {
                self.frames_completed += 1;
                self.level = true;
                FrameState::Idle
            };
        }

        self.level
    }

    /// Current encoder state.
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Returns `true` while no frame is in flight.
    pub fn is_idle(&self) -> bool {
        self.state == FrameState::Idle
    }

    /// Level returned by the last [`on_tick`](UartFrameEncoder::on_tick).
    pub fn level(&self) -> bool {
        self.level
    }

    /// Configured bit period.
    pub fn period(&self) -> BitPeriod {
        self.period
    }

    /// Bytes taken from the queue so far.
    pub fn frames_started(&self) -> u64 {
        self.frames_started
    }

    /// Frames whose stop bit has fully elapsed.
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn run(encoder: &mut UartFrameEncoder, queue: &mut VecDeque<u8>, edges: u64) -> Vec<bool> {
        (0..edges)
            .map(|_| {
                let pending = !queue.is_empty();
                encoder.on_tick(pending, || queue.pop_front())
            })
            .collect()
    }

    /// Collapses a level trace into (level, run length) pairs.
    fn runs(levels: &[bool]) -> Vec<(bool, u64)> {
        let mut out: Vec<(bool, u64)> = Vec::new();
        for &l in levels {
            match out.last_mut() {
                Some((level, n)) if *level == l => *n += 1,
                _ => out.push((l, 1)),
            }
        }
        out
    }

    #[test]
    fn bit_period_for_board_clock() {
        let p = BitPeriod::from_rates(Frequency::from_mhz(242), 115_200).unwrap();
        assert_eq!(p.get(), 2101);
    }

    #[test]
    fn bit_period_rounds_half_up() {
        assert_eq!(BitPeriod::from_rates(Frequency::from_hz(10), 4).unwrap().get(), 3);
        assert_eq!(BitPeriod::from_rates(Frequency::from_hz(9), 4).unwrap().get(), 2);
    }

    #[test]
    fn bit_period_zero_is_error() {
        let err = BitPeriod::from_rates(Frequency::from_hz(100), 1000).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidBitPeriod {
                clock_hz: 100,
                baud: 1000
            }
        ));
        assert!(BitPeriod::from_rates(Frequency::from_mhz(1), 0).is_err());
        assert!(BitPeriod::from_edges(0).is_none());
    }

    #[test]
    fn frame_layout() {
        assert_eq!(UartFrameEncoder::frame(0x41), 0b10_1000_0010);
        assert_eq!(UartFrameEncoder::frame(0xFF), 0x3FE);
    }

    #[test]
    fn letter_a_at_board_rates() {
        let period = BitPeriod::from_rates(Frequency::from_mhz(242), 115_200).unwrap();
        let mut enc = UartFrameEncoder::new(period);
        let mut q = VecDeque::from([0x41]);
        let levels = run(&mut enc, &mut q, 10 * 2101);

        let expected = [false, true, false, false, false, false, false, true, false, true];
        for (bit, want) in expected.iter().enumerate() {
            let span = &levels[bit * 2101..(bit + 1) * 2101];
            assert!(span.iter().all(|l| l == want), "bit {bit}");
        }
        assert!(enc.is_idle());
        assert_eq!(enc.frames_completed(), 1);
    }

    #[test]
    fn frame_lasts_ten_periods() {
        let mut enc = UartFrameEncoder::new(BitPeriod::from_edges(3).unwrap());
        let mut q = VecDeque::from([0x00]);
        let levels = run(&mut enc, &mut q, 40);
        // Start plus eight zero data bits, then stop, then idle.
        assert_eq!(runs(&levels), vec![(false, 27), (true, 13)]);
        assert_eq!(enc.frames_completed(), 1);
    }

    #[test]
    fn back_to_back_frames_do_not_overlap() {
        let mut enc = UartFrameEncoder::new(BitPeriod::from_edges(2).unwrap());
        let mut q = VecDeque::from([0xFF, 0x00]);
        let levels = run(&mut enc, &mut q, 44);
        // 0xFF: start(2) then data+stop high(18); 0x00: start+data low(18), stop(2).
        assert_eq!(
            runs(&levels),
            vec![(false, 2), (true, 18), (false, 18), (true, 6)]
        );
        assert_eq!(enc.frames_started(), 2);
        assert_eq!(enc.frames_completed(), 2);
    }

    #[test]
    fn second_byte_waits_for_stop_bit() {
        let mut enc = UartFrameEncoder::new(BitPeriod::from_edges(1).unwrap());
        let mut q = VecDeque::from([0xAA, 0x55]);
        let mut popped_at = Vec::new();
        for edge in 0..20u32 {
            let pending = !q.is_empty();
            enc.on_tick(pending, || {
                popped_at.push(edge);
                q.pop_front()
            });
        }
        assert_eq!(popped_at, vec![0, 10]);
    }

    #[test]
    fn idle_without_bytes_is_idempotent() {
        let mut enc = UartFrameEncoder::new(BitPeriod::from_edges(5).unwrap());
        for _ in 0..100 {
            let level = enc.on_tick(false, || panic!("queue must not be touched"));
            assert!(level);
            assert_eq!(enc.state(), FrameState::Idle);
        }
        assert_eq!(enc.frames_started(), 0);
    }

    #[test]
    fn pending_flag_with_empty_pop_stays_idle() {
        let mut enc = UartFrameEncoder::new(BitPeriod::from_edges(5).unwrap());
        assert!(enc.on_tick(true, || None));
        assert!(enc.is_idle());
    }
}
