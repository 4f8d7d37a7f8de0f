//! Register blocks backed by fixed-size little-endian byte buffers.
//!
//! Peripheral register layouts are described by byte offsets and [`Field`]
//! descriptors rather than packed structs, so no layout ever depends on how
//! a compiler arranges bit-fields. All multi-byte accesses are little-endian
//! and must be naturally aligned.

use std::ops::Range;

use crate::error::BusError;

/// A bit field inside a 32-bit register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// Byte offset of the containing 32-bit register.
    pub offset: usize,
    /// Position of the least significant bit of the field.
    pub shift: u32,
    /// Number of bits in the field (1..=32).
    pub width: u32,
}

impl Field {
    /// Describes a field of `width` bits starting at bit `shift` of the
    /// register at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the field does not fit into 32 bits. Fields are declared as
    /// constants, so this fires at compile time.
    pub const fn new(offset: usize, shift: u32, width: u32) -> Self {
        assert!(width >= 1 && shift + width <= 32, "field must fit in 32 bits");
        Self {
            offset,
            shift,
            width,
        }
    }

    /// A single-bit field.
    pub const fn bit(offset: usize, bit: u32) -> Self {
        Self::new(offset, bit, 1)
    }

    /// The unshifted value mask, e.g. `0b11` for a two-bit field.
    pub const fn value_mask(&self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// The mask of the field's bits in place within the register.
    pub const fn mask(&self) -> u32 {
        self.value_mask() << self.shift
    }
}

/// A fixed-size register block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBlock {
    bytes: Box<[u8]>,
}

impl RegisterBlock {
    /// Creates a zero-filled block of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Returns the block size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Zero-fills the whole block.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    fn span(&self, offset: usize, width: usize) -> Result<Range<usize>, BusError> {
        if offset % width != 0 {
            return Err(BusError::Misaligned { offset, width });
        }
        let end = offset
            .checked_add(width)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(BusError::OutOfRange {
                offset,
                width,
                size: self.bytes.len(),
            })?;
        Ok(offset..end)
    }

    fn read_array<const W: usize>(&self, offset: usize) -> Result<[u8; W], BusError> {
        let range = self.span(offset, W)?;
        let mut out = [0u8; W];
        out.copy_from_slice(&self.bytes[range]);
        Ok(out)
    }

    fn write_array<const W: usize>(&mut self, offset: usize, data: [u8; W]) -> Result<(), BusError> {
        let range = self.span(offset, W)?;
        self.bytes[range].copy_from_slice(&data);
        Ok(())
    }

    /// Reads one byte.
    pub fn read8(&self, offset: usize) -> Result<u8, BusError> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    /// Reads a little-endian half-word.
    pub fn read16(&self, offset: usize) -> Result<u16, BusError> {
        Ok(u16::from_le_bytes(self.read_array(offset)?))
    }

    /// Reads a little-endian word.
    pub fn read32(&self, offset: usize) -> Result<u32, BusError> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    /// Reads a little-endian double-word.
    pub fn read64(&self, offset: usize) -> Result<u64, BusError> {
        Ok(u64::from_le_bytes(self.read_array(offset)?))
    }

    /// Writes one byte.
    pub fn write8(&mut self, offset: usize, value: u8) -> Result<(), BusError> {
        self.write_array(offset, [value])
    }

    /// Writes a little-endian half-word.
    pub fn write16(&mut self, offset: usize, value: u16) -> Result<(), BusError> {
        self.write_array(offset, value.to_le_bytes())
    }

    /// Writes a little-endian word.
    pub fn write32(&mut self, offset: usize, value: u32) -> Result<(), BusError> {
        self.write_array(offset, value.to_le_bytes())
    }

    /// Writes a little-endian double-word.
    pub fn write64(&mut self, offset: usize, value: u64) -> Result<(), BusError> {
        self.write_array(offset, value.to_le_bytes())
    }

    /// Read-modify-write of a word: clears the `clear` bits, then sets the
    /// `set` bits.
    pub fn modify32(&mut self, offset: usize, clear: u32, set: u32) -> Result<(), BusError> {
        let value = self.read32(offset)?;
        self.write32(offset, (value & !clear) | set)
    }

    /// Reads a field, returning its value shifted down to bit 0.
    pub fn read_field(&self, field: Field) -> Result<u32, BusError> {
        Ok((self.read32(field.offset)? >> field.shift) & field.value_mask())
    }

    /// Writes a field, leaving the other bits of the register untouched.
    ///
    /// Bits of `value` above the field width are discarded.
    pub fn write_field(&mut self, field: Field, value: u32) -> Result<(), BusError> {
        let placed = (value & field.value_mask()) << field.shift;
        self.modify32(field.offset, field.mask(), placed)
    }

    /// Returns `true` if any bit of a field is set.
    pub fn is_set(&self, field: Field) -> Result<bool, BusError> {
        Ok(self.read_field(field)? != 0)
    }

    /// Writes a byte at an offset the owning model maps itself.
    #[track_caller]
    pub(crate) fn set8(&mut self, offset: usize, value: u8) {
        mapped(self.write8(offset, value));
    }

    /// Writes a word at an offset the owning model maps itself.
    #[track_caller]
    pub(crate) fn set32(&mut self, offset: usize, value: u32) {
        mapped(self.write32(offset, value));
    }

    /// Writes a double-word at an offset the owning model maps itself.
    #[track_caller]
    pub(crate) fn set64(&mut self, offset: usize, value: u64) {
        mapped(self.write64(offset, value));
    }

    /// [`modify32`](Self::modify32) at an offset the owning model maps itself.
    #[track_caller]
    pub(crate) fn update32(&mut self, offset: usize, clear: u32, set: u32) {
        mapped(self.modify32(offset, clear, set));
    }
}

/// Reports a failed access at a fixed model-owned offset.
#[track_caller]
fn mapped(result: Result<(), BusError>) {
    if let Err(e) = result {
        if cfg!(debug_assertions) {
            panic!("internal register access failed: {e}");
        }
        log::error!("internal register access failed: {e}");
    }
}
