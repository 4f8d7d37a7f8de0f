//! Bus access errors for memory-mapped register blocks.

/// Errors that can occur when accessing a register block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The access extends past the end of the register block.
    #[error("{width}-byte access at offset {offset:#x} is outside the {size:#x}-byte block")]
    OutOfRange {
        /// Byte offset of the access.
        offset: usize,
        /// Access width in bytes.
        width: usize,
        /// Size of the register block in bytes.
        size: usize,
    },

    /// The access is not naturally aligned to its width.
    #[error("misaligned {width}-byte access at offset {offset:#x}")]
    Misaligned {
        /// Byte offset of the access.
        offset: usize,
        /// Access width in bytes.
        width: usize,
    },

    /// No register is decoded at the given offset.
    #[error("no register at offset {offset:#x}")]
    Unmapped {
        /// Byte offset of the access.
        offset: usize,
    },
}
