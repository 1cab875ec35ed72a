//! Generation-tagged block handles
//!
//! A [`Handle`] identifies one live allocation in a [`Heap`](crate::Heap).
//! It is a slot index paired with the generation the slot had when the
//! block was created. Freeing a block bumps its slot's generation, so a
//! handle kept past the block's lifetime simply stops resolving instead
//! of aliasing whatever reuses the slot.

use std::fmt;
use std::num::NonZeroU32;

/// Identity of one heap block: slot index plus slot generation.
///
/// Handles are plain 8-byte values. Equality and hashing cover both
/// fields, so a handle from a previous occupant of a reused slot never
/// compares equal to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: NonZeroU32,
}

impl Handle {
    /// Byte length of the wire encoding produced by [`Handle::to_bytes`].
    pub const ENCODED_LEN: usize = 8;

    pub(crate) fn new(index: u32, generation: NonZeroU32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the block registry.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when this block was allocated.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.get()
    }

    /// Encode as 8 little-endian bytes (index, then generation).
    ///
    /// Intended for storing references inside block payloads; a reference
    /// field that was never written stays all-zero and decodes as `None`,
    /// since generation zero never occurs in a live handle.
    #[inline]
    pub fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        bytes[..4].copy_from_slice(&self.index.to_le_bytes());
        bytes[4..].copy_from_slice(&self.generation.get().to_le_bytes());
        bytes
    }

    /// Decode the encoding produced by [`Handle::to_bytes`].
    ///
    /// Returns `None` for the all-zero-generation encoding.
    #[inline]
    pub fn from_bytes(bytes: [u8; Self::ENCODED_LEN]) -> Option<Self> {
        let index = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let raw_gen = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let generation = NonZeroU32::new(raw_gen)?;
        Some(Self { index, generation })
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}
