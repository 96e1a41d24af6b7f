//! Variable-width index codecs.
//!
//! Every entity family in a PMX file declares, in the header, how many bytes
//! one of its indices occupies. Vertex indices are unsigned; all other
//! families are signed and use `-1` to mean "unset".

use crate::{Error, Result};

/// Byte width of an index field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IndexWidth {
    #[default]
    One,
    Two,
    Four,
}

impl IndexWidth {
    /// Parse a header width byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            other => Err(Error::InvalidIndexWidth(other)),
        }
    }

    /// Number of bytes occupied by one index.
    pub const fn bytes(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Smallest width able to address `count` unsigned (vertex) indices.
    pub const fn for_unsigned(count: usize) -> Self {
        if count < 1 << 8 {
            Self::One
        } else if count < 1 << 16 {
            Self::Two
        } else {
            Self::Four
        }
    }

    /// Smallest width able to address `count` signed indices, keeping `-1` free.
    pub const fn for_signed(count: usize) -> Self {
        if count < 1 << 7 {
            Self::One
        } else if count < 1 << 15 {
            Self::Two
        } else {
            Self::Four
        }
    }

    /// Largest unsigned index representable at this width.
    pub(crate) const fn max_unsigned(self) -> u64 {
        match self {
            Self::One => u8::MAX as u64,
            Self::Two => u16::MAX as u64,
            Self::Four => u32::MAX as u64,
        }
    }

    /// Largest non-negative signed index representable at this width.
    pub(crate) const fn max_signed(self) -> u64 {
        match self {
            Self::One => i8::MAX as u64,
            Self::Two => i16::MAX as u64,
            Self::Four => i32::MAX as u64,
        }
    }
}
