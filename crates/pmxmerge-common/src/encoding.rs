//! Text encodings used by length-prefixed strings.

use crate::{Error, Result};

/// Charset declared in the file header for every string in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-16 little endian (selector 0).
    #[default]
    Utf16Le,
    /// UTF-8 (selector 1).
    Utf8,
}

impl TextEncoding {
    /// Map the header selector byte to an encoding.
    pub fn from_selector(selector: u8) -> Result<Self> {
        match selector {
            0 => Ok(Self::Utf16Le),
            1 => Ok(Self::Utf8),
            other => Err(Error::InvalidEncoding(other)),
        }
    }

    /// The header selector byte for this encoding.
    pub const fn selector(self) -> u8 {
        match self {
            Self::Utf16Le => 0,
            Self::Utf8 => 1,
        }
    }

    /// Decode raw bytes, replacing malformed sequences with U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|pair| match *pair {
                        [lo, hi] => u16::from_le_bytes([lo, hi]),
                        // odd trailing byte
                        _ => 0xFFFD,
                    })
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }

    /// Encode a string into raw bytes (no length prefix).
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }
}
