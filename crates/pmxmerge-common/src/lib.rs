//! Binary stream primitives for pmxmerge.
//!
//! This crate provides the low-level codecs shared by the PMX codec:
//!
//! - [`BinaryReader`] - Forward-only reading from a fully loaded byte slice
//! - [`BinaryWriter`] - Little-endian writing into any `io::Write` sink
//! - [`IndexWidth`] - Per-family index widths (1, 2 or 4 bytes)
//! - [`TextEncoding`] - UTF-16LE / UTF-8 length-prefixed text

mod encoding;
mod error;
mod index;
mod reader;
mod writer;

pub use encoding::TextEncoding;
pub use error::{Error, Result};
pub use index::IndexWidth;
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
