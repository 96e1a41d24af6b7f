//! Binary writer mirroring [`BinaryReader`](crate::BinaryReader).

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use zerocopy::{Immutable, IntoBytes};

use crate::{Error, IndexWidth, Result, TextEncoding};

/// A forward-only little-endian writer over any [`Write`] sink.
///
/// # Example
///
/// ```
/// use pmxmerge_common::{BinaryWriter, IndexWidth};
///
/// let mut writer = BinaryWriter::new(Vec::new());
/// writer.write_i32(7).unwrap();
/// writer.write_signed_index(None, IndexWidth::Two).unwrap();
///
/// assert_eq!(writer.into_inner(), vec![7, 0, 0, 0, 0xFF, 0xFF]);
/// ```
#[derive(Debug)]
pub struct BinaryWriter<W: Write> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Wrap a sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_u8(value)?;
        Ok(())
    }

    /// Write a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.inner.write_i8(value)?;
        Ok(())
    }

    /// Write a little-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian i16.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a run of little-endian f32 values.
    pub fn write_floats(&mut self, values: &[f32]) -> Result<()> {
        for &value in values {
            self.write_f32(value)?;
        }
        Ok(())
    }

    /// Write a collection length as an int32 count.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count).map_err(|_| Error::IndexOutOfRange {
            index: count,
            width: 4,
        })?;
        self.write_i32(count)
    }

    /// Write an int32 byte length followed by the encoded text.
    pub fn write_text(&mut self, text: &str, encoding: TextEncoding) -> Result<()> {
        let bytes = encoding.encode(text);
        self.write_count(bytes.len())?;
        self.write_bytes(&bytes)
    }

    /// Write an unsigned (vertex) index at the given width.
    pub fn write_unsigned_index(&mut self, index: u32, width: IndexWidth) -> Result<()> {
        if u64::from(index) > width.max_unsigned() {
            return Err(Error::IndexOutOfRange {
                index: index as usize,
                width: width.bytes(),
            });
        }
        match width {
            IndexWidth::One => self.write_u8(index as u8),
            IndexWidth::Two => self.write_u16(index as u16),
            IndexWidth::Four => {
                self.inner.write_u32::<LittleEndian>(index)?;
                Ok(())
            }
        }
    }

    /// Write a signed index at the given width; `None` becomes `-1`.
    pub fn write_signed_index(&mut self, index: Option<usize>, width: IndexWidth) -> Result<()> {
        let value = match index {
            None => -1i32,
            Some(index) if index as u64 <= width.max_signed() => index as i32,
            Some(index) => {
                return Err(Error::IndexOutOfRange {
                    index,
                    width: width.bytes(),
                })
            }
        };
        match width {
            IndexWidth::One => self.write_i8(value as i8),
            IndexWidth::Two => self.write_i16(value as i16),
            IndexWidth::Four => self.write_i32(value),
        }
    }

    /// Write a struct using zerocopy.
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }
}
