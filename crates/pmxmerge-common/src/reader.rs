//! Binary reader over a fully loaded byte slice.
//!
//! This module provides [`BinaryReader`], a forward-only cursor with the
//! fixed-width scalar codecs, length-prefixed text, and the per-family
//! variable-width index codecs used by PMX files.

use zerocopy::FromBytes;

use crate::{Error, IndexWidth, Result, TextEncoding};

/// A forward-only binary reader over a byte slice.
///
/// Every read checks the remaining length first, so a short read never
/// consumes a partial value and always yields [`Error::UnexpectedEof`].
///
/// # Example
///
/// ```
/// use pmxmerge_common::{BinaryReader, IndexWidth};
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0xFF];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_i32().unwrap(), 0x04030201);
/// assert_eq!(reader.read_signed_index(IndexWidth::One).unwrap(), None);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    /// Read a fixed-size array of bytes.
    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Read a little-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Read a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Read `N` consecutive little-endian f32 values.
    ///
    /// The length is checked up front, so a truncated vector consumes nothing.
    pub fn read_floats<const N: usize>(&mut self) -> Result<[f32; N]> {
        let bytes = self.read_bytes(N * 4)?;
        let mut out = [0f32; N];
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(out)
    }

    /// Read an int32 byte length followed by that many bytes of text.
    pub fn read_text(&mut self, encoding: TextEncoding) -> Result<String> {
        let length = self.read_i32()?;
        let length = usize::try_from(length).map_err(|_| Error::NegativeLength(length))?;
        let bytes = self.read_bytes(length)?;
        Ok(encoding.decode(bytes))
    }

    /// Read an unsigned (vertex) index of the given width.
    pub fn read_unsigned_index(&mut self, width: IndexWidth) -> Result<u32> {
        match width {
            IndexWidth::One => self.read_u8().map(u32::from),
            IndexWidth::Two => self.read_u16().map(u32::from),
            IndexWidth::Four => self.read_u32(),
        }
    }

    /// Read a signed index of the given width. Negative values mean "unset".
    pub fn read_signed_index(&mut self, width: IndexWidth) -> Result<Option<usize>> {
        let raw = match width {
            IndexWidth::One => self.read_i8().map(i32::from)?,
            IndexWidth::Two => self.read_i16().map(i32::from)?,
            IndexWidth::Four => self.read_i32()?,
        };
        Ok(usize::try_from(raw).ok())
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            needed: size,
            available: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // i32: 0x04030201
            0xFF, 0xFF, // i16: -1
            0x00, 0x00, 0x80, 0x3F, // f32: 1.0
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_i32().unwrap(), 0x04030201);
        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_f32().unwrap(), 1.0);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_signed_index_widths() {
        let data = [0x05, 0xFF, 0xFF, 0x34, 0x12, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_signed_index(IndexWidth::One).unwrap(), Some(5));
        assert_eq!(reader.read_signed_index(IndexWidth::Two).unwrap(), None);
        assert_eq!(reader.read_signed_index(IndexWidth::Two).unwrap(), Some(0x1234));
        assert_eq!(reader.read_signed_index(IndexWidth::Four).unwrap(), None);
    }

    #[test]
    fn test_unsigned_index_uses_full_range() {
        let data = [0xFF, 0xFF, 0xFF];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_unsigned_index(IndexWidth::One).unwrap(), 255);
        assert_eq!(reader.read_unsigned_index(IndexWidth::Two).unwrap(), 65535);
    }

    #[test]
    fn test_read_text_utf8() {
        let data = [0x03, 0x00, 0x00, 0x00, b'a', b'r', b'm'];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_text(TextEncoding::Utf8).unwrap(), "arm");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_vector_consumes_nothing() {
        let data = [0u8; 10];
        let mut reader = BinaryReader::new(&data);

        let err = reader.read_floats::<3>().unwrap_err();
        assert!(err.is_eof());
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_floats::<2>().unwrap(), [0.0, 0.0]);
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        assert!(reader.read_u32().is_err());
    }
}
