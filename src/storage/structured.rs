//! Structured binary I/O.
//!
//! [`StructWriter`] builds a little-endian byte buffer and can seal it with a
//! CRC32 trailer. [`StructReader`] reads from a borrowed slice and never
//! trusts a length it has not checked against the bytes that remain, so a
//! hostile buffer produces a [`QuireError::CorruptData`] rather than a panic
//! or a huge allocation.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{QuireError, Result};
use crate::util::varint::{decode_u64, encode_u64_into};

/// Size of the checksum trailer.
pub const CHECKSUM_LEN: usize = 4;

/// A structured writer for binary data.
#[derive(Debug, Default)]
pub struct StructWriter {
    buf: Vec<u8>,
}

impl StructWriter {
    /// Create a new structured writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        encode_u64_into(value, &mut self.buf);
        Ok(())
    }

    /// Write a string with length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write raw bytes with length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.buf.extend_from_slice(value);
        Ok(())
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(value);
        Ok(())
    }

    /// Take the buffer without a checksum.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Append the CRC32 of everything written and return the buffer.
    pub fn finish(mut self) -> Vec<u8> {
        let checksum = crc32fast::hash(&self.buf);
        self.buf.extend_from_slice(&checksum.to_le_bytes());
        self.buf
    }
}

/// A structured reader over a byte slice.
#[derive(Debug)]
pub struct StructReader<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> StructReader<'a> {
    /// Create a reader over the whole slice.
    pub fn new(buf: &'a [u8]) -> Self {
        StructReader { buf, position: 0 }
    }

    /// Verify the CRC32 trailer written by [`StructWriter::finish`] and
    /// return a reader over the checked body.
    pub fn verified(data: &'a [u8]) -> Result<Self> {
        if data.len() < CHECKSUM_LEN {
            return Err(QuireError::corrupt("data shorter than checksum"));
        }
        let (body, trailer) = data.split_at(data.len() - CHECKSUM_LEN);
        let expected = LittleEndian::read_u32(trailer);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(QuireError::corrupt(format!(
                "checksum mismatch: stored {expected:#010x}, computed {actual:#010x}"
            )));
        }
        Ok(StructReader::new(body))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(QuireError::corrupt(format!(
                "unexpected end of data at offset {} (wanted {len} bytes)",
                self.position
            )));
        }
        let slice = &self.buf[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a u16 value (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, read) = decode_u64(&self.buf[self.position..])?;
        self.position += read;
        Ok(value)
    }

    /// Read an element count, rejecting counts that cannot fit in the
    /// remaining data when each element takes at least `min_item_len` bytes.
    pub fn read_len(&mut self, min_item_len: usize) -> Result<usize> {
        let len = usize::try_from(self.read_varint()?)
            .map_err(|_| QuireError::corrupt("length does not fit in memory"))?;
        let needed = len
            .checked_mul(min_item_len.max(1))
            .ok_or_else(|| QuireError::corrupt("length overflow"))?;
        if needed > self.remaining() {
            return Err(QuireError::corrupt(format!(
                "length {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(len)
    }

    /// Read a string with length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| QuireError::corrupt(format!("invalid UTF-8: {e}")))
    }

    /// Read bytes with length prefix.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len(1)?;
        self.take(len)
    }

    /// Read an exact number of raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    /// Check if all bytes were consumed.
    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_writer_reader() {
        let mut writer = StructWriter::new();
        writer.write_u8(42).unwrap();
        writer.write_u16(1234).unwrap();
        writer.write_u32(5678).unwrap();
        writer.write_varint(12345).unwrap();
        writer.write_string("Hello, World!").unwrap();
        writer.write_bytes(b"binary data").unwrap();
        let data = writer.finish();

        let mut reader = StructReader::verified(&data).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 42);
        assert_eq!(reader.read_u16().unwrap(), 1234);
        assert_eq!(reader.read_u32().unwrap(), 5678);
        assert_eq!(reader.read_varint().unwrap(), 12345);
        assert_eq!(reader.read_string().unwrap(), "Hello, World!");
        assert_eq!(reader.read_bytes().unwrap(), b"binary data");
        assert!(reader.is_eof());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut writer = StructWriter::new();
        writer.write_string("payload").unwrap();
        let mut data = writer.finish();
        data[2] ^= 0xFF;

        assert!(StructReader::verified(&data).unwrap_err().is_corrupt());
        assert!(StructReader::verified(b"abc").unwrap_err().is_corrupt());
    }

    #[test]
    fn test_reads_past_end_fail() {
        let mut reader = StructReader::new(&[0x01]);
        assert!(reader.read_u32().unwrap_err().is_corrupt());

        // Claims 100 bytes of string, provides two.
        let mut reader = StructReader::new(&[100, b'h', b'i']);
        assert!(reader.read_string().unwrap_err().is_corrupt());
    }

    #[test]
    fn test_read_len_bounds() {
        let mut writer = StructWriter::new();
        writer.write_varint(3).unwrap();
        writer.write_raw(&[0; 6]).unwrap();
        let data = writer.into_inner();

        assert_eq!(StructReader::new(&data).read_len(2).unwrap(), 3);
        assert!(StructReader::new(&data).read_len(3).is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut writer = StructWriter::new();
        writer.write_bytes(&[0xFF, 0xFE]).unwrap();
        let data = writer.into_inner();
        assert!(StructReader::new(&data).read_string().unwrap_err().is_corrupt());
    }
}
