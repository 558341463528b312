//! Variable-length integer encoding.
//!
//! Seven payload bits per byte, least significant group first, with the high
//! bit set on every byte except the last. Posting lists use it for doc id
//! deltas, frequencies and position deltas.

use crate::error::{QuireError, Result};

/// Longest encoding of a u64.
pub const MAX_VARINT_LEN: usize = 10;

/// Append the encoding of `value` to `buf` and return the number of bytes written.
pub fn encode_u64_into(value: u64, buf: &mut Vec<u8>) -> usize {
    let mut val = value;
    let mut written = 0;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80;
        }

        buf.push(byte);
        written += 1;

        if val == 0 {
            return written;
        }
    }
}

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAX_VARINT_LEN);
    encode_u64_into(value, &mut bytes);
    bytes
}

/// Decode a u64 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Truncated input and
/// encodings that do not fit in 64 bits are reported as corrupt data.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0u32;

    for (i, &byte) in bytes.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(QuireError::corrupt("varint overflow"));
        }

        let payload = (byte & 0x7F) as u64;
        // The tenth byte may only carry the single remaining bit.
        if shift == 63 && payload > 1 {
            return Err(QuireError::corrupt("varint overflow"));
        }
        result |= payload << shift;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(QuireError::corrupt("incomplete varint"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_use_one_byte() {
        assert_eq!(encode_u64(0), vec![0]);
        assert_eq!(encode_u64(127), vec![127]);
        assert_eq!(encode_u64(128), vec![0x80, 0x01]);
    }

    #[test]
    fn test_decode_reports_consumed_length() {
        let mut buf = Vec::new();
        encode_u64_into(300, &mut buf);
        buf.push(0xFF);

        let (value, read) = decode_u64(&buf).unwrap();
        assert_eq!(value, 300);
        assert_eq!(read, 2);
    }

    #[test]
    fn test_max_value() {
        let bytes = encode_u64(u64::MAX);
        assert_eq!(bytes.len(), MAX_VARINT_LEN);
        assert_eq!(decode_u64(&bytes).unwrap(), (u64::MAX, MAX_VARINT_LEN));
    }

    #[test]
    fn test_truncated_and_overflowing_input() {
        assert!(decode_u64(&[]).is_err());
        assert!(decode_u64(&[0x80, 0x80]).is_err());
        assert!(decode_u64(&[0xFF; 11]).is_err());

        let mut too_big = vec![0xFF; 9];
        too_big.push(0x02);
        assert!(decode_u64(&too_big).unwrap_err().is_corrupt());
    }
}
