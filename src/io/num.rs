//! Variable-length integers (ITF-8 and LTF-8)
//!
//! Every count and length field in the CRAM structure uses these encodings.
//! The number of leading one bits in the first byte gives the number of
//! continuation bytes that follow:
//!
//! ```text
//! 0xxxxxxx                                       1 byte  (7 bits)
//! 10xxxxxx xxxxxxxx                              2 bytes (14 bits)
//! 110xxxxx xxxxxxxx xxxxxxxx                     3 bytes (21 bits)
//! 1110xxxx xxxxxxxx xxxxxxxx xxxxxxxx            4 bytes (28 bits)
//! 1111xxxx xxxxxxxx xxxxxxxx xxxxxxxx 0000xxxx   5 bytes (32 bits)
//! ```
//!
//! Negative values are written as their 32-bit two's complement pattern and
//! therefore always take five bytes.

use crate::{CramError, Result};
use std::io::{Read, Write};

/// Decode an ITF-8 (Integer, Type-Free, 8-bit) variable-length integer.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use biometal_cram::io::num::read_itf8;
///
/// # fn main() -> biometal_cram::Result<()> {
/// let mut reader = Cursor::new(vec![0x81, 0x42]);
/// assert_eq!(read_itf8(&mut reader)?, 322);
/// # Ok(())
/// # }
/// ```
pub fn read_itf8<R: Read>(reader: &mut R) -> Result<i32> {
    let first = read_u8(reader, "ITF-8 first byte")?;

    let value = if first & 0x80 == 0 {
        first as u32
    } else if first & 0x40 == 0 {
        let b = read_array::<_, 1>(reader, "ITF-8 byte 2")?;
        ((first as u32 & 0x3F) << 8) | b[0] as u32
    } else if first & 0x20 == 0 {
        let b = read_array::<_, 2>(reader, "ITF-8 bytes 2-3")?;
        ((first as u32 & 0x1F) << 16) | ((b[0] as u32) << 8) | b[1] as u32
    } else if first & 0x10 == 0 {
        let b = read_array::<_, 3>(reader, "ITF-8 bytes 2-4")?;
        ((first as u32 & 0x0F) << 24)
            | ((b[0] as u32) << 16)
            | ((b[1] as u32) << 8)
            | b[2] as u32
    } else {
        let b = read_array::<_, 4>(reader, "ITF-8 bytes 2-5")?;
        ((first as u32 & 0x0F) << 28)
            | ((b[0] as u32) << 20)
            | ((b[1] as u32) << 12)
            | ((b[2] as u32) << 4)
            | (b[3] as u32 & 0x0F)
    };

    Ok(value as i32)
}

/// Encode an ITF-8 variable-length integer, returning the number of bytes written.
pub fn write_itf8<W: Write>(writer: &mut W, value: i32) -> Result<usize> {
    let v = value as u32;
    let mut buf = [0u8; 5];

    let len = if v >> 7 == 0 {
        buf[0] = v as u8;
        1
    } else if v >> 14 == 0 {
        buf[0] = 0x80 | (v >> 8) as u8;
        buf[1] = v as u8;
        2
    } else if v >> 21 == 0 {
        buf[0] = 0xC0 | (v >> 16) as u8;
        buf[1] = (v >> 8) as u8;
        buf[2] = v as u8;
        3
    } else if v >> 28 == 0 {
        buf[0] = 0xE0 | (v >> 24) as u8;
        buf[1] = (v >> 16) as u8;
        buf[2] = (v >> 8) as u8;
        buf[3] = v as u8;
        4
    } else {
        buf[0] = 0xF0 | ((v >> 28) & 0x0F) as u8;
        buf[1] = (v >> 20) as u8;
        buf[2] = (v >> 12) as u8;
        buf[3] = (v >> 4) as u8;
        buf[4] = (v & 0x0F) as u8;
        5
    };

    writer.write_all(&buf[..len])?;
    Ok(len)
}

/// Number of bytes [`write_itf8`] uses for `value`.
pub fn itf8_size(value: i32) -> usize {
    let v = value as u32;
    match v {
        _ if v >> 7 == 0 => 1,
        _ if v >> 14 == 0 => 2,
        _ if v >> 21 == 0 => 3,
        _ if v >> 28 == 0 => 4,
        _ => 5,
    }
}

/// Decode an LTF-8 (Long, Type-Free, 8-bit) variable-length integer.
///
/// LTF-8 encodes 64-bit integers in 1-9 bytes using the same leading-ones
/// pattern as ITF-8; a first byte of `0xFF` is followed by the full 8 bytes.
pub fn read_ltf8<R: Read>(reader: &mut R) -> Result<i64> {
    let first = read_u8(reader, "LTF-8 first byte")?;

    let num_bytes = (first.leading_ones() + 1) as usize;
    if num_bytes == 1 {
        return Ok(first as i64);
    }

    let mut bytes = [0u8; 8];
    let rest = &mut bytes[..num_bytes - 1];
    reader.read_exact(rest).map_err(|e| CramError::InvalidFormat {
        msg: format!("Failed to read LTF-8 bytes 2-{}: {}", num_bytes, e),
    })?;

    let mut value: u64 = if num_bytes < 9 {
        first as u64 & (0xFF >> num_bytes)
    } else {
        0
    };
    for &byte in rest.iter() {
        value = (value << 8) | byte as u64;
    }

    Ok(value as i64)
}

/// Encode an LTF-8 variable-length integer, returning the number of bytes written.
pub fn write_ltf8<W: Write>(writer: &mut W, value: i64) -> Result<usize> {
    let v = value as u64;
    let len = ltf8_size(value);
    let mut buf = [0u8; 9];

    if len == 1 {
        buf[0] = v as u8;
    } else if len == 9 {
        buf[0] = 0xFF;
        buf[1..9].copy_from_slice(&v.to_be_bytes());
    } else {
        // (len - 1) leading ones, a zero, then the high bits of the value
        let prefix = !(0xFFu8 >> (len - 1));
        let payload = v.to_be_bytes();
        buf[0] = prefix | (v >> ((len - 1) * 8)) as u8;
        buf[1..len].copy_from_slice(&payload[8 - (len - 1)..]);
    }

    writer.write_all(&buf[..len])?;
    Ok(len)
}

/// Number of bytes [`write_ltf8`] uses for `value`.
pub fn ltf8_size(value: i64) -> usize {
    let v = value as u64;
    // n-byte forms hold 7n bits for n <= 8; anything wider takes 9 bytes
    (1..=8).find(|&n| v >> (7 * n) == 0).unwrap_or(9)
}

/// Write a 32-bit little-endian integer (container length field).
pub fn write_i32_le<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Read a 32-bit little-endian integer (container length field).
pub fn read_i32_le<R: Read>(reader: &mut R, what: &str) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array::<_, 4>(reader, what)?))
}

pub(crate) fn read_u8<R: Read>(reader: &mut R, what: &str) -> Result<u8> {
    Ok(read_array::<_, 1>(reader, what)?[0])
}

pub(crate) fn read_array<R: Read, const N: usize>(reader: &mut R, what: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| CramError::InvalidFormat {
        msg: format!("Failed to read {}: {}", what, e),
    })?;
    Ok(buf)
}

pub(crate) fn read_vec<R: Read>(reader: &mut R, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| CramError::InvalidFormat {
        msg: format!("Failed to read {}: {}", what, e),
    })?;
    Ok(buf)
}

/// Read an ITF-8 length and reject negative values.
pub(crate) fn read_len<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let len = read_itf8(reader)?;
    usize::try_from(len).map_err(|_| CramError::InvalidFormat {
        msg: format!("Negative {}: {}", what, len),
    })
}
