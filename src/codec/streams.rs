//! Per-slice stream sets
//!
//! A slice owns one core bit stream plus one byte buffer per external content
//! id. Every field write or read is routed through the [`Encoding`] bound to its
//! column: bit codecs go to the core stream, `EXTERNAL` and the byte-array
//! codecs go to the buffer named by their content id.

use super::Encoding;
use crate::io::{read_itf8, write_itf8, BitReader, BitWriter};
use crate::{CramError, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

/// Write side: core bit stream plus external column buffers.
#[derive(Debug)]
pub struct EncodeStreams {
    core: BitWriter<Vec<u8>>,
    external: BTreeMap<i32, Vec<u8>>,
}

impl Default for EncodeStreams {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeStreams {
    pub fn new() -> Self {
        Self {
            core: BitWriter::new(Vec::new()),
            external: BTreeMap::new(),
        }
    }

    fn external_mut(&mut self, content_id: i32) -> &mut Vec<u8> {
        self.external.entry(content_id).or_default()
    }

    /// Write one integer field.
    pub fn write_int(&mut self, encoding: &Encoding, value: i64) -> Result<()> {
        match encoding {
            Encoding::External { content_id } => {
                let value = i32::try_from(value)
                    .map_err(|_| CramError::config(format!("Value {} does not fit in ITF-8", value)))?;
                write_itf8(self.external_mut(*content_id), value)?;
                Ok(())
            }
            Encoding::Null => Err(CramError::config("Cannot write to a column with NULL encoding")),
            _ if encoding.is_bit_codec() => encoding.encode(&mut self.core, value).map(|_| ()),
            _ => Err(CramError::config(format!("{} cannot encode an integer", encoding.id()))),
        }
    }

    /// Write one byte field. `EXTERNAL` stores it verbatim.
    pub fn write_byte(&mut self, encoding: &Encoding, value: u8) -> Result<()> {
        match encoding {
            Encoding::External { content_id } => {
                self.external_mut(*content_id).push(value);
                Ok(())
            }
            _ => self.write_int(encoding, value as i64),
        }
    }

    /// Write a variable-length byte array field.
    pub fn write_bytes(&mut self, encoding: &Encoding, bytes: &[u8]) -> Result<()> {
        match encoding {
            Encoding::ByteArrayLen { len, value } => {
                self.write_int(len, bytes.len() as i64)?;
                if let Encoding::External { content_id } = **value {
                    self.external_mut(content_id).extend_from_slice(bytes);
                    return Ok(());
                }
                for &byte in bytes {
                    self.write_byte(value, byte)?;
                }
                Ok(())
            }
            Encoding::ByteArrayStop { stop_byte, content_id } => {
                if bytes.contains(stop_byte) {
                    return Err(CramError::config(format!(
                        "Byte array contains its stop byte {:#04x}",
                        stop_byte
                    )));
                }
                let buf = self.external_mut(*content_id);
                buf.extend_from_slice(bytes);
                buf.push(*stop_byte);
                Ok(())
            }
            _ => Err(CramError::config(format!("{} cannot encode a byte array", encoding.id()))),
        }
    }

    /// Bits written to the core stream so far.
    pub fn core_bits(&self) -> u64 {
        self.core.bits_written()
    }

    /// Byte-align and release the core stream and every external buffer.
    pub fn finish(self) -> Result<(Vec<u8>, BTreeMap<i32, Vec<u8>>)> {
        Ok((self.core.into_inner()?, self.external))
    }
}

/// Read side: borrowed views over a slice's decompressed blocks.
///
/// Each stream has its own cursor, so exhausting one leaves the others intact.
#[derive(Debug)]
pub struct DecodeStreams<'a> {
    core: BitReader<&'a [u8]>,
    external: HashMap<i32, Cursor<&'a [u8]>>,
}

impl<'a> DecodeStreams<'a> {
    pub fn new(core: &'a [u8], external: impl IntoIterator<Item = (i32, &'a [u8])>) -> Self {
        Self {
            core: BitReader::new(core),
            external: external.into_iter().map(|(id, data)| (id, Cursor::new(data))).collect(),
        }
    }

    fn external_mut(&mut self, content_id: i32) -> Result<&mut Cursor<&'a [u8]>> {
        self.external
            .get_mut(&content_id)
            .ok_or_else(|| CramError::format(format!("Missing external block for content ID {}", content_id)))
    }

    pub fn read_int(&mut self, encoding: &Encoding) -> Result<i64> {
        match encoding {
            Encoding::External { content_id } => Ok(external_itf8(self.external_mut(*content_id)?)? as i64),
            Encoding::Null => Err(CramError::format("Cannot read a column with NULL encoding")),
            _ if encoding.is_bit_codec() => encoding.decode(&mut self.core),
            _ => Err(CramError::format(format!("{} cannot decode an integer", encoding.id()))),
        }
    }

    pub fn read_byte(&mut self, encoding: &Encoding) -> Result<u8> {
        match encoding {
            Encoding::External { content_id } => {
                let cursor = self.external_mut(*content_id)?;
                let pos = cursor.position() as usize;
                let byte = cursor
                    .get_ref()
                    .get(pos)
                    .copied()
                    .ok_or(CramError::StreamExhausted)?;
                cursor.set_position(pos as u64 + 1);
                Ok(byte)
            }
            _ => {
                let value = self.read_int(encoding)?;
                u8::try_from(value).map_err(|_| CramError::format(format!("Byte value out of range: {}", value)))
            }
        }
    }

    pub fn read_bytes(&mut self, encoding: &Encoding) -> Result<Vec<u8>> {
        match encoding {
            Encoding::ByteArrayLen { len, value } => {
                let n = self.read_int(len)?;
                let n = usize::try_from(n)
                    .map_err(|_| CramError::format(format!("Negative byte array length: {}", n)))?;
                if let Encoding::External { content_id } = **value {
                    return take(self.external_mut(content_id)?, n);
                }
                (0..n).map(|_| self.read_byte(value)).collect()
            }
            Encoding::ByteArrayStop { stop_byte, content_id } => {
                let cursor = self.external_mut(*content_id)?;
                let pos = cursor.position() as usize;
                let rest = &cursor.get_ref()[pos.min(cursor.get_ref().len())..];
                let end = rest
                    .iter()
                    .position(|b| b == stop_byte)
                    .ok_or(CramError::StreamExhausted)?;
                let bytes = rest[..end].to_vec();
                cursor.set_position((pos + end + 1) as u64);
                Ok(bytes)
            }
            _ => Err(CramError::format(format!("{} cannot decode a byte array", encoding.id()))),
        }
    }
}

/// ITF-8 from an external stream; running out of bytes, even mid-value, is
/// `StreamExhausted` like every other stream.
fn external_itf8(cursor: &mut Cursor<&[u8]>) -> Result<i32> {
    let pos = cursor.position() as usize;
    let data = *cursor.get_ref();
    let first = *data.get(pos).ok_or(CramError::StreamExhausted)?;
    let len = (first.leading_ones() as usize + 1).min(5);
    if data.len() - pos < len {
        return Err(CramError::StreamExhausted);
    }
    read_itf8(cursor)
}

fn take(cursor: &mut Cursor<&[u8]>, n: usize) -> Result<Vec<u8>> {
    let pos = cursor.position() as usize;
    let end = pos.checked_add(n).filter(|&end| end <= cursor.get_ref().len());
    let end = end.ok_or(CramError::StreamExhausted)?;
    let bytes = cursor.get_ref()[pos..end].to_vec();
    cursor.set_position(end as u64);
    Ok(bytes)
}
