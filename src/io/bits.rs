//! Bit-granular streams over byte sinks and sources
//!
//! Bits are written and read most-significant first. A partially filled byte
//! is buffered across calls; [`BitWriter::align_to_byte`] pads it with zero
//! bits and [`BitReader::align_to_byte`] skips the unread remainder.
//!
//! A stream instance is owned by exactly one slice encoder/decoder; there is
//! no internal locking.

use crate::{CramError, Result};
use std::io::{Read, Write};

/// Partial byte accumulator shared by both stream directions.
#[derive(Debug, Clone, Copy, Default)]
struct PendingByte {
    /// Bits buffered so far, right-aligned
    byte: u8,
    /// Number of valid bits in `byte` (0-7 on the write side, 0-8 when reading)
    bits: u8,
}

/// Bit-level writer for CRAM core data (GOLOMB, GAMMA, BETA, ...).
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    inner: W,
    pending: PendingByte,
    bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a writer over a byte sink.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pending: PendingByte::default(),
            bits_written: 0,
        }
    }

    /// Append the `num_bits` low-order bits of `value`, MSB first.
    ///
    /// Values wider than 32 bits are split into a high and a low 32-bit write.
    pub fn write_bits(&mut self, value: u64, num_bits: u32) -> Result<()> {
        if num_bits > 64 {
            return Err(CramError::config(format!("Invalid bit count: {}", num_bits)));
        }
        if num_bits > 32 {
            self.write_bits_32((value >> 32) as u32, num_bits - 32)?;
            return self.write_bits_32(value as u32, 32);
        }
        self.write_bits_32(value as u32, num_bits)
    }

    fn write_bits_32(&mut self, value: u32, num_bits: u32) -> Result<()> {
        let mut remaining = num_bits;
        while remaining > 0 {
            let free = 8 - self.pending.bits as u32;
            let take = remaining.min(free);
            let shift = remaining - take;
            let chunk = ((value as u64 >> shift) & ((1u64 << take) - 1)) as u8;

            self.pending.byte = if take == 8 { chunk } else { (self.pending.byte << take) | chunk };
            self.pending.bits += take as u8;
            remaining -= take;

            if self.pending.bits == 8 {
                self.inner.write_all(&[self.pending.byte])?;
                self.pending = PendingByte::default();
            }
        }
        self.bits_written += num_bits as u64;
        Ok(())
    }

    /// Append a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits_32(bit as u32, 1)
    }

    /// Append `count` copies of `bit` (unary runs).
    pub fn write_run(&mut self, bit: bool, count: u64) -> Result<()> {
        let word = if bit { u32::MAX } else { 0 };
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(32) as u32;
            self.write_bits_32(word, take)?;
            remaining -= take as u64;
        }
        Ok(())
    }

    /// Pad the current byte with zero bits so the next write starts on a byte boundary.
    pub fn align_to_byte(&mut self) -> Result<()> {
        if self.pending.bits > 0 {
            let pad = 8 - self.pending.bits as u32;
            self.write_bits_32(0, pad)?;
        }
        Ok(())
    }

    /// Total bits written so far, alignment padding included.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Emit any buffered partial byte (zero-padded) and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.align_to_byte()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and release the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// Bit-level reader for CRAM core data.
#[derive(Debug)]
pub struct BitReader<R: Read> {
    inner: R,
    pending: PendingByte,
}

impl<R: Read> BitReader<R> {
    /// Create a reader over a byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: PendingByte::default(),
        }
    }

    fn refill(&mut self) -> Result<()> {
        let mut buf = [0u8; 1];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => {
                self.pending = PendingByte { byte: buf[0], bits: 8 };
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(CramError::StreamExhausted),
            Err(e) => Err(e.into()),
        }
    }

    /// Read `num_bits` bits (at most 64), returned right-aligned.
    pub fn read_bits(&mut self, num_bits: u32) -> Result<u64> {
        if num_bits > 64 {
            return Err(CramError::config(format!("Invalid bit count: {}", num_bits)));
        }

        let mut result: u64 = 0;
        let mut remaining = num_bits;

        while remaining > 0 {
            if self.pending.bits == 0 {
                self.refill()?;
            }

            let available = self.pending.bits as u32;
            let take = remaining.min(available);
            let shift = available - take;
            let bits = (self.pending.byte as u32 >> shift) & ((1u32 << take) - 1);

            result = (result << take) | bits as u64;
            self.pending.bits -= take as u8;
            remaining -= take;
        }

        Ok(result)
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Count consecutive bits equal to `bit`, consuming the terminating complement.
    pub fn read_run(&mut self, bit: bool) -> Result<u64> {
        let mut count = 0u64;
        while self.read_bit()? == bit {
            count += 1;
        }
        Ok(count)
    }

    /// Skip the unread remainder of the current byte.
    pub fn align_to_byte(&mut self) {
        self.pending = PendingByte::default();
    }

    /// Release the underlying source. Unread bits of a partial byte are dropped.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_write_msb_first() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b11111, 5).unwrap();
        writer.write_bits(0b1, 1).unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(bytes, vec![0b1011_1111, 0b1000_0000]);
    }

    #[test]
    fn test_read_right_aligned() {
        let mut reader = BitReader::new(Cursor::new(vec![0b1011_1111, 0b1000_0000]));
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(5).unwrap(), 0b11111);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(7).unwrap(), 0);
    }

    #[test]
    fn test_64_bit_values_split() {
        let value = 0xDEAD_BEEF_CAFE_BABEu64;
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bit(true).unwrap();
        writer.write_bits(value, 64).unwrap();
        writer.write_bits(value >> 4, 60).unwrap();
        assert_eq!(writer.bits_written(), 125);
        let bytes = writer.into_inner().unwrap();
        assert_eq!(bytes.len(), 16);

        let mut reader = BitReader::new(Cursor::new(bytes));
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(64).unwrap(), value);
        assert_eq!(reader.read_bits(60).unwrap(), value >> 4);
    }

    #[test]
    fn test_zero_bit_operations() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0xFF, 0).unwrap();
        assert!(writer.into_inner().unwrap().is_empty());

        let mut reader = BitReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.read_bits(0).unwrap(), 0);
    }

    #[test]
    fn test_align_to_byte() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(0b11, 2).unwrap();
        writer.align_to_byte().unwrap();
        writer.align_to_byte().unwrap();
        writer.write_bits(0xAB, 8).unwrap();
        let bytes = writer.into_inner().unwrap();
        assert_eq!(bytes, vec![0b1100_0000, 0xAB]);

        let mut reader = BitReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        reader.align_to_byte();
        assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn test_runs() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_run(true, 40).unwrap();
        writer.write_bit(false).unwrap();
        writer.write_run(false, 3).unwrap();
        writer.write_bit(true).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_run(true).unwrap(), 40);
        assert_eq!(reader.read_run(false).unwrap(), 3);
    }

    #[test]
    fn test_read_past_end_is_stream_exhausted() {
        let mut reader = BitReader::new(Cursor::new(vec![0xFF]));
        assert_eq!(reader.read_bits(6).unwrap(), 0b111111);
        let err = reader.read_bits(3).unwrap_err();
        assert!(matches!(err, CramError::StreamExhausted));
    }

    #[test]
    fn test_invalid_bit_count() {
        let mut writer = BitWriter::new(Vec::new());
        assert!(writer.write_bits(0, 65).is_err());
        let mut reader = BitReader::new(Cursor::new(vec![0u8; 16]));
        assert!(reader.read_bits(65).is_err());
    }
}
