//! CRAM blocks: compressed byte ranges with a fixed-shape header
//!
//! ```text
//! - Method: u8 (compression method)
//! - Content type: u8
//! - Content ID: ITF-8
//! - Compressed size: ITF-8
//! - Uncompressed size: ITF-8
//! - Data: [u8; compressed_size]
//! - CRC32: u32 little-endian, over every preceding byte of the block
//! ```

use crate::io::num::{read_array, read_len, read_u8, read_vec};
use crate::io::{read_itf8, write_itf8};
use crate::{CramError, Result};
use std::fmt;
use std::io::{Read, Write};

/// Block compression method. Ordinals are persisted and never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionMethod {
    Raw = 0,
    Gzip = 1,
    Bzip2 = 2,
    Lzma = 3,
    /// rANS 4x8 (recognized, not supported)
    Rans4x8 = 4,
    /// rANS 4x16 (recognized, not supported)
    Rans4x16 = 5,
    /// Adaptive arithmetic coder (recognized, not supported)
    Arithmetic = 6,
    /// fqzcomp quality codec (recognized, not supported)
    Fqzcomp = 7,
    /// Name tokenizer (recognized, not supported)
    NameTokenizer = 8,
}

impl CompressionMethod {
    pub fn from_u8(method: u8) -> Result<Self> {
        Ok(match method {
            0 => Self::Raw,
            1 => Self::Gzip,
            2 => Self::Bzip2,
            3 => Self::Lzma,
            4 => Self::Rans4x8,
            5 => Self::Rans4x16,
            6 => Self::Arithmetic,
            7 => Self::Fqzcomp,
            8 => Self::NameTokenizer,
            _ => return Err(CramError::format(format!("Unknown compression method: {}", method))),
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    fn unsupported(self) -> CramError {
        CramError::format(format!("{} compression is not supported", self))
    }

    /// Compress `raw` with this method.
    pub fn compress(self, raw: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Raw => Ok(raw.to_vec()),
            Self::Gzip => {
                use flate2::write::GzEncoder;
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(raw)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| CramError::Compression(format!("Failed to compress gzip block: {}", e)))
            }
            Self::Bzip2 => {
                use bzip2::write::BzEncoder;
                let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder
                    .write_all(raw)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| CramError::Compression(format!("Failed to compress bzip2 block: {}", e)))
            }
            Self::Lzma => {
                use xz2::write::XzEncoder;
                let mut encoder = XzEncoder::new(Vec::new(), 6);
                encoder
                    .write_all(raw)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| CramError::Compression(format!("Failed to compress LZMA block: {}", e)))
            }
            _ => Err(self.unsupported()),
        }
    }

    /// Decompress `data` written with this method.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decompressed = Vec::new();
        match self {
            Self::Raw => return Ok(data.to_vec()),
            Self::Gzip => {
                use flate2::read::GzDecoder;
                GzDecoder::new(data)
                    .read_to_end(&mut decompressed)
                    .map_err(|e| CramError::Compression(format!("Failed to decompress gzip block: {}", e)))?;
            }
            Self::Bzip2 => {
                use bzip2::read::BzDecoder;
                BzDecoder::new(data)
                    .read_to_end(&mut decompressed)
                    .map_err(|e| CramError::Compression(format!("Failed to decompress bzip2 block: {}", e)))?;
            }
            Self::Lzma => {
                use xz2::read::XzDecoder;
                XzDecoder::new(data)
                    .read_to_end(&mut decompressed)
                    .map_err(|e| CramError::Compression(format!("Failed to decompress LZMA block: {}", e)))?;
            }
            _ => return Err(self.unsupported()),
        }
        Ok(decompressed)
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Raw => "raw",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Lzma => "lzma",
            Self::Rans4x8 => "rANS 4x8",
            Self::Rans4x16 => "rANS 4x16",
            Self::Arithmetic => "adaptive arithmetic",
            Self::Fqzcomp => "fqzcomp",
            Self::NameTokenizer => "name tokenizer",
        };
        f.write_str(name)
    }
}

/// Block content type. Ordinals are persisted and never renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    FileHeader = 0,
    CompressionHeader = 1,
    SliceHeader = 2,
    Reserved = 3,
    External = 4,
    Core = 5,
}

impl ContentType {
    pub fn from_u8(content_type: u8) -> Result<Self> {
        Ok(match content_type {
            0 => Self::FileHeader,
            1 => Self::CompressionHeader,
            2 => Self::SliceHeader,
            3 => Self::Reserved,
            4 => Self::External,
            5 => Self::Core,
            _ => return Err(CramError::format(format!("Unknown block content type: {}", content_type))),
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// CRAM block structure.
///
/// Immutable once built: [`Block::new`] compresses the payload up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    method: CompressionMethod,
    content_type: ContentType,
    content_id: i32,
    raw_size: usize,
    /// Payload as stored (compressed with `method`)
    data: Vec<u8>,
}

impl Block {
    /// Build a block by compressing `raw` with `method`.
    pub fn new(method: CompressionMethod, content_type: ContentType, content_id: i32, raw: &[u8]) -> Result<Self> {
        // Empty payloads are always stored raw
        let method = if raw.is_empty() { CompressionMethod::Raw } else { method };
        Ok(Self {
            method,
            content_type,
            content_id,
            raw_size: raw.len(),
            data: method.compress(raw)?,
        })
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn content_id(&self) -> i32 {
        self.content_id
    }

    /// Uncompressed payload size.
    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Stored (compressed) payload size.
    pub fn compressed_size(&self) -> usize {
        self.data.len()
    }

    /// Decompress the payload and check it against the declared raw size.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let raw = self.method.decompress(&self.data)?;
        if raw.len() != self.raw_size {
            return Err(CramError::format(format!(
                "Block {} decompressed to {} bytes, header declares {}",
                self.content_id,
                raw.len(),
                self.raw_size
            )));
        }
        Ok(raw)
    }

    /// Serialize the block, CRC32 included. Returns bytes written.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut buf = Vec::with_capacity(self.data.len() + 20);
        buf.push(self.method.as_u8());
        buf.push(self.content_type.as_u8());
        write_itf8(&mut buf, self.content_id)?;
        write_itf8(&mut buf, size_field(self.data.len())?)?;
        write_itf8(&mut buf, size_field(self.raw_size)?)?;
        buf.extend_from_slice(&self.data);

        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        writer.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Parse one block and verify its CRC32.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut reader = HashingReader::new(reader);

        let method = CompressionMethod::from_u8(read_u8(&mut reader, "block method")?)?;
        let content_type = ContentType::from_u8(read_u8(&mut reader, "block content type")?)?;
        let content_id = read_itf8(&mut reader)?;
        let compressed_size = read_len(&mut reader, "block compressed size")?;
        let raw_size = read_len(&mut reader, "block uncompressed size")?;
        let data = read_vec(&mut reader, compressed_size, "block data")?;

        let actual = reader.checksum();
        let expected = u32::from_le_bytes(read_array(reader.inner_mut(), "block CRC32")?);
        if expected != actual {
            return Err(CramError::ChecksumMismatch { expected, actual });
        }

        cram_debug!(
            "Block: method={}, content_type={:?}, content_id={}, compressed={}, raw={}",
            method,
            content_type,
            content_id,
            compressed_size,
            raw_size
        );

        Ok(Self {
            method,
            content_type,
            content_id,
            raw_size,
            data,
        })
    }
}

fn size_field(size: usize) -> Result<i32> {
    i32::try_from(size).map_err(|_| CramError::format(format!("Block too large: {} bytes", size)))
}

/// Feeds every byte read through a CRC32 hasher.
pub(crate) struct HashingReader<'a, R: Read> {
    inner: &'a mut R,
    hasher: crc32fast::Hasher,
}

impl<'a, R: Read> HashingReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// CRC32 of everything read so far.
    pub(crate) fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// The wrapped reader, bypassing the hasher.
    pub(crate) fn inner_mut(&mut self) -> &mut R {
        self.inner
    }
}

impl<R: Read> Read for HashingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(method: CompressionMethod) {
        let raw: Vec<u8> = (0..2000u32).map(|i| (i % 7) as u8).collect();
        let block = Block::new(method, ContentType::External, 12, &raw).unwrap();
        assert_eq!(block.method(), method);

        let mut buf = Vec::new();
        let written = block.write(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let parsed = Block::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, block);
        assert_eq!(parsed.content_id(), 12);
        assert_eq!(parsed.decompress().unwrap(), raw);
    }

    #[test]
    fn test_block_raw_round_trip() {
        round_trip(CompressionMethod::Raw);
    }

    #[test]
    fn test_block_gzip_round_trip() {
        round_trip(CompressionMethod::Gzip);
    }

    #[test]
    fn test_block_bzip2_round_trip() {
        round_trip(CompressionMethod::Bzip2);
    }

    #[test]
    fn test_block_lzma_round_trip() {
        round_trip(CompressionMethod::Lzma);
    }

    #[test]
    fn test_raw_block_layout() {
        let block = Block::new(CompressionMethod::Raw, ContentType::CompressionHeader, 0, &[1, 0, 1, 0, 1, 0]).unwrap();
        let mut buf = Vec::new();
        block.write(&mut buf).unwrap();
        // Same bytes as the compression header block of the standard EOF container
        assert_eq!(
            buf,
            vec![0x00, 0x01, 0x00, 0x06, 0x06, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0xEE, 0x63, 0x01, 0x4B]
        );
    }

    #[test]
    fn test_corrupt_block_fails_checksum() {
        let block = Block::new(CompressionMethod::Raw, ContentType::Core, 0, b"ACGT").unwrap();
        let mut buf = Vec::new();
        block.write(&mut buf).unwrap();
        buf[6] ^= 0xFF;

        let err = Block::read(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, CramError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_unknown_method_and_content_type() {
        assert!(CompressionMethod::from_u8(9).is_err());
        assert!(ContentType::from_u8(6).is_err());
        for id in 0..=8 {
            assert_eq!(CompressionMethod::from_u8(id).unwrap().as_u8(), id);
        }
    }

    #[test]
    fn test_unsupported_methods_fail_cleanly() {
        let err = CompressionMethod::Rans4x16.decompress(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, CramError::InvalidFormat { .. }));
        assert!(Block::new(CompressionMethod::NameTokenizer, ContentType::External, 1, b"x").is_err());
    }

    #[test]
    fn test_empty_payload_stored_raw() {
        let block = Block::new(CompressionMethod::Gzip, ContentType::Core, 0, &[]).unwrap();
        assert_eq!(block.method(), CompressionMethod::Raw);
        assert_eq!(block.compressed_size(), 0);
    }

    #[test]
    fn test_truncated_block() {
        let block = Block::new(CompressionMethod::Raw, ContentType::Core, 0, b"ACGTACGT").unwrap();
        let mut buf = Vec::new();
        block.write(&mut buf).unwrap();
        buf.truncate(buf.len() - 6);
        assert!(Block::read(&mut Cursor::new(buf)).is_err());
    }
}
