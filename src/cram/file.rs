//! File-level framing: file definition, SAM header container, EOF container

use super::block::{Block, CompressionMethod, ContentType};
use super::container::ContainerHeader;
use crate::io::num::{read_array, read_i32_le, read_u8, write_i32_le};
use crate::{CramError, Result};
use std::io::{Read, Write};
use tracing::debug;

/// Magic number opening every CRAM file.
pub const CRAM_MAGIC: &[u8; 4] = b"CRAM";

/// Standard CRAM 3 end-of-file container.
pub const EOF_CONTAINER: [u8; 38] = [
    0x0f, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0x0f, 0xe0, 0x45, 0x4f, 0x46, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
    0x05, 0xbd, 0xd9, 0x4f, 0x00, 0x01, 0x00, 0x06, 0x06, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0xee, 0x63, 0x01, 0x4b,
];

/// The 26-byte file definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDefinition {
    pub major_version: u8,
    pub minor_version: u8,
    /// Free-form file identifier, usually a name or checksum
    pub file_id: [u8; 20],
}

impl Default for FileDefinition {
    fn default() -> Self {
        Self {
            major_version: 3,
            minor_version: 0,
            file_id: [0; 20],
        }
    }
}

impl FileDefinition {
    /// CRAM 3.0 definition; `id` is truncated or zero-padded to 20 bytes.
    pub fn new(id: &[u8]) -> Self {
        let mut file_id = [0u8; 20];
        let n = id.len().min(20);
        file_id[..n].copy_from_slice(&id[..n]);
        Self {
            file_id,
            ..Default::default()
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(CRAM_MAGIC)?;
        writer.write_all(&[self.major_version, self.minor_version])?;
        writer.write_all(&self.file_id)?;
        Ok(())
    }

    /// Parse and validate magic and version. CRAM 3.0 and 3.1 are accepted.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let magic: [u8; 4] = read_array(reader, "CRAM magic number")?;
        if &magic != CRAM_MAGIC {
            return Err(CramError::format(format!(
                "Invalid CRAM magic number: expected 'CRAM', found '{}'",
                String::from_utf8_lossy(&magic)
            )));
        }

        let major_version = read_u8(reader, "CRAM major version")?;
        let minor_version = read_u8(reader, "CRAM minor version")?;
        match (major_version, minor_version) {
            (3, 0) | (3, 1) => {}
            (2, _) => {
                return Err(CramError::format(format!(
                    "CRAM 2.x is not supported (found {}.{})",
                    major_version, minor_version
                )));
            }
            _ => {
                return Err(CramError::format(format!(
                    "Unsupported CRAM version: {}.{} (only 3.0 and 3.1 are supported)",
                    major_version, minor_version
                )));
            }
        }

        let file_id = read_array(reader, "CRAM file ID")?;
        Ok(Self {
            major_version,
            minor_version,
            file_id,
        })
    }
}

/// Write the SAM header container: one raw file-header block holding the text.
pub fn write_sam_header<W: Write>(writer: &mut W, text: &str) -> Result<usize> {
    let len = i32::try_from(text.len())
        .map_err(|_| CramError::config(format!("SAM header too large: {} bytes", text.len())))?;
    let mut payload = Vec::with_capacity(text.len() + 4);
    write_i32_le(&mut payload, len)?;
    payload.extend_from_slice(text.as_bytes());

    let mut body = Vec::new();
    Block::new(CompressionMethod::Raw, ContentType::FileHeader, 0, &payload)?.write(&mut body)?;

    let header = ContainerHeader {
        length: body.len() as i32,
        block_count: 1,
        ..Default::default()
    };
    let written = header.write(writer)?;
    writer.write_all(&body)?;
    Ok(written + body.len())
}

/// Read the SAM header container and return the header text.
///
/// Padding after the file-header block is skipped.
pub fn read_sam_header<R: Read>(reader: &mut R) -> Result<String> {
    let header = ContainerHeader::read(reader)?;
    if header.record_count != 0 {
        return Err(CramError::format(format!(
            "Expected SAM header container, found {} records",
            header.record_count
        )));
    }
    let mut body = vec![0u8; header.length as usize];
    reader
        .read_exact(&mut body)
        .map_err(|e| CramError::format(format!("Failed to read SAM header container: {}", e)))?;

    let block = Block::read(&mut body.as_slice())?;
    if block.content_type() != ContentType::FileHeader {
        return Err(CramError::format(format!(
            "Expected file header block, found {:?}",
            block.content_type()
        )));
    }
    let data = block.decompress()?;
    let mut cursor = data.as_slice();
    let len = read_i32_le(&mut cursor, "SAM header length")?;
    let len = usize::try_from(len)
        .ok()
        .filter(|&n| n <= cursor.len())
        .ok_or_else(|| CramError::format(format!("SAM header length {} exceeds its block", len)))?;
    let text = String::from_utf8(cursor[..len].to_vec())
        .map_err(|e| CramError::format(format!("Invalid UTF-8 in SAM header: {}", e)))?;

    debug!(bytes = len, "Read SAM header");
    Ok(text)
}

/// Append the standard EOF container.
pub fn write_eof<W: Write>(writer: &mut W) -> Result<usize> {
    writer.write_all(&EOF_CONTAINER)?;
    Ok(EOF_CONTAINER.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn definition_bytes(major: u8, minor: u8) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"CRAM");
        data.push(major);
        data.push(minor);
        data.extend_from_slice(&[0u8; 20]);
        data
    }

    #[test]
    fn test_file_definition_round_trip() {
        let definition = FileDefinition::new(b"sample.cram");
        let mut buf = Vec::new();
        definition.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 26);
        assert_eq!(FileDefinition::read(&mut Cursor::new(buf)).unwrap(), definition);
    }

    #[test]
    fn test_cram_version_3_1_accepted() {
        let definition = FileDefinition::read(&mut Cursor::new(definition_bytes(3, 1))).unwrap();
        assert_eq!((definition.major_version, definition.minor_version), (3, 1));
    }

    #[test]
    fn test_cram_magic_number_invalid() {
        let mut data = definition_bytes(3, 0);
        data[..4].copy_from_slice(b"BAMX");
        let err = FileDefinition::read(&mut Cursor::new(data)).unwrap_err();
        assert!(err.to_string().contains("Invalid CRAM magic number"));
    }

    #[test]
    fn test_cram_version_2_x_rejected() {
        let err = FileDefinition::read(&mut Cursor::new(definition_bytes(2, 1))).unwrap_err();
        assert!(err.to_string().contains("CRAM 2.x is not supported"));
    }

    #[test]
    fn test_cram_version_unsupported() {
        let err = FileDefinition::read(&mut Cursor::new(definition_bytes(4, 0))).unwrap_err();
        assert!(err.to_string().contains("Unsupported CRAM version: 4.0"));
    }

    #[test]
    fn test_cram_truncated_file_id() {
        let mut data = definition_bytes(3, 0);
        data.truncate(16);
        let err = FileDefinition::read(&mut Cursor::new(data)).unwrap_err();
        assert!(err.to_string().contains("Failed to read CRAM file ID"));
    }

    #[test]
    fn test_sam_header_round_trip() {
        let text = "@HD\tVN:1.6\tSO:coordinate\n@SQ\tSN:chr1\tLN:248956422\n";
        let mut buf = Vec::new();
        let written = write_sam_header(&mut buf, text).unwrap();
        assert_eq!(written, buf.len());

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_sam_header(&mut cursor).unwrap(), text);
        assert_eq!(cursor.position() as usize, written);
    }

    #[test]
    fn test_eof_container_bytes() {
        let mut buf = Vec::new();
        assert_eq!(write_eof(&mut buf).unwrap(), 38);
        assert_eq!(buf, EOF_CONTAINER);
    }
}
