//! Containers: header with landmarks, compression header block, slices
//!
//! Landmarks are byte offsets measured from the end of the container header.
//! `landmarks[i]` is where slice `i`'s header block starts, so a reader holding
//! the container bytes (or a seekable source) can decode any slice alone.

use super::block::{Block, CompressionMethod, ContentType, HashingReader};
use super::compression_header::CompressionHeader;
use super::record::CramRecord;
use super::slice::{Extent, Slice, UNMAPPED_REFERENCE};
use crate::io::num::{read_array, read_i32_le, read_len, write_i32_le};
use crate::io::{read_itf8, read_ltf8, write_itf8, write_ltf8};
use crate::{CramError, Result};
use rayon::prelude::*;
use std::io::{Read, Write};
use tracing::debug;

/// Alignment start carried by the EOF container ("EOF" in ASCII).
pub const EOF_ALIGNMENT_START: i32 = 0x454f46;

/// Container header.
///
/// ```text
/// length           i32 LE   bytes following this header
/// reference id     ITF-8    -1 unmapped, -2 multi-reference
/// alignment start  ITF-8
/// alignment span   ITF-8
/// record count     ITF-8
/// record counter   LTF-8
/// bases            LTF-8
/// block count      ITF-8
/// landmarks        ITF-8 count + ITF-8 offsets
/// CRC32            u32 LE   over every preceding header byte
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerHeader {
    pub length: i32,
    pub reference_id: i32,
    pub alignment_start: i32,
    pub alignment_span: i32,
    pub record_count: i32,
    pub record_counter: i64,
    /// Sum of read lengths
    pub bases: i64,
    /// Blocks in the container body (compression header and slice blocks)
    pub block_count: i32,
    pub landmarks: Vec<i32>,
}

impl ContainerHeader {
    /// The end-of-file marker container.
    pub fn is_eof(&self) -> bool {
        self.record_count == 0
            && self.reference_id == UNMAPPED_REFERENCE
            && self.alignment_start == EOF_ALIGNMENT_START
            && self.landmarks.is_empty()
    }

    /// Serialize with trailing CRC32. Returns bytes written.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut buf = Vec::with_capacity(32 + self.landmarks.len() * 3);
        write_i32_le(&mut buf, self.length)?;
        write_itf8(&mut buf, self.reference_id)?;
        write_itf8(&mut buf, self.alignment_start)?;
        write_itf8(&mut buf, self.alignment_span)?;
        write_itf8(&mut buf, self.record_count)?;
        write_ltf8(&mut buf, self.record_counter)?;
        write_ltf8(&mut buf, self.bases)?;
        write_itf8(&mut buf, self.block_count)?;
        write_itf8(&mut buf, self.landmarks.len() as i32)?;
        for &landmark in &self.landmarks {
            write_itf8(&mut buf, landmark)?;
        }
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        writer.write_all(&buf)?;
        Ok(buf.len())
    }

    /// Parse a container header and verify its CRC32.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut reader = HashingReader::new(reader);
        let length = read_i32_le(&mut reader, "container length")?;
        if length < 0 {
            return Err(CramError::format(format!("Negative container length: {}", length)));
        }
        let header = Self::read_fields(&mut reader, length)?;

        let actual = reader.checksum();
        let expected = u32::from_le_bytes(read_array(reader.inner_mut(), "container CRC32")?);
        if expected != actual {
            return Err(CramError::ChecksumMismatch { expected, actual });
        }
        Ok(header)
    }

    fn read_fields<R: Read>(reader: &mut R, length: i32) -> Result<Self> {
        let reference_id = read_itf8(reader)?;
        let alignment_start = read_itf8(reader)?;
        let alignment_span = read_itf8(reader)?;
        let record_count = read_itf8(reader)?;
        let record_counter = read_ltf8(reader)?;
        let bases = read_ltf8(reader)?;
        let block_count = read_itf8(reader)?;
        let landmark_count = read_len(reader, "landmark count")?;
        let landmarks = (0..landmark_count)
            .map(|_| read_itf8(reader))
            .collect::<Result<Vec<_>>>()?;

        cram_debug!(
            "Container: length={}, ref={}, start={}, span={}, records={}, landmarks={:?}",
            length,
            reference_id,
            alignment_start,
            alignment_span,
            record_count,
            landmarks
        );

        Ok(Self {
            length,
            reference_id,
            alignment_start,
            alignment_span,
            record_count,
            record_counter,
            bases,
            block_count,
            landmarks,
        })
    }

    pub(crate) fn extent(&self) -> Extent {
        Extent {
            reference_id: self.reference_id,
            alignment_start: self.alignment_start,
            alignment_span: self.alignment_span,
        }
    }
}

/// A fully materialized container: PACK output on the write path.
#[derive(Debug, Clone)]
pub struct Container {
    pub header: ContainerHeader,
    pub compression_header: CompressionHeader,
    pub slices: Vec<Slice>,
    /// Serialized body: compression header block followed by the slices
    body: Vec<u8>,
}

impl Container {
    /// PACK: lay out the body and derive landmarks, extent and counts.
    pub fn new(
        compression_header: CompressionHeader,
        slices: Vec<Slice>,
        record_counter: i64,
        bases: i64,
        header_method: CompressionMethod,
    ) -> Result<Self> {
        let mut body = Vec::new();
        Block::new(
            header_method,
            ContentType::CompressionHeader,
            0,
            &compression_header.to_bytes()?,
        )?
        .write(&mut body)?;

        let mut landmarks = Vec::with_capacity(slices.len());
        let mut block_count = 1;
        let mut record_count: i64 = 0;
        for slice in &slices {
            landmarks.push(offset(body.len())?);
            slice.write(&mut body)?;
            block_count += 1 + slice.header.block_count;
            record_count += slice.header.record_count as i64;
        }

        let extent = Extent::merge(slices.iter().map(|s| s.header.extent()))?;
        let header = ContainerHeader {
            length: offset(body.len())?,
            reference_id: extent.reference_id,
            alignment_start: extent.alignment_start,
            alignment_span: extent.alignment_span,
            record_count: i32::try_from(record_count)
                .map_err(|_| CramError::config(format!("Too many records for one container: {}", record_count)))?,
            record_counter,
            bases,
            block_count,
            landmarks,
        };

        debug!(
            slices = slices.len(),
            records = header.record_count,
            bytes = body.len(),
            "Packed container"
        );

        Ok(Self {
            header,
            compression_header,
            slices,
            body,
        })
    }

    /// Serialize header and body. Returns bytes written.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let written = self.header.write(writer)?;
        writer.write_all(&self.body)?;
        Ok(written + self.body.len())
    }

    /// Read and parse every slice of the next container.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        ContainerView::read(reader)?.into_container()
    }

    /// Decode every record, slices in order.
    pub fn decode(&self) -> Result<Vec<CramRecord>> {
        let mut records = Vec::with_capacity(self.header.record_count.max(0) as usize);
        for slice in &self.slices {
            records.extend(slice.decode(&self.compression_header)?);
        }
        Ok(records)
    }
}

fn offset(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| CramError::config(format!("Container too large: {} bytes", len)))
}

/// A container whose slices are parsed on demand through its landmarks.
#[derive(Debug, Clone)]
pub struct ContainerView {
    pub header: ContainerHeader,
    pub compression_header: CompressionHeader,
    data: Vec<u8>,
}

impl ContainerView {
    /// PARSE-HEADER: read one container's bytes and parse only its compression header.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let header = ContainerHeader::read(reader)?;
        let mut data = vec![0u8; header.length as usize];
        reader.read_exact(&mut data).map_err(|e| {
            CramError::format(format!("Failed to read container body ({} bytes): {}", header.length, e))
        })?;
        Self::from_parts(header, data)
    }

    /// Build a view over an already-read container body.
    pub fn from_parts(header: ContainerHeader, data: Vec<u8>) -> Result<Self> {
        let mut cursor = data.as_slice();
        let block = Block::read(&mut cursor)?;
        if block.content_type() != ContentType::CompressionHeader {
            return Err(CramError::format(format!(
                "Expected compression header block, found {:?}",
                block.content_type()
            )));
        }
        let compression_header = CompressionHeader::parse(&block.decompress()?)?;

        let header_end = data.len() - cursor.len();
        let mut previous = header_end;
        for &landmark in &header.landmarks {
            let landmark = usize::try_from(landmark)
                .map_err(|_| CramError::format(format!("Negative landmark: {}", landmark)))?;
            if landmark < previous || landmark > data.len() {
                return Err(CramError::format(format!(
                    "Landmark {} outside container body [{}, {}]",
                    landmark,
                    previous,
                    data.len()
                )));
            }
            previous = landmark;
        }

        Ok(Self {
            header,
            compression_header,
            data,
        })
    }

    pub fn slice_count(&self) -> usize {
        self.header.landmarks.len()
    }

    /// PARSE-SLICES: parse slice `index` starting at its landmark.
    pub fn slice(&self, index: usize) -> Result<Slice> {
        let start = *self
            .header
            .landmarks
            .get(index)
            .ok_or_else(|| CramError::format(format!("Slice index {} out of range", index)))? as usize;
        let end = self
            .header
            .landmarks
            .get(index + 1)
            .map_or(self.data.len(), |&next| next as usize);

        let mut cursor = self
            .data
            .get(start..end)
            .ok_or_else(|| CramError::format(format!("Slice {} landmarks out of order", index)))?;
        let slice = Slice::read(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(CramError::format(format!(
                "Slice {} leaves {} bytes before the next landmark",
                index,
                cursor.len()
            )));
        }
        Ok(slice)
    }

    pub fn decode_slice(&self, index: usize) -> Result<Vec<CramRecord>> {
        self.slice(index)?.decode(&self.compression_header)
    }

    /// Decode all slices, optionally on the rayon pool. Record order is preserved.
    pub fn decode(&self, parallel: bool) -> Result<Vec<CramRecord>> {
        let per_slice: Vec<Vec<CramRecord>> = if parallel {
            (0..self.slice_count())
                .into_par_iter()
                .map(|i| self.decode_slice(i))
                .collect::<Result<_>>()?
        } else {
            (0..self.slice_count())
                .map(|i| self.decode_slice(i))
                .collect::<Result<_>>()?
        };

        let records: Vec<CramRecord> = per_slice.into_iter().flatten().collect();
        if records.len() != self.header.record_count.max(0) as usize {
            return Err(CramError::invariant(format!(
                "Container declares {} records, slices hold {}",
                self.header.record_count,
                records.len()
            )));
        }
        Ok(records)
    }

    /// Parse every slice and check the container extent against them.
    pub fn into_container(self) -> Result<Container> {
        let slices = (0..self.slice_count())
            .map(|i| self.slice(i))
            .collect::<Result<Vec<_>>>()?;
        let extent = Extent::merge(slices.iter().map(|s| s.header.extent()))?;
        if !slices.is_empty() && extent != self.header.extent() {
            return Err(CramError::invariant(format!(
                "Container header declares {:?}, slices span {:?}",
                self.header.extent(),
                extent
            )));
        }
        Ok(Container {
            header: self.header,
            compression_header: self.compression_header,
            slices,
            body: self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cram::file::EOF_CONTAINER;
    use std::io::Cursor;

    #[test]
    fn test_eof_container_header() {
        let header = ContainerHeader::read(&mut Cursor::new(&EOF_CONTAINER[..])).unwrap();
        assert!(header.is_eof());
        assert_eq!(header.length, 15);
        assert_eq!(header.block_count, 1);

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf, &EOF_CONTAINER[..23]);
    }

    #[test]
    fn test_eof_container_body_parses() {
        let mut cursor = Cursor::new(&EOF_CONTAINER[..]);
        let view = ContainerView::read(&mut cursor).unwrap();
        assert_eq!(view.slice_count(), 0);
        assert!(view.decode(false).unwrap().is_empty());
        assert_eq!(cursor.position() as usize, EOF_CONTAINER.len());
    }

    #[test]
    fn test_header_crc_mismatch() {
        let mut bytes = EOF_CONTAINER.to_vec();
        bytes[5] ^= 0x01;
        assert!(matches!(
            ContainerHeader::read(&mut Cursor::new(bytes)),
            Err(CramError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_landmarks_out_of_range() {
        let header = ContainerHeader {
            length: 8,
            landmarks: vec![100],
            ..Default::default()
        };
        let data = EOF_CONTAINER[23..].to_vec();
        assert!(ContainerView::from_parts(header, data).is_err());
    }
}
