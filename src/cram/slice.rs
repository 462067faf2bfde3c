//! Slices: header block + core block + external blocks
//!
//! A slice is the unit of random access. Its records are written with one
//! private [`EncodeStreams`] set, so slices of the same container can be
//! emitted and decoded on separate threads.

use super::block::{Block, CompressionMethod, ContentType};
use super::compression_header::CompressionHeader;
use super::data_series::DataSeries;
use super::record::{CramRecord, FieldSink, FieldSource, SliceContext};
use crate::codec::{DecodeStreams, EncodeStreams};
use crate::io::num::{read_array, read_len};
use crate::io::{read_itf8, read_ltf8, write_itf8, write_ltf8};
use crate::{CramError, Result};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use tracing::debug;

/// Reference id of a slice whose records have no reference.
pub const UNMAPPED_REFERENCE: i32 = -1;
/// Reference id of a slice spanning several references.
pub const MULTI_REFERENCE: i32 = -2;

/// Content id of the core block.
pub const CORE_CONTENT_ID: i32 = 0;

/// Reference placement shared by a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Extent {
    pub reference_id: i32,
    pub alignment_start: i32,
    pub alignment_span: i32,
}

impl Extent {
    /// Derive the placement of `records`.
    ///
    /// A single shared reference id becomes the slice's id, otherwise
    /// [`MULTI_REFERENCE`]. Start and span cover the mapped records and are
    /// zero when there are none or the id is negative.
    pub fn of(records: &[CramRecord]) -> Result<Self> {
        let reference_id = match records.split_first() {
            None => UNMAPPED_REFERENCE,
            Some((first, rest)) => {
                if rest.iter().all(|r| r.reference_id == first.reference_id) {
                    first.reference_id
                } else {
                    MULTI_REFERENCE
                }
            }
        };

        let mut bounds: Option<(i64, i64)> = None;
        if reference_id >= 0 {
            for record in records.iter().filter(|r| !r.is_unmapped()) {
                let start = record.alignment_start as i64;
                let end = record.alignment_end();
                bounds = Some(match bounds {
                    None => (start, end),
                    Some((lo, hi)) => (lo.min(start), hi.max(end)),
                });
            }
        }

        let (alignment_start, alignment_span) = match bounds {
            Some((start, end)) => (start, (end - start + 1).max(0)),
            None => (0, 0),
        };
        Ok(Self {
            reference_id,
            alignment_start: to_i32(alignment_start, "alignment start")?,
            alignment_span: to_i32(alignment_span, "alignment span")?,
        })
    }

    /// Field-walk state for a slice placed at this extent.
    pub fn context(&self, ap_delta: bool, read_names: bool) -> SliceContext {
        SliceContext {
            reference_id: self.reference_id,
            multi_reference: self.reference_id == MULTI_REFERENCE,
            ap_delta,
            read_names,
            previous_start: self.alignment_start,
        }
    }

    /// Combine slice extents into the enclosing container's extent.
    pub fn merge(extents: impl IntoIterator<Item = Extent>) -> Result<Self> {
        let mut reference_id = None;
        let mut bounds: Option<(i64, i64)> = None;
        for extent in extents {
            reference_id = Some(match reference_id {
                None => extent.reference_id,
                Some(id) if id == extent.reference_id => id,
                Some(_) => MULTI_REFERENCE,
            });
            if extent.alignment_span > 0 {
                let start = extent.alignment_start as i64;
                let end = start + extent.alignment_span as i64 - 1;
                bounds = Some(match bounds {
                    None => (start, end),
                    Some((lo, hi)) => (lo.min(start), hi.max(end)),
                });
            }
        }

        let reference_id = reference_id.unwrap_or(UNMAPPED_REFERENCE);
        let (alignment_start, alignment_span) = match bounds {
            Some((start, end)) if reference_id >= 0 => (start, end - start + 1),
            _ => (0, 0),
        };
        Ok(Self {
            reference_id,
            alignment_start: to_i32(alignment_start, "alignment start")?,
            alignment_span: to_i32(alignment_span, "alignment span")?,
        })
    }
}

fn to_i32(value: i64, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| CramError::invariant(format!("{} out of range: {}", what, value)))
}

/// Slice header, stored in its own block ahead of the data blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceHeader {
    /// Reference id (-1 unmapped, -2 multi-reference)
    pub reference_id: i32,
    /// 1-based start of the mapped records, 0 when there are none
    pub alignment_start: i32,
    pub alignment_span: i32,
    pub record_count: i32,
    /// Index of the slice's first record within the file
    pub record_counter: i64,
    /// Data blocks following the header (core included)
    pub block_count: i32,
    /// Content ids of those blocks, core first
    pub content_ids: Vec<i32>,
    /// Content id of an embedded reference block, -1 for none
    pub embedded_reference: i32,
    /// MD5 of the covered reference bases; zero when not computed
    pub reference_md5: [u8; 16],
}

impl SliceHeader {
    pub fn is_multi_reference(&self) -> bool {
        self.reference_id == MULTI_REFERENCE
    }

    pub(crate) fn extent(&self) -> Extent {
        Extent {
            reference_id: self.reference_id,
            alignment_start: self.alignment_start,
            alignment_span: self.alignment_span,
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(48 + self.content_ids.len() * 2);
        write_itf8(&mut buf, self.reference_id)?;
        write_itf8(&mut buf, self.alignment_start)?;
        write_itf8(&mut buf, self.alignment_span)?;
        write_itf8(&mut buf, self.record_count)?;
        write_ltf8(&mut buf, self.record_counter)?;
        write_itf8(&mut buf, self.block_count)?;
        write_itf8(&mut buf, self.content_ids.len() as i32)?;
        for &id in &self.content_ids {
            write_itf8(&mut buf, id)?;
        }
        write_itf8(&mut buf, self.embedded_reference)?;
        buf.extend_from_slice(&self.reference_md5);
        Ok(buf)
    }

    fn parse(mut data: &[u8]) -> Result<Self> {
        let reader = &mut data;
        let reference_id = read_itf8(reader)?;
        let alignment_start = read_itf8(reader)?;
        let alignment_span = read_itf8(reader)?;
        let record_count = read_itf8(reader)?;
        if record_count < 0 {
            return Err(CramError::format(format!("Negative slice record count: {}", record_count)));
        }
        let record_counter = read_ltf8(reader)?;
        let block_count = read_itf8(reader)?;
        let id_count = read_len(reader, "slice content id count")?;
        let content_ids = (0..id_count).map(|_| read_itf8(reader)).collect::<Result<Vec<_>>>()?;
        let embedded_reference = read_itf8(reader)?;
        let reference_md5 = read_array(reader, "slice reference MD5")?;
        // Optional trailing tags are not interpreted

        Ok(Self {
            reference_id,
            alignment_start,
            alignment_span,
            record_count,
            record_counter,
            block_count,
            content_ids,
            embedded_reference,
            reference_md5,
        })
    }
}

/// One encoded slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub header: SliceHeader,
    pub core: Block,
    /// External blocks by content id
    pub external: BTreeMap<i32, Block>,
}

impl Slice {
    /// EMIT: encode `records` with the codecs bound in `header`.
    ///
    /// Every record is validated first, and every record's tag set must be
    /// interned in the header's tag dictionary.
    pub fn encode(
        records: &[CramRecord],
        header: &CompressionHeader,
        record_counter: i64,
        method: CompressionMethod,
    ) -> Result<Self> {
        let extent = Extent::of(records)?;
        let mut ctx = extent.context(header.ap_delta(), header.read_names_included());

        let mut sink = EncodeSink {
            header,
            streams: EncodeStreams::new(),
        };
        for record in records {
            record.validate()?;
            let ids = record.tag_ids();
            let line = header.tag_dictionary().index_of(&ids).ok_or_else(|| {
                CramError::config(format!("Tag set {:?} missing from the tag dictionary", ids))
            })?;
            record.write_fields(line, &mut ctx, &mut sink)?;
        }

        let core_bits = sink.streams.core_bits();
        let (core, external) = sink.streams.finish()?;
        let core = Block::new(method, ContentType::Core, CORE_CONTENT_ID, &core)?;
        let external = external
            .into_iter()
            .map(|(id, data)| Ok((id, Block::new(method, ContentType::External, id, &data)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let mut content_ids = vec![CORE_CONTENT_ID];
        content_ids.extend(external.keys().copied());
        let header = SliceHeader {
            reference_id: extent.reference_id,
            alignment_start: extent.alignment_start,
            alignment_span: extent.alignment_span,
            record_count: to_i32(records.len() as i64, "slice record count")?,
            record_counter,
            block_count: content_ids.len() as i32,
            content_ids,
            embedded_reference: -1,
            reference_md5: [0; 16],
        };

        debug!(
            records = records.len(),
            reference_id = header.reference_id,
            core_bits,
            external_blocks = external.len(),
            "Encoded slice"
        );

        Ok(Self { header, core, external })
    }

    /// DECODE-FIELDS: rebuild the slice's records.
    ///
    /// The placement recomputed from the decoded records must match the
    /// persisted header, otherwise the slice is rejected.
    pub fn decode(&self, header: &CompressionHeader) -> Result<Vec<CramRecord>> {
        let core = self.core.decompress()?;
        let external = self
            .external
            .iter()
            .map(|(&id, block)| Ok((id, block.decompress()?)))
            .collect::<Result<Vec<_>>>()?;

        let mut source = DecodeSource {
            header,
            streams: DecodeStreams::new(&core, external.iter().map(|(id, data)| (*id, data.as_slice()))),
        };
        let mut ctx = SliceContext {
            reference_id: self.header.reference_id,
            multi_reference: self.header.is_multi_reference(),
            ap_delta: header.ap_delta(),
            read_names: header.read_names_included(),
            previous_start: self.header.alignment_start,
        };

        let count = self.header.record_count.max(0) as usize;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(CramRecord::read_fields(header.tag_dictionary(), &mut ctx, &mut source)?);
        }

        let actual = Extent::of(&records)?;
        if actual != self.header.extent() {
            return Err(CramError::invariant(format!(
                "Slice header declares {:?}, records span {:?}",
                self.header.extent(),
                actual
            )));
        }
        Ok(records)
    }

    /// Serialize header block, core block, then external blocks in content-id order.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let header = Block::new(
            CompressionMethod::Raw,
            ContentType::SliceHeader,
            0,
            &self.header.to_bytes()?,
        )?;
        let mut written = header.write(writer)?;
        written += self.core.write(writer)?;
        for block in self.external.values() {
            written += block.write(writer)?;
        }
        Ok(written)
    }

    /// Parse one slice and check its blocks against the header's content-id list.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let block = Block::read(reader)?;
        if block.content_type() != ContentType::SliceHeader {
            return Err(CramError::format(format!(
                "Expected slice header block, found {:?}",
                block.content_type()
            )));
        }
        let header = SliceHeader::parse(&block.decompress()?)?;
        if header.block_count < 0 {
            return Err(CramError::format(format!("Negative slice block count: {}", header.block_count)));
        }

        let mut core = None;
        let mut external = BTreeMap::new();
        for _ in 0..header.block_count {
            let block = Block::read(reader)?;
            match block.content_type() {
                ContentType::Core if core.is_none() => core = Some(block),
                ContentType::External => {
                    let id = block.content_id();
                    if external.insert(id, block).is_some() {
                        return Err(CramError::format(format!("Duplicate external block for content ID {}", id)));
                    }
                }
                other => {
                    return Err(CramError::format(format!("Unexpected {:?} block inside a slice", other)));
                }
            }
        }
        let core = core.ok_or_else(|| CramError::format("Slice has no core block"))?;

        let mut declared = header.content_ids.clone();
        declared.sort_unstable();
        let mut found: Vec<i32> = external.keys().copied().collect();
        found.push(core.content_id());
        found.sort_unstable();
        if declared != found {
            return Err(CramError::format(format!(
                "Slice declares content IDs {:?}, blocks carry {:?}",
                header.content_ids, found
            )));
        }

        cram_debug!(
            "Slice: ref={}, start={}, span={}, records={}, blocks={}",
            header.reference_id,
            header.alignment_start,
            header.alignment_span,
            header.record_count,
            header.block_count
        );

        Ok(Self { header, core, external })
    }
}

struct EncodeSink<'a> {
    header: &'a CompressionHeader,
    streams: EncodeStreams,
}

impl FieldSink for EncodeSink<'_> {
    fn int(&mut self, series: DataSeries, value: i64) -> Result<()> {
        self.streams.write_int(self.header.encoding(series), value)
    }

    fn byte(&mut self, series: DataSeries, value: u8) -> Result<()> {
        self.streams.write_byte(self.header.encoding(series), value)
    }

    fn bytes(&mut self, series: DataSeries, value: &[u8]) -> Result<()> {
        self.streams.write_bytes(self.header.encoding(series), value)
    }

    fn tag(&mut self, key: i32, value: &[u8]) -> Result<()> {
        let encoding = self
            .header
            .tag_encoding(key)
            .ok_or_else(|| CramError::config(format!("No encoding for tag key {:#08x}", key)))?;
        self.streams.write_bytes(encoding, value)
    }
}

struct DecodeSource<'a, 'b> {
    header: &'a CompressionHeader,
    streams: DecodeStreams<'b>,
}

impl FieldSource for DecodeSource<'_, '_> {
    fn int(&mut self, series: DataSeries) -> Result<i64> {
        self.streams.read_int(self.header.encoding(series))
    }

    fn byte(&mut self, series: DataSeries) -> Result<u8> {
        self.streams.read_byte(self.header.encoding(series))
    }

    fn bytes(&mut self, series: DataSeries) -> Result<Vec<u8>> {
        self.streams.read_bytes(self.header.encoding(series))
    }

    fn tag(&mut self, key: i32) -> Result<Vec<u8>> {
        let encoding = self
            .header
            .tag_encoding(key)
            .ok_or_else(|| CramError::format(format!("No encoding for tag key {:#08x}", key)))?;
        self.streams.read_bytes(encoding)
    }
}
