//! CRAM writer: ACCUMULATE → FINALIZE-HEADER → EMIT → PACK
//!
//! Records are buffered until a container's worth has arrived. The buffer is
//! then walked once to collect per-column statistics, the optimizers pick a
//! codec for every integer column, and the records are walked again through
//! the finished [`CompressionHeader`], one slice per worker.

use super::block::CompressionMethod;
use super::compression_header::{CompressionHeader, SubstitutionMatrix, TagIdDictionary};
use super::container::Container;
use super::data_series::DataSeries;
use super::file::{write_eof, write_sam_header, FileDefinition};
use super::reader::SliceOffset;
use super::record::{CramRecord, FieldSink};
use super::slice::{Extent, Slice};
use crate::codec::{CodecOptimizer, Encoding};
use crate::Result;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tracing::{debug, trace};

/// Writer configuration.
///
/// # Example
///
/// ```
/// use biometal_cram::cram::{CompressionMethod, WriterOptions};
///
/// let options = WriterOptions::default()
///     .with_records_per_slice(5_000)
///     .with_external_method(CompressionMethod::Bzip2)
///     .with_parallel(false);
/// assert_eq!(options.records_per_slice, 5_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Records per slice (at least 1)
    pub records_per_slice: usize,
    /// Slices per container (at least 1)
    pub slices_per_container: usize,
    /// Compression of core and external blocks
    pub external_method: CompressionMethod,
    /// Compression of the compression header block
    pub header_method: CompressionMethod,
    /// Keep read names (RN)
    pub preserve_read_names: bool,
    /// Store alignment starts as deltas within a slice
    pub ap_delta: bool,
    /// Matrix the records' substitution codes were derived with
    pub substitution_matrix: SubstitutionMatrix,
    /// Emit slices on the rayon pool
    pub parallel: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            records_per_slice: 10_000,
            slices_per_container: 1,
            external_method: CompressionMethod::Gzip,
            header_method: CompressionMethod::Raw,
            preserve_read_names: true,
            ap_delta: true,
            substitution_matrix: SubstitutionMatrix::default(),
            parallel: true,
        }
    }
}

impl WriterOptions {
    pub fn with_records_per_slice(mut self, records: usize) -> Self {
        self.records_per_slice = records.max(1);
        self
    }

    pub fn with_slices_per_container(mut self, slices: usize) -> Self {
        self.slices_per_container = slices.max(1);
        self
    }

    pub fn with_external_method(mut self, method: CompressionMethod) -> Self {
        self.external_method = method;
        self
    }

    pub fn with_header_method(mut self, method: CompressionMethod) -> Self {
        self.header_method = method;
        self
    }

    pub fn with_read_names(mut self, preserve: bool) -> Self {
        self.preserve_read_names = preserve;
        self
    }

    pub fn with_ap_delta(mut self, delta: bool) -> Self {
        self.ap_delta = delta;
        self
    }

    pub fn with_substitution_matrix(mut self, matrix: SubstitutionMatrix) -> Self {
        self.substitution_matrix = matrix;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Records buffered before a container is flushed.
    pub fn records_per_container(&self) -> usize {
        self.records_per_slice.max(1).saturating_mul(self.slices_per_container.max(1))
    }
}

/// Column statistics gathered during ACCUMULATE.
#[derive(Debug, Default)]
struct Statistics {
    optimizers: BTreeMap<DataSeries, CodecOptimizer>,
    bytes: BTreeSet<DataSeries>,
    /// Byte-array columns, flagged when some value contains a zero byte
    byte_arrays: BTreeMap<DataSeries, bool>,
    tags: BTreeSet<i32>,
}

impl FieldSink for Statistics {
    fn int(&mut self, series: DataSeries, value: i64) -> Result<()> {
        self.optimizers.entry(series).or_default().add(value);
        Ok(())
    }

    fn byte(&mut self, series: DataSeries, _value: u8) -> Result<()> {
        self.bytes.insert(series);
        Ok(())
    }

    fn bytes(&mut self, series: DataSeries, value: &[u8]) -> Result<()> {
        *self.byte_arrays.entry(series).or_default() |= value.contains(&0);
        Ok(())
    }

    fn tag(&mut self, key: i32, _value: &[u8]) -> Result<()> {
        self.tags.insert(key);
        Ok(())
    }
}

impl Statistics {
    /// FINALIZE-HEADER: bind a codec to every observed column.
    fn finalize(self, dictionary: TagIdDictionary, options: &WriterOptions) -> Result<CompressionHeader> {
        let mut builder = CompressionHeader::builder()
            .read_names_included(options.preserve_read_names)
            .ap_delta(options.ap_delta)
            .substitution_matrix(options.substitution_matrix)
            .tag_dictionary(dictionary);

        for (series, optimizer) in &self.optimizers {
            let encoding = match optimizer.try_select()? {
                Some(selection) => {
                    trace!(
                        series = %series,
                        encoding = %selection.encoding.parameter_string(),
                        bits = selection.total_bits,
                        "Selected codec"
                    );
                    selection.encoding
                }
                // Columns too wide for any bit codec are stored as plain ITF-8
                None => {
                    debug!(series = %series, "No bit codec fits column, using EXTERNAL");
                    Encoding::external(series.content_id())
                }
            };
            builder = builder.encoding(*series, encoding);
        }
        for &series in &self.bytes {
            builder = builder.encoding(series, Encoding::external(series.content_id()));
        }
        for (&series, &has_zero) in &self.byte_arrays {
            builder = builder.encoding(series, byte_array_encoding(series.content_id(), has_zero)?);
        }
        for &key in &self.tags {
            builder = builder.tag_encoding(key, byte_array_encoding(key, true)?);
        }
        builder.build()
    }
}

/// Stop-byte arrays unless a value contains the stop byte itself.
fn byte_array_encoding(content_id: i32, has_zero: bool) -> Result<Encoding> {
    if has_zero {
        Encoding::byte_array_len(Encoding::external(content_id), Encoding::external(content_id))
    } else {
        Ok(Encoding::byte_array_stop(0, content_id))
    }
}

/// Encode one container's worth of records.
///
/// Records are split into slices of `options.records_per_slice`; the first
/// record gets index `record_counter` within the file.
pub fn encode_container(records: &[CramRecord], record_counter: i64, options: &WriterOptions) -> Result<Container> {
    let per_slice = options.records_per_slice.max(1);

    // ACCUMULATE
    let mut statistics = Statistics::default();
    let mut dictionary = TagIdDictionary::new();
    for chunk in records.chunks(per_slice) {
        let mut ctx = Extent::of(chunk)?.context(options.ap_delta, options.preserve_read_names);
        for record in chunk {
            record.validate()?;
            let line = dictionary.intern(&record.tag_ids());
            record.write_fields(line, &mut ctx, &mut statistics)?;
        }
    }

    // FINALIZE-HEADER
    let header = statistics.finalize(dictionary, options)?;

    // EMIT
    let emit = |(index, chunk): (usize, &[CramRecord])| {
        Slice::encode(
            chunk,
            &header,
            record_counter + (index * per_slice) as i64,
            options.external_method,
        )
    };
    let slices = if options.parallel {
        records
            .par_chunks(per_slice)
            .enumerate()
            .map(emit)
            .collect::<Result<Vec<_>>>()?
    } else {
        records
            .chunks(per_slice)
            .enumerate()
            .map(emit)
            .collect::<Result<Vec<_>>>()?
    };

    // PACK
    let bases = records.iter().map(|r| r.read_length as i64).sum();
    Container::new(header, slices, record_counter, bases, options.header_method)
}

/// Streams records into a CRAM 3.0 file on any caller-supplied `Write`.
///
/// # Example
///
/// ```
/// use biometal_cram::cram::{CramRecord, CramWriter, WriterOptions, FLAG_UNMAPPED};
///
/// # fn main() -> biometal_cram::Result<()> {
/// let mut writer = CramWriter::new(Vec::new(), "@HD\tVN:1.6\n", WriterOptions::default())?;
/// writer.write_record(CramRecord {
///     bam_flags: FLAG_UNMAPPED,
///     reference_id: -1,
///     read_length: 4,
///     read_group: -1,
///     read_name: b"read1".to_vec(),
///     bases: b"ACGT".to_vec(),
///     ..Default::default()
/// })?;
/// let bytes = writer.finish()?;
/// assert!(bytes.starts_with(b"CRAM"));
/// # Ok(())
/// # }
/// ```
pub struct CramWriter<W: Write> {
    inner: W,
    options: WriterOptions,
    pending: Vec<CramRecord>,
    record_counter: i64,
    position: u64,
    slice_offsets: Vec<SliceOffset>,
}

impl<W: Write> CramWriter<W> {
    /// Write the file definition and SAM header container.
    pub fn new(inner: W, sam_header: &str, options: WriterOptions) -> Result<Self> {
        Self::with_definition(inner, FileDefinition::default(), sam_header, options)
    }

    pub fn with_definition(
        mut inner: W,
        definition: FileDefinition,
        sam_header: &str,
        options: WriterOptions,
    ) -> Result<Self> {
        definition.write(&mut inner)?;
        let header_bytes = write_sam_header(&mut inner, sam_header)?;
        Ok(Self {
            inner,
            options,
            pending: Vec::new(),
            record_counter: 0,
            position: 26 + header_bytes as u64,
            slice_offsets: Vec::new(),
        })
    }

    /// Buffer one record, flushing a container once enough have arrived.
    pub fn write_record(&mut self, record: CramRecord) -> Result<()> {
        record.validate()?;
        self.pending.push(record);
        if self.pending.len() >= self.options.records_per_container() {
            self.flush_container()?;
        }
        Ok(())
    }

    /// Encode and write buffered records as one container.
    pub fn flush_container(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let container = encode_container(&self.pending, self.record_counter, &self.options)?;

        for (slice_index, slice) in container.slices.iter().enumerate() {
            self.slice_offsets.push(SliceOffset {
                container_offset: self.position,
                landmark: container.header.landmarks[slice_index],
                slice_index,
                reference_id: slice.header.reference_id,
                alignment_start: slice.header.alignment_start,
                alignment_span: slice.header.alignment_span,
                record_count: slice.header.record_count,
            });
        }

        let written = container.write(&mut self.inner)?;
        debug!(
            offset = self.position,
            records = self.pending.len(),
            bytes = written,
            "Wrote container"
        );
        self.position += written as u64;
        self.record_counter += self.pending.len() as i64;
        self.pending.clear();
        Ok(())
    }

    /// Offsets of every slice written so far.
    pub fn slice_offsets(&self) -> &[SliceOffset] {
        &self.slice_offsets
    }

    /// Flush remaining records, append the EOF container and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.flush_container()?;
        write_eof(&mut self.inner)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}
