//! CRAM reader over any caller-supplied `Read`
//!
//! Sequential access walks containers in order and decodes them through
//! [`ContainerView`]. With `Read + Seek`, [`CramReader::read_slice`] jumps
//! straight to one slice through its container's landmark.

use super::block::{Block, ContentType};
use super::compression_header::CompressionHeader;
use super::container::{ContainerHeader, ContainerView};
use super::file::{read_sam_header, FileDefinition};
use super::record::CramRecord;
use super::slice::Slice;
use crate::{CramError, Result};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Location and placement of one slice, for downstream index builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceOffset {
    /// Byte offset of the container from the start of the stream
    pub container_offset: u64,
    /// Slice offset within the container body
    pub landmark: i32,
    pub slice_index: usize,
    pub reference_id: i32,
    pub alignment_start: i32,
    pub alignment_span: i32,
    pub record_count: i32,
}

/// Tracks the stream position so container offsets are known without `Seek`.
struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}

/// CRAM 3 reader.
///
/// # Example
///
/// ```no_run
/// use biometal_cram::cram::CramReader;
/// use std::fs::File;
/// use std::io::BufReader;
///
/// # fn main() -> biometal_cram::Result<()> {
/// let reader = CramReader::new(BufReader::new(File::open("sample.cram")?))?;
/// for record in reader.records() {
///     let record = record?;
///     println!("{} {}", String::from_utf8_lossy(&record.read_name), record.alignment_start);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CramReader<R: Read> {
    inner: CountingReader<R>,
    definition: FileDefinition,
    sam_header: String,
    finished: bool,
    parallel: bool,
}

impl<R: Read> CramReader<R> {
    /// Read the file definition and SAM header container.
    pub fn new(inner: R) -> Result<Self> {
        let mut inner = CountingReader { inner, position: 0 };
        let definition = FileDefinition::read(&mut inner)?;
        let sam_header = read_sam_header(&mut inner)?;
        debug!(
            major = definition.major_version,
            minor = definition.minor_version,
            "Opened CRAM stream"
        );
        Ok(Self {
            inner,
            definition,
            sam_header,
            finished: false,
            parallel: true,
        })
    }

    /// Decode slices of a container on the rayon pool (default true).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn definition(&self) -> &FileDefinition {
        &self.definition
    }

    pub fn sam_header(&self) -> &str {
        &self.sam_header
    }

    /// Read the next data container, `None` after the EOF container.
    ///
    /// A stream that ends cleanly on a container boundary without an EOF
    /// container is accepted with a warning.
    pub fn read_container(&mut self) -> Result<Option<ContainerView>> {
        Ok(self.next_container()?.map(|(_, view)| view))
    }

    fn next_container(&mut self) -> Result<Option<(u64, ContainerView)>> {
        if self.finished {
            return Ok(None);
        }
        let offset = self.inner.position;
        let mut first = [0u8; 1];
        if self.inner.read(&mut first)? == 0 {
            warn!(offset, "CRAM stream ended without an EOF container");
            self.finished = true;
            return Ok(None);
        }

        let mut chained = (&first[..]).chain(&mut self.inner);
        let view = match ContainerView::read(&mut chained) {
            Ok(view) => view,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        if view.header.is_eof() {
            self.finished = true;
            return Ok(None);
        }
        debug!(
            offset,
            records = view.header.record_count,
            slices = view.slice_count(),
            "Read container"
        );
        Ok(Some((offset, view)))
    }

    /// Iterate over every remaining record.
    pub fn records(self) -> Records<R> {
        Records {
            reader: self,
            buffer: Vec::new().into_iter(),
        }
    }

    /// Scan the remaining containers and report where each slice lives.
    ///
    /// Slice headers are parsed, record fields are not decoded.
    pub fn slice_offsets(&mut self) -> Result<Vec<SliceOffset>> {
        let mut offsets = Vec::new();
        while let Some((container_offset, view)) = self.next_container()? {
            for slice_index in 0..view.slice_count() {
                let header = view.slice(slice_index)?.header;
                offsets.push(SliceOffset {
                    container_offset,
                    landmark: view.header.landmarks[slice_index],
                    slice_index,
                    reference_id: header.reference_id,
                    alignment_start: header.alignment_start,
                    alignment_span: header.alignment_span,
                    record_count: header.record_count,
                });
            }
        }
        Ok(offsets)
    }
}

impl<R: Read + Seek> CramReader<R> {
    /// Decode one slice without touching the container's other slices.
    ///
    /// The stream position is restored afterwards, so sequential reading can
    /// continue.
    pub fn read_slice(&mut self, offset: &SliceOffset) -> Result<Vec<CramRecord>> {
        let resume = self.inner.position;
        let result = self.read_slice_at(offset);
        self.inner.seek(SeekFrom::Start(resume))?;
        result
    }

    fn read_slice_at(&mut self, offset: &SliceOffset) -> Result<Vec<CramRecord>> {
        self.inner.seek(SeekFrom::Start(offset.container_offset))?;
        let header = ContainerHeader::read(&mut self.inner)?;
        if usize::try_from(offset.landmark).ok().map_or(true, |l| l >= header.length as usize) {
            return Err(CramError::format(format!(
                "Landmark {} outside container of {} bytes",
                offset.landmark, header.length
            )));
        }
        let body_start = self.inner.position;

        let block = Block::read(&mut self.inner)?;
        if block.content_type() != ContentType::CompressionHeader {
            return Err(CramError::format(format!(
                "Expected compression header block, found {:?}",
                block.content_type()
            )));
        }
        let compression_header = CompressionHeader::parse(&block.decompress()?)?;

        self.inner
            .seek(SeekFrom::Start(body_start + offset.landmark as u64))?;
        let slice = Slice::read(&mut self.inner)?;
        slice.decode(&compression_header)
    }
}

/// Record iterator returned by [`CramReader::records`].
pub struct Records<R: Read> {
    reader: CramReader<R>,
    buffer: std::vec::IntoIter<CramRecord>,
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<CramRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            match self.reader.read_container() {
                Ok(Some(view)) => match view.decode(self.reader.parallel) {
                    Ok(records) => self.buffer = records.into_iter(),
                    Err(e) => {
                        self.reader.finished = true;
                        return Some(Err(e));
                    }
                },
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
