//! CRAM 3 container engine
//!
//! # Layering
//!
//! ```text
//! file       : file definition, SAM header container, data containers, EOF container
//! container  : container header (landmarks) + compression header block + slices
//! slice      : slice header block + core block + external blocks
//! block      : method, content type, content id, sizes, payload, CRC32
//! ```
//!
//! # Write path
//!
//! ACCUMULATE (records feed per-column [`CodecOptimizer`](crate::codec::CodecOptimizer)s)
//! → FINALIZE-HEADER (an immutable [`CompressionHeader`])
//! → EMIT (records re-walked through the chosen codecs, one stream set per slice)
//! → PACK (streams → blocks → slices → container with landmarks).
//!
//! # Read path
//!
//! PARSE-HEADER → PARSE-SLICES (lazily, through landmarks) → DECODE-FIELDS.
//!
//! Every block starts on a byte boundary, so a reader can seek to any
//! landmark and decode that slice without touching earlier ones.

/// Extra per-entry trace output, compiled in only with the `cram-debug` feature.
#[cfg(feature = "cram-debug")]
macro_rules! cram_debug {
    ($($arg:tt)*) => {
        tracing::trace!(target: "biometal_cram::debug", $($arg)*)
    };
}

#[cfg(not(feature = "cram-debug"))]
macro_rules! cram_debug {
    ($($arg:tt)*) => {};
}

pub mod block;
pub mod compression_header;
pub mod container;
pub mod data_series;
pub mod file;
pub mod reader;
pub mod record;
pub mod slice;
pub mod writer;

pub use block::{Block, CompressionMethod, ContentType};
pub use compression_header::{
    CompressionHeader, CompressionHeaderBuilder, PreservationMap, SubstitutionMatrix, TagIdDictionary,
};
pub use container::{Container, ContainerHeader, ContainerView};
pub use data_series::{DataSeries, ValueKind};
pub use file::FileDefinition;
pub use reader::{CramReader, Records, SliceOffset};
pub use record::{CramRecord, MateInfo, ReadFeature, Tag, FLAG_UNMAPPED};
pub use slice::{Slice, SliceHeader};
pub use writer::{encode_container, CramWriter, WriterOptions};
