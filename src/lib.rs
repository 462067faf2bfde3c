//! biometal-cram: CRAM 3 columnar compression core
//!
//! # Overview
//!
//! Alignment records are split into columns (data series), every column is
//! bound to an entropy codec picked from its observed value distribution, and
//! the encoded columns are packed into blocks, slices and containers that a
//! reader can seek into without decoding earlier data.
//!
//! ## Quick Start
//!
//! ```no_run
//! use biometal_cram::cram::{CramReader, CramWriter, WriterOptions};
//! use std::fs::File;
//! use std::io::{BufReader, BufWriter};
//!
//! # fn main() -> biometal_cram::Result<()> {
//! let input = CramReader::new(BufReader::new(File::open("in.cram")?))?;
//! let header = input.sam_header().to_string();
//! let mut output = CramWriter::new(BufWriter::new(File::create("out.cram")?), &header, WriterOptions::default())?;
//! for record in input.records() {
//!     output.write_record(record?)?;
//! }
//! output.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`io`]: bit streams and ITF-8 / LTF-8 integers
//! - [`codec`]: the integer codec family, its parameter formats and the codec optimizer
//! - [`cram`]: compression header, blocks, slices, containers, reader and writer
//! - [`error`]: the crate error type

#![warn(rustdoc::missing_crate_level_docs)]

pub mod codec;
pub mod cram;
pub mod error;
pub mod io;

// Re-export commonly used types
pub use codec::{CodecOptimizer, CodecSelection, Encoding, EncodingId};
pub use cram::{CompressionHeader, CramReader, CramRecord, CramWriter, WriterOptions};
pub use error::{CramError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
