//! Byte- and bit-level primitives
//!
//! The core never opens files: everything here reads from or writes to a
//! caller-supplied `Read`/`Write`.

pub mod bits;
pub mod num;

pub use bits::{BitReader, BitWriter};
pub use num::{itf8_size, ltf8_size, read_itf8, read_ltf8, write_itf8, write_ltf8};
