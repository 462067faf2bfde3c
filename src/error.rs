//! Error types for biometal-cram

use thiserror::Error;

/// Result type alias for CRAM operations
pub type Result<T> = std::result::Result<T, CramError>;

/// Error types that can occur while encoding or decoding CRAM data
///
/// None of these are recoverable at the stream level: bit-level codecs carry no
/// resynchronization markers, so a corrupt block invalidates its slice and a
/// corrupt slice invalidates its container.
#[derive(Debug, Error)]
pub enum CramError {
    /// I/O error from the caller-supplied sink or source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CRAM structure (unknown keys, bad enum ordinals, truncation)
    #[error("Invalid CRAM format: {msg}")]
    InvalidFormat {
        /// Error message
        msg: String,
    },

    /// Codec parameters that cannot be bound (wrong arity, non-numeric, modulus < 2)
    #[error("Invalid encoding configuration: {msg}")]
    EncodingConfig {
        /// Error message
        msg: String,
    },

    /// A bit read ran past the end of the underlying byte source
    #[error("Bit stream exhausted")]
    StreamExhausted,

    /// Block compression/decompression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// CRC32 stored in the stream does not match the bytes read
    #[error("CRC32 mismatch: expected {expected:#010x}, found {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum persisted in the stream
        expected: u32,
        /// Checksum computed over the bytes read
        actual: u32,
    },

    /// Persisted structure disagrees with what the decoded records imply
    #[error("Invariant violation: {msg}")]
    InvariantViolation {
        /// Error message
        msg: String,
    },
}

impl CramError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat { msg: msg.into() }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::EncodingConfig { msg: msg.into() }
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation { msg: msg.into() }
    }
}
