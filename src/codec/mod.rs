//! Entropy codec family
//!
//! Every codec is a variant of [`Encoding`]: an algorithm tag plus its
//! numeric parameters. One `match` per operation dispatches to the pure
//! per-family functions in [`family`], so the encode / decode / bit-length /
//! serialize contract stays uniform without trait objects.
//!
//! Integer codecs work on `value' = value + offset`, letting non-negative-only
//! codes cover arbitrary signed ranges.

pub mod family;
pub mod huffman;
pub mod optimizer;
pub mod params;
pub mod streams;

pub use huffman::HuffmanTable;
pub use optimizer::{CodecOptimizer, CodecSelection};
pub use params::EncodingParams;
pub use streams::{DecodeStreams, EncodeStreams};

use crate::io::{BitReader, BitWriter};
use crate::{CramError, Result};
use std::fmt;
use std::io::{Read, Write};

/// Algorithm identifiers persisted in the compression header.
///
/// The ordinals are part of the wire format and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EncodingId {
    /// Column absent from the container
    Null = 0,
    /// Values stored in an external block
    External = 1,
    Golomb = 2,
    Huffman = 3,
    /// Byte array as a length column plus a value column
    ByteArrayLen = 4,
    /// Byte array terminated by a stop byte in an external block
    ByteArrayStop = 5,
    Beta = 6,
    SubExp = 7,
    GolombRice = 8,
    Gamma = 9,
    Unary = 10,
}

impl EncodingId {
    /// Map a persisted ordinal back to its algorithm.
    pub fn from_u8(id: u8) -> Result<Self> {
        Ok(match id {
            0 => Self::Null,
            1 => Self::External,
            2 => Self::Golomb,
            3 => Self::Huffman,
            4 => Self::ByteArrayLen,
            5 => Self::ByteArrayStop,
            6 => Self::Beta,
            7 => Self::SubExp,
            8 => Self::GolombRice,
            9 => Self::Gamma,
            10 => Self::Unary,
            _ => return Err(CramError::format(format!("Unknown encoding ID: {}", id))),
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EncodingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::External => "EXTERNAL",
            Self::Golomb => "GOLOMB",
            Self::Huffman => "HUFFMAN",
            Self::ByteArrayLen => "BYTE_ARRAY_LEN",
            Self::ByteArrayStop => "BYTE_ARRAY_STOP",
            Self::Beta => "BETA",
            Self::SubExp => "SUBEXP",
            Self::GolombRice => "GOLOMB_RICE",
            Self::Gamma => "GAMMA",
            Self::Unary => "UNARY",
        };
        f.write_str(name)
    }
}

/// A codec bound to its configuration.
///
/// Constructed values are always valid: use the checked constructors or
/// [`Encoding::validate`] after building a variant by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// NULL encoding (no data)
    Null,
    /// External encoding: ITF-8 integers or raw bytes in an external block
    External {
        /// Content id of the external block
        content_id: i32,
    },
    /// Golomb code with modulus `m >= 2`
    Golomb {
        /// Offset added to each value before encoding
        offset: i64,
        /// Golomb modulus
        m: u64,
    },
    /// Canonical Huffman code
    Huffman(HuffmanTable),
    /// Byte array with length prefix
    ByteArrayLen {
        /// Encoding of the array length
        len: Box<Encoding>,
        /// Encoding of each array byte
        value: Box<Encoding>,
    },
    /// Byte array with stop byte
    ByteArrayStop {
        /// Byte value that terminates the array
        stop_byte: u8,
        /// External block containing stop-delimited data
        content_id: i32,
    },
    /// Fixed-width binary
    Beta {
        /// Offset added to each value before encoding
        offset: i64,
        /// Field width in bits
        bits: u32,
    },
    /// Subexponential code
    SubExp {
        /// Offset added to each value before encoding
        offset: i64,
        /// Subexponential parameter
        k: u32,
    },
    /// Golomb-Rice code (Golomb with m = 2^log2_m)
    GolombRice {
        /// Offset added to each value before encoding
        offset: i64,
        /// log2 of the modulus
        log2_m: u32,
    },
    /// Elias gamma code
    Gamma {
        /// Offset added to each value before encoding
        offset: i64,
        /// Bit value used for the unary length prefix (false = standard gamma)
        length_bit: bool,
    },
    /// Unary code
    Unary {
        /// Offset added to each value before encoding
        offset: i64,
        /// Bit value terminating the run
        stop_bit: bool,
    },
}

impl Encoding {
    pub fn golomb(offset: i64, m: u64) -> Result<Self> {
        Self::Golomb { offset, m }.validated()
    }

    pub fn golomb_rice(offset: i64, log2_m: u32) -> Result<Self> {
        Self::GolombRice { offset, log2_m }.validated()
    }

    pub fn subexp(offset: i64, k: u32) -> Result<Self> {
        Self::SubExp { offset, k }.validated()
    }

    pub fn beta(offset: i64, bits: u32) -> Result<Self> {
        Self::Beta { offset, bits }.validated()
    }

    pub fn gamma(offset: i64) -> Self {
        Self::Gamma { offset, length_bit: false }
    }

    pub fn unary(offset: i64) -> Self {
        Self::Unary { offset, stop_bit: false }
    }

    pub fn huffman(alphabet: Vec<i32>, bit_lengths: Vec<u32>) -> Result<Self> {
        Ok(Self::Huffman(HuffmanTable::new(alphabet, bit_lengths)?))
    }

    pub fn external(content_id: i32) -> Self {
        Self::External { content_id }
    }

    pub fn byte_array_len(len: Encoding, value: Encoding) -> Result<Self> {
        Self::ByteArrayLen {
            len: Box::new(len),
            value: Box::new(value),
        }
        .validated()
    }

    pub fn byte_array_stop(stop_byte: u8, content_id: i32) -> Self {
        Self::ByteArrayStop { stop_byte, content_id }
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Check parameter ranges; failures are configuration errors.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Golomb { m, .. } if *m < 2 || *m > u32::MAX as u64 => {
                Err(CramError::config(format!("Golomb modulus must be in 2..=2^32-1, got {}", m)))
            }
            Self::GolombRice { log2_m, .. } if *log2_m > 31 => {
                Err(CramError::config(format!("Golomb-Rice log2(m) must be <= 31, got {}", log2_m)))
            }
            Self::SubExp { k, .. } if *k > 31 => {
                Err(CramError::config(format!("Subexponential k must be <= 31, got {}", k)))
            }
            Self::Beta { bits, .. } if *bits > 32 => {
                Err(CramError::config(format!("Beta width must be <= 32 bits, got {}", bits)))
            }
            Self::ByteArrayLen { len, value } => {
                if len.is_byte_array() || value.is_byte_array() || matches!(**len, Self::Null) {
                    return Err(CramError::config("BYTE_ARRAY_LEN components must be integer encodings"));
                }
                len.validate()?;
                value.validate()
            }
            _ => Ok(()),
        }
    }

    pub fn id(&self) -> EncodingId {
        match self {
            Self::Null => EncodingId::Null,
            Self::External { .. } => EncodingId::External,
            Self::Golomb { .. } => EncodingId::Golomb,
            Self::Huffman(_) => EncodingId::Huffman,
            Self::ByteArrayLen { .. } => EncodingId::ByteArrayLen,
            Self::ByteArrayStop { .. } => EncodingId::ByteArrayStop,
            Self::Beta { .. } => EncodingId::Beta,
            Self::SubExp { .. } => EncodingId::SubExp,
            Self::GolombRice { .. } => EncodingId::GolombRice,
            Self::Gamma { .. } => EncodingId::Gamma,
            Self::Unary { .. } => EncodingId::Unary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_byte_array(&self) -> bool {
        matches!(self, Self::ByteArrayLen { .. } | Self::ByteArrayStop { .. })
    }

    /// True for codecs that write into the core bit stream.
    pub fn is_bit_codec(&self) -> bool {
        matches!(
            self,
            Self::Golomb { .. }
                | Self::Huffman(_)
                | Self::Beta { .. }
                | Self::SubExp { .. }
                | Self::GolombRice { .. }
                | Self::Gamma { .. }
                | Self::Unary { .. }
        )
    }

    fn offset(&self) -> i64 {
        match self {
            Self::Golomb { offset, .. }
            | Self::Beta { offset, .. }
            | Self::SubExp { offset, .. }
            | Self::GolombRice { offset, .. }
            | Self::Gamma { offset, .. }
            | Self::Unary { offset, .. } => *offset,
            _ => 0,
        }
    }

    /// Whether `value` lies inside this codec's encodable domain.
    pub fn accepts(&self, value: i64) -> bool {
        let shifted = value.checked_add(self.offset());
        match (self, shifted) {
            (Self::Null, _) | (Self::ByteArrayLen { .. }, _) | (Self::ByteArrayStop { .. }, _) => false,
            (Self::External { .. }, _) => i32::try_from(value).is_ok(),
            (Self::Huffman(table), _) => table.contains(value),
            (_, None) => false,
            (Self::Gamma { .. }, Some(v)) => v >= 1,
            (Self::Beta { bits, .. }, Some(v)) => v >= 0 && (*bits >= 63 || v < (1i64 << bits)),
            (_, Some(v)) => v >= 0,
        }
    }

    fn shifted(&self, value: i64) -> Result<u64> {
        if !self.accepts(value) {
            return Err(CramError::config(format!("Value {} is outside the domain of {:?}", value, self)));
        }
        Ok((value + self.offset()) as u64)
    }

    /// Bits a core-stream codec needs for `value`, without performing I/O.
    ///
    /// Only meaningful for values this codec [`accepts`](Self::accepts).
    pub fn bit_length(&self, value: i64) -> u64 {
        let v = (value.wrapping_add(self.offset())) as u64;
        match self {
            Self::Golomb { m, .. } => family::golomb_bit_length(v, *m),
            Self::GolombRice { log2_m, .. } => family::golomb_rice_bit_length(v, *log2_m),
            Self::SubExp { k, .. } => family::subexp_bit_length(v, *k),
            Self::Beta { bits, .. } => *bits as u64,
            Self::Gamma { .. } => family::gamma_bit_length(v),
            Self::Unary { .. } => family::unary_bit_length(v),
            Self::Huffman(table) => table.bit_length(value),
            _ => 0,
        }
    }

    /// Encode one integer into the core bit stream, returning the bits written.
    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>, value: i64) -> Result<u64> {
        if let Self::Huffman(table) = self {
            return table.encode(writer, value);
        }
        let v = self.shifted(value)?;
        match self {
            Self::Golomb { m, .. } => family::golomb_encode(writer, v, *m),
            Self::GolombRice { log2_m, .. } => family::golomb_rice_encode(writer, v, *log2_m),
            Self::SubExp { k, .. } => family::subexp_encode(writer, v, *k),
            Self::Beta { bits, .. } => family::beta_encode(writer, v, *bits),
            Self::Gamma { length_bit, .. } => family::gamma_encode(writer, v, *length_bit),
            Self::Unary { stop_bit, .. } => family::unary_encode(writer, v, *stop_bit),
            _ => Err(CramError::config(format!("{} is not a bit-stream codec", self.id()))),
        }
    }

    /// Decode one integer from the core bit stream.
    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<i64> {
        let v = match self {
            Self::Huffman(table) => return table.decode(reader),
            Self::Golomb { m, .. } => family::golomb_decode(reader, *m)?,
            Self::GolombRice { log2_m, .. } => family::golomb_rice_decode(reader, *log2_m)?,
            Self::SubExp { k, .. } => family::subexp_decode(reader, *k)?,
            Self::Beta { bits, .. } => family::beta_decode(reader, *bits)?,
            Self::Gamma { length_bit, .. } => family::gamma_decode(reader, *length_bit)?,
            Self::Unary { stop_bit, .. } => family::unary_decode(reader, *stop_bit)?,
            _ => return Err(CramError::config(format!("{} is not a bit-stream codec", self.id()))),
        };
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_sub(self.offset()))
            .ok_or_else(|| CramError::format(format!("Decoded value out of range: {}", v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn round_trip(encoding: &Encoding, values: &[i64]) {
        let mut writer = BitWriter::new(Vec::new());
        for &value in values {
            let bits = encoding.encode(&mut writer, value).unwrap();
            assert_eq!(bits, encoding.bit_length(value), "{:?} value {}", encoding, value);
        }
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        for &value in values {
            assert_eq!(encoding.decode(&mut reader).unwrap(), value, "{:?}", encoding);
        }
    }

    #[test]
    fn test_encoding_id_ordinals_are_stable() {
        let expected = [
            (EncodingId::Null, 0),
            (EncodingId::External, 1),
            (EncodingId::Golomb, 2),
            (EncodingId::Huffman, 3),
            (EncodingId::ByteArrayLen, 4),
            (EncodingId::ByteArrayStop, 5),
            (EncodingId::Beta, 6),
            (EncodingId::SubExp, 7),
            (EncodingId::GolombRice, 8),
            (EncodingId::Gamma, 9),
            (EncodingId::Unary, 10),
        ];
        for (id, ordinal) in expected {
            assert_eq!(id.as_u8(), ordinal);
            assert_eq!(EncodingId::from_u8(ordinal).unwrap(), id);
        }
        assert!(EncodingId::from_u8(11).is_err());
    }

    #[test]
    fn test_golomb_m3_example() {
        let golomb = Encoding::golomb(0, 3).unwrap();
        let lengths: Vec<u64> = (0..5).map(|v| golomb.bit_length(v)).collect();
        assert_eq!(lengths, vec![2, 3, 3, 3, 4]);
        round_trip(&golomb, &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_negative_values_via_offset() {
        round_trip(&Encoding::golomb(10, 4).unwrap(), &[-10, -3, 0, 7, 100]);
        round_trip(&Encoding::beta(128, 8).unwrap(), &[-128, -1, 0, 127]);
        round_trip(&Encoding::gamma(5), &[-4, -1, 0, 1000]);
        round_trip(&Encoding::unary(2), &[-2, 0, 3]);
    }

    #[test]
    fn test_domain_checks() {
        let gamma = Encoding::gamma(0);
        assert!(!gamma.accepts(0));
        assert!(gamma.accepts(1));

        let beta = Encoding::beta(0, 3).unwrap();
        assert!(beta.accepts(7));
        assert!(!beta.accepts(8));
        assert!(!beta.accepts(-1));

        let zero_width = Encoding::beta(0, 0).unwrap();
        assert!(zero_width.accepts(0));
        assert!(!zero_width.accepts(1));

        let mut writer = BitWriter::new(Vec::new());
        let err = Encoding::golomb(0, 5).unwrap().encode(&mut writer, -1).unwrap_err();
        assert!(matches!(err, CramError::EncodingConfig { .. }));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Encoding::golomb(0, 1).is_err());
        assert!(Encoding::golomb(0, 0).is_err());
        assert!(Encoding::golomb_rice(0, 32).is_err());
        assert!(Encoding::subexp(0, 40).is_err());
        assert!(Encoding::beta(0, 33).is_err());
        assert!(Encoding::byte_array_len(Encoding::byte_array_stop(0, 1), Encoding::external(2)).is_err());
    }

    #[test]
    fn test_zero_width_beta_writes_nothing() {
        let beta = Encoding::beta(0, 0).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        for _ in 0..100 {
            assert_eq!(beta.encode(&mut writer, 0).unwrap(), 0);
        }
        assert!(writer.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_non_bit_codecs_rejected_on_core_stream() {
        let mut writer = BitWriter::new(Vec::new());
        assert!(Encoding::external(1).encode(&mut writer, 1).is_err());
        assert!(Encoding::Null.encode(&mut writer, 1).is_err());
        let mut reader = BitReader::new(Cursor::new(vec![0u8; 4]));
        assert!(Encoding::Null.decode(&mut reader).is_err());
    }

    #[test]
    fn test_golomb_m2_matches_rice_1() {
        let golomb = Encoding::golomb(0, 2).unwrap();
        let rice = Encoding::golomb_rice(0, 1).unwrap();
        for v in 0..1000 {
            assert_eq!(golomb.bit_length(v), rice.bit_length(v));
        }
    }

    #[test]
    fn test_unary_exceeds_gamma_above_16() {
        let unary = Encoding::unary(0);
        let gamma = Encoding::gamma(0);
        for v in 17..5000 {
            assert!(unary.bit_length(v) > gamma.bit_length(v));
        }
    }

    fn bit_codec() -> impl Strategy<Value = Encoding> {
        prop_oneof![
            (-50i64..50, 2u64..40).prop_map(|(offset, m)| Encoding::Golomb { offset, m }),
            (-50i64..50, 0u32..20).prop_map(|(offset, log2_m)| Encoding::GolombRice { offset, log2_m }),
            (-50i64..50, 0u32..20).prop_map(|(offset, k)| Encoding::SubExp { offset, k }),
            (-50i64..50, 0u32..33).prop_map(|(offset, bits)| Encoding::Beta { offset, bits }),
            (-50i64..50, any::<bool>()).prop_map(|(offset, length_bit)| Encoding::Gamma { offset, length_bit }),
            (-50i64..50, any::<bool>()).prop_map(|(offset, stop_bit)| Encoding::Unary { offset, stop_bit }),
        ]
    }

    proptest! {
        /// Property: decode(encode(v)) == v and bits written == bit_length(v)
        #[test]
        fn prop_codec_round_trip(encoding in bit_codec(), raw in prop::collection::vec(0i64..2000, 1..50)) {
            let values: Vec<i64> = raw
                .into_iter()
                .map(|v| v - 60)
                .filter(|&v| encoding.accepts(v))
                .collect();

            let mut writer = BitWriter::new(Vec::new());
            let mut total = 0;
            for &value in &values {
                let bits = encoding.encode(&mut writer, value).unwrap();
                prop_assert_eq!(bits, encoding.bit_length(value));
                total += bits;
            }
            prop_assert_eq!(writer.bits_written(), total);
            let bytes = writer.into_inner().unwrap();

            let mut reader = BitReader::new(Cursor::new(bytes));
            for &value in &values {
                prop_assert_eq!(encoding.decode(&mut reader).unwrap(), value);
            }
        }
    }
}
