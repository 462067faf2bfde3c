//! Data series (column) identifiers

use crate::{CramError, Result};
use std::fmt;

/// Shape of the values a data series carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Integer column, priced by the optimizer and coded in the core stream
    Int,
    /// Single bytes, stored verbatim in the column's external block
    Byte,
    /// Variable-length byte strings
    ByteArray,
}

/// CRAM data series identifier.
///
/// Two-character codes identifying the per-record columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSeries {
    /// BAM bit flags
    BF,
    /// CRAM bit flags
    CF,
    /// Reference ID
    RI,
    /// Read lengths
    RL,
    /// Alignment start positions
    AP,
    /// Read groups
    RG,
    /// Read names
    RN,
    /// Next mate bit flags
    MF,
    /// Next fragment reference ID
    NS,
    /// Next fragment alignment start
    NP,
    /// Template size
    TS,
    /// Records to the next fragment
    NF,
    /// Tag names list ID
    TL,
    /// Number of read features
    FN,
    /// Feature codes
    FC,
    /// In-read positions (delta from the previous feature)
    FP,
    /// Base substitution codes
    BS,
    /// Insertion sequences
    IN,
    /// Deletion lengths
    DL,
    /// Soft clip sequences
    SC,
    /// Bases
    BA,
    /// Reference skip lengths
    RS,
    /// Hard clip lengths
    HC,
    /// Padding lengths
    PD,
    /// Mapping qualities
    MQ,
    /// Quality scores
    QS,
}

impl DataSeries {
    /// Every known series, in encoding-map write order.
    pub const ALL: [DataSeries; 26] = [
        Self::BF,
        Self::CF,
        Self::RI,
        Self::RL,
        Self::AP,
        Self::RG,
        Self::RN,
        Self::MF,
        Self::NS,
        Self::NP,
        Self::TS,
        Self::NF,
        Self::TL,
        Self::FN,
        Self::FC,
        Self::FP,
        Self::BS,
        Self::IN,
        Self::DL,
        Self::SC,
        Self::BA,
        Self::RS,
        Self::HC,
        Self::PD,
        Self::MQ,
        Self::QS,
    ];

    pub fn as_bytes(self) -> [u8; 2] {
        match self {
            Self::BF => *b"BF",
            Self::CF => *b"CF",
            Self::RI => *b"RI",
            Self::RL => *b"RL",
            Self::AP => *b"AP",
            Self::RG => *b"RG",
            Self::RN => *b"RN",
            Self::MF => *b"MF",
            Self::NS => *b"NS",
            Self::NP => *b"NP",
            Self::TS => *b"TS",
            Self::NF => *b"NF",
            Self::TL => *b"TL",
            Self::FN => *b"FN",
            Self::FC => *b"FC",
            Self::FP => *b"FP",
            Self::BS => *b"BS",
            Self::IN => *b"IN",
            Self::DL => *b"DL",
            Self::SC => *b"SC",
            Self::BA => *b"BA",
            Self::RS => *b"RS",
            Self::HC => *b"HC",
            Self::PD => *b"PD",
            Self::MQ => *b"MQ",
            Self::QS => *b"QS",
        }
    }

    /// Parse a 2-byte key. Unknown keys are a hard format error.
    pub fn from_bytes(bytes: [u8; 2]) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|series| series.as_bytes() == bytes)
            .ok_or_else(|| {
                CramError::format(format!(
                    "Unknown data series key: {}",
                    String::from_utf8_lossy(&bytes)
                ))
            })
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Self::FC | Self::BS | Self::BA | Self::QS => ValueKind::Byte,
            Self::RN | Self::IN | Self::SC => ValueKind::ByteArray,
            _ => ValueKind::Int,
        }
    }

    /// External block content id reserved for this series.
    ///
    /// Ids start at 1; 0 belongs to the core block.
    pub fn content_id(self) -> i32 {
        Self::ALL.iter().position(|&s| s == self).map_or(0, |i| i as i32 + 1)
    }
}

impl fmt::Display for DataSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        write!(f, "{}{}", bytes[0] as char, bytes[1] as char)
    }
}
