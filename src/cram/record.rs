//! Per-record field values and the CRAM 3 field walk
//!
//! [`CramRecord`] is the boundary with the upstream record source: every field
//! arrives already derived from the alignment (feature list, substitution
//! codes, tag value bytes). Nothing here interprets CIGARs or reference bases.
//!
//! The order in which fields are written is defined once, in
//! [`CramRecord::write_fields`]. It feeds the optimizers during ACCUMULATE and
//! the codecs during EMIT; [`CramRecord::read_fields`] mirrors it exactly.

use super::compression_header::TagIdDictionary;
use super::data_series::DataSeries;
use crate::{CramError, Result};

/// BAM flag: segment unmapped
pub const FLAG_UNMAPPED: u16 = 0x4;

/// CRAM flag: quality scores stored as an array
pub const CF_QUALITY_ARRAY: i32 = 0x1;
/// CRAM flag: mate information stored in this record
pub const CF_DETACHED: i32 = 0x2;
/// CRAM flag: mate is a later record in the same slice
pub const CF_MATE_DOWNSTREAM: i32 = 0x4;

/// Mate information, either stored inline or by reference to a later record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MateInfo {
    #[default]
    None,
    /// Mate fields written with the record (MF, NS, NP, TS)
    Detached {
        /// Mate flags (MF)
        flags: i32,
        /// Mate reference ID (NS)
        reference_id: i32,
        /// Mate alignment start (NP)
        alignment_start: i32,
        /// Template size (TS)
        template_size: i32,
    },
    /// Mate found `records_to_next` + 1 records later in the slice (NF)
    Downstream {
        /// Records skipped before the mate
        records_to_next: i32,
    },
}

/// One auxiliary tag: 2-byte name, BAM type code, opaque value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: [u8; 2],
    pub value_type: u8,
    pub value: Vec<u8>,
}

impl Tag {
    pub fn new(name: [u8; 2], value_type: u8, value: Vec<u8>) -> Self {
        Self { name, value_type, value }
    }

    /// Tag-dictionary entry: name bytes followed by the type byte.
    pub fn id(&self) -> [u8; 3] {
        [self.name[0], self.name[1], self.value_type]
    }

    /// Composite key used by the tag encoding map.
    pub fn key(&self) -> i32 {
        key_of(self.id())
    }
}

pub(crate) fn key_of(id: [u8; 3]) -> i32 {
    (id[0] as i32) << 16 | (id[1] as i32) << 8 | id[2] as i32
}

/// Read feature: how a mapped read departs from the reference.
///
/// Positions are 1-based within the read and non-decreasing along the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFeature {
    /// `X`: substituted base, as a substitution-matrix code (BS)
    Substitution { position: i32, code: u8 },
    /// `B`: explicit base and quality (BA, QS)
    ReadBase { position: i32, base: u8, quality: u8 },
    /// `i`: single inserted base (BA)
    InsertBase { position: i32, base: u8 },
    /// `I`: inserted bases (IN)
    Insertion { position: i32, bases: Vec<u8> },
    /// `S`: soft-clipped bases (SC)
    SoftClip { position: i32, bases: Vec<u8> },
    /// `D`: deletion length (DL)
    Deletion { position: i32, length: i32 },
    /// `N`: reference skip length (RS)
    ReferenceSkip { position: i32, length: i32 },
    /// `H`: hard clip length (HC)
    HardClip { position: i32, length: i32 },
    /// `P`: padding length (PD)
    Padding { position: i32, length: i32 },
    /// `q`: single quality score (QS)
    QualityScore { position: i32, score: u8 },
}

impl ReadFeature {
    /// Feature code (FC).
    pub fn code(&self) -> u8 {
        match self {
            Self::Substitution { .. } => b'X',
            Self::ReadBase { .. } => b'B',
            Self::InsertBase { .. } => b'i',
            Self::Insertion { .. } => b'I',
            Self::SoftClip { .. } => b'S',
            Self::Deletion { .. } => b'D',
            Self::ReferenceSkip { .. } => b'N',
            Self::HardClip { .. } => b'H',
            Self::Padding { .. } => b'P',
            Self::QualityScore { .. } => b'q',
        }
    }

    pub fn position(&self) -> i32 {
        match self {
            Self::Substitution { position, .. }
            | Self::ReadBase { position, .. }
            | Self::InsertBase { position, .. }
            | Self::Insertion { position, .. }
            | Self::SoftClip { position, .. }
            | Self::Deletion { position, .. }
            | Self::ReferenceSkip { position, .. }
            | Self::HardClip { position, .. }
            | Self::Padding { position, .. }
            | Self::QualityScore { position, .. } => *position,
        }
    }

    /// Reference bases consumed minus read bases consumed, relative to a plain match.
    fn reference_delta(&self) -> i64 {
        match self {
            Self::Deletion { length, .. } | Self::ReferenceSkip { length, .. } => *length as i64,
            Self::Insertion { bases, .. } | Self::SoftClip { bases, .. } => -(bases.len() as i64),
            Self::InsertBase { .. } => -1,
            _ => 0,
        }
    }

    fn write_payload<S: FieldSink>(&self, sink: &mut S) -> Result<()> {
        match self {
            Self::Substitution { code, .. } => sink.byte(DataSeries::BS, *code),
            Self::ReadBase { base, quality, .. } => {
                sink.byte(DataSeries::BA, *base)?;
                sink.byte(DataSeries::QS, *quality)
            }
            Self::InsertBase { base, .. } => sink.byte(DataSeries::BA, *base),
            Self::Insertion { bases, .. } => sink.bytes(DataSeries::IN, bases),
            Self::SoftClip { bases, .. } => sink.bytes(DataSeries::SC, bases),
            Self::Deletion { length, .. } => sink.int(DataSeries::DL, *length as i64),
            Self::ReferenceSkip { length, .. } => sink.int(DataSeries::RS, *length as i64),
            Self::HardClip { length, .. } => sink.int(DataSeries::HC, *length as i64),
            Self::Padding { length, .. } => sink.int(DataSeries::PD, *length as i64),
            Self::QualityScore { score, .. } => sink.byte(DataSeries::QS, *score),
        }
    }

    fn read_payload<S: FieldSource>(code: u8, position: i32, source: &mut S) -> Result<Self> {
        Ok(match code {
            b'X' => Self::Substitution {
                position,
                code: source.byte(DataSeries::BS)?,
            },
            b'B' => Self::ReadBase {
                position,
                base: source.byte(DataSeries::BA)?,
                quality: source.byte(DataSeries::QS)?,
            },
            b'i' => Self::InsertBase {
                position,
                base: source.byte(DataSeries::BA)?,
            },
            b'I' => Self::Insertion {
                position,
                bases: source.bytes(DataSeries::IN)?,
            },
            b'S' => Self::SoftClip {
                position,
                bases: source.bytes(DataSeries::SC)?,
            },
            b'D' => Self::Deletion {
                position,
                length: source.int32(DataSeries::DL)?,
            },
            b'N' => Self::ReferenceSkip {
                position,
                length: source.int32(DataSeries::RS)?,
            },
            b'H' => Self::HardClip {
                position,
                length: source.int32(DataSeries::HC)?,
            },
            b'P' => Self::Padding {
                position,
                length: source.int32(DataSeries::PD)?,
            },
            b'q' => Self::QualityScore {
                position,
                score: source.byte(DataSeries::QS)?,
            },
            _ => return Err(CramError::format(format!("Unknown feature code: '{}'", code as char))),
        })
    }
}

/// One alignment record, as supplied by the record source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CramRecord {
    /// BAM flags (BF)
    pub bam_flags: u16,
    /// Reference sequence ID, -1 when unplaced (RI)
    pub reference_id: i32,
    /// Read length (RL)
    pub read_length: i32,
    /// 1-based alignment start (AP)
    pub alignment_start: i32,
    /// Read group index, -1 for none (RG)
    pub read_group: i32,
    /// Read name (RN); dropped when names are not preserved
    pub read_name: Vec<u8>,
    pub mate: MateInfo,
    pub tags: Vec<Tag>,
    /// Differences from the reference; mapped records only
    pub features: Vec<ReadFeature>,
    /// Mapping quality (MQ); mapped records only
    pub mapping_quality: i32,
    /// Per-base qualities (QS), `read_length` long when present
    pub quality_scores: Option<Vec<u8>>,
    /// Read bases (BA); unmapped records only, `read_length` long
    pub bases: Vec<u8>,
}

impl CramRecord {
    pub fn is_unmapped(&self) -> bool {
        self.bam_flags & FLAG_UNMAPPED != 0
    }

    /// CRAM flags (CF) implied by the record's contents.
    pub fn cram_flags(&self) -> i32 {
        let mut flags = 0;
        if self.quality_scores.is_some() {
            flags |= CF_QUALITY_ARRAY;
        }
        match self.mate {
            MateInfo::Detached { .. } => flags |= CF_DETACHED,
            MateInfo::Downstream { .. } => flags |= CF_MATE_DOWNSTREAM,
            MateInfo::None => {}
        }
        flags
    }

    /// Ordered tag-dictionary line for this record.
    pub fn tag_ids(&self) -> Vec<[u8; 3]> {
        self.tags.iter().map(Tag::id).collect()
    }

    /// Reference bases covered: read length adjusted by indels, skips and soft clips.
    pub fn reference_length(&self) -> i64 {
        self.read_length as i64 + self.features.iter().map(ReadFeature::reference_delta).sum::<i64>()
    }

    /// 1-based inclusive alignment end (`start + reference length - 1`).
    pub fn alignment_end(&self) -> i64 {
        self.alignment_start as i64 + self.reference_length() - 1
    }

    /// Reject records whose fields contradict each other.
    pub fn validate(&self) -> Result<()> {
        if self.read_length < 0 {
            return Err(CramError::invariant(format!("Negative read length: {}", self.read_length)));
        }
        let read_length = self.read_length as usize;
        if let Some(scores) = &self.quality_scores {
            if scores.len() != read_length {
                return Err(CramError::invariant(format!(
                    "Record has {} quality scores for read length {}",
                    scores.len(),
                    read_length
                )));
            }
        }
        if self.is_unmapped() {
            if self.bases.len() != read_length {
                return Err(CramError::invariant(format!(
                    "Unmapped record has {} bases for read length {}",
                    self.bases.len(),
                    read_length
                )));
            }
            if !self.features.is_empty() {
                return Err(CramError::invariant("Unmapped record carries read features"));
            }
            if self.mapping_quality != 0 {
                return Err(CramError::invariant(format!(
                    "Unmapped record has mapping quality {}",
                    self.mapping_quality
                )));
            }
        } else if !self.bases.is_empty() {
            return Err(CramError::invariant("Mapped record bases come from read features"));
        }
        let mut previous = 0;
        for feature in &self.features {
            if feature.position() < previous {
                return Err(CramError::invariant(format!(
                    "Read feature positions out of order: {} after {}",
                    feature.position(),
                    previous
                )));
            }
            previous = feature.position();
        }
        Ok(())
    }

    /// Walk every field in CRAM 3 record order.
    pub(crate) fn write_fields<S: FieldSink>(&self, tag_line: i32, ctx: &mut SliceContext, sink: &mut S) -> Result<()> {
        sink.int(DataSeries::BF, self.bam_flags as i64)?;
        sink.int(DataSeries::CF, self.cram_flags() as i64)?;
        if ctx.multi_reference {
            sink.int(DataSeries::RI, self.reference_id as i64)?;
        }
        sink.int(DataSeries::RL, self.read_length as i64)?;
        if ctx.ap_delta {
            sink.int(DataSeries::AP, self.alignment_start as i64 - ctx.previous_start as i64)?;
            ctx.previous_start = self.alignment_start;
        } else {
            sink.int(DataSeries::AP, self.alignment_start as i64)?;
        }
        sink.int(DataSeries::RG, self.read_group as i64)?;
        if ctx.read_names {
            sink.bytes(DataSeries::RN, &self.read_name)?;
        }

        match &self.mate {
            MateInfo::Detached {
                flags,
                reference_id,
                alignment_start,
                template_size,
            } => {
                sink.int(DataSeries::MF, *flags as i64)?;
                sink.int(DataSeries::NS, *reference_id as i64)?;
                sink.int(DataSeries::NP, *alignment_start as i64)?;
                sink.int(DataSeries::TS, *template_size as i64)?;
            }
            MateInfo::Downstream { records_to_next } => sink.int(DataSeries::NF, *records_to_next as i64)?,
            MateInfo::None => {}
        }

        sink.int(DataSeries::TL, tag_line as i64)?;
        for tag in &self.tags {
            sink.tag(tag.key(), &tag.value)?;
        }

        if self.is_unmapped() {
            for &base in &self.bases {
                sink.byte(DataSeries::BA, base)?;
            }
        } else {
            sink.int(DataSeries::FN, self.features.len() as i64)?;
            let mut previous = 0;
            for feature in &self.features {
                sink.byte(DataSeries::FC, feature.code())?;
                sink.int(DataSeries::FP, feature.position() as i64 - previous as i64)?;
                previous = feature.position();
                feature.write_payload(sink)?;
            }
            sink.int(DataSeries::MQ, self.mapping_quality as i64)?;
        }

        if let Some(scores) = &self.quality_scores {
            for &score in scores {
                sink.byte(DataSeries::QS, score)?;
            }
        }
        Ok(())
    }

    /// Decode one record, mirroring [`write_fields`](Self::write_fields).
    pub(crate) fn read_fields<S: FieldSource>(
        dictionary: &TagIdDictionary,
        ctx: &mut SliceContext,
        source: &mut S,
    ) -> Result<Self> {
        let bam_flags = source.int(DataSeries::BF)?;
        let bam_flags = u16::try_from(bam_flags)
            .map_err(|_| CramError::format(format!("BAM flags out of range: {}", bam_flags)))?;
        let cram_flags = source.int32(DataSeries::CF)?;
        let reference_id = if ctx.multi_reference {
            source.int32(DataSeries::RI)?
        } else {
            ctx.reference_id
        };
        let read_length = source.int32(DataSeries::RL)?;
        if read_length < 0 {
            return Err(CramError::format(format!("Negative read length: {}", read_length)));
        }
        let alignment_start = if ctx.ap_delta {
            let start = checked_i32(ctx.previous_start as i64 + source.int(DataSeries::AP)?, "alignment start")?;
            ctx.previous_start = start;
            start
        } else {
            source.int32(DataSeries::AP)?
        };
        let read_group = source.int32(DataSeries::RG)?;
        let read_name = if ctx.read_names {
            source.bytes(DataSeries::RN)?
        } else {
            Vec::new()
        };

        let mate = if cram_flags & CF_DETACHED != 0 {
            MateInfo::Detached {
                flags: source.int32(DataSeries::MF)?,
                reference_id: source.int32(DataSeries::NS)?,
                alignment_start: source.int32(DataSeries::NP)?,
                template_size: source.int32(DataSeries::TS)?,
            }
        } else if cram_flags & CF_MATE_DOWNSTREAM != 0 {
            MateInfo::Downstream {
                records_to_next: source.int32(DataSeries::NF)?,
            }
        } else {
            MateInfo::None
        };

        let tag_line = source.int32(DataSeries::TL)?;
        let tags = dictionary
            .line(tag_line)?
            .iter()
            .map(|&id| {
                let value = source.tag(key_of(id))?;
                Ok(Tag::new([id[0], id[1]], id[2], value))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut record = CramRecord {
            bam_flags,
            reference_id,
            read_length,
            alignment_start,
            read_group,
            read_name,
            mate,
            tags,
            ..Default::default()
        };

        if record.is_unmapped() {
            record.bases = (0..read_length)
                .map(|_| source.byte(DataSeries::BA))
                .collect::<Result<_>>()?;
        } else {
            let count = source.int(DataSeries::FN)?;
            let count = usize::try_from(count)
                .map_err(|_| CramError::format(format!("Negative feature count: {}", count)))?;
            let mut position = 0i64;
            let mut features = Vec::with_capacity(count.min(read_length as usize + 1));
            for _ in 0..count {
                let code = source.byte(DataSeries::FC)?;
                position += source.int(DataSeries::FP)?;
                let position = checked_i32(position, "feature position")?;
                features.push(ReadFeature::read_payload(code, position, source)?);
            }
            record.features = features;
            record.mapping_quality = source.int32(DataSeries::MQ)?;
        }

        if cram_flags & CF_QUALITY_ARRAY != 0 {
            record.quality_scores = Some(
                (0..read_length)
                    .map(|_| source.byte(DataSeries::QS))
                    .collect::<Result<_>>()?,
            );
        }
        Ok(record)
    }
}

fn checked_i32(value: i64, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| CramError::format(format!("Decoded {} out of range: {}", what, value)))
}

/// Per-slice state threaded through the field walk.
#[derive(Debug, Clone)]
pub(crate) struct SliceContext {
    /// Slice reference ID; records inherit it unless RI is present
    pub reference_id: i32,
    /// RI written per record
    pub multi_reference: bool,
    pub ap_delta: bool,
    pub read_names: bool,
    /// Last alignment start, seeded with the slice start
    pub previous_start: i32,
}

/// Consumer of the field walk (statistics or encoders).
pub(crate) trait FieldSink {
    fn int(&mut self, series: DataSeries, value: i64) -> Result<()>;
    fn byte(&mut self, series: DataSeries, value: u8) -> Result<()>;
    fn bytes(&mut self, series: DataSeries, value: &[u8]) -> Result<()>;
    fn tag(&mut self, key: i32, value: &[u8]) -> Result<()>;
}

/// Producer for the decoding walk.
pub(crate) trait FieldSource {
    fn int(&mut self, series: DataSeries) -> Result<i64>;
    fn byte(&mut self, series: DataSeries) -> Result<u8>;
    fn bytes(&mut self, series: DataSeries) -> Result<Vec<u8>>;
    fn tag(&mut self, key: i32) -> Result<Vec<u8>>;

    fn int32(&mut self, series: DataSeries) -> Result<i32> {
        let value = self.int(series)?;
        i32::try_from(value).map_err(|_| CramError::format(format!("{} value out of range: {}", series, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Records the walk as a flat list of field events.
    #[derive(Default)]
    struct Recorder {
        events: VecDeque<(String, Vec<u8>, i64)>,
    }

    impl FieldSink for Recorder {
        fn int(&mut self, series: DataSeries, value: i64) -> Result<()> {
            self.events.push_back((series.to_string(), Vec::new(), value));
            Ok(())
        }
        fn byte(&mut self, series: DataSeries, value: u8) -> Result<()> {
            self.events.push_back((series.to_string(), vec![value], 0));
            Ok(())
        }
        fn bytes(&mut self, series: DataSeries, value: &[u8]) -> Result<()> {
            self.events.push_back((series.to_string(), value.to_vec(), 0));
            Ok(())
        }
        fn tag(&mut self, key: i32, value: &[u8]) -> Result<()> {
            self.events.push_back((format!("tag{}", key), value.to_vec(), 0));
            Ok(())
        }
    }

    impl FieldSource for Recorder {
        fn int(&mut self, series: DataSeries) -> Result<i64> {
            let (name, _, value) = self.events.pop_front().ok_or(CramError::StreamExhausted)?;
            assert_eq!(name, series.to_string());
            Ok(value)
        }
        fn byte(&mut self, series: DataSeries) -> Result<u8> {
            let (name, bytes, _) = self.events.pop_front().ok_or(CramError::StreamExhausted)?;
            assert_eq!(name, series.to_string());
            Ok(bytes[0])
        }
        fn bytes(&mut self, series: DataSeries) -> Result<Vec<u8>> {
            let (name, bytes, _) = self.events.pop_front().ok_or(CramError::StreamExhausted)?;
            assert_eq!(name, series.to_string());
            Ok(bytes)
        }
        fn tag(&mut self, key: i32) -> Result<Vec<u8>> {
            let (name, bytes, _) = self.events.pop_front().ok_or(CramError::StreamExhausted)?;
            assert_eq!(name, format!("tag{}", key));
            Ok(bytes)
        }
    }

    fn mapped_record() -> CramRecord {
        CramRecord {
            bam_flags: 0x63,
            reference_id: 2,
            read_length: 10,
            alignment_start: 1000,
            read_group: 0,
            read_name: b"read1".to_vec(),
            mate: MateInfo::Detached {
                flags: 1,
                reference_id: 2,
                alignment_start: 1200,
                template_size: 210,
            },
            tags: vec![Tag::new(*b"NM", b'c', vec![2]), Tag::new(*b"MD", b'Z', b"4A5\0".to_vec())],
            features: vec![
                ReadFeature::SoftClip { position: 1, bases: b"AC".to_vec() },
                ReadFeature::Substitution { position: 5, code: 2 },
                ReadFeature::Deletion { position: 7, length: 3 },
                ReadFeature::ReadBase { position: 9, base: b'G', quality: 30 },
            ],
            mapping_quality: 60,
            quality_scores: Some(vec![30; 10]),
            bases: Vec::new(),
        }
    }

    fn context() -> SliceContext {
        SliceContext {
            reference_id: 2,
            multi_reference: false,
            ap_delta: true,
            read_names: true,
            previous_start: 990,
        }
    }

    #[test]
    fn test_walk_round_trip() {
        let record = mapped_record();
        let mut dictionary = TagIdDictionary::new();
        let line = dictionary.intern(&record.tag_ids());

        let mut recorder = Recorder::default();
        record.write_fields(line, &mut context(), &mut recorder).unwrap();
        let decoded = CramRecord::read_fields(&dictionary, &mut context(), &mut recorder).unwrap();
        assert_eq!(decoded, record);
        assert!(recorder.events.is_empty());
    }

    #[test]
    fn test_walk_order() {
        let record = mapped_record();
        let mut recorder = Recorder::default();
        record.write_fields(0, &mut context(), &mut recorder).unwrap();

        let names: Vec<String> = recorder.events.iter().map(|e| e.0.clone()).collect();
        let expected_prefix = ["BF", "CF", "RL", "AP", "RG", "RN", "MF", "NS", "NP", "TS", "TL"];
        assert_eq!(&names[..expected_prefix.len()], &expected_prefix);
        assert_eq!(names.last().map(String::as_str), Some("QS"));
        // AP is a delta from the slice start
        assert_eq!(recorder.events[3].2, 10);
    }

    #[test]
    fn test_unmapped_record_walk() {
        let record = CramRecord {
            bam_flags: FLAG_UNMAPPED,
            reference_id: -1,
            read_length: 4,
            read_group: -1,
            read_name: b"u1".to_vec(),
            bases: b"ACGT".to_vec(),
            mate: MateInfo::Downstream { records_to_next: 0 },
            ..Default::default()
        };
        let mut ctx = SliceContext {
            reference_id: -1,
            multi_reference: false,
            ap_delta: false,
            read_names: true,
            previous_start: 0,
        };
        let mut recorder = Recorder::default();
        record.write_fields(0, &mut ctx.clone(), &mut recorder).unwrap();
        assert!(recorder.events.iter().all(|e| e.0 != "FN" && e.0 != "MQ"));

        let mut dictionary = TagIdDictionary::new();
        dictionary.intern(&[]);
        let decoded = CramRecord::read_fields(&dictionary, &mut ctx, &mut recorder).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_alignment_end() {
        let record = mapped_record();
        // 10 bases - 2 soft clipped + 3 deleted
        assert_eq!(record.reference_length(), 11);
        assert_eq!(record.alignment_end(), 1010);
    }

    #[test]
    fn test_cram_flags() {
        let mut record = mapped_record();
        assert_eq!(record.cram_flags(), CF_QUALITY_ARRAY | CF_DETACHED);
        record.quality_scores = None;
        record.mate = MateInfo::Downstream { records_to_next: 1 };
        assert_eq!(record.cram_flags(), CF_MATE_DOWNSTREAM);
    }

    #[test]
    fn test_validate() {
        assert!(mapped_record().validate().is_ok());

        let mut record = mapped_record();
        record.quality_scores = Some(vec![1, 2]);
        assert!(matches!(record.validate(), Err(CramError::InvariantViolation { .. })));

        let mut record = mapped_record();
        record.features.reverse();
        assert!(record.validate().is_err());

        let mut record = mapped_record();
        record.bases = b"ACGT".to_vec();
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_unmapped_mapping_quality() {
        let mut record = CramRecord {
            bam_flags: FLAG_UNMAPPED,
            reference_id: -1,
            read_length: 2,
            bases: b"AC".to_vec(),
            ..Default::default()
        };
        assert!(record.validate().is_ok());
        record.mapping_quality = 37;
        assert!(matches!(record.validate(), Err(CramError::InvariantViolation { .. })));
    }

    #[test]
    fn test_tag_key() {
        let tag = Tag::new(*b"NM", b'i', vec![]);
        assert_eq!(tag.key(), 0x4E4D69);
        assert_eq!(tag.id(), *b"NMi");
    }
}
