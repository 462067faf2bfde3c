//! CRAM compression header
//!
//! Three independently length-prefixed sections:
//!
//! ```text
//! - Preservation map:  ITF-8 size, ITF-8 count, {2-byte key, value}*
//! - Data series map:   ITF-8 size, ITF-8 count, {2-byte key, EncodingParams}*
//! - Tag encoding map:  ITF-8 size, ITF-8 count, {ITF-8 tag key, EncodingParams}*
//! ```
//!
//! A header is assembled once per container through [`CompressionHeaderBuilder`]
//! and is immutable afterwards. Data series without an entry use the NULL
//! encoding; unknown keys are rejected instead of skipped.

use super::data_series::{DataSeries, ValueKind};
use crate::codec::{Encoding, EncodingParams};
use crate::io::num::{read_array, read_len, read_u8, read_vec};
use crate::io::{read_itf8, write_itf8};
use crate::{CramError, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use tracing::debug;

static NULL_ENCODING: Encoding = Encoding::Null;

const BASES: [u8; 5] = *b"ACGTN";

fn base_index(base: u8) -> Result<usize> {
    BASES
        .iter()
        .position(|&b| b == base.to_ascii_uppercase())
        .ok_or_else(|| CramError::format(format!("Invalid base for substitution: {:?}", base as char)))
}

/// Indices of the four bases a reference base can be substituted with, in ACGTN order.
fn alternatives(reference: usize) -> [usize; 4] {
    let mut alts = [0usize; 4];
    let mut j = 0;
    for i in 0..BASES.len() {
        if i != reference {
            alts[j] = i;
            j += 1;
        }
    }
    alts
}

/// 5-byte substitution matrix (SM).
///
/// One byte per reference base (A, C, G, T, N). Each byte holds four 2-bit
/// substitution codes, one per alternative base in ACGTN order, most
/// significant pair first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstitutionMatrix {
    bytes: [u8; 5],
}

impl Default for SubstitutionMatrix {
    /// Codes 0, 1, 2, 3 in alternative order for every reference base.
    fn default() -> Self {
        Self { bytes: [0x1B; 5] }
    }
}

impl SubstitutionMatrix {
    /// Build from observed substitution counts indexed `[reference][read]` in
    /// ACGTN order. The most frequent substitution of each reference base gets
    /// code 0; ties keep ACGTN order.
    pub fn from_frequencies(counts: &[[u64; 5]; 5]) -> Self {
        let mut bytes = [0u8; 5];
        for (reference, byte) in bytes.iter_mut().enumerate() {
            let alts = alternatives(reference);
            let mut ranked = alts;
            ranked.sort_by(|&a, &b| counts[reference][b].cmp(&counts[reference][a]));
            for (code, &alt) in ranked.iter().enumerate() {
                let slot = alts.iter().position(|&a| a == alt).unwrap_or(0);
                *byte |= (code as u8) << (6 - 2 * slot);
            }
        }
        Self { bytes }
    }

    /// Validate persisted bytes: each must assign four distinct codes.
    pub fn from_bytes(bytes: [u8; 5]) -> Result<Self> {
        for (i, &byte) in bytes.iter().enumerate() {
            let mut seen = [false; 4];
            for slot in 0..4 {
                seen[((byte >> (6 - 2 * slot)) & 0b11) as usize] = true;
            }
            if seen.contains(&false) {
                return Err(CramError::format(format!(
                    "Invalid substitution matrix entry for {}: {:#04x}",
                    BASES[i] as char, byte
                )));
            }
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> [u8; 5] {
        self.bytes
    }

    /// Substitution code (BS value) for `read` replacing `reference`.
    pub fn code(&self, reference: u8, read: u8) -> Result<u8> {
        let r = base_index(reference)?;
        let a = base_index(read)?;
        let slot = alternatives(r)
            .iter()
            .position(|&alt| alt == a)
            .ok_or_else(|| CramError::format(format!("{} is not a substitution", read as char)))?;
        Ok((self.bytes[r] >> (6 - 2 * slot)) & 0b11)
    }

    /// Read base that `code` stands for against `reference`.
    pub fn base(&self, reference: u8, code: u8) -> Result<u8> {
        let r = base_index(reference)?;
        alternatives(r)
            .iter()
            .enumerate()
            .find(|&(slot, _)| (self.bytes[r] >> (6 - 2 * slot)) & 0b11 == code)
            .map(|(_, &alt)| BASES[alt])
            .ok_or_else(|| CramError::format(format!("Invalid substitution code: {}", code)))
    }
}

/// Tag-id dictionary (TD).
///
/// Each line is the ordered tag set of one or more records; records refer to
/// their line through the TL data series. Serialized as 3-byte entries
/// (name, name, type) with a zero byte ending every line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIdDictionary {
    lines: Vec<Vec<[u8; 3]>>,
}

impl TagIdDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `ids`, adding it as a new line if unseen.
    pub fn intern(&mut self, ids: &[[u8; 3]]) -> i32 {
        if let Some(index) = self.index_of(ids) {
            return index;
        }
        self.lines.push(ids.to_vec());
        self.lines.len() as i32 - 1
    }

    pub fn index_of(&self, ids: &[[u8; 3]]) -> Option<i32> {
        self.lines.iter().position(|line| line == ids).map(|i| i as i32)
    }

    pub fn line(&self, index: i32) -> Result<&[[u8; 3]]> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.lines.get(i))
            .map(Vec::as_slice)
            .ok_or_else(|| CramError::format(format!("Tag line {} not in dictionary of {}", index, self.lines.len())))
    }

    pub fn lines(&self) -> &[Vec<[u8; 3]>] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut body = Vec::new();
        for line in &self.lines {
            for id in line {
                if id[0] == 0 {
                    return Err(CramError::format("Tag id cannot start with a zero byte"));
                }
                body.extend_from_slice(id);
            }
            body.push(0);
        }
        write_itf8(writer, body.len() as i32)?;
        writer.write_all(&body)?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_len(reader, "tag dictionary size")?;
        let body = read_vec(reader, len, "tag dictionary")?;

        let mut lines = Vec::new();
        let mut line = Vec::new();
        let mut pos = 0;
        while pos < body.len() {
            if body[pos] == 0 {
                lines.push(std::mem::take(&mut line));
                pos += 1;
                continue;
            }
            let id: [u8; 3] = body
                .get(pos..pos + 3)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| CramError::format("Truncated tag id in tag dictionary"))?;
            line.push(id);
            pos += 3;
        }
        if !line.is_empty() {
            return Err(CramError::format("Unterminated line in tag dictionary"));
        }
        Ok(Self { lines })
    }
}

/// CRAM preservation map.
///
/// Stores preservation policy settings for the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservationMap {
    /// Read names stored (RN)
    pub read_names_included: bool,
    /// AP data series delta-coded (AP)
    pub ap_delta: bool,
    /// Reference required (RR)
    pub reference_required: bool,
    /// Substitution matrix (SM)
    pub substitution_matrix: SubstitutionMatrix,
    /// Tag ID dictionary (TD)
    pub tag_ids: TagIdDictionary,
}

impl Default for PreservationMap {
    fn default() -> Self {
        Self {
            read_names_included: true,
            ap_delta: true,
            reference_required: true,
            substitution_matrix: SubstitutionMatrix::default(),
            tag_ids: TagIdDictionary::default(),
        }
    }
}

impl PreservationMap {
    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut body = Vec::new();
        write_itf8(&mut body, 5)?;
        for (key, value) in [
            (b"RN", self.read_names_included),
            (b"AP", self.ap_delta),
            (b"RR", self.reference_required),
        ] {
            body.extend_from_slice(key);
            body.push(value as u8);
        }
        body.extend_from_slice(b"SM");
        body.extend_from_slice(&self.substitution_matrix.as_bytes());
        body.extend_from_slice(b"TD");
        self.tag_ids.write(&mut body)?;

        write_itf8(writer, body.len() as i32)?;
        writer.write_all(&body)?;
        Ok(())
    }

    /// Parse the preservation map. Keys that are absent keep their defaults.
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_len(reader, "preservation map size")?;
        let body = read_vec(reader, len, "preservation map")?;
        let mut reader = Cursor::new(body.as_slice());
        let mut map = Self::default();

        let count = read_len(&mut reader, "preservation map count")?;
        cram_debug!("PreservationMap: size={}, entries={}", len, count);

        for _ in 0..count {
            let key: [u8; 2] = read_array(&mut reader, "preservation map key")?;
            cram_debug!("PreservationMap entry: key={}", String::from_utf8_lossy(&key));
            match &key {
                b"RN" => map.read_names_included = read_u8(&mut reader, "RN value")? != 0,
                b"AP" => map.ap_delta = read_u8(&mut reader, "AP value")? != 0,
                b"RR" => map.reference_required = read_u8(&mut reader, "RR value")? != 0,
                b"SM" => map.substitution_matrix = SubstitutionMatrix::from_bytes(read_array(&mut reader, "SM value")?)?,
                b"TD" => map.tag_ids = TagIdDictionary::read(&mut reader)?,
                _ => {
                    return Err(CramError::format(format!(
                        "Unknown preservation map key: {}",
                        String::from_utf8_lossy(&key)
                    )))
                }
            }
        }
        expect_consumed(&reader, "preservation map")?;
        Ok(map)
    }
}

fn expect_consumed(reader: &Cursor<&[u8]>, section: &str) -> Result<()> {
    let len = reader.get_ref().len();
    if reader.position() as usize != len {
        return Err(CramError::format(format!(
            "{} declares {} bytes but entries end at {}",
            section,
            len,
            reader.position()
        )));
    }
    Ok(())
}

fn check_series_encoding(series: DataSeries, encoding: &Encoding) -> Result<()> {
    encoding.validate()?;
    let fits = match series.kind() {
        ValueKind::Int | ValueKind::Byte => !encoding.is_byte_array(),
        ValueKind::ByteArray => encoding.is_byte_array(),
    };
    if !fits {
        return Err(CramError::config(format!(
            "{} encoding cannot carry data series {}",
            encoding.id(),
            series
        )));
    }
    Ok(())
}

/// CRAM compression header.
///
/// The compression header describes how data is encoded in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionHeader {
    preservation: PreservationMap,
    encodings: BTreeMap<DataSeries, Encoding>,
    tag_encodings: BTreeMap<i32, Encoding>,
}

impl CompressionHeader {
    pub fn builder() -> CompressionHeaderBuilder {
        CompressionHeaderBuilder::new()
    }

    pub fn preservation(&self) -> &PreservationMap {
        &self.preservation
    }

    pub fn read_names_included(&self) -> bool {
        self.preservation.read_names_included
    }

    pub fn ap_delta(&self) -> bool {
        self.preservation.ap_delta
    }

    pub fn substitution_matrix(&self) -> &SubstitutionMatrix {
        &self.preservation.substitution_matrix
    }

    pub fn tag_dictionary(&self) -> &TagIdDictionary {
        &self.preservation.tag_ids
    }

    /// Encoding bound to `series`, NULL when the series is absent.
    pub fn encoding(&self, series: DataSeries) -> &Encoding {
        self.encodings.get(&series).unwrap_or(&NULL_ENCODING)
    }

    /// Non-null data series entries in key order.
    pub fn encodings(&self) -> impl Iterator<Item = (DataSeries, &Encoding)> {
        self.encodings.iter().map(|(&series, encoding)| (series, encoding))
    }

    pub fn tag_encoding(&self, key: i32) -> Option<&Encoding> {
        self.tag_encodings.get(&key)
    }

    pub fn tag_encodings(&self) -> impl Iterator<Item = (i32, &Encoding)> {
        self.tag_encodings.iter().map(|(&key, encoding)| (key, encoding))
    }

    /// Serialize all three sections.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.preservation.write(writer)?;

        let mut body = Vec::new();
        write_itf8(&mut body, self.encodings.len() as i32)?;
        for (series, encoding) in &self.encodings {
            body.extend_from_slice(&series.as_bytes());
            encoding.to_params()?.write(&mut body)?;
            cram_debug!("Data series {}: {} [{}]", series, encoding.id(), encoding.parameter_string());
        }
        write_itf8(writer, body.len() as i32)?;
        writer.write_all(&body)?;

        let mut body = Vec::new();
        write_itf8(&mut body, self.tag_encodings.len() as i32)?;
        for (&key, encoding) in &self.tag_encodings {
            write_itf8(&mut body, key)?;
            encoding.to_params()?.write(&mut body)?;
        }
        write_itf8(writer, body.len() as i32)?;
        writer.write_all(&body)?;

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Parse a compression header from decompressed block data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        let preservation = PreservationMap::read(&mut reader)?;
        let mut builder = CompressionHeaderBuilder::new().preservation(preservation);

        let len = read_len(&mut reader, "data series map size")?;
        let body = read_vec(&mut reader, len, "data series map")?;
        let mut section = Cursor::new(body.as_slice());
        let count = read_len(&mut section, "data series count")?;
        for i in 0..count {
            let key: [u8; 2] = read_array(&mut section, "data series key")?;
            let series = DataSeries::from_bytes(key)?;
            let params = EncodingParams::read(&mut section)?;
            let encoding = Encoding::from_params(&params).map_err(|e| {
                CramError::format(format!("Failed to parse encoding for DS {} (key={}): {}", i, series, e))
            })?;
            cram_debug!("Data series {}: {} [{}]", series, encoding.id(), encoding.parameter_string());
            builder = builder.encoding(series, encoding);
        }
        expect_consumed(&section, "data series map")?;

        let len = read_len(&mut reader, "tag encoding map size")?;
        let body = read_vec(&mut reader, len, "tag encoding map")?;
        let mut section = Cursor::new(body.as_slice());
        let count = read_len(&mut section, "tag encoding count")?;
        for _ in 0..count {
            let key = read_itf8(&mut section)?;
            let encoding = Encoding::from_params(&EncodingParams::read(&mut section)?)?;
            builder = builder.tag_encoding(key, encoding);
        }
        expect_consumed(&section, "tag encoding map")?;

        let header = builder.build()?;
        debug!(
            data_series = header.encodings.len(),
            tags = header.tag_encodings.len(),
            tag_lines = header.tag_dictionary().len(),
            "Parsed compression header"
        );
        Ok(header)
    }
}

/// Assembles a [`CompressionHeader`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct CompressionHeaderBuilder {
    preservation: PreservationMap,
    encodings: BTreeMap<DataSeries, Encoding>,
    tag_encodings: BTreeMap<i32, Encoding>,
}

impl CompressionHeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preservation(mut self, preservation: PreservationMap) -> Self {
        self.preservation = preservation;
        self
    }

    pub fn read_names_included(mut self, included: bool) -> Self {
        self.preservation.read_names_included = included;
        self
    }

    pub fn ap_delta(mut self, delta: bool) -> Self {
        self.preservation.ap_delta = delta;
        self
    }

    pub fn reference_required(mut self, required: bool) -> Self {
        self.preservation.reference_required = required;
        self
    }

    pub fn substitution_matrix(mut self, matrix: SubstitutionMatrix) -> Self {
        self.preservation.substitution_matrix = matrix;
        self
    }

    pub fn tag_dictionary(mut self, dictionary: TagIdDictionary) -> Self {
        self.preservation.tag_ids = dictionary;
        self
    }

    /// Bind `series` to `encoding`. NULL removes any previous binding.
    pub fn encoding(mut self, series: DataSeries, encoding: Encoding) -> Self {
        if encoding.is_null() {
            self.encodings.remove(&series);
        } else {
            self.encodings.insert(series, encoding);
        }
        self
    }

    pub fn tag_encoding(mut self, key: i32, encoding: Encoding) -> Self {
        self.tag_encodings.insert(key, encoding);
        self
    }

    /// Validate every binding and freeze the header.
    pub fn build(self) -> Result<CompressionHeader> {
        for (&series, encoding) in &self.encodings {
            check_series_encoding(series, encoding)?;
        }
        for (&key, encoding) in &self.tag_encodings {
            encoding.validate()?;
            if !encoding.is_byte_array() {
                return Err(CramError::config(format!(
                    "Tag {:#08x} needs a byte array encoding, got {}",
                    key,
                    encoding.id()
                )));
            }
        }
        Ok(CompressionHeader {
            preservation: self.preservation,
            encodings: self.encodings,
            tag_encodings: self.tag_encodings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(dictionary: TagIdDictionary) -> CompressionHeader {
        let mut counts = [[0u64; 5]; 5];
        counts[0][2] = 50; // A->G most common
        counts[2][0] = 40; // G->A
        counts[1][3] = 10;

        let mut builder = CompressionHeader::builder()
            .read_names_included(false)
            .ap_delta(true)
            .reference_required(false)
            .substitution_matrix(SubstitutionMatrix::from_frequencies(&counts))
            .tag_dictionary(dictionary.clone())
            .encoding(DataSeries::BF, Encoding::huffman(vec![0, 16, 99], vec![1, 2, 2]).unwrap())
            .encoding(DataSeries::AP, Encoding::golomb(3, 7).unwrap())
            .encoding(DataSeries::RL, Encoding::beta(-100, 8).unwrap())
            .encoding(DataSeries::FN, Encoding::unary(0))
            .encoding(DataSeries::MQ, Encoding::gamma(1))
            .encoding(DataSeries::FP, Encoding::subexp(0, 2).unwrap())
            .encoding(DataSeries::DL, Encoding::golomb_rice(0, 2).unwrap())
            .encoding(DataSeries::QS, Encoding::external(DataSeries::QS.content_id()))
            .encoding(DataSeries::RN, Encoding::byte_array_stop(0, DataSeries::RN.content_id()));
        for line in dictionary.lines() {
            for id in line {
                let key = (id[0] as i32) << 16 | (id[1] as i32) << 8 | id[2] as i32;
                builder = builder.tag_encoding(
                    key,
                    Encoding::byte_array_len(Encoding::external(key), Encoding::external(key)).unwrap(),
                );
            }
        }
        builder.build().unwrap()
    }

    fn dictionary(lines: &[&[&[u8; 3]]]) -> TagIdDictionary {
        let mut dictionary = TagIdDictionary::new();
        for line in lines {
            let ids: Vec<[u8; 3]> = line.iter().map(|id| **id).collect();
            dictionary.intern(&ids);
        }
        dictionary
    }

    #[test]
    fn test_header_round_trip_dictionary_sizes() {
        let dictionaries = [
            dictionary(&[]),
            dictionary(&[&[b"NMi"]]),
            dictionary(&[&[b"NMi", b"MDZ"], &[], &[b"RGZ", b"NMi", b"XAc"]]),
        ];
        for (expected_lines, dict) in [0usize, 1, 3].into_iter().zip(dictionaries) {
            let header = sample_header(dict);
            let bytes = header.to_bytes().unwrap();
            let parsed = CompressionHeader::parse(&bytes).unwrap();

            assert_eq!(parsed, header);
            assert_eq!(parsed.tag_dictionary().len(), expected_lines);
            assert_eq!(parsed.read_names_included(), false);
            assert!(parsed.ap_delta());
            assert_eq!(parsed.substitution_matrix(), header.substitution_matrix());
            assert_eq!(parsed.encoding(DataSeries::AP), &Encoding::golomb(3, 7).unwrap());
            assert_eq!(parsed.tag_encodings().count(), header.tag_encodings().count());
        }
    }

    #[test]
    fn test_absent_series_default_to_null() {
        let header = CompressionHeader::builder().build().unwrap();
        for series in DataSeries::ALL {
            assert!(header.encoding(series).is_null());
        }
        let parsed = CompressionHeader::parse(&header.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_null_binding_is_not_written() {
        let header = CompressionHeader::builder()
            .encoding(DataSeries::BF, Encoding::gamma(1))
            .encoding(DataSeries::BF, Encoding::Null)
            .build()
            .unwrap();
        assert_eq!(header.encodings().count(), 0);
    }

    #[test]
    fn test_eof_compression_header() {
        // Compression header payload of the standard EOF container
        let header = CompressionHeader::parse(&[0x01, 0x00, 0x01, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(header.preservation(), &PreservationMap::default());
        assert_eq!(header.encodings().count(), 0);
    }

    #[test]
    fn test_unknown_preservation_key_rejected() {
        // size 4: count 1, key "XX", value 0
        let err = CompressionHeader::parse(&[0x04, 0x01, b'X', b'X', 0x00, 0x01, 0x00, 0x01, 0x00]).unwrap_err();
        assert!(err.to_string().contains("Unknown preservation map key: XX"));
    }

    #[test]
    fn test_unknown_data_series_key_rejected() {
        let mut bytes = vec![0x01, 0x00];
        // count 1, key "ZZ", EXTERNAL(1)
        bytes.extend_from_slice(&[0x06, 0x01, b'Z', b'Z', 0x01, 0x01, 0x01]);
        bytes.extend_from_slice(&[0x01, 0x00]);
        let err = CompressionHeader::parse(&bytes).unwrap_err();
        assert!(matches!(err, CramError::InvalidFormat { .. }));
        assert!(err.to_string().contains("ZZ"));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = sample_header(TagIdDictionary::new()).to_bytes().unwrap();
        for cut in [1, bytes.len() / 2, bytes.len() - 1] {
            assert!(CompressionHeader::parse(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn test_builder_rejects_mismatched_shapes() {
        let err = CompressionHeader::builder()
            .encoding(DataSeries::AP, Encoding::byte_array_stop(0, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, CramError::EncodingConfig { .. }));

        assert!(CompressionHeader::builder()
            .encoding(DataSeries::RN, Encoding::external(1))
            .build()
            .is_err());
        assert!(CompressionHeader::builder()
            .tag_encoding(0x4E4D69, Encoding::external(1))
            .build()
            .is_err());
    }

    #[test]
    fn test_tag_dictionary_layout() {
        let dict = dictionary(&[&[b"MDZ", b"NMc"], &[]]);
        let mut buf = Vec::new();
        dict.write(&mut buf).unwrap();
        assert_eq!(buf, b"\x08MDZNMc\x00\x00".to_vec());

        let parsed = TagIdDictionary::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, dict);
        assert_eq!(parsed.line(0).unwrap(), &[*b"MDZ", *b"NMc"]);
        assert!(parsed.line(2).is_err());
        assert!(parsed.line(-1).is_err());
    }

    #[test]
    fn test_tag_dictionary_interning() {
        let mut dict = TagIdDictionary::new();
        assert_eq!(dict.intern(&[*b"NMi"]), 0);
        assert_eq!(dict.intern(&[]), 1);
        assert_eq!(dict.intern(&[*b"NMi"]), 0);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.index_of(&[*b"MDZ"]), None);
    }

    #[test]
    fn test_substitution_matrix_default() {
        let matrix = SubstitutionMatrix::default();
        assert_eq!(matrix.code(b'A', b'C').unwrap(), 0);
        assert_eq!(matrix.code(b'A', b'N').unwrap(), 3);
        assert_eq!(matrix.code(b'T', b'N').unwrap(), 3);
        assert_eq!(matrix.base(b'G', 2).unwrap(), b'T');
        assert!(matrix.code(b'A', b'A').is_err());
        assert!(matrix.code(b'A', b'X').is_err());
    }

    #[test]
    fn test_substitution_matrix_from_frequencies() {
        let mut counts = [[0u64; 5]; 5];
        counts[0] = [0, 1, 30, 5, 0]; // A: G > T > C > N
        let matrix = SubstitutionMatrix::from_frequencies(&counts);

        assert_eq!(matrix.code(b'A', b'G').unwrap(), 0);
        assert_eq!(matrix.code(b'A', b'T').unwrap(), 1);
        assert_eq!(matrix.code(b'A', b'C').unwrap(), 2);
        assert_eq!(matrix.code(b'A', b'N').unwrap(), 3);
        for code in 0..4 {
            let base = matrix.base(b'A', code).unwrap();
            assert_eq!(matrix.code(b'A', base).unwrap(), code);
        }
        // No observations keeps the default ordering
        assert_eq!(matrix.as_bytes()[1], 0x1B);
    }

    #[test]
    fn test_substitution_matrix_rejects_duplicate_codes() {
        assert!(SubstitutionMatrix::from_bytes([0x00, 0x1B, 0x1B, 0x1B, 0x1B]).is_err());
        assert!(SubstitutionMatrix::from_bytes([0x1B, 0xE4, 0x1B, 0x1B, 0x1B]).is_ok());
    }
}
