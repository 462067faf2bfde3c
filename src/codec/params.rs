//! Codec configuration persistence
//!
//! Two forms exist for every codec:
//! - [`EncodingParams`]: the algorithm id plus opaque parameter bytes, exactly
//!   as stored in the compression header (ITF-8 fields per CRAM 3).
//! - A compact textual parameter string (`"p1,p2,..."`) used for configuration
//!   files and diagnostics. `from_parameter_string(parameter_string())`
//!   reproduces an identical string.
//!
//! | Algorithm        | Parameter bytes                      | Text                         |
//! |------------------|--------------------------------------|------------------------------|
//! | NULL             | (none)                               | ``                           |
//! | EXTERNAL         | content id                           | `id`                         |
//! | GOLOMB           | offset, m                            | `offset,m`                   |
//! | HUFFMAN          | n, symbols[n], n, lengths[n]         | `n,s1..sn,l1..ln`            |
//! | BYTE_ARRAY_LEN   | len (id,size,bytes), value (same)    | `lenId:params;valueId:params`|
//! | BYTE_ARRAY_STOP  | stop byte (u8), content id           | `stop,id`                    |
//! | BETA             | offset, bits                         | `offset,bits`                |
//! | SUBEXP           | offset, k                            | `offset,k`                   |
//! | GOLOMB_RICE      | offset, log2 m                       | `offset,log2m`               |
//! | GAMMA            | offset [, 1 if inverted length bit]  | `offset,lengthBit`           |
//! | UNARY            | offset, stop bit                     | `offset,stopBit`             |

use super::{Encoding, EncodingId, HuffmanTable};
use crate::io::num::{read_len, read_u8, read_vec};
use crate::io::{read_itf8, write_itf8};
use crate::{CramError, Result};
use std::io::{Cursor, Read, Write};

/// Immutable descriptor of a chosen codec and its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingParams {
    pub id: EncodingId,
    pub params: Vec<u8>,
}

impl EncodingParams {
    pub fn new(id: EncodingId, params: Vec<u8>) -> Self {
        Self { id, params }
    }

    /// Write `id`, parameter length and parameter bytes.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_itf8(writer, self.id.as_u8() as i32)?;
        write_itf8(writer, self.params.len() as i32)?;
        writer.write_all(&self.params)?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let raw_id = read_itf8(reader)?;
        let id = u8::try_from(raw_id)
            .map_err(|_| CramError::format(format!("Unknown encoding ID: {}", raw_id)))
            .and_then(EncodingId::from_u8)?;
        let len = read_len(reader, "encoding parameter size")?;
        let params = read_vec(reader, len, "encoding parameters")?;
        Ok(Self { id, params })
    }
}

fn itf8_fields(values: &[i64]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for &value in values {
        let value = i32::try_from(value)
            .map_err(|_| CramError::config(format!("Parameter {} does not fit in ITF-8", value)))?;
        write_itf8(&mut buf, value)?;
    }
    Ok(buf)
}

fn read_u32_param(reader: &mut Cursor<&[u8]>, name: &str) -> Result<u32> {
    let value = read_itf8(reader)?;
    u32::try_from(value).map_err(|_| CramError::config(format!("Negative {}: {}", name, value)))
}

fn read_flag(reader: &mut Cursor<&[u8]>) -> Result<bool> {
    match read_itf8(reader)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CramError::config(format!("Invalid bit flag: {}", other))),
    }
}

impl Encoding {
    /// Serialize to the persisted header form.
    pub fn to_params(&self) -> Result<EncodingParams> {
        let params = match self {
            Self::Null => Vec::new(),
            Self::External { content_id } => itf8_fields(&[*content_id as i64])?,
            Self::Golomb { offset, m } => itf8_fields(&[*offset, *m as i64])?,
            Self::Huffman(table) => {
                let n = table.alphabet().len() as i64;
                let mut fields = vec![n];
                fields.extend(table.alphabet().iter().map(|&s| s as i64));
                fields.push(n);
                fields.extend(table.bit_lengths().iter().map(|&l| l as i64));
                itf8_fields(&fields)?
            }
            Self::ByteArrayLen { len, value } => {
                let mut buf = Vec::new();
                len.to_params()?.write(&mut buf)?;
                value.to_params()?.write(&mut buf)?;
                buf
            }
            Self::ByteArrayStop { stop_byte, content_id } => {
                let mut buf = vec![*stop_byte];
                write_itf8(&mut buf, *content_id)?;
                buf
            }
            Self::Beta { offset, bits } => itf8_fields(&[*offset, *bits as i64])?,
            Self::SubExp { offset, k } => itf8_fields(&[*offset, *k as i64])?,
            Self::GolombRice { offset, log2_m } => itf8_fields(&[*offset, *log2_m as i64])?,
            Self::Gamma { offset, length_bit } => {
                if *length_bit {
                    itf8_fields(&[*offset, 1])?
                } else {
                    itf8_fields(&[*offset])?
                }
            }
            Self::Unary { offset, stop_bit } => itf8_fields(&[*offset, *stop_bit as i64])?,
        };
        Ok(EncodingParams::new(self.id(), params))
    }

    /// Bind a codec from its persisted header form.
    pub fn from_params(params: &EncodingParams) -> Result<Self> {
        let mut reader = Cursor::new(params.params.as_slice());
        let reader = &mut reader;

        let encoding = match params.id {
            EncodingId::Null => Self::Null,
            EncodingId::External => Self::External {
                content_id: read_itf8(reader)?,
            },
            EncodingId::Golomb => {
                let offset = read_itf8(reader)? as i64;
                let m = read_u32_param(reader, "Golomb modulus")? as u64;
                Self::Golomb { offset, m }
            }
            EncodingId::Huffman => {
                let n = read_len(reader, "Huffman alphabet size")?;
                let alphabet = (0..n).map(|_| read_itf8(reader)).collect::<Result<Vec<_>>>()?;
                let n_lengths = read_len(reader, "Huffman bit-length count")?;
                let lengths = (0..n_lengths)
                    .map(|_| read_u32_param(reader, "Huffman bit length"))
                    .collect::<Result<Vec<_>>>()?;
                Self::Huffman(HuffmanTable::new(alphabet, lengths)?)
            }
            EncodingId::ByteArrayLen => {
                let len = Self::from_params(&EncodingParams::read(reader)?)?;
                let value = Self::from_params(&EncodingParams::read(reader)?)?;
                Self::ByteArrayLen {
                    len: Box::new(len),
                    value: Box::new(value),
                }
            }
            EncodingId::ByteArrayStop => {
                let stop_byte = read_u8(reader, "stop byte")?;
                let content_id = read_itf8(reader)?;
                Self::ByteArrayStop { stop_byte, content_id }
            }
            EncodingId::Beta => {
                let offset = read_itf8(reader)? as i64;
                let bits = read_u32_param(reader, "Beta width")?;
                Self::Beta { offset, bits }
            }
            EncodingId::SubExp => {
                let offset = read_itf8(reader)? as i64;
                let k = read_u32_param(reader, "subexponential k")?;
                Self::SubExp { offset, k }
            }
            EncodingId::GolombRice => {
                let offset = read_itf8(reader)? as i64;
                let log2_m = read_u32_param(reader, "Golomb-Rice log2(m)")?;
                Self::GolombRice { offset, log2_m }
            }
            EncodingId::Gamma => {
                let offset = read_itf8(reader)? as i64;
                let length_bit = if (reader.position() as usize) < params.params.len() {
                    read_flag(reader)?
                } else {
                    false
                };
                Self::Gamma { offset, length_bit }
            }
            EncodingId::Unary => {
                let offset = read_itf8(reader)? as i64;
                let stop_bit = read_flag(reader)?;
                Self::Unary { offset, stop_bit }
            }
        };

        if (reader.position() as usize) != params.params.len() {
            return Err(CramError::format(format!(
                "Trailing bytes in {} parameters: {} of {} used",
                params.id,
                reader.position(),
                params.params.len()
            )));
        }
        encoding.validate()?;
        Ok(encoding)
    }

    /// Compact textual parameter form, e.g. `"0,3"` for GOLOMB(offset 0, m 3).
    pub fn parameter_string(&self) -> String {
        fn join<T: ToString>(values: &[T]) -> String {
            values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
        }

        match self {
            Self::Null => String::new(),
            Self::External { content_id } => content_id.to_string(),
            Self::Golomb { offset, m } => format!("{},{}", offset, m),
            Self::Huffman(table) => {
                let mut fields = vec![table.alphabet().len() as i64];
                fields.extend(table.alphabet().iter().map(|&s| s as i64));
                fields.extend(table.bit_lengths().iter().map(|&l| l as i64));
                join(&fields)
            }
            Self::ByteArrayLen { len, value } => format!(
                "{}:{};{}:{}",
                len.id().as_u8(),
                len.parameter_string(),
                value.id().as_u8(),
                value.parameter_string()
            ),
            Self::ByteArrayStop { stop_byte, content_id } => format!("{},{}", stop_byte, content_id),
            Self::Beta { offset, bits } => format!("{},{}", offset, bits),
            Self::SubExp { offset, k } => format!("{},{}", offset, k),
            Self::GolombRice { offset, log2_m } => format!("{},{}", offset, log2_m),
            Self::Gamma { offset, length_bit } => format!("{},{}", offset, *length_bit as u8),
            Self::Unary { offset, stop_bit } => format!("{},{}", offset, *stop_bit as u8),
        }
    }

    /// Parse the textual parameter form for algorithm `id`.
    ///
    /// Wrong arity, non-numeric fields and out-of-range parameters are
    /// [`CramError::EncodingConfig`] errors.
    pub fn from_parameter_string(id: EncodingId, text: &str) -> Result<Self> {
        if id == EncodingId::ByteArrayLen {
            let (len, value) = text
                .split_once(';')
                .ok_or_else(|| CramError::config(format!("BYTE_ARRAY_LEN parameters need 'len;value': {:?}", text)))?;
            return Self::byte_array_len(parse_nested(len)?, parse_nested(value)?);
        }

        let fields: Vec<i64> = if text.is_empty() {
            Vec::new()
        } else {
            text.split(',')
                .map(|field| {
                    field
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| CramError::config(format!("Non-numeric {} parameter: {:?}", id, field)))
                })
                .collect::<Result<_>>()?
        };

        let arity = |n: usize| -> Result<()> {
            if fields.len() == n {
                Ok(())
            } else {
                Err(CramError::config(format!(
                    "{} expects {} parameters, got {} in {:?}",
                    id,
                    n,
                    fields.len(),
                    text
                )))
            }
        };
        let unsigned = |value: i64, name: &str| -> Result<u32> {
            u32::try_from(value).map_err(|_| CramError::config(format!("Invalid {}: {}", name, value)))
        };
        let flag = |value: i64| -> Result<bool> {
            match value {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(CramError::config(format!("Invalid bit flag: {}", other))),
            }
        };
        let int = |value: i64| -> Result<i32> {
            i32::try_from(value).map_err(|_| CramError::config(format!("Parameter out of range: {}", value)))
        };

        match id {
            EncodingId::Null => {
                arity(0)?;
                Ok(Self::Null)
            }
            EncodingId::External => {
                arity(1)?;
                Ok(Self::external(int(fields[0])?))
            }
            EncodingId::Golomb => {
                arity(2)?;
                let m = u64::try_from(fields[1])
                    .map_err(|_| CramError::config(format!("Invalid Golomb modulus: {}", fields[1])))?;
                Self::golomb(fields[0], m)
            }
            EncodingId::Huffman => {
                let n = fields
                    .first()
                    .and_then(|&n| usize::try_from(n).ok())
                    .ok_or_else(|| CramError::config(format!("Malformed HUFFMAN parameters: {:?}", text)))?;
                if n.checked_mul(2).and_then(|n2| n2.checked_add(1)) != Some(fields.len()) {
                    return Err(CramError::config(format!("Malformed HUFFMAN parameters: {:?}", text)));
                }
                let alphabet = fields[1..=n].iter().map(|&s| int(s)).collect::<Result<Vec<_>>>()?;
                let lengths = fields[n + 1..]
                    .iter()
                    .map(|&l| unsigned(l, "Huffman bit length"))
                    .collect::<Result<Vec<_>>>()?;
                Self::huffman(alphabet, lengths)
            }
            EncodingId::ByteArrayStop => {
                arity(2)?;
                let stop = u8::try_from(fields[0])
                    .map_err(|_| CramError::config(format!("Invalid stop byte: {}", fields[0])))?;
                Ok(Self::byte_array_stop(stop, int(fields[1])?))
            }
            EncodingId::Beta => {
                arity(2)?;
                Self::beta(fields[0], unsigned(fields[1], "Beta width")?)
            }
            EncodingId::SubExp => {
                arity(2)?;
                Self::subexp(fields[0], unsigned(fields[1], "subexponential k")?)
            }
            EncodingId::GolombRice => {
                arity(2)?;
                Self::golomb_rice(fields[0], unsigned(fields[1], "Golomb-Rice log2(m)")?)
            }
            EncodingId::Gamma => {
                arity(2)?;
                Ok(Self::Gamma {
                    offset: fields[0],
                    length_bit: flag(fields[1])?,
                })
            }
            EncodingId::Unary => {
                arity(2)?;
                Ok(Self::Unary {
                    offset: fields[0],
                    stop_bit: flag(fields[1])?,
                })
            }
            EncodingId::ByteArrayLen => unreachable!("handled above"),
        }
    }
}

fn parse_nested(text: &str) -> Result<Encoding> {
    let (id, params) = text
        .split_once(':')
        .ok_or_else(|| CramError::config(format!("Nested encoding needs 'id:params': {:?}", text)))?;
    let id = id
        .trim()
        .parse::<u8>()
        .map_err(|_| CramError::config(format!("Non-numeric encoding id: {:?}", id)))?;
    let id = EncodingId::from_u8(id).map_err(|e| CramError::config(e.to_string()))?;
    Encoding::from_parameter_string(id, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_encodings() -> Vec<Encoding> {
        vec![
            Encoding::Null,
            Encoding::external(17),
            Encoding::golomb(0, 3).unwrap(),
            Encoding::golomb(-5, 19).unwrap(),
            Encoding::huffman(vec![65, 66, 67], vec![1, 2, 2]).unwrap(),
            Encoding::huffman(vec![-1], vec![0]).unwrap(),
            Encoding::byte_array_len(Encoding::external(3), Encoding::external(4)).unwrap(),
            Encoding::byte_array_len(Encoding::golomb_rice(0, 4).unwrap(), Encoding::beta(0, 8).unwrap()).unwrap(),
            Encoding::byte_array_stop(b'\t', 5),
            Encoding::beta(-100, 12).unwrap(),
            Encoding::subexp(0, 2).unwrap(),
            Encoding::golomb_rice(3, 7).unwrap(),
            Encoding::gamma(1),
            Encoding::Gamma { offset: 0, length_bit: true },
            Encoding::unary(0),
            Encoding::Unary { offset: -2, stop_bit: true },
        ]
    }

    #[test]
    fn test_parameter_string_round_trip() {
        for encoding in all_encodings() {
            let text = encoding.parameter_string();
            let parsed = Encoding::from_parameter_string(encoding.id(), &text).unwrap();
            assert_eq!(parsed.parameter_string(), text, "{:?}", encoding);
            assert_eq!(parsed, encoding);
        }
    }

    #[test]
    fn test_params_bytes_round_trip() {
        for encoding in all_encodings() {
            let params = encoding.to_params().unwrap();
            let mut buf = Vec::new();
            params.write(&mut buf).unwrap();

            let read = EncodingParams::read(&mut Cursor::new(buf)).unwrap();
            assert_eq!(read, params);
            assert_eq!(Encoding::from_params(&read).unwrap(), encoding);
        }
    }

    #[test]
    fn test_known_parameter_bytes() {
        let params = Encoding::golomb(0, 3).unwrap().to_params().unwrap();
        assert_eq!(params, EncodingParams::new(EncodingId::Golomb, vec![0x00, 0x03]));

        // Standard gamma stays CRAM-compatible: offset only
        let params = Encoding::gamma(1).to_params().unwrap();
        assert_eq!(params.params, vec![0x01]);

        let params = Encoding::byte_array_stop(0, 12).to_params().unwrap();
        assert_eq!(params.params, vec![0x00, 0x0C]);

        let params = Encoding::byte_array_len(Encoding::external(1), Encoding::external(2))
            .unwrap()
            .to_params()
            .unwrap();
        assert_eq!(params.params, vec![0x01, 0x01, 0x01, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_text_parse_errors() {
        let cases = [
            (EncodingId::Golomb, "1"),
            (EncodingId::Golomb, "0,1"),
            (EncodingId::Golomb, "0,x"),
            (EncodingId::Beta, "0,8,1"),
            (EncodingId::Gamma, "0,2"),
            (EncodingId::Null, "1"),
            (EncodingId::Huffman, "2,1,2,1"),
            (EncodingId::ByteArrayLen, "1:3"),
            (EncodingId::ByteArrayLen, "99:3;1:4"),
            (EncodingId::ByteArrayStop, "256,1"),
        ];
        for (id, text) in cases {
            let err = Encoding::from_parameter_string(id, text).unwrap_err();
            assert!(matches!(err, CramError::EncodingConfig { .. }), "{} {:?}: {}", id, text, err);
        }
    }

    #[test]
    fn test_trailing_parameter_bytes_rejected() {
        let params = EncodingParams::new(EncodingId::External, vec![0x01, 0x02]);
        assert!(Encoding::from_params(&params).is_err());
    }

    #[test]
    fn test_unknown_encoding_id_rejected() {
        let bytes = vec![0x2A, 0x00];
        let err = EncodingParams::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("Unknown encoding ID: 42"));
    }
}
