//! Canonical Huffman codes for core-stream integer columns

use crate::io::{BitReader, BitWriter};
use crate::{CramError, Result};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Longest code length accepted from a compression header.
const MAX_CODE_LENGTH: u32 = 31;

/// Canonical Huffman table built from an alphabet and per-symbol bit lengths.
///
/// Codes are assigned in (length, symbol) order. An alphabet with a single
/// zero-length symbol costs no bits at all.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    alphabet: Vec<i32>,
    bit_lengths: Vec<u32>,
    /// symbol -> (code, length)
    codes: HashMap<i32, (u64, u32)>,
    /// Symbols sorted canonically
    sorted: Vec<i32>,
    /// Per code length: (first code, index of first symbol in `sorted`, count)
    by_length: Vec<(u64, usize, usize)>,
}

impl PartialEq for HuffmanTable {
    fn eq(&self, other: &Self) -> bool {
        self.alphabet == other.alphabet && self.bit_lengths == other.bit_lengths
    }
}

impl Eq for HuffmanTable {}

impl HuffmanTable {
    /// Build the canonical table, rejecting inconsistent or over-subscribed lengths.
    pub fn new(alphabet: Vec<i32>, bit_lengths: Vec<u32>) -> Result<Self> {
        if alphabet.is_empty() {
            return Err(CramError::config("Huffman alphabet is empty"));
        }
        if alphabet.len() != bit_lengths.len() {
            return Err(CramError::config(format!(
                "Huffman alphabet has {} symbols but {} bit lengths",
                alphabet.len(),
                bit_lengths.len()
            )));
        }
        if let Some(&len) = bit_lengths.iter().find(|&&len| len > MAX_CODE_LENGTH) {
            return Err(CramError::config(format!("Huffman code length too long: {}", len)));
        }

        let mut order: Vec<usize> = (0..alphabet.len()).collect();
        order.sort_by_key(|&i| (bit_lengths[i], alphabet[i]));

        let max_len = bit_lengths.iter().copied().max().unwrap_or(0);
        let mut by_length = vec![(0u64, 0usize, 0usize); max_len as usize + 1];
        let mut codes = HashMap::with_capacity(alphabet.len());
        let mut sorted = Vec::with_capacity(alphabet.len());

        let mut code: u64 = 0;
        let mut prev_len = bit_lengths[order[0]];
        for (rank, &i) in order.iter().enumerate() {
            let len = bit_lengths[i];
            code <<= len - prev_len;
            prev_len = len;

            if (len > 0 && code >> len != 0) || (len == 0 && rank > 0) {
                return Err(CramError::config("Huffman bit lengths are over-subscribed"));
            }
            if codes.insert(alphabet[i], (code, len)).is_some() {
                return Err(CramError::config(format!("Duplicate Huffman symbol: {}", alphabet[i])));
            }

            let slot = &mut by_length[len as usize];
            if slot.2 == 0 {
                *slot = (code, rank, 0);
            }
            slot.2 += 1;

            sorted.push(alphabet[i]);
            code += 1;
        }

        Ok(Self {
            alphabet,
            bit_lengths,
            codes,
            sorted,
            by_length,
        })
    }

    pub fn alphabet(&self) -> &[i32] {
        &self.alphabet
    }

    pub fn bit_lengths(&self) -> &[u32] {
        &self.bit_lengths
    }

    pub fn contains(&self, symbol: i64) -> bool {
        i32::try_from(symbol).map_or(false, |s| self.codes.contains_key(&s))
    }

    /// Code length of `symbol`, which must be in the alphabet.
    pub fn bit_length(&self, symbol: i64) -> u64 {
        i32::try_from(symbol)
            .ok()
            .and_then(|s| self.codes.get(&s))
            .map_or(0, |&(_, len)| len as u64)
    }

    pub fn encode<W: Write>(&self, writer: &mut BitWriter<W>, symbol: i64) -> Result<u64> {
        let (code, len) = i32::try_from(symbol)
            .ok()
            .and_then(|s| self.codes.get(&s))
            .copied()
            .ok_or_else(|| CramError::config(format!("Symbol {} not in Huffman alphabet", symbol)))?;
        writer.write_bits(code, len)?;
        Ok(len as u64)
    }

    pub fn decode<R: Read>(&self, reader: &mut BitReader<R>) -> Result<i64> {
        let mut code: u64 = 0;
        for (len, &(first, index, count)) in self.by_length.iter().enumerate() {
            if len > 0 {
                code = (code << 1) | reader.read_bits(1)?;
            }
            if count > 0 && code >= first && code - first < count as u64 {
                return Ok(self.sorted[index + (code - first) as usize] as i64);
            }
        }
        Err(CramError::format(format!("Invalid Huffman code: {:#b}", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_single_symbol_costs_nothing() {
        let table = HuffmanTable::new(vec![42], vec![0]).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        assert_eq!(table.encode(&mut writer, 42).unwrap(), 0);
        let bytes = writer.into_inner().unwrap();
        assert!(bytes.is_empty());

        let mut reader = BitReader::new(Cursor::new(bytes));
        assert_eq!(table.decode(&mut reader).unwrap(), 42);
    }

    #[test]
    fn test_canonical_codes() {
        // lengths: 'A'=1, 'B'=2, 'C'=3, 'D'=3 -> 0, 10, 110, 111
        let table = HuffmanTable::new(vec![68, 67, 66, 65], vec![3, 3, 2, 1]).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        for symbol in [65, 66, 67, 68] {
            table.encode(&mut writer, symbol).unwrap();
        }
        let bytes = writer.into_inner().unwrap();
        assert_eq!(bytes, vec![0b0101_1011, 0b1000_0000]);

        let mut reader = BitReader::new(Cursor::new(bytes));
        for symbol in [65, 66, 67, 68] {
            assert_eq!(table.decode(&mut reader).unwrap(), symbol);
        }
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert!(HuffmanTable::new(vec![], vec![]).is_err());
        assert!(HuffmanTable::new(vec![1, 2], vec![1]).is_err());
        assert!(HuffmanTable::new(vec![1, 2, 3], vec![1, 1, 1]).is_err());
        assert!(HuffmanTable::new(vec![1, 1], vec![1, 1]).is_err());
        assert!(HuffmanTable::new(vec![1, 2], vec![0, 0]).is_err());
    }

    #[test]
    fn test_unknown_symbol() {
        let table = HuffmanTable::new(vec![1, 2], vec![1, 1]).unwrap();
        let mut writer = BitWriter::new(Vec::new());
        assert!(table.encode(&mut writer, 3).is_err());
        assert!(!table.contains(3));
        assert!(table.contains(2));
    }
}
