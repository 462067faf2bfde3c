//! Statistical codec selection for one integer column
//!
//! The optimizer collects a (value, count) histogram during the ACCUMULATE
//! phase and then prices every candidate codec analytically with
//! [`Encoding::bit_length`]. No data is actually encoded. The candidate pool
//! is fixed and searched exhaustively:
//!
//! - GOLOMB m = 2..=19
//! - GOLOMB_RICE log2(m) = 1..=19
//! - one GAMMA configuration
//! - SUBEXP k = 1..=19
//! - UNARY
//!
//! The winner is compared against flat fixed-width binary (BETA) and the
//! cheaper one is chosen. Ties go to the earlier candidate, and BETA only wins
//! when strictly cheaper.

use super::{family, Encoding, EncodingId};
use crate::{CramError, Result};
use std::collections::BTreeMap;
use tracing::trace;

const MAX_PARAMETER: u32 = 19;

/// Candidate family and parameter, bound to an offset once the histogram is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Golomb(u64),
    GolombRice(u32),
    Gamma,
    SubExp(u32),
    Unary,
}

impl Candidate {
    fn pool() -> Vec<Candidate> {
        let mut pool = Vec::with_capacity(3 * MAX_PARAMETER as usize + 2);
        pool.extend((2..=MAX_PARAMETER as u64).map(Candidate::Golomb));
        pool.extend((1..=MAX_PARAMETER).map(Candidate::GolombRice));
        pool.push(Candidate::Gamma);
        pool.extend((1..=MAX_PARAMETER).map(Candidate::SubExp));
        pool.push(Candidate::Unary);
        pool
    }

    fn bind(self, offset: i64) -> Encoding {
        match self {
            Candidate::Golomb(m) => Encoding::Golomb { offset, m },
            Candidate::GolombRice(log2_m) => Encoding::GolombRice { offset, log2_m },
            // Gamma cannot code zero, so its range starts one above the others
            Candidate::Gamma => Encoding::gamma(offset.saturating_add(1)),
            Candidate::SubExp(k) => Encoding::SubExp { offset, k },
            Candidate::Unary => Encoding::unary(offset),
        }
    }
}

/// Outcome of [`CodecOptimizer::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSelection {
    /// The chosen codec, `Null` for an empty column
    pub encoding: Encoding,
    /// Total bits the chosen codec needs for the observed column
    pub total_bits: u64,
}

/// Transient per-column statistics collector and codec chooser.
#[derive(Debug, Clone)]
pub struct CodecOptimizer {
    histogram: BTreeMap<i64, u64>,
    pool: Vec<Candidate>,
}

impl Default for CodecOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecOptimizer {
    pub fn new() -> Self {
        Self {
            histogram: BTreeMap::new(),
            pool: Candidate::pool(),
        }
    }

    /// Record one observation of `value`.
    pub fn add(&mut self, value: i64) {
        self.add_count(value, 1);
    }

    /// Record `count` observations of `value`.
    pub fn add_count(&mut self, value: i64, count: u64) {
        if count > 0 {
            *self.histogram.entry(value).or_insert(0) += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Number of observations recorded.
    pub fn total(&self) -> u64 {
        self.histogram.values().sum()
    }

    pub fn min(&self) -> Option<i64> {
        self.histogram.keys().next().copied()
    }

    pub fn max(&self) -> Option<i64> {
        self.histogram.keys().next_back().copied()
    }

    /// Offset shared by every candidate: `-min` for negative columns, else 0.
    fn base_offset(&self) -> Result<i64> {
        match self.min() {
            Some(min) if min < 0 => min
                .checked_neg()
                .ok_or_else(|| CramError::config(format!("Column minimum {} cannot be offset", min))),
            _ => Ok(0),
        }
    }

    /// Total bits `encoding` needs for the histogram, or `None` if it cannot
    /// encode every observed value.
    pub fn cost(&self, encoding: &Encoding) -> Option<u64> {
        let mut total: u64 = 0;
        for (&value, &count) in &self.histogram {
            if !encoding.accepts(value) {
                return None;
            }
            total = total.saturating_add(count.saturating_mul(encoding.bit_length(value)));
        }
        Some(total)
    }

    /// Every qualifying adaptive candidate with its total cost, in pool order.
    ///
    /// Candidates whose parameters cannot be stored in a compression header
    /// (an offset beyond ITF-8) do not qualify.
    pub fn candidate_costs(&self) -> Result<Vec<(Encoding, u64)>> {
        let offset = self.base_offset()?;
        Ok(self
            .pool
            .iter()
            .map(|candidate| candidate.bind(offset))
            .filter(|encoding| encoding.to_params().is_ok())
            .filter_map(|encoding| self.cost(&encoding).map(|bits| (encoding, bits)))
            .collect())
    }

    /// Cheapest qualifying candidate of one family (first wins on ties).
    pub fn best_of_family(&self, id: EncodingId) -> Result<Option<(Encoding, u64)>> {
        Ok(self
            .candidate_costs()?
            .into_iter()
            .filter(|(encoding, _)| encoding.id() == id)
            .fold(None, |best: Option<(Encoding, u64)>, (encoding, bits)| match best {
                Some((_, best_bits)) if best_bits <= bits => best,
                _ => Some((encoding, bits)),
            }))
    }

    /// Flat fixed-width binary over the observed range, with its cost.
    pub fn flat_binary(&self) -> Result<Option<(Encoding, u64)>> {
        let (offset, max) = match self.max() {
            Some(max) => (self.base_offset()?, max),
            None => return Ok(None),
        };
        let span = max
            .checked_add(offset)
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| CramError::config(format!("Column range too wide: max {}", max)))?;
        let bits = family::ceil_log2(span.saturating_add(1));
        if bits > 32 {
            return Ok(None);
        }
        let encoding = Encoding::beta(offset, bits)?;
        if encoding.to_params().is_err() {
            return Ok(None);
        }
        Ok(Some((encoding, (bits as u64).saturating_mul(self.total()))))
    }

    /// Choose the cheapest codec for the observed column.
    ///
    /// Fails when no candidate can encode every observed value; see
    /// [`CodecOptimizer::try_select`].
    pub fn select(&self) -> Result<CodecSelection> {
        self.try_select()?
            .ok_or_else(|| CramError::config("No candidate codec can encode the observed column"))
    }

    /// Like [`CodecOptimizer::select`], but `None` when nothing qualifies.
    pub fn try_select(&self) -> Result<Option<CodecSelection>> {
        if self.is_empty() {
            return Ok(Some(CodecSelection {
                encoding: Encoding::Null,
                total_bits: 0,
            }));
        }

        let mut best: Option<(Encoding, u64)> = None;
        for (encoding, bits) in self.candidate_costs()? {
            if best.as_ref().map_or(true, |(_, best_bits)| bits < *best_bits) {
                best = Some((encoding, bits));
            }
        }

        if let Some((flat, flat_bits)) = self.flat_binary()? {
            if best.as_ref().map_or(true, |(_, best_bits)| flat_bits < *best_bits) {
                best = Some((flat, flat_bits));
            }
        }

        let (encoding, total_bits) = match best {
            Some(best) => best,
            None => return Ok(None),
        };
        trace!(
            codec = %encoding.id(),
            params = %encoding.parameter_string(),
            total_bits,
            distinct = self.histogram.len(),
            "Selected column codec"
        );
        Ok(Some(CodecSelection { encoding, total_bits }))
    }
}
