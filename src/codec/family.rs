//! Per-family bit codecs as pure functions
//!
//! Every function here works on the already offset-shifted value `v`
//! (`value + offset`), which the caller has checked against the family's
//! domain. `*_bit_length` performs no I/O and must agree exactly with the
//! number of bits the matching `*_encode` writes.

use crate::io::{BitReader, BitWriter};
use crate::{CramError, Result};
use std::io::{Read, Write};

/// floor(log2(v)) for v >= 1.
#[inline]
pub fn floor_log2(v: u64) -> u32 {
    63 - v.leading_zeros()
}

/// ceil(log2(v)) for v >= 1.
#[inline]
pub fn ceil_log2(v: u64) -> u32 {
    if v <= 1 {
        0
    } else {
        floor_log2(v - 1) + 1
    }
}

// ---------------------------------------------------------------------------
// Unary: `v` bits of !stop_bit, then stop_bit
// ---------------------------------------------------------------------------

pub fn unary_bit_length(v: u64) -> u64 {
    v + 1
}

pub fn unary_encode<W: Write>(writer: &mut BitWriter<W>, v: u64, stop_bit: bool) -> Result<u64> {
    writer.write_run(!stop_bit, v)?;
    writer.write_bit(stop_bit)?;
    Ok(v + 1)
}

pub fn unary_decode<R: Read>(reader: &mut BitReader<R>, stop_bit: bool) -> Result<u64> {
    reader.read_run(!stop_bit)
}

// ---------------------------------------------------------------------------
// Gamma: (n-1) length bits, one terminator, then the n-1 low magnitude bits,
// where n = floor(log2 v) + 1. With length_bit = false this is Elias gamma.
// ---------------------------------------------------------------------------

pub fn gamma_bit_length(v: u64) -> u64 {
    2 * floor_log2(v) as u64 + 1
}

pub fn gamma_encode<W: Write>(writer: &mut BitWriter<W>, v: u64, length_bit: bool) -> Result<u64> {
    let low_bits = floor_log2(v);
    writer.write_run(length_bit, low_bits as u64)?;
    writer.write_bit(!length_bit)?;
    writer.write_bits(v, low_bits)?;
    Ok(2 * low_bits as u64 + 1)
}

pub fn gamma_decode<R: Read>(reader: &mut BitReader<R>, length_bit: bool) -> Result<u64> {
    let low_bits = reader.read_run(length_bit)?;
    if low_bits > 63 {
        return Err(CramError::format(format!("Gamma length prefix too long: {}", low_bits)));
    }
    let low = reader.read_bits(low_bits as u32)?;
    Ok((1u64 << low_bits) | low)
}

// ---------------------------------------------------------------------------
// Beta: fixed-width binary
// ---------------------------------------------------------------------------

pub fn beta_encode<W: Write>(writer: &mut BitWriter<W>, v: u64, bits: u32) -> Result<u64> {
    writer.write_bits(v, bits)?;
    Ok(bits as u64)
}

pub fn beta_decode<R: Read>(reader: &mut BitReader<R>, bits: u32) -> Result<u64> {
    reader.read_bits(bits)
}

// ---------------------------------------------------------------------------
// Golomb: unary quotient (q ones then a zero), truncated-binary remainder.
//
// With b = ceil(log2 m) and cutoff = 2^b - m, remainders r < cutoff take
// b-1 bits and the rest are written as r + cutoff in b bits. The strict `<`
// boundary is part of the wire format.
// ---------------------------------------------------------------------------

#[inline]
fn golomb_split(m: u64) -> (u32, u64) {
    let b = ceil_log2(m);
    (b, (1u64 << b) - m)
}

pub fn golomb_bit_length(v: u64, m: u64) -> u64 {
    let (b, cutoff) = golomb_split(m);
    let q = v / m;
    let r = v % m;
    let remainder_bits = if r < cutoff { b - 1 } else { b };
    q + 1 + remainder_bits as u64
}

pub fn golomb_encode<W: Write>(writer: &mut BitWriter<W>, v: u64, m: u64) -> Result<u64> {
    let (b, cutoff) = golomb_split(m);
    let q = v / m;
    let r = v % m;

    writer.write_run(true, q)?;
    writer.write_bit(false)?;

    let remainder_bits = if r < cutoff {
        writer.write_bits(r, b - 1)?;
        b - 1
    } else {
        writer.write_bits(r + cutoff, b)?;
        b
    };
    Ok(q + 1 + remainder_bits as u64)
}

pub fn golomb_decode<R: Read>(reader: &mut BitReader<R>, m: u64) -> Result<u64> {
    let (b, cutoff) = golomb_split(m);
    let q = reader.read_run(true)?;

    let mut r = reader.read_bits(b - 1)?;
    if r >= cutoff {
        r = ((r << 1) | reader.read_bits(1)?) - cutoff;
    }
    Ok(q * m + r)
}

// ---------------------------------------------------------------------------
// Golomb-Rice: m = 2^log2_m, fixed log2_m-bit remainder
// ---------------------------------------------------------------------------

pub fn golomb_rice_bit_length(v: u64, log2_m: u32) -> u64 {
    (v >> log2_m) + 1 + log2_m as u64
}

pub fn golomb_rice_encode<W: Write>(writer: &mut BitWriter<W>, v: u64, log2_m: u32) -> Result<u64> {
    let q = v >> log2_m;
    writer.write_run(true, q)?;
    writer.write_bit(false)?;
    writer.write_bits(v, log2_m)?;
    Ok(q + 1 + log2_m as u64)
}

pub fn golomb_rice_decode<R: Read>(reader: &mut BitReader<R>, log2_m: u32) -> Result<u64> {
    let q = reader.read_run(true)?;
    let r = reader.read_bits(log2_m)?;
    Ok((q << log2_m) | r)
}

// ---------------------------------------------------------------------------
// Subexponential: values below 2^k are written in k bits behind a single 0;
// larger values carry u = floor(log2 v) - k + 1 ones, a 0, and their
// floor(log2 v) low bits.
// ---------------------------------------------------------------------------

#[inline]
fn subexp_split(v: u64, k: u32) -> (u64, u32) {
    if v < (1u64 << k) {
        (0, k)
    } else {
        let b = floor_log2(v);
        ((b - k + 1) as u64, b)
    }
}

pub fn subexp_bit_length(v: u64, k: u32) -> u64 {
    let (u, b) = subexp_split(v, k);
    u + 1 + b as u64
}

pub fn subexp_encode<W: Write>(writer: &mut BitWriter<W>, v: u64, k: u32) -> Result<u64> {
    let (u, b) = subexp_split(v, k);
    writer.write_run(true, u)?;
    writer.write_bit(false)?;
    writer.write_bits(v, b)?;
    Ok(u + 1 + b as u64)
}

pub fn subexp_decode<R: Read>(reader: &mut BitReader<R>, k: u32) -> Result<u64> {
    let u = reader.read_run(true)?;
    if u == 0 {
        return reader.read_bits(k);
    }
    let b = u + k as u64 - 1;
    if b > 63 {
        return Err(CramError::format(format!("Subexponential prefix too long: {}", u)));
    }
    let low = reader.read_bits(b as u32)?;
    Ok((1u64 << b) | low)
}
