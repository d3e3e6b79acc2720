use core::fmt;

use log::{debug, error, trace};
use thiserror::Error;

use crate::index::BackrefIndex;
use crate::token::{Token, MAX_LITERAL_LEN};
use crate::util::*;
use crate::MIN_INPUT_LEN;

const MIN_WINDOW_LOG2: u32 = 12;

/// Compression errors
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompressError {
    /// Level outside `0..=9`
    #[error("compression level {0} is out of range")]
    InvalidLevel(u8),
    /// The backward-reference index could not be allocated
    #[error("could not allocate the backward-reference index")]
    AllocationFailed,
    /// Inputs shorter than four bytes are rejected
    #[error("input of {0} bytes is too short to compress")]
    InputTooShort(usize),
    /// The output buffer was too small to hold all the output.
    ///
    /// The contents of the output are unspecified.
    #[error("output buffer was insufficient")]
    OutputTooSmall,
}
impl From<OutputFull> for CompressError {
    fn from(_: OutputFull) -> Self {
        CompressError::OutputTooSmall
    }
}

/// Compression level, 0 through 9
///
/// Each level doubles the sliding window, from 4 KiB at level 0 to 2 MiB at
/// level 9. The window sets how many slots the backward-reference index has;
/// it does not limit how far back a match may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);
impl CompressionLevel {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(9);

    pub fn new(level: u8) -> Result<Self, CompressError> {
        if level > Self::MAX.0 {
            error!("compression level {} is invalid", level);
            return Err(CompressError::InvalidLevel(level));
        }
        Ok(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn window_log2(self) -> u32 {
        MIN_WINDOW_LOG2 + self.0 as u32
    }

    /// Sliding window size in bytes
    pub fn window_size(self) -> usize {
        1 << self.window_log2()
    }
}
impl Default for CompressionLevel {
    fn default() -> Self {
        Self(5)
    }
}
impl TryFrom<u8> for CompressionLevel {
    type Error = CompressError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}
impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.0)
    }
}

/// Upper bound on the compressed size of `len` input bytes
///
/// Matches can expand short runs: a match covering fewer than four bytes costs
/// three, so the bound is three output bytes per input byte. Inputs of 2^40
/// bytes or more can need wider length and distance fields and get four.
pub fn max_compressed_len(len: usize) -> usize {
    let per_byte = if bytes_needed(len as u64) <= 5 { 3 } else { 4 };
    len.saturating_mul(per_byte)
}

/// Emit `lits` as one or more literal tokens
fn put_lits<O: OutputSink>(outp: &mut O, lits: &[u8]) -> Result<(), OutputFull> {
    for chunk in lits.chunks(MAX_LITERAL_LEN) {
        if let Some(tok) = Token::literal(chunk.len()) {
            tok.put_header(outp)?;
            outp.put_slice(chunk)?;
        }
    }
    Ok(())
}

/// Length of the run at `pos` repeating the bytes at `ref_pos`
///
/// Stops at the first mismatch, at the end of input, or when the reference
/// reaches `pos`, so the result never exceeds the distance.
fn match_len(inp: &[u8], ref_pos: usize, pos: usize) -> usize {
    inp[pos..]
        .iter()
        .zip(inp[ref_pos..pos].iter())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Compressor context
///
/// Owns the backward-reference index. The index is not cleared between calls:
/// prefixes recorded by one call stay in the table for the next. Every hit is
/// checked against the current input before use, so carried-over entries never
/// affect the output. Call [reset](Compressor::reset) to drop them anyway.
pub struct Compressor {
    index: BackrefIndex,
    level: CompressionLevel,
}
impl Compressor {
    /// Create a context for a level in `0..=9`
    pub fn new(level: u8) -> Result<Self, CompressError> {
        Self::with_level(CompressionLevel::new(level)?)
    }

    pub fn with_level(level: CompressionLevel) -> Result<Self, CompressError> {
        let index = BackrefIndex::new(level.window_log2()).map_err(|_| {
            error!("could not allocate index for {}", level);
            CompressError::AllocationFailed
        })?;
        debug!(
            "created compressor at {}, window {} bytes",
            level,
            level.window_size()
        );
        Ok(Self { index, level })
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Sliding window size in bytes
    pub fn window_size(&self) -> usize {
        self.level.window_size()
    }

    /// Number of slots in the backward-reference index
    ///
    /// Starts at one per window byte and doubles whenever the table is half
    /// full of distinct prefixes.
    pub fn index_capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Number of prefixes currently remembered, including ones left over
    /// from earlier calls
    pub fn indexed_prefixes(&self) -> usize {
        self.index.len()
    }

    /// Forget every prefix recorded by earlier calls
    pub fn reset(&mut self) {
        debug!("resetting compressor index");
        self.index.clear();
    }

    /// Offset of an earlier occurrence of the 4 bytes at `pos`, if one is known
    fn find_backref(&self, inp: &[u8], key: u32, pos: usize) -> Option<usize> {
        let ref_pos = self.index.lookup(key)?;
        // entries may be left over from an earlier input
        if ref_pos < pos && inp[ref_pos..ref_pos + 4] == inp[pos..pos + 4] {
            Some(ref_pos)
        } else {
            None
        }
    }

    fn compress_impl<O: OutputSink>(
        &mut self,
        inp: &[u8],
        outp: &mut O,
    ) -> Result<(), CompressError> {
        if inp.len() < MIN_INPUT_LEN {
            return Err(CompressError::InputTooShort(inp.len()));
        }

        let mut rest = inp;
        let mut lits_start_anchor_pos = 0;

        while let Some(key) = rest.peek4() {
            let pos = inp.len() - rest.len();
            let Some(ref_pos) = self.find_backref(inp, key, pos) else {
                // not useful yet, remember it for later
                self.index.insert(key, pos).map_err(|_| {
                    error!("could not grow index past {} slots", self.index.capacity());
                    CompressError::AllocationFailed
                })?;
                rest.inc(1);
                continue;
            };

            // any accumulated lits?
            put_lits(outp, &inp[lits_start_anchor_pos..pos])?;

            let len = match_len(inp, ref_pos, pos);
            debug_assert!(len >= 1);
            Token::Match {
                len,
                dist: pos - ref_pos,
            }
            .put_header(outp)?;

            rest.inc(len);
            lits_start_anchor_pos = pos + len;
        }

        // if there's anything leftover, output it
        put_lits(outp, &inp[lits_start_anchor_pos..])?;

        Ok(())
    }

    /// Compress the input into a preallocated buffer
    ///
    /// Returns the compressed size on success, or an error otherwise. An
    /// output of [max_compressed_len] bytes is always large enough.
    pub fn compress_to_buf(
        &mut self,
        inp: &[u8],
        outp: &mut [u8],
    ) -> Result<usize, CompressError> {
        let mut outp: BufOutput = outp.into();
        self.compress_impl(inp, &mut outp)?;
        trace!("compressed {} bytes into {}", inp.len(), outp.pos);
        Ok(outp.pos)
    }

    /// Compress the input into a [Vec](alloc::vec::Vec)
    ///
    /// Returns the result on success, or an error otherwise
    pub fn compress_to_vec(
        &mut self,
        inp: &[u8],
    ) -> Result<alloc::vec::Vec<u8>, CompressError> {
        let mut ret: VecOutput = alloc::vec::Vec::new().into();
        self.compress_impl(inp, &mut ret)?;
        trace!("compressed {} bytes into {}", inp.len(), ret.vec.len());
        Ok(ret.vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compress_exact(level: u8, inp: &[u8], expected: &[u8]) {
        let mut state = Compressor::new(level).unwrap();
        let mut out = [0u8; 256];
        let len = state.compress_to_buf(inp, &mut out).unwrap();
        assert_eq!(out[..len], *expected);
    }

    #[test]
    fn test_levels() {
        for level in 0..=9 {
            let lv = CompressionLevel::new(level).unwrap();
            assert_eq!(lv.get(), level);
            assert_eq!(lv.window_size(), 4096 << level);
        }
        assert_eq!(CompressionLevel::MIN.window_size(), 4 * 1024);
        assert_eq!(CompressionLevel::MAX.window_size(), 2 * 1024 * 1024);
        assert_eq!(CompressionLevel::default().window_size(), 128 * 1024);

        assert_eq!(
            CompressionLevel::new(10),
            Err(CompressError::InvalidLevel(10))
        );
        assert_eq!(
            CompressionLevel::try_from(255u8),
            Err(CompressError::InvalidLevel(255))
        );
        assert!(matches!(
            Compressor::new(10),
            Err(CompressError::InvalidLevel(10))
        ));
    }

    #[test]
    fn test_window_sizes_index() {
        let state = Compressor::new(0).unwrap();
        assert_eq!(state.window_size(), 4096);
        assert_eq!(state.index_capacity(), 4096);

        let state = Compressor::new(9).unwrap();
        assert_eq!(state.level(), CompressionLevel::MAX);
        assert_eq!(state.index_capacity(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_match_len() {
        let inp = [1, 2, 3, 1, 2, 3, 1, 2, 3, 4];
        // capped at the distance
        assert_eq!(match_len(&inp, 0, 3), 3);
        assert_eq!(match_len(&inp, 0, 6), 3);
        // capped by the first mismatch
        assert_eq!(match_len(&inp, 3, 6), 3);
        assert_eq!(match_len(&inp, 1, 7), 2);
        // capped by the end of input
        assert_eq!(match_len(&[5, 5, 5, 5, 5, 5], 0, 4), 2);
    }

    #[test]
    fn test_short_input() {
        let mut state = Compressor::new(0).unwrap();
        let data = [1u8, 2, 3];
        for n in 0..=3 {
            let mut out = [0xaau8; 8];
            assert_eq!(
                state.compress_to_buf(&data[..n], &mut out),
                Err(CompressError::InputTooShort(n))
            );
            assert_eq!(out, [0xaa; 8]);
        }
        compress_exact(0, &[1, 2, 3, 4], &[0x04, 1, 2, 3, 4]);
    }

    #[test]
    fn test_uncompressible() {
        compress_exact(0, &[1, 2, 3, 4, 5], &[0x05, 1, 2, 3, 4, 5]);
        compress_exact(3, b"abcdefgh", b"\x08abcdefgh");
    }

    #[test]
    fn test_simple_backref() {
        // distance 1 caps the first match at one byte
        compress_exact(0, &[1, 1, 1, 1, 1], &[0x01, 1, 0xc9, 1, 1, 0x03, 1, 1, 1]);
        compress_exact(
            0,
            &[1, 1, 1, 1, 1, 2],
            &[0x01, 1, 0xc9, 1, 1, 0x04, 1, 1, 1, 2],
        );
        compress_exact(
            0,
            &[1, 2, 3, 1, 2, 3, 1, 2, 3],
            &[0x03, 1, 2, 3, 0xc9, 3, 3, 0x03, 1, 2, 3],
        );
        compress_exact(
            0,
            &[1, 2, 3, 1, 2, 3, 1, 2, 3, 4],
            &[0x03, 1, 2, 3, 0xc9, 3, 3, 0x04, 1, 2, 3, 4],
        );
    }

    #[test]
    fn test_runs_double() {
        // the index keeps the first occurrence, so distances grow with each match
        compress_exact(
            0,
            &[b'a'; 20],
            &[
                0x01, b'a', 0xc9, 1, 1, 0xc9, 2, 2, 0xc9, 4, 4, 0xc9, 8, 8, 0xc9, 4, 16,
            ],
        );
        compress_exact(
            0,
            b"abcdabcdabcdX",
            b"\x04abcd\xc9\x04\x04\xc9\x04\x08\x01X",
        );
    }

    #[test]
    fn test_output_too_small() {
        let mut state = Compressor::new(0).unwrap();
        let inp = [1, 2, 3, 1, 2, 3, 1, 2, 3];
        for cap in 0..11 {
            let mut out = [0u8; 11];
            assert_eq!(
                state.compress_to_buf(&inp, &mut out[..cap]),
                Err(CompressError::OutputTooSmall)
            );
        }
        let mut out = [0u8; 11];
        assert_eq!(state.compress_to_buf(&inp, &mut out), Ok(11));
    }

    #[test]
    fn test_put_lits_empty() {
        let mut lits = [0u8; 8];
        let mut outbuf: BufOutput = (&mut lits[..]).into();
        put_lits(&mut outbuf, &[]).unwrap();
        assert_eq!(outbuf.pos, 0);
        put_lits(&mut outbuf, &[9, 9]).unwrap();
        assert_eq!(outbuf.buf[..3], [0x02, 9, 9]);
    }

    #[test]
    fn test_put_lits_chunks() {
        let lits = alloc::vec![7u8; MAX_LITERAL_LEN + 1];
        let mut outbuf: VecOutput = alloc::vec::Vec::new().into();
        put_lits(&mut outbuf, &lits).unwrap();
        assert_eq!(outbuf.vec.len(), 3 + MAX_LITERAL_LEN + 1 + 1);
        assert_eq!(outbuf.vec[..3], [0x5f, 0xff, 0xff]);
        assert_eq!(outbuf.vec[3 + MAX_LITERAL_LEN..], [0x01, 7]);
    }

    #[test]
    fn test_index_carries_over() {
        let x = b"hello world, hello world, hello!";
        let y = b"world hello, world hello, world!";

        let mut state = Compressor::new(0).unwrap();
        let cx = state.compress_to_vec(x).unwrap();
        let after_x = state.indexed_prefixes();
        assert!(after_x > 0);

        // the second call starts with the first call's prefixes still indexed
        let cy = state.compress_to_vec(y).unwrap();
        assert!(state.indexed_prefixes() >= after_x);

        // and produces the same stream as a fresh context
        assert_eq!(cy, Compressor::new(0).unwrap().compress_to_vec(y).unwrap());
        assert_eq!(cx, state.compress_to_vec(x).unwrap());

        state.reset();
        assert_eq!(state.indexed_prefixes(), 0);
        assert_eq!(cx, state.compress_to_vec(x).unwrap());
    }

    #[test]
    fn test_max_compressed_len() {
        assert_eq!(max_compressed_len(0), 0);
        assert_eq!(max_compressed_len(4), 12);
        assert_eq!(max_compressed_len(1000), 3000);
    }
}
