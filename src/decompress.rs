use log::trace;
use thiserror::Error;

use crate::token::Token;
use crate::util::*;
use crate::MIN_INPUT_LEN;

/// Decompression errors
///
/// After any error the output contents are unspecified.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecompressError {
    /// Compressed streams are never shorter than four bytes
    #[error("input of {0} bytes is too short to decompress")]
    InputTooShort(usize),
    /// A header or literal payload runs past the end of the input
    #[error("input was truncated")]
    InputTruncated,
    /// Literal header with size class `11`
    #[error("reserved literal size class")]
    ReservedSizeClass,
    /// Distance of zero, or reaching before the start of the output
    #[error("invalid backreference")]
    InvalidBackreference,
    /// A length or distance field does not fit in `usize`
    #[error("length or distance out of range")]
    ValueOverflow,
    #[error("output buffer was insufficient")]
    OutputTooSmall,
}
impl From<OutputFull> for DecompressError {
    fn from(_: OutputFull) -> Self {
        DecompressError::OutputTooSmall
    }
}

fn decompress_impl(mut inp: &[u8], outp: &mut impl OutputSink) -> Result<(), DecompressError> {
    if inp.len() < MIN_INPUT_LEN {
        return Err(DecompressError::InputTooShort(inp.len()));
    }

    while !inp.is_empty() {
        match Token::read_header(&mut inp)? {
            Token::Literal { len, .. } => {
                let lits = inp.take(len).ok_or(DecompressError::InputTruncated)?;
                outp.put_slice(lits)?;
            }
            Token::Match { len, dist } => {
                if dist == 0 || dist > outp.pos() {
                    return Err(DecompressError::InvalidBackreference);
                }
                outp.put_backref(dist, len)?;
            }
        }
    }

    Ok(())
}

/// Decompress the input into a preallocated buffer
///
/// Returns the decompressed size on success, or an error otherwise
pub fn decompress_to_buf(inp: &[u8], outp: &mut [u8]) -> Result<usize, DecompressError> {
    let mut outp: BufOutput = outp.into();
    decompress_impl(inp, &mut outp)?;
    trace!("decompressed {} bytes into {}", inp.len(), outp.pos);
    Ok(outp.pos)
}

/// Decompress the input into a [Vec](alloc::vec::Vec)
///
/// Returns the result on success, or an error otherwise
#[cfg(feature = "alloc")]
pub fn decompress_to_vec(
    inp: &[u8],
    capacity_hint: Option<usize>,
) -> Result<alloc::vec::Vec<u8>, DecompressError> {
    let mut ret: VecOutput = if let Some(capacity_hint) = capacity_hint {
        alloc::vec::Vec::with_capacity(capacity_hint)
    } else {
        alloc::vec::Vec::new()
    }
    .into();
    decompress_impl(inp, &mut ret)?;
    trace!("decompressed {} bytes into {}", inp.len(), ret.vec.len());
    Ok(ret.vec)
}

/// Iterator over the tokens of a compressed stream
///
/// Literal payloads are skipped, not returned. Iteration stops after the
/// first error.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    inp: &'a [u8],
    failed: bool,
}
impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token, DecompressError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.inp.is_empty() {
            return None;
        }

        let tok = Token::read_header(&mut self.inp).and_then(|tok| {
            if let Token::Literal { len, .. } = tok {
                self.inp.take(len).ok_or(DecompressError::InputTruncated)?;
            }
            Ok(tok)
        });
        self.failed = tok.is_err();
        Some(tok)
    }
}

/// Walk the token structure of a compressed stream without decompressing it
pub fn tokens(inp: &[u8]) -> Tokens<'_> {
    Tokens { inp, failed: false }
}
