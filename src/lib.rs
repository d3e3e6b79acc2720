//! Greedy single-pass LZ77 codec with a compact, self-describing token format.
//!
//! A compressed stream is a bare sequence of literal and match tokens with no
//! container header, length prefix or checksum. See [Token] for the layout.
//!
//! ```
//! # use toylz_rs::*;
//! let data = b"abcabcabcabcabcabcabc";
//! let mut comp = Compressor::new(5).unwrap();
//! let packed = comp.compress_to_vec(data).unwrap();
//! assert_eq!(decompress_to_vec(&packed, None).unwrap(), data);
//! ```

#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod compress;
mod decompress;
#[cfg(feature = "alloc")]
mod index;
mod token;
mod util;

#[cfg(feature = "alloc")]
pub use compress::{max_compressed_len, CompressError, CompressionLevel, Compressor};
#[cfg(feature = "alloc")]
pub use decompress::decompress_to_vec;
pub use decompress::{decompress_to_buf, tokens, DecompressError, Tokens};
pub use token::{SizeClass, Token, MAX_HEADER_LEN, MAX_LITERAL_LEN};
pub use util::bytes_needed;

/// Neither direction accepts inputs shorter than this
pub const MIN_INPUT_LEN: usize = 4;
