use crate::decompress::DecompressError;
use crate::util::*;

const MATCH_TAG: u8 = 0b1100_0000;

/// Longest header: one tag byte plus seven length and seven distance bytes
pub const MAX_HEADER_LEN: usize = 15;

/// Longest literal run a single token can carry
pub const MAX_LITERAL_LEN: usize = SizeClass::Long.max_len();

/// Width of a literal header's length field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// `00`: five inline bits, runs of 0..=31
    Short,
    /// `01`: thirteen bits, runs of 0..=8191
    Medium,
    /// `10`: twenty-one bits, runs of 0..=2_097_151
    Long,
}
impl SizeClass {
    /// Narrowest class able to hold `len`
    pub fn for_len(len: usize) -> Option<Self> {
        [Self::Short, Self::Medium, Self::Long]
            .into_iter()
            .find(|class| len <= class.max_len())
    }

    pub const fn max_len(self) -> usize {
        (1 << (5 + 8 * self.continuation_bytes())) - 1
    }

    /// Header bytes following the tag byte
    pub const fn continuation_bytes(self) -> usize {
        match self {
            Self::Short => 0,
            Self::Medium => 1,
            Self::Long => 2,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Short => 0b00,
            Self::Medium => 0b01,
            Self::Long => 0b10,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0b00 => Some(Self::Short),
            0b01 => Some(Self::Medium),
            0b10 => Some(Self::Long),
            _ => None,
        }
    }
}

/// One element of a compressed stream
///
/// Literal header: `0 CC LLLLL`, where `CC` is the [SizeClass] and `LLLLL`
/// holds the high bits of the run length. Classes `01` and `10` append one or
/// two continuation bytes with the low bits, most significant first. The raw
/// bytes of the run follow the header.
///
/// Match header: `11 AAA BBB`, followed by `AAA` bytes of length and `BBB`
/// bytes of distance, both most significant first. Decoders treat any header
/// with the top bit set as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `len` raw bytes follow the header
    Literal { class: SizeClass, len: usize },
    /// Copy `len` bytes starting `dist` bytes before the current output position
    Match { len: usize, dist: usize },
}
impl Token {
    /// Literal token for a run of `len` bytes, in the narrowest class
    pub fn literal(len: usize) -> Option<Self> {
        let class = SizeClass::for_len(len)?;
        Some(Self::Literal { class, len })
    }

    pub(crate) fn put_header<O: OutputSink>(&self, outp: &mut O) -> Result<(), OutputFull> {
        let mut hdr = [0u8; MAX_HEADER_LEN];
        let n = match *self {
            Token::Literal { class, len } => {
                debug_assert!(len <= class.max_len());
                let ext = class.continuation_bytes();
                hdr[0] = class.tag() << 5 | (len >> (8 * ext)) as u8;
                for i in 0..ext {
                    hdr[1 + i] = (len >> (8 * (ext - 1 - i))) as u8;
                }
                1 + ext
            }
            Token::Match { len, dist } => {
                let (len, dist) = (len as u64, dist as u64);
                let lc = bytes_needed(len) as usize;
                let dc = bytes_needed(dist) as usize;
                debug_assert!(lc <= 7 && dc <= 7);
                hdr[0] = MATCH_TAG | (lc as u8) << 3 | dc as u8;
                hdr[1..1 + lc].copy_from_slice(&len.to_be_bytes()[8 - lc..]);
                hdr[1 + lc..1 + lc + dc].copy_from_slice(&dist.to_be_bytes()[8 - dc..]);
                1 + lc + dc
            }
        };
        outp.put_slice(&hdr[..n])
    }

    /// Parse one header, leaving `inp` at the first byte after it
    ///
    /// For a literal the cursor is left at the start of its payload.
    pub(crate) fn read_header(inp: &mut &[u8]) -> Result<Self, DecompressError> {
        let hdr = inp.take(1).ok_or(DecompressError::InputTruncated)?[0];

        if hdr & 0x80 == 0 {
            let class = SizeClass::from_tag((hdr >> 5) & 0b11)
                .ok_or(DecompressError::ReservedSizeClass)?;
            let ext = inp
                .take(class.continuation_bytes())
                .ok_or(DecompressError::InputTruncated)?;
            let len = ext
                .iter()
                .fold((hdr & 0x1f) as usize, |acc, &b| acc << 8 | b as usize);
            Ok(Token::Literal { class, len })
        } else {
            let len = read_be(inp, (hdr >> 3) & 0b111)?;
            let dist = read_be(inp, hdr & 0b111)?;
            Ok(Token::Match { len, dist })
        }
    }
}

fn read_be(inp: &mut &[u8], n: u8) -> Result<usize, DecompressError> {
    let bytes = inp
        .take(n as usize)
        .ok_or(DecompressError::InputTruncated)?;
    let v = bytes.iter().fold(0u64, |acc, &b| acc << 8 | u64::from(b));
    usize::try_from(v).map_err(|_| DecompressError::ValueOverflow)
}
