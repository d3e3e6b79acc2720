/// Minimum number of bytes needed to hold `v`; zero needs none.
pub fn bytes_needed(v: u64) -> u8 {
    ((u64::BITS - v.leading_zeros()).div_ceil(8)) as u8
}

/// A write did not fit in the remaining output capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutputFull;

/// Internal abstraction for types of outputs (slice vs Vec)
///
/// Note for all functions: capacity is checked before anything is written,
/// so a failed write leaves the output untouched.
pub(crate) trait OutputSink {
    /// Number of bytes produced so far
    fn pos(&self) -> usize;
    /// Append raw bytes
    fn put_slice(&mut self, buf: &[u8]) -> Result<(), OutputFull>;
    /// Copy `len` bytes starting `dist` bytes before the current position.
    ///
    /// The caller guarantees `1 <= dist <= pos()`. Bytes are copied one at a
    /// time in increasing order, so `len` may exceed `dist`.
    fn put_backref(&mut self, dist: usize, len: usize) -> Result<(), OutputFull>;
}

pub(crate) struct BufOutput<'a> {
    pub pos: usize,
    pub buf: &'a mut [u8],
}
impl<'a> From<&'a mut [u8]> for BufOutput<'a> {
    fn from(buf: &'a mut [u8]) -> Self {
        Self { pos: 0, buf }
    }
}
impl<'a> BufOutput<'a> {
    fn reserve(&self, len: usize) -> Result<(), OutputFull> {
        if len > self.buf.len() - self.pos {
            Err(OutputFull)
        } else {
            Ok(())
        }
    }
}
impl<'a> OutputSink for BufOutput<'a> {
    fn pos(&self) -> usize {
        self.pos
    }

    fn put_slice(&mut self, buf: &[u8]) -> Result<(), OutputFull> {
        self.reserve(buf.len())?;
        self.buf[self.pos..self.pos + buf.len()].copy_from_slice(buf);
        self.pos += buf.len();
        Ok(())
    }

    fn put_backref(&mut self, dist: usize, len: usize) -> Result<(), OutputFull> {
        debug_assert!(dist >= 1 && dist <= self.pos);
        self.reserve(len)?;
        for i in self.pos..self.pos + len {
            self.buf[i] = self.buf[i - dist];
        }
        self.pos += len;
        Ok(())
    }
}

#[cfg(feature = "alloc")]
pub(crate) struct VecOutput {
    pub vec: alloc::vec::Vec<u8>,
}
#[cfg(feature = "alloc")]
impl From<alloc::vec::Vec<u8>> for VecOutput {
    fn from(vec: alloc::vec::Vec<u8>) -> Self {
        Self { vec }
    }
}
#[cfg(feature = "alloc")]
impl OutputSink for VecOutput {
    fn pos(&self) -> usize {
        self.vec.len()
    }

    fn put_slice(&mut self, buf: &[u8]) -> Result<(), OutputFull> {
        self.vec.try_reserve(buf.len()).map_err(|_| OutputFull)?;
        self.vec.extend_from_slice(buf);
        Ok(())
    }

    fn put_backref(&mut self, dist: usize, len: usize) -> Result<(), OutputFull> {
        debug_assert!(dist >= 1 && dist <= self.vec.len());
        // a corrupt length must not abort the process on allocation
        self.vec.try_reserve(len).map_err(|_| OutputFull)?;
        for _ in 0..len {
            let b = self.vec[self.vec.len() - dist];
            self.vec.push(b);
        }
        Ok(())
    }
}

/// Cursor helpers over an input slice
pub(crate) trait InputHelper<'a> {
    /// Skip `n` bytes
    fn inc(&mut self, n: usize);
    /// Split off the next `n` bytes, or `None` if fewer remain
    fn take(&mut self, n: usize) -> Option<&'a [u8]>;
    /// Read the next four bytes as an opaque key without consuming them
    fn peek4(&self) -> Option<u32>;
}
impl<'a> InputHelper<'a> for &'a [u8] {
    fn inc(&mut self, n: usize) {
        *self = &self[n..];
    }
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.len() {
            return None;
        }
        let (head, tail) = self.split_at(n);
        *self = tail;
        Some(head)
    }

    fn peek4(&self) -> Option<u32> {
        Some(u32::from_le_bytes(*self.first_chunk::<4>()?))
    }
}
