//! Bounds-checked big-endian field readers over a decoded payload.
//!
//! Every read checks `position + width > len` before consuming anything. A read
//! that would overrun sets a sticky malformed flag, leaves the cursor where it
//! was and returns a zero (or empty) default. Nothing clears the flag; a
//! malformed payload must be discarded by the caller.

/// Cursor over a payload with an explicit declared length.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    len: usize,
    pos: usize,
    malformed: bool,
}

impl<'a> FieldReader<'a> {
    /// Reader over the whole of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_len(buf, buf.len())
    }

    /// Reader over the first `len` bytes of `buf`. A `len` beyond the buffer is
    /// clamped to the buffer.
    pub fn with_len(buf: &'a [u8], len: usize) -> Self {
        Self {
            buf,
            len: len.min(buf.len()),
            pos: 0,
            malformed: false,
        }
    }

    /// Whether any read has overrun.
    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the declared length.
    pub fn remaining(&self) -> usize {
        self.len - self.pos
    }

    /// Declared payload length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the declared length is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.pos + N > self.len {
            self.malformed = true;
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Some(out)
    }

    /// One unsigned byte.
    pub fn read_byte(&mut self) -> u8 {
        self.take::<1>().map_or(0, |[b]| b)
    }

    /// Big-endian `u16`.
    pub fn read_word(&mut self) -> u16 {
        self.take::<2>().map_or(0, u16::from_be_bytes)
    }

    /// Big-endian `u32`.
    pub fn read_dword(&mut self) -> u32 {
        self.take::<4>().map_or(0, u32::from_be_bytes)
    }

    /// Big-endian `i32`.
    pub fn read_int(&mut self) -> i32 {
        self.take::<4>().map_or(0, i32::from_be_bytes)
    }

    /// Big-endian 24-bit integer, sign-extended from bit 23.
    pub fn read_int24(&mut self) -> i32 {
        self.take::<3>()
            .map_or(0, |[hi, mid, lo]| i32::from_be_bytes([hi, mid, lo, 0]) >> 8)
    }

    /// Everything left before the declared length, as UTF-8 (lossy).
    ///
    /// Consumes the remainder; an exhausted reader yields an empty string without
    /// being marked malformed.
    pub fn read_string(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.buf[self.pos..self.len]).into_owned();
        self.pos = self.len;
        text
    }
}
