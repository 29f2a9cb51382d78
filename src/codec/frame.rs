//! Frame accumulation and CRC verification.
//!
//! On the wire a frame is `STX, payload, CRC-hi, CRC-lo, ETX` with every
//! `DLE`/`STX`/`ETX` inside the payload and CRC escaped by a preceding `DLE`.
//! Escaping and unescaping happen in the transport layer; this module only
//! sees unescaped bytes.

use super::crc::{self, Crc16};
use crate::error::DecodeError;
use bytes::{BufMut, Bytes, BytesMut};

/// Data link escape.
pub const DLE: u8 = 0x10;
/// Start of text.
pub const STX: u8 = 0x02;
/// End of text.
pub const ETX: u8 = 0x03;

/// Bytes appended to a frame together with a running CRC over exactly those bytes.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    bytes: BytesMut,
    crc: Crc16,
}

impl Frame {
    /// Creates an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty frame with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
            crc: Crc16::new(),
        }
    }

    /// Appends `byte`, folds it into the CRC and hands it back.
    pub fn append_byte(&mut self, byte: u8) -> u8 {
        self.bytes.put_u8(byte);
        self.crc.push(byte);
        byte
    }

    /// Appends every byte of `bytes` in order.
    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.append_byte(b);
        }
    }

    /// Appends a big-endian `u16`.
    pub fn append_word(&mut self, value: u16) {
        self.extend(&value.to_be_bytes());
    }

    /// Running CRC of everything appended so far.
    pub fn crc(&self) -> u16 {
        self.crc.value()
    }

    /// The accumulated bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of accumulated bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the frame and returns its bytes followed by the big-endian CRC.
    pub fn finalize_with_crc(self) -> Bytes {
        let crc = self.crc.value();
        let mut out = self.bytes;
        out.put_u16(crc);
        out.freeze()
    }
}

/// Splits `frame` into payload and trailing CRC and checks one against the other.
///
/// Returns the payload when the CRC matches, otherwise the `(carried, computed)`
/// pair so the caller can report both.
pub fn split_checked_payload(frame: &[u8]) -> Result<Result<&[u8], (u16, u16)>, DecodeError> {
    if frame.len() < 2 {
        return Err(DecodeError::TooShort(frame.len()));
    }
    let (payload, tail) = frame.split_at(frame.len() - 2);
    let carried = u16::from_be_bytes([tail[0], tail[1]]);
    let computed = crc::crc16(payload);
    if carried == computed {
        Ok(Ok(payload))
    } else {
        Ok(Err((carried, computed)))
    }
}

/// Whether the last two bytes of `frame` are the CRC of the bytes before them.
pub fn verify_crc(frame: &[u8]) -> bool {
    matches!(split_checked_payload(frame), Ok(Ok(_)))
}
