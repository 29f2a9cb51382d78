//! CRC-16/CCITT checksum (polynomial 0x1021, initial value 0xFFFF).
//!
//! The 256-entry lookup table is built once, on first use, by running the
//! bit-serial algorithm for every possible input byte. The table-driven update
//! is then `crc = (crc << 8) ^ TABLE[(crc >> 8) ^ byte]` in 16-bit arithmetic.

use once_cell::sync::Lazy;

/// Generator polynomial for CRC-16/CCITT.
pub const POLYNOMIAL: u16 = 0x1021;

/// Register value before the first byte is folded in.
pub const INITIAL: u16 = 0xFFFF;

static TABLE: Lazy<[u16; 256]> = Lazy::new(build_table);

fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    for (index, entry) in table.iter_mut().enumerate() {
        let mut crc = (index as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
        *entry = crc;
    }
    table
}

/// The shared lookup table.
pub fn table() -> &'static [u16; 256] {
    &TABLE
}

/// Folds one byte into `crc` using the lookup table.
#[inline]
pub fn update(crc: u16, byte: u8) -> u16 {
    (crc << 8) ^ TABLE[usize::from((crc >> 8) as u8 ^ byte)]
}

/// Folds one byte into `crc` one bit at a time. Reference for the table.
pub fn update_bitwise(mut crc: u16, byte: u8) -> u16 {
    crc ^= u16::from(byte) << 8;
    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ POLYNOMIAL
        } else {
            crc << 1
        };
    }
    crc
}

/// CRC over a whole slice.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(INITIAL, |crc, &b| update(crc, b))
}

/// Incremental CRC accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    /// Fresh accumulator holding [`INITIAL`].
    pub fn new() -> Self {
        Self { value: INITIAL }
    }

    /// Folds in one byte.
    pub fn push(&mut self, byte: u8) {
        self.value = update(self.value, byte);
    }

    /// Folds in a slice of bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// Current register value.
    pub fn value(&self) -> u16 {
        self.value
    }
}
