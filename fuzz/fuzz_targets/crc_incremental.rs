//! Fuzz target for CRC-16/CCITT.
//!
//! Tests:
//! - Table-driven update agrees with the bitwise reference
//! - Byte-at-a-time accumulation agrees with the bulk computation at any split
//! - A frame with its CRC appended always verifies

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sensor_stream::codec::crc::{self, Crc16};
use sensor_stream::codec::{verify_crc, Frame};

#[derive(Debug, Arbitrary)]
struct CrcInput {
    data: Vec<u8>,
    split: usize,
}

fuzz_target!(|input: CrcInput| {
    let data = &input.data;

    let mut table = crc::INITIAL;
    let mut bitwise = crc::INITIAL;
    for &b in data {
        table = crc::update(table, b);
        bitwise = crc::update_bitwise(bitwise, b);
    }
    assert_eq!(table, bitwise);
    assert_eq!(table, crc::crc16(data));

    let split = if data.is_empty() { 0 } else { input.split % (data.len() + 1) };
    let mut running = Crc16::new();
    running.extend(&data[..split]);
    running.extend(&data[split..]);
    assert_eq!(running.value(), table);

    let mut frame = Frame::new();
    frame.extend(data);
    assert!(verify_crc(&frame.finalize_with_crc()));
});
