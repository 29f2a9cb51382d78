//! Fuzz target for FieldReader bounds checking.
//!
//! Tests:
//! - Arbitrary payloads with a declared length that may exceed the buffer
//! - Arbitrary sequences of fixed-width reads
//! - Sticky malformed flag and cursor never passing the declared length

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sensor_stream::codec::FieldReader;

#[derive(Debug, Arbitrary)]
enum Read {
    Byte,
    Word,
    Dword,
    Int,
    Int24,
    String,
}

#[derive(Debug, Arbitrary)]
struct ReaderInput {
    payload: Vec<u8>,
    declared_len: u16,
    reads: Vec<Read>,
}

fuzz_target!(|input: ReaderInput| {
    let mut r = FieldReader::with_len(&input.payload, usize::from(input.declared_len));
    assert!(r.len() <= input.payload.len());

    let mut was_malformed = false;
    for read in input.reads.iter().take(256) {
        let before = r.position();
        let width = match read {
            Read::Byte => {
                r.read_byte();
                1
            }
            Read::Word => {
                r.read_word();
                2
            }
            Read::Dword => {
                r.read_dword();
                4
            }
            Read::Int => {
                r.read_int();
                4
            }
            Read::Int24 => {
                let v = r.read_int24();
                assert!((-(1 << 23)..(1 << 23)).contains(&v));
                3
            }
            Read::String => {
                r.read_string();
                0
            }
        };

        // An overrun never moves the cursor
        if width > 0 && before + width > r.len() {
            assert!(r.is_malformed());
            assert_eq!(r.position(), before);
        }
        assert!(r.position() <= r.len());

        // Malformed is sticky
        if was_malformed {
            assert!(r.is_malformed());
        }
        was_malformed = r.is_malformed();
    }
});
