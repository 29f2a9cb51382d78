//! Fuzz target for frame ingestion.
//!
//! Tests:
//! - Arbitrary frames, with and without a valid CRC, never panic
//! - Every frame is either accepted or counted as a CRC or decode failure

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sensor_stream::codec::Frame;
use sensor_stream::config::StreamConfig;
use sensor_stream::StreamSession;

#[derive(Debug, Arbitrary)]
struct IngestInput {
    frames: Vec<(bool, Vec<u8>)>,
}

fuzz_target!(|input: IngestInput| {
    let mut session = StreamSession::from_config(&StreamConfig::default());

    for (with_crc, bytes) in input.frames.iter().take(200) {
        let frame = if *with_crc {
            let mut frame = Frame::new();
            frame.extend(bytes);
            frame.finalize_with_crc().to_vec()
        } else {
            bytes.clone()
        };
        let _ = session.ingest(&frame);
    }

    let stats = session.stats();
    assert!(stats.frames_accepted + stats.crc_failures + stats.malformed_frames <= input.frames.len() as u64);
    assert!(stats.boundaries <= stats.samples);
});
