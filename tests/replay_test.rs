//! CSV packet logs replayed through a channel pipeline.

use sensor_stream::channel::{ChannelKey, ChannelPipeline};
use sensor_stream::codec::Packet;
use sensor_stream::data::ExtractorConfig;
use sensor_stream::telemetry::keys;
use std::io::Write;

#[test]
fn test_csv_rows_deserialize_into_packets() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timestamp,channel0_raw,offset1,offset2,gain").unwrap();
    for i in 0..8 {
        writeln!(file, "{},{},-4,3,2", f64::from(i) * 0.5, 104).unwrap();
    }
    file.flush().unwrap();

    let mut reader = csv::Reader::from_path(file.path()).unwrap();
    let packets: Vec<Packet> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(packets.len(), 8);
    assert_eq!(packets[1].timestamp, 0.5);
    assert_eq!(packets[1].offset1, -4.0);

    let mut pipeline = ChannelPipeline::new(
        ChannelKey::Main,
        ExtractorConfig {
            channel_scale: 0.5,
            offset2_step: 10.0,
            window_size: 3,
            ..ExtractorConfig::default()
        },
    );
    let emitted = packets.iter().filter(|p| pipeline.process(p).emitted).count();
    assert_eq!(emitted, 7);

    // (104 - 4) * 0.5 / 2 + 3 * 10
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.get(keys::VALUE), Some(55.0));
    assert_eq!(snapshot.get(keys::SIGNAL), Some(0.0));
    assert_eq!(snapshot.get(keys::TIME), Some(3.0));
}

#[test]
fn test_rows_with_non_finite_fields_are_skipped() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timestamp,channel0_raw,offset1,offset2,gain").unwrap();
    writeln!(file, "0,10,0,0,1").unwrap();
    writeln!(file, "1,10,NaN,0,1").unwrap();
    writeln!(file, "2,10,0,0,inf").unwrap();
    writeln!(file, "3,10,0,0,0").unwrap();
    for i in 4..10 {
        writeln!(file, "{i},10,0,0,1").unwrap();
    }
    file.flush().unwrap();

    let mut reader = csv::Reader::from_path(file.path()).unwrap();
    let packets: Vec<Packet> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(packets.iter().filter(|p| !p.is_usable()).count(), 3);

    let mut pipeline = ChannelPipeline::new(
        ChannelKey::Main,
        ExtractorConfig {
            window_size: 3,
            ..ExtractorConfig::default()
        },
    );
    for packet in packets.iter().filter(|p| p.is_usable()) {
        pipeline.process(packet);
    }
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.get(keys::BASELINE), Some(10.0));
    assert_eq!(snapshot.get(keys::SIGNAL), Some(0.0));
}
