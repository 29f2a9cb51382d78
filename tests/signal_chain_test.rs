//! Behaviour of the signal chain: running average, step corrector and extractor.

use sensor_stream::codec::Packet;
use sensor_stream::data::{CorrectorParams, DiscontinuityCorrector, ExtractorConfig, RunningAverage, SignalExtractor};
use sensor_stream::telemetry::keys;

fn quiet(window_size: usize) -> ExtractorConfig {
    ExtractorConfig {
        window_size,
        corrector: CorrectorParams {
            base_noise_y: 1.0,
            ..CorrectorParams::default()
        },
        ..ExtractorConfig::default()
    }
}

fn wave(i: usize) -> f64 {
    0.5 * (0.3 * i as f64).sin()
}

#[test]
fn test_running_average_window() {
    let mut avg = RunningAverage::new(3);
    assert!(avg.average().is_nan());
    for v in [1.0, 2.0, 3.0, 10.0] {
        avg.add(v);
    }
    assert_eq!(avg.count(), 3);
    assert_eq!(avg.average(), 5.0);
    avg.reset();
    assert!(avg.average().is_nan());
}

#[test]
fn test_corrector_removes_isolated_jump() {
    let mut corrector = DiscontinuityCorrector::new(CorrectorParams::default());
    let mut out = Vec::new();
    for i in 0..12 {
        let x = i as f64;
        let y = if i >= 6 { 105.0 } else { 5.0 };
        if let Some(s) = corrector.push(x, y) {
            out.push(s);
        }
    }
    assert_eq!(corrector.steps_fired(), 1);
    assert_eq!(corrector.offset(), -100.0);
    assert_eq!(out.len(), 11);
    for s in &out {
        assert_eq!(s.y, 5.0, "sample at x={} not flattened", s.x);
    }
    assert!(out.iter().any(|s| s.step_fired));
}

#[test]
fn test_corrector_keeps_smooth_ramp() {
    let mut corrector = DiscontinuityCorrector::new(CorrectorParams::default());
    for i in 0..50 {
        let x = i as f64 * 0.1;
        if let Some(s) = corrector.push(x, 3.0 * x) {
            assert_eq!(s.offset, 0.0);
            if let Some(a) = s.assessment {
                assert!(a.metric <= 0.0);
            }
        }
    }
    assert_eq!(corrector.steps_fired(), 0);
}

#[test]
fn test_corrector_skips_detection_on_repeated_timestamps() {
    let mut corrector = DiscontinuityCorrector::new(CorrectorParams::default());
    for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 50.0), (2.0, 50.0), (3.0, 50.0)] {
        corrector.push(x, y);
    }
    // Both full windows contain the repeated timestamp, so neither is assessed.
    assert_eq!(corrector.steps_fired(), 0);
}

#[test]
fn test_predict_extrapolates_without_touching_window() {
    let mut corrector = DiscontinuityCorrector::new(CorrectorParams::default());
    assert_eq!(corrector.predict(1.0), None);
    corrector.push(0.0, 1.0);
    corrector.push(1.0, 3.0);
    let window_before = corrector.window().to_vec();
    assert_eq!(corrector.predict(2.5), Some(6.0));
    assert_eq!(corrector.window(), window_before.as_slice());
}

#[test]
fn test_signal_absent_until_delay_buffer_full() {
    let mut extractor = SignalExtractor::new(quiet(99));
    // Push i emits sample i - 1, so 99 pushes emit 98 samples.
    for i in 0..99 {
        let out = extractor.push(i as f64 * 0.01, wave(i), 0);
        assert!(!out.telemetry.contains(keys::SIGNAL), "signal early at push {i}");
    }
    let out = extractor.push(0.99, wave(99), 0);
    assert!(out.telemetry.contains(keys::SIGNAL));
}

#[test]
fn test_signal_is_phase_aligned_with_window_centre() {
    let n = 99;
    let mut extractor = SignalExtractor::new(quiet(n));
    let ys: Vec<f64> = (0..400).map(wave).collect();

    let mut last = None;
    for (i, &y) in ys.iter().enumerate().take(n + 1) {
        last = Some(extractor.push(i as f64 * 0.01, y, 0));
    }
    let out = last.unwrap();
    let mean: f64 = ys[..n].iter().sum::<f64>() / n as f64;
    assert_eq!(out.telemetry.get(keys::SIGNAL), Some(ys[49] - mean));
    assert_eq!(out.telemetry.get(keys::SIGNAL_TIME), Some(49.0 * 0.01));

    // Keep going well past the first eviction.
    for (i, &y) in ys.iter().enumerate().skip(n + 1) {
        let out = extractor.push(i as f64 * 0.01, y, 0);
        let newest = i - 1;
        let oldest = newest + 1 - n;
        let centre = newest - (n - 1) / 2;
        let mean: f64 = ys[oldest..=newest].iter().sum::<f64>() / n as f64;
        let signal = out.telemetry.get(keys::SIGNAL).unwrap();
        assert!(
            (signal - (ys[centre] - mean)).abs() < 1e-12,
            "push {i}: {signal} vs {}",
            ys[centre] - mean
        );
    }
}

#[test]
fn test_coarse_index_change_is_a_boundary() {
    let mut extractor = SignalExtractor::new(quiet(99));
    for i in 0..50 {
        let out = extractor.push(i as f64, 2.0 * i as f64, 0);
        assert!(!out.boundary);
    }
    let average_before = extractor.average().count();

    let out = extractor.push(50.0, 500.0, 1);
    assert!(out.boundary);
    assert!(!out.emitted);
    assert_eq!(out.telemetry.len(), 2);
    assert_eq!(out.telemetry.get(keys::OFFSET2), Some(1.0));
    assert_eq!(out.telemetry.get(keys::PREDICTED), Some(100.0));
    assert_eq!(extractor.average().count(), average_before);

    let out = extractor.push(51.0, 510.0, 1);
    assert!(!out.boundary);
    assert!(out.emitted);
}

#[test]
fn test_first_sample_is_never_a_boundary() {
    let mut extractor = SignalExtractor::new(ExtractorConfig::default());
    let out = extractor.push(0.0, 1.0, 42);
    assert!(!out.boundary);
    assert!(!out.emitted);
    assert_eq!(extractor.last_offset2(), Some(42));
}

#[test]
fn test_packet_scaling() {
    let config = ExtractorConfig {
        channel_scale: 0.5,
        offset2_step: 100.0,
        ..ExtractorConfig::default()
    };
    let packet = Packet {
        timestamp: 0.0,
        channel0_raw: 20,
        offset1: 0.0,
        offset2: 2,
        gain: 2.0,
    };
    // (20 + 0) * 0.5 / 2 + 2 * 100
    assert_eq!(config.scale(&packet), 205.0);
}

#[test]
fn test_reset_forgets_coarse_index() {
    let mut extractor = SignalExtractor::new(quiet(5));
    for i in 0..10 {
        extractor.push(i as f64, 0.0, 3);
    }
    extractor.reset();
    let out = extractor.push(10.0, 0.0, 4);
    assert!(!out.boundary);
    assert!(extractor.average().average().is_nan());
}

#[test]
fn test_non_finite_sample_does_not_poison_the_baseline() {
    let mut extractor = SignalExtractor::new(quiet(3));
    extractor.push(0.0, 1.0, 0);
    let out = extractor.push(1.0, f64::NAN, 0);
    assert!(out.rejected);

    let mut last = None;
    for i in 2..51 {
        last = Some(extractor.push(f64::from(i), 1.0, 0));
    }
    let last = last.unwrap();
    assert_eq!(extractor.average().average(), 1.0);
    assert_eq!(last.telemetry.get(keys::BASELINE), Some(1.0));
    assert_eq!(last.telemetry.get(keys::SIGNAL), Some(0.0));
}
