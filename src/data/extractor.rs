//! Per-channel signal extraction.
//!
//! Each packet becomes an `(x, y)` pair with `y = fine + offset2 * offset2_step`.
//! A change of the coarse index marks a boundary: the corrector is only asked to
//! predict, and nothing from that packet reaches the average or the delayed
//! buffer. Every other packet goes through the [`DiscontinuityCorrector`]; its
//! output feeds a [`RunningAverage`] and a circular buffer of the same odd size
//! `N`. Once that buffer is full, the signal is the sample at its centre minus
//! the mean, so the oscillatory part lines up with the window it came from
//! instead of trailing it by `(N - 1) / 2` samples.

use super::corrector::{CorrectedSample, CorrectorParams, DiscontinuityCorrector};
use super::running_average::RunningAverage;
use crate::codec::Packet;
use crate::telemetry::{keys, Telemetry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-channel scaling and filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Telemetry key for the corrected value.
    pub label: String,
    /// Physical units per raw count at unit gain.
    pub channel_scale: f64,
    /// Physical units per coarse index step.
    pub offset2_step: f64,
    /// Averaging window and delayed buffer length. Must be odd.
    pub window_size: usize,
    /// Step detector tuning.
    pub corrector: CorrectorParams,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            label: keys::VALUE.to_string(),
            channel_scale: 1.0,
            offset2_step: 1.0,
            window_size: 99,
            corrector: CorrectorParams::default(),
        }
    }
}

impl ExtractorConfig {
    /// Checks scaling, window size and corrector tuning.
    pub fn validate(&self) -> Result<(), String> {
        if self.label.is_empty() {
            return Err("Channel label cannot be empty".to_string());
        }
        if self.label.starts_with(keys::DIAGNOSTIC_PREFIX) {
            return Err(format!(
                "Channel label '{}' cannot use the diagnostic prefix '{}'",
                self.label,
                keys::DIAGNOSTIC_PREFIX
            ));
        }
        if !self.channel_scale.is_finite() || self.channel_scale == 0.0 {
            return Err(format!(
                "Invalid channel_scale {}. Must be finite and non-zero",
                self.channel_scale
            ));
        }
        if !self.offset2_step.is_finite() {
            return Err(format!("Invalid offset2_step {}", self.offset2_step));
        }
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(format!(
                "Invalid window_size {}. Must be odd so the buffer has a centre",
                self.window_size
            ));
        }
        self.corrector.validate()
    }

    /// `(channel0_raw + offset1) * channel_scale / gain + offset2 * offset2_step`.
    pub fn scale(&self, packet: &Packet) -> f64 {
        let fine = (f64::from(packet.channel0_raw) + packet.offset1) * self.channel_scale / packet.gain;
        fine + f64::from(packet.offset2) * self.offset2_step
    }
}

/// Result of one extraction cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractorOutput {
    /// The emitted sample carries a non-zero correction.
    pub corrected: bool,
    /// The packet sat on a coarse-index boundary.
    pub boundary: bool,
    /// Whether a corrected sample was emitted this cycle.
    pub emitted: bool,
    /// The sample was not finite and was dropped without touching any state.
    pub rejected: bool,
    /// Values updated this cycle.
    pub telemetry: Telemetry,
}

/// Circular buffer read at its centre.
#[derive(Debug, Clone)]
struct DelayLine {
    slots: Vec<(f64, f64)>,
    capacity: usize,
    write_index: usize,
}

impl DelayLine {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            write_index: 0,
        }
    }

    fn push(&mut self, x: f64, y: f64) {
        if self.slots.len() < self.capacity {
            self.slots.push((x, y));
        } else {
            self.slots[self.write_index] = (x, y);
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// The sample `(N - 1) / 2` steps older than the newest one.
    fn centre(&self) -> Option<(f64, f64)> {
        if !self.is_full() {
            return None;
        }
        Some(self.slots[(self.write_index + (self.capacity - 1) / 2) % self.capacity])
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.write_index = 0;
    }
}

/// Boundary detection, step correction and phase-aligned residual for one channel.
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    config: ExtractorConfig,
    corrector: DiscontinuityCorrector,
    average: RunningAverage,
    delayed: DelayLine,
    last_offset2: Option<i32>,
}

impl SignalExtractor {
    /// Builds an extractor. A zero or even window size is bumped to the next odd
    /// number; use [`ExtractorConfig::validate`] to reject it instead.
    pub fn new(config: ExtractorConfig) -> Self {
        let window = config.window_size.max(1) | 1;
        Self {
            corrector: DiscontinuityCorrector::new(config.corrector.clone()),
            average: RunningAverage::new(window),
            delayed: DelayLine::new(window),
            last_offset2: None,
            config,
        }
    }

    /// Settings in use.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The step corrector.
    pub fn corrector(&self) -> &DiscontinuityCorrector {
        &self.corrector
    }

    /// The baseline average.
    pub fn average(&self) -> &RunningAverage {
        &self.average
    }

    /// Coarse index of the most recent packet.
    pub fn last_offset2(&self) -> Option<i32> {
        self.last_offset2
    }

    /// Scales `packet` and runs one cycle.
    pub fn process(&mut self, packet: &Packet) -> ExtractorOutput {
        let y = self.config.scale(packet);
        self.push(packet.timestamp, y, packet.offset2)
    }

    /// Runs one cycle on an already scaled value.
    ///
    /// A non-finite `x` or `y` is dropped: the corrector, average, delayed buffer
    /// and coarse index stay as they were and nothing is published.
    pub fn push(&mut self, x: f64, y: f64, offset2: i32) -> ExtractorOutput {
        if !(x.is_finite() && y.is_finite()) {
            warn!(x, y, offset2, "dropping non-finite sample");
            return ExtractorOutput {
                rejected: true,
                ..ExtractorOutput::default()
            };
        }

        let boundary = self.last_offset2.is_some_and(|prev| prev != offset2);
        self.last_offset2 = Some(offset2);

        let mut output = ExtractorOutput {
            boundary,
            ..ExtractorOutput::default()
        };
        output.telemetry.insert(keys::OFFSET2, f64::from(offset2));

        if boundary {
            let predicted = self.corrector.predict(x);
            debug!(x, offset2, predicted, "coarse index boundary");
            if let Some(p) = predicted {
                output.telemetry.insert(keys::PREDICTED, p);
            }
            return output;
        }

        let Some(sample) = self.corrector.push(x, y) else {
            return output;
        };
        self.emit(sample, &mut output);
        output
    }

    fn emit(&mut self, sample: CorrectedSample, output: &mut ExtractorOutput) {
        output.emitted = true;
        output.corrected = sample.is_corrected();

        let t = &mut output.telemetry;
        t.insert(keys::TIME, sample.x);
        t.insert(&self.config.label, sample.y);
        t.insert(keys::OFFSET, sample.offset);
        if let Some(a) = sample.assessment {
            t.insert(keys::SLOPE_MISMATCH, a.slope_mismatch);
            t.insert(keys::ALLOW_SLOPE, a.allow_slope);
            t.insert(keys::ALLOW_CURVE, a.allow_curve);
            t.insert(keys::METRIC, a.metric);
            t.insert(keys::DELTA_Y_MID, a.delta_y_mid);
        }

        self.average.add(sample.y);
        self.delayed.push(sample.x, sample.y);
        if let Some((centre_x, centre_y)) = self.delayed.centre() {
            let baseline = self.average.average();
            t.insert(keys::SIGNAL, centre_y - baseline);
            t.insert(keys::BASELINE, baseline);
            t.insert(keys::SIGNAL_TIME, centre_x);
        }
    }

    /// Forgets everything, as after a reconnect.
    pub fn reset(&mut self) {
        self.corrector.reset();
        self.average.reset();
        self.delayed.clear();
        self.last_offset2 = None;
    }
}
