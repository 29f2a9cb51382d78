//! Streaming step detector and corrector.
//!
//! The sensor periodically re-bases its coarse channel, which shows up in the
//! series as an abrupt jump with identical slope on either side. The corrector
//! keeps the four most recent samples `A, B, C, D` and compares the line through
//! `A, B` with the line through `C, D` at the midpoint of the `B..C` gap. When
//! the lines disagree by more than slope, curvature and noise allow, the gap is
//! folded into a cumulative offset carried by every later sample.
//!
//! Output lags input by one sample: `C` is only final once `D` has been seen.
//! A confirmed step therefore bumps the offsets of `C` and `D` but never of `A`
//! and `B`, which already sit on the pre-jump side.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Number of samples the detector looks at.
pub const WINDOW: usize = 4;

/// Guards the slope-mismatch ratio against two flat lines.
const EPSILON: f64 = 1e-12;

/// A timestamped value together with the offset in force when it was captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Timestamp in seconds.
    pub x: f64,
    /// Raw measured value.
    pub y: f64,
    /// Cumulative correction applied to this sample.
    pub offset: f64,
}

impl Sample {
    /// `y + offset`.
    pub fn corrected_y(&self) -> f64 {
        self.y + self.offset
    }
}

/// Detector tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorParams {
    /// Largest relative slope disagreement still treated as "same slope both sides".
    pub slope_mismatch_max: f64,
    /// Jump size always attributed to noise.
    pub base_noise_y: f64,
    /// Tolerance per unit of slope across the gap.
    pub k_slope: f64,
    /// Tolerance per unit of slope change across the gap.
    pub k_curve: f64,
    /// Samples after a step during which no new step may fire.
    pub cooldown_samples: u32,
}

impl Default for CorrectorParams {
    fn default() -> Self {
        Self {
            slope_mismatch_max: 0.5,
            base_noise_y: 0.01,
            k_slope: 1.0,
            k_curve: 1.0,
            cooldown_samples: 2,
        }
    }
}

impl CorrectorParams {
    /// Rejects negative or non-finite tolerances.
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("slope_mismatch_max", self.slope_mismatch_max),
            ("base_noise_y", self.base_noise_y),
            ("k_slope", self.k_slope),
            ("k_curve", self.k_curve),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "Invalid {} {}. Must be finite and non-negative",
                    name, value
                ));
            }
        }
        Ok(())
    }
}

/// Geometry of one four-sample window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepAssessment {
    /// Slope through `A, B`.
    pub slope_left: f64,
    /// Slope through `C, D`.
    pub slope_right: f64,
    /// `|mLeft - mRight|` relative to the mean slope magnitude.
    pub slope_mismatch: f64,
    /// Left line minus right line at the midpoint of `B..C`.
    pub delta_y_mid: f64,
    /// Part of the jump explained by the slope.
    pub allow_slope: f64,
    /// Part of the jump explained by curvature.
    pub allow_curve: f64,
    /// What is left of the jump after every allowance. Positive means "too big".
    pub metric: f64,
}

fn strictly_positive(gap: f64) -> bool {
    gap > 0.0
}

impl StepAssessment {
    /// Measures `window` (oldest first). `None` when timestamps are not strictly
    /// increasing, since that geometry says nothing reliable about a step.
    pub fn evaluate(window: &[Sample; WINDOW], params: &CorrectorParams) -> Option<Self> {
        let [a, b, c, d] = window;
        let gap_left = b.x - a.x;
        let gap_mid = c.x - b.x;
        let gap_right = d.x - c.x;
        if !(strictly_positive(gap_left) && strictly_positive(gap_mid) && strictly_positive(gap_right)) {
            return None;
        }

        let slope_left = (b.corrected_y() - a.corrected_y()) / gap_left;
        let slope_right = (d.corrected_y() - c.corrected_y()) / gap_right;
        let slope_magnitude = 0.5 * (slope_left.abs() + slope_right.abs());
        let slope_change = (slope_left - slope_right).abs();
        let slope_mismatch = slope_change / (slope_magnitude + EPSILON);

        let x_mid = 0.5 * (b.x + c.x);
        let left_at_mid = b.corrected_y() + slope_left * (x_mid - b.x);
        let right_at_mid = c.corrected_y() + slope_right * (x_mid - c.x);
        let delta_y_mid = left_at_mid - right_at_mid;

        let allow_slope = params.k_slope * slope_magnitude * gap_mid;
        let allow_curve = params.k_curve * slope_change * gap_mid;
        let metric = delta_y_mid.abs() - (allow_slope + allow_curve) - params.base_noise_y;

        Some(Self {
            slope_left,
            slope_right,
            slope_mismatch,
            delta_y_mid,
            allow_slope,
            allow_curve,
            metric,
        })
    }

    /// Whether this geometry confirms a step given the current cooldown.
    pub fn is_step(&self, params: &CorrectorParams, cooldown: u32) -> bool {
        self.metric > 0.0 && self.slope_mismatch <= params.slope_mismatch_max && cooldown == 0
    }
}

/// One emitted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedSample {
    /// Timestamp of the emitted sample.
    pub x: f64,
    /// Corrected value.
    pub y: f64,
    /// Offset included in `y`.
    pub offset: f64,
    /// Window geometry for this cycle, if the window was full and monotonic.
    pub assessment: Option<StepAssessment>,
    /// Whether a step was confirmed this cycle.
    pub step_fired: bool,
}

impl CorrectedSample {
    /// Whether a non-zero offset was applied.
    pub fn is_corrected(&self) -> bool {
        self.offset != 0.0
    }
}

/// Four-sample sliding-window step corrector for one logical channel.
#[derive(Debug, Clone)]
pub struct DiscontinuityCorrector {
    params: CorrectorParams,
    window: [Sample; WINDOW],
    len: usize,
    offset: f64,
    cooldown: u32,
    steps_fired: u64,
}

impl DiscontinuityCorrector {
    /// Creates an empty corrector.
    pub fn new(params: CorrectorParams) -> Self {
        Self {
            params,
            window: [Sample::default(); WINDOW],
            len: 0,
            offset: 0.0,
            cooldown: 0,
            steps_fired: 0,
        }
    }

    /// Tuning in use.
    pub fn params(&self) -> &CorrectorParams {
        &self.params
    }

    /// Samples currently held, oldest first.
    pub fn window(&self) -> &[Sample] {
        &self.window[..self.len]
    }

    /// Offset applied to newly inserted samples.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Samples left before another step may fire.
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Steps confirmed since construction or the last reset.
    pub fn steps_fired(&self) -> u64 {
        self.steps_fired
    }

    fn insert(&mut self, sample: Sample) {
        if self.len == WINDOW {
            self.window.rotate_left(1);
            self.window[WINDOW - 1] = sample;
        } else {
            self.window[self.len] = sample;
            self.len += 1;
        }
    }

    fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    /// Inserts `(x, y)` and returns the previous sample, now final.
    ///
    /// The first sample after construction or [`reset`](Self::reset) returns
    /// `None`; every later call emits exactly one sample.
    pub fn push(&mut self, x: f64, y: f64) -> Option<CorrectedSample> {
        self.insert(Sample {
            x,
            y,
            offset: self.offset,
        });

        let mut assessment = None;
        let mut step_fired = false;
        if self.len == WINDOW {
            assessment = StepAssessment::evaluate(&self.window, &self.params);
            match assessment {
                Some(a) if a.is_step(&self.params, self.cooldown) => {
                    self.offset += a.delta_y_mid;
                    self.window[2].offset += a.delta_y_mid;
                    self.window[3].offset += a.delta_y_mid;
                    self.cooldown = self.params.cooldown_samples;
                    self.steps_fired += 1;
                    step_fired = true;
                    debug!(
                        x = self.window[2].x,
                        jump = a.delta_y_mid,
                        metric = a.metric,
                        slope_mismatch = a.slope_mismatch,
                        offset = self.offset,
                        "step corrected"
                    );
                }
                Some(a) => {
                    trace!(metric = a.metric, slope_mismatch = a.slope_mismatch, "no step");
                }
                None => trace!(x, "non-monotonic window, detection skipped"),
            }
        }
        if !step_fired {
            self.tick_cooldown();
        }

        if self.len < 2 {
            return None;
        }
        let emitted = self.window[self.len - 2];
        Some(CorrectedSample {
            x: emitted.x,
            y: emitted.corrected_y(),
            offset: emitted.offset,
            assessment,
            step_fired,
        })
    }

    /// Accounts for a sample that must not enter the window.
    ///
    /// Extrapolates the line through the two newest samples to `x` and ticks the
    /// cooldown as for any processed sample. The window is left untouched.
    pub fn predict(&mut self, x: f64) -> Option<f64> {
        self.tick_cooldown();
        if self.len < 2 {
            return None;
        }
        let prev = self.window[self.len - 2];
        let last = self.window[self.len - 1];
        let gap = last.x - prev.x;
        if !strictly_positive(gap) {
            return Some(last.corrected_y());
        }
        let slope = (last.corrected_y() - prev.corrected_y()) / gap;
        Some(last.corrected_y() + slope * (x - last.x))
    }

    /// Drops the window, the offset and the cooldown.
    pub fn reset(&mut self) {
        self.window = [Sample::default(); WINDOW];
        self.len = 0;
        self.offset = 0.0;
        self.cooldown = 0;
        self.steps_fired = 0;
    }
}
