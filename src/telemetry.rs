//! Telemetry snapshots handed to the display layer.
//!
//! A [`Telemetry`] is a map from channel name to its latest value. Each channel
//! owns a [`TelemetryPublisher`] built on `tokio::sync::watch`: one update cycle
//! is merged into the current snapshot inside a single `send_modify`, so a
//! reader holding a [`watch::Receiver`] never sees half of a cycle.
//!
//! # Example
//!
//! ```rust,ignore
//! let publisher = TelemetryPublisher::new();
//! let mut rx = publisher.subscribe();
//! tokio::spawn(async move {
//!     while rx.changed().await.is_ok() {
//!         let snapshot = rx.borrow().clone();
//!         render(&snapshot);
//!     }
//! });
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;

/// Standard telemetry keys. `+` marks plotted values, `-` diagnostics.
pub mod keys {
    /// Leading character of diagnostic keys.
    pub const DIAGNOSTIC_PREFIX: char = '-';

    /// Timestamp of the emitted sample.
    pub const TIME: &str = "Time";
    /// Default primary channel label.
    pub const VALUE: &str = "+Value";
    /// Phase-aligned residual.
    pub const SIGNAL: &str = "+Signal";
    /// Moving mean the residual is taken against.
    pub const BASELINE: &str = "+Baseline";
    /// Timestamp of the sample the residual belongs to.
    pub const SIGNAL_TIME: &str = "-SignalTime";
    /// Relative slope disagreement across the corrector window.
    pub const SLOPE_MISMATCH: &str = "-SlopeMismatch";
    /// Jump tolerance explained by the mean slope.
    pub const ALLOW_SLOPE: &str = "-AllowSlope";
    /// Jump tolerance explained by the slope change.
    pub const ALLOW_CURVE: &str = "-AllowCurve";
    /// Jump left over after every tolerance; positive confirms a step.
    pub const METRIC: &str = "-Metric";
    /// Left line minus right line at the window midpoint.
    pub const DELTA_Y_MID: &str = "-DeltaYMid";
    /// Cumulative correction included in the emitted value.
    pub const OFFSET: &str = "-Offset";
    /// Coarse index of the latest packet.
    pub const OFFSET2: &str = "-Offset2";
    /// Extrapolated value at a coarse-index boundary.
    pub const PREDICTED: &str = "-Predicted";
}

/// Named scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Telemetry {
    values: HashMap<String, f64>,
}

impl Telemetry {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Value under `key`.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over `(key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Overwrites this map with every entry of `update`.
    pub fn merge(&mut self, update: &Telemetry) {
        for (k, v) in &update.values {
            self.values.insert(k.clone(), *v);
        }
    }

    /// Drops every diagnostic (`-`-prefixed) key.
    pub fn clear_diagnostics(&mut self) {
        self.values
            .retain(|k, _| !k.starts_with(keys::DIAGNOSTIC_PREFIX));
    }

    /// Drops every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Latest-snapshot broadcaster for one channel.
#[derive(Debug)]
pub struct TelemetryPublisher {
    sender: watch::Sender<Telemetry>,
}

impl Default for TelemetryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryPublisher {
    /// Publisher holding an empty snapshot.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Telemetry::new());
        Self { sender }
    }

    /// Merges one cycle into the snapshot and notifies subscribers.
    ///
    /// Plotted values persist until overwritten; diagnostics describe only the
    /// latest cycle, so those from earlier cycles are dropped first. Empty
    /// updates are dropped without waking anyone.
    pub fn publish(&self, update: &Telemetry) {
        if update.is_empty() {
            return;
        }
        self.sender.send_modify(|snapshot| {
            snapshot.clear_diagnostics();
            snapshot.merge(update);
        });
    }

    /// Replaces the snapshot with an empty one, as after a reconnect.
    pub fn clear(&self) {
        self.sender.send_modify(Telemetry::clear);
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> Telemetry {
        self.sender.borrow().clone()
    }

    /// Receiver for snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Telemetry> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overwrites_and_keeps_other_keys() {
        let mut base = Telemetry::new();
        base.insert(keys::TIME, 1.0);
        base.insert(keys::VALUE, 5.0);

        let mut update = Telemetry::new();
        update.insert(keys::VALUE, 6.0);
        update.insert(keys::SIGNAL, 0.5);
        base.merge(&update);

        assert_eq!(base.get(keys::TIME), Some(1.0));
        assert_eq!(base.get(keys::VALUE), Some(6.0));
        assert_eq!(base.get(keys::SIGNAL), Some(0.5));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut t = Telemetry::new();
        t.insert(keys::TIME, 2.5);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"Time":2.5}"#);
    }

    #[test]
    fn subscribers_see_whole_cycles() {
        let publisher = TelemetryPublisher::new();
        let mut rx = publisher.subscribe();
        assert!(!rx.has_changed().unwrap());

        let mut update = Telemetry::new();
        update.insert(keys::TIME, 3.0);
        update.insert(keys::VALUE, 4.0);
        publisher.publish(&update);

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen, update);
    }

    #[test]
    fn empty_update_does_not_notify() {
        let publisher = TelemetryPublisher::new();
        let rx = publisher.subscribe();
        publisher.publish(&Telemetry::new());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(publisher.subscriber_count(), 1);
    }

    #[test]
    fn diagnostics_only_describe_the_latest_cycle() {
        let publisher = TelemetryPublisher::new();
        let mut first = Telemetry::new();
        first.insert(keys::VALUE, 1.0);
        first.insert(keys::METRIC, -0.5);
        first.insert(keys::PREDICTED, 3.0);
        publisher.publish(&first);

        let mut second = Telemetry::new();
        second.insert(keys::TIME, 2.0);
        second.insert(keys::OFFSET, 0.0);
        publisher.publish(&second);

        let snapshot = publisher.snapshot();
        assert_eq!(snapshot.get(keys::VALUE), Some(1.0));
        assert_eq!(snapshot.get(keys::OFFSET), Some(0.0));
        assert!(!snapshot.contains(keys::METRIC));
        assert!(!snapshot.contains(keys::PREDICTED));
    }

    #[test]
    fn clear_empties_snapshot() {
        let publisher = TelemetryPublisher::new();
        let mut update = Telemetry::new();
        update.insert(keys::VALUE, 1.0);
        publisher.publish(&update);
        publisher.clear();
        assert!(publisher.snapshot().is_empty());
    }
}
