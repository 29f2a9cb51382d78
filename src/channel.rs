//! Logical channels and their independent processing state.

use crate::codec::Packet;
use crate::data::extractor::{ExtractorConfig, ExtractorOutput, SignalExtractor};
use crate::telemetry::{Telemetry, TelemetryPublisher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::watch;

/// Identifies a logical channel of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKey {
    /// Primary sensor channel.
    Main,
    /// Auxiliary sensor channel.
    Aux,
}

impl ChannelKey {
    /// Every channel, in tag order.
    pub const ALL: [ChannelKey; 2] = [ChannelKey::Main, ChannelKey::Aux];

    /// Wire tag for this channel.
    pub fn tag(self) -> u8 {
        match self {
            ChannelKey::Main => 0,
            ChannelKey::Aux => 1,
        }
    }

    /// Channel for a wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChannelKey::Main),
            1 => Some(ChannelKey::Aux),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Main => write!(f, "main"),
            ChannelKey::Aux => write!(f, "aux"),
        }
    }
}

/// Extractor plus publisher for one channel. Nothing here is shared between channels.
#[derive(Debug)]
pub struct ChannelPipeline {
    key: ChannelKey,
    extractor: SignalExtractor,
    publisher: TelemetryPublisher,
}

impl ChannelPipeline {
    /// New pipeline for `key`.
    pub fn new(key: ChannelKey, config: ExtractorConfig) -> Self {
        Self {
            key,
            extractor: SignalExtractor::new(config),
            publisher: TelemetryPublisher::new(),
        }
    }

    /// Channel this pipeline serves.
    pub fn key(&self) -> ChannelKey {
        self.key
    }

    /// The extractor.
    pub fn extractor(&self) -> &SignalExtractor {
        &self.extractor
    }

    /// Runs one packet through the extractor and publishes the cycle.
    pub fn process(&mut self, packet: &Packet) -> ExtractorOutput {
        let output = self.extractor.process(packet);
        self.publisher.publish(&output.telemetry);
        output
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Telemetry {
        self.publisher.snapshot()
    }

    /// Receiver for snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Telemetry> {
        self.publisher.subscribe()
    }

    /// Clears extractor state and the published snapshot.
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.publisher.clear();
    }
}

/// All configured channels, keyed by [`ChannelKey`].
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    pipelines: HashMap<ChannelKey, ChannelPipeline>,
}

impl ChannelRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the pipeline for `key`.
    pub fn register(&mut self, key: ChannelKey, config: ExtractorConfig) {
        self.pipelines.insert(key, ChannelPipeline::new(key, config));
    }

    /// Pipeline for `key`.
    pub fn get(&self, key: ChannelKey) -> Option<&ChannelPipeline> {
        self.pipelines.get(&key)
    }

    /// Mutable pipeline for `key`.
    pub fn get_mut(&mut self, key: ChannelKey) -> Option<&mut ChannelPipeline> {
        self.pipelines.get_mut(&key)
    }

    /// Registered channels, sorted.
    pub fn keys(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<_> = self.pipelines.keys().copied().collect();
        keys.sort();
        keys
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether no channel is registered.
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Resets every pipeline.
    pub fn reset_all(&mut self) {
        for pipeline in self.pipelines.values_mut() {
            pipeline.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::keys;

    fn packet(timestamp: f64, raw: i32) -> Packet {
        Packet {
            timestamp,
            channel0_raw: raw,
            offset1: 0.0,
            offset2: 0,
            gain: 1.0,
        }
    }

    #[test]
    fn tags_round_trip() {
        for key in ChannelKey::ALL {
            assert_eq!(ChannelKey::from_tag(key.tag()), Some(key));
        }
        assert_eq!(ChannelKey::from_tag(2), None);
    }

    #[test]
    fn channels_do_not_share_state() {
        let mut registry = ChannelRegistry::new();
        registry.register(ChannelKey::Main, ExtractorConfig::default());
        registry.register(ChannelKey::Aux, ExtractorConfig::default());

        let main = registry.get_mut(ChannelKey::Main).unwrap();
        main.process(&packet(0.0, 10));
        main.process(&packet(1.0, 11));

        let main_snapshot = registry.get(ChannelKey::Main).unwrap().snapshot();
        assert_eq!(main_snapshot.get(keys::VALUE), Some(10.0));
        assert!(registry.get(ChannelKey::Aux).unwrap().snapshot().is_empty());
        assert_eq!(registry.keys(), vec![ChannelKey::Main, ChannelKey::Aux]);
    }

    #[test]
    fn reset_clears_published_snapshot() {
        let mut pipeline = ChannelPipeline::new(ChannelKey::Aux, ExtractorConfig::default());
        pipeline.process(&packet(0.0, 1));
        pipeline.process(&packet(1.0, 2));
        assert!(!pipeline.snapshot().is_empty());
        pipeline.reset();
        assert!(pipeline.snapshot().is_empty());
        assert_eq!(pipeline.extractor().last_offset2(), None);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ChannelKey::Aux).unwrap();
        assert_eq!(json, r#""aux""#);
    }
}
