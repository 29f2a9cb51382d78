//! Frame ingestion for one device connection.
//!
//! A [`StreamSession`] takes unescaped frames (payload followed by its CRC) from
//! the transport, checks the CRC, decodes the payload and routes samples to the
//! matching [`ChannelPipeline`](crate::channel::ChannelPipeline). All state is
//! owned by the session and touched from the single delivery callback.

use crate::channel::{ChannelKey, ChannelRegistry};
use crate::codec::{split_checked_payload, Message, TimestampUnwrapper};
use crate::config::StreamConfig;
use crate::error::{AppResult, DecodeError, StreamError};
use crate::telemetry::Telemetry;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Frame counters since the session was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Frames that passed CRC and decoding.
    pub frames_accepted: u64,
    /// Frames whose CRC did not match.
    pub crc_failures: u64,
    /// Frames that passed CRC but could not be decoded.
    pub malformed_frames: u64,
    /// Samples delivered to a channel.
    pub samples: u64,
    /// Samples that sat on a coarse-index boundary.
    pub boundaries: u64,
    /// Emitted samples carrying a non-zero correction.
    pub corrected: u64,
    /// Reconnects.
    pub resets: u64,
}

/// What one frame turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    /// A sample was processed by `channel`.
    Sample {
        /// Receiving channel.
        channel: ChannelKey,
        /// The emitted sample carries a non-zero correction.
        corrected: bool,
        /// Whether a corrected sample was emitted.
        emitted: bool,
        /// The packet sat on a coarse-index boundary.
        boundary: bool,
    },
    /// Device text.
    Info(String),
}

/// CRC check, decoding and per-channel routing.
#[derive(Debug, Default)]
pub struct StreamSession {
    channels: ChannelRegistry,
    clocks: HashMap<ChannelKey, TimestampUnwrapper>,
    stats: SessionStats,
    device_info: Option<String>,
}

impl StreamSession {
    /// Session over an existing registry.
    pub fn new(channels: ChannelRegistry) -> Self {
        Self {
            channels,
            clocks: HashMap::new(),
            stats: SessionStats::default(),
            device_info: None,
        }
    }

    /// Session with one pipeline per configured channel.
    pub fn from_config(config: &StreamConfig) -> Self {
        let mut channels = ChannelRegistry::new();
        for def in &config.channels {
            channels.register(def.key, def.extractor.clone());
        }
        Self::new(channels)
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Last information string the device sent.
    pub fn device_info(&self) -> Option<&str> {
        self.device_info.as_deref()
    }

    /// The channel registry.
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Latest snapshot for `channel`.
    pub fn snapshot(&self, channel: ChannelKey) -> Option<Telemetry> {
        self.channels.get(channel).map(|p| p.snapshot())
    }

    /// Receiver for `channel`'s snapshots.
    pub fn subscribe(&self, channel: ChannelKey) -> Option<watch::Receiver<Telemetry>> {
        self.channels.get(channel).map(|p| p.subscribe())
    }

    /// Handles one unescaped frame (payload plus big-endian CRC).
    ///
    /// Sample timestamps are unwrapped per channel before processing, so the
    /// pipeline sees a monotonic time base across the device's `u32` wrap.
    pub fn ingest(&mut self, frame: &[u8]) -> AppResult<Ingested> {
        let payload = match split_checked_payload(frame) {
            Ok(Ok(payload)) => payload,
            Ok(Err((expected, actual))) => {
                self.stats.crc_failures += 1;
                warn!(expected, actual, len = frame.len(), "dropping frame with bad CRC");
                return Err(StreamError::CrcMismatch { expected, actual });
            }
            Err(err) => return Err(self.malformed(err)),
        };

        let message = Message::decode(payload).map_err(|err| self.malformed(err))?;
        match message {
            Message::Info(text) => {
                self.stats.frames_accepted += 1;
                info!(device = %text, "device information");
                self.device_info = Some(text.clone());
                Ok(Ingested::Info(text))
            }
            Message::Sample { channel, mut packet } => {
                let Some(pipeline) = self.channels.get_mut(channel) else {
                    warn!(%channel, "sample for unconfigured channel");
                    return Err(StreamError::UnknownChannel(channel));
                };
                self.stats.frames_accepted += 1;
                self.stats.samples += 1;
                packet.timestamp = self.clocks.entry(channel).or_default().extend(packet.timestamp);
                let output = pipeline.process(&packet);
                if output.boundary {
                    self.stats.boundaries += 1;
                }
                if output.corrected {
                    self.stats.corrected += 1;
                }
                Ok(Ingested::Sample {
                    channel,
                    corrected: output.corrected,
                    emitted: output.emitted,
                    boundary: output.boundary,
                })
            }
        }
    }

    fn malformed(&mut self, err: DecodeError) -> StreamError {
        self.stats.malformed_frames += 1;
        warn!(error = %err, "dropping undecodable frame");
        StreamError::Decode(err)
    }

    /// Starts over after a reconnect. Counters other than `resets` are kept.
    pub fn reset(&mut self) {
        debug!(channels = self.channels.len(), "resetting stream session");
        self.channels.reset_all();
        self.clocks.clear();
        self.device_info = None;
        self.stats.resets += 1;
    }
}
