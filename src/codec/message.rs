//! Typed messages carried by validated payloads, and outbound command frames.

use super::frame::Frame;
use super::reader::FieldReader;
use crate::channel::ChannelKey;
use crate::error::{DecodeError, EncodeError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Message kind byte of a sample.
pub const KIND_SAMPLE: u8 = 0x01;
/// Message kind byte of a device information string.
pub const KIND_INFO: u8 = 0x02;

/// Microseconds per second; sample timestamps travel as microseconds.
const US_PER_SECOND: f64 = 1_000_000.0;

/// Seconds after which the `u32` microsecond timestamp wraps (about 71.6 minutes).
pub const TIMESTAMP_PERIOD: f64 = 4_294_967_296.0 / US_PER_SECOND;

const INT24_MIN: i32 = -(1 << 23);
const INT24_MAX: i32 = (1 << 23) - 1;

/// One acquisition from the device, as delivered by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Seconds since the device started streaming.
    pub timestamp: f64,
    /// Fine channel reading in raw counts.
    pub channel0_raw: i32,
    /// Fine offset in raw counts, added to `channel0_raw` before scaling.
    pub offset1: f64,
    /// Coarse segment index.
    pub offset2: i32,
    /// Front-end gain the reading was taken with.
    pub gain: f64,
}

impl Packet {
    /// Whether every field is finite and the gain is non-zero. Decoded packets
    /// always are; packets from other sources (CSV logs) are checked with this.
    pub fn is_usable(&self) -> bool {
        self.timestamp.is_finite() && self.offset1.is_finite() && self.gain.is_finite() && self.gain != 0.0
    }
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Sample addressed to one channel.
    Sample {
        /// Target channel.
        channel: ChannelKey,
        /// Decoded fields.
        packet: Packet,
    },
    /// Free-form device text (banner, firmware version).
    Info(String),
}

impl Message {
    /// Decodes a payload whose CRC has already been checked and stripped.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(payload);
        if r.is_empty() {
            return Err(DecodeError::Empty);
        }
        match r.read_byte() {
            KIND_SAMPLE => decode_sample(&mut r),
            KIND_INFO => Ok(Message::Info(r.read_string())),
            other => Err(DecodeError::UnknownMessage(other)),
        }
    }

    /// Encodes this message as a payload followed by its CRC.
    ///
    /// Fails instead of truncating when a sample field does not fit its wire
    /// width: timestamps outside one `u32` microsecond period, raw values outside
    /// 24 bits, offsets outside `i32`/`u8`, or a gain outside `1..=65535`.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let mut frame = Frame::with_capacity(18);
        match self {
            Message::Sample { channel, packet } => {
                let micros = fit_u32(packet.timestamp * US_PER_SECOND)
                    .ok_or_else(|| out_of_range("timestamp", packet.timestamp))?;
                if !(INT24_MIN..=INT24_MAX).contains(&packet.channel0_raw) {
                    return Err(out_of_range("channel0_raw", f64::from(packet.channel0_raw)));
                }
                let offset1 =
                    fit_i32(packet.offset1).ok_or_else(|| out_of_range("offset1", packet.offset1))?;
                let offset2 = u8::try_from(packet.offset2)
                    .map_err(|_| out_of_range("offset2", f64::from(packet.offset2)))?;
                let gain = fit_u16(packet.gain)
                    .filter(|&g| g != 0)
                    .ok_or_else(|| out_of_range("gain", packet.gain))?;

                frame.append_byte(KIND_SAMPLE);
                frame.append_byte(channel.tag());
                frame.extend(&micros.to_be_bytes());
                frame.extend(&packet.channel0_raw.to_be_bytes()[1..]);
                frame.extend(&offset1.to_be_bytes());
                frame.append_byte(offset2);
                frame.append_word(gain);
            }
            Message::Info(text) => {
                frame.append_byte(KIND_INFO);
                frame.extend(text.as_bytes());
            }
        }
        Ok(frame.finalize_with_crc())
    }
}

/// Extends the wrapping device timestamp into a monotonic time base.
///
/// Decoding alone yields seconds within one [`TIMESTAMP_PERIOD`]. A step
/// backwards by more than half a period is taken as a wrap and adds a period to
/// every later timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampUnwrapper {
    last: Option<f64>,
    periods: u32,
}

impl TimestampUnwrapper {
    /// Unwrapper that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a decoded timestamp onto the monotonic time base.
    pub fn extend(&mut self, timestamp: f64) -> f64 {
        if let Some(last) = self.last {
            if last - timestamp > TIMESTAMP_PERIOD / 2.0 {
                self.periods += 1;
                trace!(periods = self.periods, "device timestamp wrapped");
            }
        }
        self.last = Some(timestamp);
        timestamp + f64::from(self.periods) * TIMESTAMP_PERIOD
    }

    /// Forgets the history, as after a reconnect.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn out_of_range(field: &'static str, value: f64) -> EncodeError {
    EncodeError::OutOfRange { field, value }
}

fn fit_u32(value: f64) -> Option<u32> {
    let rounded = value.round();
    (0.0..=f64::from(u32::MAX))
        .contains(&rounded)
        .then_some(rounded as u32)
}

fn fit_u16(value: f64) -> Option<u16> {
    let rounded = value.round();
    (0.0..=f64::from(u16::MAX))
        .contains(&rounded)
        .then_some(rounded as u16)
}

fn fit_i32(value: f64) -> Option<i32> {
    let rounded = value.round();
    (f64::from(i32::MIN)..=f64::from(i32::MAX))
        .contains(&rounded)
        .then_some(rounded as i32)
}

fn decode_sample(r: &mut FieldReader<'_>) -> Result<Message, DecodeError> {
    let tag = r.read_byte();
    let micros = r.read_dword();
    let channel0_raw = r.read_int24();
    let offset1 = r.read_int();
    let offset2 = r.read_byte();
    let gain = r.read_word();

    if r.is_malformed() {
        return Err(DecodeError::Malformed {
            kind: "sample",
            position: r.position(),
        });
    }
    let channel = ChannelKey::from_tag(tag).ok_or(DecodeError::UnknownChannelTag(tag))?;
    if gain == 0 {
        return Err(DecodeError::InvalidGain);
    }
    if r.remaining() > 0 {
        trace!(extra = r.remaining(), "ignoring trailing sample bytes");
    }

    Ok(Message::Sample {
        channel,
        packet: Packet {
            timestamp: f64::from(micros) / US_PER_SECOND,
            channel0_raw,
            offset1: f64::from(offset1),
            offset2: i32::from(offset2),
            gain: f64::from(gain),
        },
    })
}

/// Host-to-device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin streaming samples.
    Start,
    /// Stop streaming samples.
    Stop,
    /// Select the front-end gain.
    SetGain(u16),
}

impl Command {
    /// Opcode byte.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Start => 0x10,
            Command::Stop => 0x11,
            Command::SetGain(_) => 0x12,
        }
    }

    /// Payload plus trailing CRC, ready for the transport to stuff and delimit.
    pub fn to_frame(&self) -> Bytes {
        let mut frame = Frame::with_capacity(5);
        frame.append_byte(self.opcode());
        if let Command::SetGain(gain) = self {
            frame.append_word(*gain);
        }
        frame.finalize_with_crc()
    }
}
