//! Custom error types for the crate.
//!
//! This module defines the primary error type, `StreamError`, and the narrower
//! `DecodeError` used when turning a CRC-checked payload into a typed message.
//! Both are built with `thiserror`.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment` while loading or extracting the
//!   configuration file and environment overrides.
//! - **`Configuration`**: Semantic configuration errors that pass parsing but are
//!   logically invalid (an even window size, a negative noise floor, ...).
//! - **`Io`** / **`Csv`** / **`Json`**: Wrapped I/O and serialization failures from
//!   the replay tooling.
//! - **`CrcMismatch`**: The trailing CRC of a frame does not match its payload.
//! - **`Decode`**: The payload passed the CRC check but could not be decoded.
//! - **`Encode`**: An outbound message holds a value its wire field cannot carry.
//! - **`UnknownChannel`**: A sample addressed a channel that has no pipeline.
//!
//! Field readers in [`crate::codec::reader`] never produce errors: they set a sticky
//! malformed flag instead, and the message decoder turns that flag into
//! [`DecodeError::Malformed`].

use crate::channel::ChannelKey;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, StreamError>;

/// Errors raised while decoding a validated payload into a [`crate::codec::Message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload has no message-kind byte.
    #[error("Empty payload")]
    Empty,

    /// The message-kind byte is not recognised.
    #[error("Unknown message kind 0x{0:02X}")]
    UnknownMessage(u8),

    /// A sample names a channel tag with no [`ChannelKey`].
    #[error("Unknown channel tag {0}")]
    UnknownChannelTag(u8),

    /// The payload ended before every declared field was read.
    #[error("Malformed {kind} message: ran out of bytes at offset {position}")]
    Malformed {
        /// Message being decoded.
        kind: &'static str,
        /// Reader position when it turned malformed.
        position: usize,
    },

    /// A sample carries a gain of zero.
    #[error("Sample declares a gain of zero")]
    InvalidGain,

    /// Fewer than two bytes, so there is no CRC trailer.
    #[error("Frame too short to carry a CRC ({0} bytes)")]
    TooShort(usize),
}

/// Errors raised while encoding a [`crate::codec::Message`] whose fields do not fit
/// their wire widths.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A field is non-finite or outside the range of its wire width.
    #[error("Field {field} = {value} does not fit its wire encoding")]
    OutOfRange {
        /// Packet field name.
        field: &'static str,
        /// Value as given, before scaling to wire units.
        value: f64,
    },
}

/// The crate-wide error type.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Figment could not load or extract the configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The configuration loaded but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Filesystem or stream I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV packet log could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The CRC trailer does not match the payload.
    #[error("CRC mismatch: frame carries 0x{expected:04X}, payload hashes to 0x{actual:04X}")]
    CrcMismatch {
        /// CRC carried by the frame.
        expected: u16,
        /// CRC computed over the payload.
        actual: u16,
    },

    /// The payload passed the CRC but could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A message could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A sample arrived for a channel with no pipeline.
    #[error("No pipeline configured for channel {0:?}")]
    UnknownChannel(ChannelKey),
}

impl From<figment::Error> for StreamError {
    fn from(value: figment::Error) -> Self {
        StreamError::Config(Box::new(value))
    }
}

impl StreamError {
    /// Whether the stream can continue after this error.
    ///
    /// Frame-level failures only cost the offending frame; configuration and I/O
    /// failures stop the session.
    pub fn can_recover(&self) -> bool {
        matches!(
            self,
            StreamError::CrcMismatch { .. } | StreamError::Decode(_) | StreamError::UnknownChannel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_are_recoverable() {
        let crc = StreamError::CrcMismatch {
            expected: 0x1234,
            actual: 0x4321,
        };
        assert!(crc.can_recover());
        assert!(StreamError::Decode(DecodeError::InvalidGain).can_recover());
        assert!(StreamError::UnknownChannel(ChannelKey::Aux).can_recover());
    }

    #[test]
    fn configuration_errors_are_fatal() {
        let err = StreamError::Configuration("window_size must be odd".into());
        assert!(!err.can_recover());
        assert!(err.to_string().contains("window_size must be odd"));
    }

    #[test]
    fn crc_mismatch_formats_as_hex() {
        let err = StreamError::CrcMismatch {
            expected: 0x00AB,
            actual: 0xBEEF,
        };
        assert_eq!(
            err.to_string(),
            "CRC mismatch: frame carries 0x00AB, payload hashes to 0xBEEF"
        );
    }

    #[test]
    fn encode_error_names_the_field() {
        let err: StreamError = EncodeError::OutOfRange {
            field: "offset2",
            value: 256.0,
        }
        .into();
        assert!(!err.can_recover());
        assert!(err.to_string().contains("offset2 = 256"));
    }

    #[test]
    fn decode_error_converts_into_stream_error() {
        let err: StreamError = DecodeError::UnknownMessage(0x7F).into();
        match err {
            StreamError::Decode(DecodeError::UnknownMessage(kind)) => assert_eq!(kind, 0x7F),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
