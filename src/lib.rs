//! # Sensor Stream Core Library
//!
//! This crate turns the byte stream of a microcontroller-based sensor into a clean,
//! phase-aligned time series for real-time display. The transport (port handling,
//! byte stuffing) and the renderer live elsewhere; they hand this crate unescaped
//! frames and read back telemetry snapshots.
//!
//! ## Crate Structure
//!
//! - **`codec`**: CRC-16/CCITT, frame accumulation, bounds-checked big-endian field
//!   readers with a sticky malformed flag, and typed message decoding.
//! - **`data`**: The signal chain: `RunningAverage`, the four-sample
//!   `DiscontinuityCorrector`, and the `SignalExtractor` that detects coarse-index
//!   boundaries and produces the phase-aligned residual.
//! - **`telemetry`**: Named-value snapshots and their `watch`-based publisher.
//! - **`channel`**: Typed channel keys and independent per-channel pipelines.
//! - **`session`**: CRC check, decoding and routing for one device connection.
//! - **`config`**: Figment-based configuration with validation.
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: `StreamError` and `DecodeError`.
//!
//! ## Data Flow
//!
//! ```text
//! frame bytes -> codec (CRC, fields) -> Packet
//!   -> SignalExtractor (boundary?) -> DiscontinuityCorrector (offset)
//!   -> RunningAverage + delay line -> Telemetry snapshot
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod session;
pub mod telemetry;

pub use channel::{ChannelKey, ChannelRegistry};
pub use error::{AppResult, DecodeError, EncodeError, StreamError};
pub use session::StreamSession;
pub use telemetry::Telemetry;
