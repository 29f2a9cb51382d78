//! Frame codec: CRC-16/CCITT, frame accumulation, field readers and message decoding.
pub mod crc;
pub mod frame;
pub mod message;
pub mod reader;

pub use crc::Crc16;
pub use frame::{split_checked_payload, verify_crc, Frame, DLE, ETX, STX};
pub use message::{Command, Message, Packet, TimestampUnwrapper, TIMESTAMP_PERIOD};
pub use reader::FieldReader;
