//! Shared wire primitives

pub mod cursor;
pub mod qos;

pub use cursor::{var_int_len, ByteReader, ByteWriter};
pub use qos::QualityOfService;

/// Protocol name that opens every CONNECT variable header.
pub const PROTOCOL_NAME: &str = "MQTT";

/// Protocol level byte for MQTT 5.0.
pub const PROTOCOL_LEVEL: u8 = 5;

/// Largest value the Remaining Length field can carry.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;

/// Largest possible packet on the wire: one type byte, a four-byte
/// Remaining Length, and [`MAX_REMAINING_LENGTH`] bytes after it.
pub const MAX_PACKET_SIZE: u32 = 268_435_460;
