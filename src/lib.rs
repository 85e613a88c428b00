//! MQTT 5.0 control-packet wire codec.
//!
//! Serializes outgoing control packets into caller-provided byte buffers,
//! parses incoming control packets from byte slices, and encodes/decodes the
//! MQTT 5.0 property section with per-property validation. The codec owns no
//! buffers and performs no allocation: every call borrows its inputs and
//! outputs for the duration of the call, and parsed strings and payloads are
//! slices into the caller's receive buffer.
//!
//! The only external touchpoint is the receive callback handed to
//! [`control::read_incoming_header`]; everything else is a pure function of
//! bytes.
//!
//! <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html>

pub mod common;
pub mod control;
pub mod error;
pub mod packet;
pub mod property;

pub use common::{
    QualityOfService, MAX_PACKET_SIZE, MAX_REMAINING_LENGTH, PROTOCOL_LEVEL, PROTOCOL_NAME,
};
pub use control::{
    read_incoming_header, scan_incoming_header, set_publish_dup_flag, ControlType, IncomingHeader,
    PacketType,
};
pub use error::{CodecError, Result};
pub use packet::{PacketInfo, PacketSize};
pub use property::{PacketScope, PropertyBuilder, PropertyId, PropertyReader, UserProperties};
