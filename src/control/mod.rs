//! Fixed-header concerns: packet types, reason codes, incoming framing

pub mod fixed_header;
pub mod packet_type;
pub mod reason_code;

pub use fixed_header::{
    read_incoming_header, scan_incoming_header, set_publish_dup_flag, IncomingHeader,
};
pub use packet_type::{ControlType, PacketType};
pub use reason_code::{
    AuthReasonCode, ConnectReasonCode, DisconnectReasonCode, PublishAckReasonCode,
    PublishCompReasonCode, SubscribeAckReasonCode, UnsubscribeAckReasonCode,
};
