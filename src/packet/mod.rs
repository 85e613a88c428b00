//! Control packet size calculation, serialization and parsing
//!
//! Every outgoing packet type has a `*_packet_size` function and a
//! `serialize_*` function. Serialization recomputes the size from the same
//! parameters, requires the caller's buffer to hold at least
//! [`PacketSize::packet_size`] bytes, writes strictly left to right, and
//! returns the number of bytes written.
//!
//! Every incoming packet type has a `parse_*` function over a
//! [`PacketInfo`] produced by the framing layer.

pub mod ack;
pub mod auth;
pub mod connack;
pub mod connect;
pub mod disconnect;
pub mod ping;
pub mod publish;
pub mod suback;
pub mod subscribe;
pub mod unsuback;
pub mod unsubscribe;

pub use ack::{
    parse_puback, parse_pubcomp, parse_pubrec, parse_pubrel, puback_packet_size,
    pubcomp_packet_size, pubrec_packet_size, pubrel_packet_size, serialize_puback,
    serialize_pubcomp, serialize_pubrec, serialize_pubrel, PublishAck, PublishComp,
};
pub use auth::{auth_packet_size, parse_auth, serialize_auth, Auth};
pub use connack::{parse_connack, Connack, ConnectionProperties};
pub use connect::{connect_packet_size, serialize_connect, Connect, Will};
pub use disconnect::{
    disconnect_packet_size, parse_disconnect, serialize_disconnect, Disconnect,
};
pub use ping::{parse_pingresp, pingreq_packet_size, serialize_pingreq};
pub use publish::{
    parse_publish, publish_packet_size, serialize_publish, serialize_publish_header,
    serialize_publish_header_without_topic, IncomingPublish, Publish, PublishProperties,
};
pub use suback::{parse_suback, Suback, SubackReasonCodes};
pub use subscribe::{
    serialize_subscribe, subscribe_packet_size, RetainHandling, SubscribeOptions, Subscription,
};
pub use unsuback::{parse_unsuback, Unsuback, UnsubackReasonCodes};
pub use unsubscribe::{serialize_unsubscribe, unsubscribe_packet_size};

use crate::{
    common::{
        cursor::{var_int_len, ByteWriter},
        MAX_REMAINING_LENGTH,
    },
    control::{ControlType, PacketType},
    error::{CodecError, Result},
};

/// Sizes computed for one outgoing packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketSize {
    /// Value the Remaining Length field will carry.
    pub remaining_length: usize,
    /// Total bytes on the wire, fixed header included.
    pub packet_size: usize,
}

impl PacketSize {
    pub(crate) fn from_remaining(remaining_length: usize) -> Result<Self> {
        if remaining_length > MAX_REMAINING_LENGTH as usize {
            return Err(CodecError::BadParameter(
                "packet exceeds the maximum remaining length",
            ));
        }
        Ok(Self {
            remaining_length,
            packet_size: 1 + var_int_len(remaining_length as u32) + remaining_length,
        })
    }
}

/// One incoming packet, framed but not yet parsed. `remaining_data` holds
/// the bytes after the fixed header; `header_length` is how many bytes the
/// fixed header took, kept for callers that account for whole packets.
#[derive(Debug, Clone, Copy)]
pub struct PacketInfo<'a> {
    pub packet_type: PacketType,
    pub remaining_length: usize,
    pub remaining_data: &'a [u8],
    pub header_length: usize,
}

impl<'a> PacketInfo<'a> {
    /// The packet's bytes after the fixed header, bounded by the Remaining
    /// Length. Fails if the caller buffered fewer bytes than the header
    /// promised.
    pub(crate) fn body(&self, expected: ControlType) -> Result<&'a [u8]> {
        if self.packet_type.control_type() != expected {
            return Err(CodecError::BadParameter(
                "packet info does not match the parser",
            ));
        }
        self.remaining_data
            .get(..self.remaining_length)
            .ok_or(CodecError::MalformedPacket("packet body is truncated"))
    }
}

pub(crate) fn check_capacity(buf: &[u8], size: PacketSize) -> Result<()> {
    if buf.len() < size.packet_size {
        return Err(CodecError::NoMemory {
            needed: size.packet_size,
            available: buf.len(),
        });
    }
    Ok(())
}

pub(crate) fn write_fixed_header(
    writer: &mut ByteWriter<'_>,
    first_byte: u8,
    remaining_length: usize,
) -> Result<()> {
    writer.write_u8(first_byte)?;
    writer.write_var_int(remaining_length as u32)
}

/// Property block with its length prefix. An absent block is the single
/// byte `0x00`.
pub(crate) fn write_property_block(writer: &mut ByteWriter<'_>, properties: &[u8]) -> Result<()> {
    writer.write_var_int(properties.len() as u32)?;
    writer.write_bytes(properties)
}

pub(crate) fn property_block_len(properties: &[u8]) -> usize {
    var_int_len(properties.len() as u32) + properties.len()
}
