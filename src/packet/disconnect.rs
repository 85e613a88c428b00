//! DISCONNECT

use crate::{
    common::{ByteReader, ByteWriter},
    control::{ControlType, DisconnectReasonCode},
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketInfo,
        PacketSize,
    },
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

/// A parsed incoming `DISCONNECT`. A bare `{0xE0, 0x00}` means a normal
/// disconnection with no properties.
#[derive(Debug, Clone, Copy)]
pub struct Disconnect<'a> {
    pub reason_code: DisconnectReasonCode,
    pub session_expiry_interval: Option<u32>,
    pub reason_string: Option<&'a str>,
    pub server_reference: Option<&'a str>,
    property_bytes: &'a [u8],
}

impl<'a> Disconnect<'a> {
    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }
}

/// Normal disconnection with no properties is the two-byte form; anything
/// else carries the reason code and a property block.
pub fn disconnect_packet_size(
    reason_code: DisconnectReasonCode,
    properties: &[u8],
) -> Result<PacketSize> {
    if reason_code == DisconnectReasonCode::NormalDisconnection && properties.is_empty() {
        return Ok(PacketSize {
            remaining_length: 0,
            packet_size: 2,
        });
    }
    PacketSize::from_remaining(1 + property_block_len(properties))
}

pub fn serialize_disconnect(
    reason_code: DisconnectReasonCode,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = disconnect_packet_size(reason_code, properties)?;
    check_capacity(buf, size)?;

    let mut writer = ByteWriter::new(buf);
    write_fixed_header(
        &mut writer,
        (ControlType::Disconnect as u8) << 4,
        size.remaining_length,
    )?;
    if size.remaining_length > 0 {
        writer.write_u8(reason_code.into())?;
        write_property_block(&mut writer, properties)?;
    }
    Ok(writer.position())
}

pub fn parse_disconnect<'a>(info: &PacketInfo<'a>) -> Result<Disconnect<'a>> {
    let body = info.body(ControlType::Disconnect)?;

    let mut disconnect = Disconnect {
        reason_code: DisconnectReasonCode::NormalDisconnection,
        session_expiry_interval: None,
        reason_string: None,
        server_reference: None,
        property_bytes: &[],
    };
    if info.remaining_length == 0 {
        return Ok(disconnect);
    }

    let mut reader = ByteReader::new(body);
    disconnect.reason_code = DisconnectReasonCode::try_from(reader.read_u8()?)?;
    if info.remaining_length > 1 {
        let block_len = reader.read_var_int()? as usize;
        disconnect.property_bytes = reader.read_bytes(block_len)?;
    }
    if reader.remaining() != 0 {
        return Err(CodecError::MalformedPacket(
            "trailing bytes after disconnect",
        ));
    }

    let mut props = PropertyReader::new(disconnect.property_bytes);
    let mut seen = 0u32;
    while let Some(id) = props.next_for_scope(PacketScope::Disconnect, &mut seen)? {
        match id {
            PropertyId::SessionExpiryInterval => {
                disconnect.session_expiry_interval =
                    Some(props.read_session_expiry_interval()?);
            }
            PropertyId::ReasonString => {
                disconnect.reason_string = Some(props.read_reason_string()?);
            }
            PropertyId::ServerReference => {
                disconnect.server_reference = Some(props.read_server_reference()?);
            }
            _ => props.skip_property()?,
        }
    }
    Ok(disconnect)
}
