//! AUTH
//!
//! The enhanced-authentication exchange packet, shaped like DISCONNECT: a
//! reason code and a property block, with a two-byte short form for
//! `Success` with no properties.

use crate::{
    common::{ByteReader, ByteWriter},
    control::{AuthReasonCode, ControlType},
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketInfo,
        PacketSize,
    },
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

/// A parsed incoming `AUTH`.
#[derive(Debug, Clone, Copy)]
pub struct Auth<'a> {
    pub reason_code: AuthReasonCode,
    pub authentication_method: Option<&'a str>,
    pub authentication_data: Option<&'a [u8]>,
    pub reason_string: Option<&'a str>,
    property_bytes: &'a [u8],
}

impl<'a> Auth<'a> {
    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }
}

pub fn auth_packet_size(reason_code: AuthReasonCode, properties: &[u8]) -> Result<PacketSize> {
    if reason_code == AuthReasonCode::Success && properties.is_empty() {
        return Ok(PacketSize {
            remaining_length: 0,
            packet_size: 2,
        });
    }
    PacketSize::from_remaining(1 + property_block_len(properties))
}

pub fn serialize_auth(
    reason_code: AuthReasonCode,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = auth_packet_size(reason_code, properties)?;
    check_capacity(buf, size)?;

    let mut writer = ByteWriter::new(buf);
    write_fixed_header(
        &mut writer,
        (ControlType::Auth as u8) << 4,
        size.remaining_length,
    )?;
    if size.remaining_length > 0 {
        writer.write_u8(reason_code.into())?;
        write_property_block(&mut writer, properties)?;
    }
    Ok(writer.position())
}

pub fn parse_auth<'a>(info: &PacketInfo<'a>) -> Result<Auth<'a>> {
    let body = info.body(ControlType::Auth)?;

    let mut auth = Auth {
        reason_code: AuthReasonCode::Success,
        authentication_method: None,
        authentication_data: None,
        reason_string: None,
        property_bytes: &[],
    };
    if info.remaining_length == 0 {
        return Ok(auth);
    }

    let mut reader = ByteReader::new(body);
    auth.reason_code = AuthReasonCode::try_from(reader.read_u8()?)?;
    if info.remaining_length > 1 {
        let block_len = reader.read_var_int()? as usize;
        auth.property_bytes = reader.read_bytes(block_len)?;
    }
    if reader.remaining() != 0 {
        return Err(CodecError::MalformedPacket("trailing bytes after auth"));
    }

    let mut props = PropertyReader::new(auth.property_bytes);
    let mut seen = 0u32;
    while let Some(id) = props.next_for_scope(PacketScope::Auth, &mut seen)? {
        match id {
            PropertyId::AuthenticationMethod => {
                auth.authentication_method = Some(props.read_authentication_method()?);
            }
            PropertyId::AuthenticationData => {
                auth.authentication_data = Some(props.read_authentication_data()?);
            }
            PropertyId::ReasonString => {
                auth.reason_string = Some(props.read_reason_string()?);
            }
            _ => props.skip_property()?,
        }
    }
    Ok(auth)
}
