//! PUBACK, PUBREC, PUBREL and PUBCOMP
//!
//! The four QoS acknowledgement packets share one wire shape: packet id,
//! optional reason code, optional property block. A Success ack with no
//! properties collapses to the two-byte Remaining Length form, and that
//! short form is likewise accepted on the way in.

use std::num::NonZeroU16;

use crate::{
    common::{ByteReader, ByteWriter},
    control::{ControlType, PacketType, PublishAckReasonCode, PublishCompReasonCode},
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketInfo,
        PacketSize,
    },
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

fn ack_size(reason_is_success: bool, properties: &[u8]) -> Result<PacketSize> {
    let remaining = if reason_is_success && properties.is_empty() {
        2
    } else if properties.is_empty() {
        3
    } else {
        3 + property_block_len(properties)
    };
    PacketSize::from_remaining(remaining)
}

fn serialize_ack(
    control_type: ControlType,
    packet_id: NonZeroU16,
    reason_code: u8,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = ack_size(reason_code == 0, properties)?;
    check_capacity(buf, size)?;

    let mut writer = ByteWriter::new(buf);
    write_fixed_header(
        &mut writer,
        PacketType::with_default(control_type).into(),
        size.remaining_length,
    )?;
    writer.write_u16(packet_id.get())?;
    if size.remaining_length > 2 {
        writer.write_u8(reason_code)?;
    }
    if size.remaining_length > 3 {
        write_property_block(&mut writer, properties)?;
    }
    Ok(writer.position())
}

struct RawAck<'a> {
    packet_id: NonZeroU16,
    reason_byte: u8,
    reason_string: Option<&'a str>,
    property_bytes: &'a [u8],
}

fn parse_ack<'a>(
    info: &PacketInfo<'a>,
    control_type: ControlType,
    scope: PacketScope,
) -> Result<RawAck<'a>> {
    let body = info.body(control_type)?;
    if info.remaining_length < 2 {
        return Err(CodecError::MalformedPacket("ack remaining length too short"));
    }

    let mut reader = ByteReader::new(body);
    let packet_id = NonZeroU16::new(reader.read_u16()?)
        .ok_or(CodecError::MalformedPacket("packet id must not be zero"))?;

    let mut ack = RawAck {
        packet_id,
        reason_byte: 0,
        reason_string: None,
        property_bytes: &[],
    };
    if info.remaining_length == 2 {
        // short form: Success, no properties
        return Ok(ack);
    }

    ack.reason_byte = reader.read_u8()?;
    if info.remaining_length > 3 {
        let block_len = reader.read_var_int()? as usize;
        ack.property_bytes = reader.read_bytes(block_len)?;
    }
    if reader.remaining() != 0 {
        return Err(CodecError::MalformedPacket("trailing bytes after ack"));
    }

    let mut props = PropertyReader::new(ack.property_bytes);
    let mut seen = 0u32;
    while let Some(id) = props.next_for_scope(scope, &mut seen)? {
        match id {
            PropertyId::ReasonString => ack.reason_string = Some(props.read_reason_string()?),
            _ => props.skip_property()?,
        }
    }
    Ok(ack)
}

/// A parsed `PUBACK` or `PUBREC`.
#[derive(Debug, Clone, Copy)]
pub struct PublishAck<'a> {
    pub packet_id: NonZeroU16,
    pub reason_code: PublishAckReasonCode,
    pub reason_string: Option<&'a str>,
    property_bytes: &'a [u8],
}

impl<'a> PublishAck<'a> {
    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }
}

/// A parsed `PUBREL` or `PUBCOMP`.
#[derive(Debug, Clone, Copy)]
pub struct PublishComp<'a> {
    pub packet_id: NonZeroU16,
    pub reason_code: PublishCompReasonCode,
    pub reason_string: Option<&'a str>,
    property_bytes: &'a [u8],
}

impl<'a> PublishComp<'a> {
    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }
}

fn publish_ack<'a>(
    info: &PacketInfo<'a>,
    control_type: ControlType,
    scope: PacketScope,
) -> Result<PublishAck<'a>> {
    let ack = parse_ack(info, control_type, scope)?;
    Ok(PublishAck {
        packet_id: ack.packet_id,
        reason_code: PublishAckReasonCode::try_from(ack.reason_byte)?,
        reason_string: ack.reason_string,
        property_bytes: ack.property_bytes,
    })
}

fn publish_comp<'a>(
    info: &PacketInfo<'a>,
    control_type: ControlType,
    scope: PacketScope,
) -> Result<PublishComp<'a>> {
    let ack = parse_ack(info, control_type, scope)?;
    Ok(PublishComp {
        packet_id: ack.packet_id,
        reason_code: PublishCompReasonCode::try_from(ack.reason_byte)?,
        reason_string: ack.reason_string,
        property_bytes: ack.property_bytes,
    })
}

pub fn puback_packet_size(
    reason_code: PublishAckReasonCode,
    properties: &[u8],
) -> Result<PacketSize> {
    ack_size(reason_code == PublishAckReasonCode::Success, properties)
}

pub fn serialize_puback(
    packet_id: NonZeroU16,
    reason_code: PublishAckReasonCode,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    serialize_ack(
        ControlType::PublishAcknowledgement,
        packet_id,
        reason_code.into(),
        properties,
        buf,
    )
}

pub fn parse_puback<'a>(info: &PacketInfo<'a>) -> Result<PublishAck<'a>> {
    publish_ack(
        info,
        ControlType::PublishAcknowledgement,
        PacketScope::Puback,
    )
}

pub fn pubrec_packet_size(
    reason_code: PublishAckReasonCode,
    properties: &[u8],
) -> Result<PacketSize> {
    ack_size(reason_code == PublishAckReasonCode::Success, properties)
}

pub fn serialize_pubrec(
    packet_id: NonZeroU16,
    reason_code: PublishAckReasonCode,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    serialize_ack(
        ControlType::PublishReceived,
        packet_id,
        reason_code.into(),
        properties,
        buf,
    )
}

pub fn parse_pubrec<'a>(info: &PacketInfo<'a>) -> Result<PublishAck<'a>> {
    publish_ack(info, ControlType::PublishReceived, PacketScope::Pubrec)
}

pub fn pubrel_packet_size(
    reason_code: PublishCompReasonCode,
    properties: &[u8],
) -> Result<PacketSize> {
    ack_size(reason_code == PublishCompReasonCode::Success, properties)
}

pub fn serialize_pubrel(
    packet_id: NonZeroU16,
    reason_code: PublishCompReasonCode,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    serialize_ack(
        ControlType::PublishRelease,
        packet_id,
        reason_code.into(),
        properties,
        buf,
    )
}

pub fn parse_pubrel<'a>(info: &PacketInfo<'a>) -> Result<PublishComp<'a>> {
    publish_comp(info, ControlType::PublishRelease, PacketScope::Pubrel)
}

pub fn pubcomp_packet_size(
    reason_code: PublishCompReasonCode,
    properties: &[u8],
) -> Result<PacketSize> {
    ack_size(reason_code == PublishCompReasonCode::Success, properties)
}

pub fn serialize_pubcomp(
    packet_id: NonZeroU16,
    reason_code: PublishCompReasonCode,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    serialize_ack(
        ControlType::PublishComplete,
        packet_id,
        reason_code.into(),
        properties,
        buf,
    )
}

pub fn parse_pubcomp<'a>(info: &PacketInfo<'a>) -> Result<PublishComp<'a>> {
    publish_comp(info, ControlType::PublishComplete, PacketScope::Pubcomp)
}

#[cfg(test)]
mod test {
    use test_case::test_case;

    use super::*;

    fn pkid(value: u16) -> NonZeroU16 {
        NonZeroU16::new(value).unwrap()
    }

    fn info(first_byte: u8, body: &[u8]) -> PacketInfo<'_> {
        PacketInfo {
            packet_type: PacketType::try_from(first_byte).unwrap(),
            remaining_length: body.len(),
            remaining_data: body,
            header_length: 2,
        }
    }

    #[test]
    fn success_collapses_to_short_form() {
        let mut buf = [0u8; 8];
        let written =
            serialize_puback(pkid(0x6705), PublishAckReasonCode::Success, &[], &mut buf).unwrap();
        assert_eq!(&buf[..written], b"\x40\x02\x67\x05");

        let written = serialize_puback(
            pkid(0x6705),
            PublishAckReasonCode::NoMatchingSubscribers,
            &[],
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..written], b"\x40\x03\x67\x05\x10");
    }

    #[test]
    fn pubrel_carries_mandated_flags() {
        let mut buf = [0u8; 8];
        let written =
            serialize_pubrel(pkid(1), PublishCompReasonCode::Success, &[], &mut buf).unwrap();
        assert_eq!(&buf[..written], b"\x62\x02\x00\x01");
    }

    #[test]
    fn serialize_with_properties() {
        let mut props_buf = [0u8; 32];
        let mut props =
            crate::property::PropertyBuilder::for_packet(&mut props_buf, PacketScope::Puback);
        props.add_reason_string("not today").unwrap();

        let size =
            puback_packet_size(PublishAckReasonCode::NotAuthorized, props.as_bytes()).unwrap();
        let mut buf = vec![0u8; size.packet_size];
        let written = serialize_puback(
            pkid(7),
            PublishAckReasonCode::NotAuthorized,
            props.as_bytes(),
            &mut buf,
        )
        .unwrap();
        assert_eq!(written, size.packet_size);

        let decoded = parse_puback(&info(0x40, &buf[2..written])).unwrap();
        assert_eq!(decoded.packet_id, pkid(7));
        assert_eq!(decoded.reason_code, PublishAckReasonCode::NotAuthorized);
        assert_eq!(decoded.reason_string, Some("not today"));
    }

    #[test_case(b"\x12\x34", 0x1234, PublishAckReasonCode::Success; "short form")]
    #[test_case(b"\x00\x01\x10", 1, PublishAckReasonCode::NoMatchingSubscribers; "reason only")]
    #[test_case(b"\x00\x01\x87\x00", 1, PublishAckReasonCode::NotAuthorized; "empty properties")]
    fn parse_accepted_forms(body: &[u8], packet_id: u16, reason_code: PublishAckReasonCode) {
        let decoded = parse_puback(&info(0x40, body)).unwrap();
        assert_eq!(decoded.packet_id, pkid(packet_id));
        assert_eq!(decoded.reason_code, reason_code);
        assert_eq!(decoded.reason_string, None);
    }

    #[test_case(b"\x00\x00"; "zero packet id")]
    #[test_case(b"\x00"; "too short")]
    #[test_case(b"\x00\x01\x05"; "unknown reason code")]
    #[test_case(b"\x00\x01\x00\x03\x1f\x00\x01a\xff"; "trailing bytes")]
    #[test_case(b"\x00\x01\x00\x05\x1f\x00\x01a"; "property length past end")]
    fn parse_rejected_forms(body: &[u8]) {
        assert!(matches!(
            parse_puback(&info(0x40, body)),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn pubcomp_reason_codes_are_narrow() {
        // 0x10 is a PUBACK code, not a PUBCOMP one
        assert!(parse_pubcomp(&info(0x70, b"\x00\x01\x10")).is_err());
        let decoded = parse_pubcomp(&info(0x70, b"\x00\x01\x92")).unwrap();
        assert_eq!(
            decoded.reason_code,
            PublishCompReasonCode::PacketIdentifierNotFound
        );
    }

    #[test]
    fn wrong_packet_type_is_caller_error() {
        assert!(matches!(
            parse_puback(&info(0x50, b"\x00\x01")),
            Err(CodecError::BadParameter(_))
        ));
    }
}
