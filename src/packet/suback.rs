//! SUBACK

use std::num::NonZeroU16;

use crate::{
    common::ByteReader,
    control::{ControlType, SubscribeAckReasonCode},
    error::{CodecError, Result},
    packet::PacketInfo,
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

/// A parsed `SUBACK`: one reason code per topic filter of the SUBSCRIBE it
/// answers, in the same order.
#[derive(Debug, Clone, Copy)]
pub struct Suback<'a> {
    pub packet_id: NonZeroU16,
    pub reason_string: Option<&'a str>,
    property_bytes: &'a [u8],
    reason_code_bytes: &'a [u8],
}

impl<'a> Suback<'a> {
    pub fn reason_codes(&self) -> SubackReasonCodes<'a> {
        SubackReasonCodes(self.reason_code_bytes.iter())
    }

    /// Number of topic filters answered.
    pub fn len(&self) -> usize {
        self.reason_code_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reason_code_bytes.is_empty()
    }

    /// First rejected filter, if the server refused any.
    pub fn server_refused(&self) -> Result<()> {
        match self.reason_codes().find(|code| code.is_error()) {
            Some(code) => Err(CodecError::ServerRefused(code.into())),
            None => Ok(()),
        }
    }

    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }
}

/// Iterator over the per-filter reason codes. The parse validated every
/// byte, so iteration is infallible.
#[derive(Debug, Clone)]
pub struct SubackReasonCodes<'a>(std::slice::Iter<'a, u8>);

impl Iterator for SubackReasonCodes<'_> {
    type Item = SubscribeAckReasonCode;

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .and_then(|byte| SubscribeAckReasonCode::try_from(*byte).ok())
    }
}

pub fn parse_suback<'a>(info: &PacketInfo<'a>) -> Result<Suback<'a>> {
    let body = info.body(ControlType::SubscribeAcknowledgement)?;

    let mut reader = ByteReader::new(body);
    let packet_id = NonZeroU16::new(reader.read_u16()?)
        .ok_or(CodecError::MalformedPacket("packet id must not be zero"))?;
    let block_len = reader.read_var_int()? as usize;
    let property_bytes = reader.read_bytes(block_len)?;
    let reason_code_bytes = reader.read_bytes(reader.remaining())?;
    if reason_code_bytes.is_empty() {
        return Err(CodecError::MalformedPacket("suback carries no reason codes"));
    }
    for byte in reason_code_bytes {
        SubscribeAckReasonCode::try_from(*byte)?;
    }

    let mut suback = Suback {
        packet_id,
        reason_string: None,
        property_bytes,
        reason_code_bytes,
    };
    let mut props = PropertyReader::new(property_bytes);
    let mut seen = 0u32;
    while let Some(id) = props.next_for_scope(PacketScope::Suback, &mut seen)? {
        match id {
            PropertyId::ReasonString => suback.reason_string = Some(props.read_reason_string()?),
            _ => props.skip_property()?,
        }
    }
    Ok(suback)
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::control::PacketType;

    fn info(body: &[u8]) -> PacketInfo<'_> {
        PacketInfo {
            packet_type: PacketType::try_from(0x90).unwrap(),
            remaining_length: body.len(),
            remaining_data: body,
            header_length: 2,
        }
    }

    #[test]
    fn granted_qos_codes() {
        let decoded = parse_suback(&info(b"\x00\x07\x00\x00\x01\x02")).unwrap();
        assert_eq!(decoded.packet_id, NonZeroU16::new(7).unwrap());
        assert_eq!(decoded.len(), 3);
        assert_eq!(
            decoded.reason_codes().collect::<Vec<_>>(),
            vec![
                SubscribeAckReasonCode::GrantedQos0,
                SubscribeAckReasonCode::GrantedQos1,
                SubscribeAckReasonCode::GrantedQos2,
            ]
        );
        decoded.server_refused().unwrap();
    }

    #[test]
    fn failure_code_surfaces() {
        let decoded = parse_suback(&info(b"\x00\x07\x00\x01\x80")).unwrap();
        assert!(matches!(
            decoded.server_refused(),
            Err(CodecError::ServerRefused(0x80))
        ));
    }

    #[test]
    fn reason_string_property() {
        let decoded =
            parse_suback(&info(b"\x00\x01\x07\x1f\x00\x04nope\x87")).unwrap();
        assert_eq!(decoded.reason_string, Some("nope"));
        assert_eq!(
            decoded.reason_codes().collect::<Vec<_>>(),
            vec![SubscribeAckReasonCode::NotAuthorized]
        );
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            parse_suback(&info(b"\x00\x07\x00")),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn unknown_code_rejected() {
        assert!(parse_suback(&info(b"\x00\x07\x00\x03")).is_err());
    }

    #[test]
    fn zero_packet_id_rejected() {
        assert!(parse_suback(&info(b"\x00\x00\x00\x00")).is_err());
    }
}
