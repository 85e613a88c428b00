//! UNSUBACK

use std::num::NonZeroU16;

use crate::{
    common::ByteReader,
    control::{ControlType, UnsubscribeAckReasonCode},
    error::{CodecError, Result},
    packet::PacketInfo,
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

/// A parsed `UNSUBACK`: one reason code per topic filter of the
/// UNSUBSCRIBE it answers, in the same order.
#[derive(Debug, Clone, Copy)]
pub struct Unsuback<'a> {
    pub packet_id: NonZeroU16,
    pub reason_string: Option<&'a str>,
    property_bytes: &'a [u8],
    reason_code_bytes: &'a [u8],
}

impl<'a> Unsuback<'a> {
    pub fn reason_codes(&self) -> UnsubackReasonCodes<'a> {
        UnsubackReasonCodes(self.reason_code_bytes.iter())
    }

    pub fn len(&self) -> usize {
        self.reason_code_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reason_code_bytes.is_empty()
    }

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

/// Iterator over the per-filter reason codes.
#[derive(Debug, Clone)]
pub struct UnsubackReasonCodes<'a>(std::slice::Iter<'a, u8>);

impl Iterator for UnsubackReasonCodes<'_> {
    type Item = UnsubscribeAckReasonCode;

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .and_then(|byte| UnsubscribeAckReasonCode::try_from(*byte).ok())
    }
}

pub fn parse_unsuback<'a>(info: &PacketInfo<'a>) -> Result<Unsuback<'a>> {
    let body = info.body(ControlType::UnsubscribeAcknowledgement)?;

    let mut reader = ByteReader::new(body);
    let packet_id = NonZeroU16::new(reader.read_u16()?)
        .ok_or(CodecError::MalformedPacket("packet id must not be zero"))?;
    let block_len = reader.read_var_int()? as usize;
    let property_bytes = reader.read_bytes(block_len)?;
    let reason_code_bytes = reader.read_bytes(reader.remaining())?;
    if reason_code_bytes.is_empty() {
        return Err(CodecError::MalformedPacket(
            "unsuback carries no reason codes",
        ));
    }
    for byte in reason_code_bytes {
        UnsubscribeAckReasonCode::try_from(*byte)?;
    }

    let mut unsuback = Unsuback {
        packet_id,
        reason_string: None,
        property_bytes,
        reason_code_bytes,
    };
    let mut props = PropertyReader::new(property_bytes);
    let mut seen = 0u32;
    while let Some(id) = props.next_for_scope(PacketScope::Unsuback, &mut seen)? {
        match id {
            PropertyId::ReasonString => {
                unsuback.reason_string = Some(props.read_reason_string()?);
            }
            _ => props.skip_property()?,
        }
    }
    Ok(unsuback)
}
