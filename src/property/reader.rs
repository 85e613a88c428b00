//! Property reader
//!
//! Cursor over one encoded property block. The typed getters confirm the
//! identifier, decode the value per the wire-type table, and enforce the
//! same range rules the builder enforces on the way out; a peer that
//! sends an out-of-range value produced a malformed packet.

use crate::{
    common::cursor::ByteReader,
    error::{CodecError, Result},
    property::{note_seen, PacketScope, PropertyId, PropertyValue},
};

#[derive(Debug, Clone)]
pub struct PropertyReader<'a> {
    reader: ByteReader<'a>,
}

impl<'a> PropertyReader<'a> {
    /// Reader over encoded `(identifier, value)` pairs, without the block
    /// length prefix.
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(block),
        }
    }

    /// Identifier of the next property without advancing. `None` at the
    /// end of the block.
    pub fn peek_identifier(&self) -> Result<Option<PropertyId>> {
        match self.reader.peek_u8() {
            None => Ok(None),
            Some(byte) => PropertyId::try_from(byte).map(Some),
        }
    }

    /// Peek plus the validation a packet parser needs: the property must
    /// be allowed in `scope` and must not repeat (User Property excepted).
    pub(crate) fn next_for_scope(
        &mut self,
        scope: PacketScope,
        seen: &mut u32,
    ) -> Result<Option<PropertyId>> {
        let Some(id) = self.peek_identifier()? else {
            return Ok(None);
        };
        if !id.allowed_in(scope) {
            return Err(CodecError::MalformedPacket(
                "property not allowed for this packet type",
            ));
        }
        note_seen(seen, id)?;
        Ok(Some(id))
    }

    /// Advances over one property of any type.
    pub fn skip_property(&mut self) -> Result<()> {
        let id = PropertyId::try_from(self.reader.read_u8()?)?;
        match id.value_type() {
            PropertyValue::Byte => {
                self.reader.read_u8()?;
            }
            PropertyValue::TwoByte => {
                self.reader.read_u16()?;
            }
            PropertyValue::FourByte => {
                self.reader.read_u32()?;
            }
            PropertyValue::VarInt => {
                self.reader.read_var_int()?;
            }
            PropertyValue::Utf8 => {
                self.reader.read_utf8()?;
            }
            PropertyValue::Binary => {
                self.reader.read_binary()?;
            }
            PropertyValue::Utf8Pair => {
                self.reader.read_utf8()?;
                self.reader.read_utf8()?;
            }
        }
        Ok(())
    }

    fn expect(&mut self, id: PropertyId) -> Result<()> {
        match self.reader.peek_u8() {
            Some(byte) if byte == id as u8 => {
                self.reader.read_u8()?;
                Ok(())
            }
            Some(_) => Err(CodecError::BadParameter("unexpected property identifier")),
            None => Err(CodecError::MalformedPacket("unexpected end of properties")),
        }
    }

    fn byte_value(&mut self, id: PropertyId) -> Result<u8> {
        self.expect(id)?;
        self.reader.read_u8()
    }

    fn flag_value(&mut self, id: PropertyId) -> Result<u8> {
        let value = self.byte_value(id)?;
        if value > 1 {
            return Err(CodecError::MalformedPacket("value must be 0 or 1"));
        }
        Ok(value)
    }

    fn u16_value(&mut self, id: PropertyId) -> Result<u16> {
        self.expect(id)?;
        self.reader.read_u16()
    }

    fn u32_value(&mut self, id: PropertyId) -> Result<u32> {
        self.expect(id)?;
        self.reader.read_u32()
    }

    fn utf8_value(&mut self, id: PropertyId) -> Result<&'a str> {
        self.expect(id)?;
        self.reader.read_utf8()
    }

    fn binary_value(&mut self, id: PropertyId) -> Result<&'a [u8]> {
        self.expect(id)?;
        self.reader.read_binary()
    }

    pub fn read_payload_format_indicator(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::PayloadFormatIndicator)
    }

    pub fn read_message_expiry_interval(&mut self) -> Result<u32> {
        self.u32_value(PropertyId::MessageExpiryInterval)
    }

    pub fn read_content_type(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::ContentType)
    }

    pub fn read_response_topic(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::ResponseTopic)
    }

    pub fn read_correlation_data(&mut self) -> Result<&'a [u8]> {
        self.binary_value(PropertyId::CorrelationData)
    }

    pub fn read_subscription_identifier(&mut self) -> Result<u32> {
        self.expect(PropertyId::SubscriptionIdentifier)?;
        let id = self.reader.read_var_int()?;
        if id == 0 {
            return Err(CodecError::MalformedPacket(
                "subscription identifier must not be zero",
            ));
        }
        Ok(id)
    }

    pub fn read_session_expiry_interval(&mut self) -> Result<u32> {
        self.u32_value(PropertyId::SessionExpiryInterval)
    }

    pub fn read_assigned_client_identifier(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::AssignedClientIdentifier)
    }

    pub fn read_server_keep_alive(&mut self) -> Result<u16> {
        self.u16_value(PropertyId::ServerKeepAlive)
    }

    pub fn read_authentication_method(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::AuthenticationMethod)
    }

    pub fn read_authentication_data(&mut self) -> Result<&'a [u8]> {
        self.binary_value(PropertyId::AuthenticationData)
    }

    pub fn read_request_problem_information(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::RequestProblemInformation)
    }

    pub fn read_will_delay_interval(&mut self) -> Result<u32> {
        self.u32_value(PropertyId::WillDelayInterval)
    }

    pub fn read_request_response_information(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::RequestResponseInformation)
    }

    pub fn read_response_information(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::ResponseInformation)
    }

    pub fn read_server_reference(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::ServerReference)
    }

    pub fn read_reason_string(&mut self) -> Result<&'a str> {
        self.utf8_value(PropertyId::ReasonString)
    }

    pub fn read_receive_maximum(&mut self) -> Result<u16> {
        let maximum = self.u16_value(PropertyId::ReceiveMaximum)?;
        if maximum == 0 {
            return Err(CodecError::MalformedPacket("receive maximum must not be zero"));
        }
        Ok(maximum)
    }

    pub fn read_topic_alias_maximum(&mut self) -> Result<u16> {
        self.u16_value(PropertyId::TopicAliasMaximum)
    }

    pub fn read_topic_alias(&mut self) -> Result<u16> {
        let alias = self.u16_value(PropertyId::TopicAlias)?;
        if alias == 0 {
            return Err(CodecError::MalformedPacket("topic alias must not be zero"));
        }
        Ok(alias)
    }

    pub fn read_maximum_qos(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::MaximumQos)
    }

    pub fn read_retain_available(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::RetainAvailable)
    }

    pub fn read_user_property(&mut self) -> Result<(&'a str, &'a str)> {
        self.expect(PropertyId::UserProperty)?;
        let key = self.reader.read_utf8()?;
        let value = self.reader.read_utf8()?;
        Ok((key, value))
    }

    pub fn read_maximum_packet_size(&mut self) -> Result<u32> {
        let size = self.u32_value(PropertyId::MaximumPacketSize)?;
        if size == 0 {
            return Err(CodecError::MalformedPacket(
                "maximum packet size must not be zero",
            ));
        }
        Ok(size)
    }

    pub fn read_wildcard_subscription_available(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::WildcardSubscriptionAvailable)
    }

    pub fn read_subscription_identifier_available(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::SubscriptionIdentifierAvailable)
    }

    pub fn read_shared_subscription_available(&mut self) -> Result<u8> {
        self.flag_value(PropertyId::SharedSubscriptionAvailable)
    }
}

/// Iterator over the User Properties of an already-validated block.
///
/// Packet parsers validate the whole block before handing it out, so
/// iteration is infallible: anything that no longer decodes simply ends
/// the iteration.
#[derive(Debug, Clone)]
pub struct UserProperties<'a> {
    reader: PropertyReader<'a>,
}

impl<'a> UserProperties<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            reader: PropertyReader::new(block),
        }
    }
}

impl<'a> Iterator for UserProperties<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.peek_identifier() {
                Ok(Some(PropertyId::UserProperty)) => {
                    return self.reader.read_user_property().ok();
                }
                Ok(Some(_)) => self.reader.skip_property().ok()?,
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn peek_then_typed_read() {
        let block = b"\x11\x00\x00\x00\x3c\x23\x00\x07";
        let mut reader = PropertyReader::new(block);
        assert_eq!(
            reader.peek_identifier().unwrap(),
            Some(PropertyId::SessionExpiryInterval)
        );
        assert_eq!(reader.read_session_expiry_interval().unwrap(), 60);
        assert_eq!(reader.read_topic_alias().unwrap(), 7);
        assert_eq!(reader.peek_identifier().unwrap(), None);
    }

    #[test]
    fn wrong_identifier_does_not_advance() {
        let block = b"\x23\x00\x07";
        let mut reader = PropertyReader::new(block);
        assert!(matches!(
            reader.read_session_expiry_interval(),
            Err(CodecError::BadParameter(_))
        ));
        assert_eq!(reader.read_topic_alias().unwrap(), 7);
    }

    #[test]
    fn unknown_identifier() {
        let reader = PropertyReader::new(b"\x04\x00");
        assert!(matches!(
            reader.peek_identifier(),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn range_checked_on_decode() {
        let mut reader = PropertyReader::new(b"\x21\x00\x00");
        assert!(matches!(
            reader.read_receive_maximum(),
            Err(CodecError::MalformedPacket(_))
        ));

        let mut reader = PropertyReader::new(b"\x24\x02");
        assert!(matches!(
            reader.read_maximum_qos(),
            Err(CodecError::MalformedPacket(_))
        ));

        let mut reader = PropertyReader::new(b"\x01\x05");
        assert!(matches!(
            reader.read_payload_format_indicator(),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn truncated_value() {
        let mut reader = PropertyReader::new(b"\x02\x00\x00");
        assert!(matches!(
            reader.read_message_expiry_interval(),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn user_property_iteration() {
        // session expiry, two user properties, topic alias max
        let block = b"\x11\x00\x00\x00\x0a\x26\x00\x01a\x00\x01b\x26\x00\x01c\x00\x01d\x22\x00\x05";
        let pairs: Vec<_> = UserProperties::new(block).collect();
        assert_eq!(pairs, vec![("a", "b"), ("c", "d")]);
    }

    #[test]
    fn skip_property_covers_every_wire_type() {
        let block = b"\x01\x01\
                      \x13\x00\x3c\
                      \x02\x00\x00\x00\x05\
                      \x0b\x80\x01\
                      \x03\x00\x01t\
                      \x09\x00\x02xy\
                      \x26\x00\x01a\x00\x01b";
        let mut reader = PropertyReader::new(block);
        for _ in 0..7 {
            reader.skip_property().unwrap();
        }
        assert_eq!(reader.peek_identifier().unwrap(), None);
    }
}
