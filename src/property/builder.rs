//! Property builder
//!
//! Appends validated `(identifier, value)` pairs to a caller-provided
//! buffer. A 32-bit slot set gives O(1) duplicate rejection; when the
//! builder is created for a specific packet type, each append is also
//! checked against that packet's allow-list.

use crate::{
    common::cursor::{var_int_len, ByteWriter},
    error::{CodecError, Result},
    property::{slot_bit, PacketScope, PropertyId, PropertyReader},
};

pub struct PropertyBuilder<'a> {
    writer: ByteWriter<'a>,
    field_set: u32,
    scope: Option<PacketScope>,
}

impl<'a> PropertyBuilder<'a> {
    /// Builder with no packet-type restriction; every property is
    /// accepted. Pair with [`validate_for`](Self::validate_for) before the
    /// block is serialized into a packet.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            writer: ByteWriter::new(buf),
            field_set: 0,
            scope: None,
        }
    }

    /// Builder restricted to the properties `scope` admits.
    pub fn for_packet(buf: &'a mut [u8], scope: PacketScope) -> Self {
        Self {
            writer: ByteWriter::new(buf),
            field_set: 0,
            scope: Some(scope),
        }
    }

    /// Encoded property bytes, without the block length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        self.writer.written()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.writer.position()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the block once its length prefix is added, which is what
    /// every packet size calculation needs.
    pub fn block_len(&self) -> usize {
        var_int_len(self.len() as u32) + self.len()
    }

    fn append<F>(&mut self, id: PropertyId, write_value: F) -> Result<()>
    where
        F: FnOnce(&mut ByteWriter<'_>) -> Result<()>,
    {
        if let Some(scope) = self.scope {
            if !id.allowed_in(scope) {
                return Err(CodecError::BadParameter(
                    "property not allowed for this packet type",
                ));
            }
        }
        let bit = slot_bit(id.slot());
        if id != PropertyId::UserProperty && self.field_set & bit != 0 {
            return Err(CodecError::BadParameter("property already present"));
        }

        let mark = self.writer.position();
        let written = self.writer.write_u8(id as u8);
        match written.and_then(|()| write_value(&mut self.writer)) {
            Ok(()) => {
                if id != PropertyId::UserProperty {
                    self.field_set |= bit;
                }
                Ok(())
            }
            Err(err) => {
                self.writer.truncate(mark);
                Err(err)
            }
        }
    }

    fn append_flag(&mut self, id: PropertyId, value: u8) -> Result<()> {
        if value > 1 {
            return Err(CodecError::BadParameter("value must be 0 or 1"));
        }
        self.append(id, |w| w.write_u8(value))
    }

    fn append_utf8(&mut self, id: PropertyId, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(CodecError::BadParameter("string value must not be empty"));
        }
        self.append(id, |w| w.write_utf8(value))
    }

    pub fn add_payload_format_indicator(&mut self, indicator: u8) -> Result<()> {
        self.append_flag(PropertyId::PayloadFormatIndicator, indicator)
    }

    pub fn add_message_expiry_interval(&mut self, seconds: u32) -> Result<()> {
        self.append(PropertyId::MessageExpiryInterval, |w| w.write_u32(seconds))
    }

    pub fn add_content_type(&mut self, content_type: &str) -> Result<()> {
        self.append_utf8(PropertyId::ContentType, content_type)
    }

    pub fn add_response_topic(&mut self, topic: &str) -> Result<()> {
        self.append_utf8(PropertyId::ResponseTopic, topic)
    }

    pub fn add_correlation_data(&mut self, data: &[u8]) -> Result<()> {
        self.append(PropertyId::CorrelationData, |w| w.write_binary(data))
    }

    pub fn add_subscription_identifier(&mut self, id: u32) -> Result<()> {
        if id == 0 {
            return Err(CodecError::BadParameter(
                "subscription identifier must not be zero",
            ));
        }
        self.append(PropertyId::SubscriptionIdentifier, |w| w.write_var_int(id))
    }

    pub fn add_session_expiry_interval(&mut self, seconds: u32) -> Result<()> {
        self.append(PropertyId::SessionExpiryInterval, |w| w.write_u32(seconds))
    }

    pub fn add_assigned_client_identifier(&mut self, client_id: &str) -> Result<()> {
        self.append_utf8(PropertyId::AssignedClientIdentifier, client_id)
    }

    pub fn add_server_keep_alive(&mut self, seconds: u16) -> Result<()> {
        self.append(PropertyId::ServerKeepAlive, |w| w.write_u16(seconds))
    }

    pub fn add_authentication_method(&mut self, method: &str) -> Result<()> {
        self.append_utf8(PropertyId::AuthenticationMethod, method)
    }

    /// Authentication Data may only follow Authentication Method; sending
    /// data without naming a method is a protocol error, so the builder
    /// refuses to produce it.
    pub fn add_authentication_data(&mut self, data: &[u8]) -> Result<()> {
        if self.field_set & slot_bit(PropertyId::AuthenticationMethod.slot()) == 0 {
            return Err(CodecError::BadParameter(
                "authentication data requires an authentication method",
            ));
        }
        self.append(PropertyId::AuthenticationData, |w| w.write_binary(data))
    }

    pub fn add_request_problem_information(&mut self, request: u8) -> Result<()> {
        self.append_flag(PropertyId::RequestProblemInformation, request)
    }

    pub fn add_will_delay_interval(&mut self, seconds: u32) -> Result<()> {
        self.append(PropertyId::WillDelayInterval, |w| w.write_u32(seconds))
    }

    pub fn add_request_response_information(&mut self, request: u8) -> Result<()> {
        self.append_flag(PropertyId::RequestResponseInformation, request)
    }

    pub fn add_response_information(&mut self, info: &str) -> Result<()> {
        self.append_utf8(PropertyId::ResponseInformation, info)
    }

    pub fn add_server_reference(&mut self, reference: &str) -> Result<()> {
        self.append_utf8(PropertyId::ServerReference, reference)
    }

    pub fn add_reason_string(&mut self, reason: &str) -> Result<()> {
        self.append_utf8(PropertyId::ReasonString, reason)
    }

    pub fn add_receive_maximum(&mut self, maximum: u16) -> Result<()> {
        if maximum == 0 {
            return Err(CodecError::BadParameter("receive maximum must not be zero"));
        }
        self.append(PropertyId::ReceiveMaximum, |w| w.write_u16(maximum))
    }

    pub fn add_topic_alias_maximum(&mut self, maximum: u16) -> Result<()> {
        self.append(PropertyId::TopicAliasMaximum, |w| w.write_u16(maximum))
    }

    pub fn add_topic_alias(&mut self, alias: u16) -> Result<()> {
        if alias == 0 {
            return Err(CodecError::BadParameter("topic alias must not be zero"));
        }
        self.append(PropertyId::TopicAlias, |w| w.write_u16(alias))
    }

    pub fn add_maximum_qos(&mut self, qos: u8) -> Result<()> {
        self.append_flag(PropertyId::MaximumQos, qos)
    }

    pub fn add_retain_available(&mut self, available: u8) -> Result<()> {
        self.append_flag(PropertyId::RetainAvailable, available)
    }

    /// User Property is the one property that may repeat.
    pub fn add_user_property(&mut self, key: &str, value: &str) -> Result<()> {
        self.append(PropertyId::UserProperty, |w| {
            w.write_utf8(key)?;
            w.write_utf8(value)
        })
    }

    pub fn add_maximum_packet_size(&mut self, size: u32) -> Result<()> {
        if size == 0 {
            return Err(CodecError::BadParameter(
                "maximum packet size must not be zero",
            ));
        }
        self.append(PropertyId::MaximumPacketSize, |w| w.write_u32(size))
    }

    pub fn add_wildcard_subscription_available(&mut self, available: u8) -> Result<()> {
        self.append_flag(PropertyId::WildcardSubscriptionAvailable, available)
    }

    pub fn add_subscription_identifier_available(&mut self, available: u8) -> Result<()> {
        self.append_flag(PropertyId::SubscriptionIdentifierAvailable, available)
    }

    pub fn add_shared_subscription_available(&mut self, available: u8) -> Result<()> {
        self.append_flag(PropertyId::SharedSubscriptionAvailable, available)
    }

    /// Re-checks a finished block against a packet type's allow-list, for
    /// blocks built without a scope.
    pub fn validate_for(&self, scope: PacketScope) -> Result<()> {
        let mut reader = PropertyReader::new(self.as_bytes());
        while let Some(id) = reader.peek_identifier()? {
            if !id.allowed_in(scope) {
                return Err(CodecError::BadParameter(
                    "property not allowed for this packet type",
                ));
            }
            reader.skip_property()?;
        }
        Ok(())
    }

    /// SUBSCRIBE blocks additionally depend on what the server advertised:
    /// a Subscription Identifier may only be sent when the CONNACK said
    /// the server supports them.
    pub fn validate_for_subscribe(&self, subscription_id_available: bool) -> Result<()> {
        let mut reader = PropertyReader::new(self.as_bytes());
        while let Some(id) = reader.peek_identifier()? {
            if !id.allowed_in(PacketScope::Subscribe) {
                return Err(CodecError::BadParameter(
                    "property not allowed for this packet type",
                ));
            }
            if id == PropertyId::SubscriptionIdentifier && !subscription_id_available {
                return Err(CodecError::BadParameter(
                    "server does not support subscription identifiers",
                ));
            }
            reader.skip_property()?;
        }
        Ok(())
    }
}
