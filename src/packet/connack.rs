//! CONNACK

use std::fmt::Display;

use crate::{
    common::ByteReader,
    control::{ConnectReasonCode, ControlType},
    error::{CodecError, Result},
    packet::PacketInfo,
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

/// Negotiated connection limits, updated in place as CONNACK properties
/// arrive. `Default` holds the protocol values that apply when the server
/// omits a property.
///
/// The `request_*` flags and the client-side limits mirror what the client
/// put in its CONNECT; the session layer sets them before handing the
/// struct to [`parse_connack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProperties {
    pub session_expiry: u32,
    /// How many in-flight QoS 1/2 messages this client accepts.
    pub receive_max: u16,
    /// Largest packet this client accepts.
    pub max_packet_size: u32,
    pub topic_alias_max: u16,
    pub request_response_info: bool,
    pub request_problem_info: bool,
    /// How many in-flight QoS 1/2 messages the server accepts.
    pub server_receive_max: u16,
    pub server_max_qos: u8,
    /// Largest packet the server accepts.
    pub server_max_packet_size: u32,
    pub server_topic_alias_max: u16,
    pub server_keep_alive: u16,
    pub retain_available: bool,
    pub wildcard_sub_available: bool,
    pub sub_id_available: bool,
    pub shared_sub_available: bool,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            session_expiry: 0,
            receive_max: u16::MAX,
            max_packet_size: crate::common::MAX_PACKET_SIZE,
            topic_alias_max: 0,
            request_response_info: false,
            request_problem_info: true,
            server_receive_max: u16::MAX,
            server_max_qos: 2,
            server_max_packet_size: crate::common::MAX_PACKET_SIZE,
            server_topic_alias_max: 0,
            server_keep_alive: u16::MAX,
            retain_available: true,
            wildcard_sub_available: true,
            sub_id_available: true,
            shared_sub_available: true,
        }
    }
}

/// A parsed `CONNACK`.
#[derive(Debug, Clone, Copy)]
pub struct Connack<'a> {
    pub session_present: bool,
    pub reason_code: ConnectReasonCode,
    pub assigned_client_id: Option<&'a str>,
    pub reason_string: Option<&'a str>,
    pub response_information: Option<&'a str>,
    pub server_reference: Option<&'a str>,
    pub authentication_method: Option<&'a str>,
    pub authentication_data: Option<&'a [u8]>,
    property_bytes: &'a [u8],
}

impl<'a> Connack<'a> {
    /// The connection attempt failed if the reason code is 0x80 or above.
    pub fn server_refused(&self) -> Result<()> {
        if self.reason_code.is_error() {
            return Err(CodecError::ServerRefused(self.reason_code.into()));
        }
        Ok(())
    }

    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }

    pub fn properties(&self) -> PropertyReader<'a> {
        PropertyReader::new(self.property_bytes)
    }
}

impl Display for ConnectionProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{session_expiry: {}, receive_max: {}, max_packet_size: {}, \
             topic_alias_max: {}, server_receive_max: {}, server_max_qos: {}, \
             server_max_packet_size: {}, server_topic_alias_max: {}, \
             server_keep_alive: {}, retain_available: {}, \
             wildcard_sub_available: {}, sub_id_available: {}, \
             shared_sub_available: {}}}",
            self.session_expiry,
            self.receive_max,
            self.max_packet_size,
            self.topic_alias_max,
            self.server_receive_max,
            self.server_max_qos,
            self.server_max_packet_size,
            self.server_topic_alias_max,
            self.server_keep_alive,
            self.retain_available,
            self.wildcard_sub_available,
            self.sub_id_available,
            self.shared_sub_available,
        )
    }
}

impl Display for Connack<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{session_present: {}, reason_code: {}",
            self.session_present, self.reason_code
        )?;
        if let Some(assigned_client_id) = self.assigned_client_id {
            write!(f, ", assigned_client_id: {assigned_client_id}")?;
        }
        if let Some(reason_string) = self.reason_string {
            write!(f, ", reason_string: {reason_string}")?;
        }
        if let Some(server_reference) = self.server_reference {
            write!(f, ", server_reference: {server_reference}")?;
        }
        write!(f, "}}")
    }
}

/// Parses a `CONNACK`, filling in the server-side fields of `connection`
/// for every property present and leaving the defaults for every property
/// absent.
pub fn parse_connack<'a>(
    info: &PacketInfo<'a>,
    connection: &mut ConnectionProperties,
) -> Result<Connack<'a>> {
    let body = info.body(ControlType::ConnectAcknowledgement)?;
    if info.remaining_length < 3 {
        return Err(CodecError::MalformedPacket(
            "connack remaining length too short",
        ));
    }

    let mut reader = ByteReader::new(body);
    let ack_flags = reader.read_u8()?;
    if ack_flags & 0xFE != 0 {
        return Err(CodecError::MalformedPacket(
            "reserved connect acknowledge flags must be zero",
        ));
    }
    let session_present = ack_flags & 0x01 != 0;
    let reason_code = ConnectReasonCode::try_from(reader.read_u8()?)?;
    if session_present && reason_code != ConnectReasonCode::Success {
        return Err(CodecError::MalformedPacket(
            "session present with a failure reason code",
        ));
    }

    let block_len = reader.read_var_int()? as usize;
    let property_bytes = reader.read_bytes(block_len)?;
    if reader.remaining() != 0 {
        return Err(CodecError::MalformedPacket("trailing bytes after connack"));
    }

    let mut connack = Connack {
        session_present,
        reason_code,
        assigned_client_id: None,
        reason_string: None,
        response_information: None,
        server_reference: None,
        authentication_method: None,
        authentication_data: None,
        property_bytes,
    };

    let mut props = PropertyReader::new(property_bytes);
    let mut seen = 0u32;
    while let Some(id) = props.next_for_scope(PacketScope::Connack, &mut seen)? {
        match id {
            PropertyId::SessionExpiryInterval => {
                connection.session_expiry = props.read_session_expiry_interval()?;
            }
            PropertyId::ReceiveMaximum => {
                connection.server_receive_max = props.read_receive_maximum()?;
            }
            PropertyId::MaximumQos => {
                connection.server_max_qos = props.read_maximum_qos()?;
            }
            PropertyId::RetainAvailable => {
                connection.retain_available = props.read_retain_available()? == 1;
            }
            PropertyId::MaximumPacketSize => {
                connection.server_max_packet_size = props.read_maximum_packet_size()?;
            }
            PropertyId::AssignedClientIdentifier => {
                connack.assigned_client_id = Some(props.read_assigned_client_identifier()?);
            }
            PropertyId::TopicAliasMaximum => {
                connection.server_topic_alias_max = props.read_topic_alias_maximum()?;
            }
            PropertyId::ReasonString => {
                let reason = props.read_reason_string()?;
                log::debug!("reason string from server: {reason}");
                connack.reason_string = Some(reason);
            }
            PropertyId::UserProperty => {
                props.read_user_property()?;
            }
            PropertyId::WildcardSubscriptionAvailable => {
                connection.wildcard_sub_available =
                    props.read_wildcard_subscription_available()? == 1;
            }
            PropertyId::SubscriptionIdentifierAvailable => {
                connection.sub_id_available =
                    props.read_subscription_identifier_available()? == 1;
            }
            PropertyId::SharedSubscriptionAvailable => {
                connection.shared_sub_available =
                    props.read_shared_subscription_available()? == 1;
            }
            PropertyId::ServerKeepAlive => {
                connection.server_keep_alive = props.read_server_keep_alive()?;
            }
            PropertyId::ResponseInformation => {
                // the server may only answer a question that was asked
                if !connection.request_response_info {
                    return Err(CodecError::MalformedPacket(
                        "response information was not requested",
                    ));
                }
                connack.response_information = Some(props.read_response_information()?);
            }
            PropertyId::ServerReference => {
                connack.server_reference = Some(props.read_server_reference()?);
            }
            PropertyId::AuthenticationMethod => {
                connack.authentication_method = Some(props.read_authentication_method()?);
            }
            PropertyId::AuthenticationData => {
                connack.authentication_data = Some(props.read_authentication_data()?);
            }
            _ => {
                return Err(CodecError::MalformedPacket(
                    "property not allowed for this packet type",
                ))
            }
        }
    }

    Ok(connack)
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::control::PacketType;

    fn info(body: &[u8]) -> PacketInfo<'_> {
        PacketInfo {
            packet_type: PacketType::try_from(0x20).unwrap(),
            remaining_length: body.len(),
            remaining_data: body,
            header_length: 2,
        }
    }

    #[test]
    fn success_without_properties_keeps_defaults() {
        let mut connection = ConnectionProperties::default();
        let connack = parse_connack(&info(b"\x00\x00\x00"), &mut connection).unwrap();

        assert!(!connack.session_present);
        assert_eq!(connack.reason_code, ConnectReasonCode::Success);
        connack.server_refused().unwrap();
        assert_eq!(connection, ConnectionProperties::default());
        assert_eq!(connection.server_receive_max, 65535);
        assert_eq!(connection.server_max_packet_size, 268_435_460);
        assert_eq!(connection.server_max_qos, 2);
        assert!(connection.retain_available);
        assert_eq!(connection.server_keep_alive, 65535);
    }

    #[test]
    fn properties_override_defaults() {
        // receive max 10, max qos 1, assigned client id "srv-1",
        // server keep alive 120, topic alias max 4
        let body = b"\x00\x00\x13\
                     \x21\x00\x0a\
                     \x24\x01\
                     \x12\x00\x05srv-1\
                     \x13\x00\x78\
                     \x22\x00\x04";
        let mut connection = ConnectionProperties::default();
        let connack = parse_connack(&info(body), &mut connection).unwrap();

        assert_eq!(connection.server_receive_max, 10);
        assert_eq!(connection.server_max_qos, 1);
        assert_eq!(connection.server_keep_alive, 120);
        assert_eq!(connection.server_topic_alias_max, 4);
        assert_eq!(connack.assigned_client_id, Some("srv-1"));
        // untouched fields keep their defaults
        assert_eq!(connection.session_expiry, 0);
        assert!(connection.shared_sub_available);
    }

    #[test]
    fn refused_connection() {
        let mut connection = ConnectionProperties::default();
        let connack = parse_connack(&info(b"\x00\x87\x00"), &mut connection).unwrap();
        assert!(matches!(
            connack.server_refused(),
            Err(CodecError::ServerRefused(0x87))
        ));
    }

    #[test]
    fn duplicate_property_rejected() {
        // session expiry twice
        let body = b"\x00\x00\x0a\x11\x00\x00\x00\x01\x11\x00\x00\x00\x02";
        let mut connection = ConnectionProperties::default();
        assert!(matches!(
            parse_connack(&info(body), &mut connection),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn session_present_with_failure_rejected() {
        let mut connection = ConnectionProperties::default();
        assert!(parse_connack(&info(b"\x01\x80\x00"), &mut connection).is_err());
    }

    #[test]
    fn reserved_ack_flags_rejected() {
        let mut connection = ConnectionProperties::default();
        assert!(parse_connack(&info(b"\x02\x00\x00"), &mut connection).is_err());
    }

    #[test]
    fn zero_receive_maximum_rejected() {
        let body = b"\x00\x00\x03\x21\x00\x00";
        let mut connection = ConnectionProperties::default();
        assert!(matches!(
            parse_connack(&info(body), &mut connection),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn unrequested_response_information_rejected() {
        let body = b"\x00\x00\x04\x1a\x00\x01x";
        let mut connection = ConnectionProperties::default();
        assert!(parse_connack(&info(body), &mut connection).is_err());

        connection.request_response_info = true;
        let connack = parse_connack(&info(body), &mut connection).unwrap();
        assert_eq!(connack.response_information, Some("x"));
    }

    #[test]
    fn disallowed_property_rejected() {
        // topic alias is a PUBLISH property
        let body = b"\x00\x00\x03\x23\x00\x01";
        let mut connection = ConnectionProperties::default();
        assert!(matches!(
            parse_connack(&info(body), &mut connection),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut connection = ConnectionProperties::default();
        assert!(parse_connack(&info(b"\x00\x00\x00\xff"), &mut connection).is_err());
    }

    #[test]
    fn unknown_reason_code_rejected() {
        let mut connection = ConnectionProperties::default();
        assert!(parse_connack(&info(b"\x00\x05\x00"), &mut connection).is_err());
    }
}
