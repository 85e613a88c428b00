//! PUBLISH

use std::{fmt::Display, num::NonZeroU16};

use crate::{
    common::{ByteReader, ByteWriter, QualityOfService},
    control::ControlType,
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketInfo,
        PacketSize,
    },
    property::{PacketScope, PropertyId, PropertyReader, UserProperties},
};

/// Parameters of an outgoing `PUBLISH` packet.
#[derive(Debug, Clone, Copy)]
pub struct Publish<'a> {
    /// Retransmission of an unacknowledged QoS 1/2 message.
    pub dup: bool,
    pub qos: QualityOfService,
    pub retain: bool,
    pub topic: &'a str,
    /// Required for QoS 1 and 2, forbidden for QoS 0.
    pub packet_id: Option<NonZeroU16>,
    pub payload: &'a [u8],
}

fn validate(publish: &Publish<'_>) -> Result<()> {
    if publish.topic.is_empty() {
        return Err(CodecError::BadParameter("topic must not be empty"));
    }
    if publish.topic.len() > u16::MAX as usize {
        return Err(CodecError::BadParameter("topic exceeds 65535 bytes"));
    }
    match publish.qos {
        QualityOfService::Level0 => {
            if publish.dup {
                return Err(CodecError::BadParameter("dup flag requires QoS 1 or 2"));
            }
            if publish.packet_id.is_some() {
                return Err(CodecError::BadParameter("packet id requires QoS 1 or 2"));
            }
        }
        _ => {
            if publish.packet_id.is_none() {
                return Err(CodecError::BadParameter("QoS 1 and 2 require a packet id"));
            }
        }
    }
    Ok(())
}

fn first_byte(publish: &Publish<'_>) -> u8 {
    let mut byte = (ControlType::Publish as u8) << 4 | (publish.qos as u8) << 1;
    if publish.dup {
        byte |= 1 << 3;
    }
    if publish.retain {
        byte |= 1;
    }
    byte
}

fn header_remaining(publish: &Publish<'_>, properties: &[u8]) -> usize {
    let mut remaining = 2 + publish.topic.len();
    if publish.qos != QualityOfService::Level0 {
        remaining += 2;
    }
    remaining + property_block_len(properties)
}

/// Remaining Length and total size of the `PUBLISH` packet these
/// parameters produce. The payload is bounded only by the wire-level
/// Remaining Length limit.
pub fn publish_packet_size(publish: &Publish<'_>, properties: &[u8]) -> Result<PacketSize> {
    validate(publish)?;
    PacketSize::from_remaining(header_remaining(publish, properties) + publish.payload.len())
}

fn serialize_header(
    publish: &Publish<'_>,
    properties: &[u8],
    buf: &mut [u8],
    with_topic: bool,
) -> Result<usize> {
    let size = publish_packet_size(publish, properties)?;
    let mut writer = ByteWriter::new(buf);
    write_fixed_header(&mut writer, first_byte(publish), size.remaining_length)?;
    if with_topic {
        writer.write_utf8(publish.topic)?;
        if let Some(packet_id) = publish.packet_id {
            writer.write_u16(packet_id.get())?;
        }
        write_property_block(&mut writer, properties)?;
    } else {
        writer.write_u16(publish.topic.len() as u16)?;
    }
    Ok(writer.position())
}

pub fn serialize_publish(
    publish: &Publish<'_>,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = publish_packet_size(publish, properties)?;
    check_capacity(buf, size)?;
    let written = serialize_header(publish, properties, buf, true)?;
    let mut writer = ByteWriter::new(&mut buf[written..]);
    writer.write_bytes(publish.payload)?;
    Ok(written + writer.position())
}

/// Serializes everything except the payload, so the caller can transmit
/// the payload from its own buffer without copying it. The Remaining
/// Length still covers the payload.
pub fn serialize_publish_header(
    publish: &Publish<'_>,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = publish_packet_size(publish, properties)?;
    let header_len = size.packet_size - publish.payload.len();
    if buf.len() < header_len {
        return Err(CodecError::NoMemory {
            needed: header_len,
            available: buf.len(),
        });
    }
    serialize_header(publish, properties, buf, true)
}

/// Serializes the first byte, Remaining Length and topic length only. The
/// caller appends the topic bytes, packet id, properties and payload from
/// its own buffers.
pub fn serialize_publish_header_without_topic(
    publish: &Publish<'_>,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = publish_packet_size(publish, properties)?;
    let header_len = 1 + crate::common::var_int_len(size.remaining_length as u32) + 2;
    if buf.len() < header_len {
        return Err(CodecError::NoMemory {
            needed: header_len,
            available: buf.len(),
        });
    }
    serialize_header(publish, properties, buf, false)
}

/// Properties of a parsed incoming `PUBLISH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishProperties<'a> {
    pub payload_format_indicator: Option<u8>,
    pub message_expiry_interval: Option<u32>,
    pub topic_alias: Option<NonZeroU16>,
    pub response_topic: Option<&'a str>,
    pub correlation_data: Option<&'a [u8]>,
    pub subscription_identifier: Option<u32>,
    pub content_type: Option<&'a str>,
    property_bytes: &'a [u8],
}

impl<'a> PublishProperties<'a> {
    pub fn user_properties(&self) -> UserProperties<'a> {
        UserProperties::new(self.property_bytes)
    }

    pub fn reader(&self) -> PropertyReader<'a> {
        PropertyReader::new(self.property_bytes)
    }
}

/// A parsed incoming `PUBLISH`. Topic and payload borrow the receive
/// buffer.
#[derive(Debug, Clone, Copy)]
pub struct IncomingPublish<'a> {
    pub dup: bool,
    pub qos: QualityOfService,
    pub retain: bool,
    /// Empty when the message travels under a topic alias.
    pub topic: &'a str,
    pub packet_id: Option<NonZeroU16>,
    pub properties: PublishProperties<'a>,
    pub payload: &'a [u8],
}

impl Display for IncomingPublish<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{dup: {}, qos: {}, retain: {}, topic: {}",
            self.dup, self.qos, self.retain, self.topic
        )?;
        if let Some(packet_id) = self.packet_id {
            write!(f, ", packet_id: {packet_id}")?;
        }
        match std::str::from_utf8(self.payload) {
            Ok(text) if text.chars().all(|c| c.is_ascii_graphic() || c == ' ') => {
                write!(f, ", payload: {text}")?;
            }
            _ => write!(f, ", payload: [u8; {}]", self.payload.len())?,
        }
        write!(f, "}}")
    }
}

fn parse_properties(block: &[u8]) -> Result<PublishProperties<'_>> {
    let mut properties = PublishProperties {
        property_bytes: block,
        ..Default::default()
    };
    let mut reader = PropertyReader::new(block);
    let mut seen = 0u32;
    while let Some(id) = reader.next_for_scope(PacketScope::Publish, &mut seen)? {
        match id {
            PropertyId::PayloadFormatIndicator => {
                properties.payload_format_indicator =
                    Some(reader.read_payload_format_indicator()?);
            }
            PropertyId::MessageExpiryInterval => {
                properties.message_expiry_interval = Some(reader.read_message_expiry_interval()?);
            }
            PropertyId::TopicAlias => {
                let alias = reader.read_topic_alias()?;
                properties.topic_alias = NonZeroU16::new(alias);
            }
            PropertyId::ResponseTopic => {
                properties.response_topic = Some(reader.read_response_topic()?);
            }
            PropertyId::CorrelationData => {
                properties.correlation_data = Some(reader.read_correlation_data()?);
            }
            PropertyId::SubscriptionIdentifier => {
                properties.subscription_identifier = Some(reader.read_subscription_identifier()?);
            }
            PropertyId::ContentType => {
                properties.content_type = Some(reader.read_content_type()?);
            }
            PropertyId::UserProperty => {
                reader.read_user_property()?;
            }
            _ => {
                return Err(CodecError::MalformedPacket(
                    "property not allowed for this packet type",
                ))
            }
        }
    }
    Ok(properties)
}

pub fn parse_publish<'a>(info: &PacketInfo<'a>) -> Result<IncomingPublish<'a>> {
    let body = info.body(ControlType::Publish)?;
    let publish_flags = info.packet_type.flags();
    let dup = publish_flags & 0b1000 != 0;
    let qos = QualityOfService::try_from((publish_flags & 0b0110) >> 1)?;
    let retain = publish_flags & 0b0001 != 0;
    if dup && qos == QualityOfService::Level0 {
        return Err(CodecError::MalformedPacket("dup flag requires QoS 1 or 2"));
    }
    let minimum = if qos == QualityOfService::Level0 { 3 } else { 5 };
    if info.remaining_length < minimum {
        return Err(CodecError::MalformedPacket(
            "publish remaining length too short",
        ));
    }

    let mut reader = ByteReader::new(body);
    let topic = reader.read_utf8()?;
    let packet_id = if qos != QualityOfService::Level0 {
        let id = reader.read_u16()?;
        Some(
            NonZeroU16::new(id)
                .ok_or(CodecError::MalformedPacket("packet id must not be zero"))?,
        )
    } else {
        None
    };
    let block_len = reader.read_var_int()? as usize;
    let property_bytes = reader.read_bytes(block_len)?;
    let properties = parse_properties(property_bytes)?;
    let payload = reader.read_bytes(reader.remaining())?;

    Ok(IncomingPublish {
        dup,
        qos,
        retain,
        topic,
        packet_id,
        properties,
        payload,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn qos0(topic: &'static str, payload: &'static [u8]) -> Publish<'static> {
        Publish {
            dup: false,
            qos: QualityOfService::Level0,
            retain: false,
            topic,
            packet_id: None,
            payload,
        }
    }

    #[test]
    fn qos0_encode_hex() {
        let publish = qos0("t", b"hi");
        let mut buf = [0u8; 8];
        let written = serialize_publish(&publish, &[], &mut buf).unwrap();
        assert_eq!(&buf[..written], b"\x30\x06\x00\x01\x74\x00\x68\x69");
        assert_eq!(
            written,
            publish_packet_size(&publish, &[]).unwrap().packet_size
        );
    }

    #[test]
    fn qos2_round_trip() {
        let publish = Publish {
            dup: true,
            qos: QualityOfService::Level2,
            retain: true,
            topic: "a/b",
            packet_id: NonZeroU16::new(10),
            payload: b"Hello world!",
        };
        let mut props_buf = [0u8; 32];
        let mut props = crate::property::PropertyBuilder::for_packet(
            &mut props_buf,
            PacketScope::Publish,
        );
        props.add_payload_format_indicator(1).unwrap();
        props.add_user_property("a", "b").unwrap();

        let size = publish_packet_size(&publish, props.as_bytes()).unwrap();
        let mut buf = vec![0u8; size.packet_size];
        let written = serialize_publish(&publish, props.as_bytes(), &mut buf).unwrap();
        assert_eq!(written, size.packet_size);

        let header = crate::control::scan_incoming_header(&buf, written)
            .unwrap()
            .unwrap();
        let info = PacketInfo {
            packet_type: header.packet_type,
            remaining_length: header.remaining_length,
            remaining_data: &buf[header.header_length..written],
            header_length: header.header_length,
        };
        let decoded = parse_publish(&info).unwrap();
        assert!(decoded.dup);
        assert!(decoded.retain);
        assert_eq!(decoded.qos, QualityOfService::Level2);
        assert_eq!(decoded.topic, "a/b");
        assert_eq!(decoded.packet_id, NonZeroU16::new(10));
        assert_eq!(decoded.properties.payload_format_indicator, Some(1));
        assert_eq!(decoded.payload, b"Hello world!");
        assert_eq!(
            decoded.properties.user_properties().collect::<Vec<_>>(),
            vec![("a", "b")]
        );
    }

    #[test]
    fn header_only_serialization() {
        let publish = Publish {
            dup: false,
            qos: QualityOfService::Level1,
            retain: false,
            topic: "sensors/1",
            packet_id: NonZeroU16::new(77),
            payload: &[0u8; 1000],
        };
        let size = publish_packet_size(&publish, &[]).unwrap();

        let mut buf = [0u8; 64];
        let header_len = serialize_publish_header(&publish, &[], &mut buf).unwrap();
        assert_eq!(header_len, size.packet_size - 1000);
        // remaining length still counts the payload
        assert_eq!(buf[0], 0x32);
        assert_eq!(&buf[3..14], b"\x00\x09sensors/1");
        assert_eq!(&buf[14..16], &[0, 77]);
        assert_eq!(buf[16], 0x00);

        let without_topic =
            serialize_publish_header_without_topic(&publish, &[], &mut buf).unwrap();
        // first byte + two-byte remaining length + topic length
        assert_eq!(without_topic, 1 + 2 + 2);
        assert_eq!(&buf[3..5], &[0, 9]);
    }

    #[test]
    fn invalid_parameter_combinations() {
        let mut publish = qos0("t", b"");
        publish.dup = true;
        assert!(matches!(
            publish_packet_size(&publish, &[]),
            Err(CodecError::BadParameter(_))
        ));

        let mut publish = qos0("t", b"");
        publish.qos = QualityOfService::Level1;
        assert!(publish_packet_size(&publish, &[]).is_err());

        let publish = qos0("", b"");
        assert!(publish_packet_size(&publish, &[]).is_err());

        let mut publish = qos0("t", b"");
        publish.packet_id = NonZeroU16::new(1);
        assert!(publish_packet_size(&publish, &[]).is_err());
    }

    #[test]
    fn parse_rejects_zero_packet_id() {
        let bytes = b"\x32\x08\x00\x01t\x00\x00\x00hi";
        let info = PacketInfo {
            packet_type: crate::control::PacketType::try_from(0x32).unwrap(),
            remaining_length: 8,
            remaining_data: &bytes[2..],
            header_length: 2,
        };
        assert!(matches!(
            parse_publish(&info),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn parse_rejects_duplicate_property() {
        // topic "t", properties: payload format indicator twice
        let body = b"\x00\x01t\x04\x01\x01\x01\x00";
        let info = PacketInfo {
            packet_type: crate::control::PacketType::try_from(0x30).unwrap(),
            remaining_length: body.len(),
            remaining_data: body,
            header_length: 2,
        };
        assert!(matches!(
            parse_publish(&info),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn parse_truncated_input() {
        let body = b"\x00\x05top";
        let info = PacketInfo {
            packet_type: crate::control::PacketType::try_from(0x30).unwrap(),
            remaining_length: 7,
            remaining_data: body,
            header_length: 2,
        };
        assert!(matches!(
            parse_publish(&info),
            Err(CodecError::MalformedPacket(_))
        ));
    }
}
