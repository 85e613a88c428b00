//! CONNECT

use crate::{
    common::{ByteWriter, QualityOfService, PROTOCOL_LEVEL, PROTOCOL_NAME},
    control::ControlType,
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketSize,
    },
};

/// Parameters of an outgoing `CONNECT` packet.
#[derive(Debug, Clone, Copy)]
pub struct Connect<'a> {
    /// Start a fresh session rather than resuming a stored one.
    pub clean_start: bool,
    /// Keep-alive interval in seconds; zero disables the mechanism.
    pub keep_alive: u16,
    /// May be empty when the server assigns the identifier.
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a [u8]>,
}

/// Will message carried in the `CONNECT` payload.
#[derive(Debug, Clone, Copy)]
pub struct Will<'a> {
    pub qos: QualityOfService,
    pub retain: bool,
    pub topic: &'a str,
    pub payload: &'a [u8],
    /// Encoded Will properties, e.g. a
    /// [`PropertyBuilder`](crate::property::PropertyBuilder) built for the
    /// Will scope. Empty for none.
    pub properties: &'a [u8],
}

mod flags {
    pub const CLEAN_START: u8 = 1 << 1;
    pub const WILL: u8 = 1 << 2;
    pub const WILL_QOS_SHIFT: u8 = 3;
    pub const WILL_RETAIN: u8 = 1 << 5;
    pub const PASSWORD: u8 = 1 << 6;
    pub const USERNAME: u8 = 1 << 7;
}

fn validate(connect: &Connect<'_>, will: Option<&Will<'_>>) -> Result<()> {
    if connect.client_id.len() > u16::MAX as usize {
        return Err(CodecError::BadParameter("client id exceeds 65535 bytes"));
    }
    if let Some(will) = will {
        if will.topic.is_empty() {
            return Err(CodecError::BadParameter("will topic must not be empty"));
        }
        if will.topic.len() > u16::MAX as usize {
            return Err(CodecError::BadParameter("will topic exceeds 65535 bytes"));
        }
        if will.payload.len() > u16::MAX as usize {
            return Err(CodecError::BadParameter("will payload exceeds 65535 bytes"));
        }
    }
    if let Some(username) = connect.username {
        if username.len() > u16::MAX as usize {
            return Err(CodecError::BadParameter("user name exceeds 65535 bytes"));
        }
    }
    if let Some(password) = connect.password {
        if password.len() > u16::MAX as usize {
            return Err(CodecError::BadParameter("password exceeds 65535 bytes"));
        }
    }
    Ok(())
}

/// Remaining Length and total size of the `CONNECT` packet these
/// parameters produce. Must agree with a following [`serialize_connect`]
/// call byte for byte.
pub fn connect_packet_size(
    connect: &Connect<'_>,
    will: Option<&Will<'_>>,
    properties: &[u8],
) -> Result<PacketSize> {
    validate(connect, will)?;

    // protocol name (6) + level (1) + connect flags (1) + keep alive (2)
    let mut remaining = 10;
    remaining += property_block_len(properties);
    remaining += 2 + connect.client_id.len();
    if let Some(will) = will {
        remaining += property_block_len(will.properties);
        remaining += 2 + will.topic.len();
        remaining += 2 + will.payload.len();
    }
    if let Some(username) = connect.username {
        remaining += 2 + username.len();
    }
    if let Some(password) = connect.password {
        remaining += 2 + password.len();
    }
    PacketSize::from_remaining(remaining)
}

pub fn serialize_connect(
    connect: &Connect<'_>,
    will: Option<&Will<'_>>,
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = connect_packet_size(connect, will, properties)?;
    check_capacity(buf, size)?;

    let mut writer = ByteWriter::new(buf);
    write_fixed_header(
        &mut writer,
        (ControlType::Connect as u8) << 4,
        size.remaining_length,
    )?;
    writer.write_utf8(PROTOCOL_NAME)?;
    writer.write_u8(PROTOCOL_LEVEL)?;

    let mut connect_flags = 0u8;
    if connect.clean_start {
        connect_flags |= flags::CLEAN_START;
    }
    if let Some(will) = will {
        connect_flags |= flags::WILL | (will.qos as u8) << flags::WILL_QOS_SHIFT;
        if will.retain {
            connect_flags |= flags::WILL_RETAIN;
        }
    }
    if connect.username.is_some() {
        connect_flags |= flags::USERNAME;
    }
    if connect.password.is_some() {
        connect_flags |= flags::PASSWORD;
    }
    writer.write_u8(connect_flags)?;
    writer.write_u16(connect.keep_alive)?;
    write_property_block(&mut writer, properties)?;

    writer.write_utf8(connect.client_id)?;
    if let Some(will) = will {
        write_property_block(&mut writer, will.properties)?;
        writer.write_utf8(will.topic)?;
        writer.write_binary(will.payload)?;
    }
    if let Some(username) = connect.username {
        writer.write_utf8(username)?;
    }
    if let Some(password) = connect.password {
        writer.write_binary(password)?;
    }
    Ok(writer.position())
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::property::{PacketScope, PropertyBuilder};

    fn minimal(client_id: &str) -> Connect<'_> {
        Connect {
            clean_start: true,
            keep_alive: 60,
            client_id,
            username: None,
            password: None,
        }
    }

    #[test]
    fn trivial_connect_encode_hex() {
        let connect = minimal("a");
        let mut buf = [0u8; 16];
        let written = serialize_connect(&connect, None, &[], &mut buf).unwrap();

        let expected =
            b"\x10\x0e\x00\x04\x4d\x51\x54\x54\x05\x02\x00\x3c\x00\x00\x01\x61";
        assert_eq!(&buf[..written], &expected[..]);
        assert_eq!(
            written,
            connect_packet_size(&connect, None, &[]).unwrap().packet_size
        );
    }

    #[test]
    fn size_matches_serialized_length() {
        let mut props_buf = [0u8; 16];
        let mut props = PropertyBuilder::for_packet(&mut props_buf, PacketScope::Connect);
        props.add_session_expiry_interval(300).unwrap();
        props.add_receive_maximum(20).unwrap();

        let mut will_props_buf = [0u8; 16];
        let mut will_props = PropertyBuilder::for_packet(&mut will_props_buf, PacketScope::Will);
        will_props.add_will_delay_interval(10).unwrap();

        let will = Will {
            qos: QualityOfService::Level1,
            retain: true,
            topic: "client/offline",
            payload: b"gone",
            properties: will_props.as_bytes(),
        };
        let connect = Connect {
            clean_start: false,
            keep_alive: 30,
            client_id: "device-42",
            username: Some("user"),
            password: Some(b"secret"),
        };

        let size = connect_packet_size(&connect, Some(&will), props.as_bytes()).unwrap();
        let mut buf = vec![0u8; size.packet_size];
        let written =
            serialize_connect(&connect, Some(&will), props.as_bytes(), &mut buf).unwrap();
        assert_eq!(written, size.packet_size);
        assert_eq!(size.packet_size, 2 + size.remaining_length);

        // connect flags: will QoS 1 + will retain + will + username + password
        assert_eq!(buf[9], 0b1110_1100);
    }

    #[test]
    fn undersized_buffer() {
        let connect = minimal("abc");
        let mut buf = [0u8; 8];
        assert!(matches!(
            serialize_connect(&connect, None, &[], &mut buf),
            Err(CodecError::NoMemory { .. })
        ));
    }

    #[test]
    fn empty_will_topic_rejected() {
        let will = Will {
            qos: QualityOfService::Level0,
            retain: false,
            topic: "",
            payload: b"",
            properties: &[],
        };
        assert!(matches!(
            connect_packet_size(&minimal("c"), Some(&will), &[]),
            Err(CodecError::BadParameter(_))
        ));
    }
}
