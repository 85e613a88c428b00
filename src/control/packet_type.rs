//! Packet types

use std::fmt::Display;

use crate::error::CodecError;

/// Defined control types, the high nibble of a packet's first byte.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ControlType {
    /// Client request to connect to Server
    Connect = 1,
    /// Connect acknowledgment
    ConnectAcknowledgement = 2,
    /// Publish message
    Publish = 3,
    /// Publish acknowledgment
    PublishAcknowledgement = 4,
    /// Publish received (assured delivery part 1)
    PublishReceived = 5,
    /// Publish release (assured delivery part 2)
    PublishRelease = 6,
    /// Publish complete (assured delivery part 3)
    PublishComplete = 7,
    /// Client subscribe request
    Subscribe = 8,
    /// Subscribe acknowledgment
    SubscribeAcknowledgement = 9,
    /// Unsubscribe request
    Unsubscribe = 10,
    /// Unsubscribe acknowledgment
    UnsubscribeAcknowledgement = 11,
    /// PING request
    PingRequest = 12,
    /// PING response
    PingResponse = 13,
    /// Connection is closing
    Disconnect = 14,
    /// Authentication exchange
    Auth = 15,
}

impl ControlType {
    /// Flag nibble every packet of this type must carry, PUBLISH excepted.
    #[inline]
    pub(crate) fn default_flags(self) -> u8 {
        match self {
            ControlType::PublishRelease | ControlType::Subscribe | ControlType::Unsubscribe => {
                0b0010
            }
            _ => 0,
        }
    }

    /// Whether a client may receive this packet type at all.
    pub(crate) fn valid_incoming(self) -> bool {
        !matches!(
            self,
            ControlType::Connect
                | ControlType::Subscribe
                | ControlType::Unsubscribe
                | ControlType::PingRequest
        )
    }

    fn from_nibble(value: u8) -> Option<Self> {
        let typ = match value {
            1 => ControlType::Connect,
            2 => ControlType::ConnectAcknowledgement,
            3 => ControlType::Publish,
            4 => ControlType::PublishAcknowledgement,
            5 => ControlType::PublishReceived,
            6 => ControlType::PublishRelease,
            7 => ControlType::PublishComplete,
            8 => ControlType::Subscribe,
            9 => ControlType::SubscribeAcknowledgement,
            10 => ControlType::Unsubscribe,
            11 => ControlType::UnsubscribeAcknowledgement,
            12 => ControlType::PingRequest,
            13 => ControlType::PingResponse,
            14 => ControlType::Disconnect,
            15 => ControlType::Auth,
            _ => return None,
        };
        Some(typ)
    }
}

/// A packet's first byte: control type in the high nibble, flags in the
/// low. Construction validates the flag nibble, so a value of this type
/// always describes a well-formed first byte.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct PacketType {
    control_type: ControlType,
    flags: u8,
}

impl PacketType {
    /// Packet type with the mandatory flag nibble for its control type.
    #[inline]
    pub fn with_default(control_type: ControlType) -> Self {
        Self {
            control_type,
            flags: control_type.default_flags(),
        }
    }

    #[inline]
    pub fn control_type(self) -> ControlType {
        self.control_type
    }

    #[inline]
    pub fn flags(self) -> u8 {
        self.flags
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        (value.control_type as u8) << 4 | value.flags
    }
}

impl TryFrom<u8> for PacketType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let control_type = ControlType::from_nibble(value >> 4)
            .ok_or(CodecError::MalformedPacket("reserved packet type"))?;
        let flags = value & 0x0F;

        let flags_ok = match control_type {
            ControlType::Publish => (flags & 0b0110) >> 1 <= 2,
            _ => flags == control_type.default_flags(),
        };
        if !flags_ok {
            return Err(CodecError::MalformedPacket("invalid fixed header flags"));
        }
        Ok(Self { control_type, flags })
    }
}

impl Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.control_type {
            ControlType::Connect => write!(f, "CONNECT"),
            ControlType::ConnectAcknowledgement => write!(f, "CONNACK"),
            ControlType::Publish => write!(f, "PUBLISH"),
            ControlType::PublishAcknowledgement => write!(f, "PUBACK"),
            ControlType::PublishReceived => write!(f, "PUBREC"),
            ControlType::PublishRelease => write!(f, "PUBREL"),
            ControlType::PublishComplete => write!(f, "PUBCOMP"),
            ControlType::Subscribe => write!(f, "SUBSCRIBE"),
            ControlType::SubscribeAcknowledgement => write!(f, "SUBACK"),
            ControlType::Unsubscribe => write!(f, "UNSUBSCRIBE"),
            ControlType::UnsubscribeAcknowledgement => write!(f, "UNSUBACK"),
            ControlType::PingRequest => write!(f, "PINGREQ"),
            ControlType::PingResponse => write!(f, "PINGRESP"),
            ControlType::Disconnect => write!(f, "DISCONNECT"),
            ControlType::Auth => write!(f, "AUTH"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_byte_round_trip() {
        let packet_type = PacketType::with_default(ControlType::PublishRelease);
        assert_eq!(u8::from(packet_type), 0x62);
        assert_eq!(PacketType::try_from(0x62).unwrap(), packet_type);
    }

    #[test]
    fn reserved_type_rejected() {
        assert!(matches!(
            PacketType::try_from(0x0F),
            Err(CodecError::MalformedPacket(_))
        ));
    }

    #[test]
    fn bad_flag_nibble_rejected() {
        // PUBREL requires flags 0b0010
        assert!(PacketType::try_from(0x60).is_err());
        // SUBACK requires flags 0
        assert!(PacketType::try_from(0x91).is_err());
        // PUBLISH QoS 3
        assert!(PacketType::try_from(0x36).is_err());
    }

    #[test]
    fn publish_flags_pass_through() {
        let packet_type = PacketType::try_from(0x3D).unwrap();
        assert_eq!(packet_type.control_type(), ControlType::Publish);
        assert_eq!(packet_type.flags(), 0x0D);
    }
}
