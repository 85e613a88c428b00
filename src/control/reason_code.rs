//! Reason codes
//!
//! One enum per packet type that carries a reason code, all generated from
//! the same mold. Codes 0x80 and above signal failure.

use std::fmt::Display;

use crate::error::CodecError;

macro_rules! reason_codes {
    ($(#[$attr:meta])* $name:ident { $($(#[$vattr:meta])* $variant:ident = $value:literal,)+ }) => {
        $(#[$attr])*
        #[repr(u8)]
        #[derive(Debug, Eq, PartialEq, Copy, Clone)]
        pub enum $name {
            $($(#[$vattr])* $variant = $value,)+
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = CodecError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(CodecError::MalformedPacket("unrecognized reason code")),
                }
            }
        }

        impl $name {
            /// Reason codes 0x80 and above signal failure.
            #[inline]
            pub fn is_error(self) -> bool {
                (self as u8) >= 0x80
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:#04x}", *self as u8)
            }
        }
    };
}

reason_codes! {
    /// Reason code in a `CONNACK` packet
    ConnectReasonCode {
        Success = 0x00,
        UnspecifiedError = 0x80,
        MalformedPacket = 0x81,
        ProtocolError = 0x82,
        ImplementationSpecificError = 0x83,
        UnsupportedProtocolVersion = 0x84,
        ClientIdentifierNotValid = 0x85,
        BadUserNameOrPassword = 0x86,
        NotAuthorized = 0x87,
        ServerUnavailable = 0x88,
        ServerBusy = 0x89,
        Banned = 0x8A,
        BadAuthenticationMethod = 0x8C,
        TopicNameInvalid = 0x90,
        PacketTooLarge = 0x95,
        QuotaExceeded = 0x97,
        PayloadFormatInvalid = 0x99,
        RetainNotSupported = 0x9A,
        QosNotSupported = 0x9B,
        UseAnotherServer = 0x9C,
        ServerMoved = 0x9D,
        ConnectionRateExceeded = 0x9F,
    }
}

reason_codes! {
    /// Reason code in a `PUBACK` or `PUBREC` packet
    PublishAckReasonCode {
        Success = 0x00,
        NoMatchingSubscribers = 0x10,
        UnspecifiedError = 0x80,
        ImplementationSpecificError = 0x83,
        NotAuthorized = 0x87,
        TopicNameInvalid = 0x90,
        PacketIdentifierInUse = 0x91,
        QuotaExceeded = 0x97,
        PayloadFormatInvalid = 0x99,
    }
}

reason_codes! {
    /// Reason code in a `PUBREL` or `PUBCOMP` packet
    PublishCompReasonCode {
        Success = 0x00,
        PacketIdentifierNotFound = 0x92,
    }
}

reason_codes! {
    /// Reason code granted per topic filter in a `SUBACK` packet
    SubscribeAckReasonCode {
        GrantedQos0 = 0x00,
        GrantedQos1 = 0x01,
        GrantedQos2 = 0x02,
        UnspecifiedError = 0x80,
        ImplementationSpecificError = 0x83,
        NotAuthorized = 0x87,
        TopicFilterInvalid = 0x8F,
        PacketIdentifierInUse = 0x91,
        QuotaExceeded = 0x97,
        SharedSubscriptionsNotSupported = 0x9E,
        SubscriptionIdentifiersNotSupported = 0xA1,
        WildcardSubscriptionsNotSupported = 0xA2,
    }
}

reason_codes! {
    /// Reason code per topic filter in an `UNSUBACK` packet
    UnsubscribeAckReasonCode {
        Success = 0x00,
        NoSubscriptionExisted = 0x11,
        UnspecifiedError = 0x80,
        ImplementationSpecificError = 0x83,
        NotAuthorized = 0x87,
        TopicFilterInvalid = 0x8F,
        PacketIdentifierInUse = 0x91,
    }
}

reason_codes! {
    /// Reason code in a `DISCONNECT` packet
    DisconnectReasonCode {
        NormalDisconnection = 0x00,
        DisconnectWithWillMessage = 0x04,
        UnspecifiedError = 0x80,
        MalformedPacket = 0x81,
        ProtocolError = 0x82,
        ImplementationSpecificError = 0x83,
        NotAuthorized = 0x87,
        ServerBusy = 0x89,
        ServerShuttingDown = 0x8B,
        BadAuthenticationMethod = 0x8C,
        KeepAliveTimeout = 0x8D,
        SessionTakenOver = 0x8E,
        TopicFilterInvalid = 0x8F,
        TopicNameInvalid = 0x90,
        ReceiveMaximumExceeded = 0x93,
        TopicAliasInvalid = 0x94,
        PacketTooLarge = 0x95,
        MessageRateTooHigh = 0x96,
        QuotaExceeded = 0x97,
        AdministrativeAction = 0x98,
        PayloadFormatInvalid = 0x99,
        RetainNotSupported = 0x9A,
        QosNotSupported = 0x9B,
        UseAnotherServer = 0x9C,
        ServerMoved = 0x9D,
        SharedSubscriptionsNotSupported = 0x9E,
        ConnectionRateExceeded = 0x9F,
        MaximumConnectTime = 0xA0,
        SubscriptionIdentifiersNotSupported = 0xA1,
        WildcardSubscriptionsNotSupported = 0xA2,
    }
}

reason_codes! {
    /// Reason code in an `AUTH` packet
    AuthReasonCode {
        Success = 0x00,
        ContinueAuthentication = 0x18,
        ReAuthenticate = 0x19,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_round_trip() {
        assert_eq!(u8::from(ConnectReasonCode::Banned), 0x8A);
        assert_eq!(
            ConnectReasonCode::try_from(0x8A).unwrap(),
            ConnectReasonCode::Banned
        );
        assert!(ConnectReasonCode::try_from(0x01).is_err());
        assert!(SubscribeAckReasonCode::try_from(0x03).is_err());
        assert_eq!(
            SubscribeAckReasonCode::try_from(0x02).unwrap(),
            SubscribeAckReasonCode::GrantedQos2
        );
    }

    #[test]
    fn error_threshold() {
        assert!(!PublishAckReasonCode::NoMatchingSubscribers.is_error());
        assert!(PublishAckReasonCode::UnspecifiedError.is_error());
        assert!(!DisconnectReasonCode::DisconnectWithWillMessage.is_error());
        assert!(DisconnectReasonCode::ServerShuttingDown.is_error());
    }
}
