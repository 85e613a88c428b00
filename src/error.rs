//! Codec status codes

use std::io;

/// Every fallible codec operation returns one of these.
///
/// The variants fall into three groups: caller bugs ([`BadParameter`],
/// [`NoMemory`]) leave the library reusable; peer errors
/// ([`MalformedPacket`], [`ServerRefused`]) poison the connection and the
/// caller is expected to close it; transport errors ([`SendFailed`],
/// [`RecvFailed`]) are surfaced verbatim from the caller's transport.
///
/// [`BadParameter`]: CodecError::BadParameter
/// [`NoMemory`]: CodecError::NoMemory
/// [`MalformedPacket`]: CodecError::MalformedPacket
/// [`ServerRefused`]: CodecError::ServerRefused
/// [`SendFailed`]: CodecError::SendFailed
/// [`RecvFailed`]: CodecError::RecvFailed
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A caller-supplied value violates the packet rules. Nothing was
    /// written.
    #[error("bad parameter: {0}")]
    BadParameter(&'static str),

    /// The caller-supplied buffer cannot hold the encoded bytes.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    NoMemory { needed: usize, available: usize },

    /// The peer violated the MQTT 5.0 wire format.
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    /// The server rejected the request with the given reason code.
    #[error("server refused: reason code {0:#04x}")]
    ServerRefused(u8),

    /// Transport send failure. Never produced by the codec itself; the
    /// variant exists so the caller's session layer can speak the same
    /// error type.
    #[error("transport send failed")]
    SendFailed(#[source] io::Error),

    /// The receive callback failed, or returned a short read in the middle
    /// of a packet header.
    #[error("transport receive failed")]
    RecvFailed(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
