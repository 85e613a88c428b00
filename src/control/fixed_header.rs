//! Incoming fixed-header framing
//!
//! Two ways to find out what the next packet is: pull the header byte by
//! byte through a receive callback, or scan a receive buffer that is being
//! filled elsewhere. Both validate the type byte against the set of packets
//! a client may receive and decode the Remaining Length.

use std::{fmt::Display, io};

use crate::{
    common::cursor::var_int_len,
    control::packet_type::{ControlType, PacketType},
    error::{CodecError, Result},
};

/// Fixed header of an incoming packet.
///
/// `header_length` is how many bytes from the start of the packet the
/// header occupies; the Remaining Length counts the bytes after it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct IncomingHeader {
    pub packet_type: PacketType,
    pub remaining_length: usize,
    pub header_length: usize,
}

impl Display for IncomingHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{packet_type: {}, remaining_length: {}}}",
            self.packet_type, self.remaining_length
        )
    }
}

fn parse_incoming_type(byte: u8) -> Result<PacketType> {
    let packet_type = PacketType::try_from(byte)?;
    if !packet_type.control_type().valid_incoming() {
        log::error!("rejecting server-bound packet type {packet_type}");
        return Err(CodecError::MalformedPacket(
            "packet type is not valid for a client",
        ));
    }
    Ok(packet_type)
}

/// Pulls one packet header through `recv`.
///
/// `recv` reads up to `buf.len()` bytes into `buf` and returns how many it
/// read; `Ok(0)` means no data is available right now. If the very first
/// read returns zero this returns `Ok(None)` and nothing has been consumed;
/// a zero read after that leaves the stream mid-header and is reported as
/// [`CodecError::RecvFailed`].
pub fn read_incoming_header<F>(mut recv: F) -> Result<Option<IncomingHeader>>
where
    F: FnMut(&mut [u8]) -> io::Result<usize>,
{
    let mut byte = [0u8; 1];
    if recv(&mut byte).map_err(CodecError::RecvFailed)? == 0 {
        return Ok(None);
    }
    let packet_type = parse_incoming_type(byte[0])?;

    // Remaining Length arrives one byte at a time; the high bit of each
    // byte says whether another follows.
    let mut value = 0u32;
    for i in 0..4 {
        if recv(&mut byte).map_err(CodecError::RecvFailed)? == 0 {
            return Err(CodecError::RecvFailed(io::Error::from(
                io::ErrorKind::UnexpectedEof,
            )));
        }
        value |= (u32::from(byte[0]) & 0x7F) << (7 * i);
        if byte[0] & 0x80 == 0 {
            if i + 1 != var_int_len(value) {
                return Err(CodecError::MalformedPacket(
                    "non-minimal variable byte integer",
                ));
            }
            return Ok(Some(IncomingHeader {
                packet_type,
                remaining_length: value as usize,
                header_length: 2 + i,
            }));
        }
    }
    Err(CodecError::MalformedPacket(
        "variable byte integer exceeds four bytes",
    ))
}

/// Scans a partially filled receive buffer for one packet header.
///
/// `write_index` is how many bytes of `buf` hold received data. Returns
/// `Ok(None)` until the buffer contains the complete header; once it does,
/// further calls with a larger `write_index` keep returning the same
/// header.
pub fn scan_incoming_header(buf: &[u8], write_index: usize) -> Result<Option<IncomingHeader>> {
    let filled = buf
        .get(..write_index)
        .ok_or(CodecError::BadParameter("write index exceeds buffer length"))?;
    let Some((&type_byte, rest)) = filled.split_first() else {
        return Ok(None);
    };
    let packet_type = parse_incoming_type(type_byte)?;

    let mut value = 0u32;
    let mut bytes = rest.iter();
    for i in 0..4 {
        let Some(&byte) = bytes.next() else {
            return Ok(None);
        };
        value |= (u32::from(byte) & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            if i + 1 != var_int_len(value) {
                return Err(CodecError::MalformedPacket(
                    "non-minimal variable byte integer",
                ));
            }
            return Ok(Some(IncomingHeader {
                packet_type,
                remaining_length: value as usize,
                header_length: 2 + i,
            }));
        }
    }
    Err(CodecError::MalformedPacket(
        "variable byte integer exceeds four bytes",
    ))
}

/// Updates the DUP flag on an already serialized PUBLISH first byte, so a
/// retransmit path does not have to rebuild the whole packet.
pub fn set_publish_dup_flag(header: &mut [u8], dup: bool) -> Result<()> {
    let first = header
        .first_mut()
        .ok_or(CodecError::BadParameter("header must not be empty"))?;
    if *first >> 4 != ControlType::Publish as u8 {
        return Err(CodecError::BadParameter("not a publish header"));
    }
    if dup {
        *first |= 1 << 3;
    } else {
        *first &= !(1 << 3);
    }
    Ok(())
}
