//! PINGREQ and PINGRESP

use crate::{
    control::ControlType,
    error::{CodecError, Result},
    packet::{check_capacity, PacketInfo, PacketSize},
};

/// A PINGREQ is always two bytes.
pub fn pingreq_packet_size() -> PacketSize {
    PacketSize {
        remaining_length: 0,
        packet_size: 2,
    }
}

pub fn serialize_pingreq(buf: &mut [u8]) -> Result<usize> {
    check_capacity(buf, pingreq_packet_size())?;
    buf[0] = (ControlType::PingRequest as u8) << 4;
    buf[1] = 0;
    Ok(2)
}

pub fn parse_pingresp(info: &PacketInfo<'_>) -> Result<()> {
    info.body(ControlType::PingResponse)?;
    if info.remaining_length != 0 {
        return Err(CodecError::MalformedPacket(
            "pingresp must have no remaining data",
        ));
    }
    Ok(())
}
