//! UNSUBSCRIBE

use std::num::NonZeroU16;

use crate::{
    common::ByteWriter,
    control::{ControlType, PacketType},
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketSize,
    },
};

fn validate(filters: &[&str]) -> Result<()> {
    if filters.is_empty() {
        return Err(CodecError::BadParameter("filter list must not be empty"));
    }
    for filter in filters {
        if filter.is_empty() {
            return Err(CodecError::BadParameter("topic filter must not be empty"));
        }
        if filter.len() > u16::MAX as usize {
            return Err(CodecError::BadParameter("topic filter exceeds 65535 bytes"));
        }
    }
    Ok(())
}

pub fn unsubscribe_packet_size(filters: &[&str], properties: &[u8]) -> Result<PacketSize> {
    validate(filters)?;
    let mut remaining = 2 + property_block_len(properties);
    for filter in filters {
        remaining += 2 + filter.len();
    }
    PacketSize::from_remaining(remaining)
}

pub fn serialize_unsubscribe(
    packet_id: NonZeroU16,
    filters: &[&str],
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = unsubscribe_packet_size(filters, properties)?;
    check_capacity(buf, size)?;

    let mut writer = ByteWriter::new(buf);
    write_fixed_header(
        &mut writer,
        PacketType::with_default(ControlType::Unsubscribe).into(),
        size.remaining_length,
    )?;
    writer.write_u16(packet_id.get())?;
    write_property_block(&mut writer, properties)?;
    for filter in filters {
        writer.write_utf8(filter)?;
    }
    Ok(writer.position())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_hex() {
        let mut buf = [0u8; 32];
        let written = serialize_unsubscribe(
            NonZeroU16::new(9).unwrap(),
            &["a/b", "c"],
            &[],
            &mut buf,
        )
        .unwrap();
        assert_eq!(&buf[..written], b"\xa2\x0b\x00\x09\x00\x00\x03a/b\x00\x01c");
        assert_eq!(
            written,
            unsubscribe_packet_size(&["a/b", "c"], &[]).unwrap().packet_size
        );
    }

    #[test]
    fn empty_inputs_rejected() {
        assert!(unsubscribe_packet_size(&[], &[]).is_err());
        assert!(unsubscribe_packet_size(&[""], &[]).is_err());
    }
}
