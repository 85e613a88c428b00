//! SUBSCRIBE

use std::num::NonZeroU16;

use crate::{
    common::{ByteWriter, QualityOfService},
    control::{ControlType, PacketType},
    error::{CodecError, Result},
    packet::{
        check_capacity, property_block_len, write_fixed_header, write_property_block, PacketSize,
    },
};

/// What the server should do with retained messages on a new
/// subscription.
#[repr(u8)]
#[derive(Debug, Eq, PartialEq, Clone, Copy, Default)]
pub enum RetainHandling {
    #[default]
    SendAtSubscribe = 0,
    SendAtSubscribeIfNotExist = 1,
    DoNotSend = 2,
}

/// Per-subscription options byte.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct SubscribeOptions {
    pub qos: QualityOfService,
    /// Do not echo messages this client published itself.
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            qos: QualityOfService::Level0,
            no_local: false,
            retain_as_published: false,
            retain_handling: RetainHandling::SendAtSubscribe,
        }
    }
}

impl From<SubscribeOptions> for u8 {
    fn from(value: SubscribeOptions) -> Self {
        let mut byte = value.qos as u8;
        if value.no_local {
            byte |= 0b100;
        }
        if value.retain_as_published {
            byte |= 0b1000;
        }
        byte |= (value.retain_handling as u8) << 4;
        byte
    }
}

/// One entry of the SUBSCRIBE payload.
#[derive(Debug, Clone, Copy)]
pub struct Subscription<'a> {
    pub filter: &'a str,
    pub options: SubscribeOptions,
}

fn validate(subscriptions: &[Subscription<'_>]) -> Result<()> {
    if subscriptions.is_empty() {
        return Err(CodecError::BadParameter(
            "subscription list must not be empty",
        ));
    }
    for subscription in subscriptions {
        if subscription.filter.is_empty() {
            return Err(CodecError::BadParameter("topic filter must not be empty"));
        }
        if subscription.filter.len() > u16::MAX as usize {
            return Err(CodecError::BadParameter("topic filter exceeds 65535 bytes"));
        }
    }
    Ok(())
}

pub fn subscribe_packet_size(
    subscriptions: &[Subscription<'_>],
    properties: &[u8],
) -> Result<PacketSize> {
    validate(subscriptions)?;
    let mut remaining = 2 + property_block_len(properties);
    for subscription in subscriptions {
        remaining += 2 + subscription.filter.len() + 1;
    }
    PacketSize::from_remaining(remaining)
}

pub fn serialize_subscribe(
    packet_id: NonZeroU16,
    subscriptions: &[Subscription<'_>],
    properties: &[u8],
    buf: &mut [u8],
) -> Result<usize> {
    let size = subscribe_packet_size(subscriptions, properties)?;
    check_capacity(buf, size)?;

    let mut writer = ByteWriter::new(buf);
    write_fixed_header(
        &mut writer,
        PacketType::with_default(ControlType::Subscribe).into(),
        size.remaining_length,
    )?;
    writer.write_u16(packet_id.get())?;
    write_property_block(&mut writer, properties)?;
    for subscription in subscriptions {
        writer.write_utf8(subscription.filter)?;
        writer.write_u8(subscription.options.into())?;
    }
    Ok(writer.position())
}
