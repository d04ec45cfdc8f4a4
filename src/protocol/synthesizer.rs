//! # Packet Synthesizer
//!
//! Builds a packet in a target revision's shape from values that were produced
//! under a different revision's layout.
//!
//! Fields are never assigned on the target directly. They are written through
//! the primitive codec into a scratch [`PacketBuf`], and the target's own
//! native reader then decodes that buffer, exactly as it would decode one that
//! arrived from the network. Getting the translation right reduces to giving
//! the pending fields in the order and types the target layout defines.
//!
//! ## Ordering Guarantee
//! The scratch buffer remembers where each pending field starts and which wire
//! type it was written as. Every typed read the target performs must land on a
//! field boundary of the same type, untyped cursor reads are refused, and any
//! field left unread when the reader returns is reported. A reader that
//! disagrees with the pending list therefore always fails with
//! [`ProtocolError::TypeMismatch`] instead of producing a misaligned packet.

use tracing::{debug, instrument, trace};

use crate::config::CodecConfig;
use crate::core::buffer::{CodecLimits, FieldLayout, PacketBuf};
use crate::core::codec::WireType;
use crate::error::{ProtocolError, Result};
use crate::protocol::pending::{FieldValue, PendingField, PendingFields};

/// A packet that can be read with its revision's native wire layout
pub trait WireDecode: Sized {
    fn decode(buf: &mut PacketBuf) -> Result<Self>;
}

/// A packet that can be written with its revision's native wire layout
pub trait WireEncode {
    fn encode(&self, buf: &mut PacketBuf) -> Result<()>;
}

/// Synthesize with default limits.
pub fn synthesize<T, F>(fields: PendingFields, constructor: F) -> Result<T>
where
    F: FnOnce(&mut PacketBuf) -> Result<T>,
{
    PacketSynthesizer::default().synthesize(fields, constructor)
}

/// Synthesize a [`WireDecode`] packet with default limits.
pub fn synthesize_as<T: WireDecode>(fields: PendingFields) -> Result<T> {
    synthesize(fields, T::decode)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PacketSynthesizer {
    limits: CodecLimits,
    target_version: Option<i32>,
}

impl PacketSynthesizer {
    pub fn new(limits: CodecLimits) -> Self {
        Self {
            limits,
            target_version: None,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.limits())
    }

    /// Tag synthesized packets with the protocol version they target
    pub fn for_version(mut self, version: i32) -> Self {
        self.target_version = Some(version);
        self
    }

    pub fn limits(&self) -> CodecLimits {
        self.limits
    }

    pub fn target_version(&self) -> Option<i32> {
        self.target_version
    }

    /// Write `fields` into a fresh buffer and let `constructor` read it back.
    #[instrument(
        level = "debug",
        skip_all,
        fields(count = fields.len(), target_version = ?self.target_version)
    )]
    pub fn synthesize<T, F>(&self, fields: PendingFields, constructor: F) -> Result<T>
    where
        F: FnOnce(&mut PacketBuf) -> Result<T>,
    {
        let mut buf = self.encode(fields)?;

        let object = constructor(&mut buf).map_err(|e| {
            debug!(error = %e, offset = buf.reader_index(), "Target reader rejected synthesized buffer");
            e
        })?;
        buf.ensure_consumed()?;

        trace!(bytes = buf.writer_index(), "Synthesized packet");
        Ok(object)
    }

    /// Synthesize a [`WireDecode`] packet
    pub fn synthesize_as<T: WireDecode>(&self, fields: PendingFields) -> Result<T> {
        self.synthesize(fields, T::decode)
    }

    /// Serialize `fields` into a rewound buffer carrying their layout.
    pub fn encode(&self, fields: PendingFields) -> Result<PacketBuf> {
        let mut buf = PacketBuf::with_limits(self.limits);
        let mut layout = FieldLayout::default();

        for field in fields {
            layout.push(buf.writer_index(), field.tag());
            write_field(&mut buf, &field)?;
        }

        buf.set_reader_index(0)?;
        buf.attach_layout(layout);
        Ok(buf)
    }
}

fn write_field(buf: &mut PacketBuf, field: &PendingField) -> Result<()> {
    match (field.tag(), field.value()) {
        (WireType::VarInt, FieldValue::I32(v)) => buf.write_var_int(*v),
        (WireType::Int, FieldValue::I32(v)) => buf.write_int(*v),
        (WireType::VarLong, FieldValue::I64(v)) => buf.write_var_long(*v),
        (WireType::Long, FieldValue::I64(v)) => buf.write_long(*v),
        (WireType::UnsignedByte, FieldValue::U8(v)) => buf.write_unsigned_byte(*v),
        (WireType::Byte, FieldValue::I8(v)) => buf.write_byte(*v),
        (WireType::Boolean, FieldValue::Bool(v)) => buf.write_boolean(*v),
        (WireType::Short, FieldValue::I16(v)) => buf.write_short(*v),
        (WireType::Float, FieldValue::F32(v)) => buf.write_float(*v),
        (WireType::Double, FieldValue::F64(v)) => buf.write_double(*v),
        (WireType::String, FieldValue::Str(v)) => buf.write_string(v),
        (WireType::NbtCompoundOrNull, FieldValue::Nbt(v)) => buf.write_nbt_compound(v.as_ref())?,
        (WireType::BitSet, FieldValue::BitSet(v)) => buf.write_bit_set(v),
        (WireType::Identifier, FieldValue::Identifier(v)) => buf.write_identifier(v),
        (WireType::Uuid, FieldValue::Uuid(v)) => buf.write_uuid(*v),
        (tag, value) => {
            return Err(ProtocolError::mismatch(tag.name(), value.native_type()));
        }
    }
    Ok(())
}
