//! # Pending Fields
//!
//! Ordered list of typed values staged for serialization in a target
//! revision's wire order.
//!
//! Each entry pairs a [`WireType`] with a [`FieldValue`] whose native type must
//! match the tag. The list only grows; [`PendingFields::commit`] consumes it,
//! so nothing can be appended after it was handed to the synthesizer.
//!
//! ```rust
//! use packet_bridge::core::buffer::PacketBuf;
//! use packet_bridge::core::codec::WireType;
//! use packet_bridge::protocol::pending::PendingFields;
//!
//! # fn main() -> packet_bridge::error::Result<()> {
//! let mut fields = PendingFields::new();
//! fields.push(WireType::VarInt, 42i32)?;
//! fields.push(WireType::UnsignedByte, 255u8)?;
//!
//! let (id, end) = fields.commit(|buf: &mut PacketBuf| {
//!     Ok((buf.read_var_int()?, buf.read_unsigned_byte()?))
//! })?;
//! assert_eq!((id, end), (42, 255));
//! # Ok(())
//! # }
//! ```

use crate::core::bitset::BitSet;
use crate::core::buffer::PacketBuf;
use crate::core::codec::{Identifier, WireType};
use crate::core::nbt::NbtCompound;
use crate::error::{ProtocolError, Result};
use crate::protocol::synthesizer;

/// Native value carried by a pending field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I32(i32),
    I64(i64),
    U8(u8),
    I8(i8),
    Bool(bool),
    I16(i16),
    F32(f32),
    F64(f64),
    Str(String),
    Nbt(Option<NbtCompound>),
    BitSet(BitSet),
    Identifier(Identifier),
    Uuid(u128),
}

impl FieldValue {
    /// Name of the native type, used in mismatch reports
    pub fn native_type(&self) -> &'static str {
        match self {
            FieldValue::I32(_) => "i32",
            FieldValue::I64(_) => "i64",
            FieldValue::U8(_) => "u8",
            FieldValue::I8(_) => "i8",
            FieldValue::Bool(_) => "bool",
            FieldValue::I16(_) => "i16",
            FieldValue::F32(_) => "f32",
            FieldValue::F64(_) => "f64",
            FieldValue::Str(_) => "String",
            FieldValue::Nbt(_) => "Option<NbtCompound>",
            FieldValue::BitSet(_) => "BitSet",
            FieldValue::Identifier(_) => "Identifier",
            FieldValue::Uuid(_) => "u128",
        }
    }

    /// Whether this value can be encoded as `tag`
    pub fn fits(&self, tag: WireType) -> bool {
        matches!(
            (tag, self),
            (WireType::VarInt | WireType::Int, FieldValue::I32(_))
                | (WireType::VarLong | WireType::Long, FieldValue::I64(_))
                | (WireType::UnsignedByte, FieldValue::U8(_))
                | (WireType::Byte, FieldValue::I8(_))
                | (WireType::Boolean, FieldValue::Bool(_))
                | (WireType::Short, FieldValue::I16(_))
                | (WireType::Float, FieldValue::F32(_))
                | (WireType::Double, FieldValue::F64(_))
                | (WireType::String, FieldValue::Str(_))
                | (WireType::NbtCompoundOrNull, FieldValue::Nbt(_))
                | (WireType::BitSet, FieldValue::BitSet(_))
                | (WireType::Identifier, FieldValue::Identifier(_))
                | (WireType::Uuid, FieldValue::Uuid(_))
        )
    }
}

macro_rules! field_value_from {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$native> for FieldValue {
                fn from(value: $native) -> Self {
                    FieldValue::$variant(value)
                }
            }
        )*
    };
}

field_value_from! {
    i32 => I32,
    i64 => I64,
    u8 => U8,
    i8 => I8,
    bool => Bool,
    i16 => I16,
    f32 => F32,
    f64 => F64,
    String => Str,
    Option<NbtCompound> => Nbt,
    BitSet => BitSet,
    Identifier => Identifier,
    u128 => Uuid,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<NbtCompound> for FieldValue {
    fn from(value: NbtCompound) -> Self {
        FieldValue::Nbt(Some(value))
    }
}

/// A value together with the wire type it will be written as
#[derive(Debug, Clone, PartialEq)]
pub struct PendingField {
    tag: WireType,
    value: FieldValue,
}

impl PendingField {
    /// Pair `value` with `tag`, failing if the native type does not match
    pub fn new(tag: WireType, value: impl Into<FieldValue>) -> Result<Self> {
        let value = value.into();
        if !value.fits(tag) {
            return Err(ProtocolError::mismatch(tag.name(), value.native_type()));
        }
        Ok(Self { tag, value })
    }

    pub fn tag(&self) -> WireType {
        self.tag
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// Append-only list of pending fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingFields {
    fields: Vec<PendingField>,
}

impl PendingFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a value to be written as `tag`
    pub fn push(&mut self, tag: WireType, value: impl Into<FieldValue>) -> Result<&mut Self> {
        self.fields.push(PendingField::new(tag, value)?);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingField> {
        self.fields.iter()
    }

    /// Wire types in list order
    pub fn tags(&self) -> Vec<WireType> {
        self.fields.iter().map(PendingField::tag).collect()
    }

    /// Hand the list to the synthesizer and build a target object from it
    pub fn commit<T, F>(self, constructor: F) -> Result<T>
    where
        F: FnOnce(&mut PacketBuf) -> Result<T>,
    {
        synthesizer::synthesize(self, constructor)
    }
}

impl IntoIterator for PendingFields {
    type Item = PendingField;
    type IntoIter = std::vec::IntoIter<PendingField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_push_matching_types() {
        let mut fields = PendingFields::new();
        fields
            .push(WireType::VarInt, 1i32)
            .unwrap()
            .push(WireType::VarLong, 2i64)
            .unwrap()
            .push(WireType::String, "hi")
            .unwrap()
            .push(WireType::NbtCompoundOrNull, None::<NbtCompound>)
            .unwrap()
            .push(WireType::BitSet, BitSet::new())
            .unwrap()
            .push(WireType::Uuid, 7u128)
            .unwrap();

        assert_eq!(fields.len(), 6);
        assert_eq!(
            fields.tags(),
            vec![
                WireType::VarInt,
                WireType::VarLong,
                WireType::String,
                WireType::NbtCompoundOrNull,
                WireType::BitSet,
                WireType::Uuid
            ]
        );
    }

    #[test]
    fn test_push_mismatch_is_rejected() {
        let mut fields = PendingFields::new();
        let err = fields.push(WireType::VarInt, 5i64).unwrap_err();
        match err {
            ProtocolError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "VarInt");
                assert_eq!(found, "i64");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fields.is_empty());

        assert!(fields.push(WireType::UnsignedByte, 1i8).is_err());
        assert!(fields.push(WireType::Byte, 1u8).is_err());
        assert!(fields.push(WireType::String, 1i32).is_err());
        assert!(fields.is_empty());
    }

    #[test]
    fn test_int_and_var_int_share_native_type() {
        assert!(FieldValue::I32(0).fits(WireType::VarInt));
        assert!(FieldValue::I32(0).fits(WireType::Int));
        assert!(!FieldValue::I32(0).fits(WireType::VarLong));
    }
}
