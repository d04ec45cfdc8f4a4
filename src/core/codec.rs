//! # Primitive Codec
//!
//! Read and write operations for every wire type of the protocol, as methods on
//! [`PacketBuf`].
//!
//! ## Wire Types
//! ```text
//! VarInt        1-5 bytes, 7 data bits + continuation bit per byte
//! VarLong       1-10 bytes, same scheme over 64 bits
//! String        VarInt byte length, then raw UTF-8
//! NbtCompound   0x00 when absent, otherwise a named-root NBT compound
//! BitSet        VarInt word count, then big-endian u64 words
//! Boolean       1 byte, nonzero is true
//! Byte          1 byte, signed
//! UnsignedByte  1 byte
//! Short/Int/Long/Float/Double   big-endian, 2/4/8/4/8 bytes
//! Identifier    String namespace, String path
//! Uuid          two big-endian i64, most significant first
//! ```
//!
//! Every public `read_*` method is a typed read: on a buffer built by the
//! synthesizer it first checks that the next pending field has the same
//! [`WireType`]. Writes never check anything.
//!
//! ## Security
//! - String lengths are bounded twice: the raw byte length before any bytes
//!   are touched, and the decoded length afterwards
//! - BitSet word counts are checked against the readable bytes before
//!   allocating
//! - NBT trees are parsed against an allocation quota and a depth limit

use bytes::BufMut;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use crate::core::bitset::BitSet;
use crate::core::buffer::PacketBuf;
use crate::core::nbt::{self, NbtCompound};
use crate::error::{ProtocolError, Result};

/// Namespace assumed when an identifier is parsed without one
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Closed set of wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    VarInt,
    VarLong,
    UnsignedByte,
    Byte,
    String,
    NbtCompoundOrNull,
    BitSet,
    Boolean,
    Short,
    Int,
    Long,
    Float,
    Double,
    Identifier,
    Uuid,
}

impl WireType {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            WireType::VarInt => "VarInt",
            WireType::VarLong => "VarLong",
            WireType::UnsignedByte => "UnsignedByte",
            WireType::Byte => "Byte",
            WireType::String => "String",
            WireType::NbtCompoundOrNull => "NbtCompoundOrNull",
            WireType::BitSet => "BitSet",
            WireType::Boolean => "Boolean",
            WireType::Short => "Short",
            WireType::Int => "Int",
            WireType::Long => "Long",
            WireType::Float => "Float",
            WireType::Double => "Double",
            WireType::Identifier => "Identifier",
            WireType::Uuid => "Uuid",
        }
    }

    /// Encoded width for fixed-width types, `None` for variable-length ones
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            WireType::Boolean | WireType::Byte | WireType::UnsignedByte => Some(1),
            WireType::Short => Some(2),
            WireType::Int | WireType::Float => Some(4),
            WireType::Long | WireType::Double => Some(8),
            WireType::Uuid => Some(16),
            WireType::VarInt
            | WireType::VarLong
            | WireType::String
            | WireType::NbtCompoundOrNull
            | WireType::BitSet
            | WireType::Identifier => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Namespaced resource identifier, e.g. `minecraft:stone`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub namespace: String,
    pub path: String,
}

impl Identifier {
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for Identifier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.split_once(':') {
            Some((namespace, path)) if !namespace.is_empty() => Identifier::new(namespace, path),
            Some((_, path)) => Identifier::new(DEFAULT_NAMESPACE, path),
            None => Identifier::new(DEFAULT_NAMESPACE, s),
        })
    }
}

/// Number of bytes `value` takes as a VarInt
pub fn var_int_size(value: i32) -> usize {
    let mut value = value as u32;
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

impl PacketBuf {
    // ------------------------------------------------------------------
    // Variable-length integers
    // ------------------------------------------------------------------

    pub fn read_var_int(&mut self) -> Result<i32> {
        self.expect_field(WireType::VarInt)?;
        self.decode_var_int()
    }

    pub(crate) fn decode_var_int(&mut self) -> Result<i32> {
        let mut result: u32 = 0;
        let mut shift = 0;
        loop {
            if shift >= 32 {
                return Err(ProtocolError::MalformedVarInt);
            }
            let byte = self.take_u8()?;
            result |= ((byte & 0x7f) as u32) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(result as i32);
            }
        }
    }

    pub fn write_var_int(&mut self, value: i32) {
        let mut value = value as u32;
        loop {
            let bits = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.write_u8(bits);
                return;
            }
            self.write_u8(bits | 0x80);
        }
    }

    pub fn read_var_long(&mut self) -> Result<i64> {
        self.expect_field(WireType::VarLong)?;
        self.decode_var_long()
    }

    fn decode_var_long(&mut self) -> Result<i64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            if shift >= 64 {
                return Err(ProtocolError::MalformedVarLong);
            }
            let byte = self.take_u8()?;
            result |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(result as i64);
            }
        }
    }

    pub fn write_var_long(&mut self, value: i64) {
        let mut value = value as u64;
        loop {
            let bits = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.write_u8(bits);
                return;
            }
            self.write_u8(bits | 0x80);
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Read a string bounded by the buffer's configured maximum length
    pub fn read_string(&mut self) -> Result<String> {
        let max = self.limits().max_string_length;
        self.read_string_bounded(max)
    }

    /// Read a string of at most `max_length` UTF-16 units
    pub fn read_string_bounded(&mut self, max_length: usize) -> Result<String> {
        self.expect_field(WireType::String)?;
        self.decode_string(max_length)
    }

    fn decode_string(&mut self, max_length: usize) -> Result<String> {
        let length = self.decode_var_int()?;
        let max_bytes = max_length.saturating_mul(4);
        if length < 0 || length as usize > max_bytes {
            trace!(length, max_bytes, "rejecting string before decode");
            return Err(ProtocolError::StringTooLong {
                length: length as i64,
                max: max_bytes,
            });
        }

        let raw = self.take(length as usize)?;
        let value = String::from_utf8_lossy(raw).into_owned();
        let units = value.encode_utf16().count();
        if units > max_length {
            return Err(ProtocolError::StringTooLong {
                length: units as i64,
                max: max_length,
            });
        }
        Ok(value)
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_var_int(value.len() as i32);
        self.write_bytes(value.as_bytes());
    }

    // ------------------------------------------------------------------
    // NBT
    // ------------------------------------------------------------------

    /// Read a compound, or `None` when the next byte is the empty tag
    pub fn read_nbt_compound(&mut self) -> Result<Option<NbtCompound>> {
        self.expect_field(WireType::NbtCompoundOrNull)?;
        self.decode_nbt_compound()
    }

    fn decode_nbt_compound(&mut self) -> Result<Option<NbtCompound>> {
        if self.peek_byte()? == nbt::TAG_END {
            self.advance(1)?;
            return Ok(None);
        }
        let limits = self.limits();
        nbt::read_root(self, limits.nbt_max_bytes, limits.nbt_max_depth).map(Some)
    }

    pub fn write_nbt_compound(&mut self, value: Option<&NbtCompound>) -> Result<()> {
        match value {
            None => {
                self.write_u8(nbt::TAG_END);
                Ok(())
            }
            Some(compound) => nbt::write_root(self, compound),
        }
    }

    // ------------------------------------------------------------------
    // Bit sets
    // ------------------------------------------------------------------

    pub fn read_bit_set(&mut self) -> Result<BitSet> {
        self.expect_field(WireType::BitSet)?;
        self.decode_bit_set()
    }

    fn decode_bit_set(&mut self) -> Result<BitSet> {
        let length = self.decode_var_int()?;
        let max = self.readable_bytes() / 8;
        if length < 0 || length as usize > max {
            return Err(ProtocolError::BitSetTooLong {
                declared: length,
                max,
            });
        }

        let mut words = Vec::with_capacity(length as usize);
        for _ in 0..length {
            words.push(u64::from_be_bytes(self.take_array()?));
        }
        Ok(BitSet::from_words(words))
    }

    pub fn write_bit_set(&mut self, value: &BitSet) {
        let words = value.to_words();
        self.write_var_int(words.len() as i32);
        for word in words {
            self.storage_mut().put_u64(*word);
        }
    }

    // ------------------------------------------------------------------
    // Fixed-width scalars
    // ------------------------------------------------------------------

    pub fn read_boolean(&mut self) -> Result<bool> {
        self.expect_field(WireType::Boolean)?;
        Ok(self.take_u8()? != 0)
    }

    pub fn write_boolean(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn read_byte(&mut self) -> Result<i8> {
        self.expect_field(WireType::Byte)?;
        Ok(self.take_u8()? as i8)
    }

    pub fn write_byte(&mut self, value: i8) {
        self.write_u8(value as u8);
    }

    pub fn read_unsigned_byte(&mut self) -> Result<u8> {
        self.expect_field(WireType::UnsignedByte)?;
        self.take_u8()
    }

    pub fn write_unsigned_byte(&mut self, value: u8) {
        self.write_u8(value);
    }

    pub fn read_short(&mut self) -> Result<i16> {
        self.expect_field(WireType::Short)?;
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn write_short(&mut self, value: i16) {
        self.storage_mut().put_i16(value);
    }

    pub fn read_int(&mut self) -> Result<i32> {
        self.expect_field(WireType::Int)?;
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn write_int(&mut self, value: i32) {
        self.storage_mut().put_i32(value);
    }

    pub fn read_long(&mut self) -> Result<i64> {
        self.expect_field(WireType::Long)?;
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn write_long(&mut self, value: i64) {
        self.storage_mut().put_i64(value);
    }

    pub fn read_float(&mut self) -> Result<f32> {
        self.expect_field(WireType::Float)?;
        Ok(f32::from_be_bytes(self.take_array()?))
    }

    pub fn write_float(&mut self, value: f32) {
        self.storage_mut().put_f32(value);
    }

    pub fn read_double(&mut self) -> Result<f64> {
        self.expect_field(WireType::Double)?;
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    pub fn write_double(&mut self, value: f64) {
        self.storage_mut().put_f64(value);
    }

    // ------------------------------------------------------------------
    // Composites
    // ------------------------------------------------------------------

    pub fn read_identifier(&mut self) -> Result<Identifier> {
        self.expect_field(WireType::Identifier)?;
        let max = self.limits().max_string_length;
        let namespace = self.decode_string(max)?;
        let path = self.decode_string(max)?;
        Ok(Identifier { namespace, path })
    }

    pub fn write_identifier(&mut self, value: &Identifier) {
        self.write_string(&value.namespace);
        self.write_string(&value.path);
    }

    pub fn read_uuid(&mut self) -> Result<u128> {
        self.expect_field(WireType::Uuid)?;
        Ok(u128::from_be_bytes(self.take_array()?))
    }

    pub fn write_uuid(&mut self, value: u128) {
        self.storage_mut().put_u128(value);
    }

    // ------------------------------------------------------------------
    // Skipping
    // ------------------------------------------------------------------

    /// Advance past one value of type `tag` without keeping it
    pub fn skip_value(&mut self, tag: WireType) -> Result<()> {
        self.expect_field(tag)?;
        match tag {
            WireType::VarInt => self.decode_var_int().map(drop),
            WireType::VarLong => self.decode_var_long().map(drop),
            WireType::NbtCompoundOrNull => self.decode_nbt_compound().map(drop),
            WireType::String => self.skip_prefixed(1),
            WireType::BitSet => self.skip_prefixed(8),
            WireType::Identifier => {
                self.skip_prefixed(1)?;
                self.skip_prefixed(1)
            }
            fixed => self.advance(fixed.fixed_size().unwrap_or_default()),
        }
    }

    fn skip_prefixed(&mut self, unit: usize) -> Result<()> {
        let length = self.decode_var_int()?;
        if length < 0 {
            return Err(ProtocolError::underflow(0, self.readable_bytes()));
        }
        self.advance((length as usize).saturating_mul(unit))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn encoded_var_int(value: i32) -> Vec<u8> {
        let mut buf = PacketBuf::new();
        buf.write_var_int(value);
        buf.as_slice().to_vec()
    }

    #[test]
    fn test_var_int_known_encodings() {
        assert_eq!(encoded_var_int(0), vec![0x00]);
        assert_eq!(encoded_var_int(1), vec![0x01]);
        assert_eq!(encoded_var_int(127), vec![0x7f]);
        assert_eq!(encoded_var_int(128), vec![0x80, 0x01]);
        assert_eq!(encoded_var_int(255), vec![0xff, 0x01]);
        assert_eq!(encoded_var_int(25565), vec![0xdd, 0xc7, 0x01]);
        assert_eq!(encoded_var_int(2_097_151), vec![0xff, 0xff, 0x7f]);
        assert_eq!(encoded_var_int(i32::MAX), vec![0xff, 0xff, 0xff, 0xff, 0x07]);
        assert_eq!(encoded_var_int(-1), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(encoded_var_int(i32::MIN), vec![0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn test_var_int_size_matches_encoding() {
        for value in [0, 1, 127, 128, 16_383, 16_384, 2_097_151, i32::MAX, -1, i32::MIN] {
            assert_eq!(var_int_size(value), encoded_var_int(value).len());
        }
    }

    #[test]
    fn test_var_int_sixth_byte_is_malformed() {
        let mut buf = PacketBuf::from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0x01]);
        assert!(matches!(
            buf.read_var_int(),
            Err(ProtocolError::MalformedVarInt)
        ));
    }

    #[test]
    fn test_var_long_extremes() {
        for value in [0i64, 1, -1, i64::MAX, i64::MIN, 9_223_372_036_854_775] {
            let mut buf = PacketBuf::new();
            buf.write_var_long(value);
            assert!(buf.writer_index() <= 10);
            assert_eq!(buf.read_var_long().unwrap(), value);
        }
        let mut buf = PacketBuf::new();
        buf.write_var_long(-1);
        assert_eq!(buf.writer_index(), 10);
    }

    #[test]
    fn test_var_long_eleventh_byte_is_malformed() {
        let mut bytes = vec![0x80; 10];
        bytes.push(0x01);
        let mut buf = PacketBuf::from_slice(&bytes);
        assert!(matches!(
            buf.read_var_long(),
            Err(ProtocolError::MalformedVarLong)
        ));
    }

    #[test]
    fn test_string_multibyte_roundtrip() {
        let mut buf = PacketBuf::new();
        buf.write_string("héllo wörld ✓ 🎮");
        assert_eq!(buf.read_string().unwrap(), "héllo wörld ✓ 🎮");
        assert!(!buf.is_readable());
    }

    #[test]
    fn test_string_negative_length() {
        let mut buf = PacketBuf::new();
        buf.write_var_int(-1);
        assert!(matches!(
            buf.read_string(),
            Err(ProtocolError::StringTooLong { length: -1, .. })
        ));
    }

    #[test]
    fn test_string_payload_missing() {
        let mut buf = PacketBuf::new();
        buf.write_var_int(10);
        buf.write_bytes(b"abc");
        assert!(matches!(
            buf.read_string(),
            Err(ProtocolError::Underflow {
                requested: 10,
                available: 3
            })
        ));
    }

    #[test]
    fn test_string_bounded_counts_utf16_units() {
        let mut buf = PacketBuf::new();
        // One astral character is two UTF-16 units
        buf.write_string("🎮");
        assert!(matches!(
            buf.read_string_bounded(1),
            Err(ProtocolError::StringTooLong { length: 2, max: 1 })
        ));
    }

    #[test]
    fn test_fixed_width_roundtrip() {
        let mut buf = PacketBuf::new();
        buf.write_boolean(true);
        buf.write_byte(-5);
        buf.write_unsigned_byte(250);
        buf.write_short(-1234);
        buf.write_int(0x0102_0304);
        buf.write_long(-42);
        buf.write_float(1.5);
        buf.write_double(-0.25);
        buf.write_uuid(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff);

        assert_eq!(&buf.as_slice()[5..9], &[0x01, 0x02, 0x03, 0x04]);

        assert!(buf.read_boolean().unwrap());
        assert_eq!(buf.read_byte().unwrap(), -5);
        assert_eq!(buf.read_unsigned_byte().unwrap(), 250);
        assert_eq!(buf.read_short().unwrap(), -1234);
        assert_eq!(buf.read_int().unwrap(), 0x0102_0304);
        assert_eq!(buf.read_long().unwrap(), -42);
        assert_eq!(buf.read_float().unwrap(), 1.5);
        assert_eq!(buf.read_double().unwrap(), -0.25);
        assert_eq!(
            buf.read_uuid().unwrap(),
            0x0011_2233_4455_6677_8899_aabb_ccdd_eeff
        );
        assert!(!buf.is_readable());
    }

    #[test]
    fn test_uuid_most_significant_first() {
        let mut buf = PacketBuf::new();
        buf.write_uuid(1u128 << 64 | 2);
        assert_eq!(
            buf.as_slice(),
            &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2]
        );
    }

    #[test]
    fn test_identifier_is_two_strings() {
        let id: Identifier = "stone".parse().unwrap();
        assert_eq!(id, Identifier::new("minecraft", "stone"));
        assert_eq!(id.to_string(), "minecraft:stone");

        let mut buf = PacketBuf::new();
        buf.write_identifier(&Identifier::new("mod", "thing"));
        assert_eq!(buf.as_slice(), b"\x03mod\x05thing");
        assert_eq!(
            buf.read_identifier().unwrap(),
            Identifier::new("mod", "thing")
        );
    }

    #[test]
    fn test_skip_value_every_type() {
        let mut buf = PacketBuf::new();
        buf.write_var_int(300);
        buf.write_var_long(-7);
        buf.write_string("skip me");
        buf.write_nbt_compound(None).unwrap();
        let mut bits = BitSet::new();
        bits.set(130);
        buf.write_bit_set(&bits);
        buf.write_identifier(&Identifier::new("a", "b"));
        buf.write_short(3);
        buf.write_uuid(9);
        buf.write_u8(0xAA);

        for tag in [
            WireType::VarInt,
            WireType::VarLong,
            WireType::String,
            WireType::NbtCompoundOrNull,
            WireType::BitSet,
            WireType::Identifier,
            WireType::Short,
            WireType::Uuid,
        ] {
            buf.skip_value(tag).unwrap();
        }
        assert_eq!(buf.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(WireType::Uuid.fixed_size(), Some(16));
        assert_eq!(WireType::Double.fixed_size(), Some(8));
        assert_eq!(WireType::UnsignedByte.fixed_size(), Some(1));
        assert_eq!(WireType::VarInt.fixed_size(), None);
        assert_eq!(WireType::Identifier.fixed_size(), None);
    }
}
