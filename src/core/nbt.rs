//! # NBT
//!
//! Named Binary Tag trees, the nested structure format carried by the
//! Nbt-Compound-Or-Null wire type.
//!
//! ## Wire Format
//! ```text
//! root      [type(1) = 10] [name(u16 len + modified UTF-8)] [compound payload]
//! compound  repeated [type(1)] [name] [payload], terminated by [0]
//! list      [element type(1)] [count(i32)] [payload * count]
//! arrays    [count(i32)] [element * count]
//! ```
//! All numbers are big-endian. Strings use Java's modified UTF-8: `U+0000` takes
//! two bytes and characters outside the BMP are written as surrogate pairs of
//! three bytes each.
//!
//! The format is self-delimiting, which is what lets the codec tell an absent
//! compound (a single `0x00`) from a present one by peeking one byte.
//!
//! ## Security
//! Reading charges an allocation estimate for every element against a quota
//! (2 MiB by default) before allocating, and refuses trees nested deeper than
//! the configured depth. Exhausting either fails the decode.

use bytes::BufMut;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::buffer::PacketBuf;
use crate::error::{constants, ProtocolError, Result};

pub const TAG_END: u8 = 0;
pub const TAG_BYTE: u8 = 1;
pub const TAG_SHORT: u8 = 2;
pub const TAG_INT: u8 = 3;
pub const TAG_LONG: u8 = 4;
pub const TAG_FLOAT: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_BYTE_ARRAY: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_LIST: u8 = 9;
pub const TAG_COMPOUND: u8 = 10;
pub const TAG_INT_ARRAY: u8 = 11;
pub const TAG_LONG_ARRAY: u8 = 12;

// Allocation estimates charged against the quota, in bytes
const COST_BYTE: usize = 9;
const COST_SHORT: usize = 10;
const COST_INT: usize = 12;
const COST_LONG: usize = 16;
const COST_ARRAY: usize = 24;
const COST_STRING: usize = 36;
const COST_LIST: usize = 37;
const COST_LIST_SLOT: usize = 4;
const COST_COMPOUND: usize = 48;
const COST_COMPOUND_ENTRY: usize = 28;

/// A single NBT value
#[derive(Debug, Clone, PartialEq)]
pub enum NbtTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtTag>),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl NbtTag {
    /// Wire id of this tag
    pub fn id(&self) -> u8 {
        match self {
            NbtTag::Byte(_) => TAG_BYTE,
            NbtTag::Short(_) => TAG_SHORT,
            NbtTag::Int(_) => TAG_INT,
            NbtTag::Long(_) => TAG_LONG,
            NbtTag::Float(_) => TAG_FLOAT,
            NbtTag::Double(_) => TAG_DOUBLE,
            NbtTag::ByteArray(_) => TAG_BYTE_ARRAY,
            NbtTag::String(_) => TAG_STRING,
            NbtTag::List(_) => TAG_LIST,
            NbtTag::Compound(_) => TAG_COMPOUND,
            NbtTag::IntArray(_) => TAG_INT_ARRAY,
            NbtTag::LongArray(_) => TAG_LONG_ARRAY,
        }
    }
}

impl From<i8> for NbtTag {
    fn from(value: i8) -> Self {
        NbtTag::Byte(value)
    }
}

impl From<i16> for NbtTag {
    fn from(value: i16) -> Self {
        NbtTag::Short(value)
    }
}

impl From<i32> for NbtTag {
    fn from(value: i32) -> Self {
        NbtTag::Int(value)
    }
}

impl From<i64> for NbtTag {
    fn from(value: i64) -> Self {
        NbtTag::Long(value)
    }
}

impl From<f32> for NbtTag {
    fn from(value: f32) -> Self {
        NbtTag::Float(value)
    }
}

impl From<f64> for NbtTag {
    fn from(value: f64) -> Self {
        NbtTag::Double(value)
    }
}

impl From<String> for NbtTag {
    fn from(value: String) -> Self {
        NbtTag::String(value)
    }
}

impl From<&str> for NbtTag {
    fn from(value: &str) -> Self {
        NbtTag::String(value.to_string())
    }
}

impl From<NbtCompound> for NbtTag {
    fn from(value: NbtCompound) -> Self {
        NbtTag::Compound(value)
    }
}

/// Keyed collection of tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NbtCompound {
    entries: BTreeMap<String, NbtTag>,
}

impl NbtCompound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NbtTag>) -> Option<NbtTag> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&NbtTag> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<NbtTag> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NbtTag)> {
        self.entries.iter()
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(NbtTag::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(NbtTag::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn get_compound(&self, key: &str) -> Option<&NbtCompound> {
        match self.entries.get(key) {
            Some(NbtTag::Compound(value)) => Some(value),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------
// Reading
// ----------------------------------------------------------------------

fn decode_error(message: impl Into<String>) -> ProtocolError {
    ProtocolError::StructureDecode(message.into())
}

fn encode_error(message: impl Into<String>) -> ProtocolError {
    ProtocolError::StructureEncode(message.into())
}

struct NbtReader<'a> {
    buf: &'a mut PacketBuf,
    quota: usize,
    used: usize,
    max_depth: usize,
}

impl NbtReader<'_> {
    fn charge(&mut self, bytes: usize) -> Result<()> {
        self.used = self.used.saturating_add(bytes);
        if self.used > self.quota {
            return Err(decode_error(format!(
                "{}; tried to allocate: {} bytes where max allowed: {}",
                constants::ERR_NBT_QUOTA,
                self.used,
                self.quota
            )));
        }
        Ok(())
    }

    fn bytes(&mut self, len: usize) -> Result<&[u8]> {
        self.buf
            .take(len)
            .map_err(|e| decode_error(format!("unexpected end of NBT data: {e}")))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.buf
            .take_array()
            .map_err(|e| decode_error(format!("unexpected end of NBT data: {e}")))
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn length(&mut self) -> Result<usize> {
        let length = i32::from_be_bytes(self.array()?);
        if length < 0 {
            return Err(decode_error(format!("negative NBT length {length}")));
        }
        Ok(length as usize)
    }

    fn string(&mut self) -> Result<String> {
        let length = u16::from_be_bytes(self.array()?) as usize;
        self.charge(COST_STRING.saturating_add(length.saturating_mul(2)))?;
        let raw = self.bytes(length)?;
        decode_modified_utf8(raw)
    }

    fn payload(&mut self, id: u8, depth: usize) -> Result<NbtTag> {
        if depth > self.max_depth {
            return Err(decode_error(format!(
                "{}, depth > {}",
                constants::ERR_NBT_DEPTH,
                self.max_depth
            )));
        }

        Ok(match id {
            TAG_BYTE => {
                self.charge(COST_BYTE)?;
                NbtTag::Byte(self.u8()? as i8)
            }
            TAG_SHORT => {
                self.charge(COST_SHORT)?;
                NbtTag::Short(i16::from_be_bytes(self.array()?))
            }
            TAG_INT => {
                self.charge(COST_INT)?;
                NbtTag::Int(i32::from_be_bytes(self.array()?))
            }
            TAG_LONG => {
                self.charge(COST_LONG)?;
                NbtTag::Long(i64::from_be_bytes(self.array()?))
            }
            TAG_FLOAT => {
                self.charge(COST_INT)?;
                NbtTag::Float(f32::from_be_bytes(self.array()?))
            }
            TAG_DOUBLE => {
                self.charge(COST_LONG)?;
                NbtTag::Double(f64::from_be_bytes(self.array()?))
            }
            TAG_BYTE_ARRAY => {
                let len = self.length()?;
                self.charge(COST_ARRAY.saturating_add(len))?;
                NbtTag::ByteArray(self.bytes(len)?.iter().map(|&b| b as i8).collect())
            }
            TAG_STRING => NbtTag::String(self.string()?),
            TAG_LIST => {
                let element = self.u8()?;
                let len = self.length()?;
                self.charge(COST_LIST.saturating_add(len.saturating_mul(COST_LIST_SLOT)))?;
                if element == TAG_END && len > 0 {
                    return Err(decode_error("Missing type on ListTag"));
                }
                let mut items = Vec::with_capacity(len.min(self.buf.readable_bytes()));
                for _ in 0..len {
                    items.push(self.payload(element, depth + 1)?);
                }
                NbtTag::List(items)
            }
            TAG_COMPOUND => NbtTag::Compound(self.compound(depth)?),
            TAG_INT_ARRAY => {
                let len = self.length()?;
                self.charge(COST_ARRAY.saturating_add(len.saturating_mul(4)))?;
                let mut values = Vec::with_capacity(len.min(self.buf.readable_bytes() / 4));
                for _ in 0..len {
                    values.push(i32::from_be_bytes(self.array()?));
                }
                NbtTag::IntArray(values)
            }
            TAG_LONG_ARRAY => {
                let len = self.length()?;
                self.charge(COST_ARRAY.saturating_add(len.saturating_mul(8)))?;
                let mut values = Vec::with_capacity(len.min(self.buf.readable_bytes() / 8));
                for _ in 0..len {
                    values.push(i64::from_be_bytes(self.array()?));
                }
                NbtTag::LongArray(values)
            }
            other => return Err(decode_error(format!("Invalid tag id: {other}"))),
        })
    }

    fn compound(&mut self, depth: usize) -> Result<NbtCompound> {
        self.charge(COST_COMPOUND)?;
        let mut compound = NbtCompound::new();
        loop {
            let id = self.u8()?;
            if id == TAG_END {
                return Ok(compound);
            }
            let key = self.string()?;
            self.charge(COST_COMPOUND_ENTRY)?;
            let value = self.payload(id, depth + 1)?;
            compound.entries.insert(key, value);
        }
    }
}

/// Read a named-root compound, charging at most `quota` bytes and nesting at
/// most `max_depth` levels.
pub fn read_root(buf: &mut PacketBuf, quota: usize, max_depth: usize) -> Result<NbtCompound> {
    let mut reader = NbtReader {
        buf,
        quota,
        used: 0,
        max_depth,
    };

    let id = reader.u8()?;
    if id != TAG_COMPOUND {
        debug!(id, "NBT root is not a compound");
        return Err(decode_error(constants::ERR_NBT_ROOT));
    }
    let _name = reader.string()?;
    reader.compound(0)
}

fn decode_modified_utf8(raw: &[u8]) -> Result<String> {
    let malformed = |at: usize| decode_error(format!("malformed modified UTF-8 around byte {at}"));

    let mut units = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        match b >> 4 {
            0..=7 => {
                units.push(b as u16);
                i += 1;
            }
            12 | 13 => {
                let b2 = *raw.get(i + 1).ok_or_else(|| malformed(i))?;
                if b2 & 0xC0 != 0x80 {
                    return Err(malformed(i + 1));
                }
                units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
                i += 2;
            }
            14 => {
                let (b2, b3) = match (raw.get(i + 1), raw.get(i + 2)) {
                    (Some(&b2), Some(&b3)) => (b2, b3),
                    _ => return Err(malformed(i)),
                };
                if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                    return Err(malformed(i + 1));
                }
                units.push(
                    (((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16,
                );
                i += 3;
            }
            _ => return Err(malformed(i)),
        }
    }
    Ok(String::from_utf16_lossy(&units))
}

// ----------------------------------------------------------------------
// Writing
// ----------------------------------------------------------------------

fn encode_modified_utf8(value: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    if out.len() > u16::MAX as usize {
        return Err(encode_error(format!(
            "{}: {} bytes",
            constants::ERR_NBT_STRING_LENGTH,
            out.len()
        )));
    }
    Ok(out)
}

fn write_string(buf: &mut PacketBuf, value: &str) -> Result<()> {
    let encoded = encode_modified_utf8(value)?;
    buf.storage_mut().put_u16(encoded.len() as u16);
    buf.write_bytes(&encoded);
    Ok(())
}

fn write_length(buf: &mut PacketBuf, len: usize) -> Result<()> {
    let len = i32::try_from(len).map_err(|_| encode_error(format!("NBT length {len} overflows i32")))?;
    buf.storage_mut().put_i32(len);
    Ok(())
}

fn write_payload(buf: &mut PacketBuf, tag: &NbtTag) -> Result<()> {
    match tag {
        NbtTag::Byte(v) => buf.write_u8(*v as u8),
        NbtTag::Short(v) => buf.storage_mut().put_i16(*v),
        NbtTag::Int(v) => buf.storage_mut().put_i32(*v),
        NbtTag::Long(v) => buf.storage_mut().put_i64(*v),
        NbtTag::Float(v) => buf.storage_mut().put_f32(*v),
        NbtTag::Double(v) => buf.storage_mut().put_f64(*v),
        NbtTag::ByteArray(values) => {
            write_length(buf, values.len())?;
            for v in values {
                buf.write_u8(*v as u8);
            }
        }
        NbtTag::String(v) => write_string(buf, v)?,
        NbtTag::List(items) => {
            let element = items.first().map_or(TAG_END, NbtTag::id);
            if items.iter().any(|item| item.id() != element) {
                return Err(encode_error(constants::ERR_NBT_MIXED_LIST));
            }
            buf.write_u8(element);
            write_length(buf, items.len())?;
            for item in items {
                write_payload(buf, item)?;
            }
        }
        NbtTag::Compound(compound) => write_compound(buf, compound)?,
        NbtTag::IntArray(values) => {
            write_length(buf, values.len())?;
            for v in values {
                buf.storage_mut().put_i32(*v);
            }
        }
        NbtTag::LongArray(values) => {
            write_length(buf, values.len())?;
            for v in values {
                buf.storage_mut().put_i64(*v);
            }
        }
    }
    Ok(())
}

fn write_compound(buf: &mut PacketBuf, compound: &NbtCompound) -> Result<()> {
    for (key, value) in &compound.entries {
        buf.write_u8(value.id());
        write_string(buf, key)?;
        write_payload(buf, value)?;
    }
    buf.write_u8(TAG_END);
    Ok(())
}

/// Write `compound` as a root tag with an empty name
pub fn write_root(buf: &mut PacketBuf, compound: &NbtCompound) -> Result<()> {
    buf.write_u8(TAG_COMPOUND);
    write_string(buf, "")?;
    write_compound(buf, compound)
}
