//! # Packet Buffer
//!
//! Growable byte buffer with independent read and write cursors.
//!
//! Writes always append at the write cursor and grow the storage as needed.
//! Reads never grow anything: asking for more bytes than were written fails
//! with [`ProtocolError::Underflow`] and leaves the cursor where it was.
//!
//! ```text
//! +-------------------+------------------+
//! |   already read    |     readable     |
//! +-------------------+------------------+
//! 0            reader_index        writer_index
//! ```
//!
//! A buffer produced by the packet synthesizer additionally carries the layout
//! of the fields that were written into it. While a layout is attached, only
//! typed codec reads are accepted, and each one must start exactly on a field of
//! the same wire type.

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::{DEFAULT_MAX_STRING_LENGTH, NBT_MAX_BYTES, NBT_MAX_DEPTH};
use crate::core::codec::WireType;
use crate::error::{constants, ProtocolError, Result};

/// Decode limits carried by every buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum decoded string length
    pub max_string_length: usize,
    /// Tracked allocation quota for one NBT tree, in bytes
    pub nbt_max_bytes: usize,
    /// Maximum NBT nesting depth
    pub nbt_max_depth: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            nbt_max_bytes: NBT_MAX_BYTES,
            nbt_max_depth: NBT_MAX_DEPTH,
        }
    }
}

/// Offsets and tags of the fields a synthesized buffer was built from.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldLayout {
    fields: Vec<(usize, WireType)>,
}

impl FieldLayout {
    pub(crate) fn push(&mut self, offset: usize, tag: WireType) {
        self.fields.push((offset, tag));
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    fn field_at(&self, offset: usize) -> Option<(usize, WireType)> {
        self.fields
            .binary_search_by_key(&offset, |&(start, _)| start)
            .ok()
            .map(|index| (index, self.fields[index].1))
    }
}

/// Byte buffer with a read cursor and a write cursor.
#[derive(Debug, Clone, Default)]
pub struct PacketBuf {
    data: BytesMut,
    reader_index: usize,
    limits: CodecLimits,
    layout: Option<FieldLayout>,
}

impl PacketBuf {
    /// Create an empty buffer with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Create an empty buffer that decodes with the given limits
    pub fn with_limits(limits: CodecLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Create a buffer holding a copy of `bytes`, ready to be read
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::from(BytesMut::from(bytes))
    }

    pub fn limits(&self) -> CodecLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: CodecLimits) {
        self.limits = limits;
    }

    #[inline]
    pub fn reader_index(&self) -> usize {
        self.reader_index
    }

    #[inline]
    pub fn writer_index(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn readable_bytes(&self) -> usize {
        self.data.len() - self.reader_index
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.readable_bytes() > 0
    }

    /// Move the read cursor. Positions past the write cursor are rejected, and
    /// so is any move on a synthesized buffer.
    pub fn set_reader_index(&mut self, index: usize) -> Result<()> {
        self.refuse_untyped()?;
        if index > self.data.len() {
            return Err(ProtocolError::underflow(
                index - self.reader_index,
                self.readable_bytes(),
            ));
        }
        self.reader_index = index;
        Ok(())
    }

    /// Drop all content and reset both cursors
    pub fn clear(&mut self) {
        self.data.clear();
        self.reader_index = 0;
        self.layout = None;
    }

    /// Every byte written so far, including the ones already read
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The bytes between the read and the write cursor
    pub fn readable_slice(&self) -> &[u8] {
        &self.data[self.reader_index..]
    }

    /// Consume the buffer, returning everything that was written
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    // ------------------------------------------------------------------
    // Raw reads
    // ------------------------------------------------------------------

    /// Read one unsigned byte
    pub fn read_u8(&mut self) -> Result<u8> {
        self.refuse_untyped()?;
        self.take_u8()
    }

    /// Look at the next byte without consuming it
    pub fn peek_u8(&self) -> Result<u8> {
        self.refuse_untyped()?;
        self.peek_byte()
    }

    /// Read exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        self.refuse_untyped()?;
        self.take(len)
    }

    /// Advance the read cursor by `len` bytes
    pub fn skip_bytes(&mut self, len: usize) -> Result<()> {
        self.refuse_untyped()?;
        self.advance(len)
    }

    // ------------------------------------------------------------------
    // Raw writes
    // ------------------------------------------------------------------

    pub fn write_u8(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    // ------------------------------------------------------------------
    // Unchecked cursor primitives used by the codec
    // ------------------------------------------------------------------

    #[inline]
    fn ensure(&self, len: usize) -> Result<()> {
        let available = self.readable_bytes();
        if len > available {
            return Err(ProtocolError::underflow(len, available));
        }
        Ok(())
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&[u8]> {
        self.ensure(len)?;
        let start = self.reader_index;
        self.reader_index += len;
        Ok(&self.data[start..start + len])
    }

    pub(crate) fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn take_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let byte = self.data[self.reader_index];
        self.reader_index += 1;
        Ok(byte)
    }

    pub(crate) fn peek_byte(&self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data[self.reader_index])
    }

    pub(crate) fn advance(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.reader_index += len;
        Ok(())
    }

    pub(crate) fn storage_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }

    // ------------------------------------------------------------------
    // Field layout
    // ------------------------------------------------------------------

    pub(crate) fn attach_layout(&mut self, layout: FieldLayout) {
        self.layout = Some(layout);
    }

    #[cfg(test)]
    pub(crate) fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    fn refuse_untyped(&self) -> Result<()> {
        if self.layout.is_some() {
            return Err(ProtocolError::mismatch(
                "typed field read",
                constants::ERR_UNTYPED_READ,
            ));
        }
        Ok(())
    }

    /// Check that a typed read of `tag` starts on a field of that type.
    /// A no-op on buffers without a layout.
    pub(crate) fn expect_field(&self, tag: WireType) -> Result<()> {
        let Some(layout) = &self.layout else {
            return Ok(());
        };

        match layout.field_at(self.reader_index) {
            Some((_, found)) if found == tag => Ok(()),
            Some((index, found)) => Err(ProtocolError::mismatch(
                tag.name(),
                format!("{} at pending field {index}", found.name()),
            )),
            None if self.reader_index >= self.data.len() => Err(ProtocolError::mismatch(
                tag.name(),
                format!("end of {} pending fields", layout.len()),
            )),
            None => Err(ProtocolError::mismatch(
                tag.name(),
                constants::ERR_MID_FIELD,
            )),
        }
    }

    /// Fail if a synthesized buffer still holds fields nobody read.
    pub(crate) fn ensure_consumed(&self) -> Result<()> {
        if !self.is_readable() {
            return Ok(());
        }
        let found = match self
            .layout
            .as_ref()
            .and_then(|layout| layout.field_at(self.reader_index))
        {
            Some((index, tag)) => format!("unread {} at pending field {index}", tag.name()),
            None => format!("{} unread bytes", self.readable_bytes()),
        };
        Err(ProtocolError::mismatch(constants::ERR_UNREAD_FIELDS, found))
    }
}

impl From<BytesMut> for PacketBuf {
    fn from(data: BytesMut) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

impl From<Vec<u8>> for PacketBuf {
    fn from(data: Vec<u8>) -> Self {
        Self::from(BytesMut::from(&data[..]))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_cursors_are_independent() {
        let mut buf = PacketBuf::new();
        buf.write_u8(1);
        buf.write_bytes(&[2, 3, 4]);
        assert_eq!(buf.writer_index(), 4);
        assert_eq!(buf.reader_index(), 0);

        assert_eq!(buf.read_u8().unwrap(), 1);
        assert_eq!(buf.read_bytes(2).unwrap(), &[2, 3]);
        assert_eq!(buf.reader_index(), 3);
        assert_eq!(buf.readable_bytes(), 1);

        buf.write_u8(5);
        assert_eq!(buf.readable_slice(), &[4, 5]);
    }

    #[test]
    fn test_read_past_end_underflows() {
        let mut buf = PacketBuf::from_slice(&[7, 8]);
        let err = buf.read_bytes(3).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Underflow {
                requested: 3,
                available: 2
            }
        ));
        // A failed read leaves the cursor untouched
        assert_eq!(buf.reader_index(), 0);

        buf.skip_bytes(2).unwrap();
        assert!(matches!(buf.read_u8(), Err(ProtocolError::Underflow { .. })));
        assert!(matches!(buf.peek_u8(), Err(ProtocolError::Underflow { .. })));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut buf = PacketBuf::from_slice(&[9]);
        assert_eq!(buf.peek_u8().unwrap(), 9);
        assert_eq!(buf.reader_index(), 0);
        assert_eq!(buf.read_u8().unwrap(), 9);
    }

    #[test]
    fn test_set_reader_index_bounds() {
        let mut buf = PacketBuf::from_slice(&[1, 2, 3]);
        buf.set_reader_index(3).unwrap();
        assert!(!buf.is_readable());
        assert!(buf.set_reader_index(4).is_err());
        buf.set_reader_index(0).unwrap();
        assert_eq!(buf.read_u8().unwrap(), 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut buf = PacketBuf::from_slice(&[1, 2, 3]);
        buf.read_u8().unwrap();
        buf.clear();
        assert_eq!(buf.reader_index(), 0);
        assert_eq!(buf.writer_index(), 0);
    }

    #[test]
    fn test_layout_refuses_raw_reads() {
        let mut buf = PacketBuf::from_slice(&[1]);
        let mut layout = FieldLayout::default();
        layout.push(0, WireType::UnsignedByte);
        buf.attach_layout(layout);

        assert!(matches!(
            buf.read_u8(),
            Err(ProtocolError::TypeMismatch { .. })
        ));
        assert!(buf.expect_field(WireType::UnsignedByte).is_ok());
        assert!(buf.expect_field(WireType::Byte).is_err());
        assert!(buf.ensure_consumed().is_err());
    }
}
