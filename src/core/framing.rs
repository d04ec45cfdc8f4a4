//! # Frame Codec
//!
//! Tokio codec splitting a byte stream into length-prefixed packets.
//!
//! ## Wire Format
//! ```text
//! [Length(VarInt, 1-3 bytes)] [Packet id(VarInt)] [Body(N)]
//! ```
//! `Length` covers the packet id and the body. Frames are handed out as a
//! [`Frame`] whose body is a [`PacketBuf`] positioned right after the id, ready
//! for the packet's native reader.
//!
//! ## Security
//! - The length prefix may not exceed 3 bytes (21 bits)
//! - Declared lengths above the configured maximum are rejected before any
//!   buffering happens

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::config::{CodecConfig, MAX_FRAME_SIZE};
use crate::core::buffer::{CodecLimits, PacketBuf};
use crate::core::codec::var_int_size;
use crate::error::{ProtocolError, Result};

/// Maximum width of the frame length prefix
pub const MAX_LENGTH_PREFIX: usize = 3;

/// One decoded packet
#[derive(Debug, Clone)]
pub struct Frame {
    pub packet_id: i32,
    pub body: PacketBuf,
}

impl Frame {
    pub fn new(packet_id: i32, body: PacketBuf) -> Self {
        Self { packet_id, body }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
    limits: CodecLimits,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            limits: CodecLimits::default(),
        }
    }
}

impl FrameCodec {
    /// `max_frame_size` is capped at what a 3-byte length prefix can declare
    pub fn new(max_frame_size: usize, limits: CodecLimits) -> Self {
        Self {
            max_frame_size: max_frame_size.min(MAX_FRAME_SIZE),
            limits,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.max_frame_size, config.limits())
    }

    /// Parse the length prefix without consuming it.
    /// Returns `(prefix width, declared length)` or `None` if incomplete.
    fn peek_length(src: &[u8]) -> Result<Option<(usize, usize)>> {
        let mut length: u32 = 0;
        for (i, &byte) in src.iter().enumerate() {
            if i >= MAX_LENGTH_PREFIX {
                return Err(ProtocolError::MalformedVarInt);
            }
            length |= ((byte & 0x7f) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(Some((i + 1, length as usize)));
            }
        }
        if src.len() >= MAX_LENGTH_PREFIX {
            return Err(ProtocolError::MalformedVarInt);
        }
        Ok(None)
    }
}

fn put_var_int(dst: &mut BytesMut, value: i32) {
    let mut value = value as u32;
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some((prefix, length)) = Self::peek_length(src)? else {
            return Ok(None);
        };

        if length > self.max_frame_size {
            debug!(length, max = self.max_frame_size, "Rejecting oversized frame");
            return Err(ProtocolError::OversizedPacket(length));
        }

        let total = prefix + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(prefix);
        let mut body = PacketBuf::from(src.split_to(length));
        body.set_limits(self.limits);
        let packet_id = body.read_var_int()?;
        trace!(packet_id, length, "Decoded frame");

        Ok(Some(Frame { packet_id, body }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        let body = frame.body.readable_slice();
        let length = var_int_size(frame.packet_id) + body.len();
        if length > self.max_frame_size {
            return Err(ProtocolError::OversizedPacket(length));
        }

        dst.reserve(var_int_size(length as i32) + length);
        put_var_int(dst, length as i32);
        put_var_int(dst, frame.packet_id);
        dst.extend_from_slice(body);
        Ok(())
    }
}
