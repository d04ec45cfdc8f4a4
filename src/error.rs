//! # Error Types
//!
//! Every fault the codec and the synthesizer can raise.
//!
//! Faults are never recovered from at the point they occur. A decode fault
//! leaves the read cursor at an undefined position inside the buffer, so the
//! caller must throw the whole buffer away instead of retrying from where it
//! stopped.
//!
//! ## Error Categories
//! - **Decode faults**: underflow, malformed variable-length integers, oversized
//!   strings and bit sets, broken NBT trees
//! - **Encode faults**: NBT trees that cannot be serialized
//! - **Synthesis faults**: pending field values that do not match their tag, or
//!   a target reader that disagrees with the pending field order
//! - **Ambient**: framing, configuration and I/O errors
//!
//! ## Example Usage
//! ```rust
//! use packet_bridge::core::buffer::PacketBuf;
//! use packet_bridge::error::ProtocolError;
//! use tracing::warn;
//!
//! let mut buf = PacketBuf::from_slice(&[0x80, 0x80]);
//! match buf.read_var_int() {
//!     Ok(value) => println!("value = {value}"),
//!     Err(e) if e.is_decode_fault() => warn!(error = %e, "dropping buffer"),
//!     Err(e) => panic!("unexpected: {e}"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Gate errors
    pub const ERR_GATE_WRITE_LOCK: &str = "Failed to acquire write lock on version gate";
    pub const ERR_GATE_READ_LOCK: &str = "Failed to acquire read lock on version gate";

    /// Synthesis errors
    pub const ERR_UNTYPED_READ: &str = "untyped read from a synthesized buffer";
    pub const ERR_UNREAD_FIELDS: &str = "end of target reader";
    pub const ERR_MID_FIELD: &str = "read starting inside a pending field";

    /// NBT errors
    pub const ERR_NBT_ROOT: &str = "Root tag must be a named compound tag";
    pub const ERR_NBT_DEPTH: &str = "Tried to read NBT tag with too high complexity";
    pub const ERR_NBT_QUOTA: &str = "Tried to read NBT tag that was too big";
    pub const ERR_NBT_MIXED_LIST: &str = "List elements do not share a single tag type";
    pub const ERR_NBT_STRING_LENGTH: &str = "Encoded string too long for modified UTF-8";
}

// ProtocolError is the primary error type for all codec and synthesis operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("Buffer underflow: needed {requested} bytes but only {available} readable")]
    Underflow { requested: usize, available: usize },

    #[error("VarInt too big")]
    MalformedVarInt,

    #[error("VarLong too big")]
    MalformedVarLong,

    #[error("String length {length} is longer than maximum allowed ({max})")]
    StringTooLong { length: i64, max: usize },

    #[error("NBT decode error: {0}")]
    StructureDecode(String),

    #[error("NBT encode error: {0}")]
    StructureEncode(String),

    #[error("BitSet with {declared} words is bigger than allowed {max}")]
    BitSetTooLong { declared: i32, max: usize },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    pub(crate) fn underflow(requested: usize, available: usize) -> Self {
        ProtocolError::Underflow {
            requested,
            available,
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        ProtocolError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether this fault desynchronizes the buffer it was raised on.
    ///
    /// Decode faults mean the framing of the surrounding stream can no longer be
    /// trusted; the caller should abort the message or the connection. Anything
    /// else only rejects a single synthesis attempt.
    pub fn is_decode_fault(&self) -> bool {
        matches!(
            self,
            ProtocolError::Underflow { .. }
                | ProtocolError::MalformedVarInt
                | ProtocolError::MalformedVarLong
                | ProtocolError::StringTooLong { .. }
                | ProtocolError::StructureDecode(_)
                | ProtocolError::BitSetTooLong { .. }
                | ProtocolError::OversizedPacket(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
