//! # Packet Bridge
//!
//! Wire codec and packet synthesis for talking to several incompatible
//! revisions of one binary game protocol from a single client.
//!
//! Each protocol revision lays out otherwise similar messages differently:
//! fields get added, removed or reordered, integer widths change, terminators
//! change. This crate provides two things:
//!
//! - a bounds-checked primitive codec ([`core`]) for VarInt, VarLong, strings,
//!   NBT compounds, bit sets and the fixed-width types, over a cursor buffer
//! - a synthesizer ([`protocol`]) that builds a packet in a target revision's
//!   shape by writing foreign values through that codec and letting the
//!   target's own reader decode them
//!
//! ## Quick Start
//! ```rust
//! use packet_bridge::{PacketBuf, PendingFields, WireType};
//!
//! # fn main() -> packet_bridge::Result<()> {
//! let mut fields = PendingFields::new();
//! fields.push(WireType::VarInt, 7i32)?;
//! fields.push(WireType::String, "zombie")?;
//!
//! let (id, name) = packet_bridge::synthesize(fields, |buf: &mut PacketBuf| {
//!     Ok((buf.read_var_int()?, buf.read_string()?))
//! })?;
//! assert_eq!((id, name.as_str()), (7, "zombie"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Faults
//! Every fault is a [`ProtocolError`]. Decode faults leave the buffer at an
//! undefined position and the caller must discard it; see
//! [`ProtocolError::is_decode_fault`].

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use config::BridgeConfig;
pub use crate::core::bitset::BitSet;
pub use crate::core::buffer::{CodecLimits, PacketBuf};
pub use crate::core::codec::{Identifier, WireType};
pub use crate::core::framing::{Frame, FrameCodec};
pub use crate::core::nbt::{NbtCompound, NbtTag};
pub use error::{ProtocolError, Result};
pub use protocol::gate::VersionGate;
pub use protocol::pending::{FieldValue, PendingField, PendingFields};
pub use protocol::synthesizer::{synthesize, synthesize_as, PacketSynthesizer, WireDecode, WireEncode};
pub use protocol::versions::ProtocolRange;
