//! # Core Codec Components
//!
//! Low-level buffer handling and the primitive wire codec.
//!
//! This module is the foundation every protocol revision shares: the same
//! reads and writes are used by native packet readers and by the synthesizer,
//! which is what makes a synthesized packet indistinguishable from a received
//! one.
//!
//! ## Components
//! - **Buffer**: byte buffer with independent read and write cursors
//! - **Codec**: VarInt, VarLong, String, NBT, BitSet and fixed-width types
//! - **NBT**: bounded reader and writer for nested tag trees
//! - **BitSet**: word-backed set of bit indices
//! - **Framing**: Tokio codec for length-prefixed packets
//!
//! ## Security
//! - Every read is bounds-checked and fails instead of growing the buffer
//! - Variable-length integers are capped at their bit width
//! - Declared lengths are validated before allocation

pub mod bitset;
pub mod buffer;
pub mod codec;
pub mod framing;
pub mod nbt;
