//! # Packet Synthesis
//!
//! Rebuilds packets in the shape one protocol revision expects out of values
//! produced under another revision's layout.
//!
//! ## Components
//! - **Pending**: ordered list of typed values staged for serialization
//! - **Synthesizer**: writes the list through the codec and hands the buffer to
//!   the target's native reader
//! - **Gate**: decides per message kind and client version whether a rebuild
//!   runs, and which handler performs it
//! - **Versions**: protocol numbers and inclusive version ranges
//!
//! ## Flow
//! ```text
//! interception → PendingFields → synthesize → PacketBuf → T::decode → T
//! ```

pub mod gate;
pub mod pending;
pub mod synthesizer;
pub mod versions;
