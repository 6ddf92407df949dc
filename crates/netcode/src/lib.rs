//! Per-peer pose channels for multiplayer VR sessions.
//!
//! A channel is identified by `(kind, owner)`. The owner broadcasts fixed-layout
//! records; every other peer receives them best-effort, with no acknowledgement,
//! retry or version negotiation.

pub mod channel;
pub mod codec;
pub mod frame;
pub mod system;
pub mod transport;

pub use channel::*;
pub use codec::{DecodeError, PacketDecode, PacketEncode};
pub use frame::Envelope;
pub use system::*;
pub use transport::*;
