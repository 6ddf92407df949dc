//! VR pose sync session: remote peers, their channels and per-frame updates.

pub mod config;
pub mod peer;
pub mod session;

pub use config::SyncConfig;
pub use peer::{RemotePeer, PEER_CHANNELS};
pub use session::{Session, SessionError, SessionResult, SessionWorld};
