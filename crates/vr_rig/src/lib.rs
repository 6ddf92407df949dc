//! Remote VR rig reconstruction.
//!
//! - Pose records streamed between peers ([`RigState`], [`SpectatorRigState`], [`PlayerPrefs`])
//! - The reconciler that drives a remote skeleton from the latest [`RigState`]
//! - The spectator ghost shown while a peer is dead
//! - Arm IK wiring and held-item behaviours

pub mod bones;
pub mod ghost;
pub mod ik;
pub mod items;
pub mod reconciler;
pub mod state;
pub mod tuning;

pub use bones::*;
pub use ghost::*;
pub use ik::*;
pub use items::*;
pub use reconciler::*;
pub use state::*;
pub use tuning::*;
