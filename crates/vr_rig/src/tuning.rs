//! Tunable constants for remote rig reconstruction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigTuning {
    /// A snapped hand lets go once its target is further than this from the tracked hand.
    pub snap_break_distance: f32,
    /// Per-frame lerp factor for the crouch offset.
    pub crouch_lerp_factor: f32,
    /// Crouch offset target while the crouch button is held.
    pub button_crouch_offset: f32,
    /// Extra hand height while roomscale crouching.
    pub roomscale_hand_offset: f32,
    /// Uniform scale of the XR origin relative to tracked space.
    pub origin_scale: f32,
    /// Vertical drop per unit of sinking (quicksand, water).
    pub sinking_depth: f32,
    /// Vertical origin shift while seated in a vehicle.
    pub vehicle_offset: f32,
    /// Forward push of the origin while crouched so the arms clear the body.
    pub crouch_forward_push: f32,
}

impl Default for RigTuning {
    fn default() -> Self {
        Self {
            snap_break_distance: 2.0,
            crouch_lerp_factor: 0.2,
            button_crouch_offset: -1.0,
            roomscale_hand_offset: 0.1,
            origin_scale: 1.5,
            sinking_depth: 2.5,
            vehicle_offset: -0.5,
            crouch_forward_push: 0.55,
        }
    }
}
