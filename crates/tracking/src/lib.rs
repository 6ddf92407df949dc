//! Local VR device state and packet sampling.
//!
//! The host feeds head, controller, finger and crouch-button events each frame;
//! [`TrackingState::sample_rig`] turns the accumulated state into the record
//! broadcast on the local peer's rig channel.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vr_rig::{CrouchState, Fingers, Hand, RigState, SpectatorRigState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// A tracked device pose. Eulers are in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedPose {
    pub position: Vec3,
    pub eulers: Vec3,
}

impl TrackedPose {
    pub fn new(position: Vec3, eulers: Vec3) -> Self {
        Self { position, eulers }
    }
}

/// Body offsets computed by the host's local player controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RigOffsets {
    pub camera_pos_accounted: Vec3,
    pub model_offset: Vec3,
    pub special_animation_offset: Vec3,
    pub rotation_offset: f32,
    pub camera_floor_offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingTuning {
    /// Calibrated head height when standing, in tracked space.
    pub standing_height: f32,
    /// Head below this fraction of the standing height counts as a physical crouch.
    pub roomscale_crouch_ratio: f32,
}

impl Default for TrackingTuning {
    fn default() -> Self {
        Self {
            standing_height: 1.7,
            roomscale_crouch_ratio: 0.75,
        }
    }
}

/// Manages local tracking state for the current frame.
#[derive(Debug, Default)]
pub struct TrackingState {
    tuning: TrackingTuning,

    /// Headset pose in tracked space.
    head: TrackedPose,
    /// Controller poses, left then right.
    controllers: [TrackedPose; 2],
    fingers: [Fingers; 2],

    /// Crouch button currently held.
    crouch_held: bool,
    /// Crouch button pressed this frame.
    crouch_pressed: bool,

    offsets: RigOffsets,

    /// Last record handed out by `sample_rig`.
    last_sample: Option<RigState>,
}

fn slot(hand: Hand) -> usize {
    match hand {
        Hand::Left => 0,
        Hand::Right => 1,
    }
}

impl TrackingState {
    pub fn new(tuning: TrackingTuning) -> Self {
        Self { tuning, ..Default::default() }
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.crouch_pressed = false;
    }

    pub fn process_head_pose(&mut self, pose: TrackedPose) {
        self.head = pose;
    }

    pub fn process_controller_pose(&mut self, hand: Hand, pose: TrackedPose) {
        self.controllers[slot(hand)] = pose;
    }

    /// Finger curls in `[0, 1]`, thumb first.
    pub fn process_finger_curls(&mut self, hand: Hand, curls: [f32; 5]) {
        self.fingers[slot(hand)] = Fingers::from_curls(curls);
    }

    /// Process a crouch button event. Ignored while physically crouching.
    pub fn process_crouch_button(&mut self, state: ButtonState) {
        match state {
            ButtonState::Pressed => {
                if self.is_room_crouching() {
                    log::trace!("Ignoring crouch button while roomscale crouching");
                    return;
                }
                if !self.crouch_held {
                    self.crouch_pressed = true;
                }
                self.crouch_held = true;
            }
            ButtonState::Released => {
                self.crouch_held = false;
            }
        }
    }

    pub fn set_offsets(&mut self, offsets: RigOffsets) {
        self.offsets = offsets;
    }

    /// Take the current head height as the standing height.
    pub fn calibrate_height(&mut self) {
        if self.head.position.y > 0.0 {
            log::info!("Calibrated standing height to {:.2}", self.head.position.y);
            self.tuning.standing_height = self.head.position.y;
        }
    }

    // Query methods

    pub fn tuning(&self) -> &TrackingTuning {
        &self.tuning
    }

    pub fn head(&self) -> TrackedPose {
        self.head
    }

    pub fn controller(&self, hand: Hand) -> TrackedPose {
        self.controllers[slot(hand)]
    }

    /// Check if the head is low enough to count as a physical crouch.
    pub fn is_room_crouching(&self) -> bool {
        self.head.position.y < self.tuning.standing_height * self.tuning.roomscale_crouch_ratio
    }

    /// Check if the crouch button was pressed this frame.
    pub fn is_crouch_pressed(&self) -> bool {
        self.crouch_pressed
    }

    pub fn crouch_state(&self) -> CrouchState {
        if self.is_room_crouching() {
            CrouchState::Roomscale
        } else if self.crouch_held {
            CrouchState::Button
        } else {
            CrouchState::None
        }
    }

    fn current_rig(&self) -> RigState {
        let [left, right] = self.controllers;
        let [left_fingers, right_fingers] = self.fingers;
        RigState {
            left_hand_position: left.position,
            left_hand_eulers: left.eulers,
            left_hand_fingers: left_fingers,
            right_hand_position: right.position,
            right_hand_eulers: right.eulers,
            right_hand_fingers: right_fingers,
            camera_eulers: self.head.eulers,
            camera_pos_accounted: self.offsets.camera_pos_accounted,
            model_offset: self.offsets.model_offset,
            special_animation_offset: self.offsets.special_animation_offset,
            crouch_state: self.crouch_state(),
            rotation_offset: self.offsets.rotation_offset,
            camera_floor_offset: self.offsets.camera_floor_offset,
        }
    }

    /// Check if the rig differs from the last sampled record.
    pub fn rig_changed(&self) -> bool {
        self.last_sample != Some(self.current_rig())
    }

    /// Build this frame's rig record and remember it.
    pub fn sample_rig(&mut self) -> RigState {
        let rig = self.current_rig();
        self.last_sample = Some(rig);
        rig
    }

    /// Build the ghost record streamed while the local player is dead.
    pub fn sample_spectator(&self, parented_to_ship: bool) -> SpectatorRigState {
        let [left, right] = self.controllers;
        SpectatorRigState {
            head_position: self.head.position,
            head_rotation: self.head.eulers,
            left_hand_position: left.position,
            left_hand_rotation: left.eulers,
            right_hand_position: right.position,
            right_hand_rotation: right.eulers,
            parented_to_ship,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing() -> TrackingState {
        let mut tracking = TrackingState::new(TrackingTuning::default());
        tracking.process_head_pose(TrackedPose::new(Vec3::new(0.0, 1.7, 0.0), Vec3::ZERO));
        tracking
    }

    #[test]
    fn crouch_state_derivation() {
        let mut tracking = standing();
        assert_eq!(tracking.crouch_state(), CrouchState::None);

        tracking.process_crouch_button(ButtonState::Pressed);
        assert!(tracking.is_crouch_pressed());
        assert_eq!(tracking.crouch_state(), CrouchState::Button);

        tracking.begin_frame();
        assert!(!tracking.is_crouch_pressed());
        tracking.process_crouch_button(ButtonState::Released);
        assert_eq!(tracking.crouch_state(), CrouchState::None);

        // 1.2 < 0.75 * 1.7
        tracking.process_head_pose(TrackedPose::new(Vec3::new(0.0, 1.2, 0.0), Vec3::ZERO));
        assert_eq!(tracking.crouch_state(), CrouchState::Roomscale);
    }

    #[test]
    fn crouch_button_ignored_while_room_crouching() {
        let mut tracking = standing();
        tracking.process_head_pose(TrackedPose::new(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO));
        tracking.process_crouch_button(ButtonState::Pressed);
        assert!(!tracking.is_crouch_pressed());

        tracking.process_head_pose(TrackedPose::new(Vec3::new(0.0, 1.7, 0.0), Vec3::ZERO));
        assert_eq!(tracking.crouch_state(), CrouchState::None);
    }

    #[test]
    fn calibration_moves_the_crouch_threshold() {
        let mut tracking = TrackingState::new(TrackingTuning::default());
        tracking.process_head_pose(TrackedPose::new(Vec3::new(0.0, 1.2, 0.0), Vec3::ZERO));
        assert!(tracking.is_room_crouching());
        tracking.calibrate_height();
        assert!(!tracking.is_room_crouching());
        assert_eq!(tracking.tuning().standing_height, 1.2);
    }

    #[test]
    fn sample_rig_maps_devices_and_offsets() {
        let mut tracking = standing();
        let left = TrackedPose::new(Vec3::new(-0.3, 1.1, 0.2), Vec3::new(0.0, 10.0, 0.0));
        let right = TrackedPose::new(Vec3::new(0.3, 1.1, 0.2), Vec3::new(0.0, -10.0, 0.0));
        tracking.process_controller_pose(Hand::Left, left);
        tracking.process_controller_pose(Hand::Right, right);
        tracking.process_finger_curls(Hand::Right, [1.0, 0.0, 0.0, 0.0, 0.5]);
        tracking.set_offsets(RigOffsets { rotation_offset: 30.0, camera_floor_offset: 0.1, ..Default::default() });

        let rig = tracking.sample_rig();
        assert_eq!(rig.left_hand_position, left.position);
        assert_eq!(rig.right_hand_eulers, right.eulers);
        assert_eq!(rig.right_hand_fingers.thumb, 255);
        assert_eq!(rig.right_hand_fingers.pinky, 128);
        assert_eq!(rig.left_hand_fingers, Fingers::default());
        assert_eq!(rig.rotation_offset, 30.0);
        assert_eq!(rig.crouch_state, CrouchState::None);
    }

    #[test]
    fn rig_changed_tracks_last_sample() {
        let mut tracking = standing();
        assert!(tracking.rig_changed());
        tracking.sample_rig();
        assert!(!tracking.rig_changed());

        tracking.process_controller_pose(Hand::Left, TrackedPose::new(Vec3::X, Vec3::ZERO));
        assert!(tracking.rig_changed());
        tracking.sample_rig();
        assert!(!tracking.rig_changed());
    }

    #[test]
    fn spectator_sample_uses_head_pose() {
        let mut tracking = standing();
        tracking.process_head_pose(TrackedPose::new(Vec3::new(0.1, 1.6, 0.0), Vec3::new(0.0, 45.0, 0.0)));
        let ghost = tracking.sample_spectator(true);
        assert_eq!(ghost.head_position, Vec3::new(0.1, 1.6, 0.0));
        assert_eq!(ghost.head_rotation.y, 45.0);
        assert!(ghost.parented_to_ship);
    }
}
