//! Applies a remote peer's latest [`RigState`] to its skeleton.
//!
//! Received controller poses are placed under a reconstructed XR origin so the
//! offsets the owner measured locally stay valid. The early update places the
//! origin and head; the late update drives the arm IK targets, honouring hand
//! snaps requested by the interaction system.

use engine_core::{quat_from_euler_degrees, NodeId, SceneGraph, SceneResult, Transform};
use glam::{Quat, Vec3};

use crate::bones::Bones;
use crate::state::{CrouchState, Fingers, Hand, RigState};
use crate::tuning::RigTuning;

/// Calibration of the hand IK target relative to a tracked controller.
const RIGHT_HAND_TARGET_POSITION: Vec3 = Vec3::new(0.0279, 0.0353, -0.0044);
const RIGHT_HAND_TARGET_EULERS: Vec3 = Vec3::new(0.0, 90.0, 168.0);
const LEFT_HAND_TARGET_POSITION: Vec3 = Vec3::new(-0.0279, 0.0353, 0.0044);
const LEFT_HAND_TARGET_EULERS: Vec3 = Vec3::new(0.0, 270.0, 192.0);

/// A hand snapped onto a scene node, e.g. a door handle or ladder rung.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandTargetOverride {
    /// May be despawned at any time; checked every late update.
    pub target: NodeId,
    pub position_offset: Vec3,
    /// Euler degrees applied after the target's rotation.
    pub rotation_offset: Vec3,
}

/// Host-side facts about the player body that the rig placement depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostPlayerState {
    pub in_special_interact_animation: bool,
    pub in_vehicle_animation: bool,
    pub sinking_value: f32,
    pub is_holding_object: bool,
    /// Moving platform the player stands on, if any.
    pub physics_parent: Option<NodeId>,
}

#[derive(Debug)]
struct HandRig {
    controller: NodeId,
    vr_target: NodeId,
    target_override: Option<HandTargetOverride>,
    fingers: Fingers,
}

#[derive(Debug)]
pub struct RigReconciler {
    tuning: RigTuning,
    xr_origin: NodeId,
    left: HandRig,
    right: HandRig,

    camera_eulers: Vec3,
    camera_pos_accounted: Vec3,
    model_offset: Vec3,
    special_animation_offset: Vec3,
    crouch_state: CrouchState,
    crouch_offset: f32,
    rotation_offset: f32,
    camera_floor_offset: f32,

    last_state: Option<RigState>,
}

impl RigReconciler {
    /// Build the XR origin, controller and hand target nodes for one peer.
    pub fn new(scene: &mut SceneGraph, name: &str, tuning: RigTuning) -> SceneResult<Self> {
        let xr_origin = scene.spawn(&format!("XR Origin ({name})"), None)?;

        let hands = spawn_hand(scene, xr_origin, "Left", LEFT_HAND_TARGET_POSITION, LEFT_HAND_TARGET_EULERS).and_then(|left| {
            let right = spawn_hand(scene, xr_origin, "Right", RIGHT_HAND_TARGET_POSITION, RIGHT_HAND_TARGET_EULERS)?;
            Ok((left, right))
        });
        let (left, right) = match hands {
            Ok(hands) => hands,
            Err(e) => {
                scene.despawn(xr_origin).ok();
                return Err(e);
            }
        };

        Ok(Self {
            tuning,
            xr_origin,
            left,
            right,
            camera_eulers: Vec3::ZERO,
            camera_pos_accounted: Vec3::ZERO,
            model_offset: Vec3::ZERO,
            special_animation_offset: Vec3::ZERO,
            crouch_state: CrouchState::None,
            crouch_offset: 0.0,
            rotation_offset: 0.0,
            camera_floor_offset: 0.0,
            last_state: None,
        })
    }

    fn hand(&self, hand: Hand) -> &HandRig {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    fn hand_mut(&mut self, hand: Hand) -> &mut HandRig {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }

    pub fn tuning(&self) -> &RigTuning {
        &self.tuning
    }

    pub fn xr_origin(&self) -> NodeId {
        self.xr_origin
    }

    pub fn controller(&self, hand: Hand) -> NodeId {
        self.hand(hand).controller
    }

    /// The nominal tracked-hand IK target, before any snap.
    pub fn vr_target(&self, hand: Hand) -> NodeId {
        self.hand(hand).vr_target
    }

    pub fn crouch_state(&self) -> CrouchState {
        self.crouch_state
    }

    pub fn crouch_offset(&self) -> f32 {
        self.crouch_offset
    }

    /// The most recently applied packet.
    pub fn last_state(&self) -> Option<&RigState> {
        self.last_state.as_ref()
    }

    pub fn finger_curls(&self, hand: Hand) -> [f32; 5] {
        self.hand(hand).fingers.curls()
    }

    /// Whether tracked finger curls should be applied this frame. The right hand
    /// keeps the host's grip pose while it holds an item.
    pub fn tracks_fingers(&self, hand: Hand, host: &HostPlayerState) -> bool {
        !(hand == Hand::Right && host.is_holding_object)
    }

    pub fn hand_override(&self, hand: Hand) -> Option<HandTargetOverride> {
        self.hand(hand).target_override
    }

    /// Snap `hand` onto `target`, replacing any previous snap. `None` releases it.
    pub fn snap_hand(
        &mut self,
        hand: Hand,
        target: Option<NodeId>,
        position_offset: Option<Vec3>,
        rotation_offset: Option<Vec3>,
    ) {
        self.hand_mut(hand).target_override = target.map(|target| HandTargetOverride {
            target,
            position_offset: position_offset.unwrap_or(Vec3::ZERO),
            rotation_offset: rotation_offset.unwrap_or(Vec3::ZERO),
        });
    }

    pub fn release_hand(&mut self, hand: Hand) {
        self.hand_mut(hand).target_override = None;
    }

    /// Take a freshly received packet. Only the latest one is kept.
    pub fn apply_rig_state(&mut self, scene: &mut SceneGraph, state: &RigState) -> SceneResult<()> {
        for hand in Hand::BOTH {
            let rig = self.hand_mut(hand);
            rig.fingers = state.fingers(hand);
            let controller = rig.controller;
            scene.set_local_pose(
                controller,
                state.hand_position(hand),
                quat_from_euler_degrees(state.hand_eulers(hand)),
            )?;
        }

        self.camera_eulers = state.camera_eulers;
        self.camera_pos_accounted = state.camera_pos_accounted;
        self.model_offset = state.model_offset;
        self.special_animation_offset = state.special_animation_offset;
        self.crouch_state = state.crouch_state;
        self.rotation_offset = state.rotation_offset;
        self.camera_floor_offset = state.camera_floor_offset;
        self.last_state = Some(*state);
        Ok(())
    }

    /// Place the XR origin, the visual model and the head for this frame.
    pub fn early_update(&mut self, scene: &mut SceneGraph, bones: &Bones, host: &HostPlayerState) -> SceneResult<()> {
        let t = self.tuning;

        // Frame-rate dependent smoothing, kept as-is to match other clients.
        let crouch_target = match self.crouch_state {
            CrouchState::Button => t.button_crouch_offset,
            _ => 0.0,
        };
        self.crouch_offset += (crouch_target - self.crouch_offset) * t.crouch_lerp_factor;

        let player = scene.world_transform(bones.root)?;
        let p = player.position;

        let mut origin = if !host.in_special_interact_animation {
            let model_local = player.inverse_transform_point(p + self.model_offset)
                + Vec3::NEG_Y * (t.sinking_depth * host.sinking_value);
            scene.set_local_position(bones.model, model_local)?;

            Vec3::new(
                p.x + (self.model_offset.x - self.camera_pos_accounted.x) * t.origin_scale,
                p.y,
                p.z + (self.model_offset.z - self.camera_pos_accounted.z) * t.origin_scale,
            )
        } else {
            // Special animations move the body themselves; keep 6DOF for the hands only.
            scene.set_local_position(bones.model, Vec3::ZERO)?;
            p + self.special_animation_offset
        };

        let vehicle = if host.in_vehicle_animation { t.vehicle_offset } else { 0.0 };
        origin.y += self.camera_floor_offset + self.crouch_offset - host.sinking_value * t.sinking_depth + vehicle;

        if self.crouch_state != CrouchState::None {
            origin += player.forward() * t.crouch_forward_push;
        }

        scene.set_local(
            self.xr_origin,
            Transform {
                position: origin,
                rotation: quat_from_euler_degrees(Vec3::new(0.0, self.rotation_offset, 0.0)),
                scale: Vec3::splat(t.origin_scale),
            },
        )?;

        scene.set_world_rotation(bones.camera, quat_from_euler_degrees(self.camera_eulers))
    }

    /// Drive both arm IK targets, breaking snaps whose target vanished or drifted away.
    pub fn late_update(&mut self, scene: &mut SceneGraph, bones: &Bones) -> SceneResult<()> {
        let lift = match self.crouch_state {
            CrouchState::Roomscale => self.tuning.roomscale_hand_offset,
            _ => 0.0,
        };
        let position_offset = Vec3::new(0.0, lift, 0.0);

        for hand in Hand::BOTH {
            self.update_hand(scene, hand, bones.arm(hand).rig_target, position_offset)?;
        }
        Ok(())
    }

    fn update_hand(&mut self, scene: &mut SceneGraph, hand: Hand, rig_target: NodeId, position_offset: Vec3) -> SceneResult<()> {
        let break_distance = self.tuning.snap_break_distance;
        let rig = self.hand_mut(hand);
        let nominal = scene.world_transform(rig.vr_target)?;

        if let Some(snap) = rig.target_override {
            if !scene.contains(snap.target) {
                log::warn!("{:?} hand override target despawned", hand);
                rig.target_override = None;
            } else {
                let target = scene.world_transform(snap.target)?;
                if snap_broken(target.position, nominal.position, break_distance) {
                    log::debug!("{:?} hand snap broken", hand);
                    rig.target_override = None;
                }
            }
        }

        let (position, rotation): (Vec3, Quat) = match rig.target_override {
            Some(snap) => {
                let target = scene.world_transform(snap.target)?;
                (
                    target.transform_point(snap.position_offset),
                    target.rotation * quat_from_euler_degrees(snap.rotation_offset),
                )
            }
            None => (nominal.position + position_offset, nominal.rotation),
        };

        scene.set_world_pose(rig_target, position, rotation)
    }

    /// Remove every node this reconciler created.
    pub fn teardown(self, scene: &mut SceneGraph) {
        scene.despawn(self.xr_origin).ok();
    }
}

/// A snap holds up to and including `break_distance` of drift.
fn snap_broken(target: Vec3, nominal: Vec3, break_distance: f32) -> bool {
    target.distance(nominal) > break_distance
}

fn spawn_hand(scene: &mut SceneGraph, origin: NodeId, side: &str, position: Vec3, eulers: Vec3) -> SceneResult<HandRig> {
    let controller = scene.spawn(&format!("{side} Controller"), Some(origin))?;
    let vr_target = scene.spawn(&format!("{side} Hand VR Target"), Some(controller))?;
    scene.set_local_pose(vr_target, position, quat_from_euler_degrees(eulers))?;
    Ok(HandRig {
        controller,
        vr_target,
        target_override: None,
        fingers: Fingers::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    fn setup() -> (SceneGraph, Bones, RigReconciler) {
        let mut scene = SceneGraph::new();
        let bones = Bones::spawn_humanoid(&mut scene, "Player").unwrap();
        let rig = RigReconciler::new(&mut scene, "Player", RigTuning::default()).unwrap();
        (scene, bones, rig)
    }

    fn tick(scene: &mut SceneGraph, bones: &Bones, rig: &mut RigReconciler) {
        rig.early_update(scene, bones, &HostPlayerState::default()).unwrap();
        rig.late_update(scene, bones).unwrap();
    }

    fn rig_state(right: Vec3) -> RigState {
        RigState {
            left_hand_position: Vec3::new(-0.3, 1.0, 0.2),
            right_hand_position: right,
            ..Default::default()
        }
    }

    #[test]
    fn unsnapped_hand_follows_tracked_target() {
        let (mut scene, bones, mut rig) = setup();
        rig.apply_rig_state(&mut scene, &rig_state(Vec3::new(0.3, 1.0, 0.2))).unwrap();
        tick(&mut scene, &bones, &mut rig);

        let nominal = scene.world_transform(rig.vr_target(Hand::Right)).unwrap();
        let driven = scene.world_transform(bones.right.rig_target).unwrap();
        assert!(approx(driven.position, nominal.position));
        assert!(driven.rotation.angle_between(nominal.rotation) < 1e-3);
    }

    #[test]
    fn roomscale_crouch_lifts_hands() {
        let (mut scene, bones, mut rig) = setup();
        let mut state = rig_state(Vec3::new(0.3, 0.8, 0.2));
        state.crouch_state = CrouchState::Roomscale;
        rig.apply_rig_state(&mut scene, &state).unwrap();
        tick(&mut scene, &bones, &mut rig);

        let nominal = scene.world_transform(rig.vr_target(Hand::Left)).unwrap();
        let driven = scene.world_transform(bones.left.rig_target).unwrap();
        assert!(approx(driven.position, nominal.position + Vec3::new(0.0, 0.1, 0.0)));
    }

    #[test]
    fn snap_applies_within_range_and_breaks_beyond_it() {
        let (mut scene, bones, mut rig) = setup();
        rig.apply_rig_state(&mut scene, &rig_state(Vec3::new(0.3, 1.0, 0.2))).unwrap();
        tick(&mut scene, &bones, &mut rig);

        let nominal = scene.world_transform(rig.vr_target(Hand::Right)).unwrap().position;
        let handle = scene.spawn("Door Handle", None).unwrap();
        scene
            .set_local_pose(handle, nominal + Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_y(0.5))
            .unwrap();

        rig.snap_hand(Hand::Right, Some(handle), Some(Vec3::new(0.0, 0.0, 0.1)), None);
        tick(&mut scene, &bones, &mut rig);

        let expected = scene.transform_point(handle, Vec3::new(0.0, 0.0, 0.1)).unwrap();
        let driven = scene.world_transform(bones.right.rig_target).unwrap();
        assert!(approx(driven.position, expected));
        assert!(driven.rotation.angle_between(Quat::from_rotation_y(0.5)) < 1e-3);
        assert!(rig.hand_override(Hand::Right).is_some());

        // Pull the handle 2.5 units away: the snap breaks and tracking resumes.
        scene.set_local_position(handle, nominal + Vec3::new(2.5, 0.0, 0.0)).unwrap();
        tick(&mut scene, &bones, &mut rig);

        assert!(rig.hand_override(Hand::Right).is_none());
        let nominal = scene.world_transform(rig.vr_target(Hand::Right)).unwrap();
        let driven = scene.world_transform(bones.right.rig_target).unwrap();
        assert!(approx(driven.position, nominal.position));

        // Stays broken even if the handle comes back.
        scene.set_local_position(handle, nominal.position).unwrap();
        tick(&mut scene, &bones, &mut rig);
        assert!(rig.hand_override(Hand::Right).is_none());
    }

    #[test]
    fn snap_just_inside_break_distance_holds() {
        let (mut scene, bones, mut rig) = setup();
        tick(&mut scene, &bones, &mut rig);
        let nominal = scene.world_transform(rig.vr_target(Hand::Left)).unwrap().position;
        let rung = scene.spawn("Ladder Rung", None).unwrap();
        scene.set_local_position(rung, nominal + Vec3::new(0.0, 1.99, 0.0)).unwrap();

        rig.snap_hand(Hand::Left, Some(rung), None, None);
        tick(&mut scene, &bones, &mut rig);
        assert!(rig.hand_override(Hand::Left).is_some());
    }

    #[test]
    fn snap_holds_at_exactly_break_distance() {
        let nominal = Vec3::new(1.0, 1.0, -3.0);
        assert!(!snap_broken(nominal + Vec3::new(0.0, 2.0, 0.0), nominal, 2.0));
        assert!(!snap_broken(nominal - Vec3::new(2.0, 0.0, 0.0), nominal, 2.0));
        assert!(snap_broken(nominal + Vec3::new(0.0, 0.0, 2.001), nominal, 2.0));
    }

    #[test]
    fn despawned_target_clears_snap_and_other_hand_still_updates() {
        let (mut scene, bones, mut rig) = setup();
        rig.apply_rig_state(&mut scene, &rig_state(Vec3::new(0.3, 1.0, 0.2))).unwrap();
        tick(&mut scene, &bones, &mut rig);

        let nominal = scene.world_transform(rig.vr_target(Hand::Left)).unwrap().position;
        let lever = scene.spawn("Lever", None).unwrap();
        scene.set_local_position(lever, nominal).unwrap();
        rig.snap_hand(Hand::Left, Some(lever), None, None);
        tick(&mut scene, &bones, &mut rig);
        assert!(rig.hand_override(Hand::Left).is_some());

        scene.despawn(lever).unwrap();
        rig.apply_rig_state(&mut scene, &rig_state(Vec3::new(0.5, 1.3, 0.1))).unwrap();
        tick(&mut scene, &bones, &mut rig);

        assert!(rig.hand_override(Hand::Left).is_none());
        for hand in Hand::BOTH {
            let nominal = scene.world_transform(rig.vr_target(hand)).unwrap();
            let driven = scene.world_transform(bones.arm(hand).rig_target).unwrap();
            assert!(approx(driven.position, nominal.position));
        }
    }

    #[test]
    fn new_snap_replaces_previous() {
        let (mut scene, _bones, mut rig) = setup();
        let a = scene.spawn("a", None).unwrap();
        let b = scene.spawn("b", None).unwrap();
        rig.snap_hand(Hand::Right, Some(a), None, None);
        rig.snap_hand(Hand::Right, Some(b), Some(Vec3::X), None);
        let snap = rig.hand_override(Hand::Right).unwrap();
        assert_eq!(snap.target, b);
        assert_eq!(snap.position_offset, Vec3::X);

        rig.snap_hand(Hand::Right, None, None, None);
        assert!(rig.hand_override(Hand::Right).is_none());
    }

    #[test]
    fn crouch_offset_converges_monotonically() {
        let (mut scene, bones, mut rig) = setup();
        let mut state = RigState { crouch_state: CrouchState::Button, ..Default::default() };
        rig.apply_rig_state(&mut scene, &state).unwrap();

        let mut previous = rig.crouch_offset();
        for _ in 0..60 {
            tick(&mut scene, &bones, &mut rig);
            assert!(rig.crouch_offset() < previous);
            assert!(rig.crouch_offset() >= -1.0);
            previous = rig.crouch_offset();
        }
        assert!((rig.crouch_offset() + 1.0).abs() < 1e-3);
        // One step is exactly a 0.2 lerp from rest.
        let (mut scene2, bones2, mut rig2) = setup();
        rig2.apply_rig_state(&mut scene2, &state).unwrap();
        tick(&mut scene2, &bones2, &mut rig2);
        assert!((rig2.crouch_offset() + 0.2).abs() < 1e-6);

        for crouch in [CrouchState::Roomscale, CrouchState::None] {
            state.crouch_state = CrouchState::Button;
            rig.apply_rig_state(&mut scene, &state).unwrap();
            for _ in 0..30 {
                tick(&mut scene, &bones, &mut rig);
            }
            state.crouch_state = crouch;
            rig.apply_rig_state(&mut scene, &state).unwrap();
            let mut previous = rig.crouch_offset();
            for _ in 0..60 {
                tick(&mut scene, &bones, &mut rig);
                assert!(rig.crouch_offset() > previous);
                assert!(rig.crouch_offset() <= 0.0);
                previous = rig.crouch_offset();
            }
            assert!(rig.crouch_offset().abs() < 1e-3);
        }
    }

    #[test]
    fn origin_tracks_player_with_offsets() {
        let (mut scene, bones, mut rig) = setup();
        scene.set_local_position(bones.root, Vec3::new(10.0, 0.0, 5.0)).unwrap();
        let state = RigState {
            model_offset: Vec3::new(0.2, 0.0, 0.0),
            camera_pos_accounted: Vec3::new(0.1, 1.7, -0.2),
            camera_floor_offset: 0.3,
            rotation_offset: 90.0,
            ..Default::default()
        };
        rig.apply_rig_state(&mut scene, &state).unwrap();
        rig.early_update(&mut scene, &bones, &HostPlayerState { sinking_value: 0.1, ..Default::default() })
            .unwrap();

        let origin = scene.world_transform(rig.xr_origin()).unwrap();
        let expected = Vec3::new(10.0 + (0.2 - 0.1) * 1.5, 0.3 - 0.25, 5.0 + (0.0 + 0.2) * 1.5);
        assert!(approx(origin.position, expected));
        assert!(approx(origin.scale, Vec3::splat(1.5)));
        assert!(origin.rotation.angle_between(Quat::from_rotation_y(90f32.to_radians())) < 1e-4);

        let model = scene.local(bones.model).unwrap();
        assert!(approx(model.position, Vec3::new(0.2, -0.25, 0.0)));
    }

    #[test]
    fn special_animation_pins_origin_to_offset() {
        let (mut scene, bones, mut rig) = setup();
        scene.set_local_position(bones.root, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let state = RigState {
            model_offset: Vec3::new(5.0, 0.0, 5.0),
            special_animation_offset: Vec3::new(0.0, 0.5, 0.0),
            ..Default::default()
        };
        rig.apply_rig_state(&mut scene, &state).unwrap();
        let host = HostPlayerState { in_special_interact_animation: true, in_vehicle_animation: true, ..Default::default() };
        rig.early_update(&mut scene, &bones, &host).unwrap();

        let origin = scene.world_transform(rig.xr_origin()).unwrap();
        assert!(approx(origin.position, Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(scene.local(bones.model).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn camera_takes_received_world_rotation() {
        let (mut scene, bones, mut rig) = setup();
        scene
            .set_local_pose(bones.root, Vec3::ZERO, Quat::from_rotation_y(1.0))
            .unwrap();
        let state = RigState { camera_eulers: Vec3::new(15.0, 30.0, 0.0), ..Default::default() };
        rig.apply_rig_state(&mut scene, &state).unwrap();
        rig.early_update(&mut scene, &bones, &HostPlayerState::default()).unwrap();

        let camera = scene.world_transform(bones.camera).unwrap();
        assert!(camera.rotation.angle_between(quat_from_euler_degrees(state.camera_eulers)) < 1e-3);
    }

    #[test]
    fn latest_packet_wins() {
        let (mut scene, bones, mut rig) = setup();
        let packets: Vec<RigState> = (0..5)
            .map(|i| RigState {
                right_hand_position: Vec3::new(0.1 * i as f32, 1.0, 0.0),
                right_hand_fingers: Fingers { index: i as u8 * 40, ..Default::default() },
                rotation_offset: i as f32 * 10.0,
                ..Default::default()
            })
            .collect();

        for packet in &packets {
            rig.apply_rig_state(&mut scene, packet).unwrap();
            tick(&mut scene, &bones, &mut rig);
        }

        let last = packets.last().unwrap();
        assert_eq!(rig.last_state(), Some(last));
        assert!(approx(scene.local(rig.controller(Hand::Right)).unwrap().position, last.right_hand_position));
        assert!((rig.finger_curls(Hand::Right)[1] - 160.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn right_hand_curls_pause_while_holding() {
        let (_scene, _bones, rig) = setup();
        let holding = HostPlayerState { is_holding_object: true, ..Default::default() };
        assert!(rig.tracks_fingers(Hand::Left, &holding));
        assert!(!rig.tracks_fingers(Hand::Right, &holding));
        assert!(rig.tracks_fingers(Hand::Right, &HostPlayerState::default()));
    }
}
