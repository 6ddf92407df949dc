//! Skeleton nodes of a player model that the VR rig drives.
//!
//! The host owns the skeleton; it hands over the node ids it wants driven.
//! [`Bones::spawn_humanoid`] builds a stand-in skeleton for simulations and tests.

use engine_core::{NodeId, SceneGraph, SceneResult};
use glam::Vec3;

use crate::state::Hand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmBones {
    pub upper: NodeId,
    pub lower: NodeId,
    pub hand: NodeId,
    /// IK target the host's arm constraint follows.
    pub rig_target: NodeId,
    /// IK hint (elbow pole) of the host's arm constraint.
    pub rig_hint: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bones {
    /// Player root, moved by the host's character controller.
    pub root: NodeId,
    /// Visual model under the root, offset to follow the tracked body.
    pub model: NodeId,
    /// Head camera.
    pub camera: NodeId,
    pub left: ArmBones,
    pub right: ArmBones,
}

impl Bones {
    pub fn arm(&self, hand: Hand) -> &ArmBones {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    /// Spawn a minimal humanoid: root → model → {camera, arms, rig targets}.
    pub fn spawn_humanoid(scene: &mut SceneGraph, name: &str) -> SceneResult<Self> {
        let root = scene.spawn(name, None)?;
        let model = scene.spawn("Model", Some(root))?;
        let camera = scene.spawn("MainCamera", Some(model))?;
        scene.set_local_position(camera, Vec3::new(0.0, 1.6, 0.0))?;

        let left = spawn_arm(scene, model, "Left", -1.0)?;
        let right = spawn_arm(scene, model, "Right", 1.0)?;

        Ok(Self { root, model, camera, left, right })
    }
}

fn spawn_arm(scene: &mut SceneGraph, model: NodeId, side: &str, sign: f32) -> SceneResult<ArmBones> {
    let upper = scene.spawn(&format!("{side}UpperArm"), Some(model))?;
    scene.set_local_position(upper, Vec3::new(0.2 * sign, 1.45, 0.0))?;
    let lower = scene.spawn(&format!("{side}LowerArm"), Some(upper))?;
    scene.set_local_position(lower, Vec3::new(0.0, -0.28, 0.0))?;
    let hand = scene.spawn(&format!("{side}Hand"), Some(lower))?;
    scene.set_local_position(hand, Vec3::new(0.0, -0.26, 0.0))?;

    let rig = scene.spawn(&format!("{side}ArmRig"), Some(model))?;
    let rig_target = scene.spawn(&format!("{side}ArmRigTarget"), Some(rig))?;
    let rig_hint = scene.spawn(&format!("{side}ArmRigHint"), Some(rig))?;

    Ok(ArmBones { upper, lower, hand, rig_target, rig_hint })
}
