//! Two-bone arm IK wiring.
//!
//! The constraint math belongs to the host engine; this module only builds the
//! chains and hands them to an [`IkSolver`] once per late update.

use engine_core::{NodeId, SceneGraph, SceneResult, Transform};
use glam::Vec3;

use crate::bones::Bones;
use crate::state::Hand;

/// Calibrated elbow hint positions, local to the arm rig.
const LEFT_HINT_POSITION: Vec3 = Vec3::new(-10.0, -2.0, -1.0);
const RIGHT_HINT_POSITION: Vec3 = Vec3::new(12.5, -2.0, -1.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkWeights {
    /// Overall constraint weight.
    pub weight: f32,
    pub target_position_weight: f32,
    pub target_rotation_weight: f32,
    pub hint_weight: f32,
    /// Weight left on the host's own hint-less arm chain.
    pub vanilla_chain_weight: f32,
}

impl IkWeights {
    /// Tracked hands fully own the arms.
    pub const VR: Self = Self {
        weight: 1.0,
        target_position_weight: 1.0,
        target_rotation_weight: 1.0,
        hint_weight: 1.0,
        vanilla_chain_weight: 0.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoBoneChain {
    pub root: NodeId,
    pub mid: NodeId,
    pub tip: NodeId,
    pub target: NodeId,
    pub hint: NodeId,
}

/// Host-provided two-bone IK solver.
pub trait IkSolver {
    fn solve_two_bone_ik(&mut self, scene: &mut SceneGraph, chain: &TwoBoneChain, weights: &IkWeights);
}

#[derive(Debug)]
pub struct VrArmRig {
    left: CalibratedArm,
    right: CalibratedArm,
}

impl VrArmRig {
    /// Build both arm chains, creating a dedicated hint node per arm.
    ///
    /// The host's own rig hints are moved to the calibrated positions until
    /// [`VrArmRig::teardown`]. On error the scene is left as it was.
    pub fn build(scene: &mut SceneGraph, bones: &Bones) -> SceneResult<Self> {
        let left = CalibratedArm::build(scene, bones, Hand::Left, LEFT_HINT_POSITION)?;
        let right = match CalibratedArm::build(scene, bones, Hand::Right, RIGHT_HINT_POSITION) {
            Ok(arm) => arm,
            Err(e) => {
                left.restore(scene);
                return Err(e);
            }
        };
        Ok(Self { left, right })
    }

    pub fn chain(&self, hand: Hand) -> &TwoBoneChain {
        match hand {
            Hand::Left => &self.left.chain,
            Hand::Right => &self.right.chain,
        }
    }

    pub fn weights(&self) -> IkWeights {
        IkWeights::VR
    }

    pub fn solve(&self, scene: &mut SceneGraph, solver: &mut dyn IkSolver) {
        let weights = self.weights();
        for hand in Hand::BOTH {
            solver.solve_two_bone_ik(scene, self.chain(hand), &weights);
        }
    }

    /// Despawn the created hint nodes and put the host's rig hints back.
    pub fn teardown(self, scene: &mut SceneGraph) {
        self.left.restore(scene);
        self.right.restore(scene);
    }
}

#[derive(Debug)]
struct CalibratedArm {
    chain: TwoBoneChain,
    host_hint: NodeId,
    host_hint_local: Transform,
}

impl CalibratedArm {
    fn build(scene: &mut SceneGraph, bones: &Bones, hand: Hand, hint_position: Vec3) -> SceneResult<Self> {
        let arm = bones.arm(hand);
        let parent = scene.parent(arm.rig_hint)?;
        let host_hint_local = scene.local(arm.rig_hint)?;

        let side = match hand {
            Hand::Left => "Left",
            Hand::Right => "Right",
        };
        let hint = scene.spawn(&format!("VR {side} Arm Rig Hint"), parent)?;
        let calibrated = Transform { position: hint_position, ..host_hint_local };
        if let Err(e) = scene
            .set_local(hint, calibrated)
            .and_then(|()| scene.set_local(arm.rig_hint, calibrated))
        {
            scene.despawn(hint).ok();
            return Err(e);
        }

        Ok(Self {
            chain: TwoBoneChain {
                root: arm.upper,
                mid: arm.lower,
                tip: arm.hand,
                target: arm.rig_target,
                hint,
            },
            host_hint: arm.rig_hint,
            host_hint_local,
        })
    }

    fn restore(self, scene: &mut SceneGraph) {
        scene.despawn(self.chain.hint).ok();
        if scene.set_local(self.host_hint, self.host_hint_local).is_err() {
            log::debug!("rig hint {:?} is gone, nothing to restore", self.host_hint);
        }
    }
}
