//! Simplified head-and-hands stand-in shown for a dead peer.

use engine_core::{quat_from_euler_degrees, NodeId, SceneGraph, SceneResult, Transform};
use glam::Vec3;

use crate::state::SpectatorRigState;

/// Candidate parents for a ghost, resolved per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostParents {
    /// Moving platform the peer currently stands on, if any.
    pub physics_parent: Option<NodeId>,
    pub ship: NodeId,
    pub default_container: NodeId,
}

impl GhostParents {
    /// A physics parent that no longer exists is skipped.
    pub fn resolve(&self, scene: &SceneGraph, parented_to_ship: bool) -> NodeId {
        match self.physics_parent.filter(|parent| scene.contains(*parent)) {
            Some(parent) => parent,
            None if parented_to_ship => self.ship,
            None => self.default_container,
        }
    }
}

#[derive(Debug)]
pub struct SpectatorGhost {
    root: NodeId,
    head: NodeId,
    left_hand: NodeId,
    right_hand: NodeId,
    billboard: NodeId,
    applied_parent: Option<NodeId>,
    visible: bool,
    label_alpha: f32,
    fade_rate: f32,
}

impl SpectatorGhost {
    /// Spawn a hidden ghost for `username`. The label fades at `fade_rate` alpha per second.
    pub fn spawn(scene: &mut SceneGraph, username: &str, fade_rate: f32) -> SceneResult<Self> {
        let root = scene.spawn(&format!("Spectating Player: {username}"), None)?;
        let head = scene.spawn("Head", Some(root))?;
        let left_hand = scene.spawn("Hand.L", Some(root))?;
        let right_hand = scene.spawn("Hand.R", Some(root))?;
        let billboard = scene.spawn("Username", Some(head))?;
        scene.set_local_position(billboard, Vec3::new(0.0, 0.35, 0.0))?;
        scene.set_subtree_visible(root, false)?;

        Ok(Self {
            root,
            head,
            left_hand,
            right_hand,
            billboard,
            applied_parent: None,
            visible: false,
            label_alpha: 0.0,
            fade_rate,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn billboard(&self) -> NodeId {
        self.billboard
    }

    pub fn applied_parent(&self) -> Option<NodeId> {
        self.applied_parent
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn label_alpha(&self) -> f32 {
        self.label_alpha
    }

    /// Apply a received ghost pose. Returns whether the ghost was re-parented.
    ///
    /// Head and hand poses are written even when re-parenting fails.
    pub fn apply(&mut self, scene: &mut SceneGraph, state: &SpectatorRigState, parents: &GhostParents) -> SceneResult<bool> {
        if !scene.contains(self.root) {
            return Ok(false);
        }

        let parent = parents.resolve(scene, state.parented_to_ship);
        let mut reparented = false;
        if self.applied_parent != Some(parent) {
            match scene.set_parent(self.root, Some(parent), true) {
                Ok(()) => {
                    log::debug!("ghost {:?} re-parented to {:?}", self.root, parent);
                    scene.set_local(self.root, Transform::IDENTITY)?;
                    self.applied_parent = Some(parent);
                    reparented = true;
                }
                Err(e) => log::warn!("ghost {:?} kept its parent: {}", self.root, e),
            }
        }

        let poses = [
            (self.head, state.head_position, state.head_rotation),
            (self.left_hand, state.left_hand_position, state.left_hand_rotation),
            (self.right_hand, state.right_hand_position, state.right_hand_rotation),
        ];
        for (node, position, eulers) in poses {
            scene.set_local_pose(node, position, quat_from_euler_degrees(eulers))?;
        }
        Ok(reparented)
    }

    pub fn show(&mut self, scene: &mut SceneGraph) {
        if scene.set_subtree_visible(self.root, true).is_ok() {
            self.visible = true;
        }
    }

    /// Hide the ghost and its name label.
    pub fn hide(&mut self, scene: &mut SceneGraph) {
        if scene.set_subtree_visible(self.root, false).is_ok() {
            self.visible = false;
            self.label_alpha = 0.0;
        }
    }

    /// Raise the name label to full opacity. Ignored unless the owner is dead.
    pub fn show_name_billboard(&mut self, owner_dead: bool) {
        if owner_dead {
            self.label_alpha = 1.0;
        }
    }

    /// Fade the name label.
    pub fn update(&mut self, dt: f32) {
        self.label_alpha = (self.label_alpha - self.fade_rate * dt).max(0.0);
    }

    /// Turn the name label toward the local viewer.
    pub fn face_viewer(&self, scene: &mut SceneGraph, viewer: Vec3) -> SceneResult<()> {
        if !scene.contains(self.billboard) {
            return Ok(());
        }
        let mut world = scene.world_transform(self.billboard)?;
        world.look_at(viewer, Vec3::Y);
        scene.set_world_rotation(self.billboard, world.rotation)
    }

    /// Whether `node` is part of this ghost.
    pub fn contains_node(&self, scene: &SceneGraph, node: NodeId) -> bool {
        scene.is_descendant_of(node, self.root)
    }

    pub fn despawn(self, scene: &mut SceneGraph) {
        scene.despawn(self.root).ok();
    }
}
