//! Explicit transform hierarchy.
//!
//! Nodes live in a `hecs::World` arena; a [`NodeId`] is a generational handle, so
//! a reference to a despawned node is detected instead of aliasing a new one.
//! Parent/child links are stored on both sides and kept consistent by every
//! mutating operation.

use std::fmt;

use glam::{Quat, Vec3};
use hecs::{Entity, World};
use thiserror::Error;

use crate::components::{Children, LocalTransform, Name, Parent, Visible};
use crate::Transform;

/// Handle to a node in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Entity);

impl NodeId {
    pub fn entity(self) -> Entity {
        self.0
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene node {0:?} does not exist")]
    NodeNotFound(NodeId),
    #[error("parenting {child:?} under {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Arena of transform nodes with owned parent/child links.
#[derive(Default)]
pub struct SceneGraph {
    world: World,
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph").field("nodes", &self.len()).finish()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.world.contains(node.0)
    }

    fn ensure(&self, node: NodeId) -> SceneResult<()> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(SceneError::NodeNotFound(node))
        }
    }

    /// Spawn a node with an identity local transform.
    pub fn spawn(&mut self, name: &str, parent: Option<NodeId>) -> SceneResult<NodeId> {
        if let Some(parent) = parent {
            self.ensure(parent)?;
        }
        let entity = self
            .world
            .spawn((Name::new(name), LocalTransform::default(), Children::default(), Visible(true)));
        let node = NodeId(entity);
        if let Some(parent) = parent {
            self.link(node, parent);
        }
        Ok(node)
    }

    /// Despawn a node and its whole subtree.
    pub fn despawn(&mut self, node: NodeId) -> SceneResult<()> {
        self.ensure(node)?;
        self.unlink(node);

        let mut stack = vec![node.0];
        let mut doomed = Vec::new();
        while let Some(entity) = stack.pop() {
            if let Ok(children) = self.world.get::<&Children>(entity) {
                stack.extend(children.0.iter().copied());
            }
            doomed.push(entity);
        }
        for entity in doomed {
            self.world.despawn(entity).ok();
        }
        Ok(())
    }

    pub fn name(&self, node: NodeId) -> SceneResult<String> {
        self.world
            .get::<&Name>(node.0)
            .map(|n| n.0.clone())
            .map_err(|_| SceneError::NodeNotFound(node))
    }

    pub fn parent(&self, node: NodeId) -> SceneResult<Option<NodeId>> {
        self.ensure(node)?;
        Ok(self.world.get::<&Parent>(node.0).ok().map(|p| NodeId(p.0)))
    }

    pub fn children(&self, node: NodeId) -> SceneResult<Vec<NodeId>> {
        self.world
            .get::<&Children>(node.0)
            .map(|c| c.0.iter().copied().map(NodeId).collect())
            .map_err(|_| SceneError::NodeNotFound(node))
    }

    /// Find a direct child by name.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .ok()?
            .into_iter()
            .find(|child| self.world.get::<&Name>(child.0).map(|n| n.as_str() == name).unwrap_or(false))
    }

    /// Re-parent `node`. With `keep_world` the node's world transform is preserved,
    /// otherwise its local transform is kept as-is under the new parent.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>, keep_world: bool) -> SceneResult<()> {
        self.ensure(node)?;
        if let Some(parent) = parent {
            self.ensure(parent)?;
            let mut current = Some(parent);
            while let Some(ancestor) = current {
                if ancestor == node {
                    return Err(SceneError::Cycle { child: node, parent });
                }
                current = self.parent(ancestor)?;
            }
        }

        let world = if keep_world { Some(self.world_transform(node)?) } else { None };

        self.unlink(node);
        if let Some(parent) = parent {
            self.link(node, parent);
        }

        if let Some(world) = world {
            let local = match parent {
                Some(parent) => self.world_transform(parent)?.relative(&world),
                None => world,
            };
            self.set_local(node, local)?;
        }
        Ok(())
    }

    pub fn local(&self, node: NodeId) -> SceneResult<Transform> {
        self.world
            .get::<&LocalTransform>(node.0)
            .map(|l| l.0)
            .map_err(|_| SceneError::NodeNotFound(node))
    }

    pub fn set_local(&mut self, node: NodeId, transform: Transform) -> SceneResult<()> {
        let mut local = self
            .world
            .get::<&mut LocalTransform>(node.0)
            .map_err(|_| SceneError::NodeNotFound(node))?;
        local.0 = transform;
        Ok(())
    }

    /// Set local position and rotation, keeping the local scale.
    pub fn set_local_pose(&mut self, node: NodeId, position: Vec3, rotation: Quat) -> SceneResult<()> {
        let mut local = self.local(node)?;
        local.position = position;
        local.rotation = rotation;
        self.set_local(node, local)
    }

    pub fn set_local_position(&mut self, node: NodeId, position: Vec3) -> SceneResult<()> {
        let mut local = self.local(node)?;
        local.position = position;
        self.set_local(node, local)
    }

    /// Compose local transforms from the root down to `node`.
    pub fn world_transform(&self, node: NodeId) -> SceneResult<Transform> {
        let mut chain = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            chain.push(self.local(n)?);
            current = self.world.get::<&Parent>(n.0).ok().map(|p| NodeId(p.0));
        }
        Ok(chain
            .iter()
            .rev()
            .fold(Transform::IDENTITY, |acc, local| acc.mul_transform(local)))
    }

    fn parent_world(&self, node: NodeId) -> SceneResult<Transform> {
        match self.parent(node)? {
            Some(parent) => self.world_transform(parent),
            None => Ok(Transform::IDENTITY),
        }
    }

    /// Place `node` at a world position and rotation, keeping its local scale.
    pub fn set_world_pose(&mut self, node: NodeId, position: Vec3, rotation: Quat) -> SceneResult<()> {
        let parent = self.parent_world(node)?;
        let local = self.local(node)?;
        let target = Transform { position, rotation, scale: parent.scale * local.scale };
        let relative = parent.relative(&target);
        self.set_local_pose(node, relative.position, relative.rotation)
    }

    pub fn set_world_position(&mut self, node: NodeId, position: Vec3) -> SceneResult<()> {
        let parent = self.parent_world(node)?;
        self.set_local_position(node, parent.inverse_transform_point(position))
    }

    pub fn set_world_rotation(&mut self, node: NodeId, rotation: Quat) -> SceneResult<()> {
        let parent = self.parent_world(node)?;
        let mut local = self.local(node)?;
        local.rotation = (parent.rotation.inverse() * rotation).normalize();
        self.set_local(node, local)
    }

    /// Map a point in `node`'s local space into world space.
    pub fn transform_point(&self, node: NodeId, point: Vec3) -> SceneResult<Vec3> {
        Ok(self.world_transform(node)?.transform_point(point))
    }

    /// Map a world-space point into `node`'s local space.
    pub fn inverse_transform_point(&self, node: NodeId, point: Vec3) -> SceneResult<Vec3> {
        Ok(self.world_transform(node)?.inverse_transform_point(point))
    }

    pub fn set_visible(&mut self, node: NodeId, visible: bool) -> SceneResult<()> {
        self.world
            .insert_one(node.0, Visible(visible))
            .map_err(|_| SceneError::NodeNotFound(node))
    }

    pub fn is_visible(&self, node: NodeId) -> SceneResult<bool> {
        self.ensure(node)?;
        Ok(self.world.get::<&Visible>(node.0).map(|v| v.0).unwrap_or(true))
    }

    /// Set visibility on `root` and every descendant.
    pub fn set_subtree_visible(&mut self, root: NodeId, visible: bool) -> SceneResult<()> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.set_visible(node, visible)?;
            stack.extend(self.children(node)?);
        }
        Ok(())
    }

    /// `node` or one of its ancestors equals `ancestor`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n).ok().flatten();
        }
        false
    }

    fn link(&mut self, child: NodeId, parent: NodeId) {
        self.world.insert_one(child.0, Parent(parent.0)).ok();
        if let Ok(mut children) = self.world.get::<&mut Children>(parent.0) {
            children.push(child.0);
        }
    }

    fn unlink(&mut self, child: NodeId) {
        if let Ok(Parent(parent)) = self.world.remove_one::<Parent>(child.0) {
            if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
                children.remove(child.0);
            }
        }
    }
}
