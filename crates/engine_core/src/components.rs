//! Components attached to scene graph nodes.

use crate::Transform;

/// Human-readable node name, used for child lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Transform relative to the node's parent (or the scene root).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalTransform(pub Transform);

/// Link to the parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub hecs::Entity);

/// Ordered list of child nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Children(pub Vec<hecs::Entity>);

impl Children {
    pub fn push(&mut self, child: hecs::Entity) {
        if !self.0.contains(&child) {
            self.0.push(child);
        }
    }

    pub fn remove(&mut self, child: hecs::Entity) {
        self.0.retain(|c| *c != child);
    }
}

/// Render visibility flag. Nodes without it are treated as visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible(pub bool);

impl Default for Visible {
    fn default() -> Self {
        Self(true)
    }
}
