//! Core engine types shared by the pose sync crates.
//!
//! This crate provides the foundational types used across all systems:
//! - Transform math and euler conventions
//! - The scene graph standing in for the host engine's transform hierarchy
//! - Frame timing and cancellable timed continuations

pub mod components;
pub mod schedule;
pub mod scene;
pub mod time;
pub mod transform;

pub use components::*;
pub use schedule::*;
pub use scene::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec3};
