//! Transform component and utilities for spatial positioning.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() > 0.0001 {
            self.rotation = Quat::from_mat4(&Mat4::look_at_rh(self.position, target, up)).inverse();
        }
    }

    /// Map a point from this transform's local space into the parent space.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    /// Map a point from the parent space into this transform's local space.
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        (self.rotation.inverse() * (point - self.position)) / self.scale
    }

    /// Compose `self` (parent) with `child`, producing the child in parent space.
    ///
    /// Scale composes per-axis, which is exact for the uniform scales used by rigs.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            position: self.transform_point(child.position),
            rotation: (self.rotation * child.rotation).normalize(),
            scale: self.scale * child.scale,
        }
    }

    /// Express `world` relative to `self`, the inverse of [`Transform::mul_transform`].
    pub fn relative(&self, world: &Transform) -> Transform {
        Transform {
            position: self.inverse_transform_point(world.position),
            rotation: (self.rotation.inverse() * world.rotation).normalize(),
            scale: world.scale / self.scale,
        }
    }
}

/// Build a rotation from euler angles in degrees.
///
/// Angles follow the tracked-device convention: yaw about Y, then pitch about X,
/// then roll about Z.
pub fn quat_from_euler_degrees(eulers: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        eulers.y.to_radians(),
        eulers.x.to_radians(),
        eulers.z.to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn transform_point_applies_scale_rotation_translation() {
        let t = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        // +X rotated 90 degrees about Y points to -Z.
        let p = t.transform_point(Vec3::X);
        assert!(approx(p, Vec3::new(1.0, 0.0, -2.0)));
        assert!(approx(t.inverse_transform_point(p), Vec3::X));
    }

    #[test]
    fn relative_undoes_mul_transform() {
        let parent = Transform {
            position: Vec3::new(3.0, 1.0, -2.0),
            rotation: Quat::from_rotation_x(0.4),
            scale: Vec3::splat(1.5),
        };
        let child = Transform::from_position_rotation(Vec3::new(0.2, 0.5, 0.1), Quat::from_rotation_z(1.0));
        let world = parent.mul_transform(&child);
        let back = parent.relative(&world);
        assert!(approx(back.position, child.position));
        assert!(back.rotation.angle_between(child.rotation) < 1e-4);
    }

    #[test]
    fn euler_degrees_apply_yaw_before_pitch() {
        let q = quat_from_euler_degrees(Vec3::new(90.0, 90.0, 0.0));
        // Pitch 90 turns forward to +Y; yaw about world Y leaves it there.
        assert!(approx(q * -Vec3::Z, Vec3::Y));
        let yaw_only = quat_from_euler_degrees(Vec3::new(0.0, 90.0, 0.0));
        assert!(approx(yaw_only * -Vec3::Z, -Vec3::X));
    }

    #[test]
    fn look_at_faces_target() {
        let mut t = Transform::IDENTITY;
        t.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::Y);
        assert!(approx(t.forward(), Vec3::Z));
    }
}
