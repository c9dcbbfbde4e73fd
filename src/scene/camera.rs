//! Camera component

use crate::resources::{EnvMap, Handle};
use bevy_ecs::prelude::*;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Perspective camera. Position comes from the Transform on the same entity.
///
/// The camera also selects the environment map used for lighting and the
/// skybox; without a ready environment map nothing is drawn.
#[derive(Component, Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub front: Vec3,
    pub up: Vec3,
    pub env_map: Handle<EnvMap>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4,
            front: -Vec3::Z,
            up: Vec3::Y,
            env_map: Handle::NONE,
        }
    }
}

impl Camera {
    pub fn perspective_degrees(fov_y_degrees: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            ..Default::default()
        }
    }

    pub fn with_env_map(mut self, env_map: Handle<EnvMap>) -> Self {
        self.env_map = env_map;
        self
    }

    pub fn looking_at(mut self, front: Vec3, up: Vec3) -> Self {
        self.front = front.normalize();
        self.up = up;
        self
    }

    /// Right-handed perspective with a 0..1 depth range and Y flipped for
    /// Vulkan-style clip space
    pub fn projection(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        let mut projection = Mat4::perspective_rh(self.fov_y, aspect, near, far);
        projection.y_axis.y *= -1.0;
        projection
    }

    pub fn view(&self, position: Vec3) -> Mat4 {
        Mat4::look_at_rh(position, position + self.front, self.up)
    }
}

/// Camera block bound by mesh-drawing passes.
///
/// Only `projection_view` is written each frame; `position` is reserved.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuCameraData {
    pub projection_view: Mat4,
    pub position: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_flips_y() {
        let camera = Camera::perspective_degrees(60.0);
        let flipped = camera.projection(16.0 / 9.0, 0.1, 100.0);
        let reference = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);

        assert_eq!(flipped.y_axis.y, -reference.y_axis.y);
        assert_eq!(flipped.x_axis, reference.x_axis);
        assert_eq!(flipped.z_axis, reference.z_axis);
    }

    #[test]
    fn test_view_looks_along_front() {
        let camera = Camera::default();
        let view = camera.view(Vec3::new(0.0, 0.0, 5.0));

        // A point in front of the camera ends up on the negative view Z axis
        let p = view.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn test_camera_block_size() {
        assert_eq!(std::mem::size_of::<GpuCameraData>(), 64 + 16);
    }
}
