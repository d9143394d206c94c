//! Perspective camera: view/projection matrices, aspect updates on resize,
//! and picking rays through normalized device coordinates.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};

use crate::ray::Ray;

/// GPU uniform carrying the camera matrices.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// Column-major view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Camera world position (w unused).
    pub camera_pos: [f32; 4],
    /// World-space right axis, for camera-facing point quads.
    pub right: [f32; 4],
    /// World-space up axis.
    pub up: [f32; 4],
}

/// A perspective camera looking along its local -Z axis.
#[derive(Debug, Clone)]
pub struct Camera {
    /// World position.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

impl Camera {
    /// The splash camera: 60° vertical FOV at (0, 4, 18), looking down -Z.
    pub fn splash(width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 4.0, 18.0),
            rotation: Quat::IDENTITY,
            fov_y: 60f32.to_radians(),
            aspect_ratio: 1.0,
            near: 0.1,
            far: 1000.0,
        };
        camera.set_aspect_ratio(width as f32, height as f32);
        camera
    }

    /// Compute the view matrix (inverse of camera transform).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// Compute the projection matrix (depth 0 at near, 1 at far).
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    /// Compute the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Update the aspect ratio from pixel dimensions.
    ///
    /// Returns `false` and leaves the camera untouched when either dimension
    /// is zero (or not finite), so a collapsed container never produces a
    /// NaN projection.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) -> bool {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return false;
        }
        self.aspect_ratio = width / height;
        true
    }

    /// World-space ray from the camera through a point in NDC.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inv_view_proj = self.view_projection_matrix().inverse();
        let near = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inv_view_proj.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(self.position, far - near)
    }

    /// Project a world point to NDC. Returns `None` for points behind the camera.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let view = self.view_matrix().transform_point3(world);
        if view.z >= 0.0 {
            return None;
        }
        let ndc = self.view_projection_matrix().project_point3(world);
        Some(Vec2::new(ndc.x, ndc.y))
    }

    /// Convert the camera to a uniform suitable for GPU upload.
    pub fn to_uniform(&self) -> CameraUniform {
        let right = self.rotation * Vec3::X;
        let up = self.rotation * Vec3::Y;
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            camera_pos: [self.position.x, self.position.y, self.position.z, 0.0],
            right: right.extend(0.0).to_array(),
            up: up.extend(0.0).to_array(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::splash(16, 9)
    }
}
