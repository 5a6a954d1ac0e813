use glam::{Mat4, Vec3};

/// Read-only access to the transforms the pipeline needs from a camera.
///
/// Implemented by [`Camera`]; hosts with their own camera type implement it
/// directly instead of converting.
pub trait CameraView {
    /// World → view transform.
    fn view_matrix(&self) -> Mat4;
    /// View → clip transform, `[0, 1]` depth range (wgpu convention).
    fn projection_matrix(&self) -> Mat4;
    /// World-space point the camera is focused on.
    fn focus_point(&self) -> Vec3;
    /// Near and far clip distances.
    fn clip_planes(&self) -> (f32, f32);
}

/// Perspective camera defined by eye position, target, and projection
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 50.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: 4.0 / 3.0,
            fovy: 45.0,
            znear: 1.0,
            zfar: 500.0,
        }
    }
}

impl Camera {
    /// Build the combined view-projection matrix.
    pub fn build_matrix(&self) -> Mat4 {
        self.build_projection() * self.build_view()
    }

    /// World → view transform.
    pub fn build_view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Projection matrix alone.
    pub fn build_projection(&self) -> Mat4 {
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        )
    }

    /// Distance from the eye to the look-at target.
    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }
}

impl CameraView for Camera {
    fn view_matrix(&self) -> Mat4 {
        self.build_view()
    }

    fn projection_matrix(&self) -> Mat4 {
        self.build_projection()
    }

    fn focus_point(&self) -> Vec3 {
        self.target
    }

    fn clip_planes(&self) -> (f32, f32) {
        (self.znear, self.zfar)
    }
}
