use glam::{Mat4, Vec3};

use super::core::{Camera, CameraView};

/// View-space epsilon as a fraction of the focus distance. Coincident atom
/// and bond surfaces are separated by this much before projection.
const OFFSET_SCALE: f32 = 1.0e-3;

/// Floor for the projected bias so far-away scenes still separate layers.
const MIN_DEPTH_BIAS: f32 = 1.0e-6;

/// Smallest near plane accepted from a camera.
const MIN_NEAR: f32 = 1.0e-4;

/// Per-frame depth bias and focal reference computed from the camera.
///
/// Recomputed by `SolidPipeline::adjust_offset`. Geometry that is known to
/// coincide with earlier submissions (bonds drawn into atoms, outlines over
/// surfaces) pulls its depth toward the camera by `bias` per layer, which
/// resolves the `LessEqual` depth test in its favour without visible
/// displacement. Depth-of-field reads `focal_distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthOffset {
    /// Depth bias in normalized `[0, 1]` depth units.
    pub bias: f32,
    /// Distance from the eye to the focus point along the view axis.
    pub focal_distance: f32,
    /// Near clip distance of the camera the offset was computed from.
    pub near: f32,
    /// Far clip distance of the camera the offset was computed from.
    pub far: f32,
    /// World → view transform of that camera.
    pub view: Mat4,
}

impl Default for DepthOffset {
    fn default() -> Self {
        Self::from_camera(&Camera::default())
    }
}

impl DepthOffset {
    /// Derive the offset from the camera's current transforms.
    pub fn from_camera(camera: &dyn CameraView) -> Self {
        let (near, far) = sanitize_clip(camera.clip_planes());
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        // Focus behind the eye or outside the clip range is clamped so the
        // bias is always evaluated on a visible depth.
        let focus_view = view.transform_point3(camera.focus_point());
        let focal_distance = (-focus_view.z).clamp(near, far);

        let epsilon = focal_distance * OFFSET_SCALE;
        let at_focus = projected_depth(projection, focal_distance);
        let nearer = projected_depth(projection, focal_distance - epsilon);
        let bias = (at_focus - nearer).abs();
        let bias = if bias.is_finite() {
            bias.max(MIN_DEPTH_BIAS)
        } else {
            MIN_DEPTH_BIAS
        };

        Self {
            bias,
            focal_distance,
            near,
            far,
            view,
        }
    }

    /// Depth of a fragment pulled `layer` bias steps toward the camera.
    #[must_use]
    pub fn biased(&self, depth: f32, layer: u32) -> f32 {
        (depth - self.bias * layer as f32).max(0.0)
    }

    /// Normalized depth of the focal plane.
    pub fn focal_depth(&self) -> f32 {
        (self.far * (self.focal_distance - self.near)
            / (self.focal_distance * (self.far - self.near)))
            .clamp(0.0, 1.0)
    }
}

fn sanitize_clip((near, far): (f32, f32)) -> (f32, f32) {
    let near = if near.is_finite() {
        near.max(MIN_NEAR)
    } else {
        MIN_NEAR
    };
    let far = if far.is_finite() && far > near {
        far
    } else {
        near * 2.0
    };
    (near, far)
}

fn projected_depth(projection: Mat4, distance: f32) -> f32 {
    projection.project_point3(Vec3::new(0.0, 0.0, -distance)).z
}
