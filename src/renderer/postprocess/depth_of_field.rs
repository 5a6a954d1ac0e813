//! Depth-of-field gather blur around the focal plane.

use bytemuck::Zeroable;

use super::screen_pass::{ScreenPass, ScreenPassDef};
use super::PostProcessInputs;
use crate::error::PipelineError;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::solid_pass::COLOR_FORMAT;

/// Gather taps per blurred pixel. Must match `TAP_COUNT` in the shader.
pub(crate) const TAP_COUNT: u32 = 16;

/// Circles of confusion below this many pixels are left sharp.
pub(crate) const MIN_BLUR_RADIUS: f32 = 0.5;

/// DoF uniform - must match WGSL struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct DofParams {
    pub screen_size: [f32; 2],
    pub near: f32,
    pub far: f32,
    /// Effective strength; zero when disabled.
    pub strength: f32,
    /// Eye distance of the focal plane.
    pub focal_distance: f32,
    /// Largest blur radius in physical pixels.
    pub max_radius: f32,
    pub _pad: f32,
}

impl DofParams {
    pub fn from_inputs(inputs: &PostProcessInputs<'_>) -> Self {
        Self {
            screen_size: [inputs.extent.width as f32, inputs.extent.height as f32],
            near: inputs.offset.near,
            far: inputs.offset.far,
            strength: inputs.options.effects.depth_of_field.effective_strength(),
            focal_distance: inputs.offset.focal_distance,
            max_radius: inputs.options.post_processing.dof_max_radius.max(0.0)
                * inputs.pixel_ratio,
            _pad: 0.0,
        }
    }

    /// Blur radius in pixels for a pixel at eye distance `distance`.
    pub fn circle_of_confusion(&self, distance: f32) -> f32 {
        let defocus = (distance - self.focal_distance).abs() / self.focal_distance;
        (defocus * self.strength * self.max_radius).min(self.max_radius)
    }
}

pub(crate) fn create_pass(
    device: &wgpu::Device,
    composer: &mut ShaderComposer,
) -> Result<ScreenPass, PipelineError> {
    ScreenPass::new(
        device,
        composer,
        &ScreenPassDef {
            label: "Depth of Field",
            shader: Shader::DepthOfField,
            format: COLOR_FORMAT,
            params: DofParams::zeroed(),
            extra: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(strength: f32) -> DofParams {
        DofParams {
            screen_size: [10.0, 10.0],
            near: 1.0,
            far: 100.0,
            strength,
            focal_distance: 20.0,
            max_radius: 6.0,
            _pad: 0.0,
        }
    }

    #[test]
    fn params_match_wgsl_layout() {
        assert_eq!(size_of::<DofParams>(), 32);
    }

    #[test]
    fn focal_plane_stays_sharp() {
        assert_eq!(params(1.0).circle_of_confusion(20.0), 0.0);
    }

    #[test]
    fn blur_grows_with_defocus_and_clamps() {
        let p = params(1.0);
        assert!((p.circle_of_confusion(30.0) - 3.0).abs() < 1e-5);
        assert_eq!(p.circle_of_confusion(100.0), 6.0);
    }

    #[test]
    fn zero_strength_never_blurs() {
        assert_eq!(params(0.0).circle_of_confusion(100.0), 0.0);
    }
}
