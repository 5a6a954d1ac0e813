//! Final composite: exposure and gamma into the display target, and again
//! into a host surface on presentation.

use bytemuck::Zeroable;

use super::screen_pass::{ScreenPass, ScreenPassDef};
use crate::error::PipelineError;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::options::PostProcessingOptions;
use crate::renderer::target_set::DISPLAY_FORMAT;

/// Composite uniform - must match WGSL struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct CompositeParams {
    /// Linear multiplier applied before gamma.
    pub exposure: f32,
    /// Output exponent; 1.0 leaves values unchanged.
    pub gamma: f32,
    pub _pad: [f32; 2],
}

impl CompositeParams {
    pub fn from_options(pp: &PostProcessingOptions) -> Self {
        Self {
            exposure: pp.exposure.max(0.0),
            gamma: if pp.gamma > 0.0 { pp.gamma } else { 1.0 },
            _pad: [0.0; 2],
        }
    }

    /// Map one linear channel to its display value in `[0, 1]`.
    pub fn apply(&self, channel: f32) -> f32 {
        let exposed = (channel * self.exposure).max(0.0);
        let mapped = if self.gamma == 1.0 {
            exposed
        } else {
            exposed.powf(self.gamma)
        };
        mapped.clamp(0.0, 1.0)
    }
}

/// Composite pass writing the internal display target.
pub(crate) fn create_pass(
    device: &wgpu::Device,
    composer: &mut ShaderComposer,
) -> Result<ScreenPass, PipelineError> {
    create_pass_for(device, composer, "Composite", DISPLAY_FORMAT)
}

/// Composite pass writing a surface texture of `format`.
pub(crate) fn create_present_pass(
    device: &wgpu::Device,
    composer: &mut ShaderComposer,
    format: wgpu::TextureFormat,
) -> Result<ScreenPass, PipelineError> {
    create_pass_for(device, composer, "Present", format)
}

fn create_pass_for(
    device: &wgpu::Device,
    composer: &mut ShaderComposer,
    label: &'static str,
    format: wgpu::TextureFormat,
) -> Result<ScreenPass, PipelineError> {
    ScreenPass::new(
        device,
        composer,
        &ScreenPassDef {
            label,
            shader: Shader::Composite,
            format,
            params: CompositeParams::zeroed(),
            extra: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_identity() {
        let params = CompositeParams::from_options(&PostProcessingOptions::default());
        for v in [0.0, 0.25, 0.5, 1.0] {
            assert_eq!(params.apply(v), v);
        }
    }

    #[test]
    fn output_is_clamped() {
        let params = CompositeParams {
            exposure: 2.0,
            gamma: 1.0,
            _pad: [0.0; 2],
        };
        assert_eq!(params.apply(0.75), 1.0);
        assert_eq!(params.apply(-1.0), 0.0);
    }

    #[test]
    fn non_positive_gamma_falls_back_to_identity() {
        let pp = PostProcessingOptions {
            gamma: 0.0,
            ..PostProcessingOptions::default()
        };
        assert_eq!(CompositeParams::from_options(&pp).gamma, 1.0);
    }
}
