//! Depth/normal discontinuity outlines.

use bytemuck::Zeroable;

use super::screen_pass::{ScreenPass, ScreenPassDef};
use super::PostProcessInputs;
use crate::error::PipelineError;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::solid_pass::COLOR_FORMAT;

const MIN_DEPTH_THRESHOLD: f32 = 1.0e-4;

/// Edge uniform - must match WGSL struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct EdgeParams {
    pub screen_size: [f32; 2],
    pub near: f32,
    pub far: f32,
    /// 1.0 when enabled, 0.0 otherwise.
    pub strength: f32,
    /// Relative depth jump at which an edge starts.
    pub depth_threshold: f32,
    /// Scale on `1 - dot(n0, n1)` for crease edges.
    pub normal_weight: f32,
    /// Neighbour distance in physical pixels.
    pub thickness: f32,
}

impl EdgeParams {
    pub fn from_inputs(inputs: &PostProcessInputs<'_>) -> Self {
        let pp = &inputs.options.post_processing;
        Self {
            screen_size: [inputs.extent.width as f32, inputs.extent.height as f32],
            near: inputs.offset.near,
            far: inputs.offset.far,
            strength: inputs.options.effects.edge_detection.strength(),
            depth_threshold: pp.edge_depth_threshold.max(MIN_DEPTH_THRESHOLD),
            normal_weight: pp.edge_normal_weight.max(0.0),
            thickness: pp.outline_thickness.max(0.0) * inputs.pixel_ratio,
        }
    }

    /// Neighbour step in whole pixels, at least one.
    pub fn step(&self) -> i32 {
        (self.thickness.round() as i32).max(1)
    }

    /// Edge intensity in `[0, 1]` from the relative eye-distance jump
    /// between two pixels.
    pub fn depth_edge(&self, a: f32, b: f32) -> f32 {
        let relative = (a - b).abs() / a.min(b);
        ((relative - self.depth_threshold) / self.depth_threshold).clamp(0.0, 1.0)
    }

    /// Edge intensity in `[0, 1]` from the angle between two unit normals.
    pub fn normal_edge(&self, a: [f32; 3], b: [f32; 3]) -> f32 {
        let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        ((1.0 - dot) * self.normal_weight).clamp(0.0, 1.0)
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
            label: "Edge Detection",
            shader: Shader::EdgeDetection,
            format: COLOR_FORMAT,
            params: EdgeParams::zeroed(),
            extra: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DepthOffset;
    use crate::options::{EdgeDetectionConfig, Options};
    use crate::renderer::target_set::TargetExtent;

    fn params_for(enabled: bool) -> EdgeParams {
        let mut options = Options::default();
        options.effects.edge_detection = EdgeDetectionConfig::new(enabled);
        let offset = DepthOffset::default();
        EdgeParams::from_inputs(&PostProcessInputs {
            extent: TargetExtent::new(8, 8),
            pixel_ratio: 2.0,
            offset: &offset,
            options: &options,
        })
    }

    #[test]
    fn params_match_wgsl_layout() {
        assert_eq!(size_of::<EdgeParams>(), 32);
    }

    #[test]
    fn strength_follows_the_flag() {
        assert_eq!(params_for(true).strength, 1.0);
        assert_eq!(params_for(false).strength, 0.0);
    }

    #[test]
    fn outline_scales_with_pixel_ratio() {
        let p = params_for(true);
        assert_eq!(p.step(), 2);
    }

    #[test]
    fn small_depth_steps_are_not_edges() {
        let p = params_for(true);
        assert_eq!(p.depth_edge(10.0, 10.1), 0.0);
        assert_eq!(p.depth_edge(10.0, 20.0), 1.0);
    }

    #[test]
    fn perpendicular_normals_are_edges() {
        let p = params_for(true);
        assert_eq!(p.normal_edge([0.0, 0.0, 1.0], [0.0, 0.0, 1.0]), 0.0);
        assert!(p.normal_edge([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]) > 0.0);
    }
}
