//! The solid geometry pass: target formats, pipeline state for host
//! geometry, and the render passes the pipeline opens around host draws.

use crate::backend::software::SoftwareTarget;
use crate::camera::DepthOffset;
use crate::renderer::target_set::RenderTargetSet;

/// Format of the solid color target (HDR, linear).
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the normal target: view-space unit normal in `xyz`, coverage
/// in `w` (1.0 where geometry was drawn, cleared to 0.0).
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the depth target; cleared to 1.0 each frame.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Opaque geometry a host submits between `begin()` and `end()`.
///
/// Both hooks default to drawing nothing, so a host only implements the
/// one matching the backend it runs on. Draws are forwarded in submission
/// order and never reordered.
pub trait SolidGeometry {
    /// Record draw calls into the pipeline's solid render pass. The pass
    /// has [`solid_fragment_targets`] bound as color attachments and a
    /// [`DEPTH_FORMAT`] depth attachment.
    fn encode(&self, _pass: &mut wgpu::RenderPass<'_>, _offset: &DepthOffset) {}

    /// Rasterize into the CPU reference target.
    fn rasterize(&self, _target: &mut SoftwareTarget<'_>, _offset: &DepthOffset) {}
}

/// Color targets host pipelines must declare: color then normals, both
/// without blending.
pub fn solid_fragment_targets() -> [Option<wgpu::ColorTargetState>; 2] {
    [
        Some(wgpu::ColorTargetState {
            format: COLOR_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        }),
        Some(wgpu::ColorTargetState {
            format: NORMAL_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        }),
    ]
}

/// Depth-stencil state host pipelines must use: `LessEqual` with writes on,
/// so a later submission at equal depth wins.
pub fn solid_depth_stencil_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Open a render pass over the solid targets. With `clear` set the pass
/// clears color to it, normals to zero and depth to 1.0; otherwise it
/// loads what earlier passes wrote.
pub(crate) fn begin_solid_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    targets: &RenderTargetSet,
    clear: Option<[f32; 4]>,
) -> wgpu::RenderPass<'e> {
    let (color_load, normal_load, depth_load) = match clear {
        Some([r, g, b, a]) => (
            wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            wgpu::LoadOp::Clear(1.0),
        ),
        None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load, wgpu::LoadOp::Load),
    };
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(if clear.is_some() {
            "Solid Clear Pass"
        } else {
            "Solid Pass"
        }),
        color_attachments: &[
            Some(wgpu::RenderPassColorAttachment {
                view: &targets.color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            }),
            Some(wgpu::RenderPassColorAttachment {
                view: &targets.normal.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: normal_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            }),
        ],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &targets.depth.view,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_state_matches_targets() {
        let targets = solid_fragment_targets();
        let formats: Vec<_> = targets
            .iter()
            .map(|t| t.as_ref().map(|t| t.format))
            .collect();
        assert_eq!(formats, vec![Some(COLOR_FORMAT), Some(NORMAL_FORMAT)]);
        assert!(targets.iter().flatten().all(|t| t.blend.is_none()));

        let depth = solid_depth_stencil_state();
        assert_eq!(depth.format, DEPTH_FORMAT);
        assert_eq!(depth.depth_compare, wgpu::CompareFunction::LessEqual);
        assert!(depth.depth_write_enabled);
    }
}
