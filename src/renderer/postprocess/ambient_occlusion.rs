//! Screen-space ambient occlusion.
//!
//! Samples a golden-angle spiral of depths around each pixel and darkens
//! pixels with nearer neighbours. A 4x4 random rotation texture breaks the
//! spiral's banding on the GPU.

use bytemuck::Zeroable;
use rand::Rng;

use super::screen_pass::{ScreenPass, ScreenPassDef};
use super::PostProcessInputs;
use crate::error::PipelineError;
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::solid_pass::COLOR_FORMAT;

/// Spiral taps per pixel. Must match `SAMPLE_COUNT` in the shader.
pub(crate) const SAMPLE_COUNT: u32 = 16;
const NOISE_SIZE: u32 = 4;

/// AO uniform - must match WGSL struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct AoParams {
    /// Target size in pixels `[width, height]`.
    pub screen_size: [f32; 2],
    pub near: f32,
    pub far: f32,
    /// Effective strength; zero when disabled.
    pub strength: f32,
    /// Sampling radius in physical pixels.
    pub radius: f32,
    /// View-space depth difference ignored as self-occlusion.
    pub bias: f32,
    /// Exponent applied to the visibility term.
    pub power: f32,
    /// Depth difference beyond which a neighbour's occlusion fades.
    pub falloff: f32,
    pub _pad: [f32; 3],
}

impl AoParams {
    pub fn from_inputs(inputs: &PostProcessInputs<'_>) -> Self {
        let pp = &inputs.options.post_processing;
        Self {
            screen_size: [inputs.extent.width as f32, inputs.extent.height as f32],
            near: inputs.offset.near,
            far: inputs.offset.far,
            strength: inputs.options.effects.ambient_occlusion.effective_strength(),
            radius: pp.ao_radius.max(0.0) * inputs.pixel_ratio,
            bias: pp.ao_bias.max(0.0),
            power: pp.ao_power.max(0.0),
            falloff: pp.ao_falloff.max(0.0),
            _pad: [0.0; 3],
        }
    }
}

/// GPU ambient-occlusion pass plus the noise texture it samples.
pub(crate) struct AmbientOcclusionPass {
    pub pass: ScreenPass,
    #[allow(dead_code)] // must stay alive to back the noise view
    noise_texture: wgpu::Texture,
}

impl AmbientOcclusionPass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        composer: &mut ShaderComposer,
    ) -> Result<Self, PipelineError> {
        let (noise_texture, noise_view) = create_noise_texture(device, queue);
        let pass = ScreenPass::new(
            device,
            composer,
            &ScreenPassDef {
                label: "Ambient Occlusion",
                shader: Shader::AmbientOcclusion,
                format: COLOR_FORMAT,
                params: AoParams::zeroed(),
                extra: Some(&noise_view),
            },
        )?;
        Ok(Self {
            pass,
            noise_texture,
        })
    }
}

fn create_noise_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> (wgpu::Texture, wgpu::TextureView) {
    let mut rng = rand::rng();
    let mut noise_data = vec![0u8; (NOISE_SIZE * NOISE_SIZE * 4) as usize];

    for texel in noise_data.chunks_exact_mut(4) {
        let x = rng.random::<f32>() * 2.0 - 1.0;
        let y = rng.random::<f32>() * 2.0 - 1.0;
        let len = x.hypot(y);
        let (nx, ny) = if len > 0.0 {
            (x / len, y / len)
        } else {
            (1.0, 0.0)
        };
        texel[0] = ((nx * 0.5 + 0.5) * 255.0) as u8;
        texel[1] = ((ny * 0.5 + 0.5) * 255.0) as u8;
        texel[2] = 128;
        texel[3] = 255;
    }

    let size = wgpu::Extent3d {
        width: NOISE_SIZE,
        height: NOISE_SIZE,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("AO Noise Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &noise_data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(NOISE_SIZE * 4),
            rows_per_image: Some(NOISE_SIZE),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
