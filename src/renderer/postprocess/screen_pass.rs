//! Shared machinery for full-screen post-process passes.
//!
//! Every pass binds the same core layout: the source color at binding 0,
//! solid depth at 1, solid normals at 2, the pass uniform at 3 and the
//! depth sampler at 5. Passes that need one more texture (the AO noise)
//! bind it at 4.

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use super::chain::Slot;
use crate::error::{PipelineError, ViolationReason};
use crate::gpu::pipeline_helpers::{
    create_nearest_sampler, create_screen_space_pipeline, depth_texture_2d,
    draw_fullscreen, non_filtering_sampler, texture_2d, uniform_buffer,
    ScreenSpacePipelineDef,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};

/// Target views a pass binds, tagged with the allocation they came from.
pub(crate) struct PassInputs<'a> {
    pub generation: u64,
    pub color: &'a wgpu::TextureView,
    pub scratch_a: &'a wgpu::TextureView,
    pub scratch_b: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub normal: &'a wgpu::TextureView,
}

impl PassInputs<'_> {
    fn source(&self, slot: Slot) -> &wgpu::TextureView {
        match slot {
            Slot::Color => self.color,
            Slot::ScratchA => self.scratch_a,
            Slot::ScratchB => self.scratch_b,
        }
    }
}

/// Construction parameters for a [`ScreenPass`].
pub(crate) struct ScreenPassDef<'a, P: Pod> {
    pub label: &'static str,
    pub shader: Shader,
    pub format: wgpu::TextureFormat,
    /// Initial uniform contents.
    pub params: P,
    /// Extra texture bound at binding 4.
    pub extra: Option<&'a wgpu::TextureView>,
}

/// A full-screen pass with one bind group per possible source slot.
///
/// Bind groups reference the render targets of one allocation; they are
/// rebuilt with [`ScreenPass::rebind`] after every reallocation and a
/// pass refuses to render against a generation it was not bound to.
pub(crate) struct ScreenPass {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    depth_sampler: wgpu::Sampler,
    extra: Option<wgpu::TextureView>,
    bind_groups: Vec<wgpu::BindGroup>,
    generation: Option<u64>,
}

impl ScreenPass {
    /// Compose the shader and build the pipeline for one pass.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Shader`] if composition fails or the device rejects
    /// the shader or pipeline (e.g. a construct its backend cannot
    /// translate).
    pub fn new<P: Pod>(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        def: &ScreenPassDef<'_, P>,
    ) -> Result<Self, PipelineError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pass = composer
            .compose(device, def.shader)
            .map(|shader| Self::build(device, &shader, def));
        let rejected = pollster::block_on(device.pop_error_scope());
        let pass = pass?;
        if let Some(err) = rejected {
            return Err(PipelineError::Shader(format!(
                "device rejected '{}': {err}",
                def.shader.path()
            )));
        }
        Ok(pass)
    }

    fn build<P: Pod>(
        device: &wgpu::Device,
        shader: &wgpu::ShaderModule,
        def: &ScreenPassDef<'_, P>,
    ) -> Self {
        let mut entries = vec![
            texture_2d(0),
            depth_texture_2d(1),
            texture_2d(2),
            uniform_buffer(3),
            non_filtering_sampler(5),
        ];
        if def.extra.is_some() {
            entries.push(texture_2d(4));
        }
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Layout", def.label)),
                entries: &entries,
            });

        let pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: def.label,
                shader,
                format: def.format,
                bind_group_layouts: &[&layout],
            },
        );

        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Params", def.label)),
                contents: bytemuck::bytes_of(&def.params),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });

        Self {
            label: def.label,
            pipeline,
            layout,
            params_buffer,
            depth_sampler: create_nearest_sampler(
                device,
                &format!("{} Depth Sampler", def.label),
            ),
            extra: def.extra.cloned(),
            bind_groups: Vec::new(),
            generation: None,
        }
    }

    /// Rebuild the bind groups against a new target allocation.
    pub fn rebind(&mut self, device: &wgpu::Device, inputs: &PassInputs<'_>) {
        self.bind_groups = Slot::ALL
            .iter()
            .map(|&slot| self.create_bind_group(device, inputs, slot))
            .collect();
        self.generation = Some(inputs.generation);
    }

    /// Drop every binding to the current targets.
    pub fn unbind(&mut self) {
        self.bind_groups.clear();
        self.generation = None;
    }

    fn create_bind_group(
        &self,
        device: &wgpu::Device,
        inputs: &PassInputs<'_>,
        source: Slot,
    ) -> wgpu::BindGroup {
        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(
                    inputs.source(source),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(inputs.depth),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(inputs.normal),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: self.params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(&self.depth_sampler),
            },
        ];
        if let Some(extra) = &self.extra {
            entries.push(wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::TextureView(extra),
            });
        }
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group ({source:?})", self.label)),
            layout: &self.layout,
            entries: &entries,
        })
    }

    /// Upload this frame's uniform values.
    pub fn write_params<P: Pod>(&self, queue: &wgpu::Queue, params: &P) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
    }

    /// Encode the pass reading `source` and overwriting `target`.
    ///
    /// # Errors
    ///
    /// [`ViolationReason::MissingTargets`] when the pass was never bound,
    /// [`ViolationReason::StaleTargets`] when it was bound to an allocation
    /// other than `generation`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: Slot,
        target: &wgpu::TextureView,
        generation: u64,
    ) -> Result<(), ViolationReason> {
        match self.generation {
            None => return Err(ViolationReason::MissingTargets),
            Some(bound) if bound != generation => {
                return Err(ViolationReason::StaleTargets);
            }
            Some(_) => {}
        }
        let bind_group = self
            .bind_groups
            .get(source.index())
            .ok_or(ViolationReason::MissingTargets)?;
        draw_fullscreen(encoder, self.label, target, &self.pipeline, bind_group);
        Ok(())
    }
}
