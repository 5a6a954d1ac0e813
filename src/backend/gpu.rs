use std::sync::mpsc;

use super::Backend;
use crate::camera::DepthOffset;
use crate::error::{AllocationError, PipelineError, StateViolation, ViolationReason};
use crate::gpu::render_context::RenderContext;
use crate::pipeline::{Frame, Lifecycle};
use crate::renderer::postprocess::post_process::{Composed, PostProcessStack};
use crate::renderer::postprocess::PostProcessInputs;
use crate::renderer::solid_pass::{begin_solid_pass, SolidGeometry};
use crate::renderer::target_set::{RenderTargetSet, TargetExtent};

/// wgpu backend. Commands for one frame accumulate in a single encoder
/// between `begin_frame` and `end_frame` and are submitted together.
pub(crate) struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    post: PostProcessStack,
    targets: Option<RenderTargetSet>,
    encoder: Option<wgpu::CommandEncoder>,
    /// Set by a successful `end_frame`, cleared whenever the targets are
    /// cleared or replaced.
    composed: Option<Composed>,
    generation: u64,
}

impl GpuBackend {
    /// Backend on the device of `context`, presenting in its surface format.
    pub fn new(context: &RenderContext) -> Result<Self, PipelineError> {
        let post = PostProcessStack::new(
            &context.device,
            &context.queue,
            context.format(),
        )?;
        Ok(Self {
            device: context.device.clone(),
            queue: context.queue.clone(),
            post,
            targets: None,
            encoder: None,
            composed: None,
            generation: 0,
        })
    }
}

fn presentation_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::Presentation(msg.into())
}

impl Backend for GpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn allocate(&mut self, extent: TargetExtent) -> Result<(), AllocationError> {
        extent.check(self.max_dimension())?;

        // Build the new set before touching the old one so a failure
        // leaves the live targets as they were.
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let targets = RenderTargetSet::new(&self.device, extent, self.generation + 1);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(AllocationError::Device(err.to_string()));
        }

        self.generation += 1;
        self.post.rebind(&self.device, &targets);
        self.targets = Some(targets);
        self.composed = None;
        Ok(())
    }

    fn release(&mut self) {
        self.encoder = None;
        self.composed = None;
        self.post.unbind();
        if let Some(targets) = self.targets.take() {
            for target in [
                &targets.color,
                &targets.normal,
                &targets.depth,
                &targets.scratch_a,
                &targets.scratch_b,
                &targets.display,
            ] {
                target.texture.destroy();
            }
        }
    }

    fn extent(&self) -> Option<TargetExtent> {
        self.targets.as_ref().map(|t| t.extent)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn begin_frame(&mut self, background: [f32; 4]) {
        let Some(targets) = &self.targets else {
            return;
        };
        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Solid Frame Encoder"),
                });
        drop(begin_solid_pass(&mut encoder, targets, Some(background)));
        self.encoder = Some(encoder);
        self.composed = None;
    }

    fn draw(&mut self, geometry: &dyn SolidGeometry, offset: &DepthOffset) {
        if let (Some(encoder), Some(targets)) =
            (self.encoder.as_mut(), self.targets.as_ref())
        {
            let mut pass = begin_solid_pass(encoder, targets, None);
            geometry.encode(&mut pass, offset);
        }
    }

    fn end_frame(
        &mut self,
        inputs: &PostProcessInputs<'_>,
    ) -> Result<(), StateViolation> {
        let missing = StateViolation {
            operation: "end",
            state: Lifecycle::FrameOpen,
            reason: ViolationReason::MissingTargets,
        };
        let mut encoder = self.encoder.take().ok_or(missing)?;
        let targets = self.targets.as_ref().ok_or(missing)?;
        let composed = self.post.render(&mut encoder, &self.queue, targets, inputs)?;
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
        self.composed = Some(composed);
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.encoder = None;
    }

    fn read_frame(&mut self) -> Result<Frame, PipelineError> {
        let targets = self.targets.as_ref().ok_or(StateViolation {
            operation: "read_frame",
            state: Lifecycle::Idle,
            reason: ViolationReason::MissingTargets,
        })?;
        let TargetExtent { width, height } = targets.extent;

        let tight_bpr = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bpr = tight_bpr.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Display Readback"),
            size: u64::from(padded_bpr) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Display Readback Encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &targets.display.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bpr),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        let _ = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| PipelineError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| PipelineError::Readback(e.to_string()))?
            .map_err(|e| PipelineError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(targets.extent.pixel_count());
        for row in data.chunks(padded_bpr as usize).take(height as usize) {
            pixels.extend(
                row[..tight_bpr as usize]
                    .chunks_exact(4)
                    .map(|px| [px[0], px[1], px[2], px[3]]),
            );
        }
        drop(data);
        staging.unmap();

        Ok(Frame {
            width,
            height,
            pixels,
        })
    }

    fn present(&mut self, context: &mut RenderContext) -> Result<(), PipelineError> {
        let targets = self.targets.as_ref().ok_or(StateViolation {
            operation: "present",
            state: Lifecycle::Idle,
            reason: ViolationReason::MissingTargets,
        })?;
        let composed = self.composed.ok_or(StateViolation {
            operation: "present",
            state: Lifecycle::Idle,
            reason: ViolationReason::NothingComposited,
        })?;
        if !context.has_surface() {
            return Err(presentation_error("render context has no surface"));
        }
        if context.format() != self.post.present_format() {
            return Err(presentation_error(format!(
                "surface format {:?} differs from the {:?} the pipeline was built for",
                context.format(),
                self.post.present_format()
            )));
        }

        let TargetExtent { width, height } = targets.extent;
        if context.surface_size() != (width, height) {
            log::debug!("reconfiguring surface to {width}x{height}");
            context.resize_surface(width, height);
        }
        let frame = context
            .acquire_surface_texture()
            .map_err(|e| presentation_error(e.to_string()))?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Present Encoder"),
                });
        self.post
            .present(&mut encoder, &self.queue, targets, &composed, &view)?;
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
