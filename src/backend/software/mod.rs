//! Deterministic CPU reference backend.
//!
//! Holds the same target set as the wgpu backend in plain vectors and runs
//! the post-process chain with CPU ports of the shaders. Used for headless
//! rendering and for tests that need exact pixel comparisons.

mod effects;
mod surface;

pub use surface::{Fragment, SoftwareTarget};

use self::effects::GBuffer;
use self::surface::SurfaceBuffers;
use super::Backend;
use crate::camera::DepthOffset;
use crate::error::{AllocationError, PipelineError, StateViolation, ViolationReason};
use crate::gpu::render_context::RenderContext;
use crate::pipeline::{Frame, Lifecycle};
use crate::renderer::postprocess::ambient_occlusion::AoParams;
use crate::renderer::postprocess::chain::{ChainPlan, EffectStage};
use crate::renderer::postprocess::composite::CompositeParams;
use crate::renderer::postprocess::depth_of_field::DofParams;
use crate::renderer::postprocess::edge_detection::EdgeParams;
use crate::renderer::postprocess::PostProcessInputs;
use crate::renderer::solid_pass::SolidGeometry;
use crate::renderer::target_set::TargetExtent;

/// Largest physical dimension the CPU backend allocates.
pub(crate) const MAX_DIMENSION: u32 = 8192;

#[derive(Default)]
pub(crate) struct SoftwareBackend {
    buffers: Option<SurfaceBuffers>,
    generation: u64,
}

impl Backend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn max_dimension(&self) -> u32 {
        MAX_DIMENSION
    }

    fn allocate(&mut self, extent: TargetExtent) -> Result<(), AllocationError> {
        extent.check(MAX_DIMENSION)?;
        let buffers = SurfaceBuffers::new(extent)?;
        self.buffers = Some(buffers);
        self.generation += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.buffers = None;
    }

    fn extent(&self) -> Option<TargetExtent> {
        self.buffers.as_ref().map(|b| b.extent)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn begin_frame(&mut self, background: [f32; 4]) {
        if let Some(buffers) = &mut self.buffers {
            buffers.clear(background);
        }
    }

    fn draw(&mut self, geometry: &dyn SolidGeometry, offset: &DepthOffset) {
        if let Some(buffers) = &mut self.buffers {
            geometry.rasterize(&mut buffers.target(), offset);
        }
    }

    fn end_frame(
        &mut self,
        inputs: &PostProcessInputs<'_>,
    ) -> Result<(), StateViolation> {
        let violation = |reason| StateViolation {
            operation: "end",
            state: Lifecycle::FrameOpen,
            reason,
        };
        let buffers = self
            .buffers
            .as_mut()
            .ok_or_else(|| violation(ViolationReason::MissingTargets))?;
        if buffers.extent != inputs.extent {
            return Err(violation(ViolationReason::StaleTargets));
        }

        let plan = ChainPlan::plan(&inputs.options.effects);
        // Depth and normals are read-only for the chain; move them out so
        // the color slots can be borrowed mutably alongside.
        let depth = std::mem::take(&mut buffers.depth);
        let normal = std::mem::take(&mut buffers.normal);
        let g = GBuffer {
            extent: buffers.extent,
            depth: &depth,
            normal: &normal,
        };
        for step in &plan.steps {
            let Some((src, dst)) =
                buffers.ping_pong(step.source.index(), step.target.index())
            else {
                continue;
            };
            match step.stage {
                EffectStage::AmbientOcclusion => {
                    effects::ambient_occlusion(src, dst, &g, &AoParams::from_inputs(inputs));
                }
                EffectStage::DepthOfField => {
                    effects::depth_of_field(src, dst, &g, &DofParams::from_inputs(inputs));
                }
                EffectStage::EdgeDetection => {
                    effects::edge_detection(src, dst, &g, &EdgeParams::from_inputs(inputs));
                }
            }
        }
        buffers.depth = depth;
        buffers.normal = normal;

        let params = CompositeParams::from_options(&inputs.options.post_processing);
        let SurfaceBuffers { slots, display, .. } = buffers;
        effects::composite(&slots[plan.composite_source.index()], display, &params);
        Ok(())
    }

    fn abort_frame(&mut self) {}

    fn read_frame(&mut self) -> Result<Frame, PipelineError> {
        let buffers = self.buffers.as_ref().ok_or(StateViolation {
            operation: "read_frame",
            state: Lifecycle::Idle,
            reason: ViolationReason::MissingTargets,
        })?;
        Ok(Frame {
            width: buffers.extent.width,
            height: buffers.extent.height,
            pixels: buffers.display.clone(),
        })
    }

    fn present(&mut self, _context: &mut RenderContext) -> Result<(), PipelineError> {
        Err(PipelineError::Presentation(
            "the software backend renders off-screen; use `read_frame`"
                .to_owned(),
        ))
    }
}
