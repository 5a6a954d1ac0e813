//! Rendering backends behind the pipeline.
//!
//! The pipeline owns exactly one backend and never hands it out: the wgpu
//! backend for real rendering, or the CPU reference backend for headless
//! use and deterministic tests.

pub(crate) mod gpu;
pub(crate) mod software;

use crate::camera::DepthOffset;
use crate::error::{AllocationError, PipelineError, StateViolation};
use crate::gpu::render_context::RenderContext;
use crate::pipeline::Frame;
use crate::renderer::postprocess::PostProcessInputs;
use crate::renderer::solid_pass::SolidGeometry;
use crate::renderer::target_set::TargetExtent;

/// Resource side of the pipeline. Lifecycle checks happen in the caller;
/// a backend only sees calls that are valid for its current targets.
pub(crate) trait Backend {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Largest physical dimension [`Backend::allocate`] accepts.
    fn max_dimension(&self) -> u32;

    /// (Re)create every target at `extent`. On failure the previous
    /// targets, if any, are left intact.
    fn allocate(&mut self, extent: TargetExtent) -> Result<(), AllocationError>;

    /// Free every target. Safe to call repeatedly.
    fn release(&mut self);

    /// Extent of the live targets, if any.
    fn extent(&self) -> Option<TargetExtent>;

    /// Number of successful allocations so far.
    fn generation(&self) -> u64;

    /// Start a frame: clear color to `background`, normals to zero and
    /// depth to 1.0.
    fn begin_frame(&mut self, background: [f32; 4]);

    /// Forward one host submission.
    fn draw(&mut self, geometry: &dyn SolidGeometry, offset: &DepthOffset);

    /// Run the post-process chain and composite into the display target.
    fn end_frame(
        &mut self,
        inputs: &PostProcessInputs<'_>,
    ) -> Result<(), StateViolation>;

    /// Discard the open frame without compositing.
    fn abort_frame(&mut self);

    /// Copy the display target back as RGBA8.
    fn read_frame(&mut self) -> Result<Frame, PipelineError>;

    /// Composite the last finished frame into the surface of `context`
    /// and present it.
    fn present(&mut self, context: &mut RenderContext) -> Result<(), PipelineError>;
}
