use super::ambient_occlusion::{AmbientOcclusionPass, AoParams};
use super::chain::{ChainPlan, EffectStage, Slot};
use super::composite::{self, CompositeParams};
use super::depth_of_field::{self, DofParams};
use super::edge_detection::{self, EdgeParams};
use super::screen_pass::ScreenPass;
use super::PostProcessInputs;
use crate::error::{PipelineError, StateViolation, ViolationReason};
use crate::pipeline::Lifecycle;
use crate::gpu::shader_composer::ShaderComposer;
use crate::renderer::target_set::RenderTargetSet;

/// Where the last chain run left its output, and how it was composited.
/// Replayed by [`PostProcessStack::present`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Composed {
    pub source: Slot,
    pub params: CompositeParams,
}

/// Owns the GPU post-processing chain: AO, depth-of-field, edge detection,
/// the final composite and the surface composite used for presentation.
pub(crate) struct PostProcessStack {
    ambient_occlusion: AmbientOcclusionPass,
    depth_of_field: ScreenPass,
    edge_detection: ScreenPass,
    composite: ScreenPass,
    present: ScreenPass,
    present_format: wgpu::TextureFormat,
}

impl PostProcessStack {
    /// Compose every shader and build the passes, the presentation pass at
    /// `present_format`. Bind groups are created later by [`Self::rebind`],
    /// once targets exist.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        present_format: wgpu::TextureFormat,
    ) -> Result<Self, PipelineError> {
        let mut composer = ShaderComposer::new()?;
        Ok(Self {
            ambient_occlusion: AmbientOcclusionPass::new(
                device,
                queue,
                &mut composer,
            )?,
            depth_of_field: depth_of_field::create_pass(device, &mut composer)?,
            edge_detection: edge_detection::create_pass(device, &mut composer)?,
            composite: composite::create_pass(device, &mut composer)?,
            present: composite::create_present_pass(
                device,
                &mut composer,
                present_format,
            )?,
            present_format,
        })
    }

    /// Surface format the presentation pass writes.
    pub fn present_format(&self) -> wgpu::TextureFormat {
        self.present_format
    }

    fn passes_mut(&mut self) -> [&mut ScreenPass; 5] {
        [
            &mut self.ambient_occlusion.pass,
            &mut self.depth_of_field,
            &mut self.edge_detection,
            &mut self.composite,
            &mut self.present,
        ]
    }

    fn stage(&self, stage: EffectStage) -> &ScreenPass {
        match stage {
            EffectStage::AmbientOcclusion => &self.ambient_occlusion.pass,
            EffectStage::DepthOfField => &self.depth_of_field,
            EffectStage::EdgeDetection => &self.edge_detection,
        }
    }

    /// Point every pass at a freshly allocated target set.
    pub fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargetSet) {
        let inputs = targets.pass_inputs();
        for pass in self.passes_mut() {
            pass.rebind(device, &inputs);
        }
    }

    /// Forget the released targets.
    pub fn unbind(&mut self) {
        for pass in self.passes_mut() {
            pass.unbind();
        }
    }

    /// Encode the active stages and the composite for this frame.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        targets: &RenderTargetSet,
        inputs: &PostProcessInputs<'_>,
    ) -> Result<Composed, StateViolation> {
        let plan = ChainPlan::plan(&inputs.options.effects);
        for step in &plan.steps {
            let pass = self.stage(step.stage);
            match step.stage {
                EffectStage::AmbientOcclusion => {
                    pass.write_params(queue, &AoParams::from_inputs(inputs));
                }
                EffectStage::DepthOfField => {
                    pass.write_params(queue, &DofParams::from_inputs(inputs));
                }
                EffectStage::EdgeDetection => {
                    pass.write_params(queue, &EdgeParams::from_inputs(inputs));
                }
            }
            log::trace!(
                "{}: {:?} -> {:?}",
                step.stage.label(),
                step.source,
                step.target
            );
            pass.render(
                encoder,
                step.source,
                targets.view(step.target),
                targets.generation,
            )
            .map_err(|reason| violation("end", Lifecycle::FrameOpen, reason))?;
        }

        let composed = Composed {
            source: plan.composite_source,
            params: CompositeParams::from_options(&inputs.options.post_processing),
        };
        self.composite.write_params(queue, &composed.params);
        self.composite
            .render(
                encoder,
                composed.source,
                &targets.display.view,
                targets.generation,
            )
            .map_err(|reason| violation("end", Lifecycle::FrameOpen, reason))?;
        Ok(composed)
    }

    /// Composite the output of the last chain run into `surface`, a view
    /// of a texture in [`Self::present_format`].
    pub fn present(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        targets: &RenderTargetSet,
        composed: &Composed,
        surface: &wgpu::TextureView,
    ) -> Result<(), StateViolation> {
        self.present.write_params(queue, &composed.params);
        self.present
            .render(encoder, composed.source, surface, targets.generation)
            .map_err(|reason| violation("present", Lifecycle::Idle, reason))
    }
}

const fn violation(
    operation: &'static str,
    state: Lifecycle,
    reason: ViolationReason,
) -> StateViolation {
    StateViolation {
        operation,
        state,
        reason,
    }
}
