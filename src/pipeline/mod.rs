//! The solid pipeline orchestrator and its frame lifecycle.

mod state;

use std::path::Path;

pub use state::{Lifecycle, PipelineState};

use crate::backend::gpu::GpuBackend;
use crate::backend::software::SoftwareBackend;
use crate::backend::Backend;
use crate::camera::{CameraView, DepthOffset};
use crate::error::{ConfigurationError, PipelineError, StateViolation, ViolationReason};
use crate::gpu::render_context::RenderContext;
use crate::options::Options;
use crate::renderer::postprocess::PostProcessInputs;
use crate::renderer::solid_pass::SolidGeometry;
use crate::renderer::target_set::TargetExtent;

/// A composited frame read back as RGBA8, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// `width * height` pixels, row-major.
    pub pixels: Vec<[u8; 4]>,
}

impl Frame {
    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        TargetExtent::new(self.width, self.height)
            .index(x, y)
            .and_then(|i| self.pixels.get(i).copied())
    }
}

/// Solid-geometry render pipeline with screen-space post-processing.
///
/// Owns its render targets and post-process resources; the host owns the
/// scene and camera and lends them per call. A typical frame:
///
/// ```no_run
/// # use solid_pipeline::{SolidPipeline, camera::Camera};
/// # fn main() -> Result<(), solid_pipeline::PipelineError> {
/// let mut pipeline = SolidPipeline::software();
/// pipeline.resize(800, 600)?;
/// pipeline.initialize()?;
///
/// pipeline.begin()?;
/// pipeline.adjust_offset(&Camera::default())?;
/// // pipeline.draw(&scene)?;
/// pipeline.end()?;
/// # Ok(())
/// # }
/// ```
///
/// Any [`StateViolation`] raised while a frame is open also discards that
/// frame and returns the pipeline to [`Lifecycle::Idle`].
pub struct SolidPipeline {
    backend: Box<dyn Backend>,
    lifecycle: Lifecycle,
    state: PipelineState,
    options: Options,
    offset: DepthOffset,
}

impl SolidPipeline {
    /// Pipeline rendering with the device of `context`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Shader`] if a post-process shader fails to compose.
    pub fn new(context: &RenderContext) -> Result<Self, PipelineError> {
        Ok(Self::with_backend(Box::new(GpuBackend::new(context)?)))
    }

    /// Pipeline rendering on the CPU reference backend.
    #[must_use]
    pub fn software() -> Self {
        Self::with_backend(Box::<SoftwareBackend>::default())
    }

    fn with_backend(backend: Box<dyn Backend>) -> Self {
        log::debug!("solid pipeline created on the {} backend", backend.name());
        Self {
            backend,
            lifecycle: Lifecycle::Uninitialized,
            state: PipelineState::default(),
            options: Options::default(),
            offset: DepthOffset::default(),
        }
    }

    // -- Lifecycle ------------------------------------------------------

    /// Allocate render targets at the current viewport and become
    /// [`Lifecycle::Idle`]. With an empty viewport allocation waits for
    /// the first [`Self::resize`]. A no-op once initialized.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] after [`Self::release`];
    /// [`PipelineError::Allocation`] if the targets cannot be created, in
    /// which case the pipeline stays uninitialized.
    pub fn initialize(&mut self) -> Result<(), PipelineError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {
                let state = self.state;
                if !state.render_extent().is_empty() {
                    self.allocate(&state)?;
                }
                self.lifecycle = Lifecycle::Idle;
                Ok(())
            }
            Lifecycle::Idle | Lifecycle::FrameOpen => Ok(()),
            Lifecycle::Released => {
                Err(self.violation("initialize", ViolationReason::WrongState))
            }
        }
    }

    /// Open a frame: clear the targets and accept draws.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] unless [`Lifecycle::Idle`] with
    /// allocated targets. Calling it with a frame already open discards
    /// that frame.
    pub fn begin(&mut self) -> Result<(), PipelineError> {
        if self.lifecycle != Lifecycle::Idle {
            return Err(self.violation("begin", ViolationReason::WrongState));
        }
        if self.backend.extent().is_none() {
            return Err(self.violation("begin", ViolationReason::MissingTargets));
        }
        self.backend.begin_frame(self.options.post_processing.background);
        self.lifecycle = Lifecycle::FrameOpen;
        Ok(())
    }

    /// Submit opaque geometry into the open frame. Submissions are drawn
    /// in call order with the current [`DepthOffset`].
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] without an open frame.
    pub fn draw(&mut self, geometry: &dyn SolidGeometry) -> Result<(), PipelineError> {
        if self.lifecycle != Lifecycle::FrameOpen {
            return Err(self.violation("draw", ViolationReason::WrongState));
        }
        self.backend.draw(geometry, &self.offset);
        Ok(())
    }

    /// Recompute the depth bias and focal depth from `camera`. Already
    /// submitted draws are unaffected and nothing is cleared.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] without an open frame.
    pub fn adjust_offset(
        &mut self,
        camera: &dyn CameraView,
    ) -> Result<(), PipelineError> {
        if self.lifecycle != Lifecycle::FrameOpen {
            return Err(
                self.violation("adjust_offset", ViolationReason::WrongState)
            );
        }
        self.offset = DepthOffset::from_camera(camera);
        self.state.view = self.offset.view;
        log::trace!(
            "depth offset: bias {:e}, focal distance {}",
            self.offset.bias,
            self.offset.focal_distance
        );
        Ok(())
    }

    /// Close the frame: run the post-process chain with the current effect
    /// settings and composite into the display target.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] without an open frame; the
    /// targets are left untouched in that case.
    pub fn end(&mut self) -> Result<(), PipelineError> {
        if self.lifecycle != Lifecycle::FrameOpen {
            return Err(self.violation("end", ViolationReason::WrongState));
        }
        let Some(extent) = self.backend.extent() else {
            return Err(self.violation("end", ViolationReason::MissingTargets));
        };
        let inputs = PostProcessInputs {
            extent,
            pixel_ratio: self.state.pixel_ratio,
            offset: &self.offset,
            options: &self.options,
        };
        let result = self.backend.end_frame(&inputs);
        self.lifecycle = Lifecycle::Idle;
        result.map_err(|violation| {
            log::warn!("frame discarded: {violation}");
            self.backend.abort_frame();
            violation.into()
        })
    }

    /// Show the last composited frame on the surface of `context`.
    ///
    /// The final composite is replayed into the acquired surface texture,
    /// which is then presented. The surface is reconfigured first when its
    /// size differs from [`Self::render_extent`]. `context` must be the one
    /// the pipeline was built from, or share its device and format.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] unless [`Lifecycle::Idle`] after a
    /// successful [`Self::end`]; [`PipelineError::Presentation`] on the
    /// software backend, for a context without a surface or when the
    /// surface texture cannot be acquired.
    pub fn present(
        &mut self,
        context: &mut RenderContext,
    ) -> Result<(), PipelineError> {
        if self.lifecycle != Lifecycle::Idle {
            return Err(self.violation("present", ViolationReason::WrongState));
        }
        self.backend.present(context)
    }

    /// Discard the open frame without compositing. Returns whether a frame
    /// was open.
    pub fn abort_frame(&mut self) -> bool {
        if self.lifecycle != Lifecycle::FrameOpen {
            return false;
        }
        self.backend.abort_frame();
        self.lifecycle = Lifecycle::Idle;
        log::debug!("frame aborted");
        true
    }

    /// Free every GPU resource and become [`Lifecycle::Released`].
    /// Idempotent; also run on drop.
    pub fn release(&mut self) {
        if self.lifecycle == Lifecycle::Released {
            return;
        }
        let _ = self.abort_frame();
        self.backend.release();
        self.lifecycle = Lifecycle::Released;
        log::debug!("solid pipeline released");
    }

    // -- Viewport -------------------------------------------------------

    /// Set the logical viewport size and reallocate the targets.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Configuration`] for a non-positive dimension,
    /// [`PipelineError::StateViolation`] while a frame is open or after
    /// release, [`PipelineError::Allocation`] when the device rejects the
    /// new size. On every error the previous state and targets remain.
    pub fn resize(&mut self, width: i32, height: i32) -> Result<(), PipelineError> {
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(ConfigurationError::InvalidViewport { width, height }.into());
        };
        if w == 0 || h == 0 {
            return Err(ConfigurationError::InvalidViewport { width, height }.into());
        }
        let next = PipelineState {
            width: w,
            height: h,
            ..self.state
        };
        self.apply_state("resize", next)
    }

    /// Set the physical-to-logical pixel ratio and reallocate the targets.
    ///
    /// # Errors
    ///
    /// As [`Self::resize`], with [`PipelineError::Configuration`] for a
    /// ratio that is not finite and positive.
    pub fn set_pixel_ratio(&mut self, ratio: f32) -> Result<(), PipelineError> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigurationError::InvalidPixelRatio(ratio).into());
        }
        let next = PipelineState {
            pixel_ratio: ratio,
            ..self.state
        };
        self.apply_state("set_pixel_ratio", next)
    }

    fn apply_state(
        &mut self,
        operation: &'static str,
        next: PipelineState,
    ) -> Result<(), PipelineError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {
                self.state = next;
                Ok(())
            }
            Lifecycle::Idle => {
                self.allocate(&next)?;
                self.state = next;
                Ok(())
            }
            Lifecycle::FrameOpen | Lifecycle::Released => {
                Err(self.violation(operation, ViolationReason::WrongState))
            }
        }
    }

    fn allocate(&mut self, state: &PipelineState) -> Result<(), PipelineError> {
        let extent = state.render_extent();
        self.backend.allocate(extent).map_err(|e| {
            log::warn!("render target allocation failed: {e}");
            PipelineError::from(e)
        })?;
        log::debug!(
            "allocated {}x{} render targets (generation {})",
            extent.width,
            extent.height,
            self.backend.generation()
        );
        Ok(())
    }

    fn violation(
        &mut self,
        operation: &'static str,
        reason: ViolationReason,
    ) -> PipelineError {
        let violation = StateViolation {
            operation,
            state: self.lifecycle,
            reason,
        };
        log::warn!("{violation}");
        let _ = self.abort_frame();
        violation.into()
    }

    // -- Effects --------------------------------------------------------

    /// Whether ambient occlusion is on.
    pub fn ao_enabled(&self) -> bool {
        self.options.effects.ambient_occlusion.enabled()
    }

    /// Switch ambient occlusion; applies from the next `end()`.
    pub fn set_ao_enabled(&mut self, enabled: bool) {
        self.options.effects.ambient_occlusion.set_enabled(enabled);
    }

    /// Ambient occlusion strength.
    pub fn ao_strength(&self) -> f32 {
        self.options.effects.ambient_occlusion.strength()
    }

    /// Set ambient occlusion strength; negative and NaN become 0.
    pub fn set_ao_strength(&mut self, strength: f32) {
        self.options.effects.ambient_occlusion.set_strength(strength);
    }

    /// Whether depth-of-field is on.
    pub fn dof_enabled(&self) -> bool {
        self.options.effects.depth_of_field.enabled()
    }

    /// Switch depth-of-field; applies from the next `end()`.
    pub fn set_dof_enabled(&mut self, enabled: bool) {
        self.options.effects.depth_of_field.set_enabled(enabled);
    }

    /// Depth-of-field strength.
    pub fn dof_strength(&self) -> f32 {
        self.options.effects.depth_of_field.strength()
    }

    /// Set depth-of-field strength; negative and NaN become 0.
    pub fn set_dof_strength(&mut self, strength: f32) {
        self.options.effects.depth_of_field.set_strength(strength);
    }

    /// Whether edge detection is on.
    pub fn ed_enabled(&self) -> bool {
        self.options.effects.edge_detection.enabled()
    }

    /// Switch edge detection; its strength follows.
    pub fn set_ed_enabled(&mut self, enabled: bool) {
        self.options.effects.edge_detection.set_enabled(enabled);
    }

    /// Edge-detection strength: 1.0 when enabled, 0.0 when not.
    pub fn ed_strength(&self) -> f32 {
        self.options.effects.edge_detection.strength()
    }

    // -- Options --------------------------------------------------------

    /// Current effect and post-processing settings.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace every setting; strengths are clamped. Applies from the next
    /// `begin()` (background) or `end()` (everything else).
    pub fn set_options(&mut self, options: Options) {
        self.options = options.sanitized();
    }

    /// Load settings from a TOML preset.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Io`] or [`PipelineError::OptionsParse`]; the
    /// current settings are kept.
    pub fn load_preset(&mut self, path: &Path) -> Result<(), PipelineError> {
        self.options = Options::load(path)?;
        Ok(())
    }

    // -- Inspection -----------------------------------------------------

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Viewport and camera state.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Depth offset used for draws in the open frame.
    pub fn depth_offset(&self) -> &DepthOffset {
        &self.offset
    }

    /// Physical size of the live render targets, if allocated.
    pub fn render_extent(&self) -> Option<TargetExtent> {
        self.backend.extent()
    }

    /// Read the last composited frame back to the CPU.
    ///
    /// # Errors
    ///
    /// [`PipelineError::StateViolation`] when no targets are allocated,
    /// [`PipelineError::Readback`] if the GPU copy fails.
    pub fn read_frame(&mut self) -> Result<Frame, PipelineError> {
        if self.lifecycle == Lifecycle::Released {
            return Err(self.violation("read_frame", ViolationReason::WrongState));
        }
        self.backend.read_frame()
    }
}

impl Drop for SolidPipeline {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(width: i32, height: i32) -> SolidPipeline {
        let mut pipeline = SolidPipeline::software();
        pipeline.resize(width, height).unwrap();
        pipeline.initialize().unwrap();
        pipeline
    }

    #[test]
    fn lifecycle_walks_through_states() {
        let mut pipeline = ready(4, 4);
        assert_eq!(pipeline.lifecycle(), Lifecycle::Idle);
        pipeline.begin().unwrap();
        assert_eq!(pipeline.lifecycle(), Lifecycle::FrameOpen);
        pipeline.end().unwrap();
        assert_eq!(pipeline.lifecycle(), Lifecycle::Idle);
        pipeline.release();
        assert_eq!(pipeline.lifecycle(), Lifecycle::Released);
        pipeline.release();
        assert_eq!(pipeline.render_extent(), None);
    }

    #[test]
    fn initialize_twice_is_a_no_op() {
        let mut pipeline = ready(4, 4);
        let generation = pipeline.backend.generation();
        pipeline.initialize().unwrap();
        assert_eq!(pipeline.backend.generation(), generation);
    }

    #[test]
    fn initialize_after_release_fails() {
        let mut pipeline = ready(4, 4);
        pipeline.release();
        assert!(matches!(
            pipeline.initialize(),
            Err(PipelineError::StateViolation(StateViolation {
                state: Lifecycle::Released,
                ..
            }))
        ));
    }

    #[test]
    fn empty_viewport_defers_allocation() {
        let mut pipeline = SolidPipeline::software();
        pipeline.initialize().unwrap();
        assert_eq!(pipeline.render_extent(), None);
        assert!(matches!(
            pipeline.begin(),
            Err(PipelineError::StateViolation(StateViolation {
                reason: ViolationReason::MissingTargets,
                ..
            }))
        ));
        pipeline.resize(10, 5).unwrap();
        assert_eq!(pipeline.render_extent(), Some(TargetExtent::new(10, 5)));
        pipeline.begin().unwrap();
    }

    #[test]
    fn nested_begin_discards_the_open_frame() {
        let mut pipeline = ready(4, 4);
        pipeline.begin().unwrap();
        let err = pipeline.begin().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StateViolation(StateViolation {
                operation: "begin",
                state: Lifecycle::FrameOpen,
                reason: ViolationReason::WrongState,
            })
        ));
        assert_eq!(pipeline.lifecycle(), Lifecycle::Idle);
        pipeline.begin().unwrap();
    }

    #[test]
    fn resize_mid_frame_is_rejected() {
        let mut pipeline = ready(4, 4);
        pipeline.begin().unwrap();
        assert!(pipeline.resize(8, 8).is_err());
        assert!(pipeline.set_pixel_ratio(2.0).is_err());
        assert_eq!(pipeline.render_extent(), Some(TargetExtent::new(4, 4)));
        assert_eq!(pipeline.state().width, 4);
    }

    #[test]
    fn draw_and_offset_need_an_open_frame() {
        struct Nothing;
        impl SolidGeometry for Nothing {}

        let mut pipeline = ready(4, 4);
        assert!(pipeline.draw(&Nothing).is_err());
        assert!(pipeline.adjust_offset(&crate::camera::Camera::default()).is_err());
        assert_eq!(pipeline.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn adjust_offset_records_view() {
        let camera = crate::camera::Camera {
            eye: glam::Vec3::new(0.0, 0.0, 30.0),
            ..crate::camera::Camera::default()
        };
        let mut pipeline = ready(4, 4);
        pipeline.begin().unwrap();
        pipeline.adjust_offset(&camera).unwrap();
        assert_eq!(pipeline.state().view, camera.build_view());
        assert!((pipeline.depth_offset().focal_distance - 30.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_ratio_is_a_configuration_error() {
        let mut pipeline = ready(4, 4);
        for ratio in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                pipeline.set_pixel_ratio(ratio),
                Err(PipelineError::Configuration(_))
            ));
        }
        assert_eq!(pipeline.state().pixel_ratio, 1.0);
    }

    #[test]
    fn oversized_viewport_keeps_old_targets() {
        let mut pipeline = ready(4, 4);
        assert!(matches!(
            pipeline.resize(100_000, 4),
            Err(PipelineError::Allocation(_))
        ));
        assert_eq!(pipeline.render_extent(), Some(TargetExtent::new(4, 4)));
        assert_eq!(pipeline.state().width, 4);
        pipeline.begin().unwrap();
        pipeline.end().unwrap();
    }

    #[test]
    fn read_frame_needs_targets() {
        let mut pipeline = SolidPipeline::software();
        assert!(pipeline.read_frame().is_err());
    }
}
