//! The wgpu backend checked against the CPU reference backend.
//!
//! Runs on whatever headless adapter the machine offers (including GL);
//! every test returns early when there is none.

use solid_pipeline::error::{StateViolation, ViolationReason};
use solid_pipeline::gpu::render_context::RenderContext;
use solid_pipeline::options::Options;
use solid_pipeline::renderer::target_set::TargetExtent;
use solid_pipeline::{Frame, Lifecycle, PipelineError, SolidPipeline};

fn headless_context() -> Option<RenderContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(RenderContext::new_headless()) {
        Ok(context) => Some(context),
        Err(err) => {
            log::warn!("no headless adapter, skipping: {err}");
            None
        }
    }
}

fn gpu_pipeline(context: &RenderContext) -> SolidPipeline {
    SolidPipeline::new(context)
        .unwrap_or_else(|err| panic!("pipeline creation failed: {err}"))
}

fn styled(pipeline: &mut SolidPipeline, width: i32, height: i32) {
    let mut options = Options::default();
    options.post_processing.background = [0.2, 0.4, 0.6, 1.0];
    pipeline.set_options(options);
    pipeline.set_ao_enabled(true);
    pipeline.set_dof_enabled(true);
    pipeline.set_dof_strength(1.0);
    pipeline.set_ed_enabled(true);
    pipeline.resize(width, height).unwrap();
    pipeline.initialize().unwrap();
}

fn empty_frame(pipeline: &mut SolidPipeline) -> Frame {
    pipeline.begin().unwrap();
    pipeline.end().unwrap();
    pipeline.read_frame().unwrap()
}

/// Half-float targets and unorm quantization may differ from the CPU path
/// by one step per channel.
fn assert_frames_match(gpu: &Frame, cpu: &Frame) {
    assert_eq!((gpu.width, gpu.height), (cpu.width, cpu.height));
    for (i, (g, c)) in gpu.pixels.iter().zip(&cpu.pixels).enumerate() {
        assert!(
            g.iter().zip(c).all(|(a, b)| a.abs_diff(*b) <= 1),
            "pixel {i}: gpu {g:?} vs cpu {c:?}"
        );
    }
}

#[test]
fn pipeline_builds_on_the_headless_adapter() {
    let Some(context) = headless_context() else {
        return;
    };
    let mut pipeline = gpu_pipeline(&context);
    assert_eq!(pipeline.lifecycle(), Lifecycle::Uninitialized);
    pipeline.resize(4, 4).unwrap();
    pipeline.initialize().unwrap();
    assert_eq!(pipeline.render_extent(), Some(TargetExtent::new(4, 4)));
}

#[test]
fn cleared_frame_matches_software_through_every_effect() {
    let Some(context) = headless_context() else {
        return;
    };
    let mut gpu = gpu_pipeline(&context);
    let mut cpu = SolidPipeline::software();
    styled(&mut gpu, 32, 24);
    styled(&mut cpu, 32, 24);

    let gpu_frame = empty_frame(&mut gpu);
    let cpu_frame = empty_frame(&mut cpu);
    assert_eq!(cpu_frame.pixel(0, 0), Some([51, 102, 153, 255]));
    assert_frames_match(&gpu_frame, &cpu_frame);
}

#[test]
fn resize_at_double_ratio_matches_software() {
    let Some(context) = headless_context() else {
        return;
    };
    let mut gpu = gpu_pipeline(&context);
    let mut cpu = SolidPipeline::software();
    for pipeline in [&mut gpu, &mut cpu] {
        styled(pipeline, 800, 600);
        pipeline.set_pixel_ratio(2.0).unwrap();
        assert_eq!(
            pipeline.render_extent(),
            Some(TargetExtent::new(1600, 1200))
        );
    }

    let gpu_frame = empty_frame(&mut gpu);
    assert_eq!((gpu_frame.width, gpu_frame.height), (1600, 1200));
    assert_frames_match(&gpu_frame, &empty_frame(&mut cpu));
}

#[test]
fn frames_render_after_reallocation() {
    let Some(context) = headless_context() else {
        return;
    };
    let mut pipeline = gpu_pipeline(&context);
    styled(&mut pipeline, 16, 16);
    let _ = empty_frame(&mut pipeline);

    // Odd widths exercise padded readback rows.
    pipeline.resize(37, 5).unwrap();
    let frame = empty_frame(&mut pipeline);
    assert_eq!((frame.width, frame.height), (37, 5));
    assert!(frame
        .pixels
        .iter()
        .all(|p| p.iter().zip([51, 102, 153, 255]).all(|(a, b)| a.abs_diff(b) <= 1)));
}

#[test]
fn present_needs_a_composited_frame_and_a_surface() {
    let Some(mut context) = headless_context() else {
        return;
    };
    let mut pipeline = gpu_pipeline(&context);
    styled(&mut pipeline, 8, 8);

    let err = pipeline.present(&mut context).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::StateViolation(StateViolation {
            operation: "present",
            reason: ViolationReason::NothingComposited,
            ..
        })
    ));

    let _ = empty_frame(&mut pipeline);
    let err = pipeline.present(&mut context).unwrap_err();
    assert!(matches!(err, PipelineError::Presentation(_)), "{err}");
    assert_eq!(pipeline.lifecycle(), Lifecycle::Idle);

    pipeline.begin().unwrap();
    let err = pipeline.present(&mut context).unwrap_err();
    assert!(matches!(err, PipelineError::StateViolation(_)));
    assert_eq!(pipeline.lifecycle(), Lifecycle::Idle);
}

#[test]
fn software_pipeline_cannot_present() {
    let Some(mut context) = headless_context() else {
        return;
    };
    let mut pipeline = SolidPipeline::software();
    pipeline.resize(4, 4).unwrap();
    pipeline.initialize().unwrap();
    let _ = empty_frame(&mut pipeline);
    assert!(matches!(
        pipeline.present(&mut context),
        Err(PipelineError::Presentation(_))
    ));
}
