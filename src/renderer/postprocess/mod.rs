//! Screen-space post-processing.
//!
//! The chain runs in a fixed order: ambient occlusion, depth-of-field,
//! edge detection, then the composite into the display target. Stages
//! whose effect is inactive are skipped rather than run as copies.

pub(crate) mod ambient_occlusion;
pub(crate) mod chain;
pub(crate) mod composite;
pub(crate) mod depth_of_field;
pub(crate) mod edge_detection;
pub(crate) mod post_process;
pub(crate) mod screen_pass;

use crate::camera::DepthOffset;
use crate::options::Options;
use crate::renderer::target_set::TargetExtent;

/// Per-frame inputs every stage derives its parameters from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PostProcessInputs<'a> {
    pub extent: TargetExtent,
    pub pixel_ratio: f32,
    pub offset: &'a DepthOffset,
    pub options: &'a Options,
}
