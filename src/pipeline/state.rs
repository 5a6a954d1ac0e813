use glam::Mat4;

use crate::renderer::target_set::TargetExtent;

/// Lifecycle of a [`SolidPipeline`](super::SolidPipeline).
///
/// ```text
/// Uninitialized ─► Idle ◄─► FrameOpen
///                    │
///                    ▼
///                 Released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed; no targets yet.
    Uninitialized,
    /// Between frames.
    Idle,
    /// Between `begin()` and `end()`.
    FrameOpen,
    /// Torn down; every operation except the effect accessors fails.
    Released,
}

/// Viewport and camera state the render targets are derived from.
///
/// Changed only by `resize`, `set_pixel_ratio` and `adjust_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineState {
    /// Physical pixels per logical pixel; always finite and positive.
    pub pixel_ratio: f32,
    /// Logical viewport width.
    pub width: u32,
    /// Logical viewport height.
    pub height: u32,
    /// View transform of the camera last passed to `adjust_offset`.
    pub view: Mat4,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            width: 0,
            height: 0,
            view: Mat4::IDENTITY,
        }
    }
}

impl PipelineState {
    /// Physical extent the render targets must have for this state.
    pub fn render_extent(&self) -> TargetExtent {
        TargetExtent::from_logical(self.width, self.height, self.pixel_ratio)
    }
}
