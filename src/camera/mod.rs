//! Camera adapter for the solid pipeline.
//!
//! The host scene owns and updates the camera; the pipeline only reads its
//! transforms through [`CameraView`] when recomputing the per-frame
//! [`DepthOffset`].

/// Core camera struct and the read-only view trait.
pub mod core;
/// Per-frame depth bias and focal depth derived from a camera.
pub mod offset;

pub use self::core::{Camera, CameraView};
pub use self::offset::DepthOffset;
