//! Rendering subsystems for the solid pipeline.
//!
//! Contains the render-target set shared by every pass, the solid
//! geometry pass that hosts draw into, and the screen-space post-process
//! chain (ambient occlusion, depth-of-field, edge detection, composite).

pub(crate) mod postprocess;
pub mod solid_pass;
pub mod target_set;
