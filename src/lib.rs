// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Solid-geometry render pipeline for molecular scenes, built on wgpu.
//!
//! The pipeline renders opaque scene geometry into an off-screen target set
//! (color, normals, depth) and then runs a fixed chain of screen-space
//! effects over it: ambient occlusion → depth-of-field → edge detection →
//! final composite.
//!
//! # Key entry points
//!
//! - [`pipeline::SolidPipeline`] - the orchestrator and its frame lifecycle
//! - [`renderer::solid_pass::SolidGeometry`] - host hook for submitting draws
//! - [`camera::CameraView`] - view/projection source for depth-offset updates
//! - [`options::Options`] - effect toggles and post-processing presets
//!
//! # Frame lifecycle
//!
//! ```text
//! initialize() ─► begin() ─► draw(..)* ─► adjust_offset(camera)? ─► end()
//!                   ▲                                               │
//!                   └──────────────── present(context)? ◄───────────┘
//! ```
//!
//! `end()` composites into an internal display target; `present` replays
//! that composite into the surface of a [`gpu::render_context::RenderContext`]
//! and presents it, while `read_frame` copies it back to the CPU.
//!
//! `resize` and `set_pixel_ratio` reallocate the render targets between
//! frames. Two backends sit behind the same API: wgpu
//! ([`pipeline::SolidPipeline::new`]) and a deterministic CPU reference
//! ([`pipeline::SolidPipeline::software`]) used for headless rendering and
//! tests.

mod backend;
pub mod camera;
pub mod error;
pub mod gpu;
pub mod options;
pub mod pipeline;
pub mod renderer;

pub use backend::software::{Fragment, SoftwareTarget};
pub use error::PipelineError;
pub use pipeline::{Frame, Lifecycle, PipelineState, SolidPipeline};
