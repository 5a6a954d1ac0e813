//! Crate-level error types.
//!
//! Three kinds come straight out of the pipeline contract:
//! [`StateViolation`] for calls made in the wrong lifecycle state,
//! [`AllocationError`] for render-target creation failures and
//! [`ConfigurationError`] for viewport input rejected before any GPU work.

use std::fmt;

use crate::gpu::render_context::RenderContextError;
use crate::pipeline::Lifecycle;

/// Errors produced by the solid pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// An operation was called out of its allowed lifecycle state.
    StateViolation(StateViolation),
    /// Render-target allocation failed; previous targets are intact.
    Allocation(AllocationError),
    /// Viewport or pixel-ratio input was rejected; state is unchanged.
    Configuration(ConfigurationError),
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// WGSL composition failure.
    Shader(String),
    /// Reading the composited frame back from the GPU failed.
    Readback(String),
    /// The composited frame could not be shown on a surface.
    Presentation(String),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Generic I/O failure.
    Io(std::io::Error),
}

/// A lifecycle operation was invoked in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateViolation {
    /// Name of the rejected operation (`"begin"`, `"end"`, ...).
    pub operation: &'static str,
    /// Lifecycle state at the time of the call.
    pub state: Lifecycle,
    /// What the operation was missing.
    pub reason: ViolationReason,
}

/// Why a [`StateViolation`] was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    /// The lifecycle state does not permit this operation.
    WrongState,
    /// The render targets needed by the operation were never allocated.
    MissingTargets,
    /// An intermediate binding refers to targets from an older allocation.
    StaleTargets,
    /// No frame has been composited since the targets were last cleared.
    NothingComposited,
}

/// Render-target creation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// A physical dimension rounded to zero.
    EmptyExtent {
        /// Requested physical width.
        width: u32,
        /// Requested physical height.
        height: u32,
    },
    /// A physical dimension exceeds what the device supports.
    ExceedsDeviceLimit {
        /// Requested physical width.
        width: u32,
        /// Requested physical height.
        height: u32,
        /// Largest supported 2D texture dimension.
        limit: u32,
    },
    /// The device reported an error while creating the targets.
    Device(String),
}

/// Viewport input rejected before any allocation was attempted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigurationError {
    /// Width or height was not strictly positive.
    InvalidViewport {
        /// Requested logical width.
        width: i32,
        /// Requested logical height.
        height: i32,
    },
    /// Pixel ratio was not a finite positive number.
    InvalidPixelRatio(f32),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateViolation(e) => write!(f, "state violation: {e}"),
            Self::Allocation(e) => write!(f, "allocation error: {e}"),
            Self::Configuration(e) => write!(f, "configuration error: {e}"),
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Readback(msg) => write!(f, "readback error: {msg}"),
            Self::Presentation(msg) => write!(f, "presentation error: {msg}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for StateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ViolationReason::WrongState => write!(
                f,
                "`{}` is not allowed in the {:?} state",
                self.operation, self.state
            ),
            ViolationReason::MissingTargets => write!(
                f,
                "`{}` needs render targets but none are allocated",
                self.operation
            ),
            ViolationReason::StaleTargets => write!(
                f,
                "`{}` found bindings from a previous target allocation",
                self.operation
            ),
            ViolationReason::NothingComposited => write!(
                f,
                "`{}` needs a composited frame; call `end` first",
                self.operation
            ),
        }
    }
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExtent { width, height } => {
                write!(f, "render targets of {width}x{height} are empty")
            }
            Self::ExceedsDeviceLimit {
                width,
                height,
                limit,
            } => write!(
                f,
                "render targets of {width}x{height} exceed the device limit \
                 of {limit}"
            ),
            Self::Device(msg) => write!(f, "device rejected targets: {msg}"),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidViewport { width, height } => {
                write!(f, "viewport {width}x{height} must be positive")
            }
            Self::InvalidPixelRatio(ratio) => {
                write!(f, "pixel ratio {ratio} must be finite and positive")
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StateViolation(e) => Some(e),
            Self::Allocation(e) => Some(e),
            Self::Configuration(e) => Some(e),
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for StateViolation {}
impl std::error::Error for AllocationError {}
impl std::error::Error for ConfigurationError {}

impl From<StateViolation> for PipelineError {
    fn from(e: StateViolation) -> Self {
        Self::StateViolation(e)
    }
}

impl From<AllocationError> for PipelineError {
    fn from(e: AllocationError) -> Self {
        Self::Allocation(e)
    }
}

impl From<ConfigurationError> for PipelineError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<RenderContextError> for PipelineError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_violation_names_operation_and_state() {
        let err = PipelineError::from(StateViolation {
            operation: "end",
            state: Lifecycle::Idle,
            reason: ViolationReason::WrongState,
        });
        let msg = err.to_string();
        assert!(msg.contains("`end`"));
        assert!(msg.contains("Idle"));
    }

    #[test]
    fn present_errors_explain_themselves() {
        let nothing = StateViolation {
            operation: "present",
            state: Lifecycle::Idle,
            reason: ViolationReason::NothingComposited,
        };
        assert!(nothing.to_string().contains("call `end` first"));
        let err = PipelineError::Presentation("no surface".to_owned());
        assert_eq!(err.to_string(), "presentation error: no surface");
    }

    #[test]
    fn allocation_error_reports_limit() {
        let err = AllocationError::ExceedsDeviceLimit {
            width: 9000,
            height: 10,
            limit: 8192,
        };
        assert!(err.to_string().contains("8192"));
    }
}
