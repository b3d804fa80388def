//! Compositor error types.

use crate::compositor::SceneDraw;
use crate::pass::PassDescriptor;
use crate::target::TargetId;

/// Errors that abort a frame.
///
/// None of these are recoverable within the frame: they indicate a
/// configuration mistake or a broken resource lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum CompositorError {
    /// A pass expected `expected` to be bound but found `actual`.
    #[error("render target {expected:?} is not bound (bound: {actual:?})")]
    TargetNotBound { expected: TargetId, actual: TargetId },

    /// Drawing was attempted after the render targets were released.
    #[error("render targets used after release")]
    TargetsReleased,

    /// No pipeline was built for this draw and pass state.
    #[error("no pipeline for {draw:?} with {pass:?}")]
    MissingPipeline { draw: SceneDraw, pass: PassDescriptor },

    /// A required per-frame or per-scene value is absent or not finite.
    #[error("missing or invalid parameter: {0}")]
    MissingParameter(&'static str),

    /// A pass tried to sample the target it is rendering into.
    #[error("target {0:?} cannot be sampled while bound")]
    SourceIsBound(TargetId),

    /// The backend rejected an operation.
    #[error("render device error: {0}")]
    Device(String),
}
