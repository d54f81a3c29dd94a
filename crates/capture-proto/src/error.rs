use crate::CaptureMethod;

/// Error taxonomy for every capture and streaming operation.
///
/// Propagation policy (see the fallback chain in `capture-engine::engine`):
/// `CaptureFailed` is recovered locally and folded into `AllMethodsFailed`;
/// every other variant surfaces immediately and aborts the fallback chain.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("window not found")]
    WindowNotFound,

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("compositor unavailable")]
    CompositorUnavailable,

    #[error("capture failed via {method:?}: {detail}")]
    CaptureFailed { method: CaptureMethod, detail: String },

    #[error("all capture methods failed: {attempts:?}")]
    AllMethodsFailed { attempts: Vec<(CaptureMethod, String)> },

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("unexpected OS error: {0}")]
    OSError(String),
}

impl CaptureError {
    /// `true` for errors the fallback chain should recover from locally
    /// (i.e. try the next method) rather than surface immediately.
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(self, CaptureError::CaptureFailed { .. } | CaptureError::CompositorUnavailable)
    }
}

/// Convenience alias used throughout the engine.
pub type CaptureResult<T> = Result<T, CaptureError>;
