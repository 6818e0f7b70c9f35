//! Error types for the executor layer.

use thiserror::Error;

/// Errors an executor can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Executor is not reachable or not accepting work.
    #[error("Executor not available: {0}")]
    Unavailable(String),

    /// Execution was accepted but failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Execution was cancelled by the executor.
    #[error("Execution cancelled")]
    Cancelled,

    /// Timed out waiting for the executor.
    #[error("Timeout after {0} ms")]
    Timeout(u64),

    /// Invalid circuit.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Observable cannot be measured on this circuit or executor.
    #[error("Invalid observable: {0}")]
    InvalidObservable(String),

    /// Circuit exceeds executor capabilities.
    #[error("Circuit exceeds executor capabilities: {0}")]
    CircuitTooLarge(String),

    /// Unsupported feature.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Generic executor error.
    #[error("Executor error: {0}")]
    Backend(String),
}

impl HalError {
    /// Whether retrying the same request may succeed.
    ///
    /// Input errors (bad circuit, bad observable, too large, unsupported) fail
    /// the same way every time; everything else is treated as a hardware or
    /// network hiccup.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            HalError::InvalidCircuit(_)
                | HalError::InvalidObservable(_)
                | HalError::CircuitTooLarge(_)
                | HalError::Unsupported(_)
        )
    }
}

impl From<zne_ir::IrError> for HalError {
    fn from(err: zne_ir::IrError) -> Self {
        match err {
            zne_ir::IrError::InvalidObservable(msg) => HalError::InvalidObservable(msg),
            other => HalError::InvalidCircuit(other.to_string()),
        }
    }
}

/// Result type for executor operations.
pub type HalResult<T> = Result<T, HalError>;
