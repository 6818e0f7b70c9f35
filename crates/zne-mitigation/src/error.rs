//! Error types for noise scaling, sampling and extrapolation.

use thiserror::Error;
use zne_hal::HalError;

use crate::config::ConfigError;

/// Errors that abort an extrapolation run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MitigationError {
    /// Scale factor below 1 or not finite.
    #[error("Invalid scale factor {0}: must be finite and at least 1")]
    InvalidScaleFactor(f64),

    /// Nothing to fold.
    #[error("Cannot fold an empty circuit")]
    EmptyCircuit,

    /// An instruction has no adjoint.
    #[error("Instruction {index} ('{name}') has no inverse and cannot be folded")]
    NonInvertibleGate {
        /// Position of the instruction in the circuit.
        index: usize,
        /// Instruction name.
        name: String,
    },

    /// The executor kept failing for one scale factor.
    #[error("Execution failed at scale factor {scale_factor} after {attempts} attempt(s): {source}")]
    ExecutionFailure {
        /// The offending scale factor.
        scale_factor: f64,
        /// Attempts made, including the first.
        attempts: u32,
        /// The last executor error.
        #[source]
        source: HalError,
    },

    /// Too few samples for any fit.
    #[error("Insufficient data: {got} sample(s), at least {needed} required")]
    InsufficientData {
        /// Samples available.
        got: usize,
        /// Samples required.
        needed: usize,
    },

    /// Too few distinct scale factors for the requested model.
    #[error("Underdetermined fit: {model} needs {needed} distinct scale factors, got {got}")]
    UnderdeterminedFit {
        /// Model name.
        model: String,
        /// Distinct scale factors available.
        got: usize,
        /// Distinct scale factors required.
        needed: usize,
    },

    /// A sample that cannot enter a fit.
    #[error("Invalid sample at scale factor {scale_factor}: value {value} is not finite")]
    InvalidSample {
        /// Scale factor of the sample.
        scale_factor: f64,
        /// The offending value.
        value: f64,
    },

    /// The solver could not produce finite parameters.
    #[error("Fit failed: {0}")]
    FitFailed(String),

    /// The run was cancelled before every sample arrived.
    #[error("Extrapolation cancelled")]
    Cancelled,

    /// Invalid run options.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A sampling task panicked.
    #[error("Sampling task failed: {0}")]
    Task(String),
}

impl MitigationError {
    /// Whether the error comes from the input rather than the executor.
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            MitigationError::ExecutionFailure { .. }
                | MitigationError::Cancelled
                | MitigationError::Task(_)
        )
    }
}

/// Result type for mitigation operations.
pub type MitigationResult<T> = Result<T, MitigationError>;
