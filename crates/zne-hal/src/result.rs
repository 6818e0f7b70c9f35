//! Expectation-value samples returned by executors.

use serde::{Deserialize, Serialize};

/// One estimate of ⟨O⟩.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationValue {
    /// The estimated expectation value.
    pub value: f64,
    /// Standard error of the estimate, if the executor reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_error: Option<f64>,
    /// Number of shots spent on the estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
    /// Execution time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl ExpectationValue {
    /// Create a bare sample.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            std_error: None,
            shots: None,
            execution_time_ms: None,
        }
    }

    /// Attach a standard error.
    pub fn with_std_error(mut self, std_error: f64) -> Self {
        self.std_error = Some(std_error);
        self
    }

    /// Attach the shot count.
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = Some(shots);
        self
    }

    /// Attach the execution time.
    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }
}
