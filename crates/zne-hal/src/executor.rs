//! Executor trait and execution options.
//!
//! An [`Executor`] turns a circuit and an observable into a single
//! expectation-value sample:
//!
//! ```text
//!   validate() ──→ execute() ──→ ExpectationValue
//!    (sync)          (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `validate()` | sync | provided | `HalResult<()>` |
//! | `execute()` | async | yes | `HalResult<ExpectationValue>` |

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use zne_ir::{Circuit, Observable};

use crate::error::HalResult;
use crate::result::ExpectationValue;

/// Per-request execution parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Number of shots. `None` lets the executor pick its default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
    /// Random seed for reproducible simulation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ExecutionOptions {
    /// Create options with the executor's defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shot count.
    pub fn with_shots(mut self, shots: u32) -> Self {
        self.shots = Some(shots);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Something that can estimate ⟨O⟩ after running a circuit.
///
/// # Contract
///
/// - `execute()` MUST NOT mutate the circuit or observable.
/// - Failures that will repeat on retry (bad input, unsupported features)
///   MUST be reported with a non-transient [`HalError`](crate::HalError)
///   variant so callers do not waste attempts.
/// - Implementations MUST be safe to call concurrently.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Get the name of this executor.
    fn name(&self) -> &str;

    /// Check that a request is well-formed before running it.
    ///
    /// The default checks the circuit's operands and that the observable
    /// spans the circuit's register.
    fn validate(&self, circuit: &Circuit, observable: &Observable) -> HalResult<()> {
        circuit.validate()?;
        observable.check_width(circuit.num_qubits())?;
        Ok(())
    }

    /// Run `circuit` and return the expectation value of `observable`.
    async fn execute(
        &self,
        circuit: &Circuit,
        observable: &Observable,
        options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue>;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn validate(&self, circuit: &Circuit, observable: &Observable) -> HalResult<()> {
        (**self).validate(circuit, observable)
    }

    async fn execute(
        &self,
        circuit: &Circuit,
        observable: &Observable,
        options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        (**self).execute(circuit, observable, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HalError;

    struct Constant(f64);

    #[async_trait]
    impl Executor for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        async fn execute(
            &self,
            circuit: &Circuit,
            observable: &Observable,
            _options: &ExecutionOptions,
        ) -> HalResult<ExpectationValue> {
            self.validate(circuit, observable)?;
            Ok(ExpectationValue::new(self.0))
        }
    }

    #[tokio::test]
    async fn test_execute_through_arc() {
        let executor: Arc<dyn Executor> = Arc::new(Constant(0.5));
        let circuit = Circuit::x_chain(4).unwrap();
        let observable: Observable = "Z".parse().unwrap();

        let value = executor
            .execute(&circuit, &observable, &ExecutionOptions::new())
            .await
            .unwrap();
        assert_eq!(value.value, 0.5);
        assert_eq!(executor.name(), "constant");
    }

    #[tokio::test]
    async fn test_default_validate_rejects_width_mismatch() {
        let circuit = Circuit::bell().unwrap();
        let observable: Observable = "Z".parse().unwrap();

        let err = Constant(1.0)
            .execute(&circuit, &observable, &ExecutionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidObservable(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_options_builder() {
        let opts = ExecutionOptions::new().with_shots(4000).with_seed(7);
        assert_eq!(opts.shots, Some(4000));
        assert_eq!(opts.seed, Some(7));

        let json = serde_json::to_string(&ExecutionOptions::new()).unwrap();
        assert_eq!(json, "{}");
    }
}
