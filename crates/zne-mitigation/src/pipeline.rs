//! The caller-facing extrapolation run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use zne_hal::{ExecutionOptions, Executor};
use zne_ir::{Circuit, Observable};

use crate::cancel::CancellationToken;
use crate::dataset::{ExtrapolationDataset, count_distinct};
use crate::error::{MitigationError, MitigationResult};
use crate::extrapolation::{Extrapolation, FitModel, fit};
use crate::folding::FoldingStrategy;
use crate::orchestrator::{RetryPolicy, SamplingOptions, SamplingOrchestrator};
use crate::scale::ScaleFactor;

/// Everything that parameterizes one extrapolation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZneOptions {
    /// Noise levels to sample, in request order.
    pub scale_factors: Vec<ScaleFactor>,
    /// How circuits are folded.
    pub folding: FoldingStrategy,
    /// Curve fitted through the samples.
    pub model: FitModel,
    /// Maximum executor calls in flight.
    pub concurrency_limit: usize,
    /// Retry policy for executor calls.
    pub retry: RetryPolicy,
    /// Options forwarded to the executor.
    pub execution: ExecutionOptions,
}

impl Default for ZneOptions {
    fn default() -> Self {
        Self {
            scale_factors: ScaleFactor::odd(3),
            folding: FoldingStrategy::default(),
            model: FitModel::default(),
            concurrency_limit: 4,
            retry: RetryPolicy::default(),
            execution: ExecutionOptions::default(),
        }
    }
}

impl ZneOptions {
    /// Create options with the defaults: λ ∈ {1, 3, 5}, global folding,
    /// linear fit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scale factors.
    pub fn with_scale_factors(mut self, scale_factors: Vec<ScaleFactor>) -> Self {
        self.scale_factors = scale_factors;
        self
    }

    /// Set the folding strategy.
    pub fn with_folding(mut self, folding: FoldingStrategy) -> Self {
        self.folding = folding;
        self
    }

    /// Set the fit model.
    pub fn with_model(mut self, model: FitModel) -> Self {
        self.model = model;
        self
    }

    /// Set the concurrency limit.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the execution options.
    pub fn with_execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = execution;
        self
    }

    /// Check that the requested scale factors can support the model.
    ///
    /// Runs before any sampling so an impossible fit never costs executor time.
    pub fn validate(&self) -> MitigationResult<()> {
        if self.concurrency_limit == 0 {
            return Err(MitigationError::InvalidOptions(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        if self.scale_factors.len() < 2 {
            return Err(MitigationError::InsufficientData {
                got: self.scale_factors.len(),
                needed: 2,
            });
        }
        let distinct = count_distinct(self.scale_factors.iter().map(|s| s.value()));
        let needed = self.model.min_distinct();
        if distinct < needed {
            return Err(MitigationError::UnderdeterminedFit {
                model: self.model.to_string(),
                got: distinct,
                needed,
            });
        }
        Ok(())
    }

    /// Dispatch settings for the orchestrator.
    pub fn sampling(&self) -> SamplingOptions {
        SamplingOptions {
            concurrency_limit: self.concurrency_limit,
            retry: self.retry.clone(),
            execution: self.execution,
        }
    }
}

/// Outcome of an extrapolation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZneResult {
    /// Estimated noiseless expectation value.
    pub ideal_value: f64,
    /// The λ = 1 sample, when 1 was among the scale factors.
    pub unmitigated_value: Option<f64>,
    /// Samples in request order.
    pub dataset: ExtrapolationDataset,
    /// The fitted model and its diagnostics.
    pub fit: Extrapolation,
}

/// Estimate the noiseless expectation value of `observable` after `circuit`.
///
/// Folds the circuit at every scale factor, samples each variant on
/// `executor`, fits the samples and evaluates the fit at λ = 0.
#[instrument(skip_all, fields(
    executor = executor.name(),
    circuit = circuit.name(),
    model = %options.model,
))]
pub async fn extrapolate<E: Executor + ?Sized + 'static>(
    executor: Arc<E>,
    circuit: &Circuit,
    observable: &Observable,
    options: &ZneOptions,
    cancel: &CancellationToken,
) -> MitigationResult<ZneResult> {
    options.validate()?;

    let orchestrator = SamplingOrchestrator::new(executor, options.sampling())?;
    let dataset = orchestrator
        .run(
            circuit,
            observable,
            &options.scale_factors,
            options.folding,
            cancel,
        )
        .await?;

    let fit = fit(&dataset, options.model)?;
    let unmitigated_value = dataset.unmitigated().map(|s| s.value);

    info!(
        ideal = fit.estimate,
        unmitigated = ?unmitigated_value,
        r_squared = fit.r_squared,
        "Zero-noise extrapolation complete"
    );

    Ok(ZneResult {
        ideal_value: fit.estimate,
        unmitigated_value,
        dataset,
        fit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let options = ZneOptions::new();
        assert!(options.validate().is_ok());
        assert_eq!(options.sampling().concurrency_limit, 4);
    }

    #[test]
    fn test_validate_rejects_single_factor() {
        let options = ZneOptions::new().with_scale_factors(vec![ScaleFactor::ONE]);
        assert!(matches!(
            options.validate(),
            Err(MitigationError::InsufficientData { got: 1, needed: 2 })
        ));
    }

    #[test]
    fn test_validate_checks_model_against_factors() {
        let options = ZneOptions::new()
            .with_scale_factors(ScaleFactor::odd(2))
            .with_model(FitModel::Exponential);
        assert!(matches!(
            options.validate(),
            Err(MitigationError::UnderdeterminedFit { got: 2, needed: 3, .. })
        ));

        let options = ZneOptions::new().with_model(FitModel::Polynomial { degree: usize::MAX });
        assert!(matches!(
            options.validate(),
            Err(MitigationError::UnderdeterminedFit { got: 3, needed: usize::MAX, .. })
        ));
    }
}
