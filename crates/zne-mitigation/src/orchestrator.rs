//! Sampling across scale factors.
//!
//! The orchestrator folds the circuit once per requested scale factor, then
//! dispatches one executor call per folded variant. Calls run concurrently on
//! a [`JoinSet`], bounded by a semaphore, and each result lands in the slot of
//! its scale factor, so the dataset comes out in request order whatever the
//! completion order was.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use zne_hal::{ExecutionOptions, Executor, ExpectationValue, HalError};
use zne_ir::{Circuit, Observable};

use crate::cancel::CancellationToken;
use crate::dataset::{ExtrapolationDataset, Sample};
use crate::error::{MitigationError, MitigationResult};
use crate::folding::{FoldedCircuit, FoldingStrategy, fold};
use crate::scale::ScaleFactor;

/// Retry policy for failing executor calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts.
    pub max_backoff: Duration,
    /// Time limit for a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): initial · 2^(retry−1),
    /// capped at `max_backoff`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

/// Dispatch settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Maximum executor calls in flight.
    pub concurrency_limit: usize,
    /// Retry policy per scale factor.
    pub retry: RetryPolicy,
    /// Options forwarded to the executor. A seed is offset by the index of
    /// the scale factor.
    pub execution: ExecutionOptions,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            retry: RetryPolicy::default(),
            execution: ExecutionOptions::default(),
        }
    }
}

/// Drives an executor across scale factors.
pub struct SamplingOrchestrator<E: ?Sized> {
    executor: Arc<E>,
    options: SamplingOptions,
}

impl<E: Executor + ?Sized + 'static> SamplingOrchestrator<E> {
    /// Create an orchestrator.
    pub fn new(executor: Arc<E>, options: SamplingOptions) -> MitigationResult<Self> {
        if options.concurrency_limit == 0 {
            return Err(MitigationError::InvalidOptions(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        Ok(Self { executor, options })
    }

    /// Get the sampling options.
    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    /// Sample `observable` on `circuit` at every scale factor.
    ///
    /// Folding errors abort before the executor sees any request. Any sample
    /// that still fails after its retries aborts the whole run; so does
    /// cancellation. A partial dataset is never returned.
    #[instrument(skip_all, fields(
        executor = self.executor.name(),
        circuit = circuit.name(),
        scale_factors = scale_factors.len(),
        strategy = %strategy,
    ))]
    pub async fn run(
        &self,
        circuit: &Circuit,
        observable: &Observable,
        scale_factors: &[ScaleFactor],
        strategy: FoldingStrategy,
        cancel: &CancellationToken,
    ) -> MitigationResult<ExtrapolationDataset> {
        let folded = scale_factors
            .iter()
            .map(|&scale| fold(circuit, scale, strategy))
            .collect::<MitigationResult<Vec<_>>>()?;

        if cancel.is_cancelled() {
            return Err(MitigationError::Cancelled);
        }

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency_limit));
        let observable = Arc::new(observable.clone());
        let mut tasks = JoinSet::new();

        for (index, variant) in folded.into_iter().enumerate() {
            let executor = Arc::clone(&self.executor);
            let semaphore = Arc::clone(&semaphore);
            let observable = Arc::clone(&observable);
            let retry = self.options.retry.clone();
            let mut options = self.options.execution;
            options.seed = options.seed.map(|seed| seed.wrapping_add(index as u64));

            tasks.spawn(async move {
                let result = sample_with_retry(
                    executor.as_ref(),
                    &semaphore,
                    &variant,
                    &observable,
                    &options,
                    &retry,
                )
                .await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Sample>> = vec![None; scale_factors.len()];
        loop {
            let joined = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tasks.abort_all();
                    warn!("Extrapolation cancelled; aborted in-flight samples");
                    return Err(MitigationError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok((index, Ok(value)))) => {
                    slots[index] = Some(Sample {
                        scale_factor: scale_factors[index].value(),
                        value: value.value,
                        std_error: value.std_error,
                    });
                }
                Some(Ok((_, Err(e)))) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Some(Err(e)) => {
                    tasks.abort_all();
                    return Err(MitigationError::Task(e.to_string()));
                }
            }
        }

        let samples = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| MitigationError::Task("a sampling task finished without a result".into()))?;

        info!(
            samples = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sampling complete"
        );
        Ok(ExtrapolationDataset::new(samples))
    }
}

/// Execute one folded circuit, retrying transient failures.
///
/// A permit is held for each attempt only; it is released while backing
/// off so other scale factors can dispatch in the meantime.
async fn sample_with_retry<E: Executor + ?Sized>(
    executor: &E,
    semaphore: &Semaphore,
    variant: &FoldedCircuit,
    observable: &Observable,
    options: &ExecutionOptions,
    retry: &RetryPolicy,
) -> MitigationResult<ExpectationValue> {
    let scale_factor = variant.scale_factor.value();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let Ok(permit) = semaphore.acquire().await else {
            return Err(MitigationError::Cancelled);
        };
        let call = executor.execute(&variant.circuit, observable, options);
        let outcome = match retry.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(HalError::Timeout(limit.as_millis() as u64))),
            None => call.await,
        };
        drop(permit);

        match outcome {
            Ok(value) if value.value.is_finite() => {
                debug!(
                    scale_factor,
                    achieved = variant.achieved_scale_factor(),
                    value = value.value,
                    attempt,
                    "Sample received"
                );
                return Ok(value);
            }
            Ok(value) => {
                return Err(MitigationError::InvalidSample {
                    scale_factor,
                    value: value.value,
                });
            }
            Err(e) if e.is_transient() && attempt <= retry.max_retries => {
                let backoff = retry.backoff(attempt);
                warn!(
                    scale_factor,
                    attempt,
                    error = %e,
                    "Retrying after transient failure (backoff {:?})",
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(source) => {
                return Err(MitigationError::ExecutionFailure {
                    scale_factor,
                    attempts: attempt,
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            attempt_timeout: None,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        struct Never;

        #[async_trait::async_trait]
        impl Executor for Never {
            fn name(&self) -> &str {
                "never"
            }

            async fn execute(
                &self,
                _circuit: &Circuit,
                _observable: &Observable,
                _options: &ExecutionOptions,
            ) -> zne_hal::HalResult<ExpectationValue> {
                Err(HalError::Unavailable("never".into()))
            }
        }

        let options = SamplingOptions {
            concurrency_limit: 0,
            ..SamplingOptions::default()
        };
        assert!(matches!(
            SamplingOrchestrator::new(Arc::new(Never), options),
            Err(MitigationError::InvalidOptions(_))
        ));
    }
}
