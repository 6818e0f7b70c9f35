//! Sampling orchestration against scripted executors.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use zne_hal::{ExecutionOptions, Executor, ExpectationValue, HalError, HalResult};
use zne_ir::{Circuit, Observable};
use zne_mitigation::{
    CancellationToken, FitModel, FoldingStrategy, MitigationError, RetryPolicy, SamplingOptions,
    SamplingOrchestrator, ScaleFactor, ZneOptions, extrapolate,
};

const BASE_LEN: usize = 10;

fn ten_x() -> Circuit {
    Circuit::x_chain(BASE_LEN).unwrap()
}

fn z() -> Observable {
    "Z".parse().unwrap()
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        attempt_timeout: None,
    }
}

fn scale_of(circuit: &Circuit) -> f64 {
    circuit.len() as f64 / BASE_LEN as f64
}

/// Returns `intercept + slope * λ`, where λ is read off the circuit length.
///
/// Larger circuits answer sooner, so completion order is the reverse of
/// request order.
struct LinearNoise {
    intercept: f64,
    slope: f64,
    calls: AtomicUsize,
}

impl LinearNoise {
    fn new(intercept: f64, slope: f64) -> Self {
        Self {
            intercept,
            slope,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Executor for LinearNoise {
    fn name(&self) -> &str {
        "linear_noise"
    }

    async fn execute(
        &self,
        circuit: &Circuit,
        _observable: &Observable,
        _options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scale = scale_of(circuit);
        let delay = 60u64.saturating_sub((scale * 10.0) as u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(ExpectationValue::new(self.intercept + self.slope * scale))
    }
}

/// Fails with a transient error for the first `failures` calls.
struct Flaky {
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl Executor for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn execute(
        &self,
        circuit: &Circuit,
        _observable: &Observable,
        _options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(HalError::Unavailable("calibrating".into()));
        }
        Ok(ExpectationValue::new(1.0 - 0.01 * scale_of(circuit)))
    }
}

/// Always rejects the request with the given error.
struct Rejecting {
    transient: bool,
    calls: AtomicU32,
}

#[async_trait]
impl Executor for Rejecting {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn execute(
        &self,
        _circuit: &Circuit,
        _observable: &Observable,
        _options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.transient {
            Err(HalError::ExecutionFailed("device offline".into()))
        } else {
            Err(HalError::CircuitTooLarge("too many gates".into()))
        }
    }
}

/// Never answers.
struct Hanging;

#[async_trait]
impl Executor for Hanging {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn execute(
        &self,
        _circuit: &Circuit,
        _observable: &Observable,
        _options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        std::future::pending().await
    }
}

/// Records the seed of every request, keyed by scale factor.
#[derive(Default)]
struct SeedRecorder {
    seen: Mutex<Vec<(f64, Option<u64>)>>,
}

#[async_trait]
impl Executor for SeedRecorder {
    fn name(&self) -> &str {
        "seed_recorder"
    }

    async fn execute(
        &self,
        circuit: &Circuit,
        _observable: &Observable,
        options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        self.seen
            .lock()
            .unwrap()
            .push((scale_of(circuit), options.seed));
        Ok(ExpectationValue::new(0.5))
    }
}

/// Records the scale factor of every call and fails the first λ = 1 call.
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<f64>>,
}

#[async_trait]
impl Executor for CallLog {
    fn name(&self) -> &str {
        "call-log"
    }

    async fn execute(
        &self,
        circuit: &Circuit,
        _observable: &Observable,
        _options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        let scale = scale_of(circuit);
        let first_base_call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(scale);
            calls.len() == 1 && (scale - 1.0).abs() < 1e-12
        };
        if first_base_call {
            return Err(HalError::Unavailable("calibrating".into()));
        }
        Ok(ExpectationValue::new(1.0 - 0.01 * scale))
    }
}

/// Tracks the largest number of concurrent calls.
#[derive(Default)]
struct ConcurrencyTracker {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Executor for ConcurrencyTracker {
    fn name(&self) -> &str {
        "tracker"
    }

    async fn execute(
        &self,
        _circuit: &Circuit,
        _observable: &Observable,
        _options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(ExpectationValue::new(1.0))
    }
}

#[tokio::test]
async fn dataset_keeps_request_order() {
    let executor = Arc::new(LinearNoise::new(0.95, -0.02));
    let orchestrator = SamplingOrchestrator::new(executor.clone(), SamplingOptions::default()).unwrap();
    let scale_factors = ScaleFactor::odd(5);

    let dataset = orchestrator
        .run(
            &ten_x(),
            &z(),
            &scale_factors,
            FoldingStrategy::Global,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(dataset.len(), 5);
    assert_eq!(dataset.scale_factors(), vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    for sample in dataset.samples() {
        assert!((sample.value - (0.95 - 0.02 * sample.scale_factor)).abs() < 1e-12);
    }
    assert_eq!(executor.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn linear_extrapolation_recovers_intercept() {
    let executor = Arc::new(LinearNoise::new(0.95, -0.02));
    let options = ZneOptions::new().with_retry(fast_retry(0));

    let result = extrapolate(executor, &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap();

    assert!((result.ideal_value - 0.95).abs() < 1e-12);
    let unmitigated = result.unmitigated_value.unwrap();
    assert!((unmitigated - 0.93).abs() < 1e-12);
    assert_eq!(result.fit.model, FitModel::Linear);
}

#[tokio::test]
async fn noiseless_executor_extrapolates_to_one() {
    let executor = Arc::new(LinearNoise::new(1.0, 0.0));
    let result = extrapolate(
        executor,
        &ten_x(),
        &z(),
        &ZneOptions::new(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!((result.ideal_value - 1.0).abs() < 1e-12);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let executor = Arc::new(Flaky {
        failures: 2,
        calls: AtomicU32::new(0),
    });
    let options = ZneOptions::new()
        .with_concurrency_limit(1)
        .with_retry(fast_retry(2));

    let result = extrapolate(executor.clone(), &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.dataset.len(), 3);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 5);
    assert!((result.ideal_value - 1.0).abs() < 1e-12);
}

#[tokio::test]
async fn exhausted_retries_name_the_scale_factor() {
    let executor = Arc::new(Rejecting {
        transient: true,
        calls: AtomicU32::new(0),
    });
    let options = ZneOptions::new()
        .with_scale_factors(vec![ScaleFactor::ONE, ScaleFactor::new(3.0).unwrap()])
        .with_concurrency_limit(1)
        .with_retry(fast_retry(2));

    let err = extrapolate(executor, &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        MitigationError::ExecutionFailure {
            scale_factor,
            attempts,
            source,
        } => {
            assert_eq!(scale_factor, 1.0);
            assert_eq!(attempts, 3);
            assert!(matches!(source, HalError::ExecutionFailed(_)));
        }
        other => panic!("Expected ExecutionFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let executor = Arc::new(Rejecting {
        transient: false,
        calls: AtomicU32::new(0),
    });
    let options = ZneOptions::new()
        .with_concurrency_limit(1)
        .with_retry(fast_retry(5));

    let err = extrapolate(executor.clone(), &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MitigationError::ExecutionFailure { attempts: 1, .. }
    ));
    // At most one call per scale factor, never a retry.
    assert!(executor.calls.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn folding_errors_never_reach_the_executor() {
    let executor = Arc::new(LinearNoise::new(1.0, 0.0));
    let empty = Circuit::new("empty", 1);

    let err = extrapolate(
        executor.clone(),
        &empty,
        &z(),
        &ZneOptions::new(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MitigationError::EmptyCircuit));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancellation_aborts_the_run() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = extrapolate(
        Arc::new(Hanging),
        &ten_x(),
        &z(),
        &ZneOptions::new(),
        &token,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MitigationError::Cancelled));
}

#[tokio::test]
async fn cancelled_token_dispatches_nothing() {
    let executor = Arc::new(LinearNoise::new(1.0, 0.0));
    let token = CancellationToken::new();
    token.cancel();

    let err = extrapolate(executor.clone(), &ten_x(), &z(), &ZneOptions::new(), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, MitigationError::Cancelled));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn attempt_timeout_is_transient() {
    let options = ZneOptions::new().with_retry(RetryPolicy {
        max_retries: 1,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(10),
        attempt_timeout: Some(Duration::from_millis(50)),
    });

    let err = extrapolate(
        Arc::new(Hanging),
        &ten_x(),
        &z(),
        &options,
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        MitigationError::ExecutionFailure {
            attempts, source, ..
        } => {
            assert_eq!(attempts, 2);
            assert!(matches!(source, HalError::Timeout(50)));
        }
        other => panic!("Expected ExecutionFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn seeds_are_offset_per_scale_factor() {
    let executor = Arc::new(SeedRecorder::default());
    let options = ZneOptions::new().with_execution(ExecutionOptions::new().with_seed(100));

    extrapolate(executor.clone(), &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap();

    let mut seen = executor.seen.lock().unwrap().clone();
    seen.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(
        seen,
        vec![(1.0, Some(100)), (3.0, Some(101)), (5.0, Some(102))]
    );
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    let executor = Arc::new(ConcurrencyTracker::default());
    let options = ZneOptions::new()
        .with_scale_factors(ScaleFactor::odd(8))
        .with_concurrency_limit(2);

    let result = extrapolate(executor.clone(), &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.dataset.len(), 8);
    assert!(executor.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(start_paused = true)]
async fn backoff_releases_the_concurrency_slot() {
    let executor = Arc::new(CallLog::default());
    let options = ZneOptions::new()
        .with_scale_factors(vec![ScaleFactor::new(1.0).unwrap(), ScaleFactor::new(3.0).unwrap()])
        .with_concurrency_limit(1)
        .with_retry(RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(10),
            attempt_timeout: None,
        });

    let result = extrapolate(executor.clone(), &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.dataset.len(), 2);
    assert_eq!(*executor.calls.lock().unwrap(), vec![1.0, 3.0, 1.0]);
}

#[tokio::test]
async fn underdetermined_model_fails_before_sampling() {
    let executor = Arc::new(LinearNoise::new(1.0, 0.0));
    let options = ZneOptions::new()
        .with_scale_factors(ScaleFactor::odd(2))
        .with_model(FitModel::Polynomial { degree: 2 });

    let err = extrapolate(executor.clone(), &ten_x(), &z(), &options, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MitigationError::UnderdeterminedFit { .. }));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
}
