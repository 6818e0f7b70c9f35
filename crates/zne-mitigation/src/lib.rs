//! Zero-Noise Extrapolation
//!
//! Estimates the noiseless expectation value of an observable by running a
//! circuit at several amplified noise levels and extrapolating the results
//! back to zero noise.
//!
//! # Pipeline
//!
//! ```text
//!   Circuit ──fold(λ₁..λₖ)──→ folded variants ──Executor──→ samples ──fit──→ ⟨O⟩ at λ = 0
//! ```
//!
//! 1. [`folding`]: unitary folding scales noise without changing the ideal
//!    unitary (U → U (U†U)ⁿ plus a partial fold).
//! 2. [`orchestrator`]: one executor call per scale factor, concurrent up to
//!    a limit, with retries and cooperative cancellation.
//! 3. [`extrapolation`]: linear, polynomial, Richardson or exponential fit
//!    evaluated at λ = 0.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zne_mitigation::{CancellationToken, FitModel, ZneOptions, extrapolate};
//!
//! let options = ZneOptions::new().with_model(FitModel::Linear);
//! let result = extrapolate(
//!     Arc::new(executor),
//!     &circuit,
//!     &"Z".parse()?,
//!     &options,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! println!("mitigated: {:.4}", result.ideal_value);
//! ```

pub mod cancel;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extrapolation;
pub mod folding;
pub mod orchestrator;
pub mod pipeline;
pub mod scale;

pub use cancel::CancellationToken;
pub use config::{ConfigError, ZneConfig};
pub use dataset::{ExtrapolationDataset, Sample};
pub use error::{MitigationError, MitigationResult};
pub use extrapolation::{Extrapolation, FitModel, fit};
pub use folding::{FoldedCircuit, FoldingStrategy, fold};
pub use orchestrator::{RetryPolicy, SamplingOptions, SamplingOrchestrator};
pub use pipeline::{ZneOptions, ZneResult, extrapolate};
pub use scale::{FoldPlan, ScaleFactor};
