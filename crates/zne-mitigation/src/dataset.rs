//! Samples collected across scale factors.

use serde::{Deserialize, Serialize};

use crate::error::{MitigationError, MitigationResult};

/// Relative tolerance under which two scale factors count as the same point.
const DISTINCT_TOLERANCE: f64 = 1e-9;

/// One expectation value measured at one noise level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Noise scale factor λ.
    pub scale_factor: f64,
    /// Measured expectation value.
    pub value: f64,
    /// Standard error reported by the executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_error: Option<f64>,
}

impl Sample {
    /// Create a sample without error information.
    pub fn new(scale_factor: f64, value: f64) -> Self {
        Self {
            scale_factor,
            value,
            std_error: None,
        }
    }
}

/// Samples in the order their scale factors were requested.
///
/// Serialized as a plain JSON array of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtrapolationDataset {
    samples: Vec<Sample>,
}

impl ExtrapolationDataset {
    /// Create a dataset from samples.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Create a dataset from `(scale factor, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(scale, value)| Sample::new(scale, value))
                .collect(),
        )
    }

    /// Load a dataset from JSON.
    pub fn from_json(source: &str) -> MitigationResult<Self> {
        serde_json::from_str(source)
            .map_err(|e| MitigationError::InvalidOptions(format!("invalid dataset: {e}")))
    }

    /// Append a sample.
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Samples in request order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Scale factors in request order.
    pub fn scale_factors(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.scale_factor).collect()
    }

    /// Values in request order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// The sample taken on the unscaled circuit, if one was requested.
    pub fn unmitigated(&self) -> Option<&Sample> {
        self.samples.iter().find(|s| s.scale_factor == 1.0)
    }

    /// Number of distinct scale factors.
    pub fn distinct_scale_factors(&self) -> usize {
        count_distinct(self.samples.iter().map(|s| s.scale_factor))
    }

    /// Reject samples that cannot enter a fit.
    pub fn validate(&self) -> MitigationResult<()> {
        for sample in &self.samples {
            if !sample.scale_factor.is_finite() || !sample.value.is_finite() {
                return Err(MitigationError::InvalidSample {
                    scale_factor: sample.scale_factor,
                    value: sample.value,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<Sample> for ExtrapolationDataset {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Count values that differ by more than a relative tolerance.
pub(crate) fn count_distinct(values: impl IntoIterator<Item = f64>) -> usize {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| (*a - *b).abs() <= DISTINCT_TOLERANCE * a.abs().max(b.abs()).max(1.0));
    sorted.len()
}
