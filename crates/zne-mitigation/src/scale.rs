//! Noise scale factors and their decomposition into folds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MitigationError, MitigationResult};

/// A noise amplification factor λ ≥ 1.
///
/// λ is realized by unitary folding as λ = 1 + 2(n + s/d) for a circuit of
/// `d` instructions, `n` full folds and a partial fold of `s` instructions.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// The unscaled circuit.
    pub const ONE: ScaleFactor = ScaleFactor(1.0);

    /// Create a scale factor, rejecting values below 1 and non-finite values.
    pub fn new(value: f64) -> MitigationResult<Self> {
        if !value.is_finite() || value < 1.0 {
            return Err(MitigationError::InvalidScaleFactor(value));
        }
        Ok(Self(value))
    }

    /// Get the numeric value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// The first `count` odd integers: 1, 3, 5, ...
    ///
    /// Odd factors fold the whole circuit an integer number of times.
    pub fn odd(count: usize) -> Vec<Self> {
        (0..count).map(|k| Self(1.0 + 2.0 * k as f64)).collect()
    }

    /// `count` evenly spaced factors from 1 to `max` inclusive.
    pub fn linspace(max: f64, count: usize) -> MitigationResult<Vec<Self>> {
        let max = Self::new(max)?;
        match count {
            0 => Ok(vec![]),
            1 => Ok(vec![Self::ONE]),
            _ => {
                let step = (max.0 - 1.0) / (count - 1) as f64;
                Ok((0..count)
                    .map(|k| {
                        if k == count - 1 {
                            max
                        } else {
                            Self(1.0 + step * k as f64)
                        }
                    })
                    .collect())
            }
        }
    }

    /// Parse a comma-separated list such as `"1,3,5"` or `"1, 1.5, 2"`.
    pub fn parse_list(list: &str) -> MitigationResult<Vec<Self>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| MitigationError::InvalidOptions(format!("bad scale factor '{s}'")))
                    .and_then(Self::new)
            })
            .collect()
    }

    /// Decompose this factor for a circuit of `depth` instructions.
    pub fn fold_plan(self, depth: usize) -> FoldPlan {
        let half = (self.0 - 1.0) / 2.0;
        let full_folds = half.floor();
        let fraction = half - full_folds;
        let partial = ((fraction * depth as f64).round() as usize).min(depth);

        FoldPlan {
            depth,
            full_folds: full_folds as usize,
            partial,
        }
    }
}

impl TryFrom<f64> for ScaleFactor {
    type Error = MitigationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScaleFactor> for f64 {
    fn from(scale: ScaleFactor) -> Self {
        scale.0
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a scale factor maps onto a concrete circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldPlan {
    /// Instructions in the original circuit (`d`).
    pub depth: usize,
    /// Full U†U repetitions (`n`).
    pub full_folds: usize,
    /// Instructions in the partial fold (`s`).
    pub partial: usize,
}

impl FoldPlan {
    /// Whether the plan leaves the circuit unchanged.
    pub fn is_identity(&self) -> bool {
        self.full_folds == 0 && self.partial == 0
    }

    /// Instruction count of the folded circuit: d(2n+1) + 2s.
    pub fn folded_len(&self) -> usize {
        self.depth * (2 * self.full_folds + 1) + 2 * self.partial
    }

    /// The scale factor the plan actually realizes.
    pub fn achieved(&self) -> f64 {
        if self.depth == 0 {
            return 1.0;
        }
        self.folded_len() as f64 / self.depth as f64
    }
}
