//! Fitting samples and extrapolating to zero noise.
//!
//! | Model | Fit | Estimate at λ = 0 | Distinct λ |
//! |-------|-----|-------------------|------------|
//! | [`FitModel::Linear`] | a + bλ, closed-form least squares | a | 2 |
//! | [`FitModel::Polynomial`] | Σ aᵢλⁱ, Householder QR | a₀ | degree + 1 |
//! | [`FitModel::Richardson`] | polynomial through every distinct point | a₀ | 2 |
//! | [`FitModel::Exponential`] | a + b·e^(−cλ), Levenberg–Marquardt | a + b | 3 |
//!
//! Every fit needs at least two samples. All solvers are deterministic: the
//! exponential fit starts from a guess computed from the data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::dataset::ExtrapolationDataset;
use crate::error::{MitigationError, MitigationResult};

/// Diagonal entries of R below this fraction of the largest are treated as zero.
const RANK_TOLERANCE: f64 = 1e-12;

const LM_MAX_ITERATIONS: usize = 500;
const LM_INITIAL_DAMPING: f64 = 1e-3;
const LM_MAX_DAMPING: f64 = 1e12;

/// Curve fitted through the samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitModel {
    /// Straight line.
    #[default]
    Linear,
    /// Polynomial of the given degree.
    Polynomial {
        /// Polynomial degree.
        degree: usize,
    },
    /// Interpolating polynomial of degree (distinct points − 1).
    Richardson,
    /// Exponential decay toward an asymptote.
    Exponential,
}

impl FitModel {
    /// Get the model name.
    pub fn name(&self) -> &'static str {
        match self {
            FitModel::Linear => "linear",
            FitModel::Polynomial { .. } => "polynomial",
            FitModel::Richardson => "richardson",
            FitModel::Exponential => "exponential",
        }
    }

    /// Distinct scale factors needed to determine the model.
    pub fn min_distinct(&self) -> usize {
        match self {
            FitModel::Linear | FitModel::Richardson => 2,
            FitModel::Polynomial { degree } => degree.saturating_add(1),
            FitModel::Exponential => 3,
        }
    }
}

impl fmt::Display for FitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitModel::Polynomial { degree } => write!(f, "polynomial:{degree}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for FitModel {
    type Err = MitigationError;

    /// Parse `linear`, `richardson`, `exponential` (or `exp`), and
    /// `polynomial:<degree>` (or `poly:<degree>`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let (name, degree) = match lower.split_once(':') {
            Some((name, degree)) => (name, Some(degree)),
            None => (lower.as_str(), None),
        };

        match (name, degree) {
            ("linear", None) => Ok(FitModel::Linear),
            ("richardson", None) => Ok(FitModel::Richardson),
            ("exponential" | "exp", None) => Ok(FitModel::Exponential),
            ("polynomial" | "poly", Some(degree)) => degree
                .parse()
                .map(|degree| FitModel::Polynomial { degree })
                .map_err(|_| {
                    MitigationError::InvalidOptions(format!("bad polynomial degree '{degree}'"))
                }),
            ("polynomial" | "poly", None) => Err(MitigationError::InvalidOptions(
                "polynomial model needs a degree, e.g. 'polynomial:2'".into(),
            )),
            _ => Err(MitigationError::InvalidOptions(format!(
                "unknown fit model '{s}'"
            ))),
        }
    }
}

/// A fitted model and its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrapolation {
    /// The fitted model.
    pub model: FitModel,
    /// Value at λ = 0.
    pub estimate: f64,
    /// Fitted parameters: coefficients a₀, a₁, … for polynomial models,
    /// `[a, b, c]` for the exponential model.
    pub parameters: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Solver iterations, for iterative fits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
}

impl Extrapolation {
    /// Evaluate the fitted curve at `scale_factor`.
    pub fn predict(&self, scale_factor: f64) -> f64 {
        match self.model {
            FitModel::Exponential => exponential(&self.parameters, scale_factor),
            _ => self
                .parameters
                .iter()
                .rev()
                .fold(0.0, |acc, coeff| acc * scale_factor + coeff),
        }
    }
}

/// Fit `dataset` with `model` and extrapolate to zero noise.
pub fn fit(dataset: &ExtrapolationDataset, model: FitModel) -> MitigationResult<Extrapolation> {
    dataset.validate()?;
    if dataset.len() < 2 {
        return Err(MitigationError::InsufficientData {
            got: dataset.len(),
            needed: 2,
        });
    }

    let distinct = dataset.distinct_scale_factors();
    let needed = model.min_distinct();
    if distinct < needed {
        return Err(MitigationError::UnderdeterminedFit {
            model: model.to_string(),
            got: distinct,
            needed,
        });
    }

    let xs = dataset.scale_factors();
    let ys = dataset.values();

    let (parameters, iterations) = match model {
        FitModel::Linear => (fit_linear(&xs, &ys), None),
        FitModel::Polynomial { degree } => (fit_polynomial(&xs, &ys, degree)?, None),
        FitModel::Richardson => (fit_polynomial(&xs, &ys, distinct - 1)?, None),
        FitModel::Exponential => {
            let (parameters, iterations) = fit_exponential(&xs, &ys)?;
            (parameters, Some(iterations))
        }
    };
    if parameters.iter().any(|p| !p.is_finite()) {
        return Err(MitigationError::FitFailed(format!(
            "{model} fit produced non-finite parameters"
        )));
    }

    let mut result = Extrapolation {
        model,
        estimate: 0.0,
        parameters,
        ssr: 0.0,
        r_squared: 0.0,
        iterations,
    };
    result.estimate = result.predict(0.0);
    result.ssr = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| (y - result.predict(x)).powi(2))
        .sum();
    result.r_squared = r_squared(&ys, result.ssr);

    debug!(
        %model,
        samples = dataset.len(),
        estimate = result.estimate,
        ssr = result.ssr,
        r_squared = result.r_squared,
        "Extrapolated to zero noise"
    );
    Ok(result)
}

fn r_squared(ys: &[f64], ssr: f64) -> f64 {
    let mean = ys.iter().sum::<f64>() / ys.len() as f64;
    let sst: f64 = ys.iter().map(|y| (y - mean).powi(2)).sum();
    if sst > 0.0 {
        1.0 - ssr / sst
    } else if ssr <= f64::EPSILON {
        1.0
    } else {
        0.0
    }
}

/// Least-squares line through centered data: `[intercept, slope]`.
fn fit_linear(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (sxx, sxy) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxx, sxy), (&x, &y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });

    let slope = sxy / sxx;
    vec![mean_y - slope * mean_x, slope]
}

/// Least-squares polynomial coefficients `a₀..a_degree`.
///
/// The Vandermonde columns are built on λ / max|λ| to keep them comparable
/// in size, and the coefficients are rescaled afterwards.
fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> MitigationResult<Vec<f64>> {
    let rows = xs.len();
    let cols = degree.saturating_add(1);
    let scale = xs.iter().fold(0.0_f64, |m, x| m.max(x.abs())).max(f64::MIN_POSITIVE);

    let mut design = Vec::with_capacity(rows * cols);
    for &x in xs {
        let t = x / scale;
        let mut power = 1.0;
        for _ in 0..cols {
            design.push(power);
            power *= t;
        }
    }

    let mut coeffs = solve_least_squares(design, rows, cols, ys.to_vec())?;
    let mut factor = 1.0;
    for c in &mut coeffs {
        *c /= factor;
        factor *= scale;
    }
    Ok(coeffs)
}

/// Solve min ‖Ax − b‖ for a row-major `rows × cols` matrix by Householder QR.
fn solve_least_squares(
    mut a: Vec<f64>,
    rows: usize,
    cols: usize,
    mut b: Vec<f64>,
) -> MitigationResult<Vec<f64>> {
    debug_assert!(rows >= cols);
    let rank_deficient = || MitigationError::FitFailed("design matrix is rank deficient".into());

    for k in 0..cols {
        let norm = (k..rows).map(|i| a[i * cols + k].powi(2)).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err(rank_deficient());
        }
        let alpha = if a[k * cols + k] > 0.0 { -norm } else { norm };

        let mut v: Vec<f64> = (k..rows).map(|i| a[i * cols + k]).collect();
        v[0] -= alpha;
        let v_norm2: f64 = v.iter().map(|x| x * x).sum();

        for j in k..cols {
            let dot: f64 = (k..rows).map(|i| v[i - k] * a[i * cols + j]).sum();
            let f = 2.0 * dot / v_norm2;
            for i in k..rows {
                a[i * cols + j] -= f * v[i - k];
            }
        }
        let dot: f64 = (k..rows).map(|i| v[i - k] * b[i]).sum();
        let f = 2.0 * dot / v_norm2;
        for i in k..rows {
            b[i] -= f * v[i - k];
        }
    }

    let max_diag = (0..cols).map(|k| a[k * cols + k].abs()).fold(0.0, f64::max);
    let mut x = vec![0.0; cols];
    for k in (0..cols).rev() {
        let r = a[k * cols + k];
        if r.abs() <= RANK_TOLERANCE * max_diag {
            return Err(rank_deficient());
        }
        let tail: f64 = (k + 1..cols).map(|j| a[k * cols + j] * x[j]).sum();
        x[k] = (b[k] - tail) / r;
    }
    Ok(x)
}

fn exponential(p: &[f64], x: f64) -> f64 {
    p[0] + p[1] * (-p[2] * x).exp()
}

fn exponential_cost(xs: &[f64], ys: &[f64], p: &[f64; 3]) -> f64 {
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| (y - exponential(p, x)).powi(2))
        .sum()
}

/// Fit a + b·e^(−cλ) by Levenberg–Marquardt.
///
/// Start: `a` is the value at the largest-λ end of the data (the minimum for
/// decaying data, the maximum for growing data), `b` the signed range of the
/// values, `c = 1`. Constant data is fitted exactly with `b = 0`.
fn fit_exponential(xs: &[f64], ys: &[f64]) -> MitigationResult<(Vec<f64>, usize)> {
    let min = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= f64::EPSILON * max.abs().max(1.0) {
        return Ok((vec![ys[0], 0.0, 1.0], 0));
    }

    let lowest = index_of(xs, |a, b| a < b);
    let highest = index_of(xs, |a, b| a > b);
    let mut p = if ys[lowest] >= ys[highest] {
        [min, range, 1.0]
    } else {
        [max, -range, 1.0]
    };

    let mut cost = exponential_cost(xs, ys, &p);
    let mut damping = LM_INITIAL_DAMPING;
    let mut iterations = 0;

    while iterations < LM_MAX_ITERATIONS {
        iterations += 1;
        let (jtj, jtr) = normal_equations(xs, ys, &p);

        let mut step = None;
        while damping <= LM_MAX_DAMPING {
            let mut damped = jtj;
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] += damping * jtj[i][i].max(1e-12);
            }
            if let Some(delta) = solve3(damped, jtr) {
                let candidate = [p[0] + delta[0], p[1] + delta[1], p[2] + delta[2]];
                let candidate_cost = exponential_cost(xs, ys, &candidate);
                if candidate_cost.is_finite() && candidate_cost < cost {
                    step = Some((candidate, candidate_cost, delta));
                    damping = (damping / 10.0).max(1e-12);
                    break;
                }
            }
            damping *= 10.0;
        }

        let Some((candidate, candidate_cost, delta)) = step else {
            break;
        };
        let size = p.iter().map(|v| v * v).sum::<f64>().sqrt();
        let moved = delta.iter().map(|v| v * v).sum::<f64>().sqrt();
        p = candidate;
        cost = candidate_cost;
        if moved <= 1e-12 * (1.0 + size) {
            break;
        }
    }

    if p.iter().any(|v| !v.is_finite()) {
        return Err(MitigationError::FitFailed(
            "exponential fit diverged".into(),
        ));
    }
    Ok((p.to_vec(), iterations))
}

fn index_of(xs: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &x) in xs.iter().enumerate() {
        if better(x, xs[best]) {
            best = i;
        }
    }
    best
}

/// JᵀJ and Jᵀr for the exponential model at `p`.
fn normal_equations(xs: &[f64], ys: &[f64], p: &[f64; 3]) -> ([[f64; 3]; 3], [f64; 3]) {
    let mut jtj = [[0.0; 3]; 3];
    let mut jtr = [0.0; 3];
    for (&x, &y) in xs.iter().zip(ys) {
        let e = (-p[2] * x).exp();
        let grad = [1.0, e, -p[1] * x * e];
        let residual = y - (p[0] + p[1] * e);
        for i in 0..3 {
            jtr[i] += grad[i] * residual;
            for j in 0..3 {
                jtj[i][j] += grad[i] * grad[j];
            }
        }
    }
    (jtj, jtr)
}

/// Gaussian elimination with partial pivoting on a 3×3 system.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for k in 0..3 {
        let pivot = (k..3).max_by(|&i, &j| a[i][k].abs().total_cmp(&a[j][k].abs()))?;
        if a[pivot][k].abs() < 1e-300 {
            return None;
        }
        a.swap(k, pivot);
        b.swap(k, pivot);
        for i in k + 1..3 {
            let f = a[i][k] / a[k][k];
            for j in k..3 {
                a[i][j] -= f * a[k][j];
            }
            b[i] -= f * b[k];
        }
    }

    let mut x = [0.0; 3];
    for k in (0..3).rev() {
        let tail: f64 = (k + 1..3).map(|j| a[k][j] * x[j]).sum();
        x[k] = (b[k] - tail) / a[k][k];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
