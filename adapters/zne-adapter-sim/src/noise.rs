//! Stochastic Pauli noise applied along each simulated trajectory.

use rand::Rng;
use serde::{Deserialize, Serialize};

use zne_hal::{HalError, HalResult};
use zne_ir::Pauli;

use crate::statevector::Statevector;

const PAULIS: [Pauli; 4] = [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z];

/// Gate and readout error rates.
///
/// After every gate, with probability `p` a uniformly random non-identity
/// Pauli is applied to the gate's operands (`p1` for single-qubit gates,
/// `p2` for wider ones). Readout flips each measured bit with probability
/// `readout_error`, which scales a Pauli term of weight `w` by `(1 − 2e)^w`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    /// Depolarizing probability after single-qubit gates.
    #[serde(default)]
    pub p1: f64,
    /// Depolarizing probability after multi-qubit gates.
    #[serde(default)]
    pub p2: f64,
    /// Bit-flip probability at readout.
    #[serde(default)]
    pub readout_error: f64,
}

impl Default for NoiseModel {
    /// Rates in the range of current superconducting devices.
    fn default() -> Self {
        Self {
            p1: 0.005,
            p2: 0.02,
            readout_error: 0.01,
        }
    }
}

impl NoiseModel {
    /// A model without any noise.
    pub fn ideal() -> Self {
        Self {
            p1: 0.0,
            p2: 0.0,
            readout_error: 0.0,
        }
    }

    /// Depolarizing gate noise without readout error.
    pub fn depolarizing(p1: f64, p2: f64) -> Self {
        Self {
            p1,
            p2,
            readout_error: 0.0,
        }
    }

    /// Set the readout error.
    #[must_use]
    pub fn with_readout_error(mut self, readout_error: f64) -> Self {
        self.readout_error = readout_error;
        self
    }

    /// Check that every rate is a probability.
    pub fn validate(&self) -> HalResult<()> {
        for (name, value, max) in [
            ("p1", self.p1, 1.0),
            ("p2", self.p2, 1.0),
            ("readout_error", self.readout_error, 0.5),
        ] {
            if !(0.0..=max).contains(&value) {
                return Err(HalError::Unsupported(format!(
                    "noise rate {name} = {value} outside [0, {max}]"
                )));
            }
        }
        Ok(())
    }

    /// Whether gate noise is absent, making every trajectory identical.
    pub fn is_noiseless(&self) -> bool {
        self.p1 == 0.0 && self.p2 == 0.0
    }

    /// Sample and apply a gate error on `qubits`.
    pub(crate) fn apply_gate_error<R: Rng + ?Sized>(
        &self,
        state: &mut Statevector,
        qubits: &[usize],
        rng: &mut R,
    ) {
        let p = if qubits.len() > 1 { self.p2 } else { self.p1 };
        if p == 0.0 || qubits.is_empty() || rng.r#gen::<f64>() >= p {
            return;
        }

        // Uniform over the 4^k − 1 non-identity Pauli strings.
        let choices = 1usize << (2 * qubits.len());
        let pick = rng.gen_range(1..choices);
        let error: Vec<_> = qubits
            .iter()
            .enumerate()
            .map(|(j, &q)| (q, PAULIS[(pick >> (2 * j)) & 3]))
            .collect();
        state.apply_pauli(&error);
    }

    /// Attenuation of a Pauli term of the given weight by readout error.
    pub(crate) fn readout_factor(&self, weight: usize) -> f64 {
        (1.0 - 2.0 * self.readout_error).powi(weight as i32)
    }
}
