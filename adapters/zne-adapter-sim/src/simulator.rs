//! Noisy simulator executor implementation.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, instrument};

use zne_hal::{ExecutionOptions, Executor, ExpectationValue, HalError, HalResult};
use zne_ir::{Circuit, GateKind, InstructionKind, Observable};

use crate::noise::NoiseModel;
use crate::statevector::Statevector;

/// Local noisy statevector simulator.
///
/// Each shot is one Monte-Carlo trajectory: the circuit is run on a fresh
/// statevector with sampled gate errors, and the exact expectation of the
/// observable on the final state is averaged over trajectories. Without gate
/// noise and resets a single trajectory is exact and `std_error` is zero.
pub struct NoisySimulator {
    name: String,
    noise: NoiseModel,
    /// Maximum number of qubits supported.
    max_qubits: u32,
    /// Trajectories used when the caller does not ask for a shot count.
    default_shots: u32,
}

impl NoisySimulator {
    /// Create a simulator with the default noise model.
    pub fn new() -> Self {
        Self {
            name: "noisy_simulator".into(),
            noise: NoiseModel::default(),
            max_qubits: 20,
            default_shots: 1024,
        }
    }

    /// Create a simulator without noise.
    pub fn ideal() -> Self {
        Self {
            name: "ideal_simulator".into(),
            noise: NoiseModel::ideal(),
            ..Self::new()
        }
    }

    /// Create a simulator with a custom noise model.
    pub fn with_noise(noise: NoiseModel) -> HalResult<Self> {
        noise.validate()?;
        Ok(Self {
            noise,
            ..Self::new()
        })
    }

    /// Set the qubit limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Set the shot count used when execution options carry none.
    #[must_use]
    pub fn with_default_shots(mut self, shots: u32) -> Self {
        self.default_shots = shots;
        self
    }

    /// The noise model.
    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }

    fn check_supported(&self, circuit: &Circuit) -> HalResult<()> {
        if circuit.num_qubits() > self.max_qubits as usize {
            return Err(HalError::CircuitTooLarge(format!(
                "Circuit has {} qubits but simulator only supports {}",
                circuit.num_qubits(),
                self.max_qubits
            )));
        }

        for inst in circuit {
            if let InstructionKind::Gate(gate) = &inst.kind {
                if let GateKind::Custom(custom) = &gate.kind {
                    if custom.matrix.is_none() {
                        return Err(HalError::Unsupported(format!(
                            "custom gate '{}' has no matrix",
                            custom.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for NoisySimulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean and standard error over trajectories.
struct Estimate {
    mean: f64,
    std_error: f64,
}

/// Run trajectories synchronously.
fn run_trajectories(
    circuit: &Circuit,
    observable: &Observable,
    noise: &NoiseModel,
    shots: u32,
    seed: Option<u64>,
) -> Estimate {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    // Resets sample a measurement outcome, so only reset-free circuits
    // without gate noise are deterministic.
    let deterministic = noise.is_noiseless() && !circuit.iter().any(|inst| inst.is_reset());
    let trajectories = if deterministic { 1 } else { shots };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for trajectory in 0..trajectories {
        let mut sv = Statevector::new(circuit.num_qubits());
        for inst in circuit {
            sv.apply(inst, &mut rng);
            if inst.is_gate() {
                let qubits: Vec<_> = inst.qubits.iter().map(|q| q.index()).collect();
                noise.apply_gate_error(&mut sv, &qubits, &mut rng);
            }
        }

        let value: f64 = observable
            .terms()
            .iter()
            .map(|term| term.coeff * sv.expectation(term) * noise.readout_factor(term.weight()))
            .sum();
        sum += value;
        sum_sq += value * value;

        if trajectory > 0 && trajectory % 1000 == 0 {
            debug!("Completed {} trajectories", trajectory);
        }
    }

    let n = f64::from(trajectories);
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    Estimate {
        mean,
        std_error: (variance / n).sqrt(),
    }
}

#[async_trait]
impl Executor for NoisySimulator {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, circuit, observable), fields(circuit = circuit.name(), instructions = circuit.len()))]
    async fn execute(
        &self,
        circuit: &Circuit,
        observable: &Observable,
        options: &ExecutionOptions,
    ) -> HalResult<ExpectationValue> {
        self.validate(circuit, observable)?;
        self.check_supported(circuit)?;

        let shots = options.shots.unwrap_or(self.default_shots);
        if shots == 0 {
            return Err(HalError::Unsupported("shots must be positive".into()));
        }

        debug!(
            "Starting simulation: {} qubits, {} shots",
            circuit.num_qubits(),
            shots
        );
        let start = Instant::now();

        let circuit = circuit.clone();
        let observable = observable.clone();
        let noise = self.noise;
        let seed = options.seed;
        let estimate = tokio::task::spawn_blocking(move || {
            run_trajectories(&circuit, &observable, &noise, shots, seed)
        })
        .await
        .map_err(|e| HalError::Backend(format!("simulation task failed: {e}")))?;

        let elapsed = start.elapsed();
        debug!("Simulation completed in {:?}", elapsed);

        Ok(ExpectationValue::new(estimate.mean)
            .with_std_error(estimate.std_error)
            .with_shots(shots)
            .with_execution_time(elapsed.as_millis() as u64))
    }
}
