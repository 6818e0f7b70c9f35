//! Local Noisy Statevector Simulator
//!
//! This crate provides a local [`Executor`](zne_hal::Executor) for testing
//! and demonstrating zero-noise extrapolation. Circuits run on a statevector;
//! a [`NoiseModel`] injects random Pauli errors after every gate and
//! attenuates results by readout error, so folded circuits come back
//! measurably noisier than the originals.
//!
//! # Noise
//!
//! - **Gate Errors**: depolarizing channel sampled per trajectory (`p1`, `p2`)
//! - **Readout Errors**: symmetric bit flips (`readout_error`)
//! - **Seeding**: `ExecutionOptions::seed` makes a run reproducible
//!
//! # Performance
//!
//! | Qubits | Memory | Simulation Speed |
//! |--------|--------|------------------|
//! | 10 | ~16 KB | Instant |
//! | 15 | ~512 KB | Fast |
//! | 20 | ~16 MB | Slow with many shots |
//!
//! # Example
//!
//! ```ignore
//! use zne_adapter_sim::NoisySimulator;
//! use zne_hal::{ExecutionOptions, Executor};
//! use zne_ir::{Circuit, Observable, QubitId};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sim = NoisySimulator::new();
//!     let circuit = Circuit::x_chain(10)?;
//!     let observable = Observable::z(1, QubitId(0))?;
//!
//!     let options = ExecutionOptions::new().with_shots(4000).with_seed(7);
//!     let result = sim.execute(&circuit, &observable, &options).await?;
//!
//!     // Ideally 1.0; noise pulls it down.
//!     println!("<Z> = {:.4} ± {:.4}", result.value, result.std_error.unwrap_or(0.0));
//!     Ok(())
//! }
//! ```

mod noise;
mod simulator;
mod statevector;

pub use noise::NoiseModel;
pub use simulator::NoisySimulator;
