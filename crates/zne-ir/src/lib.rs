//! ZNE Circuit Representation
//!
//! This crate provides the data model shared by the zero-noise extrapolation
//! workspace: circuits as ordered instruction sequences, gates with known
//! adjoints, and Pauli observables measured at the end of a circuit.
//!
//! # Overview
//!
//! Noise scaling by unitary folding needs two things from a circuit: a stable
//! instruction order and an adjoint for every instruction. [`Circuit`] keeps
//! instructions in program order and [`Circuit::adjoint`] reverses them while
//! replacing each one with its inverse.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] for addressing the quantum register
//! - **Gates**: [`StandardGate`] for built-in gates (H, X, CX, etc.) and [`CustomGate`]
//!   for user-defined unitaries
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Circuit**: [`Circuit`] builder API
//! - **Observables**: [`Observable`] as a weighted sum of [`PauliString`]s
//!
//! # Example: The ten-X circuit
//!
//! ```rust
//! use zne_ir::{Circuit, Observable, QubitId};
//!
//! let mut circuit = Circuit::new("ten_x", 1);
//! for _ in 0..10 {
//!     circuit.x(QubitId(0)).unwrap();
//! }
//! assert_eq!(circuit.len(), 10);
//!
//! // Ten X gates compose to the identity, so <Z> is ideally +1.
//! let observable: Observable = "Z".parse().unwrap();
//! assert_eq!(observable.num_qubits(), 1);
//!
//! // The adjoint of a self-inverse chain is the same chain.
//! assert_eq!(circuit.adjoint().unwrap().instructions(), circuit.instructions());
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Adjoint |
//! |------|--------|---------|
//! | `I`, `X`, `Y`, `Z`, `H` | 1 | self |
//! | `S`/`Sdg`, `T`/`Tdg`, `SX`/`SXdg` | 1 | each other |
//! | `Rx`, `Ry`, `Rz`, `P` | 1 | negated angle |
//! | `U(θ, φ, λ)` | 1 | `U(−θ, −λ, −φ)` |
//! | `CX`, `CY`, `CZ`, `CH`, `Swap` | 2 | self |
//! | `ISwap`/`ISwapDg` | 2 | each other |
//! | `CRx`, `CRy`, `CRz`, `CP`, `RXX`, `RYY`, `RZZ` | 2 | negated angle |
//! | `CCX`, `CSwap` | 3 | self |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod observable;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{CustomGate, Gate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use observable::{Observable, Pauli, PauliString};
pub use qubit::QubitId;
