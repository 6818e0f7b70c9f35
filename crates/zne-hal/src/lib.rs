//! ZNE Executor Abstraction
//!
//! This crate defines the single capability the extrapolator needs from the
//! outside world: run a circuit and report the expectation value of an
//! observable. Simulators, cloud services and test doubles all plug in behind
//! the [`Executor`] trait.
//!
//! # Overview
//!
//! - [`Executor`]: async `execute(circuit, observable, options)`
//! - [`ExecutionOptions`]: shot count and seed for reproducible simulation
//! - [`ExpectationValue`]: the returned sample with optional diagnostics
//! - [`HalError`]: executor failures, classified by [`HalError::is_transient`]
//!
//! # Implementing an Executor
//!
//! ```ignore
//! use async_trait::async_trait;
//! use zne_hal::{ExecutionOptions, Executor, ExpectationValue, HalResult};
//! use zne_ir::{Circuit, Observable};
//!
//! struct MyDevice;
//!
//! #[async_trait]
//! impl Executor for MyDevice {
//!     fn name(&self) -> &str { "my_device" }
//!
//!     async fn execute(
//!         &self,
//!         circuit: &Circuit,
//!         observable: &Observable,
//!         options: &ExecutionOptions,
//!     ) -> HalResult<ExpectationValue> {
//!         // Submit, wait, estimate ⟨O⟩ from the measured counts.
//!         # todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod executor;
pub mod result;

pub use error::{HalError, HalResult};
pub use executor::{ExecutionOptions, Executor};
pub use result::ExpectationValue;
