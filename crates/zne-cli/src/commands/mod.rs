//! CLI command implementations.

pub mod common;
pub mod fit;
pub mod fold;
pub mod run;
pub mod version;
