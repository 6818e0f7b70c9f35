//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use zne_ir::{Circuit, Observable, QubitId};

/// Load a circuit from a JSON file.
pub fn load_circuit(path: &Path) -> Result<Circuit> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "json" | "" => Circuit::from_json(&source)
            .with_context(|| format!("Failed to parse circuit: {}", path.display())),
        other => anyhow::bail!("Unsupported circuit format '.{other}'. Expected JSON"),
    }
}

/// The circuit named by `input`, or a chain of `gates` X gates.
pub fn resolve_circuit(input: Option<&Path>, gates: usize) -> Result<Circuit> {
    match input {
        Some(path) => load_circuit(path),
        None => Ok(Circuit::x_chain(gates)?),
    }
}

/// Parse `expr`, or default to Z on qubit 0.
pub fn resolve_observable(expr: Option<&str>, num_qubits: usize) -> Result<Observable> {
    let observable = match expr {
        Some(expr) => expr
            .parse::<Observable>()
            .with_context(|| format!("Invalid observable '{expr}'"))?,
        None => Observable::z(num_qubits, QubitId(0))?,
    };
    observable.check_width(num_qubits)?;
    Ok(observable)
}

/// A steady-ticking spinner with `message`.
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Format an optional standard error.
pub fn format_error(std_error: Option<f64>) -> String {
    std_error.map_or_else(|| "-".to_string(), |e| format!("±{e:.4}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_circuit_and_observable() {
        let circuit = resolve_circuit(None, 6).unwrap();
        assert_eq!(circuit.len(), 6);

        let observable = resolve_observable(None, 1).unwrap();
        assert_eq!(observable.to_string(), "Z");
        assert!(resolve_observable(Some("ZZ"), 1).is_err());
        assert!(resolve_observable(Some("ZQ"), 1).is_err());
    }

    #[test]
    fn test_load_circuit_from_json() {
        let bell = Circuit::bell().unwrap();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(bell.to_json().unwrap().as_bytes()).unwrap();

        let loaded = load_circuit(file.path()).unwrap();
        assert_eq!(loaded, bell);
    }

    #[test]
    fn test_load_circuit_errors() {
        assert!(load_circuit(Path::new("/nonexistent/circuit.json")).is_err());

        let file = tempfile::Builder::new().suffix(".qasm").tempfile().unwrap();
        assert!(load_circuit(file.path()).is_err());
    }

    #[test]
    fn test_format_error() {
        assert_eq!(format_error(None), "-");
        assert_eq!(format_error(Some(0.01234)), "±0.0123");
    }
}
