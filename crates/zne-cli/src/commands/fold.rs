//! Fold command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use zne_mitigation::{FoldingStrategy, ScaleFactor, ZneConfig, fold};

use super::common::resolve_circuit;

/// Arguments of `zne fold`.
#[derive(Args)]
pub struct FoldArgs {
    /// Circuit file (JSON); defaults to a chain of X gates
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Length of the default X-gate chain
    #[arg(long, default_value = "10")]
    pub gates: usize,

    /// Noise scale factor λ ≥ 1
    #[arg(short = 'l', long, default_value = "3")]
    pub scale_factor: f64,

    /// Folding strategy (global, left, right); defaults to the configured one
    #[arg(long)]
    pub folding: Option<String>,

    /// Write the folded circuit as JSON to this file instead of listing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the fold command.
pub fn execute(args: &FoldArgs, config: &ZneConfig) -> Result<()> {
    let circuit = resolve_circuit(args.input.as_deref(), args.gates)?;
    let scale = ScaleFactor::new(args.scale_factor)?;
    let strategy: FoldingStrategy = match &args.folding {
        Some(folding) => folding.parse()?,
        None => config.folding_strategy()?,
    };

    let folded = fold(&circuit, scale, strategy)?;

    println!(
        "{} Folded {} with {} at λ = {}",
        style("→").cyan().bold(),
        style(circuit.name()).green(),
        style(strategy).yellow(),
        scale.value()
    );
    println!(
        "  Instructions: {} → {} (full folds {}, partial {})",
        circuit.len(),
        folded.circuit.len(),
        folded.plan.full_folds,
        folded.plan.partial
    );
    println!(
        "  Achieved λ: {:.4}",
        folded.achieved_scale_factor()
    );

    match &args.output {
        Some(path) => {
            let json = folded.circuit.to_json()?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            println!(
                "{} Written to {}",
                style("✓").green().bold(),
                style(path.display()).green()
            );
        }
        None => {
            println!();
            for (i, inst) in folded.circuit.iter().enumerate() {
                let qubits: Vec<_> = inst.qubits.iter().map(|q| q.0.to_string()).collect();
                println!("  {i:>4}  {:<8} q[{}]", inst.name(), qubits.join(", "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zne_ir::Circuit;

    fn args(scale_factor: f64, output: Option<PathBuf>) -> FoldArgs {
        FoldArgs {
            input: None,
            gates: 4,
            scale_factor,
            folding: Some("right".into()),
            output,
        }
    }

    #[test]
    fn test_fold_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folded.json");

        execute(&args(3.0, Some(path.clone())), &ZneConfig::default()).unwrap();

        let folded = Circuit::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(folded.len(), 12);
    }

    #[test]
    fn test_fold_rejects_bad_scale_factor() {
        assert!(execute(&args(0.5, None), &ZneConfig::default()).is_err());
    }
}
