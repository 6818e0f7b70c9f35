//! Fit command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use zne_mitigation::{ExtrapolationDataset, FitModel, ZneConfig, fit};

use super::common::format_error;

/// Arguments of `zne fit`.
#[derive(Args)]
pub struct FitArgs {
    /// JSON array of samples: [{"scale_factor": 1.0, "value": 0.9}, ...]
    #[arg(short, long)]
    pub input: PathBuf,

    /// Fit model (linear, richardson, exponential, poly:<degree>);
    /// defaults to the configured one
    #[arg(short, long)]
    pub model: Option<String>,

    /// Print the fit as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the fit command.
pub fn execute(args: &FitArgs, config: &ZneConfig) -> Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read dataset: {}", args.input.display()))?;
    let dataset = ExtrapolationDataset::from_json(&source)
        .with_context(|| format!("Failed to parse dataset: {}", args.input.display()))?;

    let model: FitModel = match &args.model {
        Some(model) => model.parse()?,
        None => config.fit_model()?,
    };
    let extrapolation = fit(&dataset, model)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&extrapolation)?);
        return Ok(());
    }

    println!(
        "{} Fitting {} samples with {}",
        style("→").cyan().bold(),
        dataset.len(),
        style(model).yellow()
    );
    println!();
    println!("  {:>8}  {:>10}  {:>10}  {:>10}", "λ", "measured", "fitted", "std err");
    for sample in dataset.samples() {
        println!(
            "  {:>8.3}  {:>10.5}  {:>10.5}  {:>10}",
            sample.scale_factor,
            sample.value,
            extrapolation.predict(sample.scale_factor),
            format_error(sample.std_error)
        );
    }
    println!();
    println!(
        "  Estimate at λ = 0: {}",
        style(format!("{:.6}", extrapolation.estimate)).green().bold()
    );
    println!(
        "  Parameters: {:?}",
        extrapolation
            .parameters
            .iter()
            .map(|p| format!("{p:.6}"))
            .collect::<Vec<_>>()
    );
    println!(
        "  SSR {:.3e}, R² {:.4}",
        extrapolation.ssr, extrapolation.r_squared
    );
    if let Some(iterations) = extrapolation.iterations {
        println!("  Converged after {iterations} iterations");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dataset_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_fit_from_file() {
        let file = dataset_file(
            r#"[
                {"scale_factor": 1.0, "value": 0.9015},
                {"scale_factor": 3.0, "value": 0.83},
                {"scale_factor": 5.0, "value": 0.76}
            ]"#,
        );
        let args = FitArgs {
            input: file.path().to_path_buf(),
            model: Some("richardson".into()),
            json: false,
        };
        execute(&args, &ZneConfig::default()).unwrap();
    }

    #[test]
    fn test_fit_rejects_single_point() {
        let file = dataset_file(r#"[{"scale_factor": 1.0, "value": 0.9}]"#);
        let args = FitArgs {
            input: file.path().to_path_buf(),
            model: None,
            json: true,
        };
        let err = execute(&args, &ZneConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Insufficient"), "{err}");
    }
}
