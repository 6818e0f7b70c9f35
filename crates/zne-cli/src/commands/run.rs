//! Run command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use console::style;
use tracing::debug;

use zne_adapter_sim::{NoiseModel, NoisySimulator};
use zne_hal::Executor;
use zne_mitigation::{CancellationToken, ScaleFactor, ZneConfig, ZneOptions, ZneResult, extrapolate};

use super::common::{format_error, resolve_circuit, resolve_observable, spinner};

/// Arguments of `zne run`.
#[derive(Args)]
pub struct RunArgs {
    /// Circuit file (JSON); defaults to a chain of X gates
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Length of the default X-gate chain
    #[arg(long, default_value = "10")]
    pub gates: usize,

    /// Observable such as "Z" or "0.5*ZZ + 0.5*XX"; defaults to Z on qubit 0
    #[arg(short, long)]
    pub observable: Option<String>,

    /// Comma-separated scale factors, e.g. "1,3,5"
    #[arg(long)]
    pub scale_factors: Option<String>,

    /// Folding strategy (global, left, right)
    #[arg(long)]
    pub folding: Option<String>,

    /// Fit model (linear, richardson, exponential, poly:<degree>)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Shots per scale factor
    #[arg(short, long)]
    pub shots: Option<u32>,

    /// Base seed; scale factor k runs with seed + k
    #[arg(long)]
    pub seed: Option<u64>,

    /// Depolarizing probability after single-qubit gates
    #[arg(long, default_value = "0.005")]
    pub p1: f64,

    /// Depolarizing probability after multi-qubit gates
    #[arg(long, default_value = "0.02")]
    pub p2: f64,

    /// Readout bit-flip probability
    #[arg(long, default_value = "0.01")]
    pub readout_error: f64,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the configured options.
    fn options(&self, config: &ZneConfig) -> Result<ZneOptions> {
        let mut options = config.to_options()?;
        if let Some(list) = &self.scale_factors {
            options.scale_factors = ScaleFactor::parse_list(list)?;
        }
        if let Some(folding) = &self.folding {
            options.folding = folding.parse()?;
        }
        if let Some(model) = &self.model {
            options.model = model.parse()?;
        }
        if let Some(shots) = self.shots {
            options.execution.shots = Some(shots);
        }
        if let Some(seed) = self.seed {
            options.execution.seed = Some(seed);
        }
        options.validate()?;
        Ok(options)
    }

    fn noise(&self) -> NoiseModel {
        NoiseModel::depolarizing(self.p1, self.p2).with_readout_error(self.readout_error)
    }
}

/// Execute the run command.
pub async fn execute(args: &RunArgs, config: &ZneConfig) -> Result<()> {
    let options = args.options(config)?;
    let circuit = resolve_circuit(args.input.as_deref(), args.gates)?;
    let observable = resolve_observable(args.observable.as_deref(), circuit.num_qubits())?;
    let simulator = Arc::new(NoisySimulator::with_noise(args.noise())?);

    if !args.json {
        println!(
            "{} Mitigating ⟨{}⟩ on {} ({} qubits, {} instructions)",
            style("→").cyan().bold(),
            style(&observable).green(),
            style(circuit.name()).green(),
            circuit.num_qubits(),
            circuit.len()
        );
        println!(
            "  Scale factors: {}, folding: {}, model: {}",
            style(format_scale_factors(&options.scale_factors)).yellow(),
            style(options.folding).yellow(),
            style(options.model).yellow()
        );
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let exact = NoisySimulator::ideal()
        .execute(&circuit, &observable, &options.execution)
        .await?
        .value;
    debug!(exact, "Computed noiseless reference");

    let progress = if args.json {
        None
    } else {
        Some(spinner("Sampling folded circuits...")?)
    };
    let result = extrapolate(simulator, &circuit, &observable, &options, &cancel).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result, exact);
    }
    Ok(())
}

fn format_scale_factors(scale_factors: &[ScaleFactor]) -> String {
    scale_factors
        .iter()
        .map(|s| s.value().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_report(result: &ZneResult, exact: f64) {
    println!();
    println!("  {:>8}  {:>10}  {:>10}", "λ", "⟨O⟩", "std err");
    for sample in result.dataset.samples() {
        println!(
            "  {:>8.3}  {:>10.5}  {:>10}",
            sample.scale_factor,
            sample.value,
            format_error(sample.std_error)
        );
    }
    println!();

    match result.unmitigated_value {
        Some(raw) => println!(
            "  Unmitigated: {:.5}  (error {:.5})",
            raw,
            (raw - exact).abs()
        ),
        None => println!("  Unmitigated: {}", style("not sampled (λ = 1 missing)").dim()),
    }
    println!(
        "  Mitigated:   {}  (error {:.5}, R² {:.4})",
        style(format!("{:.5}", result.ideal_value)).green().bold(),
        (result.ideal_value - exact).abs(),
        result.fit.r_squared
    );
    println!("  Noiseless:   {exact:.5}");
}
