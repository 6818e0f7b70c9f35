//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - Zero-noise extrapolation for noisy quantum circuits",
        style("ZNE").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  zne-ir           Circuit and observable representation");
    println!("  zne-hal          Executor abstraction");
    println!("  zne-mitigation   Folding, sampling and extrapolation");
    println!("  zne-adapter-sim  Local noisy simulator");
    println!("  zne-cli          Command-line interface");
    println!();
    println!("License:    {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
