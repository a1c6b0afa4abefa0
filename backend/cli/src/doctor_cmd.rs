//! CLI Doctor Command
//!
//! Prints the effective configuration with secrets masked, then the
//! validation report for `serve`.

use std::path::Path;

use anyhow::{bail, Result};

use flexscan_config::{load_config, validate, Mode, ValidationReport};

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    println!("\n🔍 Running Flexscan Doctor...\n");

    let config = load_config(config_path).await?;
    println!("Effective configuration:\n");
    println!("{}", toml::to_string_pretty(&config.redacted())?);

    let report = validate(&config, Mode::Serve);
    print_report(&report);

    if !report.is_valid() {
        bail!("{} configuration error(s)", report.errors.len());
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    for error in &report.errors {
        println!("  🔴 {error}");
    }
    for warning in &report.warnings {
        println!("  🟡 {warning}");
    }
    println!();
    if report.is_valid() {
        println!("✅ Configuration is ready to serve.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }
}
