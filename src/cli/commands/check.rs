//! Check command implementation.

use crate::models::config::{default_config_path, Config};
use crate::preflight;
use colored::Colorize;

/// Run preflight checks and print the results. Returns whether all required
/// checks passed.
pub async fn check(config: &Config) -> bool {
    println!("{}", "Running preflight checks...".bold());
    println!("  {} {}", "Config:".bold(), default_config_path().display());
    println!();

    let results = preflight::run_preflight_checks(config).await;
    preflight::print_results(&results);
    println!();

    preflight::all_passed(&results)
}
