//! Output formatting for the command line
//!
//! Statistic formatting lives in `irfit_core::output`; this module adds the
//! banner, step headers and file listings of the orchestrator.

use colored::*;
use irfit_core::config::AnalysisConfig;
use std::path::Path;

pub fn print_banner(title: &str) {
    println!("{}", title.green().bold());
    println!("{}", "═".repeat(title.chars().count()).dimmed());
    println!();
}

/// Print a numbered step header
pub fn print_step(step: usize, message: &str) {
    println!("{} {}", format!("Step {}:", step).cyan().bold(), message);
}

pub fn print_written(path: &Path) {
    println!("  {} {}", "Wrote".green(), path.display());
}

/// One-line summary of the settings in effect
pub fn format_config(config: &AnalysisConfig) -> String {
    let analysis = &config.analysis;
    let sampling = match config.sampling.size {
        Some(size) => format!("{} rows (seed {})", size, config.sampling.seed.unwrap_or(0)),
        None => "all rows".to_string(),
    };
    format!(
        "response {} by {}, predictors [{}], alpha {}, {}",
        analysis.response,
        analysis.class_column,
        analysis.predictors.join(", "),
        analysis.alpha,
        sampling
    )
}

pub fn print_config(config: &AnalysisConfig) {
    println!("  {}", format_config(config).dimmed());
}
