mod analyze;
mod cli;
mod output;
mod progress;

use anyhow::{bail, Result};
use clap::Parser;
use cli::{Cli, Command};
use irfit_core::AnalysisConfig;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load configuration: CLI flags > env vars > config file > defaults
fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            bail!("Config file {} does not exist", path.display());
        }
        // Parse errors in an explicit config file are fatal
        if let Err(e) = AnalysisConfig::from_file(path) {
            bail!("Failed to parse config file {}: {}", path.display(), e);
        }
    }
    let mut config = AnalysisConfig::load_from(cli.config.as_deref());

    match &cli.command {
        Command::Sample { seed, .. } => {
            if seed.is_some() {
                config.sampling.seed = *seed;
            }
        }
        Command::TTest { alpha, .. } => {
            if let Some(alpha) = alpha {
                config.analysis.alpha = *alpha;
            }
        }
        Command::Fit { class, alpha, .. } => {
            if let Some(class) = class {
                config.analysis.fit_class = *class;
            }
            if let Some(alpha) = alpha {
                config.analysis.alpha = *alpha;
            }
        }
        Command::Report {
            output,
            no_plots,
            sample,
            seed,
            ..
        } => {
            if let Some(dir) = output {
                config.output.directory = dir.clone();
            }
            if *no_plots {
                config.output.plots = false;
            }
            if sample.is_some() {
                config.sampling.size = *sample;
            }
            if seed.is_some() {
                config.sampling.seed = *seed;
            }
        }
        Command::Describe { .. } | Command::Normality { .. } => {}
    }

    if !(config.analysis.alpha > 0.0 && config.analysis.alpha < 1.0) {
        bail!("alpha must lie in (0, 1), got {}", config.analysis.alpha);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    tracing::debug!(?config, "configuration loaded");

    match &cli.command {
        Command::Sample {
            input, output, size, ..
        } => analyze::run_sample(&config, input, output, *size),
        Command::Describe { selection, export } => {
            analyze::run_describe(&config, selection, export.as_deref())
        }
        Command::Normality { selection } => analyze::run_normality(&config, selection),
        Command::TTest { input, classes, .. } => {
            analyze::run_ttest(&config, input, classes.as_deref())
        }
        Command::Fit {
            input,
            tables,
            export,
            ..
        } => analyze::run_fit(&config, input, *tables, export.as_deref(), cli.quiet),
        Command::Report { input, .. } => analyze::run_report(&config, input, cli.quiet),
    }
}
