//! CLI argument parsing for irfit

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "irfit")]
#[command(version)]
#[command(about = "Exploratory statistics and regression fitting for IR measurements", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./irfit.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output (to stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw a reproducible random subset of rows and write it as CSV
    Sample {
        /// Input CSV file
        input: PathBuf,

        /// Where to write the subset
        #[arg(short, long)]
        output: PathBuf,

        /// Number of rows to draw
        #[arg(short = 'n', long)]
        size: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Descriptive statistics of the response, overall and per class
    Describe {
        #[command(flatten)]
        selection: Selection,

        /// Write the statistics of the selection to this CSV file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Shapiro-Wilk normality test
    Normality {
        #[command(flatten)]
        selection: Selection,
    },

    /// Two-sample t-test of the response between two classes
    #[command(name = "ttest")]
    TTest {
        /// Input CSV file
        input: PathBuf,

        /// The two classes to compare (defaults to the configured pair)
        #[arg(long, num_args = 2, value_names = ["A", "B"])]
        classes: Option<Vec<f64>>,

        /// Significance level
        #[arg(long)]
        alpha: Option<f64>,
    },

    /// Fit the six standard models on one class
    Fit {
        /// Input CSV file
        input: PathBuf,

        /// Class to fit on
        #[arg(long)]
        class: Option<f64>,

        /// Significance level
        #[arg(long)]
        alpha: Option<f64>,

        /// Also print each model's variance table
        #[arg(long)]
        tables: bool,

        /// Write coefficient, parameter and variance table CSVs here
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
    },

    /// Full workflow: statistics, tests, model suite, exports and plots
    Report {
        /// Input CSV file
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip plot series
        #[arg(long)]
        no_plots: bool,

        /// Subsample this many rows first
        #[arg(short = 'n', long)]
        sample: Option<usize>,

        /// Seed for the subsample
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Which rows and column to look at
#[derive(Args, Debug)]
pub struct Selection {
    /// Input CSV file
    pub input: PathBuf,

    /// Restrict to one class
    #[arg(long)]
    pub class: Option<f64>,

    /// Column to analyze (defaults to the configured response)
    #[arg(long)]
    pub column: Option<String>,
}
