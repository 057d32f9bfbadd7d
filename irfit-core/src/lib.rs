//! Statistics and regression engine behind the `irfit` command.
//!
//! Descriptive statistics, least-squares fits of linear, power and
//! exponential models with coefficient confidence intervals, ANOVA tables
//! and the normality, t and F tests used to judge them.

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod export;
pub mod hypothesis;
pub mod model;
pub mod output;
pub mod plot;
pub mod regression;
pub mod statistics;
pub mod variance_table;

pub use analysis::{
    evaluate_model, evaluate_suite, standard_suite, GroupSummary, Manifest, ManifestCoefficients,
    ModelEntry, ModelReport, Report,
};
pub use config::AnalysisConfig;
pub use dataset::Dataset;
pub use distribution::{DistributionProvider, StatrsProvider};
pub use error::{AnalysisError, Result};
pub use hypothesis::{
    f_test, shapiro_normality, two_sample_t_test, FTest, NormalityTest, TTest, Verdict,
};
pub use model::{CoefficientRow, Coefficients, FittedModel, Interval, ModelFamily};
pub use plot::{Figure, JsonPlotSink, MemorySink, PlotSink, Series};
pub use regression::RegressionParameters;
pub use statistics::DescriptiveStats;
pub use variance_table::VarianceTable;
