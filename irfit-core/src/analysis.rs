//! End-to-end analysis run: describe the response per class, compare two
//! classes, fit the model suite and write every export, plot and the
//! manifest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::dataset::Dataset;
use crate::distribution::StatrsProvider;
use crate::error::{ensure_paired, AnalysisError, Result};
use crate::export;
use crate::hypothesis::{f_significance, shapiro_wilk, t_test, FTest, NormalityTest, TTest};
use crate::model::{CoefficientRow, FittedModel, ModelFamily};
use crate::plot::{self, PlotSink};
use crate::regression::RegressionParameters;
use crate::statistics::DescriptiveStats;
use crate::variance_table::VarianceTable;

/// Histogram bins used by every distribution plot
pub const HISTOGRAM_BINS: usize = 10;

/// Every family for every predictor, named `model1`, `model2`, ...
///
/// Predictor-major order: with `["V", "T"]` the suite is V-linear, V-power,
/// V-exponential, T-linear, T-power, T-exponential.
pub fn standard_suite(predictors: &[String], alpha: f64) -> Vec<FittedModel> {
    predictors
        .iter()
        .flat_map(|column| ModelFamily::ALL.into_iter().map(move |family| (column, family)))
        .enumerate()
        .map(|(i, (column, family))| {
            FittedModel::new(format!("model{}", i + 1), family, column.as_str()).with_alpha(alpha)
        })
        .collect()
}

/// Everything derived from one fitted model
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub name: String,
    pub family: ModelFamily,
    pub column: String,
    pub coefficients: CoefficientRow,
    pub parameters: RegressionParameters,
    pub variance: VarianceTable,
    /// `None` when F0 is undefined (zero residual and regression variation)
    pub significance: Option<FTest>,
    pub x: Vec<f64>,
    pub observed: Vec<f64>,
    pub predicted: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub residuals: Vec<f64>,
    /// `None` when the residuals cannot be tested (too few or all equal)
    pub residual_normality: Option<NormalityTest>,
}

impl ModelReport {
    pub fn title(&self) -> String {
        format!("{} ({}, {})", self.name, self.family, self.column)
    }
}

/// Fit `model` on `(x, y)` and evaluate it on the same points
pub fn evaluate_model(model: &mut FittedModel, x: &[f64], y: &[f64]) -> Result<ModelReport> {
    ensure_paired(x, y)?;
    let provider = StatrsProvider;
    model.initiate_with(x, y, &provider)?;

    let predict = model.model(model.column())?;
    let upper_model = model.upper_bound_model()?;
    let lower_model = model.lower_bound_model()?;

    let predicted: Vec<f64> = x.iter().map(|&xi| predict(xi)).collect();
    let upper = x.iter().map(|&xi| upper_model(xi)).collect();
    let lower = x.iter().map(|&xi| lower_model(xi)).collect();
    let residuals: Vec<f64> = y.iter().zip(&predicted).map(|(yi, pi)| yi - pi).collect();

    let variance = VarianceTable::build(model, y, x)?;
    let significance = if variance.f0.is_nan() {
        warn!(model = model.name(), "F0 undefined, skipping F-test");
        None
    } else {
        Some(f_significance(
            variance.f0,
            variance.df_regression,
            variance.df_residual,
            model.alpha(),
            &provider,
        )?)
    };

    let residual_normality = match shapiro_wilk(&residuals, model.alpha(), &provider) {
        Ok(test) => Some(test),
        Err(AnalysisError::InvalidInput(reason)) | Err(AnalysisError::DegenerateInput(reason)) => {
            warn!(model = model.name(), %reason, "residual normality not tested");
            None
        }
        Err(e) => return Err(e),
    };

    debug!(
        model = model.name(),
        f0 = variance.f0,
        residuals = residuals.len(),
        "model evaluated"
    );

    Ok(ModelReport {
        name: model.name().to_string(),
        family: model.family(),
        column: model.column().to_string(),
        coefficients: model.export_row()?,
        parameters: *model.parameters()?,
        variance,
        significance,
        x: x.to_vec(),
        observed: y.to_vec(),
        predicted,
        upper,
        lower,
        residuals,
        residual_normality,
    })
}

/// Fit every model against `response`, each on its own predictor column
pub fn evaluate_suite(
    models: &mut [FittedModel],
    data: &Dataset,
    response: &str,
) -> Result<Vec<ModelReport>> {
    let y = data.column(response)?;
    models
        .iter_mut()
        .map(|model| {
            let x = data.column(model.column())?;
            evaluate_model(model, &x, &y)
        })
        .collect()
}

/// Descriptive statistics of one group, honouring the z-score setting
pub fn describe(sample: &[f64], config: &AnalysisConfig) -> Result<DescriptiveStats> {
    if config.descriptive.fixed_z_score {
        DescriptiveStats::analyze(sample)
    } else {
        DescriptiveStats::analyze_at(sample, config.analysis.alpha)
    }
}

/// Summary of one group of the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    /// Class id, `None` for the whole dataset
    pub class: Option<f64>,
    pub stats: DescriptiveStats,
    pub normality: Option<NormalityTest>,
}

/// Coefficient row as stored in the manifest, non-finite values as `None`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManifestCoefficients {
    pub beta0: Option<f64>,
    pub beta1: Option<f64>,
    pub beta0_interval: Option<f64>,
    pub beta1_interval: Option<f64>,
}

impl From<&CoefficientRow> for ManifestCoefficients {
    fn from(row: &CoefficientRow) -> Self {
        Self {
            beta0: finite(row.beta0),
            beta1: finite(row.beta1),
            beta0_interval: finite(row.beta0_interval),
            beta1_interval: finite(row.beta1_interval),
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    Some(value).filter(|v| v.is_finite())
}

/// Manifest row for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub family: ModelFamily,
    pub column: String,
    pub equation: String,
    pub coefficients: ManifestCoefficients,
    /// `None` when F0 is not finite
    pub f0: Option<f64>,
    pub f_p_value: Option<f64>,
    pub residuals_normal: Option<bool>,
}

impl From<&ModelReport> for ModelEntry {
    fn from(report: &ModelReport) -> Self {
        Self {
            name: report.name.clone(),
            family: report.family,
            column: report.column.clone(),
            equation: report.family.equation().to_string(),
            coefficients: ManifestCoefficients::from(&report.coefficients),
            f0: finite(report.variance.f0),
            f_p_value: report.significance.map(|t| t.p_value),
            residuals_normal: report.residual_normality.map(|t| t.is_normal()),
        }
    }
}

/// JSON summary of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    pub rows: usize,
    pub config: AnalysisConfig,
    pub groups: Vec<GroupSummary>,
    pub comparison: Option<TTest>,
    pub models: Vec<ModelEntry>,
    pub files: Vec<PathBuf>,
}

impl Manifest {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Result of a full run, kept for terminal reporting
#[derive(Debug)]
pub struct Report {
    pub manifest: Manifest,
    pub models: Vec<ModelReport>,
    pub manifest_path: PathBuf,
}

/// Apply the configured subsampling, if any
pub fn prepare(data: &Dataset, config: &AnalysisConfig) -> Result<Dataset> {
    match config.sampling.size {
        Some(size) => data.sample(size, config.sampling.seed.unwrap_or(0)),
        None => Ok(data.clone()),
    }
}

fn class_label(class: f64) -> String {
    format!("class {}", class)
}

fn summarize_group(
    label: &str,
    class: Option<f64>,
    sample: &[f64],
    config: &AnalysisConfig,
    sink: &mut dyn PlotSink,
) -> Result<GroupSummary> {
    let stats = describe(sample, config)?;
    let normality = match shapiro_wilk(sample, config.analysis.alpha, &StatrsProvider) {
        Ok(test) => Some(test),
        Err(AnalysisError::InvalidInput(reason)) | Err(AnalysisError::DegenerateInput(reason)) => {
            warn!(group = label, %reason, "normality not tested");
            None
        }
        Err(e) => return Err(e),
    };

    if config.output.plots {
        let response = config.analysis.response.as_str();
        sink.render(&plot::box_plot(
            &format!("Box plot of {} in {}", response, label),
            &[(class.unwrap_or(0.0), sample.to_vec())],
            response,
            &config.analysis.class_column,
        ))?;
        sink.render(&plot::histogram(
            &format!("Distribution of {} in {}", response, label),
            sample,
            HISTOGRAM_BINS,
            response,
        )?)?;
        match plot::normal_probability(
            &format!("Normal plot of {} in {}", response, label),
            sample,
            response,
        ) {
            Ok(figure) => sink.render(&figure)?,
            Err(e) => warn!(group = label, error = %e, "normal plot skipped"),
        }
    }

    Ok(GroupSummary {
        label: label.to_string(),
        class,
        stats,
        normality,
    })
}

fn render_model(report: &ModelReport, response: &str, sink: &mut dyn PlotSink) -> Result<()> {
    sink.render(&plot::regression_comparison(
        &format!("Regression of {}", report.title()),
        &report.x,
        &report.observed,
        &report.predicted,
        &report.upper,
        &report.lower,
        &report.column,
        response,
    ))?;
    sink.render(&plot::residual_scatter(
        &format!("Residues of {}", report.title()),
        &report.x,
        &report.residuals,
        &report.column,
    ))
}

fn export_model(report: &ModelReport, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let coefficients = dir.join(format!("{}_coefficients.csv", report.name));
    export::export_coefficients(&report.coefficients, &coefficients)?;
    let parameters = dir.join(format!("{}_parameters.csv", report.name));
    export::export_parameters(&report.parameters, &parameters)?;
    let variance = dir.join(format!("{}_variance_table.csv", report.name));
    export::export_variance_table(&report.variance, &variance)?;
    files.extend([coefficients, parameters, variance]);
    Ok(())
}

/// Run the whole workflow on an already prepared dataset
///
/// Figures go to `sink` unless `config.output.plots` is off. `on_model` is
/// called after each model is evaluated.
pub fn run(
    data: &Dataset,
    config: &AnalysisConfig,
    sink: &mut dyn PlotSink,
    mut on_model: impl FnMut(&ModelReport),
) -> Result<Report> {
    let dir = config.output.directory.as_path();
    fs::create_dir_all(dir)?;
    let settings = &config.analysis;
    let mut files = Vec::new();
    let mut groups = Vec::new();

    // Whole dataset
    let response = data.column(&settings.response)?;
    let all = summarize_group("all materials", None, &response, config, sink)?;
    let path = dir.join("descriptive_all.csv");
    export::export_descriptive(&all.stats, &path)?;
    files.push(path);
    groups.push(all);

    if config.output.plots {
        let classes = data.classes(&settings.class_column)?;
        let mut per_class = Vec::with_capacity(classes.len());
        for class in classes {
            let subset = data.filter_class(&settings.class_column, class)?;
            per_class.push((class, subset.column(&settings.response)?));
        }
        sink.render(&plot::box_plot(
            &format!("Box plot of {} by {}", settings.response, settings.class_column),
            &per_class,
            &settings.response,
            &settings.class_column,
        ))?;
    }

    // Compared classes
    let mut compared = Vec::with_capacity(2);
    for class in settings.compare_classes {
        let sample = data
            .filter_class(&settings.class_column, class)?
            .column(&settings.response)?;
        let label = class_label(class);
        let summary = summarize_group(&label, Some(class), &sample, config, sink)?;
        let path = dir.join(format!("descriptive_class_{}.csv", class));
        export::export_descriptive(&summary.stats, &path)?;
        files.push(path);
        groups.push(summary);
        compared.push(sample);
    }
    let comparison = Some(t_test(
        &compared[0],
        &compared[1],
        settings.alpha,
        &StatrsProvider,
    )?);

    // Model suite on the fit class
    let fit_data = data.filter_class(&settings.class_column, settings.fit_class)?;
    let y = fit_data.column(&settings.response)?;
    let mut models = standard_suite(&settings.predictors, settings.alpha);
    let mut reports = Vec::with_capacity(models.len());
    for model in models.iter_mut() {
        let x = fit_data.column(model.column())?;
        let report = evaluate_model(model, &x, &y)?;
        export_model(&report, dir, &mut files)?;
        if config.output.plots {
            render_model(&report, &settings.response, sink)?;
        }
        on_model(&report);
        reports.push(report);
    }

    let manifest = Manifest {
        generated_at: chrono::Utc::now().to_rfc3339(),
        rows: data.len(),
        config: config.clone(),
        groups,
        comparison,
        models: reports.iter().map(ModelEntry::from).collect(),
        files,
    };
    let manifest_path = dir.join("manifest.json");
    manifest.save(&manifest_path)?;
    debug!(path = %manifest_path.display(), "manifest written");

    Ok(Report {
        manifest,
        models: reports,
        manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::MemorySink;
    use tempfile::tempdir;

    fn columns() -> Vec<String> {
        vec!["V".to_string(), "T".to_string()]
    }

    #[test]
    fn test_standard_suite_order() {
        let suite = standard_suite(&columns(), 0.05);
        let summary: Vec<(&str, ModelFamily, &str)> = suite
            .iter()
            .map(|m| (m.name(), m.family(), m.column()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("model1", ModelFamily::Linear, "V"),
                ("model2", ModelFamily::Power, "V"),
                ("model3", ModelFamily::Exponential, "V"),
                ("model4", ModelFamily::Linear, "T"),
                ("model5", ModelFamily::Power, "T"),
                ("model6", ModelFamily::Exponential, "T"),
            ]
        );
        assert!(suite.iter().all(|m| !m.is_initiated()));
    }

    #[test]
    fn test_evaluate_model_residuals() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let y = [2.1, 3.9, 6.2, 7.8, 10.1, 12.0, 13.8, 16.2];
        let mut model = FittedModel::new("model1", ModelFamily::Linear, "V");
        let report = evaluate_model(&mut model, &x, &y).unwrap();

        assert!(model.is_initiated());
        for i in 0..x.len() {
            let rebuilt = report.predicted[i] + report.residuals[i];
            assert!((rebuilt - y[i]).abs() < 1e-12);
            assert!(report.lower[i] <= report.predicted[i]);
            assert!(report.predicted[i] <= report.upper[i]);
        }
        // OLS residuals sum to zero
        assert!(report.residuals.iter().sum::<f64>().abs() < 1e-9);

        let f = report.significance.unwrap();
        assert!(f.verdict.is_reject(), "strong linear trend must be significant");
        assert!(report.residual_normality.is_some());
    }

    #[test]
    fn test_exact_fit_skips_residual_normality() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let mut model = FittedModel::new("model1", ModelFamily::Linear, "V");
        let report = evaluate_model(&mut model, &x, &y).unwrap();

        let entry = ModelEntry::from(&report);
        assert!((entry.coefficients.beta1.unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(entry.equation, "Y = b0 + b1*X");
        assert!(report.variance.f0 > 1e12 || report.variance.f0.is_infinite());
    }

    #[test]
    fn test_evaluate_suite_uses_each_column() {
        let headers = vec!["M".to_string(), "IR".to_string(), "V".to_string(), "T".to_string()];
        let rows = (1..=12)
            .map(|i| {
                let v = i as f64;
                let t = 300.0 + 3.0 * v + (v * 0.7).sin();
                vec![0.0, 1.5 * v + (v * 1.3).cos(), v, t]
            })
            .collect();
        let data = Dataset::new(headers, rows).unwrap();
        let mut models = standard_suite(&columns(), 0.05);

        let reports = evaluate_suite(&mut models, &data, "IR").unwrap();
        assert_eq!(reports.len(), 6);
        assert_eq!(reports[0].x, data.column("V").unwrap());
        assert_eq!(reports[3].x, data.column("T").unwrap());
        assert!(models.iter().all(|m| m.is_initiated()));
    }

    #[test]
    fn test_describe_follows_config() {
        let sample = [1.0, 2.0, 3.0, 4.0];
        let mut config = AnalysisConfig::default();
        let fixed = describe(&sample, &config).unwrap();

        config.descriptive.fixed_z_score = false;
        config.analysis.alpha = 0.10;
        let quantile = describe(&sample, &config).unwrap();

        assert!((fixed.confidence_level - 0.95).abs() < 1e-12);
        assert!((quantile.confidence_level - 0.90).abs() < 1e-12);
        assert!(quantile.confidence_interval < fixed.confidence_interval);
    }

    #[test]
    fn test_prepare_samples_when_configured() {
        let rows = (0..30).map(|i| vec![i as f64]).collect();
        let data = Dataset::new(vec!["a".to_string()], rows).unwrap();
        let mut config = AnalysisConfig::default();

        assert_eq!(prepare(&data, &config).unwrap().len(), 30);
        config.sampling.size = Some(10);
        config.sampling.seed = Some(7);
        let first = prepare(&data, &config).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first, prepare(&data, &config).unwrap());
    }

    #[test]
    fn test_run_writes_outputs() {
        let headers = vec!["M".to_string(), "IR".to_string(), "V".to_string(), "T".to_string()];
        let rows = (1..=40)
            .map(|i| {
                let v = (i % 20 + 1) as f64;
                let class = (i % 2) as f64;
                let noise = ((i * 7919) % 13) as f64 / 13.0 - 0.5;
                vec![class, 2.0 + 0.8 * v + class + noise, v, 290.0 + 2.0 * v + noise]
            })
            .collect();
        let data = Dataset::new(headers, rows).unwrap();

        let dir = tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.output.directory = dir.path().to_path_buf();
        let mut sink = MemorySink::default();
        let mut seen = Vec::new();

        let report = run(&data, &config, &mut sink, |m| seen.push(m.name.clone())).unwrap();

        assert_eq!(seen.len(), 6);
        assert_eq!(report.manifest.groups.len(), 3);
        assert_eq!(report.manifest.models.len(), 6);
        assert!(report.manifest.comparison.is_some());
        assert!(report.manifest.files.iter().all(|f| f.exists()));
        assert!(report.manifest_path.exists());
        // 3 group plots x 3 + class box plot + 2 per model
        assert_eq!(sink.figures.len(), 9 + 1 + 12);

        let loaded = Manifest::load(&report.manifest_path).unwrap();
        assert_eq!(loaded.models[2].name, "model3");
        assert_eq!(loaded.rows, 40);
    }

    #[test]
    fn test_manifest_round_trips_non_finite_coefficients() {
        let row = CoefficientRow {
            beta0: 3.0,
            beta1: 1.5,
            beta0_interval: f64::NEG_INFINITY,
            beta1_interval: 0.0,
        };
        let entry = ModelEntry {
            name: "model2".to_string(),
            family: ModelFamily::Power,
            column: "V".to_string(),
            equation: ModelFamily::Power.equation().to_string(),
            coefficients: ManifestCoefficients::from(&row),
            f0: finite(f64::INFINITY),
            f_p_value: None,
            residuals_normal: None,
        };
        let manifest = Manifest {
            generated_at: chrono::Utc::now().to_rfc3339(),
            rows: 6,
            config: AnalysisConfig::default(),
            groups: Vec::new(),
            comparison: None,
            models: vec![entry],
            files: Vec::new(),
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        manifest.save(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();

        let c = loaded.models[0].coefficients;
        assert_eq!(c.beta0, Some(3.0));
        assert_eq!(c.beta0_interval, None);
        assert_eq!(c.beta1_interval, Some(0.0));
        assert_eq!(loaded.models[0].f0, None);
    }

    #[test]
    fn test_run_without_plots() {
        let headers = vec!["M".to_string(), "IR".to_string(), "V".to_string(), "T".to_string()];
        let rows = (1..=24)
            .map(|i| {
                let v = (i % 12 + 1) as f64;
                let noise = ((i * 31) % 7) as f64 / 7.0 - 0.5;
                vec![(i % 2) as f64, 1.0 + 0.5 * v + noise, v, 300.0 + v + noise]
            })
            .collect();
        let data = Dataset::new(headers, rows).unwrap();

        let dir = tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.output.directory = dir.path().join("out");
        config.output.plots = false;
        let mut sink = MemorySink::default();

        let report = run(&data, &config, &mut sink, |_| {}).unwrap();
        assert!(sink.figures.is_empty());
        // 3 descriptive files + 3 per model
        assert_eq!(report.manifest.files.len(), 3 + 18);
    }
}
