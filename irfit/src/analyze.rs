use anyhow::{bail, Context, Result};
use colored::*;
use irfit_core::analysis::{self, describe, evaluate_model, standard_suite};
use irfit_core::hypothesis::{shapiro_wilk, t_test};
use irfit_core::output::{
    format_descriptive, format_normality, format_t_test, format_variance_table, print_group,
    print_model_line, print_summary,
};
use irfit_core::{export, AnalysisConfig, Dataset, JsonPlotSink, MemorySink, PlotSink, StatrsProvider};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::cli::Selection;
use crate::output::{print_banner, print_config, print_step, print_written};
use crate::progress::FitProgress;

fn load_dataset(input: &Path) -> Result<Dataset> {
    Dataset::load(input).with_context(|| format!("Failed to load dataset {}", input.display()))
}

/// Labeled samples picked out by a selection: the selection itself first,
/// then every class when no class was given
fn select_groups(
    data: &Dataset,
    config: &AnalysisConfig,
    selection: &Selection,
) -> Result<Vec<(String, Vec<f64>)>> {
    let column = selection
        .column
        .as_deref()
        .unwrap_or(&config.analysis.response);
    let class_column = config.analysis.class_column.as_str();

    let mut groups = Vec::new();
    match selection.class {
        Some(class) => {
            let subset = data.filter_class(class_column, class)?;
            if subset.is_empty() {
                bail!("No rows with {} = {}", class_column, class);
            }
            groups.push((format!("{} ({} = {})", column, class_column, class), subset.column(column)?));
        }
        None => {
            groups.push((format!("{} (all rows)", column), data.column(column)?));
            for class in data.classes(class_column)? {
                let subset = data.filter_class(class_column, class)?;
                groups.push((
                    format!("{} ({} = {})", column, class_column, class),
                    subset.column(column)?,
                ));
            }
        }
    }
    Ok(groups)
}

pub fn run_sample(
    config: &AnalysisConfig,
    input: &Path,
    output: &Path,
    size: Option<usize>,
) -> Result<()> {
    let data = load_dataset(input)?;
    let size = match size.or(config.sampling.size) {
        Some(size) => size,
        None => bail!("No sample size given (use --size or [sampling] size)"),
    };
    let seed = config.sampling.seed.unwrap_or(0);

    let subset = data
        .sample(size, seed)
        .with_context(|| format!("Failed to draw {} rows", size))?;
    subset
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} {} of {} rows (seed {})",
        "Sampled".green().bold(),
        subset.len(),
        data.len(),
        seed
    );
    print_written(output);
    Ok(())
}

pub fn run_describe(
    config: &AnalysisConfig,
    selection: &Selection,
    export_path: Option<&Path>,
) -> Result<()> {
    let data = load_dataset(&selection.input)?;
    let groups = select_groups(&data, config, selection)?;

    let mut first = None;
    for (label, sample) in &groups {
        let stats = describe(sample, config)
            .with_context(|| format!("Failed to describe {}", label))?;
        println!("{}", format_descriptive(label, &stats));
        if first.is_none() {
            first = Some(stats);
        }
    }

    if let (Some(path), Some(stats)) = (export_path, first) {
        export::export_descriptive(&stats, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        print_written(path);
    }
    Ok(())
}

pub fn run_normality(config: &AnalysisConfig, selection: &Selection) -> Result<()> {
    let data = load_dataset(&selection.input)?;
    for (label, sample) in select_groups(&data, config, selection)? {
        let test = shapiro_wilk(&sample, config.analysis.alpha, &StatrsProvider)
            .with_context(|| format!("Normality test failed for {}", label))?;
        println!("{} {}", "NORMALITY".green().bold(), label.cyan());
        println!("{}", format_normality(&test));
    }
    Ok(())
}

pub fn run_ttest(config: &AnalysisConfig, input: &Path, classes: Option<&[f64]>) -> Result<()> {
    let data = load_dataset(input)?;
    let [a, b] = match classes {
        Some(&[a, b]) => [a, b],
        Some(other) => bail!("Expected two classes, got {}", other.len()),
        None => config.analysis.compare_classes,
    };

    let settings = &config.analysis;
    let sample_a = data.filter_class(&settings.class_column, a)?.column(&settings.response)?;
    let sample_b = data.filter_class(&settings.class_column, b)?.column(&settings.response)?;
    let test = t_test(&sample_a, &sample_b, settings.alpha, &StatrsProvider)
        .context("t-test failed")?;

    let label = format!(
        "{} of {} = {} vs {}",
        settings.response, settings.class_column, a, b
    );
    println!("{}", format_t_test(&label, &test));
    Ok(())
}

pub fn run_fit(
    config: &AnalysisConfig,
    input: &Path,
    tables: bool,
    export_dir: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let settings = &config.analysis;
    let data = load_dataset(input)?
        .filter_class(&settings.class_column, settings.fit_class)?;
    if data.is_empty() {
        bail!("No rows with {} = {}", settings.class_column, settings.fit_class);
    }
    let y = data.column(&settings.response)?;

    if let Some(dir) = export_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut models = standard_suite(&settings.predictors, settings.alpha);
    let mut progress = FitProgress::new(models.len(), quiet);
    let mut reports = Vec::with_capacity(models.len());
    for model in models.iter_mut() {
        let x = data.column(model.column())?;
        let report = evaluate_model(model, &x, &y)
            .with_context(|| format!("Failed to fit {}", model.name()))?;
        progress.advance(&report.name);
        reports.push(report);
    }
    progress.finish();

    for report in &reports {
        print_model_line(report);
        if tables {
            println!("{}", format_variance_table(&report.variance));
        }
        if let Some(dir) = export_dir {
            let path = dir.join(format!("{}_coefficients.csv", report.name));
            export::export_coefficients(&report.coefficients, &path)?;
            export::export_parameters(
                &report.parameters,
                dir.join(format!("{}_parameters.csv", report.name)),
            )?;
            export::export_variance_table(
                &report.variance,
                dir.join(format!("{}_variance_table.csv", report.name)),
            )?;
            debug!(model = %report.name, dir = %dir.display(), "model exported");
        }
    }
    if let Some(dir) = export_dir {
        print_written(dir);
    }
    Ok(())
}

pub fn run_report(config: &AnalysisConfig, input: &Path, quiet: bool) -> Result<()> {
    print_banner("irfit - IR Regression Report");
    print_config(config);
    println!();

    // Step 1: Load and subsample
    print_step(1, "Loading data...");
    let data = load_dataset(input)?;
    let prepared = analysis::prepare(&data, config).context("Failed to subsample dataset")?;
    println!("  Using {} of {} rows", prepared.len(), data.len());
    println!();

    // Step 2: Statistics, tests, models
    print_step(2, "Running analysis...");
    let mut sink: Box<dyn PlotSink> = if config.output.plots {
        Box::new(JsonPlotSink::new(config.output.directory.join("plots"))?)
    } else {
        Box::new(MemorySink::default())
    };
    let mut progress = FitProgress::new(config.analysis.predictors.len() * 3, quiet);
    let report = analysis::run(&prepared, config, sink.as_mut(), |model| {
        progress.advance(&model.name)
    })
    .context("Analysis failed")?;
    progress.finish();
    println!();

    // Step 3: Results
    print_step(3, "Results");
    for group in &report.manifest.groups {
        print_group(group);
    }
    if let Some(test) = &report.manifest.comparison {
        let [a, b] = config.analysis.compare_classes;
        println!(
            "{}",
            format_t_test(&format!("{} = {} vs {}", config.analysis.class_column, a, b), test)
        );
    }
    println!();
    for model in &report.models {
        print_model_line(model);
    }

    print_summary(&report);
    Ok(())
}
