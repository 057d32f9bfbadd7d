//! Fixed-header CSV exports consumed by external reporting.
//!
//! Every export is a header row followed by data rows. Numbers use Rust's
//! default `Display` for `f64`; absent cells are written empty.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::model::CoefficientRow;
use crate::regression::RegressionParameters;
use crate::statistics::DescriptiveStats;
use crate::variance_table::VarianceTable;

/// Escape CSV field (handle commas, quotes, newlines)
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render a header and rows as CSV text
pub fn render_csv(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = header
        .iter()
        .map(|h| escape_field(h))
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    for row in rows {
        let line = row
            .iter()
            .map(|f| escape_field(f))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn write_csv<P: AsRef<Path>>(path: P, contents: String) -> Result<()> {
    debug!(path = %path.as_ref().display(), "writing CSV export");
    fs::write(path, contents)?;
    Ok(())
}

/// `Quartile 1, Median, Quartile 3, Mean, Standard deviation, Confidence interval`
pub fn descriptive_csv(stats: &DescriptiveStats) -> String {
    let ci_header = format!(
        "Confidence interval ({}%)",
        (stats.confidence_level * 100.0).round()
    );
    let header = [
        "Quartile 1",
        "Median",
        "Quartile 3",
        "Mean",
        "Standard deviation",
        ci_header.as_str(),
    ];
    let row: Vec<String> = [
        stats.q1,
        stats.median,
        stats.q3,
        stats.mean,
        stats.std_dev,
        stats.confidence_interval,
    ]
    .iter()
    .map(|v| v.to_string())
    .collect();
    render_csv(&header, &[row])
}

pub fn export_descriptive<P: AsRef<Path>>(stats: &DescriptiveStats, path: P) -> Result<()> {
    write_csv(path, descriptive_csv(stats))
}

/// Full regression record of one fit
pub fn parameters_csv(params: &RegressionParameters) -> String {
    let header = [
        "beta0",
        "beta1",
        "beta0 interval",
        "beta1 interval",
        "SXX",
        "SXY",
        "SYY",
        "SSE",
        "SSR",
        "MSE",
    ];
    let row: Vec<String> = [
        params.beta0,
        params.beta1,
        params.beta0_half_width,
        params.beta1_half_width,
        params.sxx,
        params.sxy,
        params.syy,
        params.sse,
        params.ssr,
        params.mse,
    ]
    .iter()
    .map(|v| v.to_string())
    .collect();
    render_csv(&header, &[row])
}

pub fn export_parameters<P: AsRef<Path>>(params: &RegressionParameters, path: P) -> Result<()> {
    write_csv(path, parameters_csv(params))
}

pub fn coefficients_csv(row: &CoefficientRow) -> String {
    let values: Vec<String> = row.values().iter().map(|v| v.to_string()).collect();
    render_csv(&CoefficientRow::HEADER, &[values])
}

pub fn export_coefficients<P: AsRef<Path>>(row: &CoefficientRow, path: P) -> Result<()> {
    write_csv(path, coefficients_csv(row))
}

pub fn variance_table_csv(table: &VarianceTable) -> String {
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| {
            vec![
                row.source.clone(),
                row.sum_of_squares.to_string(),
                row.degrees_of_freedom.to_string(),
                cell(row.mean_square),
                cell(row.f0),
            ]
        })
        .collect();
    render_csv(&VarianceTable::HEADER, &rows)
}

pub fn export_variance_table<P: AsRef<Path>>(table: &VarianceTable, path: P) -> Result<()> {
    write_csv(path, variance_table_csv(table))
}
