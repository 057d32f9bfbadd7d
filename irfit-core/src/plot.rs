//! Plot series handed to an external renderer.
//!
//! This crate never draws. It builds [`Figure`]s (labeled point series plus a
//! title) and passes them to a [`PlotSink`]. [`JsonPlotSink`] writes one JSON
//! document per figure for a downstream plotting tool; [`MemorySink`] keeps
//! them in memory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::statistics::{mean, standard_deviation};

/// How a renderer should draw a figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    BoxPlot,
    Histogram,
    Scatter,
}

/// One labeled point series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub kind: FigureKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// Receives finished figures
pub trait PlotSink {
    fn render(&mut self, figure: &Figure) -> Result<()>;
}

/// Keeps every rendered figure, in order
#[derive(Debug, Default)]
pub struct MemorySink {
    pub figures: Vec<Figure>,
}

impl PlotSink for MemorySink {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

/// Writes `<slug>.json` per figure into a directory
#[derive(Debug)]
pub struct JsonPlotSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonPlotSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            written: Vec::new(),
        })
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PlotSink for JsonPlotSink {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        let path = self.dir.join(format!("{}.json", slug(&figure.title)));
        let json = serde_json::to_string_pretty(figure)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), series = figure.series.len(), "figure written");
        self.written.push(path);
        Ok(())
    }
}

/// File-name-safe version of a title
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("figure");
    }
    out
}

/// One box per group; each series carries the group id as X
pub fn box_plot(title: &str, groups: &[(f64, Vec<f64>)], value_label: &str, group_label: &str) -> Figure {
    let series = groups
        .iter()
        .map(|(id, values)| {
            Series::new(
                format!("{} = {}", group_label, id),
                vec![*id; values.len()],
                values.clone(),
            )
        })
        .collect();
    Figure {
        title: title.to_string(),
        kind: FigureKind::BoxPlot,
        x_label: group_label.to_string(),
        y_label: value_label.to_string(),
        series,
    }
}

/// Bin counts over `bins` equal-width bins; X is each bin's center
pub fn histogram(title: &str, sample: &[f64], bins: usize, value_label: &str) -> Result<Figure> {
    if sample.is_empty() || bins == 0 {
        return Err(AnalysisError::InvalidInput(
            "histogram needs a non-empty sample and at least one bin".to_string(),
        ));
    }
    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut counts = vec![0.0; bins];
    for v in sample {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1.0;
    }
    let centers = (0..bins).map(|i| min + width * (i as f64 + 0.5)).collect();

    Ok(Figure {
        title: title.to_string(),
        kind: FigureKind::Histogram,
        x_label: value_label.to_string(),
        y_label: "count".to_string(),
        series: vec![Series::new(value_label, centers, counts)],
    })
}

/// Standardized sorted values against plotting positions `(i - 0.375)/(n + 0.25)`
pub fn normal_probability(title: &str, sample: &[f64], value_label: &str) -> Result<Figure> {
    if sample.len() < 2 {
        return Err(AnalysisError::InvalidInput(
            "normal probability plot needs at least 2 values".to_string(),
        ));
    }
    let m = mean(sample);
    let sd = standard_deviation(sample);
    if sd == 0.0 {
        return Err(AnalysisError::DegenerateInput(
            "sample has zero variance".to_string(),
        ));
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;
    let standardized = sorted.iter().map(|v| (v - m) / sd).collect();
    let positions = (1..=sorted.len())
        .map(|i| (i as f64 - 0.375) / (n + 0.25))
        .collect();

    Ok(Figure {
        title: title.to_string(),
        kind: FigureKind::Scatter,
        x_label: value_label.to_string(),
        y_label: "cumulative probability".to_string(),
        series: vec![Series::new(value_label, standardized, positions)],
    })
}

/// Observed points with the fitted curve and both bound curves
#[allow(clippy::too_many_arguments)]
pub fn regression_comparison(
    title: &str,
    x: &[f64],
    observed: &[f64],
    fitted: &[f64],
    upper: &[f64],
    lower: &[f64],
    x_label: &str,
    y_label: &str,
) -> Figure {
    Figure {
        title: title.to_string(),
        kind: FigureKind::Scatter,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        series: vec![
            Series::new("observed", x.to_vec(), observed.to_vec()),
            Series::new("fitted", x.to_vec(), fitted.to_vec()),
            Series::new("upper bound", x.to_vec(), upper.to_vec()),
            Series::new("lower bound", x.to_vec(), lower.to_vec()),
        ],
    }
}

pub fn residual_scatter(title: &str, x: &[f64], residuals: &[f64], x_label: &str) -> Figure {
    Figure {
        title: title.to_string(),
        kind: FigureKind::Scatter,
        x_label: x_label.to_string(),
        y_label: "residual".to_string(),
        series: vec![Series::new("residuals", x.to_vec(), residuals.to_vec())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Box Plot for material 0"), "box-plot-for-material-0");
        assert_eq!(slug("  model1 (linear, V) "), "model1-linear-v");
        assert_eq!(slug("!!"), "figure");
    }

    #[test]
    fn test_histogram_counts() {
        let sample = [0.0, 0.5, 1.0, 1.5, 2.0, 9.9, 10.0];
        let figure = histogram("h", &sample, 10, "IR").unwrap();
        let counts = &figure.series[0].y;

        assert_eq!(counts.len(), 10);
        assert_eq!(counts.iter().sum::<f64>(), sample.len() as f64);
        assert_eq!(counts[0], 2.0);
        assert_eq!(counts[9], 2.0);
        assert!((figure.series[0].x[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_constant_sample() {
        let figure = histogram("h", &[3.0, 3.0, 3.0], 10, "IR").unwrap();
        assert_eq!(figure.series[0].y[0], 3.0);
        assert!(histogram("h", &[], 10, "IR").is_err());
    }

    #[test]
    fn test_normal_probability_positions() {
        let figure = normal_probability("n", &[4.0, 1.0, 3.0, 2.0], "IR").unwrap();
        let series = &figure.series[0];

        assert!((series.y[0] - 0.625 / 4.25).abs() < 1e-12);
        assert!((series.y[3] - 3.625 / 4.25).abs() < 1e-12);
        // Sorted and standardized
        assert!(series.x.windows(2).all(|w| w[0] < w[1]));
        assert!(series.x.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn test_box_plot_groups() {
        let figure = box_plot(
            "b",
            &[(0.0, vec![1.0, 2.0]), (1.0, vec![3.0, 4.0, 5.0])],
            "IR",
            "M",
        );
        assert_eq!(figure.kind, FigureKind::BoxPlot);
        assert_eq!(figure.series.len(), 2);
        assert_eq!(figure.series[1].x, vec![1.0, 1.0, 1.0]);
        assert_eq!(figure.series[0].label, "M = 0");
    }

    #[test]
    fn test_json_sink_writes_files() {
        let dir = tempdir().unwrap();
        let mut sink = JsonPlotSink::new(dir.path().join("plots")).unwrap();
        let figure = residual_scatter("Residues of model1", &[1.0, 2.0], &[0.1, -0.1], "V");

        sink.render(&figure).unwrap();
        assert_eq!(sink.written().len(), 1);

        let json = fs::read_to_string(&sink.written()[0]).unwrap();
        let loaded: Figure = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, figure);
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::default();
        let figure = regression_comparison("r", &[1.0], &[2.0], &[2.1], &[2.5], &[1.7], "V", "IR");
        sink.render(&figure).unwrap();
        assert_eq!(sink.figures.len(), 1);
        assert_eq!(sink.figures[0].series.len(), 4);
    }
}
