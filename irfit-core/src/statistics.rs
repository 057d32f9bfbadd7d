//! Descriptive statistics for a single sample
//!
//! This module provides the summary used for reporting (mean, spread,
//! quartiles, confidence interval) and the mean/variance helpers reused by the
//! regression and hypothesis layers.

use serde::{Deserialize, Serialize};

use crate::distribution::{DistributionProvider, StatrsProvider};
use crate::error::{ensure_finite, AnalysisError, Result};

/// z-score for a two-sided 95% confidence level
pub const Z_95: f64 = 1.96;

/// Calculate the arithmetic mean of a slice of values
///
/// Returns 0.0 for an empty slice; callers validate the length first.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the sample variance (n - 1 divisor) of a slice of values
///
/// Returns 0.0 for fewer than two values; callers validate the length first.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let m = mean(values);
    values.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Calculate the sample standard deviation of a slice of values
pub(crate) fn standard_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Summary of one sample, produced by [`DescriptiveStats::analyze`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Half-width of the confidence interval around the mean
    pub confidence_interval: f64,
    /// Confidence level the half-width was computed for (0.95 = 95%)
    pub confidence_level: f64,
}

impl DescriptiveStats {
    /// Analyze a sample with the fixed 95% z-score of 1.96
    ///
    /// Quartiles use a fixed index scheme rather than interpolated quantiles,
    /// see [`quartiles`].
    pub fn analyze(sample: &[f64]) -> Result<Self> {
        Self::summarize(sample, Z_95, 0.95)
    }

    /// Analyze a sample with the normal critical value `z(1 - alpha/2)`
    pub fn analyze_at(sample: &[f64], alpha: f64) -> Result<Self> {
        Self::analyze_at_with(sample, alpha, &StatrsProvider)
    }

    pub fn analyze_at_with<D: DistributionProvider + ?Sized>(
        sample: &[f64],
        alpha: f64,
        provider: &D,
    ) -> Result<Self> {
        let z = provider.normal_quantile(1.0 - alpha / 2.0)?;
        Self::summarize(sample, z, 1.0 - alpha)
    }

    fn summarize(sample: &[f64], z: f64, confidence_level: f64) -> Result<Self> {
        if sample.len() < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "descriptive statistics need at least 2 values, got {}",
                sample.len()
            )));
        }
        ensure_finite("sample", sample)?;

        let n = sample.len() as f64;
        let mean = mean(sample);
        let variance = variance(sample);
        let std_dev = variance.sqrt();
        let (q1, median, q3) = quartiles(sample);

        Ok(Self {
            count: sample.len(),
            mean,
            variance,
            std_dev,
            q1,
            median,
            q3,
            confidence_interval: z * (std_dev / n.sqrt()),
            confidence_level,
        })
    }

    /// Lower and upper ends of the confidence interval around the mean
    pub fn confidence_bounds(&self) -> (f64, f64) {
        (
            self.mean - self.confidence_interval,
            self.mean + self.confidence_interval,
        )
    }

    /// Interquartile range
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Q1, median and Q3 of a sample using floor-divided indices
///
/// For even `n` each value averages the elements at `k - 1` and `k`
/// (`k` = `n/4`, `n/2`, `3n/4`); for odd `n` it is the element at `k`.
/// An index of -1 (only when `n == 2`) wraps to the last element.
pub fn quartiles(sample: &[f64]) -> (f64, f64, f64) {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let at = |k: usize| -> f64 {
        if n % 2 == 0 {
            let below = if k == 0 { n - 1 } else { k - 1 };
            (sorted[below] + sorted[k]) / 2.0
        } else {
            sorted[k]
        }
    };

    (at(n / 4), at(n / 2), at((3 * n) / 4))
}
