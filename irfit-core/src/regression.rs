//! Ordinary least-squares fit of `Y = beta0 + beta1 * X`.
//!
//! [`RegressionParameters::evaluate`] runs a fixed pipeline: sums of squares,
//! then coefficients, then squared errors, then confidence intervals. Each
//! stage reads the previous one (MSE needs both coefficients, the intervals
//! need MSE), so the stages are private and only the finished record escapes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distribution::{two_sided_t_critical, DistributionProvider, StatrsProvider};
use crate::error::{ensure_finite, ensure_paired, AnalysisError, Result};
use crate::statistics::mean;

/// Default significance level for coefficient intervals
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Least-squares coefficients, sums of squares and interval half-widths
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionParameters {
    pub n: usize,
    pub alpha: f64,
    pub beta0: f64,
    pub beta1: f64,
    /// Half-width of the `beta0` confidence interval
    pub beta0_half_width: f64,
    /// Half-width of the `beta1` confidence interval
    pub beta1_half_width: f64,
    pub sxx: f64,
    pub sxy: f64,
    pub syy: f64,
    pub sse: f64,
    pub ssr: f64,
    pub mse: f64,
    /// t critical value used for both intervals
    pub t_critical: f64,
}

struct SumsOfSquares {
    x_mean: f64,
    y_mean: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

impl RegressionParameters {
    /// Fit with the default `statrs` distribution provider
    pub fn evaluate(x: &[f64], y: &[f64], alpha: f64) -> Result<Self> {
        Self::evaluate_with(x, y, alpha, &StatrsProvider)
    }

    /// Fit, looking up the t critical value through `provider`
    pub fn evaluate_with<D: DistributionProvider + ?Sized>(
        x: &[f64],
        y: &[f64],
        alpha: f64,
        provider: &D,
    ) -> Result<Self> {
        ensure_paired(x, y)?;
        if x.len() <= 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "regression needs more than 2 points, got {}",
                x.len()
            )));
        }
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "significance level must lie in (0, 1), got {}",
                alpha
            )));
        }
        ensure_finite("X", x)?;
        ensure_finite("Y", y)?;

        let sums = sums_of_squares(x, y);
        let (beta0, beta1) = coefficients(x, &sums)?;
        let (ssr, sse, mse) = squared_errors(x, y, &sums, beta0, beta1);

        let n = x.len();
        let t_critical = two_sided_t_critical(provider, alpha, (n - 2) as f64)?;
        let beta0_half_width =
            t_critical * (mse * ((1.0 / n as f64) + (sums.x_mean * sums.x_mean / sums.sxx))).sqrt();
        let beta1_half_width = t_critical * (mse / sums.sxx).sqrt();

        debug!(n, beta0, beta1, sse, "least-squares fit complete");

        Ok(Self {
            n,
            alpha,
            beta0,
            beta1,
            beta0_half_width,
            beta1_half_width,
            sxx: sums.sxx,
            sxy: sums.sxy,
            syy: sums.syy,
            sse,
            ssr,
            mse,
            t_critical,
        })
    }

    /// Fitted value `beta0 + beta1 * x`
    pub fn predict(&self, x: f64) -> f64 {
        self.beta0 + self.beta1 * x
    }

    /// Coefficient of determination `SSR / SYY`
    pub fn r_squared(&self) -> f64 {
        if self.syy == 0.0 {
            return 1.0;
        }
        self.ssr / self.syy
    }
}

fn sums_of_squares(x: &[f64], y: &[f64]) -> SumsOfSquares {
    let x_mean = mean(x);
    let y_mean = mean(y);

    let sxx = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum();
    let syy = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
    let sxy = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum();

    SumsOfSquares {
        x_mean,
        y_mean,
        sxx,
        syy,
        sxy,
    }
}

fn coefficients(x: &[f64], sums: &SumsOfSquares) -> Result<(f64, f64)> {
    // Constant X leaves only the rounding error of the mean in SXX
    let constant = x.iter().all(|&xi| xi == x[0]);
    let rounding = x.len() as f64 * (f64::EPSILON * sums.x_mean.abs()).powi(2);
    if constant || sums.sxx <= rounding {
        return Err(AnalysisError::DegenerateInput(
            "X has zero variance (SXX = 0)".to_string(),
        ));
    }

    let beta1 = sums.sxy / sums.sxx;
    let beta0 = sums.y_mean - sums.x_mean * beta1;
    Ok((beta0, beta1))
}

fn squared_errors(
    x: &[f64],
    y: &[f64],
    sums: &SumsOfSquares,
    beta0: f64,
    beta1: f64,
) -> (f64, f64, f64) {
    let ssr = (sums.sxy * sums.sxy) / sums.sxx;
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (yi - (beta0 + beta1 * xi)).powi(2))
        .sum();
    let mse = sse / (x.len() - 2) as f64;
    (ssr, sse, mse)
}
