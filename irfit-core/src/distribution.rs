//! Distribution lookups consumed by the regression and hypothesis layers.
//!
//! The core never evaluates a CDF itself; it asks a [`DistributionProvider`]
//! for quantiles and tail probabilities. [`StatrsProvider`] is the default
//! implementation backed by the `statrs` crate.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::error::{AnalysisError, Result};

/// Capability interface for the distribution functions the core needs
pub trait DistributionProvider {
    /// Inverse CDF of Student's t with `df` degrees of freedom
    fn student_t_quantile(&self, p: f64, df: f64) -> Result<f64>;

    /// CDF of the F distribution with (`df1`, `df2`) degrees of freedom
    fn fisher_f_cdf(&self, value: f64, df1: f64, df2: f64) -> Result<f64>;

    /// Inverse CDF of the standard normal distribution
    fn normal_quantile(&self, p: f64) -> Result<f64>;

    /// CDF of the standard normal distribution
    fn normal_cdf(&self, z: f64) -> Result<f64>;
}

/// `statrs`-backed provider
#[derive(Debug, Clone, Copy, Default)]
pub struct StatrsProvider;

fn distribution_error<E: std::fmt::Display>(e: E) -> AnalysisError {
    AnalysisError::Distribution(e.to_string())
}

fn check_probability(p: f64) -> Result<()> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "probability must lie in (0, 1), got {}",
            p
        )));
    }
    Ok(())
}

impl DistributionProvider for StatrsProvider {
    fn student_t_quantile(&self, p: f64, df: f64) -> Result<f64> {
        check_probability(p)?;
        let dist = StudentsT::new(0.0, 1.0, df).map_err(distribution_error)?;
        Ok(dist.inverse_cdf(p))
    }

    fn fisher_f_cdf(&self, value: f64, df1: f64, df2: f64) -> Result<f64> {
        let dist = FisherSnedecor::new(df1, df2).map_err(distribution_error)?;
        Ok(dist.cdf(value))
    }

    fn normal_quantile(&self, p: f64) -> Result<f64> {
        check_probability(p)?;
        let dist = Normal::new(0.0, 1.0).map_err(distribution_error)?;
        Ok(dist.inverse_cdf(p))
    }

    fn normal_cdf(&self, z: f64) -> Result<f64> {
        let dist = Normal::new(0.0, 1.0).map_err(distribution_error)?;
        Ok(dist.cdf(z))
    }
}

/// Two-sided critical value `t(1 - alpha/2; df)`
pub fn two_sided_t_critical<D: DistributionProvider + ?Sized>(
    provider: &D,
    alpha: f64,
    df: f64,
) -> Result<f64> {
    check_probability(alpha)?;
    provider.student_t_quantile(1.0 - alpha / 2.0, df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_t_critical_values() {
        let provider = StatrsProvider;
        // Textbook table values
        let t3 = two_sided_t_critical(&provider, 0.05, 3.0).unwrap();
        assert!((t3 - 3.182).abs() < 1e-3);

        let t10 = two_sided_t_critical(&provider, 0.05, 10.0).unwrap();
        assert!((t10 - 2.228).abs() < 1e-3);
    }

    #[test]
    fn test_normal_quantile_and_cdf() {
        let provider = StatrsProvider;
        let z = provider.normal_quantile(0.975).unwrap();
        assert!((z - 1.959964).abs() < 1e-5);

        let p = provider.normal_cdf(0.0).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_fisher_f_cdf() {
        let provider = StatrsProvider;
        // F(1, 10) critical value at 95% is ~4.965
        let p = provider.fisher_f_cdf(4.965, 1.0, 10.0).unwrap();
        assert!((p - 0.95).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_probability() {
        let provider = StatrsProvider;
        assert!(matches!(
            provider.student_t_quantile(1.5, 4.0),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(two_sided_t_critical(&provider, 0.0, 4.0).is_err());
    }

    #[test]
    fn test_invalid_degrees_of_freedom() {
        let provider = StatrsProvider;
        assert!(matches!(
            provider.student_t_quantile(0.975, -1.0),
            Err(AnalysisError::Distribution(_))
        ));
    }
}
