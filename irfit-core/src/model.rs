//! Linearizable model families built on top of [`RegressionParameters`].
//!
//! Each [`ModelFamily`] linearizes the raw data with a forward transform, fits
//! it by least squares, then maps the fitted intercept/slope back into the
//! coefficients of its own equation:
//!
//! | Family      | Fitted on              | Equation              |
//! |-------------|------------------------|-----------------------|
//! | Linear      | (X, Y)                 | `Y = b0 + b1 * X`     |
//! | Power       | (ln\|X\|, ln\|Y\|)     | `Y = b0 * X^b1`       |
//! | Exponential | (X, ln\|Y\|)           | `Y = b0 * e^(b1 * X)` |

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distribution::{DistributionProvider, StatrsProvider};
use crate::error::{ensure_paired, AnalysisError, Result};
use crate::regression::{RegressionParameters, DEFAULT_ALPHA};

/// The three supported model shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Linear,
    Power,
    Exponential,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Linear,
        ModelFamily::Power,
        ModelFamily::Exponential,
    ];

    /// Apply the forward transform to a paired sample
    pub fn linearize(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        match self {
            ModelFamily::Linear => Ok((x.to_vec(), y.to_vec())),
            ModelFamily::Power => Ok((ln_positive("X", x)?, ln_abs("Y", y)?)),
            ModelFamily::Exponential => Ok((x.to_vec(), ln_abs("Y", y)?)),
        }
    }

    /// Recover `beta0` from the fitted intercept
    fn recover_beta0(&self, intercept: f64) -> f64 {
        match self {
            ModelFamily::Linear => intercept,
            ModelFamily::Power | ModelFamily::Exponential => intercept.exp(),
        }
    }

    /// Interval around a recovered `beta0`
    ///
    /// Power's `beta0` went through an exponential, so its interval scales
    /// multiplicatively; the others are additive.
    fn beta0_interval(&self, beta0: f64, half_width: f64) -> Interval {
        match self {
            ModelFamily::Power => Interval {
                lower: beta0 / half_width,
                upper: beta0 * half_width,
            },
            ModelFamily::Linear | ModelFamily::Exponential => Interval::around(beta0, half_width),
        }
    }

    fn evaluate(&self, beta0: f64, beta1: f64, x: f64) -> f64 {
        match self {
            ModelFamily::Linear => beta0 + beta1 * x,
            ModelFamily::Power => beta0 * x.powf(beta1),
            ModelFamily::Exponential => beta0 * (beta1 * x).exp(),
        }
    }

    /// Human-readable equation
    pub fn equation(&self) -> &'static str {
        match self {
            ModelFamily::Linear => "Y = b0 + b1*X",
            ModelFamily::Power => "Y = b0 * X^b1",
            ModelFamily::Exponential => "Y = b0 * e^(b1*X)",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::Linear => "linear",
            ModelFamily::Power => "power",
            ModelFamily::Exponential => "exponential",
        };
        f.write_str(name)
    }
}

fn ln_abs(name: &str, values: &[f64]) -> Result<Vec<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if *v == 0.0 {
                Err(AnalysisError::InvalidInput(format!(
                    "{} has a zero at index {}, logarithm undefined",
                    name, i
                )))
            } else {
                Ok(v.abs().ln())
            }
        })
        .collect()
}

/// Power's predictor raises X to a real exponent, so X must be positive
fn ln_positive(name: &str, values: &[f64]) -> Result<Vec<f64>> {
    if let Some(i) = values.iter().position(|v| *v <= 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "{} has a non-positive value {} at index {}, power model undefined",
            name, values[i], i
        )));
    }
    Ok(values.iter().map(|v| v.ln()).collect())
}

/// Closed interval `[lower, upper]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn around(center: f64, half_width: f64) -> Self {
        Self {
            lower: center - half_width,
            upper: center + half_width,
        }
    }

    /// `(upper - lower) / 2`, the ± value reported in exports
    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

/// Coefficients of a fitted model in its own equation, with their intervals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub beta0: f64,
    pub beta1: f64,
    pub beta0_interval: Interval,
    pub beta1_interval: Interval,
}

/// One exported coefficient row: `beta0, beta1, beta0 ±, beta1 ±`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRow {
    pub beta0: f64,
    pub beta1: f64,
    pub beta0_interval: f64,
    pub beta1_interval: f64,
}

impl CoefficientRow {
    pub const HEADER: [&'static str; 4] = [
        "beta0",
        "beta1",
        "beta0 interval (+/-)",
        "beta1 interval (+/-)",
    ];

    pub fn values(&self) -> [f64; 4] {
        [
            self.beta0,
            self.beta1,
            self.beta0_interval,
            self.beta1_interval,
        ]
    }
}

#[derive(Debug, Clone)]
struct Fit {
    parameters: RegressionParameters,
    coefficients: Coefficients,
}

/// A model of one family bound to one predictor column
///
/// Created empty; [`FittedModel::initiate`] fits it and may be called again to
/// refit from scratch.
#[derive(Debug, Clone)]
pub struct FittedModel {
    name: String,
    family: ModelFamily,
    column: String,
    alpha: f64,
    fit: Option<Fit>,
}

impl FittedModel {
    pub fn new(name: impl Into<String>, family: ModelFamily, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family,
            column: column.into(),
            alpha: DEFAULT_ALPHA,
            fit: None,
        }
    }

    /// Use a different significance level for coefficient intervals
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Predictor column this model is bound to
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_initiated(&self) -> bool {
        self.fit.is_some()
    }

    /// Transform, fit and recover coefficients, replacing any previous fit
    pub fn initiate(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        self.initiate_with(x, y, &StatrsProvider)
    }

    pub fn initiate_with<D: DistributionProvider + ?Sized>(
        &mut self,
        x: &[f64],
        y: &[f64],
        provider: &D,
    ) -> Result<()> {
        self.fit = None;
        ensure_paired(x, y)?;

        let (tx, ty) = self.family.linearize(x, y)?;
        let parameters = RegressionParameters::evaluate_with(&tx, &ty, self.alpha, provider)?;

        let beta0 = self.family.recover_beta0(parameters.beta0);
        let beta1 = parameters.beta1;
        let coefficients = Coefficients {
            beta0,
            beta1,
            beta0_interval: self.family.beta0_interval(beta0, parameters.beta0_half_width),
            beta1_interval: Interval::around(beta1, parameters.beta1_half_width),
        };

        debug!(
            model = %self.name,
            family = %self.family,
            column = %self.column,
            beta0,
            beta1,
            "model initiated"
        );

        self.fit = Some(Fit {
            parameters,
            coefficients,
        });
        Ok(())
    }

    fn fitted(&self) -> Result<&Fit> {
        self.fit
            .as_ref()
            .ok_or_else(|| AnalysisError::NotInitiated(self.name.clone()))
    }

    /// Regression record of the (possibly transformed) fit
    pub fn parameters(&self) -> Result<&RegressionParameters> {
        Ok(&self.fitted()?.parameters)
    }

    pub fn coefficients(&self) -> Result<Coefficients> {
        Ok(self.fitted()?.coefficients)
    }

    /// Point predictor, checked against the column it is applied to
    pub fn model(&self, column: &str) -> Result<impl Fn(f64) -> f64> {
        if column != self.column {
            return Err(AnalysisError::ColumnMismatch {
                expected: self.column.clone(),
                actual: column.to_string(),
            });
        }
        let c = self.fitted()?.coefficients;
        let family = self.family;
        Ok(move |x: f64| family.evaluate(c.beta0, c.beta1, x))
    }

    /// Predictor built from the upper ends of both coefficient intervals
    pub fn upper_bound_model(&self) -> Result<impl Fn(f64) -> f64> {
        let c = self.fitted()?.coefficients;
        let family = self.family;
        Ok(move |x: f64| family.evaluate(c.beta0_interval.upper, c.beta1_interval.upper, x))
    }

    /// Predictor built from the lower ends of both coefficient intervals
    pub fn lower_bound_model(&self) -> Result<impl Fn(f64) -> f64> {
        let c = self.fitted()?.coefficients;
        let family = self.family;
        Ok(move |x: f64| family.evaluate(c.beta0_interval.lower, c.beta1_interval.lower, x))
    }

    /// Whether `lower(x) <= model(x) <= upper(x)` holds at `x`
    ///
    /// Not guaranteed algebraically: Power's multiplicative `beta0` bound
    /// inverts when the half-width is below one, and additive bounds invert
    /// for negative `x`.
    pub fn bounds_bracket(&self, x: f64) -> Result<bool> {
        let predict = self.model(&self.column)?;
        let upper = self.upper_bound_model()?;
        let lower = self.lower_bound_model()?;
        let y = predict(x);
        Ok(lower(x) <= y && y <= upper(x))
    }

    /// Coefficient row for export
    pub fn export_row(&self) -> Result<CoefficientRow> {
        let c = self.fitted()?.coefficients;
        Ok(CoefficientRow {
            beta0: c.beta0,
            beta1: c.beta1,
            beta0_interval: c.beta0_interval.half_width(),
            beta1_interval: c.beta1_interval.half_width(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs() -> Vec<f64> {
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    }

    #[test]
    fn test_linear_recovers_exact_line() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let mut model = FittedModel::new("model1", ModelFamily::Linear, "V");
        model.initiate(&x, &y).unwrap();

        let c = model.coefficients().unwrap();
        assert!(c.beta0.abs() < 1e-12);
        assert!((c.beta1 - 2.0).abs() < 1e-12);

        let predict = model.model("V").unwrap();
        assert!((predict(7.0) - 14.0).abs() < 1e-9);

        let row = model.export_row().unwrap();
        assert!(row.beta0_interval.abs() < 1e-9);
        assert!(row.beta1_interval.abs() < 1e-9);
    }

    #[test]
    fn test_power_round_trip() {
        let x = xs();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v.powf(1.5)).collect();
        let mut model = FittedModel::new("model2", ModelFamily::Power, "V");
        model.initiate(&x, &y).unwrap();

        let c = model.coefficients().unwrap();
        assert!((c.beta0 - 3.0).abs() < 1e-9);
        assert!((c.beta1 - 1.5).abs() < 1e-9);

        let predict = model.model("V").unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((predict(*xi) - yi).abs() < 1e-8);
        }
    }

    #[test]
    fn test_exponential_round_trip() {
        let x = xs();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * (0.3 * v).exp()).collect();
        let mut model = FittedModel::new("model3", ModelFamily::Exponential, "T");
        model.initiate(&x, &y).unwrap();

        let c = model.coefficients().unwrap();
        assert!((c.beta0 - 2.0).abs() < 1e-9);
        assert!((c.beta1 - 0.3).abs() < 1e-9);

        let predict = model.model("T").unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((predict(*xi) - yi).abs() < 1e-8);
        }
    }

    #[test]
    fn test_model_before_initiate() {
        let model = FittedModel::new("model1", ModelFamily::Linear, "V");
        assert!(!model.is_initiated());
        assert!(matches!(model.model("V"), Err(AnalysisError::NotInitiated(_))));
        assert!(matches!(
            model.upper_bound_model(),
            Err(AnalysisError::NotInitiated(_))
        ));
        assert!(matches!(model.export_row(), Err(AnalysisError::NotInitiated(_))));
    }

    #[test]
    fn test_column_mismatch() {
        let mut model = FittedModel::new("model4", ModelFamily::Linear, "T");
        model.initiate(&xs(), &[1.0, 2.1, 2.9, 4.2, 5.0, 5.9]).unwrap();

        match model.model("V") {
            Err(AnalysisError::ColumnMismatch { expected, actual }) => {
                assert_eq!(expected, "T");
                assert_eq!(actual, "V");
            }
            other => panic!("expected ColumnMismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_initiate_overwrites_previous_fit() {
        let x = xs();
        let mut model = FittedModel::new("model1", ModelFamily::Linear, "V");
        model
            .initiate(&x, &x.iter().map(|v| 1.0 + v).collect::<Vec<_>>())
            .unwrap();
        model
            .initiate(&x, &x.iter().map(|v| 5.0 - 2.0 * v).collect::<Vec<_>>())
            .unwrap();

        let c = model.coefficients().unwrap();
        assert!((c.beta0 - 5.0).abs() < 1e-9);
        assert!((c.beta1 + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_initiate_clears_fit() {
        let mut model = FittedModel::new("model2", ModelFamily::Power, "V");
        model.initiate(&xs(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.5]).unwrap();

        let err = model
            .initiate(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert!(!model.is_initiated());
    }

    #[test]
    fn test_linear_bounds_bracket_prediction() {
        let x = xs();
        let y = vec![1.1, 2.3, 2.8, 4.4, 4.9, 6.2];
        let mut model = FittedModel::new("model1", ModelFamily::Linear, "V");
        model.initiate(&x, &y).unwrap();

        for xi in &x {
            assert!(model.bounds_bracket(*xi).unwrap());
        }
    }

    #[test]
    fn test_exponential_bounds_are_additive() {
        let x = xs();
        let y = vec![2.6, 3.7, 4.8, 6.9, 8.7, 12.4];
        let mut model = FittedModel::new("model3", ModelFamily::Exponential, "V");
        model.initiate(&x, &y).unwrap();

        let params = *model.parameters().unwrap();
        let c = model.coefficients().unwrap();
        assert!((c.beta0_interval.half_width() - params.beta0_half_width).abs() < 1e-12);
        assert!((c.beta1_interval.half_width() - params.beta1_half_width).abs() < 1e-12);

        for xi in &x {
            assert!(model.bounds_bracket(*xi).unwrap());
        }
    }

    #[test]
    fn test_power_rejects_negative_x() {
        let x = [-1.0, -2.0, -3.0, -4.0];
        let y: Vec<f64> = x.iter().map(|v: &f64| 2.0 * v.abs().powf(1.5)).collect();
        let mut model = FittedModel::new("model2", ModelFamily::Power, "V");

        let err = model.initiate(&x, &y).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert!(!model.is_initiated());

        // Negative Y is still fitted through ln|Y|
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v: &f64| -2.0 * v.powf(1.5)).collect();
        model.initiate(&x, &y).unwrap();
        assert!((model.coefficients().unwrap().beta1 - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_power_beta0_interval_is_multiplicative() {
        let x = xs();
        let y = vec![2.9, 8.8, 15.1, 24.6, 33.0, 44.9];
        let mut model = FittedModel::new("model2", ModelFamily::Power, "V");
        model.initiate(&x, &y).unwrap();

        let params = *model.parameters().unwrap();
        let c = model.coefficients().unwrap();
        let h0 = params.beta0_half_width;
        assert!((c.beta0_interval.lower - c.beta0 / h0).abs() < 1e-12);
        assert!((c.beta0_interval.upper - c.beta0 * h0).abs() < 1e-12);
        assert!((c.beta1_interval.lower - (c.beta1 - params.beta1_half_width)).abs() < 1e-12);

        // When h0 < 1 the multiplicative bound swaps sides, which the
        // explicit check reports instead of hiding
        if h0 < 1.0 {
            assert!(!model.bounds_bracket(1.0).unwrap());
        }
    }

    #[test]
    fn test_dimension_mismatch_propagates() {
        let mut model = FittedModel::new("model1", ModelFamily::Linear, "V");
        assert!(matches!(
            model.initiate(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 2.0, 3.0, 4.0]),
            Err(AnalysisError::DimensionMismatch { .. })
        ));
    }
}
