//! Analysis-of-variance table for a fitted model.
//!
//! Always computed on the original, untransformed data through the model's
//! own predictor, so Power and Exponential fits are judged on the scale the
//! measurements were taken in.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_paired, AnalysisError, Result};
use crate::model::FittedModel;
use crate::statistics::mean;

/// One row of the table; absent cells are `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceRow {
    pub source: String,
    pub sum_of_squares: f64,
    pub degrees_of_freedom: usize,
    pub mean_square: Option<f64>,
    pub f0: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceTable {
    pub ssr: f64,
    pub sse: f64,
    pub df_regression: usize,
    pub df_residual: usize,
    pub df_total: usize,
    pub msr: f64,
    pub mse: f64,
    pub f0: f64,
}

impl VarianceTable {
    pub const HEADER: [&'static str; 5] = [
        "source of variation",
        "sum of squares",
        "degrees of freedom",
        "mean square",
        "F_0",
    ];

    /// Decompose the variation of `y` around the model's predictions
    pub fn build(model: &FittedModel, y: &[f64], x: &[f64]) -> Result<Self> {
        ensure_paired(x, y)?;
        let n = x.len();
        if n <= 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "variance table needs more than 2 points, got {}",
                n
            )));
        }

        let predict = model.model(model.column())?;
        let predicted: Vec<f64> = x.iter().map(|&xi| predict(xi)).collect();
        let y_mean = mean(y);

        let sse: f64 = y
            .iter()
            .zip(&predicted)
            .map(|(yi, pi)| (yi - pi).powi(2))
            .sum();
        let ssr: f64 = predicted.iter().map(|pi| (pi - y_mean).powi(2)).sum();

        let df_residual = n - 2;
        let msr = ssr / 1.0;
        let mse = sse / df_residual as f64;

        Ok(Self {
            ssr,
            sse,
            df_regression: 1,
            df_residual,
            df_total: n - 1,
            msr,
            mse,
            f0: msr / mse,
        })
    }

    /// `SSR + SSE`, reported on the total row
    pub fn total_sum_of_squares(&self) -> f64 {
        self.ssr + self.sse
    }

    /// Regression, residual and total rows in export order
    pub fn rows(&self) -> [VarianceRow; 3] {
        [
            VarianceRow {
                source: "regression".to_string(),
                sum_of_squares: self.ssr,
                degrees_of_freedom: self.df_regression,
                mean_square: Some(self.msr),
                f0: Some(self.f0),
            },
            VarianceRow {
                source: "residual".to_string(),
                sum_of_squares: self.sse,
                degrees_of_freedom: self.df_residual,
                mean_square: Some(self.mse),
                f0: None,
            },
            VarianceRow {
                source: "total".to_string(),
                sum_of_squares: self.total_sum_of_squares(),
                degrees_of_freedom: self.df_total,
                mean_square: None,
                f0: None,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelFamily;

    fn fitted(family: ModelFamily, x: &[f64], y: &[f64]) -> FittedModel {
        let mut model = FittedModel::new("m", family, "V");
        model.initiate(x, y).unwrap();
        model
    }

    #[test]
    fn test_exact_line_has_unbounded_f0() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let table = VarianceTable::build(&fitted(ModelFamily::Linear, &x, &y), &y, &x).unwrap();

        assert!(table.sse < 1e-20);
        assert!((table.ssr - 40.0).abs() < 1e-9);
        assert!(table.f0.is_infinite() || table.f0 > 1e12);
    }

    #[test]
    fn test_linear_decomposition() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let y = [3.1, 4.8, 7.2, 8.9, 11.3, 12.7, 15.2];
        let model = fitted(ModelFamily::Linear, &x, &y);
        let table = VarianceTable::build(&model, &y, &x).unwrap();

        let y_mean = mean(&y);
        let total: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
        assert!((table.total_sum_of_squares() - total).abs() < 1e-9);
        assert_eq!(table.df_regression + table.df_residual, table.df_total);
        assert_eq!(table.df_residual, 5);

        // Matches the closed-form SSR of the underlying regression
        let params = model.parameters().unwrap();
        assert!((table.ssr - params.ssr).abs() < 1e-9);
        assert!((table.f0 - table.msr / table.mse).abs() < 1e-9);
    }

    #[test]
    fn test_uses_original_scale_for_transformed_models() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [2.5, 3.9, 5.1, 7.4, 9.9, 13.8];
        let model = fitted(ModelFamily::Exponential, &x, &y);
        let table = VarianceTable::build(&model, &y, &x).unwrap();

        let predict = model.model("V").unwrap();
        let sse: f64 = x.iter().zip(&y).map(|(a, b)| (b - predict(*a)).powi(2)).sum();
        assert!((table.sse - sse).abs() < 1e-12);
        // The log-space SSE lives on a different scale
        assert!((table.sse - model.parameters().unwrap().sse).abs() > 1e-6);
    }

    #[test]
    fn test_rows_layout() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 2.2, 2.8, 4.1];
        let table = VarianceTable::build(&fitted(ModelFamily::Linear, &x, &y), &y, &x).unwrap();
        let rows = table.rows();

        assert_eq!(rows[0].source, "regression");
        assert_eq!(rows[0].degrees_of_freedom, 1);
        assert!(rows[0].f0.is_some());
        assert_eq!(rows[1].degrees_of_freedom, 2);
        assert!(rows[1].f0.is_none());
        assert_eq!(rows[2].degrees_of_freedom, 3);
        assert!(rows[2].mean_square.is_none());
    }

    #[test]
    fn test_requires_initiated_model() {
        let model = FittedModel::new("m", ModelFamily::Linear, "V");
        let err = VarianceTable::build(&model, &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::NotInitiated(_)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 2.2, 2.8, 4.1];
        let model = fitted(ModelFamily::Linear, &x, &y);
        assert!(matches!(
            VarianceTable::build(&model, &y[..3], &x),
            Err(AnalysisError::DimensionMismatch { .. })
        ));
    }
}
