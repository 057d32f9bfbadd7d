//! Error taxonomy shared by every analysis stage.
//!
//! None of these are recovered from locally; callers propagate them with `?`.

use thiserror::Error;

/// Errors raised while loading data, fitting models or exporting results
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Dimension mismatch: X has {x_len} values but Y has {y_len}")]
    DimensionMismatch { x_len: usize, y_len: usize },

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model {0} queried before initiate() was called")]
    NotInitiated(String),

    #[error("Column mismatch: model is bound to '{expected}', got '{actual}'")]
    ColumnMismatch { expected: String, actual: String },

    #[error("Column '{0}' not found in dataset")]
    MissingColumn(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Fail with `DimensionMismatch` unless both samples have the same length
pub(crate) fn ensure_paired(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::DimensionMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }
    Ok(())
}

/// Fail with `InvalidInput` if any value is NaN or infinite
pub(crate) fn ensure_finite(name: &str, values: &[f64]) -> Result<()> {
    if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "{} contains a non-finite value at index {}",
            name, idx
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_paired() {
        assert!(ensure_paired(&[1.0, 2.0], &[3.0, 4.0]).is_ok());

        let err = ensure_paired(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DimensionMismatch { x_len: 5, y_len: 4 }
        ));
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("x", &[1.0, -2.5]).is_ok());
        assert!(matches!(
            ensure_finite("x", &[1.0, f64::NAN]),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::ColumnMismatch {
            expected: "V".to_string(),
            actual: "T".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Column mismatch: model is bound to 'V', got 'T'"
        );
    }
}
