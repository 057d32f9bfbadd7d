//! Tabular input: comma-separated file with a header row and numeric cells.
//!
//! Class filtering and subsampling happen here, before any statistic is
//! computed.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::export::escape_field;

/// In-memory numeric table
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(AnalysisError::Parse {
                    line: i + 2,
                    message: format!("expected {} fields, found {}", headers.len(), row.len()),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    /// Load a CSV file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let dataset = Self::parse(&contents)?;
        debug!(
            path = %path.as_ref().display(),
            rows = dataset.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse CSV text; blank lines are skipped
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header_line) = lines.next().ok_or(AnalysisError::Parse {
            line: 1,
            message: "missing header row".to_string(),
        })?;
        let headers: Vec<String> = split_fields(header_line)
            .into_iter()
            .map(|field| field.to_string())
            .collect();

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let line_no = idx + 1;
            let row = split_fields(line)
                .into_iter()
                .map(|field| {
                    field.parse::<f64>().map_err(|_| AnalysisError::Parse {
                        line: line_no,
                        message: format!("'{}' is not a number", field),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            if row.len() != headers.len() {
                return Err(AnalysisError::Parse {
                    line: line_no,
                    message: format!("expected {} fields, found {}", headers.len(), row.len()),
                });
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Rows whose `column` equals `class`
    pub fn filter_class(&self, column: &str, class: f64) -> Result<Dataset> {
        let idx = self.column_index(column)?;
        let rows: Vec<Vec<f64>> = self
            .rows
            .iter()
            .filter(|row| row[idx] == class)
            .cloned()
            .collect();
        debug!(column, class, kept = rows.len(), "class filter applied");
        Ok(Dataset {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Distinct values of `column`, ascending
    pub fn classes(&self, column: &str) -> Result<Vec<f64>> {
        let mut values = self.column(column)?;
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        Ok(values)
    }

    /// `size` rows drawn without replacement, reproducible for a given `seed`
    pub fn sample(&self, size: usize, seed: u64) -> Result<Dataset> {
        if size > self.rows.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "cannot draw {} rows from a dataset of {}",
                size,
                self.rows.len()
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let rows = index::sample(&mut rng, self.rows.len(), size)
            .into_iter()
            .map(|i| self.rows[i].clone())
            .collect();
        Ok(Dataset {
            headers: self.headers.clone(),
            rows,
        })
    }

    /// Render as CSV with a header row
    pub fn to_csv_string(&self) -> String {
        let mut out = self
            .headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(",");
        out.push('\n');
        for row in &self.rows {
            let line = row
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_csv_string())?;
        Ok(())
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',')
        .map(|field| field.trim().trim_matches('"'))
        .collect()
}
