//! Tabular batches and CSV loading.

use crate::error::MlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Tokens read as a missing cell, compared case-insensitively.
const MISSING_TOKENS: &[&str] = &["", "na", "nan", "null", "none"];

static MISSING: Value = Value::Null;

/// A batch of data rows. `Null` cells are missing values, `Number` cells are
/// numeric and `String` cells are categorical text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub total_rows: usize,
}

impl DataBatch {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let total_rows = rows.len();
        Self {
            columns,
            rows,
            total_rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, in row order.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).unwrap_or(&MISSING)))
    }

    /// Remove the named columns; names not present are ignored.
    pub fn drop_columns(&mut self, names: &[String]) {
        for name in names {
            if let Some(idx) = self.column_index(name) {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    if idx < row.len() {
                        row.remove(idx);
                    }
                }
            }
        }
    }

    /// Remove a column and return its cells.
    pub fn take_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        Some(
            self.rows
                .iter_mut()
                .map(|row| {
                    if idx < row.len() {
                        row.remove(idx)
                    } else {
                        Value::Null
                    }
                })
                .collect(),
        )
    }
}

/// Numeric view of a cell. Missing cells and text yield `None`.
pub fn cell_as_f64(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Build a numeric cell; non-finite values become missing.
pub fn number_cell(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Information about a data source for lineage in the training report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    pub source_type: String,
    pub location: String,
    pub accessed_at: chrono::DateTime<chrono::Utc>,
    pub row_count: Option<usize>,
}

/// Trait for loading a tabular batch from a source.
pub trait DataSource: Send + Sync {
    /// Load data from this source, optionally limiting the number of rows.
    fn load(&self, limit: Option<usize>) -> Result<DataBatch, MlError>;

    /// Return metadata about this source.
    fn source_info(&self) -> DataSourceInfo;
}

// ---------------------------------------------------------------------------
// CsvSource
// ---------------------------------------------------------------------------

/// CSV file data source. Columns named in `numeric_columns` are parsed as
/// `f64`; every other column is kept as trimmed text.
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
    pub numeric_columns: BTreeSet<String>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            numeric_columns: BTreeSet::new(),
        }
    }

    pub fn with_numeric_columns<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.numeric_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    fn parse_cell(&self, raw: &str, column: &str, line: u64) -> Result<Value, MlError> {
        let trimmed = raw.trim();
        if MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
        {
            return Ok(Value::Null);
        }
        if !self.numeric_columns.contains(column) {
            return Ok(Value::String(trimmed.to_string()));
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(number_cell(v)),
            Ok(_) => Err(MlError::data_load(format!(
                "{}: line {line}, column '{column}': non-finite value '{trimmed}'",
                self.path.display()
            ))),
            Err(e) => Err(MlError::data_load_with(
                format!(
                    "{}: line {line}, column '{column}': '{trimmed}' is not a number",
                    self.path.display()
                ),
                e,
            )),
        }
    }
}

impl DataSource for CsvSource {
    fn load(&self, limit: Option<usize>) -> Result<DataBatch, MlError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|e| {
                MlError::data_load_with(format!("failed to open {}", self.path.display()), e)
            })?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| {
                MlError::data_load_with(
                    format!("failed to read CSV header of {}", self.path.display()),
                    e,
                )
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if columns.is_empty() || columns.iter().all(String::is_empty) {
            return Err(MlError::data_load(format!(
                "{} has no header row",
                self.path.display()
            )));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            if let Some(max) = limit {
                if rows.len() >= max {
                    break;
                }
            }
            let record = record.map_err(|e| {
                MlError::data_load_with(
                    format!("failed to read CSV row in {}", self.path.display()),
                    e,
                )
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let row = columns
                .iter()
                .enumerate()
                .map(|(i, column)| self.parse_cell(record.get(i).unwrap_or(""), column, line))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }

        tracing::debug!(
            path = %self.path.display(),
            rows = rows.len(),
            columns = columns.len(),
            "Loaded CSV"
        );
        Ok(DataBatch::new(columns, rows))
    }

    fn source_info(&self) -> DataSourceInfo {
        DataSourceInfo {
            source_type: "csv".to_string(),
            location: self.path.display().to_string(),
            accessed_at: chrono::Utc::now(),
            row_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_drop_column() {
        let mut batch = DataBatch::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![json!(1), json!(2), json!(3)]],
        );
        batch.drop_columns(&["b".to_string(), "zzz".to_string()]);
        assert_eq!(batch.columns, vec!["a", "c"]);
        assert_eq!(batch.rows[0], vec![json!(1), json!(3)]);
    }

    #[test]
    fn test_take_column() {
        let mut batch = DataBatch::new(
            vec!["x".into(), "yield".into()],
            vec![vec![json!(1), json!(2.5)], vec![json!(3), Value::Null]],
        );
        let target = batch.take_column("yield").unwrap();
        assert_eq!(target, vec![json!(2.5), Value::Null]);
        assert_eq!(batch.columns, vec!["x"]);
        assert_eq!(batch.rows, vec![vec![json!(1)], vec![json!(3)]]);
        assert!(batch.take_column("yield").is_none());
    }

    #[test]
    fn test_csv_parses_numeric_and_text() {
        let file = write_csv(
            "State_Name,Area,Season\nAssam,12.5,Kharif     \nBihar,,Rabi\nGoa,NaN,\n",
        );
        let batch = CsvSource::new(file.path())
            .with_numeric_columns(["Area"])
            .load(None)
            .unwrap();

        assert_eq!(batch.columns, vec!["State_Name", "Area", "Season"]);
        assert_eq!(batch.row_count(), 3);
        assert_eq!(batch.rows[0], vec![json!("Assam"), json!(12.5), json!("Kharif")]);
        assert_eq!(batch.rows[1][1], Value::Null);
        assert_eq!(batch.rows[2][1], Value::Null);
        assert_eq!(batch.rows[2][2], Value::Null);
    }

    #[test]
    fn test_csv_rejects_bad_number() {
        let file = write_csv("Area\n1.0\nlarge\n");
        let err = CsvSource::new(file.path())
            .with_numeric_columns(["Area"])
            .load(None)
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, MlError::DataLoad { .. }));
        assert!(msg.contains("Area"), "{msg}");
        assert!(msg.contains("large"), "{msg}");
    }

    #[test]
    fn test_csv_missing_file() {
        let err = CsvSource::new("/nonexistent/train.csv")
            .load(None)
            .unwrap_err();
        assert!(matches!(err, MlError::DataLoad { .. }));
    }

    #[test]
    fn test_csv_limit() {
        let file = write_csv("a\n1\n2\n3\n");
        let batch = CsvSource::new(file.path()).load(Some(2)).unwrap();
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.rows[0], vec![json!("1")]);
    }
}
