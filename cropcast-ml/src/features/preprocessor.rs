//! Column transformer combining the numerical and categorical pipelines into
//! one fit-once transformation from a raw batch to a dense feature matrix.

use super::categorical::CategoricalColumn;
use super::numeric::NumericColumn;
use crate::data::schema::FeatureSchema;
use crate::data::source::DataBatch;
use crate::error::MlError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Lifecycle of a [`Preprocessor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PreprocessorState {
    Unfit,
    Fitted(FittedColumns),
}

/// Per-column fitted state, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumns {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl FittedColumns {
    fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(CategoricalColumn::width)
                .sum::<usize>()
    }
}

/// Feature transformer: numeric block (median impute + standardize) followed
/// by one-hot blocks (most-frequent impute + encode + scale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    schema: FeatureSchema,
    state: PreprocessorState,
}

impl Preprocessor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            state: PreprocessorState::Unfit,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, PreprocessorState::Fitted(_))
    }

    fn fitted(&self) -> Result<&FittedColumns, MlError> {
        match &self.state {
            PreprocessorState::Fitted(columns) => Ok(columns),
            PreprocessorState::Unfit => Err(MlError::transformation(
                "transform called before the preprocessor was fit",
            )),
        }
    }

    /// Fit every column pipeline on `batch`. A preprocessor is fit exactly once.
    pub fn fit(&mut self, batch: &DataBatch) -> Result<(), MlError> {
        if self.is_fitted() {
            return Err(MlError::transformation("preprocessor is already fitted"));
        }
        self.schema.validate()?;
        self.require_columns(batch)?;
        if batch.row_count() == 0 {
            return Err(MlError::transformation(
                "cannot fit the preprocessor on an empty batch",
            ));
        }

        let numeric = self
            .schema
            .numerical
            .iter()
            .map(|name| NumericColumn::fit(name, &numeric_cells(batch, name)?))
            .collect::<Result<Vec<_>, _>>()?;
        let categorical = self
            .schema
            .categorical
            .iter()
            .map(|name| CategoricalColumn::fit(name, &categorical_cells(batch, name)?))
            .collect::<Result<Vec<_>, _>>()?;

        let fitted = FittedColumns {
            numeric,
            categorical,
        };
        tracing::info!(
            rows = batch.row_count(),
            numerical = fitted.numeric.len(),
            categorical = fitted.categorical.len(),
            features = fitted.width(),
            "Fitted preprocessor"
        );
        self.state = PreprocessorState::Fitted(fitted);
        Ok(())
    }

    /// Transform `batch` into a dense matrix. Columns outside the schema are
    /// ignored; declared columns must all be present.
    pub fn transform(&self, batch: &DataBatch) -> Result<Array2<f64>, MlError> {
        let fitted = self.fitted()?;
        self.require_columns(batch)?;

        let mut out = Array2::<f64>::zeros((batch.row_count(), fitted.width()));

        for (j, column) in fitted.numeric.iter().enumerate() {
            for (i, cell) in numeric_cells(batch, &column.name)?.into_iter().enumerate() {
                out[[i, j]] = column.transform(cell);
            }
        }

        let mut offset = fitted.numeric.len();
        for column in &fitted.categorical {
            for (i, cell) in categorical_cells(batch, &column.name)?
                .into_iter()
                .enumerate()
            {
                if let Some((k, value)) = column.encode(cell.as_deref()) {
                    out[[i, offset + k]] = value;
                }
            }
            offset += column.width();
        }

        Ok(out)
    }

    /// Fit on `batch` and transform it.
    pub fn fit_transform(&mut self, batch: &DataBatch) -> Result<Array2<f64>, MlError> {
        self.fit(batch)?;
        self.transform(batch)
    }

    /// Width of the transformed matrix.
    pub fn n_output_features(&self) -> Result<usize, MlError> {
        Ok(self.fitted()?.width())
    }

    /// Output column names: numeric columns, then `<column>=<category>`.
    pub fn feature_names(&self) -> Result<Vec<String>, MlError> {
        let fitted = self.fitted()?;
        Ok(fitted
            .numeric
            .iter()
            .map(|c| c.name.clone())
            .chain(fitted.categorical.iter().flat_map(|c| c.feature_names()))
            .collect())
    }

    /// Fail fast when a record's feature columns diverge from the schema this
    /// preprocessor was fit with, in either direction. `known` lists column
    /// names that count as feature columns for the extra-column check.
    pub fn check_schema<'a>(
        &self,
        columns: impl IntoIterator<Item = &'a str>,
        known: &FeatureSchema,
    ) -> Result<(), MlError> {
        let columns: BTreeSet<&str> = columns.into_iter().collect();
        let missing = self.schema.missing_from(columns.iter().copied());
        let unexpected: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| self.schema.role(c).is_none())
            .filter(|c| known.role(c).is_some())
            .collect();

        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }
        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!(
                "missing fitted columns [{}]",
                missing.join(", ")
            ));
        }
        if !unexpected.is_empty() {
            problems.push(format!(
                "columns not seen during fit [{}]",
                unexpected.join(", ")
            ));
        }
        Err(MlError::transformation(format!(
            "record schema diverges from the fitted schema: {}",
            problems.join("; ")
        )))
    }

    fn require_columns(&self, batch: &DataBatch) -> Result<(), MlError> {
        let missing = self
            .schema
            .missing_from(batch.columns.iter().map(String::as_str));
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MlError::transformation(format!(
                "batch is missing declared columns [{}]",
                missing.join(", ")
            )))
        }
    }
}

fn numeric_cells(batch: &DataBatch, name: &str) -> Result<Vec<Option<f64>>, MlError> {
    let cells = batch
        .column(name)
        .ok_or_else(|| MlError::transformation(format!("batch has no column '{name}'")))?;
    cells
        .enumerate()
        .map(|(row, cell)| match cell {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64().filter(|v| v.is_finite())),
            other => Err(MlError::transformation(format!(
                "row {row}, numerical column '{name}': expected a number, got {other}"
            ))),
        })
        .collect()
}

fn categorical_cells(batch: &DataBatch, name: &str) -> Result<Vec<Option<String>>, MlError> {
    let cells = batch
        .column(name)
        .ok_or_else(|| MlError::transformation(format!("batch has no column '{name}'")))?;
    cells
        .enumerate()
        .map(|(row, cell)| match cell {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.trim().to_string())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(MlError::transformation(format!(
                "row {row}, categorical column '{name}': unsupported value {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(["Area", "annual_rainfall"], ["Season", "Crop"])
    }

    fn batch() -> DataBatch {
        DataBatch::new(
            vec![
                "Season".into(),
                "Area".into(),
                "Crop".into(),
                "annual_rainfall".into(),
            ],
            vec![
                vec![json!("Kharif"), json!(1.0), json!("Rice"), json!(900.0)],
                vec![json!("Rabi"), json!(2.0), json!("Wheat"), json!(1100.0)],
                vec![json!("Kharif"), json!(3.0), json!("Rice"), Value::Null],
                vec![Value::Null, Value::Null, json!("Maize"), json!(1000.0)],
            ],
        )
    }

    #[test]
    fn test_output_width_and_names() {
        let mut pre = Preprocessor::new(schema());
        let x = pre.fit_transform(&batch()).unwrap();
        // 2 numeric + Season{Kharif, Rabi} + Crop{Maize, Rice, Wheat}
        assert_eq!(x.dim(), (4, 7));
        assert_eq!(pre.n_output_features().unwrap(), 7);
        assert_eq!(
            pre.feature_names().unwrap(),
            vec![
                "Area",
                "annual_rainfall",
                "Season=Kharif",
                "Season=Rabi",
                "Crop=Maize",
                "Crop=Rice",
                "Crop=Wheat",
            ]
        );
    }

    #[test]
    fn test_numeric_block_is_standardized() {
        let mut pre = Preprocessor::new(schema());
        let x = pre.fit_transform(&batch()).unwrap();
        for j in 0..2 {
            let col = x.column(j);
            let mean = col.sum() / col.len() as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-12, "column {j} mean {mean}");
            assert!((var - 1.0).abs() < 1e-12, "column {j} var {var}");
        }
    }

    #[test]
    fn test_missing_numeric_gets_median() {
        let mut pre = Preprocessor::new(schema());
        let x = pre.fit_transform(&batch()).unwrap();
        // Area [1, 2, 3, NaN] imputes 2, the same as the row that holds 2.
        assert_eq!(x[[3, 0]], x[[1, 0]]);
    }

    #[test]
    fn test_missing_categorical_gets_most_frequent() {
        let mut pre = Preprocessor::new(schema());
        let x = pre.fit_transform(&batch()).unwrap();
        // Season is missing in row 3 and Kharif is the most frequent value.
        assert_eq!(x.row(3).slice(ndarray::s![2..4]), x.row(0).slice(ndarray::s![2..4]));
    }

    #[test]
    fn test_unknown_category_is_all_zero_block() {
        let mut pre = Preprocessor::new(schema());
        pre.fit(&batch()).unwrap();

        let query = DataBatch::new(
            vec![
                "Area".into(),
                "annual_rainfall".into(),
                "Season".into(),
                "Crop".into(),
            ],
            vec![vec![json!(2.0), json!(1000.0), json!("Autumn"), json!("Rice")]],
        );
        let x = pre.transform(&query).unwrap();
        assert!(x.row(0).slice(ndarray::s![2..4]).iter().all(|v| *v == 0.0));
        assert!(x[[0, 5]] > 0.0);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let mut pre = Preprocessor::new(schema());
        pre.fit(&batch()).unwrap();
        let a = pre.transform(&batch()).unwrap();
        let b = pre.transform(&batch()).unwrap();
        let bits = |m: &Array2<f64>| m.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let pre = Preprocessor::new(schema());
        let err = pre.transform(&batch()).unwrap_err();
        assert!(matches!(err, MlError::Transformation(_)));
    }

    #[test]
    fn test_refit_fails() {
        let mut pre = Preprocessor::new(schema());
        pre.fit(&batch()).unwrap();
        assert!(matches!(
            pre.fit(&batch()),
            Err(MlError::Transformation(_))
        ));
    }

    #[test]
    fn test_fit_missing_column_fails() {
        let mut b = batch();
        b.drop_columns(&["Crop".to_string()]);
        let mut pre = Preprocessor::new(schema());
        let err = pre.fit(&b).unwrap_err();
        assert!(err.to_string().contains("Crop"));
        assert!(!pre.is_fitted());
    }

    #[test]
    fn test_text_in_numeric_column_fails() {
        let mut pre = Preprocessor::new(schema());
        pre.fit(&batch()).unwrap();
        let query = DataBatch::new(
            vec![
                "Area".into(),
                "annual_rainfall".into(),
                "Season".into(),
                "Crop".into(),
            ],
            vec![vec![json!("ten"), json!(1000.0), json!("Rabi"), json!("Rice")]],
        );
        assert!(matches!(
            pre.transform(&query),
            Err(MlError::Transformation(_))
        ));
    }

    #[test]
    fn test_check_schema_reports_both_directions() {
        let mut pre = Preprocessor::new(FeatureSchema::serving());
        let known = FeatureSchema::training();
        assert!(pre
            .check_schema(FeatureSchema::serving().columns(), &known)
            .is_ok());

        let with_soil: Vec<&str> = known.columns().collect();
        let err = pre.check_schema(with_soil, &known).unwrap_err();
        assert!(err.to_string().contains("Soil pH"));

        pre = Preprocessor::new(FeatureSchema::training());
        let err = pre
            .check_schema(FeatureSchema::serving().columns(), &known)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("missing fitted columns"), "{msg}");
        assert!(msg.contains("Soil Type"), "{msg}");
    }
}
