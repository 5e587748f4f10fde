//! Numerical column pipeline: median imputation followed by standardization.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Fitted statistics for one numerical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    /// Replacement for missing cells.
    pub median: f64,
    /// Mean of the imputed training column.
    pub mean: f64,
    /// Population standard deviation of the imputed training column, or 1
    /// for a constant column.
    pub scale: f64,
}

impl NumericColumn {
    /// Fit median, mean and scale on the training values of one column.
    pub fn fit(name: &str, values: &[Option<f64>]) -> Result<Self, MlError> {
        let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
        let median = median(&mut observed).ok_or_else(|| {
            MlError::transformation(format!(
                "numerical column '{name}' has no observed values to compute a median from"
            ))
        })?;

        let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
        let (mean, std) = mean_and_std(&imputed);

        Ok(Self {
            name: name.to_string(),
            median,
            mean,
            scale: non_zero_scale(std, mean),
        })
    }

    /// Impute then standardize a single cell.
    pub fn transform(&self, value: Option<f64>) -> f64 {
        (value.unwrap_or(self.median) - self.mean) / self.scale
    }
}

/// Median of `values`, averaging the two middle values for even lengths.
/// Sorts `values` in place.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Mean and population standard deviation (two-pass).
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Replace a (numerically) zero standard deviation with 1 so constant
/// columns pass through unscaled.
pub fn non_zero_scale(std: f64, mean: f64) -> f64 {
    if std <= 10.0 * f64::EPSILON * mean.abs().max(1.0) {
        1.0
    } else {
        std
    }
}
