//! Regression metrics.

use serde::{Deserialize, Serialize};

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// A constant target has no variance to explain: a perfect fit scores 1.0 and
/// anything else 0.0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// All metrics for one candidate on one split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mse = mean_squared_error(y_true, y_pred);
        Self {
            r2: r2_score(y_true, y_pred),
            mse,
            rmse: mse.sqrt(),
            mae: mean_absolute_error(y_true, y_pred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2_perfect_and_mean() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(r2_score(&y, &y), 1.0);
        assert_eq!(r2_score(&y, &[2.5; 4]), 0.0);
    }

    #[test]
    fn test_r2_can_be_negative() {
        let y = [1.0, 2.0, 3.0];
        assert!(r2_score(&y, &[3.0, 2.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_r2_constant_target() {
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&[5.0, 5.0], &[4.0, 5.0]), 0.0);
    }

    #[test]
    fn test_metrics_bundle() {
        let m = RegressionMetrics::compute(&[0.0, 0.0], &[1.0, -3.0]);
        assert_eq!(m.mse, 5.0);
        assert_eq!(m.mae, 2.0);
        assert!((m.rmse - 5.0f64.sqrt()).abs() < 1e-12);
    }
}
