//! Closed-form ridge regression.

use crate::error::MlError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeParams {
    /// L2 penalty on the coefficients; the intercept is not penalized.
    pub alpha: f64,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

/// A fitted linear model `y = intercept + x · coefficients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegressor {
    pub alpha: f64,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl RidgeRegressor {
    /// Solve `(XcᵀXc + αI) w = Xcᵀyc` on centered data.
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &RidgeParams) -> Result<Self, MlError> {
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 {
            return Err(MlError::model("cannot fit on an empty matrix"));
        }
        if y.len() != n_rows {
            return Err(MlError::model(format!(
                "label count {} does not match row count {n_rows}",
                y.len()
            )));
        }
        if !(params.alpha >= 0.0 && params.alpha.is_finite()) {
            return Err(MlError::model("ridge alpha must be non-negative"));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| MlError::model("cannot center an empty matrix"))?;
        let y_mean = y.iter().sum::<f64>() / n_rows as f64;
        let xc = &x - &x_mean;
        let yc = Array1::from_iter(y.iter().map(|v| v - y_mean));

        let mut gram = xc.t().dot(&xc);
        for i in 0..n_features {
            gram[[i, i]] += params.alpha;
        }
        let rhs = xc.t().dot(&yc);
        let coefficients = solve(gram, rhs.to_vec())?;

        let intercept = y_mean
            - x_mean
                .iter()
                .zip(&coefficients)
                .map(|(m, w)| m * w)
                .sum::<f64>();

        Ok(Self {
            alpha: params.alpha,
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, MlError> {
        if x.ncols() != self.coefficients.len() {
            return Err(MlError::model(format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                x.ncols()
            )));
        }
        let w = Array1::from_vec(self.coefficients.clone());
        Ok(x.dot(&w).iter().map(|v| v + self.intercept).collect())
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Vec<f64>) -> Result<Vec<f64>, MlError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-12 {
            return Err(MlError::model(
                "singular system; increase the ridge alpha",
            ));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * w[k]).sum();
        w[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_recovers_linear_relation() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 0.0]];
        let y: Vec<f64> = x.rows().into_iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 1.0).collect();
        let model = RidgeRegressor::fit(x.view(), &y, &RidgeParams { alpha: 0.0 }).unwrap();
        assert!((model.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((model.coefficients[1] + 2.0).abs() < 1e-9);
        assert!((model.intercept - 1.0).abs() < 1e-9);
        let preds = model.predict(x.view()).unwrap();
        for (p, t) in preds.iter().zip(&y) {
            assert!((p - t).abs() < 1e-9);
        }
    }

    #[test]
    fn test_penalty_shrinks_coefficients() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = vec![2.0, 4.0, 6.0, 8.0];
        let plain = RidgeRegressor::fit(x.view(), &y, &RidgeParams { alpha: 0.0 }).unwrap();
        let shrunk = RidgeRegressor::fit(x.view(), &y, &RidgeParams { alpha: 10.0 }).unwrap();
        assert!(shrunk.coefficients[0].abs() < plain.coefficients[0].abs());
    }

    #[test]
    fn test_singular_without_penalty() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let err = RidgeRegressor::fit(x.view(), &[1.0, 2.0, 3.0], &RidgeParams { alpha: 0.0 })
            .unwrap_err();
        assert!(err.to_string().contains("singular"));
        assert!(RidgeRegressor::fit(x.view(), &[1.0, 2.0, 3.0], &RidgeParams::default()).is_ok());
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = RidgeRegressor {
            alpha: 1.0,
            intercept: 0.0,
            coefficients: vec![1.0, 2.0],
        };
        assert!(model.predict(array![[1.0]].view()).is_err());
    }
}
