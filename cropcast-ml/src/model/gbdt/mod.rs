//! Native gradient-boosted decision tree regressor.
//!
//! Squared-error boosting with histogram split finding, depth-wise growth,
//! L1/L2 regularized leaves, and seeded row/column subsampling. Everything
//! runs on the CPU.

mod binning;
mod grower;
pub mod params;
pub mod tree;

pub use binning::{BinnedFeature, BinnedMatrix};
pub use params::BoosterParams;
pub use tree::{Node, RegressionTree};

use crate::error::MlError;
use grower::TreeGrower;
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A fitted ensemble. Prediction is `base_score + Σ tree(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    pub params: BoosterParams,
    pub base_score: f64,
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fit on a dense feature matrix and its labels.
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &BoosterParams) -> Result<Self, MlError> {
        params.validate()?;
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 {
            return Err(MlError::model("cannot fit on an empty matrix"));
        }
        if n_features == 0 {
            return Err(MlError::model("cannot fit without features"));
        }
        if y.len() != n_rows {
            return Err(MlError::model(format!(
                "label count {} does not match row count {n_rows}",
                y.len()
            )));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(MlError::model("training data contains non-finite values"));
        }

        let base_score = y.iter().sum::<f64>() / n_rows as f64;
        let binned = BinnedMatrix::from_matrix(x, params.max_bins);
        let grower = TreeGrower::new(x.view(), &binned, params);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let n_sampled_features =
            ((params.colsample_bytree * n_features as f64).round() as usize).clamp(1, n_features);
        let mut preds = vec![base_score; n_rows];
        let mut grad = vec![0.0; n_rows];
        let hess = vec![1.0; n_rows];
        let mut trees = Vec::with_capacity(params.n_trees as usize);

        for round in 0..params.n_trees {
            for ((g, p), t) in grad.iter_mut().zip(&preds).zip(y) {
                *g = p - t;
            }

            let rows = sample_rows(&mut rng, n_rows, params.subsample);
            let mut features =
                rand::seq::index::sample(&mut rng, n_features, n_sampled_features).into_vec();
            features.sort_unstable();

            let tree = grower.grow(&grad, &hess, &rows, &features);
            for (r, p) in preds.iter_mut().enumerate() {
                *p += tree.predict_row(x.row(r));
            }
            if round % 50 == 0 {
                let mse = preds.iter().zip(y).map(|(p, t)| (p - t).powi(2)).sum::<f64>()
                    / n_rows as f64;
                debug!(round, leaves = tree.n_leaves(), train_mse = mse, "boosting round");
            }
            trees.push(tree);
        }

        Ok(Self {
            params: params.clone(),
            base_score,
            n_features,
            trees,
        })
    }

    /// Check every tree against the model's feature count.
    pub fn validate(&self) -> Result<(), String> {
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, MlError> {
        if x.ncols() != self.n_features {
            return Err(MlError::model(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| tree.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }
}

/// Bernoulli row sample; falls back to every row when the draw is empty.
fn sample_rows(rng: &mut StdRng, n_rows: usize, fraction: f64) -> Vec<u32> {
    if fraction >= 1.0 {
        return (0..n_rows as u32).collect();
    }
    let rows: Vec<u32> = (0..n_rows as u32)
        .filter(|_| rng.gen_bool(fraction))
        .collect();
    if rows.is_empty() {
        (0..n_rows as u32).collect()
    } else {
        rows
    }
}
