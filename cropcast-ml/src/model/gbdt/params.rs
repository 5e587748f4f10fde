//! Booster hyperparameters and the regularized gain/leaf-weight formulas.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Hyperparameters of the gradient-boosted regressor.
///
/// The defaults are the fixed configuration the pipeline ships with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    /// Number of boosting rounds.
    pub n_trees: u32,
    /// Maximum tree depth (root is depth 0).
    pub max_depth: u32,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f64,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of features sampled per tree.
    pub colsample_bytree: f64,
    /// L1 regularization (alpha).
    pub reg_alpha: f64,
    /// L2 regularization (lambda).
    pub reg_lambda: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    /// Minimum gain to make a split (gamma).
    pub min_split_gain: f64,
    /// Maximum histogram bins per feature.
    pub max_bins: u16,
    /// Seed for row and column sampling.
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: 8,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_alpha: 0.3,
            reg_lambda: 0.8,
            min_child_weight: 1.0,
            min_split_gain: 0.0,
            max_bins: 256,
            seed: 42,
        }
    }
}

impl BoosterParams {
    pub fn validate(&self) -> Result<(), MlError> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        if self.n_trees == 0 {
            return Err(MlError::model("n_trees must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(MlError::model("learning_rate must be positive"));
        }
        if !fraction(self.subsample) {
            return Err(MlError::model("subsample must be in (0, 1]"));
        }
        if !fraction(self.colsample_bytree) {
            return Err(MlError::model("colsample_bytree must be in (0, 1]"));
        }
        if self.reg_alpha < 0.0 || self.reg_lambda < 0.0 {
            return Err(MlError::model("regularization terms must be non-negative"));
        }
        if self.min_child_weight < 0.0 || self.min_split_gain < 0.0 {
            return Err(MlError::model(
                "min_child_weight and min_split_gain must be non-negative",
            ));
        }
        if self.max_bins < 2 {
            return Err(MlError::model("max_bins must be at least 2"));
        }
        Ok(())
    }

    /// L1 soft threshold of a gradient sum.
    #[inline]
    fn threshold_l1(&self, grad: f64) -> f64 {
        if grad > self.reg_alpha {
            grad - self.reg_alpha
        } else if grad < -self.reg_alpha {
            grad + self.reg_alpha
        } else {
            0.0
        }
    }

    /// Structure score of a node: `T(G)² / (H + λ)`.
    #[inline]
    pub fn node_score(&self, grad: f64, hess: f64) -> f64 {
        let denom = hess + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        let t = self.threshold_l1(grad);
        t * t / denom
    }

    /// Split gain:
    ///
    /// ```text
    /// gain = 0.5 * [S(G_L, H_L) + S(G_R, H_R) - S(G_P, H_P)] - γ
    /// ```
    #[inline]
    pub fn split_gain(&self, grad_left: f64, hess_left: f64, grad_parent: f64, hess_parent: f64) -> f64 {
        let grad_right = grad_parent - grad_left;
        let hess_right = hess_parent - hess_left;
        0.5 * (self.node_score(grad_left, hess_left) + self.node_score(grad_right, hess_right)
            - self.node_score(grad_parent, hess_parent))
            - self.min_split_gain
    }

    /// Optimal leaf weight `-T(G) / (H + λ)`, before shrinkage.
    #[inline]
    pub fn leaf_weight(&self, grad: f64, hess: f64) -> f64 {
        let denom = hess + self.reg_lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -self.threshold_l1(grad) / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> BoosterParams {
        BoosterParams {
            reg_alpha: 0.0,
            reg_lambda: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_match_shipped_configuration() {
        let p = BoosterParams::default();
        assert_eq!(p.n_trees, 300);
        assert_eq!(p.max_depth, 8);
        assert_eq!(p.learning_rate, 0.05);
        assert_eq!(p.subsample, 0.8);
        assert_eq!(p.colsample_bytree, 0.8);
        assert_eq!(p.reg_alpha, 0.3);
        assert_eq!(p.reg_lambda, 0.8);
        p.validate().unwrap();
    }

    #[test]
    fn test_gain_symmetric_split() {
        // left: G=10, H=5; right: G=-10, H=5; parent: G=0, H=10
        let gain = plain().split_gain(10.0, 5.0, 0.0, 10.0);
        // 0.5 * (100/6 + 100/6 - 0) ≈ 16.67
        assert!((gain - 16.6667).abs() < 1e-3);
    }

    #[test]
    fn test_leaf_weight_no_l1() {
        let w = plain().leaf_weight(-10.0, 5.0);
        assert!((w - 10.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_leaf_weight_with_l1() {
        let p = BoosterParams {
            reg_alpha: 2.0,
            reg_lambda: 1.0,
            ..Default::default()
        };
        assert_eq!(p.leaf_weight(-1.0, 5.0), 0.0);
        assert!((p.leaf_weight(-10.0, 5.0) - 8.0 / 6.0).abs() < 1e-12);
        assert!((p.leaf_weight(10.0, 5.0) + 8.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_fractions() {
        let p = BoosterParams {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(p.validate().is_err());
        let p = BoosterParams {
            colsample_bytree: 1.5,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_partial_params_from_toml() {
        let p: BoosterParams = toml::from_str("n_trees = 10\nmax_depth = 3").unwrap();
        assert_eq!(p.n_trees, 10);
        assert_eq!(p.max_depth, 3);
        assert_eq!(p.learning_rate, 0.05);
    }
}
