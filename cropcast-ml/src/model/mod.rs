//! Regressors: candidate specifications and fitted models.

pub mod gbdt;
pub mod ridge;

pub use gbdt::{BoosterParams, GradientBoostedRegressor};
pub use ridge::{RidgeParams, RidgeRegressor};

use crate::error::MlError;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// A fitted regressor.
pub trait Regressor {
    /// Predict one value per row.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, MlError>;

    /// Number of input columns the model was fit on.
    fn n_features(&self) -> usize;
}

impl Regressor for GradientBoostedRegressor {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, MlError> {
        GradientBoostedRegressor::predict(self, x)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Regressor for RidgeRegressor {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, MlError> {
        RidgeRegressor::predict(self, x)
    }

    fn n_features(&self) -> usize {
        RidgeRegressor::n_features(self)
    }
}

/// A candidate regressor as written in configuration.
///
/// ```toml
/// [[ml.training.candidates]]
/// type = "gradient_boosting"
/// n_trees = 300
///
/// [[ml.training.candidates]]
/// type = "ridge"
/// alpha = 1.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    GradientBoosting(BoosterParams),
    Ridge(RidgeParams),
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::GradientBoosting(BoosterParams::default())
    }
}

impl ModelSpec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GradientBoosting(_) => "gradient_boosting",
            Self::Ridge(_) => "ridge",
        }
    }

    pub fn fit(&self, x: ArrayView2<'_, f64>, y: &[f64]) -> Result<TrainedModel, MlError> {
        match self {
            Self::GradientBoosting(params) => {
                GradientBoostedRegressor::fit(x, y, params).map(TrainedModel::GradientBoosting)
            }
            Self::Ridge(params) => RidgeRegressor::fit(x, y, params).map(TrainedModel::Ridge),
        }
    }
}

/// The model artifact: whichever candidate won the training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainedModel {
    GradientBoosting(GradientBoostedRegressor),
    Ridge(RidgeRegressor),
}

impl TrainedModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GradientBoosting(_) => "gradient_boosting",
            Self::Ridge(_) => "ridge",
        }
    }

    /// Structural check for a model restored from bytes.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::GradientBoosting(m) => m.validate(),
            Self::Ridge(_) => Ok(()),
        }
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            Self::GradientBoosting(m) => m,
            Self::Ridge(m) => m,
        }
    }
}

impl Regressor for TrainedModel {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, MlError> {
        self.inner().predict(x)
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }
}
