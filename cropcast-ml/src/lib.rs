//! # cropcast-ml: crop yield training and inference
//!
//! The offline pipeline loads the train/test CSV splits, fits a feature
//! transformer (median/most-frequent imputation, one-hot encoding, scaling),
//! trains the configured candidate regressors, keeps the best one when its
//! test R² clears the quality gate, and persists the transformer and model as
//! binary artifacts. The inference adapter restores those artifacts and
//! predicts the yield of a single query.

// Foundation
pub mod config;
pub mod error;
pub mod persistence;

// Data and features
pub mod data;
pub mod features;

// Models and training
pub mod model;
pub mod training;

// Artifacts and serving
pub mod artifacts;
pub mod inference;

// Re-exports
pub use artifacts::{Artifact, ArtifactStore};
pub use config::{ArtifactPaths, MlConfig};
pub use data::{DataBatch, FeatureSchema, SchemaKind};
pub use error::MlError;
pub use features::Preprocessor;
pub use inference::{ArtifactCache, PredictPipeline, Predictor, YieldQuery};
pub use model::{ModelSpec, Regressor, TrainedModel};
pub use training::{Trainer, TrainingOutcome, TrainingReport, TrainingStage};
