//! Offline training pipeline.

pub mod metrics;
pub mod report;
pub mod trainer;

pub use metrics::{RegressionMetrics, mean_absolute_error, mean_squared_error, r2_score};
pub use report::{ArtifactDigest, CandidateScore, TrainingReport};
pub use trainer::{Trainer, TrainingOutcome, TrainingStage};
