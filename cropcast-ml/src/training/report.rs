//! JSON training report written next to the binary artifacts.

use super::metrics::RegressionMetrics;
use crate::data::schema::FeatureSchema;
use crate::data::source::DataSourceInfo;
use crate::model::ModelSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scores of one candidate regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub spec: ModelSpec,
    pub train: RegressionMetrics,
    pub test: RegressionMetrics,
}

/// Digest of one persisted artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

/// Lineage and outcome of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<DataSourceInfo>,
    pub schema: FeatureSchema,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub candidates: Vec<CandidateScore>,
    pub winner: String,
    /// Position of the winner in `candidates`.
    pub winner_index: usize,
    /// Test R² of the winner.
    pub score: f64,
    pub quality_threshold: f64,
    pub artifacts: Vec<ArtifactDigest>,
}
