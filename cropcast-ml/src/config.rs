//! Configuration types for the cropcast-ml crate.
//!
//! These are the ML-specific sub-configs referenced from the CLI's top-level
//! `CropcastConfig`.

use crate::data::schema::SchemaKind;
use crate::model::ModelSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level ML configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MlConfig {
    /// Where artifacts are written and read.
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// Training pipeline configuration.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Inference configuration.
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl MlConfig {
    /// Resolve every relative path against `workspace`.
    pub fn resolve_paths(&mut self, workspace: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = workspace.join(&*p);
            }
        };
        resolve(&mut self.artifacts.dir);
        resolve(&mut self.training.train_path);
        resolve(&mut self.training.test_path);
    }
}

/// Artifact location configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory holding the artifacts.
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
    /// File name of the fitted preprocessor.
    #[serde(default = "default_preprocessor_file")]
    pub preprocessor_file: String,
    /// File name of the trained model.
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// File name of the JSON training report.
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
            preprocessor_file: default_preprocessor_file(),
            model_file: default_model_file(),
            report_file: default_report_file(),
        }
    }
}

impl ArtifactConfig {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            preprocessor: self.dir.join(&self.preprocessor_file),
            model: self.dir.join(&self.model_file),
            report: self.dir.join(&self.report_file),
        }
    }
}

/// Concrete artifact file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub preprocessor: PathBuf,
    pub model: PathBuf,
    pub report: PathBuf,
}

impl ArtifactPaths {
    /// Conventional file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        ArtifactConfig {
            dir: dir.as_ref().to_path_buf(),
            ..ArtifactConfig::default()
        }
        .paths()
    }
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_preprocessor_file() -> String {
    "preprocessor.bin".to_string()
}

fn default_model_file() -> String {
    "model.bin".to_string()
}

fn default_report_file() -> String {
    "training_report.json".to_string()
}

/// Training pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Training split CSV.
    #[serde(default = "default_train_path")]
    pub train_path: PathBuf,
    /// Held-out test split CSV.
    #[serde(default = "default_test_path")]
    pub test_path: PathBuf,
    /// Label column.
    #[serde(default = "default_target_column")]
    pub target_column: String,
    /// Columns removed from the features before fitting.
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
    /// Which feature schema the preprocessor is fit with.
    #[serde(default)]
    pub schema: SchemaKind,
    /// Minimum test R² the winning candidate must reach.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    /// Candidate regressors, evaluated in order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<ModelSpec>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_path: default_train_path(),
            test_path: default_test_path(),
            target_column: default_target_column(),
            drop_columns: default_drop_columns(),
            schema: SchemaKind::default(),
            quality_threshold: default_quality_threshold(),
            candidates: default_candidates(),
        }
    }
}

fn default_train_path() -> PathBuf {
    PathBuf::from("artifacts/train.csv")
}

fn default_test_path() -> PathBuf {
    PathBuf::from("artifacts/test.csv")
}

fn default_target_column() -> String {
    "yield".to_string()
}

fn default_drop_columns() -> Vec<String> {
    vec!["Production".to_string()]
}

fn default_quality_threshold() -> f64 {
    0.6
}

fn default_candidates() -> Vec<ModelSpec> {
    vec![ModelSpec::default()]
}

/// Inference configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Keep loaded artifacts in memory between calls instead of loading them
    /// fresh for every prediction.
    #[serde(default)]
    pub cache_artifacts: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MlConfig::default();
        assert_eq!(config.training.target_column, "yield");
        assert_eq!(config.training.drop_columns, vec!["Production"]);
        assert_eq!(config.training.quality_threshold, 0.6);
        assert_eq!(config.training.schema, SchemaKind::Training);
        assert_eq!(config.training.candidates.len(), 1);
        assert!(!config.inference.cache_artifacts);
    }

    #[test]
    fn test_artifact_paths() {
        let paths = ArtifactPaths::in_dir("out");
        assert_eq!(paths.preprocessor, PathBuf::from("out/preprocessor.bin"));
        assert_eq!(paths.model, PathBuf::from("out/model.bin"));
        assert_eq!(paths.report, PathBuf::from("out/training_report.json"));
    }

    #[test]
    fn test_resolve_paths_keeps_absolute() {
        let mut config = MlConfig::default();
        config.training.test_path = PathBuf::from("/data/test.csv");
        config.resolve_paths(Path::new("/ws"));
        assert_eq!(config.artifacts.dir, PathBuf::from("/ws/artifacts"));
        assert_eq!(config.training.train_path, PathBuf::from("/ws/artifacts/train.csv"));
        assert_eq!(config.training.test_path, PathBuf::from("/data/test.csv"));
    }

    #[test]
    fn test_partial_toml() {
        let config: MlConfig = toml::from_str(
            r#"
[training]
quality_threshold = 0.7
schema = "serving"
"#,
        )
        .unwrap();
        assert_eq!(config.training.quality_threshold, 0.7);
        assert_eq!(config.training.schema, SchemaKind::Serving);
        assert_eq!(config.training.target_column, "yield");
        assert_eq!(config.artifacts.model_file, "model.bin");
    }
}
