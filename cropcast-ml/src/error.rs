//! Error types for the cropcast-ml crate.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the training and inference pipeline.
#[derive(Debug, Error)]
pub enum MlError {
    /// Training data could not be read or lacks required columns.
    #[error("Data load error: {context}")]
    DataLoad {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Fit/transform misuse, schema divergence or malformed cells.
    #[error("Transformation error: {0}")]
    Transformation(String),

    /// The best candidate failed the minimum R² acceptance gate.
    #[error(
        "Model quality error: best candidate '{candidate}' scored R² {score:.4}, below the acceptance threshold {threshold}"
    )]
    ModelQuality {
        candidate: String,
        score: f64,
        threshold: f64,
    },

    /// An artifact could not be written, read or decoded.
    #[error("Artifact IO error at {}: {reason}", path.display())]
    ArtifactIo { path: PathBuf, reason: String },

    /// Any failure while producing a prediction for one record.
    #[error("Inference error: {source}")]
    Inference {
        #[source]
        source: Box<MlError>,
    },

    /// Regressor fit/predict misuse.
    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MlError {
    pub fn data_load(context: impl Into<String>) -> Self {
        Self::DataLoad {
            context: context.into(),
            source: None,
        }
    }

    pub fn data_load_with(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::DataLoad {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn transformation(msg: impl Into<String>) -> Self {
        Self::Transformation(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn artifact_io(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ArtifactIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap an error as an inference failure. Already-wrapped errors are
    /// returned unchanged.
    pub fn inference(source: MlError) -> Self {
        match source {
            inference @ Self::Inference { .. } => inference,
            other => Self::Inference {
                source: Box::new(other),
            },
        }
    }

    /// The innermost error when this is an inference wrapper.
    pub fn root_cause(&self) -> &MlError {
        match self {
            Self::Inference { source } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_wraps_once() {
        let inner = MlError::transformation("missing column 'Area'");
        let wrapped = MlError::inference(MlError::inference(inner));
        match &wrapped {
            MlError::Inference { source } => {
                assert!(matches!(**source, MlError::Transformation(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(wrapped.to_string().contains("missing column 'Area'"));
    }

    #[test]
    fn test_model_quality_message() {
        let err = MlError::ModelQuality {
            candidate: "gradient_boosting".into(),
            score: 0.12345,
            threshold: 0.6,
        };
        let msg = err.to_string();
        assert!(msg.contains("gradient_boosting"));
        assert!(msg.contains("0.1235"));
        assert!(msg.contains("0.6"));
    }

    #[test]
    fn test_data_load_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = MlError::data_load_with("reading train.csv", io);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("no such file"));
    }
}
