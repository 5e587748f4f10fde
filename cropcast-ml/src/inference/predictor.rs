//! Configured choice between per-call loading and the artifact cache.

use super::cache::ArtifactCache;
use super::pipeline::PredictPipeline;
use super::query::YieldQuery;
use crate::config::{ArtifactPaths, MlConfig};
use crate::error::MlError;

/// Predicts through whichever strategy `inference.cache_artifacts` selects.
#[derive(Debug)]
pub enum Predictor {
    /// Load artifacts from disk for every prediction.
    Fresh(PredictPipeline),
    /// Keep one loaded pair in memory.
    Cached(ArtifactCache),
}

impl Predictor {
    /// Build the predictor for `config`. Caching loads the artifacts
    /// immediately, so missing artifacts fail here.
    pub fn from_config(config: &MlConfig) -> Result<Self, MlError> {
        let paths = config.artifacts.paths();
        if config.inference.cache_artifacts {
            Ok(Self::Cached(ArtifactCache::load(paths)?))
        } else {
            Ok(Self::Fresh(PredictPipeline::new(paths)))
        }
    }

    pub fn predict(&self, query: &YieldQuery) -> Result<Vec<f64>, MlError> {
        match self {
            Self::Fresh(pipeline) => pipeline.predict(query),
            Self::Cached(cache) => cache.predict(query),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        match self {
            Self::Fresh(pipeline) => pipeline.paths(),
            Self::Cached(cache) => cache.paths(),
        }
    }

    /// Whether both artifact files are present on disk.
    pub fn artifacts_present(&self) -> bool {
        let paths = self.paths();
        paths.preprocessor.is_file() && paths.model.is_file()
    }

    /// Reload cached artifacts; a no-op for per-call loading.
    pub fn reload(&self) -> Result<(), MlError> {
        match self {
            Self::Fresh(_) => Ok(()),
            Self::Cached(cache) => cache.reload(),
        }
    }
}
