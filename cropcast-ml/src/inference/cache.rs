//! Load-once artifact cache for long-running servers.

use super::pipeline::predict_with;
use super::query::YieldQuery;
use crate::artifacts::ArtifactStore;
use crate::config::ArtifactPaths;
use crate::error::MlError;
use crate::features::Preprocessor;
use crate::model::TrainedModel;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// An immutable preprocessor/model pair loaded together.
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub preprocessor: Preprocessor,
    pub model: TrainedModel,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedArtifacts {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, MlError> {
        Ok(Self {
            preprocessor: ArtifactStore::load(&paths.preprocessor)?,
            model: ArtifactStore::load(&paths.model)?,
            loaded_at: Utc::now(),
        })
    }
}

/// Shares one loaded artifact pair between concurrent readers. `reload`
/// swaps in a fresh pair; readers holding the old `Arc` finish undisturbed.
#[derive(Debug)]
pub struct ArtifactCache {
    paths: ArtifactPaths,
    current: RwLock<Arc<LoadedArtifacts>>,
}

impl ArtifactCache {
    pub fn load(paths: ArtifactPaths) -> Result<Self, MlError> {
        let loaded = LoadedArtifacts::load(&paths)?;
        info!(model = loaded.model.name(), "Loaded artifacts into cache");
        Ok(Self {
            paths,
            current: RwLock::new(Arc::new(loaded)),
        })
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// The currently published artifacts.
    pub fn get(&self) -> Arc<LoadedArtifacts> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Load the artifacts again and publish them. On failure the previous
    /// pair stays in place.
    pub fn reload(&self) -> Result<(), MlError> {
        let fresh = Arc::new(LoadedArtifacts::load(&self.paths)?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        info!("Reloaded cached artifacts");
        Ok(())
    }

    pub fn predict(&self, query: &YieldQuery) -> Result<Vec<f64>, MlError> {
        let artifacts = self.get();
        predict_with(&artifacts.preprocessor, &artifacts.model, query).map_err(MlError::inference)
    }
}
