//! Binary artifact store for the fitted preprocessor and the trained model.
//!
//! An artifact file is a 4-byte magic identifying its kind followed by the
//! postcard encoding of the object. Every collection inside an artifact is a
//! `Vec` or an ordered map, so identical objects encode to identical bytes.

use crate::error::MlError;
use crate::features::Preprocessor;
use crate::model::TrainedModel;
use crate::persistence;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// A type that can be stored as an artifact file.
pub trait Artifact: Serialize + DeserializeOwned {
    /// File signature written before the payload.
    const MAGIC: [u8; 4];
    /// Human-readable kind used in error messages.
    const KIND: &'static str;

    /// Reject a decoded object whose internal structure is inconsistent.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Artifact for Preprocessor {
    const MAGIC: [u8; 4] = *b"CCP1";
    const KIND: &'static str = "preprocessor";
}

impl Artifact for TrainedModel {
    const MAGIC: [u8; 4] = *b"CCM1";
    const KIND: &'static str = "model";

    fn check(&self) -> Result<(), String> {
        self.validate()
    }
}

/// Encodes, writes and restores artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactStore;

impl ArtifactStore {
    /// Encode an artifact to its file bytes.
    pub fn encode<T: Artifact>(object: &T) -> Result<Vec<u8>, String> {
        let payload = postcard::to_allocvec(object)
            .map_err(|e| format!("failed to encode {}: {e}", T::KIND))?;
        let mut bytes = Vec::with_capacity(T::MAGIC.len() + payload.len());
        bytes.extend_from_slice(&T::MAGIC);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode an artifact from its file bytes.
    pub fn decode<T: Artifact>(bytes: &[u8]) -> Result<T, String> {
        let Some((magic, payload)) = bytes.split_first_chunk::<4>() else {
            return Err(format!("file too short to be a {} artifact", T::KIND));
        };
        if *magic != T::MAGIC {
            return Err(format!(
                "not a {} artifact (signature {:?}, expected {:?})",
                T::KIND,
                String::from_utf8_lossy(magic),
                String::from_utf8_lossy(&T::MAGIC)
            ));
        }
        let object: T = postcard::from_bytes(payload)
            .map_err(|e| format!("failed to decode {}: {e}", T::KIND))?;
        object
            .check()
            .map_err(|e| format!("corrupt {} artifact: {e}", T::KIND))?;
        Ok(object)
    }

    /// Serialize `object` to `path`, creating parent directories. The file
    /// only appears under its final name once fully written.
    pub fn save<T: Artifact>(path: &Path, object: &T) -> Result<Vec<u8>, MlError> {
        let bytes = Self::encode(object).map_err(|e| MlError::artifact_io(path, e))?;
        persistence::atomic_write(path, &bytes).map_err(|e| MlError::artifact_io(path, e))?;
        debug!(path = %path.display(), kind = T::KIND, bytes = bytes.len(), "artifact saved");
        Ok(bytes)
    }

    /// Restore an artifact written by [`ArtifactStore::save`].
    pub fn load<T: Artifact>(path: &Path) -> Result<T, MlError> {
        let bytes = std::fs::read(path).map_err(|e| MlError::artifact_io(path, e))?;
        let object = Self::decode(&bytes).map_err(|e| MlError::artifact_io(path, e))?;
        debug!(path = %path.display(), kind = T::KIND, "artifact loaded");
        Ok(object)
    }

    /// Write several encoded files together: each is staged to a temporary
    /// sibling first, and nothing is renamed into place unless every write
    /// succeeded.
    pub fn save_all(files: &[(&Path, &[u8])]) -> Result<(), MlError> {
        let mut targets = HashSet::with_capacity(files.len());
        for (path, _) in files {
            if !targets.insert(*path) {
                return Err(MlError::artifact_io(
                    *path,
                    "listed more than once in one artifact set",
                ));
            }
        }
        let mut staged = Vec::with_capacity(files.len());
        for (path, bytes) in files {
            let file =
                persistence::stage(path, bytes).map_err(|e| MlError::artifact_io(*path, e))?;
            staged.push(file);
        }
        for file in staged {
            let target = file.target().to_path_buf();
            file.commit().map_err(|e| MlError::artifact_io(target, e))?;
        }
        Ok(())
    }
}
