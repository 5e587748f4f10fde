//! Single-record prediction against persisted artifacts.

use super::query::YieldQuery;
use crate::artifacts::ArtifactStore;
use crate::config::ArtifactPaths;
use crate::data::schema::FeatureSchema;
use crate::error::MlError;
use crate::features::Preprocessor;
use crate::model::{Regressor, TrainedModel};
use tracing::debug;

/// Loads the preprocessor and model from disk on every call and predicts one
/// record. Predictions always run on the CPU.
#[derive(Debug, Clone)]
pub struct PredictPipeline {
    paths: ArtifactPaths,
}

impl PredictPipeline {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Predict the yield for `query`. The result always has exactly one
    /// element. Any failure is reported as [`MlError::Inference`].
    pub fn predict(&self, query: &YieldQuery) -> Result<Vec<f64>, MlError> {
        self.load()
            .and_then(|(preprocessor, model)| predict_with(&preprocessor, &model, query))
            .map_err(MlError::inference)
    }

    fn load(&self) -> Result<(Preprocessor, TrainedModel), MlError> {
        let preprocessor: Preprocessor = ArtifactStore::load(&self.paths.preprocessor)?;
        let model: TrainedModel = ArtifactStore::load(&self.paths.model)?;
        Ok((preprocessor, model))
    }
}

/// Validate, transform and predict one record with already loaded artifacts.
pub(crate) fn predict_with(
    preprocessor: &Preprocessor,
    model: &TrainedModel,
    query: &YieldQuery,
) -> Result<Vec<f64>, MlError> {
    query.validate()?;
    let batch = query.to_batch();
    preprocessor.check_schema(
        batch.columns.iter().map(String::as_str),
        &FeatureSchema::training(),
    )?;
    let x = preprocessor.transform(&batch)?;
    if x.ncols() != model.n_features() {
        return Err(MlError::model(format!(
            "preprocessor produces {} features but the model expects {}",
            x.ncols(),
            model.n_features()
        )));
    }
    let prediction = model.predict(x.view())?;
    if prediction.len() != 1 {
        return Err(MlError::model(format!(
            "expected a single prediction, got {}",
            prediction.len()
        )));
    }
    debug!(crop = %query.crop, prediction = prediction[0], "Predicted yield");
    Ok(prediction)
}
