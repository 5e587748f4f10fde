//! Training orchestrator: load the splits, fit the preprocessor, fit and
//! score every candidate, gate on R², and persist the winner.

use super::metrics::RegressionMetrics;
use super::report::{ArtifactDigest, CandidateScore, TrainingReport};
use crate::artifacts::ArtifactStore;
use crate::config::{ArtifactPaths, MlConfig, TrainingConfig};
use crate::data::schema::FeatureSchema;
use crate::data::source::{CsvSource, DataBatch, DataSource, DataSourceInfo, cell_as_f64};
use crate::error::MlError;
use crate::features::Preprocessor;
use crate::model::{Regressor, TrainedModel};
use crate::persistence;
use chrono::Utc;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, s};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where a training run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStage {
    Unfit,
    FittingTransformer,
    TransformerFitted,
    TrainingModel,
    Evaluated,
    Persisted,
    Rejected,
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unfit => "unfit",
            Self::FittingTransformer => "fitting_transformer",
            Self::TransformerFitted => "transformer_fitted",
            Self::TrainingModel => "training_model",
            Self::Evaluated => "evaluated",
            Self::Persisted => "persisted",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Result of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Test-set R² of the persisted model.
    pub score: f64,
    pub model: TrainedModel,
    pub preprocessor: Preprocessor,
    pub report: TrainingReport,
    pub paths: ArtifactPaths,
}

/// A loaded split with the label separated from the features.
struct LabelledSplit {
    features: DataBatch,
    target: Vec<f64>,
    info: DataSourceInfo,
}

/// Runs the offline training pipeline.
pub struct Trainer {
    config: TrainingConfig,
    schema: FeatureSchema,
    paths: ArtifactPaths,
    stage: TrainingStage,
}

impl Trainer {
    pub fn new(config: TrainingConfig, paths: ArtifactPaths) -> Self {
        let schema = config.schema.schema();
        Self {
            config,
            schema,
            paths,
            stage: TrainingStage::Unfit,
        }
    }

    pub fn from_config(config: &MlConfig) -> Self {
        Self::new(config.training.clone(), config.artifacts.paths())
    }

    /// Fit the preprocessor with an explicit schema instead of the
    /// configured preset.
    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn stage(&self) -> TrainingStage {
        self.stage
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn advance(&mut self, next: TrainingStage) {
        debug!(from = %self.stage, to = %next, "Training stage");
        self.stage = next;
    }

    /// Train on the configured train/test paths.
    pub fn run(&mut self) -> Result<TrainingOutcome, MlError> {
        let train_path = self.config.train_path.clone();
        let test_path = self.config.test_path.clone();
        self.train(&train_path, &test_path)
    }

    /// Train on the given CSV splits and persist the artifacts when the best
    /// candidate clears the quality gate. Nothing is written otherwise.
    pub fn train(&mut self, train_path: &Path, test_path: &Path) -> Result<TrainingOutcome, MlError> {
        let started_at = Utc::now();
        self.stage = TrainingStage::Unfit;
        if self.config.candidates.is_empty() {
            return Err(MlError::Config(
                "no candidate regressors configured".to_string(),
            ));
        }

        let train = self.load_split(train_path)?;
        let test = self.load_split(test_path)?;

        self.advance(TrainingStage::FittingTransformer);
        let mut preprocessor = Preprocessor::new(self.schema.clone());
        let x_train = preprocessor.fit_transform(&train.features)?;
        let x_test = preprocessor.transform(&test.features)?;
        self.advance(TrainingStage::TransformerFitted);
        info!(
            features = x_train.ncols(),
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            "Transformed splits"
        );

        let train_arr = with_label(x_train.view(), &train.target)?;
        let test_arr = with_label(x_test.view(), &test.target)?;
        let (x_train, y_train) = split_label(&train_arr);
        let (x_test, y_test) = split_label(&test_arr);

        self.advance(TrainingStage::TrainingModel);
        let mut candidates = Vec::with_capacity(self.config.candidates.len());
        let mut best: Option<(usize, TrainedModel, f64)> = None;
        for (idx, spec) in self.config.candidates.iter().enumerate() {
            let model = spec.fit(x_train, &y_train)?;
            let train_metrics = RegressionMetrics::compute(&y_train, &model.predict(x_train)?);
            let test_metrics = RegressionMetrics::compute(&y_test, &model.predict(x_test)?);
            info!(
                candidate = spec.name(),
                r2 = test_metrics.r2,
                rmse = test_metrics.rmse,
                train_r2 = train_metrics.r2,
                "Evaluated candidate"
            );

            let improves = best
                .as_ref()
                .is_none_or(|(_, _, score)| outranks(test_metrics.r2, *score));
            candidates.push(CandidateScore {
                name: spec.name().to_string(),
                spec: spec.clone(),
                train: train_metrics,
                test: test_metrics,
            });
            if improves {
                best = Some((idx, model, test_metrics.r2));
            }
        }
        self.advance(TrainingStage::Evaluated);

        let Some((winner_index, model, score)) = best else {
            return Err(MlError::model("no candidate produced a model"));
        };
        let winner = candidates[winner_index].name.clone();
        let threshold = self.config.quality_threshold;

        if score.is_nan() || score < threshold {
            self.advance(TrainingStage::Rejected);
            warn!(candidate = %winner, score, threshold, "Best candidate rejected by quality gate");
            return Err(MlError::ModelQuality {
                candidate: winner,
                score,
                threshold,
            });
        }

        let preprocessor_bytes = ArtifactStore::encode(&preprocessor)
            .map_err(|e| MlError::artifact_io(&self.paths.preprocessor, e))?;
        let model_bytes = ArtifactStore::encode(&model)
            .map_err(|e| MlError::artifact_io(&self.paths.model, e))?;

        let report = TrainingReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            sources: vec![train.info, test.info],
            schema: self.schema.clone(),
            feature_names: preprocessor.feature_names()?,
            train_rows: y_train.len(),
            test_rows: y_test.len(),
            candidates,
            winner,
            winner_index,
            score,
            quality_threshold: threshold,
            artifacts: vec![
                digest(&self.paths.preprocessor, &preprocessor_bytes),
                digest(&self.paths.model, &model_bytes),
            ],
        };
        let report_bytes = serde_json::to_vec_pretty(&report)?;

        ArtifactStore::save_all(&[
            (self.paths.preprocessor.as_path(), preprocessor_bytes.as_slice()),
            (self.paths.model.as_path(), model_bytes.as_slice()),
            (self.paths.report.as_path(), report_bytes.as_slice()),
        ])?;
        self.advance(TrainingStage::Persisted);
        info!(
            score,
            candidate = %report.winner,
            model = %self.paths.model.display(),
            "Persisted training artifacts"
        );

        Ok(TrainingOutcome {
            score,
            model,
            preprocessor,
            report,
            paths: self.paths.clone(),
        })
    }

    fn load_split(&self, path: &Path) -> Result<LabelledSplit, MlError> {
        let target_column = &self.config.target_column;
        let source = CsvSource::new(path).with_numeric_columns(
            self.schema
                .numerical
                .iter()
                .cloned()
                .chain(std::iter::once(target_column.clone())),
        );
        let mut batch = source.load(None)?;
        if batch.row_count() == 0 {
            return Err(MlError::data_load(format!(
                "{} contains no data rows",
                path.display()
            )));
        }

        let missing = self
            .schema
            .missing_from(batch.columns.iter().map(String::as_str));
        if !missing.is_empty() {
            return Err(MlError::data_load(format!(
                "{} is missing feature columns [{}]",
                path.display(),
                missing.join(", ")
            )));
        }

        let cells = batch.take_column(target_column).ok_or_else(|| {
            MlError::data_load(format!(
                "{} has no target column '{target_column}'",
                path.display()
            ))
        })?;
        let target = cells
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                cell_as_f64(cell).ok_or_else(|| {
                    MlError::data_load(format!(
                        "{}: data row {} has no value for target column '{target_column}'",
                        path.display(),
                        row + 1
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        batch.drop_columns(&self.config.drop_columns);

        let mut info = source.source_info();
        info.row_count = Some(batch.row_count());
        info!(path = %path.display(), rows = batch.row_count(), "Loaded split");
        Ok(LabelledSplit {
            features: batch,
            target,
            info,
        })
    }
}

/// Append the label as the last column.
/// Whether test R² `candidate` beats the current best. NaN ranks below every
/// number, so an undefined score never hides a later real one.
fn outranks(candidate: f64, best: f64) -> bool {
    let key = |r2: f64| if r2.is_nan() { f64::NEG_INFINITY } else { r2 };
    key(candidate) > key(best)
}

fn with_label(x: ArrayView2<'_, f64>, y: &[f64]) -> Result<Array2<f64>, MlError> {
    let label = ArrayView1::from(y).insert_axis(Axis(1));
    ndarray::concatenate(Axis(1), &[x.view(), label.view()])
        .map_err(|e| MlError::model(format!("cannot append label column: {e}")))
}

/// Split a labelled array back into features and label.
fn split_label(arr: &Array2<f64>) -> (ArrayView2<'_, f64>, Vec<f64>) {
    let last = arr.ncols().saturating_sub(1);
    (arr.slice(s![.., ..last]), arr.column(last).to_vec())
}

fn digest(path: &Path, bytes: &[u8]) -> ArtifactDigest {
    ArtifactDigest {
        path: path.to_path_buf(),
        sha256: persistence::hash_bytes(bytes),
        bytes: bytes.len(),
    }
}
