//! Inference adapter: turn one serving query into a yield prediction.

pub mod cache;
pub mod pipeline;
pub mod predictor;
pub mod query;

pub use cache::{ArtifactCache, LoadedArtifacts};
pub use pipeline::PredictPipeline;
pub use predictor::Predictor;
pub use query::YieldQuery;
