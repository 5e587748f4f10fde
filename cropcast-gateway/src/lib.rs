//! # cropcast-gateway: yield prediction over HTTP
//!
//! Serves single-record predictions from the persisted artifacts, keeps a
//! bounded history of recent predictions, and runs advisory report jobs that
//! pair a prediction with generated agronomic advice.

pub mod advisory;
pub mod config;
pub mod error;
pub mod history;
pub mod server;
pub mod store;

pub use advisory::{HttpTextGenerator, TextGenerator};
pub use config::{AdvisoryConfig, GatewayConfig};
pub use error::GatewayError;
pub use history::{PredictionHistory, PredictionRecord};
pub use server::{GatewayState, SharedState, router, run};
pub use store::{AdvisoryReport, InMemoryReportStore, ReportStatus, ReportStore};
