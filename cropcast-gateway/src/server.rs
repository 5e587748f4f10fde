//! HTTP gateway built on axum.

use crate::advisory::{self, HttpTextGenerator, TextGenerator};
use crate::config::{AdvisoryConfig, GatewayConfig};
use crate::error::GatewayError;
use crate::history::PredictionHistory;
use crate::store::{AdvisoryReport, InMemoryReportStore, ReportStore};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use cropcast_ml::{Predictor, YieldQuery};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared state behind every handler.
pub struct GatewayState {
    pub predictor: Arc<Predictor>,
    pub reports: Arc<dyn ReportStore>,
    pub history: PredictionHistory,
    /// `None` when advisories are disabled or no API key is configured.
    pub advisor: Option<Arc<dyn TextGenerator>>,
    pub config: GatewayConfig,
    pub advisory_timeout: Duration,
    started_at: chrono::DateTime<Utc>,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("config", &self.config)
            .field("reports", &self.reports.len())
            .field("history", &self.history.len())
            .field("advisor", &self.advisor.is_some())
            .finish()
    }
}

impl GatewayState {
    /// Assemble the state with an in-memory report store and, when a key is
    /// available, the HTTP text generator.
    pub fn new(predictor: Predictor, config: GatewayConfig, advisory: &AdvisoryConfig) -> Self {
        let advisor: Option<Arc<dyn TextGenerator>> = if advisory.enabled {
            match HttpTextGenerator::from_config(advisory) {
                Ok(generator) => Some(Arc::new(generator)),
                Err(e) => {
                    tracing::warn!(error = %e, "Advisory reports disabled");
                    None
                }
            }
        } else {
            None
        };
        let reports = Arc::new(InMemoryReportStore::new(config.report_ttl_secs));
        Self::with_parts(predictor, config, reports, advisor, advisory.timeout_secs)
    }

    /// Assemble the state from explicit collaborators.
    pub fn with_parts(
        predictor: Predictor,
        config: GatewayConfig,
        reports: Arc<dyn ReportStore>,
        advisor: Option<Arc<dyn TextGenerator>>,
        advisory_timeout_secs: u64,
    ) -> Self {
        Self {
            predictor: Arc::new(predictor),
            reports,
            history: PredictionHistory::new(config.max_history),
            advisor,
            config,
            advisory_timeout: Duration::from_secs(advisory_timeout_secs),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the gateway router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .route("/history", get(history_handler))
        .route("/advisory", post(advisory_handler))
        .route("/advisory/{id}", get(advisory_status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a prediction on the blocking pool and unwrap the single value.
pub(crate) async fn predict_blocking(
    predictor: Arc<Predictor>,
    query: YieldQuery,
) -> Result<f64, GatewayError> {
    let prediction = tokio::task::spawn_blocking(move || predictor.predict(&query))
        .await
        .map_err(|e| GatewayError::Internal(format!("prediction task failed: {e}")))??;
    prediction
        .first()
        .copied()
        .ok_or_else(|| GatewayError::Internal("empty prediction".to_string()))
}

async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": state.predictor.artifacts_present(),
        "advisory_enabled": state.advisor.is_some(),
        "uptime_secs": state.uptime_secs(),
    }))
}

async fn predict_handler(
    State(state): State<SharedState>,
    Json(query): Json<YieldQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let prediction = predict_blocking(Arc::clone(&state.predictor), query.clone()).await?;
    state.history.push(query, prediction);
    Ok(Json(serde_json::json!({
        "prediction": prediction,
        "unit": "tonnes/hectare",
    })))
}

async fn history_handler(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.history.recent())
}

async fn advisory_handler(
    State(state): State<SharedState>,
    Json(query): Json<YieldQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let generator = state.advisor.clone().ok_or_else(|| {
        GatewayError::AdvisoryUnavailable("no text generator configured".to_string())
    })?;

    let evicted = state.reports.evict_expired(Utc::now());
    if evicted > 0 {
        tracing::debug!(evicted, "Evicted expired advisory reports");
    }

    let id = Uuid::new_v4();
    state
        .reports
        .insert(AdvisoryReport::pending(id, query.clone()));
    tokio::spawn(advisory::run_job(
        id,
        query,
        Arc::clone(&state.predictor),
        generator,
        Arc::clone(&state.reports),
        state.advisory_timeout,
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "id": id, "status": "pending" })),
    ))
}

async fn advisory_status_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .reports
        .get(&id)
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("advisory report {id}")))
}

/// Serve the gateway on the configured address until cancelled.
pub async fn run(state: SharedState) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
