//! Gateway errors and their HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cropcast_ml::MlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The prediction pipeline failed for this query.
    #[error(transparent)]
    Prediction(#[from] MlError),

    #[error("Advisory reports are unavailable: {0}")]
    AdvisoryUnavailable(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Text generation timed out after {0}s")]
    Timeout(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Prediction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AdvisoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error message followed by every underlying cause not already
    /// spelled out in it.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.chain(), "Request failed");
        }
        let body = serde_json::json!({ "error": self.chain() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = GatewayError::from(MlError::inference(MlError::transformation("bad")));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            GatewayError::AdvisoryUnavailable("no key".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(GatewayError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_chain_includes_cause() {
        let err = GatewayError::from(MlError::inference(MlError::transformation(
            "missing fitted columns [Soil pH]",
        )));
        let chain = err.chain();
        assert!(chain.starts_with("Inference error"));
        assert!(chain.contains("Soil pH"));
    }
}
