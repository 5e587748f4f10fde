//! Advisory report generation.
//!
//! An advisory job predicts the yield for a query, asks an external text
//! generator for agronomic advice around that prediction, and records the
//! outcome in the report store.

use crate::config::AdvisoryConfig;
use crate::error::GatewayError;
use crate::store::{ReportStatus, ReportStore};
use async_trait::async_trait;
use cropcast_ml::{Predictor, YieldQuery};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Produces free text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Text generator backed by a Gemini-style `generateContent` endpoint.
pub struct HttpTextGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
}

impl std::fmt::Debug for HttpTextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTextGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl HttpTextGenerator {
    /// Build from configuration. Fails with
    /// [`GatewayError::AdvisoryUnavailable`] when no API key is configured.
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, GatewayError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            GatewayError::AdvisoryUnavailable(format!(
                "no API key configured (set advisory.api_key or {})",
                config.api_key_env
            ))
        })?;
        Self::new_with_key(config, api_key)
    }

    pub fn new_with_key(config: &AdvisoryConfig, api_key: String) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": self.max_output_tokens },
        })
    }

    /// Concatenated text parts of the first candidate.
    fn parse_response(body: &Value) -> Result<String, GatewayError> {
        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| GatewayError::Generation("response has no candidates".to_string()))?;
        let text: String = candidate["content"]["parts"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|part| part["text"].as_str())
            .collect();
        if text.trim().is_empty() {
            return Err(GatewayError::Generation(
                "response contains no text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = self.endpoint_url();
        debug!(model = self.model.as_str(), "Sending advisory generation request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| GatewayError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| GatewayError::Generation(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(GatewayError::Generation(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body_text.chars().take(300).collect::<String>()
            )));
        }
        let body: Value = serde_json::from_str(&body_text)
            .map_err(|e| GatewayError::Generation(format!("invalid JSON in response: {e}")))?;
        Self::parse_response(&body)
    }
}

/// Prompt asking for advice around a predicted yield.
pub fn build_prompt(query: &YieldQuery, prediction: f64) -> String {
    let mut prompt = format!(
        "You are an agronomy advisor. A yield model predicts {prediction:.3} tonnes per hectare \
         for {crop} grown in {district}, {state} during the {season} season of {year}, \
         on {area} hectares with {rainfall} mm of annual rainfall.",
        crop = query.crop,
        district = query.district_name,
        state = query.state_name,
        season = query.season,
        year = query.crop_year,
        area = query.area,
        rainfall = query.annual_rainfall,
    );
    if let Some(ph) = query.soil_ph {
        prompt.push_str(&format!(" Soil pH is {ph}."));
    }
    if let Some(soil) = &query.soil_type {
        prompt.push_str(&format!(" Soil type is {soil}."));
    }
    prompt.push_str(
        "\nWrite a short advisory report: assess whether the predicted yield is good for this \
         crop and region, list the main risks, and give concrete practices to improve yield.",
    );
    prompt
}

/// Run one advisory job to completion and record the outcome under `id`.
pub async fn run_job(
    id: Uuid,
    query: YieldQuery,
    predictor: Arc<Predictor>,
    generator: Arc<dyn TextGenerator>,
    reports: Arc<dyn ReportStore>,
    timeout: Duration,
) {
    let status = match produce(id, &query, predictor, generator, &reports, timeout).await {
        Ok(report) => {
            info!(%id, "Advisory report ready");
            ReportStatus::Ready { report }
        }
        Err(e) => {
            warn!(%id, error = %e.chain(), "Advisory report failed");
            ReportStatus::Failed { reason: e.chain() }
        }
    };
    reports.set_status(&id, status);
}

async fn produce(
    id: Uuid,
    query: &YieldQuery,
    predictor: Arc<Predictor>,
    generator: Arc<dyn TextGenerator>,
    reports: &Arc<dyn ReportStore>,
    timeout: Duration,
) -> Result<String, GatewayError> {
    let prediction = crate::server::predict_blocking(predictor, query.clone()).await?;
    reports.set_prediction(&id, prediction);

    let prompt = build_prompt(query, prediction);
    tokio::time::timeout(timeout, generator.generate(&prompt))
        .await
        .map_err(|_| GatewayError::Timeout(timeout.as_secs()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> YieldQuery {
        YieldQuery {
            state_name: "Punjab".into(),
            district_name: "Ludhiana".into(),
            season: "Kharif".into(),
            crop: "Rice".into(),
            crop_year: 2014,
            area: 12.0,
            annual_rainfall: 780.0,
            soil_ph: Some(7.1),
            soil_type: None,
        }
    }

    #[test]
    fn test_prompt_mentions_query_and_prediction() {
        let prompt = build_prompt(&query(), 3.25);
        assert!(prompt.contains("3.250 tonnes per hectare"));
        assert!(prompt.contains("Rice grown in Ludhiana, Punjab"));
        assert!(prompt.contains("Soil pH is 7.1."));
        assert!(!prompt.contains("Soil type"));
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Sow " }, { "text": "early." }] } }]
        });
        assert_eq!(HttpTextGenerator::parse_response(&body).unwrap(), "Sow early.");
    }

    #[test]
    fn test_parse_response_rejects_empty() {
        assert!(HttpTextGenerator::parse_response(&json!({ "candidates": [] })).is_err());
        let blank = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert!(matches!(
            HttpTextGenerator::parse_response(&blank),
            Err(GatewayError::Generation(_))
        ));
    }

    #[test]
    fn test_missing_key_disables_generator() {
        let config = AdvisoryConfig {
            api_key: None,
            api_key_env: "CROPCAST_TEST_UNSET_KEY_VAR".into(),
            ..Default::default()
        };
        assert!(matches!(
            HttpTextGenerator::from_config(&config),
            Err(GatewayError::AdvisoryUnavailable(_))
        ));
    }

    #[test]
    fn test_endpoint_and_body() {
        let config = AdvisoryConfig {
            base_url: "http://localhost:9999/v1beta/".into(),
            ..Default::default()
        };
        let generator = HttpTextGenerator::new_with_key(&config, "k".into()).unwrap();
        assert_eq!(
            generator.endpoint_url(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
        let body = generator.request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }
}
