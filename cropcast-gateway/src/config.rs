//! Configuration for the HTTP gateway and the advisory text generator.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of recent predictions kept for `GET /history`.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// How long finished advisory reports stay retrievable.
    #[serde(default = "default_report_ttl_secs")]
    pub report_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_history: default_max_history(),
            report_ttl_secs: default_report_ttl_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_history() -> usize {
    50
}

fn default_report_ttl_secs() -> u64 {
    3600
}

/// Configuration for the external text-generation service used to write
/// advisory reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Whether `POST /advisory` is served at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key (optional, prefer `api_key_env`).
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Upper bound on one generation call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum tokens in the generated report.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl AdvisoryConfig {
    /// The API key from config, falling back to the configured environment
    /// variable. Empty values count as absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        let present = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(present)
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(present))
    }
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_output_tokens() -> u32 {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_history, 50);
        assert_eq!(config.report_ttl_secs, 3600);
    }

    #[test]
    fn test_api_key_prefers_config() {
        let config = AdvisoryConfig {
            api_key: Some("from-config".into()),
            api_key_env: "CROPCAST_TEST_UNSET_KEY_VAR".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-config"));
    }

    #[test]
    fn test_missing_or_blank_key_is_none() {
        let config = AdvisoryConfig {
            api_key_env: "CROPCAST_TEST_UNSET_KEY_VAR".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key(), None);

        let blank = AdvisoryConfig {
            api_key: Some("  ".into()),
            ..config
        };
        assert_eq!(blank.resolve_api_key(), None);
    }

    #[test]
    fn test_blank_config_key_falls_back_to_env() {
        let config = AdvisoryConfig {
            api_key: Some("  ".into()),
            api_key_env: "PATH".into(),
            ..Default::default()
        };
        let from_env = std::env::var("PATH").ok().filter(|v| !v.trim().is_empty());
        assert_eq!(config.resolve_api_key(), from_env);
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let config = AdvisoryConfig {
            api_key: Some("secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("GEMINI_API_KEY"));
    }
}
