//! Layered configuration for the `cropcast` binary.

use cropcast_gateway::{AdvisoryConfig, GatewayConfig};
use cropcast_ml::MlConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything the binary can be configured with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CropcastConfig {
    #[serde(default)]
    pub ml: MlConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
}

/// `<workspace>/.cropcast/config.toml`
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".cropcast").join("config.toml")
}

/// Load configuration from defaults, the user config, the workspace config,
/// an explicit file and `CROPCAST_*` environment variables, later layers
/// winning. Relative paths are resolved against `workspace`.
pub fn load_config(
    workspace: &Path,
    explicit: Option<&Path>,
) -> Result<CropcastConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(CropcastConfig::default()));

    // User-level config
    if let Some(dirs) = directories::ProjectDirs::from("dev", "cropcast", "cropcast") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    let ws_config = workspace_config_path(workspace);
    if ws_config.exists() {
        figment = figment.merge(Toml::file(&ws_config));
    }

    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (CROPCAST_ML__TRAINING__QUALITY_THRESHOLD, CROPCAST_GATEWAY__PORT, ...)
    figment = figment.merge(Env::prefixed("CROPCAST_").split("__"));

    let mut config: CropcastConfig = figment.extract().map_err(Box::new)?;
    config.ml.resolve_paths(workspace);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcast_ml::SchemaKind;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_resolve_against_workspace() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.ml.artifacts.dir, dir.path().join("artifacts"));
        assert_eq!(
            config.ml.training.train_path,
            dir.path().join("artifacts").join("train.csv")
        );
        assert_eq!(config.gateway.port, 8080);
        assert!(config.advisory.enabled);
    }

    #[test]
    fn test_workspace_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = workspace_config_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"
[ml.training]
quality_threshold = 0.75
schema = "serving"

[gateway]
port = 9090
"#,
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.ml.training.quality_threshold, 0.75);
        assert_eq!(config.ml.training.schema, SchemaKind::Serving);
        assert_eq!(config.ml.training.target_column, "yield");
        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.gateway.host, "127.0.0.1");
    }

    #[test]
    fn test_explicit_file_wins_over_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = workspace_config_path(dir.path());
        std::fs::create_dir_all(ws.parent().unwrap()).unwrap();
        std::fs::write(&ws, "[gateway]\nport = 9090\nmax_history = 5\n").unwrap();
        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[gateway]\nport = 7070\n").unwrap();

        let config = load_config(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.gateway.port, 7070);
        assert_eq!(config.gateway.max_history, 5);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path(), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let explicit = dir.path().join("cfg.toml");
        std::fs::write(
            &explicit,
            format!(
                "[ml.artifacts]\ndir = {:?}\n",
                elsewhere.path().display().to_string()
            ),
        )
        .unwrap();
        let config = load_config(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(config.ml.artifacts.dir, elsewhere.path());
    }
}
