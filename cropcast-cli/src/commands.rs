//! CLI subcommand handlers.

use crate::config::{CropcastConfig, load_config, workspace_config_path};
use crate::{Commands, ConfigAction, PredictArgs};
use anyhow::Context;
use cropcast_gateway::GatewayState;
use cropcast_ml::{Predictor, SchemaKind, Trainer, YieldQuery};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Train {
            train,
            test,
            artifacts,
            schema,
            threshold,
        } => {
            let overrides = TrainOverrides {
                train,
                test,
                artifacts,
                schema,
                threshold,
            };
            handle_train(load(workspace, config_path)?, overrides, workspace).await
        }
        Commands::Predict(args) => handle_predict(load(workspace, config_path)?, args).await,
        Commands::Serve { host, port } => {
            handle_serve(load(workspace, config_path)?, host, port).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Init => init_config(workspace),
            ConfigAction::Show => {
                let config = load(workspace, config_path)?;
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn load(workspace: &Path, config_path: Option<&Path>) -> anyhow::Result<CropcastConfig> {
    load_config(workspace, config_path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

fn init_config(workspace: &Path) -> anyhow::Result<()> {
    let config_path = workspace_config_path(workspace);
    if config_path.exists() {
        println!(
            "Configuration file already exists at: {}",
            config_path.display()
        );
        return Ok(());
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let toml_str = toml::to_string_pretty(&CropcastConfig::default())?;
    std::fs::write(&config_path, &toml_str)?;
    println!(
        "Created default configuration at: {}",
        config_path.display()
    );
    Ok(())
}

#[derive(Debug, Default)]
struct TrainOverrides {
    train: Option<PathBuf>,
    test: Option<PathBuf>,
    artifacts: Option<PathBuf>,
    schema: Option<SchemaKind>,
    threshold: Option<f64>,
}

impl TrainOverrides {
    fn apply(self, config: &mut CropcastConfig, workspace: &Path) {
        let training = &mut config.ml.training;
        if let Some(path) = self.train {
            training.train_path = path;
        }
        if let Some(path) = self.test {
            training.test_path = path;
        }
        if let Some(schema) = self.schema {
            training.schema = schema;
        }
        if let Some(threshold) = self.threshold {
            training.quality_threshold = threshold;
        }
        if let Some(dir) = self.artifacts {
            config.ml.artifacts.dir = dir;
        }
        config.ml.resolve_paths(workspace);
    }
}

async fn handle_train(
    mut config: CropcastConfig,
    overrides: TrainOverrides,
    workspace: &Path,
) -> anyhow::Result<()> {
    overrides.apply(&mut config, workspace);
    let mut trainer = Trainer::from_config(&config.ml);
    let outcome = tokio::task::spawn_blocking(move || trainer.run())
        .await
        .context("Training task panicked")?
        .context("Training failed")?;

    println!("R² score: {:.4}", outcome.score);
    println!("Model: {}", outcome.report.winner);
    println!("Artifacts: {}", outcome.paths.model.display());
    Ok(())
}

impl PredictArgs {
    fn query(&self) -> YieldQuery {
        YieldQuery {
            state_name: self.state.clone(),
            district_name: self.district.clone(),
            season: self.season.clone(),
            crop: self.crop.clone(),
            crop_year: self.year,
            area: self.area,
            annual_rainfall: self.rainfall,
            soil_ph: self.soil_ph,
            soil_type: self.soil_type.clone(),
        }
    }
}

async fn handle_predict(config: CropcastConfig, args: PredictArgs) -> anyhow::Result<()> {
    let query = args.query();
    let prediction = tokio::task::spawn_blocking(move || {
        let predictor = Predictor::from_config(&config.ml)?;
        predictor.predict(&query)
    })
    .await
    .context("Prediction task panicked")?
    .context("Prediction failed")?;
    let value = prediction
        .first()
        .copied()
        .context("Prediction returned no value")?;

    if args.json {
        let out = serde_json::json!({
            "prediction": value,
            "unit": "tonnes/hectare",
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Predicted yield: {value:.3} tonnes/hectare");
    }
    Ok(())
}

async fn handle_serve(
    mut config: CropcastConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    let predictor =
        Predictor::from_config(&config.ml).context("Failed to load prediction artifacts")?;
    if !predictor.artifacts_present() {
        tracing::warn!(
            dir = %config.ml.artifacts.dir.display(),
            "No trained artifacts found; predictions fail until `cropcast train` runs"
        );
    }
    let state = GatewayState::new(predictor, config.gateway, &config.advisory);
    cropcast_gateway::run(Arc::new(state))
        .await
        .context("Gateway server failed")
}
