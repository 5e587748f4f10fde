//! Cropcast CLI: train the crop yield model, predict, and serve predictions.

mod commands;
mod config;

use clap::Parser;
use cropcast_ml::SchemaKind;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Cropcast: crop yield prediction
#[derive(Parser, Debug)]
#[command(name = "cropcast", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Train the yield model and persist its artifacts
    Train {
        /// Training split CSV
        #[arg(long)]
        train: Option<PathBuf>,
        /// Test split CSV
        #[arg(long)]
        test: Option<PathBuf>,
        /// Artifact directory
        #[arg(long)]
        artifacts: Option<PathBuf>,
        /// Feature schema: training or serving
        #[arg(long)]
        schema: Option<SchemaKind>,
        /// Minimum test R² to accept the model
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Predict the yield of one record
    Predict(PredictArgs),
    /// Serve predictions over HTTP
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct PredictArgs {
    /// State name
    #[arg(long)]
    state: String,
    /// District name
    #[arg(long)]
    district: String,
    /// Season, e.g. Kharif or Rabi
    #[arg(long)]
    season: String,
    /// Crop name
    #[arg(long)]
    crop: String,
    /// Crop year
    #[arg(long)]
    year: i32,
    /// Cultivated area in hectares
    #[arg(long)]
    area: f64,
    /// Annual rainfall in mm
    #[arg(long)]
    rainfall: f64,
    /// Soil pH
    #[arg(long)]
    soil_ph: Option<f64>,
    /// Soil type
    #[arg(long)]
    soil_type: Option<String>,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file to the workspace
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "cropcast", "cropcast")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "cropcast.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
