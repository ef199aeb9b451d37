use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use training_console::{
    api::client::DownloadKind,
    commands::{analytics, dataset, predict, train, CommandContext},
    config::ConsoleConfig,
    error::{ConsoleError, Result},
    notify::ConsoleNotifier,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive and monitor image classifier training", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/console.yaml")]
    config: String,

    /// Log level, overrides `logging.level`
    #[arg(short, long)]
    log_level: Option<String>,

    /// Backend base URL, overrides `backend.base_url`
    #[arg(long)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start training and follow it until it ends
    Train {
        models: Vec<String>,
        /// Train every known model
        #[arg(long)]
        all: bool,
    },
    /// Show the current training snapshot
    Status,
    /// Ask the backend to stop training
    Stop,
    /// Show dataset statistics
    Dataset,
    /// Create class folders
    Folders {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Upload images into a class folder
    Upload {
        #[arg(short, long)]
        folder: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List models and whether they are trained
    Models,
    /// Classify one image with every trained model
    Predict { image: PathBuf },
    /// Compare trained models
    Compare,
    /// Print raw metrics of one model
    Metrics { model: String },
    /// Generate the analytics report
    Report,
    /// Download one artifact
    Download {
        kind: Artifact,
        name: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Download every available model, metrics file or chart
    DownloadAll {
        kind: BulkArtifact,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Artifact {
    Model,
    Metrics,
    Plot,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BulkArtifact {
    Models,
    Metrics,
    /// Comparison chart and per-model training histories
    Charts,
}

impl From<Artifact> for DownloadKind {
    fn from(artifact: Artifact) -> Self {
        match artifact {
            Artifact::Model => DownloadKind::Model,
            Artifact::Metrics => DownloadKind::Metrics,
            Artifact::Plot => DownloadKind::Plot,
        }
    }
}

impl From<BulkArtifact> for DownloadKind {
    fn from(artifact: BulkArtifact) -> Self {
        match artifact {
            BulkArtifact::Models => DownloadKind::Model,
            BulkArtifact::Metrics => DownloadKind::Metrics,
            BulkArtifact::Charts => DownloadKind::Plot,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ConsoleConfig::load(&args.config)?;
    if let Some(url) = &args.backend_url {
        config.backend.base_url = url.clone();
        config.validate()?;
    }

    // Initialize logging
    let level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level)?;

    let ctx = CommandContext::new(config, Arc::new(ConsoleNotifier))?;

    if let Err(e) = run(&ctx, args.command).await {
        error!("Command failed: {}", e);
        return Err(e.into());
    }

    info!("Done");
    Ok(())
}

async fn run(ctx: &CommandContext, command: Command) -> Result<()> {
    match command {
        Command::Train { models, all } => train::run_train(ctx, &models, all).await,
        Command::Status => train::run_status(ctx).await,
        Command::Stop => train::run_stop(ctx).await,
        Command::Dataset => dataset::run_dataset(ctx).await,
        Command::Folders { names } => dataset::run_create_folders(ctx, &names).await,
        Command::Upload { folder, files } => dataset::run_upload(ctx, &folder, &files).await,
        Command::Models => predict::run_models(ctx).await,
        Command::Predict { image } => predict::run_predict(ctx, &image).await,
        Command::Compare => analytics::run_compare(ctx).await,
        Command::Metrics { model } => analytics::run_metrics(ctx, &model).await,
        Command::Report => analytics::run_report(ctx).await,
        Command::Download { kind, name, out } => {
            analytics::run_download(ctx, kind.into(), &name, out.as_deref()).await
        }
        Command::DownloadAll { kind, out } => {
            analytics::run_download_all(ctx, kind.into(), out.as_deref()).await.map(|_| ())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConsoleError::Config(e.to_string()))?;

    Ok(())
}
