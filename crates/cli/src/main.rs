mod metrics;
mod observer;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flactory_core::{
    load_config_or_default, validate_config, Config, Encoder, EventDispatcher, FlacEncoder,
    Orchestrator,
};

use observer::{write_json_lines, ConsoleObserver};

/// Convert audio files to FLAC, several at a time.
#[derive(Debug, Parser)]
#[command(name = "flactory", version)]
struct Args {
    /// Source audio files. Each is written next to itself with a .flac extension.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// TOML configuration file.
    #[arg(short, long, env = "FLACTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the flac executable (overrides the config file).
    #[arg(short, long)]
    encoder: Option<PathBuf>,

    /// Maximum concurrent encoders (defaults to the number of CPUs).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Print events as JSON lines instead of status text.
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics after the run.
    #[arg(long)]
    metrics: bool,
}

impl Args {
    /// Applies command line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.encoder {
            config.encoder.path = path.clone();
        }
        if let Some(workers) = self.workers {
            config.pool.max_workers = Some(workers);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean for status lines and JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Runs one batch over the given files. Returns whether every file converted.
async fn run(args: Args) -> Result<bool> {
    let mut config = load_config_or_default(args.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    args.apply(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        encoder = ?config.encoder.path,
        workers = config.pool.worker_count(),
        "Configuration loaded"
    );

    let encoder = FlacEncoder::new(config.encoder.clone());
    if config.encoder.validate_on_startup {
        encoder
            .validate()
            .await
            .with_context(|| format!("Encoder {:?} is not usable", config.encoder.path))?;
    }

    let (orchestrator, events) = Orchestrator::new(&config, encoder);

    let presenter = if args.json {
        tokio::spawn(async move {
            if let Err(e) = write_json_lines(events, std::io::stdout()).await {
                warn!("Failed to write events: {}", e);
            }
        })
    } else {
        tokio::spawn(async move {
            EventDispatcher::new(events, ConsoleObserver::new(std::io::stdout()))
                .run()
                .await;
        })
    };

    let added = orchestrator.add_files(&args.files).await;
    for file in added.iter().filter(|f| f.already_existed) {
        warn!(source = ?file.source_path, "Duplicate path ignored");
    }

    let batch = orchestrator
        .convert_all()
        .await
        .context("Failed to start conversion")?;
    let summary = batch.wait().await.context("Conversion batch failed")?;

    orchestrator.shutdown().await;
    presenter.await.context("Event presenter task failed")?;

    info!(
        completed = summary.completed,
        failed = summary.failed,
        duration_ms = summary.duration_ms,
        "Batch finished"
    );

    if args.metrics {
        let counts = orchestrator.counts().await;
        metrics::collect_dynamic_metrics(&counts, &orchestrator.pool_status());
        print!("{}", metrics::encode_metrics()?);
    }

    Ok(summary.all_succeeded())
}
