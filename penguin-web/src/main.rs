//! Penguin classifier (penguin-web) - Main entry point
//!
//! `serve` runs the web UI, `train` builds the model artifact from the
//! seed dataset, `fetch` downloads the seed dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use penguin_common::config::{resolve_root_folder, DataPaths, TomlConfig, CONFIG_FILE_ENV};
use penguin_web::fetch::{fetch_seed, FetchOutcome, PALMER_PENGUINS_URL};
use penguin_web::training::{run_training, TrainingConfig};
use penguin_web::{build_router, AppState};

/// Command-line arguments for penguin-web
#[derive(Parser, Debug)]
#[command(name = "penguin-web")]
#[command(about = "Penguin species classifier")]
#[command(version)]
struct Args {
    /// Root folder holding data, model and report files
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, global = true, env = CONFIG_FILE_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web UI (default)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,
    },
    /// Train the classifier from the seed dataset
    Train,
    /// Download the seed dataset if it is not present
    Fetch {
        #[arg(long, default_value = PALMER_PENGUINS_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("penguin_web={level},penguin_common={level},tower_http={level}").into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    info!("Root folder: {}", root_folder.display());
    let paths = DataPaths::under(root_folder);

    match args.command.unwrap_or(Command::Serve {
        port: None,
        host: None,
    }) {
        Command::Serve { port, host } => serve(config, paths, port, host).await,
        Command::Train => train(paths).await,
        Command::Fetch { url } => fetch(paths, &url).await,
    }
}

async fn serve(
    config: TomlConfig,
    paths: DataPaths,
    port: Option<u16>,
    host: Option<String>,
) -> Result<()> {
    paths
        .ensure_directories()
        .context("Failed to create data folders")?;

    if !paths.seed.exists() {
        warn!(
            "No seed dataset at {} (run `penguin-web fetch`)",
            paths.seed.display()
        );
    }
    if !paths.model.exists() {
        warn!(
            "No trained model at {} (run `penguin-web train`)",
            paths.model.display()
        );
    }

    let addr = format!(
        "{}:{}",
        host.unwrap_or(config.host),
        port.unwrap_or(config.port)
    );
    let app = build_router(AppState::new(paths, config.table_row_limit));

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn train(paths: DataPaths) -> Result<()> {
    let outcome = tokio::task::spawn_blocking(move || {
        run_training(&paths, &TrainingConfig::default())
    })
    .await
    .context("Training task failed")??;

    info!(
        best_c = outcome.best_c,
        train = outcome.train_size,
        test = outcome.test_size,
        accuracy = outcome.report.accuracy,
        cross_val_accuracy = outcome.report.cross_val_accuracy,
        "Model trained"
    );
    Ok(())
}

async fn fetch(paths: DataPaths, url: &str) -> Result<()> {
    match fetch_seed(url, &paths.seed).await? {
        FetchOutcome::AlreadyPresent => {}
        FetchOutcome::Downloaded { rows } => info!(rows, "Download complete"),
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
