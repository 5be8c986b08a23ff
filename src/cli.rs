/// # watch-upload CLI Interface (Module)
///
/// Command parsing and the async entrypoint. All domain logic (watching,
/// bucket initialization, uploads) lives in `watch-upload-core`; this module
/// only loads config, builds the storage client and hands both to the service.
///
/// - For command-line users: run the `watch-upload` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::load_config::load_config;
use crate::upload::S3Store;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use watch_upload_core::service::{serve, UploadService};

/// CLI for watch-upload: push new files from a directory into a bucket.
#[derive(Parser)]
#[clap(
    name = "watch-upload",
    version,
    about = "Watch a directory and upload every newly created file to an S3-compatible bucket"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the configured directory until interrupted (Ctrl-C)
    Watch {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Watch { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "watch", "Starting watch service");
            let store = S3Store::connect(&config.storage).await;
            let service = UploadService::new(config, store);
            match serve(service, interrupted()).await {
                Ok(()) => {
                    tracing::info!(command = "watch", "Watch service stopped");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "watch", error = %e, "Watch service failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
