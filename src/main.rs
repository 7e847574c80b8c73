//! Regression pipeline - Main Entry Point

use clap::Parser;
use regress_pipeline::cli::{cmd_predict, cmd_serve, cmd_train, Cli, Commands, ServeArgs, TrainArgs};
use regress_pipeline::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = logging::init(&cli.log_dir)?;
    tracing::debug!(path = %log_path.display(), "Logging to file");

    let result = match cli.command {
        Commands::Train { config, data, artifacts, seed, quality_floor, no_search } => {
            let args = TrainArgs { config, data, artifacts, seed, quality_floor, no_search };
            tokio::task::spawn_blocking(move || cmd_train(args)).await?
        }
        Commands::Predict { fields, data, artifacts } => {
            cmd_predict(&fields, data.as_deref(), artifacts.as_deref())
        }
        Commands::Serve { config, host, port, artifacts } => {
            cmd_serve(ServeArgs { config, host, port, artifacts }).await
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
