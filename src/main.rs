//! model-trainer - select, tune and persist the best regression model

use clap::Parser;
use model_trainer::cli::{cmd_models, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_trainer=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { train, test, output, threshold, config, parallel } => {
            cmd_train(&train, &test, output.as_deref(), threshold, config.as_deref(), parallel)?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Commands::Models => {
            cmd_models()?;
        }
    }

    Ok(())
}
