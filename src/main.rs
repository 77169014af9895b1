//! Car price predictor - Main Entry Point
//!
//! Offline training, the prediction server and batch prediction from one binary.

use clap::Parser;
use car_price_predictor::cli::{cmd_predict, cmd_serve, cmd_train, training_config, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "car_price_predictor=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, output, config, n_iter, cv_folds, test_size, seed } => {
            let config = training_config(
                config.as_deref(),
                data.as_deref(),
                output.as_deref(),
                n_iter,
                cv_folds,
                test_size,
                seed,
            )?;
            // Forest fitting is CPU-bound; keep it off the async workers
            tokio::task::spawn_blocking(move || cmd_train(config)).await??;
        }
        Commands::Serve { host, port, model, train_data } => {
            cmd_serve(&host, port, &model, train_data.as_deref()).await?;
        }
        Commands::Predict { model, input, output } => {
            cmd_predict(&model, &input, output.as_deref())?;
        }
    }

    Ok(())
}
