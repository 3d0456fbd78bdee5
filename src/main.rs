//! chartqa CLI entry point.

use anyhow::Result;
use chartqa::cli::commands::{self, ChartOptions};
use chartqa::cli::{Cli, Commands};
use chartqa::config::Settings;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // OPENAI_API_KEY may come from a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging; RUST_LOG wins, then -v, then general.log_level
    let log_level = settings.general.effective_log_level(cli.verbose);

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("chartqa={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Ask { question, model } => {
            commands::run_ask(question, model.clone(), settings).await?;
        }

        Commands::Chart {
            kind,
            data,
            title,
            x_label,
            y_label,
            color,
        } => {
            let options = ChartOptions {
                title: title.clone(),
                x_label: x_label.clone(),
                y_label: y_label.clone(),
                color: color.clone(),
            };
            commands::run_chart((*kind).into(), data, options, &settings)?;
        }

        Commands::Index { rebuild } => {
            commands::run_index(*rebuild, settings).await?;
        }

        Commands::Query { index, question } => {
            commands::run_query(index, question, settings).await?;
        }

        Commands::Tools { question } => {
            commands::run_tools(question.as_deref(), settings).await?;
        }

        Commands::Latest { since_secs } => {
            commands::run_latest(*since_secs, &settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
