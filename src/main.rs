//! Cadence - in-process job scheduler
//!
//! Main entry point for the Cadence CLI.

mod cli;
mod cmd_config;
mod cmd_run;
mod register;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cadence_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands, cadence_dir, default_config_path};

/// Initialize tracing with console and optional file output.
///
/// Log files rotate daily under `logging.log_dir` (default ~/.cadence/logs/).
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = if logging.file_enabled {
        let log_dir = logging
            .log_dir
            .as_deref()
            .map(|dir| ConfigLoader::expand_path(dir).into())
            .unwrap_or_else(|| cadence_dir().join("logs"));
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("cadence")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Flushes buffered lines on exit.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = ConfigLoader::load_or_default(&config_path)?;
            init_tracing(&config.logging)?;
            tracing::info!("Loaded configuration from {}", config_path.display());
            cmd_run::run_scheduler(config).await
        }
        Commands::Classes { format } => cmd_config::list_classes(&format),
        Commands::CheckConfig => cmd_config::check_config(&config_path),
    }
}
