//! cachet-monitor - URL monitor reporting to a Cachet status page.
//!
//! Main entry point for the cachet-monitor CLI.

mod cli;
mod cmd_config;
mod cmd_run;
mod server;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, LogFormat};
use crate::cmd_run::RunOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            status_addr,
            log_dir,
            log_format,
            shutdown_deadline,
        } => {
            init_tracing(log_format, log_dir.as_deref())?;
            cmd_run::run(RunOptions {
                config: &config,
                status_addr,
                shutdown_deadline: shutdown_deadline.map(Duration::from_secs),
            })
            .await
        }
        Commands::Validate { config } => {
            init_tracing(LogFormat::Text, None)?;
            cmd_config::run_validate(&config)
        }
        Commands::GenerateConfig {
            api_url,
            token,
            output,
        } => {
            init_tracing(LogFormat::Text, None)?;
            cmd_config::run_generate_config(&api_url, &token, &output).await
        }
    }
}

/// Initialize tracing: console output, plus daily-rotated files when
/// `log_dir` is given.
fn init_tracing(format: LogFormat, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = match format {
        LogFormat::Text => fmt::layer().with_target(true).with_ansi(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    };

    let file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("cachet-monitor")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;

            // The guard flushes on drop; keep it for the life of the process.
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    Ok(())
}
