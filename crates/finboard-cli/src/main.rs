mod app;
mod commands;
mod views;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use finboard_core::Config;

use crate::app::App;
use crate::commands::Command;

/// Personal finance dashboard for the terminal
#[derive(Parser)]
#[command(name = "finboard", version, about)]
struct Cli {
    /// Keep credentials in memory only for this run
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Override the API base URL
    #[arg(long, global = true, env = "FINBOARD_API_BASE")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Initialize tracing with env-filter support.
///
/// Set `RUST_LOG=debug` for verbose output. Logs go to stderr, and also to
/// a daily file under `FINBOARD_LOG_DIR` when that is set. The returned
/// guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "finboard.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let _guard = init_tracing(std::env::var_os("FINBOARD_LOG_DIR").map(PathBuf::from));

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = Config::config_path()?;
    let mut config = Config::load_from(&config_path)?;
    config.apply_env();
    if let Some(base) = cli.api_base {
        config.api_base = base;
    }

    let mut app = App::new(config, config_path, cli.ephemeral)?;
    app.run(cli.command).await
}
