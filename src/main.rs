//! cimon Binary Entry Point
//!
//! Loads the configuration, builds collectors and outputs, and drives the
//! run loop until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cimon::{
    RunLoop,
    collector::CollectorRegistry,
    config::{AppConfig, parse_duration},
    output::OutputRegistry,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// cimon - CI Monitor
#[derive(Parser, Debug)]
#[command(name = "cimon", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", env = "CIMON_CONFIG")]
    config: PathBuf,

    /// Run a single cycle, ignoring the operating window, and exit
    #[arg(long)]
    once: bool,

    /// Polling interval (overrides config file), e.g. "30s"
    #[arg(long, env = "CIMON_POLLING_INTERVAL", value_parser = parse_duration)]
    polling_interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cimon=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!(path = %cli.config.display(), "Loading configuration");
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(interval) = cli.polling_interval {
        config = config.with_polling_interval(interval);
        config.validate()?;
    }

    let orchestrator =
        config.build_orchestrator(&CollectorRegistry::builtin(), &OutputRegistry::builtin())?;
    tracing::info!(?orchestrator, "Collectors and outputs ready");

    let window = config.operating_window()?;
    let run_loop = RunLoop::new(Arc::new(orchestrator), window, config.polling_interval);

    if cli.once {
        run_loop.run_once().await;
        run_loop.orchestrator().close().await;
        return Ok(());
    }

    let stop = run_loop.stop_handle();
    let mut task = tokio::spawn(run_loop.run());

    tokio::select! {
        joined = &mut task => {
            joined?;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    tracing::info!("Stopping after the current cycle, signal again to exit immediately");
    stop.stop();

    tokio::select! {
        joined = &mut task => {
            let cycles = joined?;
            tracing::info!(cycles, "Shutdown complete");
        }
        _ = shutdown_signal() => {
            tracing::warn!("Second signal received, exiting without waiting");
            std::process::exit(130);
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
