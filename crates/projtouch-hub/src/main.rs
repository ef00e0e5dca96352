//! projtouch-hub binary.
//!
//! Wires sensing, normalization, calibration, and the WebSocket fan-out into
//! one process: load config, restore any persisted calibration, optionally
//! start the sensing workers, then serve subscribers until a shutdown signal
//! arrives.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use projtouch_hub::application::calibrate::CalibrationService;
use projtouch_hub::application::manage_sensing::SensingController;
use projtouch_hub::domain::config::HubConfig;
use projtouch_hub::infrastructure::network::registry::SubscriberRegistry;
use projtouch_hub::infrastructure::network::ws_server;
use projtouch_hub::infrastructure::sensing::mock::SyntheticBackend;
use projtouch_hub::infrastructure::sensing::{DeviceBackend, SensingBackend};
use projtouch_hub::infrastructure::storage::calibration::CalibrationStore;
use projtouch_hub::infrastructure::storage::config::load_config;
use tracing_subscriber::EnvFilter;

/// Event hub for an interactive projection surface.
#[derive(Debug, Parser)]
#[command(name = "projtouch-hub", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "projtouch.toml", env = "PROJTOUCH_CONFIG")]
    config: PathBuf,

    /// Override the configured WebSocket bind address.
    #[arg(long, env = "PROJTOUCH_BIND")]
    bind: Option<String>,

    /// Start the sensing workers immediately instead of waiting for an
    /// explicit start.
    #[arg(long)]
    start_sensing: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn select_backend(config: &HubConfig) -> Arc<dyn SensingBackend> {
    if config.detection.synthetic {
        tracing::info!("using synthetic sensing backend");
        Arc::new(SyntheticBackend::default())
    } else {
        Arc::new(DeviceBackend)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    tracing::info!(bind_addr = %config.bind_addr, "starting projtouch hub");

    let calibration = CalibrationService::new(CalibrationStore::new(&config.calibration_path));
    calibration.load_persisted().await;

    let registry = Arc::new(SubscriberRegistry::new());
    let mut controller = SensingController::new(calibration.transform(), Arc::clone(&registry));

    if cli.start_sensing {
        controller.start_all(&config, select_backend(&config));
    }

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown_flag.store(false, Ordering::Relaxed);
        }
    });

    ws_server::run_server(&config.bind_addr, registry, running).await?;

    controller.shutdown();
    tracing::info!("hub stopped");
    Ok(())
}
