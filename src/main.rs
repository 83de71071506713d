//! Smart Radio Bridge
//!
//! Daemon entry point: wires the encoder, tuner, mixer, and backend client
//! together and runs the polling loop plus the activity monitor until a
//! shutdown signal arrives.

use smart_radio_bridge::hw::{SampleSourceProvider, TunerPort};
use smart_radio_bridge::mixer::Mixer;
use smart_radio_bridge::{backend, config, mixer, service, tuner};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smart_radio_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting Smart Radio Bridge v{} ({})",
        env!("SRB_VERSION"),
        env!("SRB_GIT_SHA")
    );

    // Load configuration
    let config = config::load_config()?;
    tracing::info!("Configuration loaded, backend: {}", config.backend_url);

    let backend = Arc::new(backend::BackendClient::new(
        &config.backend_url,
        backend::DEFAULT_TIMEOUT,
    )?);
    match backend.health().await {
        Ok(()) => tracing::info!("Backend is reachable"),
        Err(e) => tracing::warn!(
            "Backend not reachable ({}), tuner actions will fall back to local control",
            e
        ),
    }

    // Hardware
    let (encoder_provider, tuner_port) = open_hardware(&config.i2c_device)?;

    let store = tuner::store::StateStore::new(config::get_data_dir());
    let mut tuner = tuner::Tuner::new(tuner_port, store, config.scan_step_mhz);
    if let Err(e) = tuner.resume() {
        tracing::warn!("Could not start the receiver: {}", e);
    }

    let mixer = mixer::AlsaMixer::new(config.mixer_control.clone());
    let initial_volume = mixer.read_volume().await.unwrap_or(50);
    tracing::info!("Current volume: {}%", initial_volume);

    // Shared operating mode + service tasks
    let mode = Arc::new(service::ModeCell::new(backend::OperatingMode::Radio));
    let settings = service::LoopSettings {
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        debounce_window: Duration::from_millis(config.debounce_ms),
        volume_step: config.volume_step,
        initial_volume,
    };

    let service = service::ServiceLoop::new(
        encoder_provider,
        tuner,
        Box::new(mixer),
        backend.clone(),
        mode.clone(),
        settings,
    )
    .context("failed to initialize encoder hardware")?;

    let monitor = service::activity::ActivityMonitor::new(
        backend,
        mode,
        Duration::from_secs(config.ai_silence_timeout_secs),
    );

    let shutdown = CancellationToken::new();
    let monitor_handle = tokio::spawn(monitor.run(shutdown.clone()));
    let service_handle = tokio::spawn(service.run(shutdown.clone()));

    shutdown_signal().await;
    tracing::info!("Shutting down...");
    shutdown.cancel();

    let _ = service_handle.await;
    let _ = monitor_handle.await;
    tracing::info!("Shutdown complete");

    Ok(())
}

#[cfg(target_os = "linux")]
fn open_hardware(device: &str) -> Result<(Box<dyn SampleSourceProvider>, Box<dyn TunerPort>)> {
    use smart_radio_bridge::hw::linux;

    let provider = Box::new(linux::I2cEncoderProvider::new(device));
    let port = linux::open_tuner(device)
        .with_context(|| format!("failed to open tuner on {}", device))?;
    Ok((provider, port))
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(_device: &str) -> Result<(Box<dyn SampleSourceProvider>, Box<dyn TunerPort>)> {
    anyhow::bail!("this bridge drives /dev/i2c devices and only runs on Linux")
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
