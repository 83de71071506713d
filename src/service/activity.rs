//! Assistant activity monitor.
//!
//! A second, coarser timer that runs beside the service loop: while the
//! appliance is in ai mode it probes the backend's speech-activity route
//! and forces a return to radio once the assistant has been silent long
//! enough. The only state it shares with the loop is the mode cell; probe
//! failures are ignored and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{BackendClient, OperatingMode};
use crate::service::ModeCell;

/// Probe cadence.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(1);

pub struct ActivityMonitor {
    backend: Arc<BackendClient>,
    mode: Arc<ModeCell>,
    silence_timeout: Duration,
}

impl ActivityMonitor {
    pub fn new(backend: Arc<BackendClient>, mode: Arc<ModeCell>, silence_timeout: Duration) -> Self {
        Self {
            backend,
            mode,
            silence_timeout,
        }
    }

    /// Run until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(CHECK_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.mode.load() != OperatingMode::Ai {
                continue;
            }

            match self.backend.activity().await {
                Ok(activity) => {
                    if activity.seconds_since_speech >= self.silence_timeout.as_secs_f64() {
                        info!(
                            "Assistant silent for {:.0}s, returning to radio mode",
                            activity.seconds_since_speech
                        );
                        match self.backend.set_mode(OperatingMode::Radio).await {
                            Ok(()) => self.mode.store(OperatingMode::Radio),
                            Err(err) => debug!("Mode reset failed, will retry: {}", err),
                        }
                    }
                }
                Err(err) => debug!("Activity probe failed: {}", err),
            }
        }

        debug!("Activity monitor stopped");
    }
}
