//! Fault-tolerant service loop.
//!
//! A state machine over Running / Reinitializing / Degraded / Stopped driving
//! a fixed-interval cooperative poll: one iteration reads one sample, runs
//! event extraction, and dispatches the resulting commands. Scan and mode
//! actions try the backend first and fall back to local actuation; sample
//! faults feed a two-tier reinitialization backoff. Hardware and network
//! faults degrade behavior but never terminate the loop; only the shutdown
//! token reaches Stopped.

pub mod activity;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, OperatingMode};
use crate::events::{ButtonDebouncer, RotationFilter};
use crate::hw::{HwError, SampleSource, SampleSourceProvider};
use crate::mapper::{Command, CommandMapper};
use crate::mixer::Mixer;
use crate::tuner::Tuner;

/// Consecutive sample failures that trigger hardware reinitialization.
pub const FAILURE_THRESHOLD: u32 = 100;
/// Pause before a reinitialization attempt.
pub const REINIT_DELAY: Duration = Duration::from_secs(5);
/// Pause between attempts once degraded.
pub const DEGRADED_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Breathing room after a failed sample read.
const FAILURE_BACKOFF: Duration = Duration::from_millis(100);
/// Minimum spacing of repeated bus-fault error lines.
const FAILURE_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Service loop lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Reinitializing,
    Degraded,
    Stopped,
}

/// Bus-fault bookkeeping. The counter resets on any successful sample read.
#[derive(Debug, Default)]
pub struct ServiceHealth {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
    last_logged_at: Option<Instant>,
}

impl ServiceHealth {
    fn record_failure(&mut self, err: &HwError) {
        self.consecutive_failures += 1;
        let now = Instant::now();
        self.last_failure_at = Some(now);

        let should_log = self
            .last_logged_at
            .map_or(true, |at| now.duration_since(at) >= FAILURE_LOG_INTERVAL);
        if should_log {
            warn!(
                "Encoder read failed: {} ({} consecutive)",
                err, self.consecutive_failures
            );
            self.last_logged_at = Some(now);
        }
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.last_logged_at = None;
    }
}

/// Lock-free cell holding the operating mode, the single mutable field
/// shared between the service loop and the activity monitor.
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub fn new(mode: OperatingMode) -> Self {
        Self(AtomicU8::new(Self::encode(mode)))
    }

    fn encode(mode: OperatingMode) -> u8 {
        match mode {
            OperatingMode::Radio => 0,
            OperatingMode::Ai => 1,
        }
    }

    pub fn load(&self) -> OperatingMode {
        match self.0.load(Ordering::SeqCst) {
            0 => OperatingMode::Radio,
            _ => OperatingMode::Ai,
        }
    }

    pub fn store(&self, mode: OperatingMode) {
        self.0.store(Self::encode(mode), Ordering::SeqCst);
    }
}

/// Loop tunables.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub debounce_window: Duration,
    pub volume_step: u8,
    /// Mixer level mirrored at startup.
    pub initial_volume: u8,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            debounce_window: crate::events::DEBOUNCE_WINDOW,
            volume_step: crate::mapper::DEFAULT_VOLUME_STEP,
            initial_volume: 50,
        }
    }
}

enum ScanDirection {
    Up,
    Down,
}

pub struct ServiceLoop {
    provider: Box<dyn SampleSourceProvider>,
    sampler: Box<dyn SampleSource>,
    rotation: RotationFilter,
    buttons: ButtonDebouncer,
    mapper: CommandMapper,
    mixer: Box<dyn Mixer>,
    tuner: Tuner,
    backend: Arc<BackendClient>,
    mode: Arc<ModeCell>,
    health: ServiceHealth,
    state: ServiceState,
    state_tx: watch::Sender<ServiceState>,
    poll_interval: Duration,
}

impl ServiceLoop {
    /// Connect the sample source and assemble the loop. A failed initial
    /// connect is fatal; recovery backoff only covers an encoder that
    /// worked once.
    pub fn new(
        mut provider: Box<dyn SampleSourceProvider>,
        tuner: Tuner,
        mixer: Box<dyn Mixer>,
        backend: Arc<BackendClient>,
        mode: Arc<ModeCell>,
        settings: LoopSettings,
    ) -> Result<Self, HwError> {
        let sampler = provider.connect()?;
        let (state_tx, _) = watch::channel(ServiceState::Running);
        Ok(Self {
            provider,
            sampler,
            rotation: RotationFilter::new(0),
            buttons: ButtonDebouncer::new(settings.debounce_window),
            mapper: CommandMapper::new(settings.initial_volume, settings.volume_step),
            mixer,
            tuner,
            backend,
            mode,
            health: ServiceHealth::default(),
            state: ServiceState::Running,
            state_tx,
            poll_interval: settings.poll_interval,
        })
    }

    /// Observe lifecycle transitions (used by tests and status reporting).
    pub fn state_watch(&self) -> watch::Receiver<ServiceState> {
        self.state_tx.subscribe()
    }

    fn set_state(&mut self, state: ServiceState) {
        if self.state != state {
            debug!("Service state: {:?} -> {:?}", self.state, state);
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    /// Drive the loop until the shutdown token fires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "Service loop started ({} ms poll interval)",
            self.poll_interval.as_millis()
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_cancelled() && self.state != ServiceState::Stopped {
                self.enter_stopped().await;
            }
            match self.state {
                ServiceState::Running => {
                    tokio::select! {
                        _ = shutdown.cancelled() => self.enter_stopped().await,
                        _ = ticker.tick() => self.tick().await,
                    }
                }
                ServiceState::Reinitializing => {
                    if pause(REINIT_DELAY, &shutdown).await {
                        self.attempt_reinit();
                    }
                }
                ServiceState::Degraded => {
                    if pause(DEGRADED_RETRY_DELAY, &shutdown).await {
                        self.attempt_reinit();
                    }
                }
                ServiceState::Stopped => break,
            }
        }

        info!("Service loop stopped");
    }

    /// One poll iteration: sample, extract, dispatch.
    async fn tick(&mut self) {
        let sample = match self.sampler.sample() {
            Ok(sample) => sample,
            Err(err) => {
                self.health.record_failure(&err);
                if self.health.consecutive_failures >= FAILURE_THRESHOLD {
                    warn!(
                        "{} consecutive bus failures, reinitializing encoder",
                        self.health.consecutive_failures
                    );
                    self.set_state(ServiceState::Reinitializing);
                } else {
                    tokio::time::sleep(FAILURE_BACKOFF).await;
                }
                return;
            }
        };
        self.health.reset();

        let rotation = self.rotation.update(sample.position);
        let buttons = self.buttons.update(sample.buttons, Instant::now());
        for command in self.mapper.map(rotation, &buttons) {
            self.dispatch(command).await;
        }
    }

    /// Recreate the encoder handle. Success resumes polling with clean
    /// counters; failure degrades to the slow retry tier.
    fn attempt_reinit(&mut self) {
        info!("Reinitializing encoder hardware");
        match self.provider.connect() {
            Ok(sampler) => {
                self.sampler = sampler;
                self.health.reset();
                self.set_state(ServiceState::Running);
                info!("Encoder reinitialized");
            }
            Err(err) => {
                warn!(
                    "Encoder reinitialization failed ({}), retrying in {:?}",
                    err, DEGRADED_RETRY_DELAY
                );
                self.set_state(ServiceState::Degraded);
            }
        }
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::SetVolume { percent } => {
                debug!("Volume {}%", percent);
                if let Err(err) = self.mixer.set_volume(percent).await {
                    warn!("Mixer update failed: {}", err);
                }
            }
            Command::TuneStep { steps } => {
                if let Err(err) = self.tuner.step(steps) {
                    warn!("Dial tune failed: {}", err);
                }
            }
            Command::ScanUp => self.scan(ScanDirection::Up).await,
            Command::ScanDown => self.scan(ScanDirection::Down).await,
            Command::ToggleOperatingMode => self.toggle_mode().await,
        }
    }

    /// One backend attempt, then the local tuner. The remote failure is not
    /// retried within the iteration.
    async fn scan(&mut self, direction: ScanDirection) {
        let (label, remote) = match direction {
            ScanDirection::Up => ("up", self.backend.scan_up().await),
            ScanDirection::Down => ("down", self.backend.scan_down().await),
        };
        match remote {
            Ok(resp) => {
                if resp.message.is_empty() {
                    info!("Backend scan {} done", label);
                } else {
                    info!("Backend scan {}: {}", label, resp.message);
                }
            }
            Err(err) => {
                warn!("Backend scan {} failed ({}), using local tuner", label, err);
                let local = match direction {
                    ScanDirection::Up => self.tuner.scan_up(),
                    ScanDirection::Down => self.tuner.scan_down(),
                };
                if let Err(err) = local {
                    warn!("Local scan fallback failed: {}", err);
                }
            }
        }
    }

    /// Flip radio/ai through the backend; when it is unreachable, mute or
    /// resume the tuner directly so the button still does something.
    async fn toggle_mode(&mut self) {
        let target = self.mode.load().toggled();
        info!("Switching to {} mode", target.as_str());
        match self.backend.set_mode(target).await {
            Ok(()) => self.mode.store(target),
            Err(err) => {
                warn!("Backend mode change failed ({}), using local tuner", err);
                let local = match target {
                    OperatingMode::Ai => self.tuner.mute(),
                    OperatingMode::Radio => self.tuner.resume(),
                };
                match local {
                    Ok(()) => self.mode.store(target),
                    Err(err) => warn!("Local mode fallback failed: {}", err),
                }
            }
        }
    }

    /// Shutdown transition: best-effort return to the default mode, then let
    /// the hardware handles drop with the loop.
    async fn enter_stopped(&mut self) {
        if self.mode.load() != OperatingMode::Radio {
            info!("Returning to radio mode before shutdown");
            if let Err(err) = self.backend.set_mode(OperatingMode::Radio).await {
                warn!("Backend mode reset failed ({}), resuming tuner locally", err);
                if let Err(err) = self.tuner.resume() {
                    warn!("Local resume failed: {}", err);
                }
            }
            self.mode.store(OperatingMode::Radio);
        }
        self.set_state(ServiceState::Stopped);
    }
}

/// Wait out a backoff delay; false when shutdown fired first.
async fn pause(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
