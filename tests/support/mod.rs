//! Shared fixtures for integration tests: scripted hardware fakes and an
//! in-process mock backend.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use smart_radio_bridge::events::{ButtonId, RawSample};
use smart_radio_bridge::hw::{HwError, SampleSource, SampleSourceProvider, TunerPort};
use smart_radio_bridge::mixer::Mixer;
use smart_radio_bridge::tuner::store::StateStore;
use smart_radio_bridge::tuner::Tuner;

/// All buttons released (pull-up levels high).
pub const IDLE_MASK: u32 = 0xFFFF_FFFF;

/// Bitmask with one button held down.
pub fn held(id: ButtonId) -> u32 {
    IDLE_MASK & !id.mask()
}

#[derive(Debug, Clone, Copy)]
pub enum ScriptStep {
    Sample(RawSample),
    Fail,
}

pub fn idle(position: i32) -> ScriptStep {
    ScriptStep::Sample(RawSample {
        position,
        buttons: IDLE_MASK,
    })
}

pub fn press(position: i32, id: ButtonId) -> ScriptStep {
    ScriptStep::Sample(RawSample {
        position,
        buttons: held(id),
    })
}

/// Sample source that plays its script and then repeats the last step
/// forever. An empty script fails every read.
pub struct ScriptedSampler {
    steps: Vec<ScriptStep>,
    index: usize,
    calls: Arc<AtomicU32>,
}

impl ScriptedSampler {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self::counted(steps, Arc::new(AtomicU32::new(0)))
    }

    pub fn counted(steps: Vec<ScriptStep>, calls: Arc<AtomicU32>) -> Self {
        Self {
            steps,
            index: 0,
            calls,
        }
    }
}

impl SampleSource for ScriptedSampler {
    fn sample(&mut self) -> Result<RawSample, HwError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.get(self.index).copied().unwrap_or(ScriptStep::Fail);
        if self.index + 1 < self.steps.len() {
            self.index += 1;
        }
        match step {
            ScriptStep::Sample(sample) => Ok(sample),
            ScriptStep::Fail => Err(HwError::Bus("scripted fault".into())),
        }
    }
}

/// Hands out queued sample sources; a `None` entry simulates a failed
/// connect, and an exhausted queue fails every connect.
pub struct QueuedProvider {
    sources: VecDeque<Option<Box<dyn SampleSource>>>,
}

impl QueuedProvider {
    pub fn new(sources: Vec<Option<Box<dyn SampleSource>>>) -> Self {
        Self {
            sources: sources.into(),
        }
    }
}

impl SampleSourceProvider for QueuedProvider {
    fn connect(&mut self) -> Result<Box<dyn SampleSource>, HwError> {
        match self.sources.pop_front() {
            Some(Some(source)) => Ok(source),
            Some(None) | None => Err(HwError::Bus("connect refused".into())),
        }
    }
}

/// Mixer that records every level it is asked to set.
#[derive(Default)]
pub struct RecordingMixer {
    pub levels: Arc<Mutex<Vec<u8>>>,
}

#[async_trait]
impl Mixer for RecordingMixer {
    async fn set_volume(&self, percent: u8) -> anyhow::Result<()> {
        self.levels.lock().unwrap().push(percent);
        Ok(())
    }

    async fn read_volume(&self) -> Option<u8> {
        None
    }
}

/// Tuner port that records every register frame.
#[derive(Default)]
pub struct RecordingPort {
    pub frames: Arc<Mutex<Vec<[u8; 5]>>>,
}

impl TunerPort for RecordingPort {
    fn write_frame(&mut self, frame: &[u8; 5]) -> Result<(), HwError> {
        self.frames.lock().unwrap().push(*frame);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<[u8; 5], HwError> {
        Ok([0u8; 5])
    }
}

/// Tuner over a recording port and a temp-dir state store.
pub fn recording_tuner(dir: &tempfile::TempDir) -> (Tuner, Arc<Mutex<Vec<[u8; 5]>>>) {
    let port = RecordingPort::default();
    let frames = port.frames.clone();
    let tuner = Tuner::new(
        Box::new(port),
        StateStore::new(dir.path().to_path_buf()),
        0.1,
    );
    (tuner, frames)
}

/// Counters and switches behind the mock backend routes.
pub struct BackendState {
    pub scan_up_hits: AtomicU32,
    pub scan_down_hits: AtomicU32,
    pub activity_hits: AtomicU32,
    pub mode_sets: Mutex<Vec<String>>,
    pub seconds_since_speech: Mutex<f64>,
    /// Artificial latency on the scan routes (to trip client timeouts).
    pub scan_delay: Duration,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

/// Spawn the mock backend on an ephemeral port.
pub async fn spawn_backend(scan_delay: Duration) -> MockBackend {
    let state = Arc::new(BackendState {
        scan_up_hits: AtomicU32::new(0),
        scan_down_hits: AtomicU32::new(0),
        activity_hits: AtomicU32::new(0),
        mode_sets: Mutex::new(Vec::new()),
        seconds_since_speech: Mutex::new(0.0),
        scan_delay,
    });

    async fn scan_up(State(state): State<Arc<BackendState>>) -> Json<serde_json::Value> {
        tokio::time::sleep(state.scan_delay).await;
        state.scan_up_hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({"message": "scanned up"}))
    }

    async fn scan_down(State(state): State<Arc<BackendState>>) -> Json<serde_json::Value> {
        tokio::time::sleep(state.scan_delay).await;
        state.scan_down_hits.fetch_add(1, Ordering::SeqCst);
        Json(json!({"message": "scanned down"}))
    }

    async fn mode_set(
        State(state): State<Arc<BackendState>>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        let mode = body["mode"].as_str().unwrap_or("").to_string();
        state.mode_sets.lock().unwrap().push(mode);
        Json(json!({"status": "ok"}))
    }

    async fn activity(State(state): State<Arc<BackendState>>) -> Json<serde_json::Value> {
        state.activity_hits.fetch_add(1, Ordering::SeqCst);
        let seconds = *state.seconds_since_speech.lock().unwrap();
        Json(json!({"seconds_since_speech": seconds}))
    }

    let app = Router::new()
        .route("/radio/scan-up", post(scan_up))
        .route("/radio/scan-down", post(scan_down))
        .route("/api/mode/set", post(mode_set))
        .route("/api/ai/activity", get(activity))
        .route("/health", get(|| async { "ok" }))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend serve");
    });

    MockBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}
