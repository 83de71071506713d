//! Persisted tuner state.
//!
//! One small JSON record holding the last tuned frequency. Persistence is an
//! optimization only: a missing, unreadable, or out-of-band record falls back
//! to the default station, and write failures are logged and swallowed.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tuner::codec::{BAND_MAX_MHZ, BAND_MIN_MHZ, DEFAULT_FREQUENCY_MHZ};

const STATE_FILE: &str = "radio_state.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedState {
    frequency_mhz: f64,
    updated_at: DateTime<Utc>,
}

pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn state_file(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    /// Last tuned frequency, or the default station when no usable record
    /// exists.
    pub fn load(&self) -> f64 {
        if let Ok(content) = fs::read_to_string(self.state_file()) {
            if let Ok(state) = serde_json::from_str::<PersistedState>(&content) {
                if (BAND_MIN_MHZ..=BAND_MAX_MHZ).contains(&state.frequency_mhz) {
                    return state.frequency_mhz;
                }
                tracing::warn!(
                    "persisted frequency {} MHz outside the band, using default",
                    state.frequency_mhz
                );
            }
        }
        DEFAULT_FREQUENCY_MHZ
    }

    /// Best-effort write; failures never affect the running process.
    pub fn save(&self, frequency_mhz: f64) {
        let state = PersistedState {
            frequency_mhz,
            updated_at: Utc::now(),
        };
        let path = self.state_file();
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&state) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, json) {
                    tracing::warn!("failed to persist tuner state: {}", e);
                }
            }
            Err(e) => tracing::warn!("failed to serialize tuner state: {}", e),
        }
    }
}
