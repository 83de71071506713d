//! FM tuner actuator.
//!
//! Owns the receiver port, the register codec, and the persisted state.
//! Every successful tune updates the in-memory state and writes the state
//! record; the band-edge policy for scanning is clamp (stay at the edge).

pub mod codec;
pub mod store;

use thiserror::Error;

use crate::hw::{HwError, TunerPort};
use codec::{BAND_MAX_MHZ, BAND_MIN_MHZ, TunerStatus};
use store::StateStore;

/// Default scan increment in MHz.
pub const DEFAULT_SCAN_STEP_MHZ: f64 = 0.1;

#[derive(Debug, Error)]
pub enum TunerError {
    /// Explicit out-of-range input. Rejected before any register write.
    #[error("frequency {0:.1} MHz outside the 87.5-108.0 MHz band")]
    OutOfBand(f64),
    #[error(transparent)]
    Hw(#[from] HwError),
}

/// Current receiver state as this process believes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerState {
    pub frequency_mhz: f64,
    pub muted: bool,
}

pub struct Tuner {
    port: Box<dyn TunerPort>,
    store: StateStore,
    step_mhz: f64,
    state: TunerState,
}

impl Tuner {
    /// Create the actuator, loading the last persisted station. The receiver
    /// stays muted until [`Tuner::resume`] or an explicit tune.
    pub fn new(port: Box<dyn TunerPort>, store: StateStore, step_mhz: f64) -> Self {
        let frequency_mhz = store.load();
        Self {
            port,
            store,
            step_mhz,
            state: TunerState {
                frequency_mhz,
                muted: true,
            },
        }
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    /// Tune to an explicit frequency.
    pub fn tune(&mut self, freq_mhz: f64) -> Result<(), TunerError> {
        if !(BAND_MIN_MHZ..=BAND_MAX_MHZ).contains(&freq_mhz) {
            return Err(TunerError::OutOfBand(freq_mhz));
        }
        self.port.write_frame(&codec::tune_frame(freq_mhz))?;
        self.state.frequency_mhz = freq_mhz;
        self.state.muted = false;
        self.store.save(freq_mhz);
        tracing::info!("Tuned to {:.1} MHz", freq_mhz);
        Ok(())
    }

    /// Unmute at the last tuned station.
    pub fn resume(&mut self) -> Result<(), TunerError> {
        self.tune(self.state.frequency_mhz)
    }

    /// Mute the receiver.
    pub fn mute(&mut self) -> Result<(), TunerError> {
        self.port.write_frame(&codec::MUTE_FRAME)?;
        self.state.muted = true;
        tracing::info!("Receiver muted");
        Ok(())
    }

    pub fn scan_up(&mut self) -> Result<f64, TunerError> {
        self.step(1)
    }

    pub fn scan_down(&mut self) -> Result<f64, TunerError> {
        self.step(-1)
    }

    /// Move `steps` scan increments from the current station, clamped at the
    /// band edges. Returns the frequency actually tuned.
    pub fn step(&mut self, steps: i32) -> Result<f64, TunerError> {
        let target = (self.state.frequency_mhz + f64::from(steps) * self.step_mhz)
            .clamp(BAND_MIN_MHZ, BAND_MAX_MHZ);
        self.tune(target)?;
        Ok(target)
    }

    /// Read and decode the status registers.
    pub fn status(&mut self) -> Result<TunerStatus, TunerError> {
        Ok(codec::decode_status(&self.port.read_frame()?))
    }
}
