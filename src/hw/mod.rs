//! Hardware seams.
//!
//! The physical bus transaction layer stays outside this crate: drivers are
//! generic over `embedded_hal::i2c::I2c` and the service loop only sees the
//! traits below, so tests (and the reinitialization path) can swap devices
//! freely. Bus transactions are assumed near-instantaneous; they run inline
//! in the polling loop.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod seesaw;
pub mod tea5767;

use thiserror::Error;

use crate::events::RawSample;

/// A failed bus transaction. Counted toward the service loop's
/// reinitialization backoff, never fatal by itself.
#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c transaction failed: {0}")]
    Bus(String),
}

impl HwError {
    pub fn bus<E: core::fmt::Debug>(err: E) -> Self {
        Self::Bus(format!("{err:?}"))
    }
}

/// Returns one raw position counter and button bitmask on demand.
pub trait SampleSource: Send {
    fn sample(&mut self) -> Result<RawSample, HwError>;
}

/// Raw register access to the FM receiver.
pub trait TunerPort: Send {
    /// Write the 5 control registers in one transaction.
    fn write_frame(&mut self, frame: &[u8; 5]) -> Result<(), HwError>;
    /// Read the 5 status registers.
    fn read_frame(&mut self) -> Result<[u8; 5], HwError>;
}

/// Recreates the sample source handle. Used once at startup and again by the
/// service loop when persistent bus failures force reinitialization.
pub trait SampleSourceProvider: Send {
    fn connect(&mut self) -> Result<Box<dyn SampleSource>, HwError>;
}
