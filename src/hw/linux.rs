//! Linux `/dev/i2c` wiring.
//!
//! Each device gets its own bus handle; the kernel serializes transactions,
//! and separate handles keep the encoder's reinitialization path independent
//! of the tuner.

use linux_embedded_hal::I2cdev;

use crate::hw::seesaw::SeesawEncoder;
use crate::hw::tea5767::Tea5767Port;
use crate::hw::{HwError, SampleSource, SampleSourceProvider, TunerPort};

/// Opens (and re-opens) the encoder on a `/dev/i2c-*` device.
pub struct I2cEncoderProvider {
    device: String,
}

impl I2cEncoderProvider {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl SampleSourceProvider for I2cEncoderProvider {
    fn connect(&mut self) -> Result<Box<dyn SampleSource>, HwError> {
        let i2c = I2cdev::new(&self.device).map_err(HwError::bus)?;
        Ok(Box::new(SeesawEncoder::new(i2c)))
    }
}

/// Open the FM receiver on a `/dev/i2c-*` device.
pub fn open_tuner(device: &str) -> Result<Box<dyn TunerPort>, HwError> {
    let i2c = I2cdev::new(device).map_err(HwError::bus)?;
    Ok(Box::new(Tea5767Port::new(i2c)))
}
