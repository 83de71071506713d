//! ANO rotary encoder board, seesaw register protocol.
//!
//! Two registers matter here: the incremental encoder position (a big-endian
//! 32-bit counter) and the GPIO bulk word carrying the button levels. The
//! board needs a short settle delay between addressing a register and
//! reading it back.

use std::time::Duration;

use embedded_hal::i2c::I2c;

use crate::events::RawSample;
use crate::hw::{HwError, SampleSource};

/// Default bus address of the encoder board.
pub const ENCODER_ADDR: u8 = 0x49;

const GPIO_BASE: u8 = 0x01;
const GPIO_BULK: u8 = 0x04;
const ENCODER_BASE: u8 = 0x11;
const ENCODER_POSITION: u8 = 0x30;

/// Settle time between register select and read-back.
const REGISTER_DELAY: Duration = Duration::from_micros(250);

pub struct SeesawEncoder<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> SeesawEncoder<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, ENCODER_ADDR)
    }

    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    fn read_register(&mut self, base: u8, reg: u8) -> Result<[u8; 4], HwError> {
        self.i2c
            .write(self.addr, &[base, reg])
            .map_err(HwError::bus)?;
        std::thread::sleep(REGISTER_DELAY);
        let mut buf = [0u8; 4];
        self.i2c.read(self.addr, &mut buf).map_err(HwError::bus)?;
        Ok(buf)
    }
}

impl<I2C: I2c + Send> SampleSource for SeesawEncoder<I2C> {
    fn sample(&mut self) -> Result<RawSample, HwError> {
        let position = i32::from_be_bytes(self.read_register(ENCODER_BASE, ENCODER_POSITION)?);
        let buttons = u32::from_be_bytes(self.read_register(GPIO_BASE, GPIO_BULK)?);
        Ok(RawSample { position, buttons })
    }
}
