//! TEA5767 FM receiver register port.
//!
//! The chip has no register addressing: a tune or mute is one 5-byte write,
//! status is one 5-byte read. Frame contents live in [`crate::tuner::codec`].

use embedded_hal::i2c::I2c;

use crate::hw::{HwError, TunerPort};

/// Default bus address of the receiver.
pub const TUNER_ADDR: u8 = 0x60;

pub struct Tea5767Port<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Tea5767Port<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, TUNER_ADDR)
    }

    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }
}

impl<I2C: I2c + Send> TunerPort for Tea5767Port<I2C> {
    fn write_frame(&mut self, frame: &[u8; 5]) -> Result<(), HwError> {
        self.i2c.write(self.addr, frame).map_err(HwError::bus)
    }

    fn read_frame(&mut self) -> Result<[u8; 5], HwError> {
        let mut buf = [0u8; 5];
        self.i2c.read(self.addr, &mut buf).map_err(HwError::bus)?;
        Ok(buf)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tuner::codec;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use embedded_hal::i2c::{ErrorKind, Operation};

    /// Scripted I2C bus: records writes, replays queued reads.
    #[derive(Default)]
    pub(crate) struct FakeI2c {
        reads: VecDeque<Vec<u8>>,
        writes: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
        fail_next: bool,
    }

    impl FakeI2c {
        pub(crate) fn queue_read(&mut self, bytes: Vec<u8>) {
            self.reads.push_back(bytes);
        }

        pub(crate) fn log(&self) -> Arc<Mutex<Vec<(u8, Vec<u8>)>>> {
            self.writes.clone()
        }

        pub(crate) fn fail_next(&mut self) {
            self.fail_next = true;
        }
    }

    impl embedded_hal::i2c::ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail_next {
                self.fail_next = false;
                return Err(ErrorKind::Bus);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => {
                        self.writes.lock().unwrap().push((address, bytes.to_vec()));
                    }
                    Operation::Read(buf) => {
                        let data = self.reads.pop_front().unwrap_or_default();
                        for (dst, src) in buf.iter_mut().zip(data.iter()) {
                            *dst = *src;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn write_frame_is_one_transaction() {
        let i2c = FakeI2c::default();
        let log = i2c.log();

        let mut port = Tea5767Port::new(i2c);
        port.write_frame(&codec::MUTE_FRAME).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![(TUNER_ADDR, codec::MUTE_FRAME.to_vec())]
        );
    }

    #[test]
    fn read_frame_returns_status_bytes() {
        let mut i2c = FakeI2c::default();
        i2c.queue_read(vec![0xAF, 0x5C, 0x80, 0x70, 0x00]);

        let mut port = Tea5767Port::new(i2c);
        assert_eq!(port.read_frame().unwrap(), [0xAF, 0x5C, 0x80, 0x70, 0x00]);
    }
}
