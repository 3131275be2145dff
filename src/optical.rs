//! Optical flow accounting.
//!
//! The sensor reports motion since its last readout. Deltas are summed
//! here until the bus master has fetched them. Only the published part of
//! the sums is taken back once the master completes a read, motion that
//! arrived after publishing stays for the next image. Every step runs in
//! a critical section, so a delta is never half applied around a readout.

use embedded_hal::blocking::delay::DelayUs;
use hal::register::RegisterBus;
use serde::Serialize;

use crate::scheduler::Flow;
use crate::sync::Shared;
use crate::Error;

pub const PRODUCT_ID: u8 = 0x00;
pub const MOTION: u8 = 0x02;
pub const DELTA_X: u8 = 0x03;
pub const DELTA_Y: u8 = 0x04;
pub const SURFACE_QUALITY: u8 = 0x05;
pub const RESET: u8 = 0x3a;

const RESET_CODE: u8 = 0x5a;
const RESET_MICROS: u8 = 50;
/// Written to the motion register, clears the sensor's delta registers
const START_MOTION: u8 = 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub dx: i16,
    pub dy: i16,
}

impl Delta {
    pub const SIZE: usize = 4;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let (dx, dy) = (self.dx.to_le_bytes(), self.dy.to_le_bytes());
        [dx[0], dx[1], dy[0], dy[1]]
    }

    fn saturating_add(self, other: Self) -> Self {
        Self { dx: self.dx.saturating_add(other.dx), dy: self.dy.saturating_add(other.dy) }
    }

    fn saturating_sub(self, other: Self) -> Self {
        Self { dx: self.dx.saturating_sub(other.dx), dy: self.dy.saturating_sub(other.dy) }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct Sums {
    total: Delta,
    published: Delta,
}

/// Running sums since the last readout, saturating at the i16 range
pub struct OpticalAccumulator(Shared<Sums>);

impl Default for OpticalAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpticalAccumulator {
    pub const fn new() -> Self {
        const ZERO: Delta = Delta { dx: 0, dy: 0 };
        Self(Shared::new(Sums { total: ZERO, published: ZERO }))
    }

    pub fn accumulate(&self, dx: i8, dy: i8) {
        let delta = Delta { dx: dx.into(), dy: dy.into() };
        self.0.update(|sums| Sums { total: sums.total.saturating_add(delta), ..sums });
    }

    /// Motion not yet taken back by a completed readout
    pub fn read(&self) -> Delta {
        self.0.get().total
    }

    /// Hands the current sums to `write` and remembers them as published
    pub fn publish<F: FnOnce(Delta)>(&self, write: F) {
        critical_section::with(|_| {
            let sums = self.0.update(|sums| Sums { published: sums.total, ..sums });
            write(sums.published)
        })
    }

    /// Takes back what was published, `clear` withdraws it from the image
    pub fn acknowledge<F: FnOnce()>(&self, clear: F) {
        critical_section::with(|_| {
            self.0.update(|sums| Sums {
                total: sums.total.saturating_sub(sums.published),
                published: Delta::default(),
            });
            clear()
        })
    }

    pub fn reset(&self) {
        self.0.set(Sums::default())
    }
}

pub struct OpticalFlow<'a, B, D> {
    bus: B,
    delay: D,
    accumulator: &'a OpticalAccumulator,
}

impl<'a, B: RegisterBus<Error = Error>, D: DelayUs<u8>> OpticalFlow<'a, B, D> {
    pub fn new(bus: B, delay: D, accumulator: &'a OpticalAccumulator) -> Self {
        Self { bus, delay, accumulator }
    }

    pub fn accumulator(&self) -> &'a OpticalAccumulator {
        self.accumulator
    }

    /// Resets the sensor and starts motion detection
    pub fn init(&mut self) -> Result<(), Error> {
        self.bus.resync()?;
        self.bus.write(RESET, RESET_CODE)?;
        self.reset();
        self.delay.delay_us(RESET_MICROS);
        self.bus.write(MOTION, START_MOTION)?;
        let product_id = self.bus.read(PRODUCT_ID)?;
        info!("Optical flow sensor product id {:#04x}", product_id);
        Ok(())
    }

    /// Adds pending motion to the accumulator, returns whether there was any
    pub fn poll(&mut self) -> Result<bool, Error> {
        if self.bus.read(MOTION)? == 0 {
            return Ok(false);
        }
        let dx = self.bus.read(DELTA_X)? as i8;
        let dy = self.bus.read(DELTA_Y)? as i8;
        self.accumulator.accumulate(dx, dy);
        Ok(true)
    }

    /// Count of features the sensor tracks, low over featureless ground
    pub fn surface_quality(&mut self) -> Result<u8, Error> {
        self.bus.read(SURFACE_QUALITY)
    }

    /// Drops all motion counted so far
    pub fn reset(&self) {
        self.accumulator.reset()
    }
}

impl<'a, B: RegisterBus<Error = Error>, D: DelayUs<u8>> Flow for OpticalFlow<'a, B, D> {
    fn poll(&mut self) -> Result<bool, Error> {
        OpticalFlow::poll(self)
    }
}

mod test {
    #[test]
    fn test_accumulate() {
        use super::{Delta, OpticalAccumulator};

        let accumulator = OpticalAccumulator::new();
        accumulator.accumulate(2, -1);
        accumulator.accumulate(-1, 3);
        assert_eq!(accumulator.read(), Delta { dx: 1, dy: 2 });
        accumulator.reset();
        assert_eq!(accumulator.read(), Delta::default());

        let mut published = Delta::default();
        accumulator.accumulate(4, 4);
        accumulator.publish(|delta| published = delta);
        accumulator.accumulate(1, -1);
        accumulator.acknowledge(|| ());
        assert_eq!(published, Delta { dx: 4, dy: 4 });
        assert_eq!(accumulator.read(), Delta { dx: 1, dy: -1 });
        accumulator.acknowledge(|| ());
        assert_eq!(accumulator.read(), Delta { dx: 1, dy: -1 });
        accumulator.reset();

        for _ in 0..300 {
            accumulator.accumulate(127, -128);
        }
        assert_eq!(accumulator.read(), Delta { dx: i16::MAX, dy: i16::MIN });
        assert_eq!(Delta { dx: 1, dy: -2 }.to_bytes(), [0x01, 0x00, 0xFE, 0xFF]);
    }

    #[test]
    fn test_init_and_poll() {
        use super::{Delta, OpticalAccumulator, OpticalFlow, SURFACE_QUALITY};
        use crate::drivers::a5050::mock;

        let (sensor, wire) = mock::a5050();
        let accumulator = OpticalAccumulator::new();
        let delay = mock::Delay(wire.clone());
        let mut optical = OpticalFlow::new(sensor, delay, &accumulator);

        wire.borrow_mut().respond(0x17);
        optical.init().unwrap();
        {
            let wire = wire.borrow();
            let bytes = wire.clocked_bytes();
            assert_eq!(&bytes[..4], &[0xBA, 0x5A, 0x82, 0x01]);
            assert_eq!(bytes[4], 0x00);
        }

        wire.borrow_mut().respond(0x00);
        assert_eq!(optical.poll(), Ok(false));

        wire.borrow_mut().respond(0x42);
        assert_eq!(optical.surface_quality(), Ok(0x42));
        assert_eq!(wire.borrow().clocked_bytes()[8], SURFACE_QUALITY);

        for &byte in [0x80, 0x02, 0xFF].iter() {
            wire.borrow_mut().respond(byte);
        }
        assert_eq!(optical.poll(), Ok(true));
        assert_eq!(accumulator.read(), Delta { dx: 2, dy: -1 });
    }

    #[test]
    fn test_readout_during_poll() {
        use hal::register::RegisterBus;

        use super::{Delta, OpticalAccumulator, OpticalFlow, DELTA_Y};
        use crate::Error;

        struct RacingBus<'a> {
            accumulator: &'a OpticalAccumulator,
        }

        impl<'a> RegisterBus for RacingBus<'a> {
            type Error = Error;

            fn read(&mut self, register: u8) -> Result<u8, Error> {
                if register == DELTA_Y {
                    // bus master finishes its readout mid poll
                    self.accumulator.acknowledge(|| ());
                }
                Ok(3)
            }

            fn write(&mut self, _: u8, _: u8) -> Result<(), Error> {
                Ok(())
            }
        }

        struct NoDelay;

        impl embedded_hal::blocking::delay::DelayUs<u8> for NoDelay {
            fn delay_us(&mut self, _: u8) {}
        }

        let accumulator = OpticalAccumulator::new();
        accumulator.accumulate(5, 5);
        accumulator.publish(|_| ());
        let bus = RacingBus { accumulator: &accumulator };
        let mut optical = OpticalFlow::new(bus, NoDelay, &accumulator);
        assert_eq!(optical.poll(), Ok(true));
        assert_eq!(accumulator.read(), Delta { dx: 3, dy: 3 });
    }
}
