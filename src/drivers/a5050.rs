//! Bit banged serial port of A5050 class optical flow sensors.
//!
//! SCLK is driven by the host. SDIO is shared: the host drives it while
//! sending an address or data, then releases it (open drain, driven high)
//! for the sensor to answer. Bytes go most significant bit first, NCS
//! frames every transaction.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use hal::register::RegisterBus;

use crate::Error;

const HALF_BIT_MICROS: u8 = 1;
/// Between the address phase and the data phase of a read
const READ_SETTLE_MICROS: u8 = 4;
const WRITE_FLAG: u8 = 0x80;

fn bus<T, E>(result: Result<T, E>) -> Result<T, Error> {
    result.map_err(|_| Error::Bus)
}

pub struct A5050<SCLK, SDIO, NCS, D> {
    sclk: SCLK,
    sdio: SDIO,
    ncs: NCS,
    delay: D,
}

impl<SCLK, SDIO, NCS, D> A5050<SCLK, SDIO, NCS, D>
where
    SCLK: OutputPin,
    SDIO: OutputPin + InputPin,
    NCS: OutputPin,
    D: DelayUs<u8>,
{
    pub fn new(sclk: SCLK, sdio: SDIO, ncs: NCS, delay: D) -> Self {
        Self { sclk, sdio, ncs, delay }
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        bus(self.ncs.set_low())?;
        let result = f(self);
        bus(self.ncs.set_high())?;
        result
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        for bit in (0..8).rev() {
            bus(self.sclk.set_low())?;
            match (byte >> bit) & 1 {
                1 => bus(self.sdio.set_high())?,
                _ => bus(self.sdio.set_low())?,
            }
            self.delay.delay_us(HALF_BIT_MICROS);
            bus(self.sclk.set_high())?;
            self.delay.delay_us(HALF_BIT_MICROS);
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        bus(self.sdio.set_high())?;
        let mut byte = 0u8;
        for _ in 0..8 {
            bus(self.sclk.set_low())?;
            self.delay.delay_us(HALF_BIT_MICROS);
            bus(self.sclk.set_high())?;
            byte = (byte << 1) | bus(self.sdio.is_high())? as u8;
            self.delay.delay_us(HALF_BIT_MICROS);
        }
        Ok(byte)
    }
}

impl<SCLK, SDIO, NCS, D> RegisterBus for A5050<SCLK, SDIO, NCS, D>
where
    SCLK: OutputPin,
    SDIO: OutputPin + InputPin,
    NCS: OutputPin,
    D: DelayUs<u8>,
{
    type Error = Error;

    fn read(&mut self, register: u8) -> Result<u8, Error> {
        self.transaction(|this| {
            this.write_byte(register & !WRITE_FLAG)?;
            this.delay.delay_us(READ_SETTLE_MICROS);
            this.read_byte()
        })
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), Error> {
        self.transaction(|this| {
            this.write_byte(register | WRITE_FLAG)?;
            this.write_byte(value)
        })
    }

    /// Toggling NCS drops any half shifted byte
    fn resync(&mut self) -> Result<(), Error> {
        bus(self.sclk.set_high())?;
        bus(self.ncs.set_high())?;
        self.delay.delay_us(HALF_BIT_MICROS);
        bus(self.ncs.set_low())?;
        self.delay.delay_us(HALF_BIT_MICROS);
        bus(self.ncs.set_high())
    }
}

#[cfg(test)]
pub mod mock {
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    use embedded_hal::blocking::delay::DelayUs;
    use embedded_hal::digital::v2::{InputPin, OutputPin};

    use super::A5050;

    /// Records what the host clocks out and serves what the sensor answers
    #[derive(Default)]
    pub struct Wire {
        pub sdio: bool,
        pub selected: bool,
        pub clocked: Vec<bool>,
        pub response: VecDeque<bool>,
        pub transactions: usize,
        pub micros: u32,
    }

    impl Wire {
        pub fn respond(&mut self, byte: u8) {
            self.response.extend((0..8).rev().map(|bit| (byte >> bit) & 1 == 1));
        }

        pub fn clocked_bytes(&self) -> Vec<u8> {
            let bits = self.clocked.chunks(8);
            bits.map(|bits| bits.iter().fold(0, |byte, &bit| (byte << 1) | bit as u8)).collect()
        }
    }

    pub type Shared = Rc<RefCell<Wire>>;

    pub struct Sclk(pub Shared);

    impl OutputPin for Sclk {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut wire = self.0.borrow_mut();
            if wire.selected {
                let level = wire.sdio;
                wire.clocked.push(level);
            }
            Ok(())
        }
    }

    pub struct Sdio(pub Shared);

    impl OutputPin for Sdio {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().sdio = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().sdio = true;
            Ok(())
        }
    }

    impl InputPin for Sdio {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.0.borrow_mut().response.pop_front().unwrap_or(false))
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            self.is_high().map(|high| !high)
        }
    }

    pub struct Ncs(pub Shared);

    impl OutputPin for Ncs {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().selected = true;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut wire = self.0.borrow_mut();
            if wire.selected {
                wire.transactions += 1;
            }
            wire.selected = false;
            Ok(())
        }
    }

    pub struct Delay(pub Shared);

    impl DelayUs<u8> for Delay {
        fn delay_us(&mut self, us: u8) {
            self.0.borrow_mut().micros += us as u32;
        }
    }

    pub type MockA5050 = A5050<Sclk, Sdio, Ncs, Delay>;

    pub fn a5050() -> (MockA5050, Shared) {
        let wire: Shared = Default::default();
        let sensor = A5050::new(
            Sclk(wire.clone()),
            Sdio(wire.clone()),
            Ncs(wire.clone()),
            Delay(wire.clone()),
        );
        (sensor, wire)
    }
}

mod test {
    #[test]
    fn test_write() {
        use hal::register::RegisterBus;

        use super::mock;

        let (mut sensor, wire) = mock::a5050();
        sensor.write(0x3a, 0x5a).unwrap();
        let wire = wire.borrow();
        assert_eq!(wire.clocked_bytes(), vec![0xBA, 0x5A]);
        assert_eq!(&wire.clocked[..4], [true, false, true, true]);
        assert_eq!(wire.transactions, 1);
        assert!(!wire.selected);
    }

    #[test]
    fn test_read() {
        use hal::register::RegisterBus;

        use super::mock;

        let (mut sensor, wire) = mock::a5050();
        wire.borrow_mut().respond(0x17);
        assert_eq!(sensor.read(0x02).unwrap(), 0x17);
        wire.borrow_mut().respond(0xFD);
        assert_eq!(sensor.read(0x83).unwrap() as i8, -3);

        let wire = wire.borrow();
        let bytes = wire.clocked_bytes();
        assert_eq!(bytes[0], 0x02);
        assert_eq!(bytes[2], 0x03);
        assert_eq!(wire.transactions, 2);
        assert_eq!(wire.micros, 2 * (16 + 4 + 16));
    }

    #[test]
    fn test_resync() {
        use hal::register::RegisterBus;

        use super::mock;

        let (mut sensor, wire) = mock::a5050();
        sensor.resync().unwrap();
        let wire = wire.borrow();
        assert_eq!(wire.transactions, 1);
        assert!(wire.clocked.is_empty());
    }
}
