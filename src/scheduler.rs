//! Cooperative main loop.
//!
//! Nothing in here blocks: every iteration drains what the receive
//! interrupt queued, starts the next ping once the previous one settled,
//! polls the optical sensor once and republishes the aggregate.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial;

use crate::aggregate::NavAggregate;
use crate::config::{Config, GNSS};
use crate::protocol::nmea::{Parser, ParserOptions};
use crate::sync::ring_buffer::ByteRing;
use crate::Error;

pub trait Ranging {
    fn ready(&self) -> bool;
    fn ping(&mut self) -> Result<(), Error>;
    /// Centimeters, `None` when the last ping got no echo
    fn last_distance(&self) -> Option<u16>;
}

pub trait Flow {
    /// Returns whether any motion was accumulated
    fn poll(&mut self) -> Result<bool, Error>;
}

/// Fix status LED
pub trait Indicator {
    fn indicate(&mut self, fix: bool);
}

impl<P: OutputPin> Indicator for P {
    fn indicate(&mut self, fix: bool) {
        let result = if fix { self.set_high() } else { self.set_low() };
        result.ok();
    }
}

/// Writes the configured init string to the GPS receiver after its power up delay
pub fn send_init_string<W, D>(config: &GNSS, tx: &mut W, delay: &mut D) -> Result<(), Error>
where
    W: serial::Write<u8>,
    D: DelayMs<u16>,
{
    let init_string = match config.init_string.as_ref() {
        Some(init_string) => init_string,
        None => return Ok(()),
    };
    delay.delay_ms(config.init_delay_ms);
    for &byte in init_string.as_bytes() {
        nb::block!(tx.write(byte)).map_err(|_| Error::Bus)?;
    }
    nb::block!(tx.flush()).map_err(|_| Error::Bus)?;
    debug!("GPS init string sent");
    Ok(())
}

pub struct Scheduler<'a, const N: usize> {
    ring: &'a ByteRing<N>,
    aggregate: &'a NavAggregate,
    parser: Option<Parser>,
    ranging: Option<&'a mut dyn Ranging>,
    optical: Option<&'a mut dyn Flow>,
    indicator: Option<&'a mut dyn Indicator>,
    overflows: usize,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    pub fn new(ring: &'a ByteRing<N>, aggregate: &'a NavAggregate) -> Self {
        Self {
            ring,
            aggregate,
            parser: None,
            ranging: None,
            optical: None,
            indicator: None,
            overflows: 0,
        }
    }

    /// Validates `config` against the ring capacity, sets up the parser when GPS is enabled
    pub fn from_config(
        config: &Config,
        ring: &'a ByteRing<N>,
        aggregate: &'a NavAggregate,
    ) -> Result<Self, Error> {
        config.validate(N)?;
        let scheduler = Self::new(ring, aggregate);
        if !config.gps.enable {
            return Ok(scheduler);
        }
        Ok(scheduler.with_parser(Parser::new(ParserOptions::from(&config.gps))))
    }

    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_ranging(mut self, ranging: &'a mut dyn Ranging) -> Self {
        self.ranging = Some(ranging);
        self
    }

    pub fn with_optical(mut self, optical: &'a mut dyn Flow) -> Self {
        self.optical = Some(optical);
        self
    }

    pub fn with_indicator(mut self, indicator: &'a mut dyn Indicator) -> Self {
        self.indicator = Some(indicator);
        self
    }

    pub fn parser(&self) -> Option<&Parser> {
        self.parser.as_ref()
    }

    fn drain(&mut self) {
        let parser = match self.parser.as_mut() {
            Some(parser) => parser,
            None => return,
        };
        let mut committed = false;
        while let Some(byte) = self.ring.pop() {
            committed |= parser.process(byte).is_some();
        }
        if committed {
            self.aggregate.set_fix(*parser.fix());
        }
        let overflows = self.ring.overflows();
        if overflows != self.overflows {
            warn!("Receive ring dropped {} bytes", overflows.wrapping_sub(self.overflows));
            self.overflows = overflows;
        }
    }

    pub fn run_once(&mut self) {
        self.drain();

        if let Some(ranging) = self.ranging.as_mut() {
            if ranging.ready() {
                self.aggregate.set_distance(ranging.last_distance());
                if let Err(error) = ranging.ping() {
                    warn!("Ping failed: {}", error);
                }
            }
        }

        if let Some(optical) = self.optical.as_mut() {
            if let Err(error) = optical.poll() {
                warn!("Optical flow poll failed: {}", error);
            }
        }

        if let Some(indicator) = self.indicator.as_mut() {
            indicator.indicate(self.aggregate.fix().flags.status_ok());
        }

        self.aggregate.publish();
    }

    pub fn run(&mut self) -> ! {
        info!("Main loop started");
        loop {
            self.run_once();
        }
    }
}

mod test {
    #[cfg(test)]
    use crate::Error;

    #[cfg(test)]
    #[derive(Default)]
    struct FakeRanging {
        busy: bool,
        pings: usize,
        distance: Option<u16>,
    }

    #[cfg(test)]
    impl super::Ranging for FakeRanging {
        fn ready(&self) -> bool {
            !self.busy
        }

        fn ping(&mut self) -> Result<(), Error> {
            self.pings += 1;
            self.busy = true;
            Ok(())
        }

        fn last_distance(&self) -> Option<u16> {
            self.distance
        }
    }

    #[cfg(test)]
    struct FakeFlow(usize);

    #[cfg(test)]
    impl super::Flow for FakeFlow {
        fn poll(&mut self) -> Result<bool, Error> {
            self.0 += 1;
            Err(Error::Bus)
        }
    }

    #[cfg(test)]
    struct Led(Vec<bool>);

    #[cfg(test)]
    impl super::Indicator for Led {
        fn indicate(&mut self, fix: bool) {
            self.0.push(fix)
        }
    }

    #[test]
    fn test_run_once() {
        use super::Scheduler;
        use crate::aggregate::NavAggregate;
        use crate::config::Config;
        use crate::sync::ring_buffer::ByteRing;

        let ring: ByteRing<128> = ByteRing::new();
        let aggregate = NavAggregate::new(Default::default());
        let mut ranging = FakeRanging { distance: Some(10), ..Default::default() };
        let mut flow = FakeFlow(0);
        let mut led = Led(Vec::new());

        let gga = b"$GPGGA,125934.000,5123.1457,N,00645.0808,E,1,07,1.2,102.35,M,47.0,M,,*63\r\n";
        let (head, tail) = gga.split_at(20);
        head.iter().for_each(|&byte| assert!(ring.push(byte)));
        {
            let mut scheduler = Scheduler::from_config(&Config::default(), &ring, &aggregate)
                .unwrap()
                .with_ranging(&mut ranging)
                .with_optical(&mut flow)
                .with_indicator(&mut led);
            scheduler.run_once();
            assert_eq!(aggregate.fix(), Default::default());
            assert_eq!(aggregate.distance(), Some(10));
            assert_eq!(aggregate.read_byte(0), Some(0));

            tail.iter().for_each(|&byte| assert!(ring.push(byte)));
            scheduler.run_once();
            assert_eq!(scheduler.parser().unwrap().statistics().committed, 1);
        }
        let fix = aggregate.fix();
        assert_eq!((fix.latitude.degrees, fix.satellites), (51, 7));
        assert_eq!(aggregate.read_byte(0), Some(0x07));
        assert!(ring.is_empty());
        assert_eq!(ranging.pings, 1);
        assert_eq!(flow.0, 2);
        assert_eq!(led.0, vec![false, true]);
    }

    #[test]
    fn test_ring_too_small() {
        use super::Scheduler;
        use crate::aggregate::NavAggregate;
        use crate::config::Config;
        use crate::sync::ring_buffer::ByteRing;
        use crate::Error;

        let ring: ByteRing<2> = ByteRing::new();
        let aggregate = NavAggregate::new(Default::default());
        let error = Scheduler::from_config(&Config::default(), &ring, &aggregate).err();
        assert!(matches!(error, Some(Error::RingTooSmall)));
    }

    #[test]
    fn test_send_init_string() {
        use embedded_hal::blocking::delay::DelayMs;
        use embedded_hal::serial::Write;

        use super::send_init_string;
        use crate::config::GNSS;

        struct Tx(Vec<u8>, bool);

        impl Write<u8> for Tx {
            type Error = ();

            fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
                // every other attempt reports the transmitter busy
                self.1 = !self.1;
                if self.1 {
                    return Err(nb::Error::WouldBlock);
                }
                self.0.push(byte);
                Ok(())
            }

            fn flush(&mut self) -> nb::Result<(), ()> {
                Ok(())
            }
        }

        struct Delay(u32);

        impl DelayMs<u16> for Delay {
            fn delay_ms(&mut self, ms: u16) {
                self.0 += ms as u32;
            }
        }

        let mut config = GNSS::default();
        let (mut tx, mut delay) = (Tx(Vec::new(), false), Delay(0));
        send_init_string(&config, &mut tx, &mut delay).unwrap();
        assert_eq!((tx.0.len(), delay.0), (0, 0));

        config.init_string = Some("$PMTK220,200*2C\r\n".parse().unwrap());
        send_init_string(&config, &mut tx, &mut delay).unwrap();
        assert_eq!(&tx.0[..], b"$PMTK220,200*2C\r\n");
        assert_eq!(delay.0, 250);
    }
}
