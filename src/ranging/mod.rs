//! Echo ranging state machine.
//!
//! A ping raises the trigger, the echo line then goes high for as long as
//! the sound travels. The capture timer reports both edges and the width
//! of the pulse is the round trip time in timer ticks. The counter runs
//! free from the ping on, so the width is the wrapping difference of the
//! two captures and timer overflows bound the whole measurement.

pub mod window;

use core::cell::RefCell;
use core::str::FromStr;

use critical_section::Mutex;
use fugit::MicrosDurationU32;
use hal::capture::{Edge, Ticks};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::Error;
use window::Window;

pub const DEFAULT_OVERFLOW_LIMIT: u8 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Ready,
    Pinging,
    AwaitingEcho,
}

/// Round trip ticks to centimeters
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Conversion {
    /// Divide by 58
    Exact,
    /// Shift right by 6, cheaper and about 10% short
    Approximate,
}

impl Default for Conversion {
    fn default() -> Self {
        Self::Exact
    }
}

impl FromStr for Conversion {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "exact" => Ok(Self::Exact),
            "approximate" => Ok(Self::Approximate),
            _ => Err(()),
        }
    }
}

impl Conversion {
    pub fn centimeters(self, ticks: u16) -> u16 {
        match self {
            Self::Exact => ticks / 58,
            Self::Approximate => ticks >> 6,
        }
    }
}

/// Echo pulse width in ticks, negative when no echo came back
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RangingSample(pub i32);

impl Default for RangingSample {
    fn default() -> Self {
        Self::INVALID
    }
}

impl RangingSample {
    pub const INVALID: Self = Self(-1);

    pub fn from_ticks(ticks: u16) -> Self {
        Self(ticks as i32)
    }

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    pub fn ticks(self) -> Option<u16> {
        match self.0 {
            ticks if ticks >= 0 => Some(ticks.min(u16::MAX as i32) as u16),
            _ => None,
        }
    }

    pub fn elapsed(self) -> Option<MicrosDurationU32> {
        self.ticks().map(|ticks| Ticks::from_ticks(ticks as u32).convert())
    }
}

struct Inner {
    state: State,
    overflows: u8,
    rising: u16,
    last: RangingSample,
    window: Option<Window>,
}

impl Inner {
    fn record(&mut self, sample: RangingSample) {
        self.state = State::Ready;
        self.last = match self.window.as_mut() {
            Some(window) => {
                window.push(sample);
                window.average()
            }
            None => sample,
        }
    }
}

pub struct EchoRanging {
    inner: Mutex<RefCell<Inner>>,
    conversion: Conversion,
    overflow_limit: u8,
}

impl EchoRanging {
    /// `averaging` below 2 records every sample as is
    pub fn new(conversion: Conversion, averaging: usize, overflow_limit: u8) -> Self {
        let window = if averaging > 1 { Some(Window::new(averaging)) } else { None };
        let inner =
            Inner { state: State::Ready, overflows: 0, rising: 0, last: RangingSample::INVALID, window };
        Self {
            inner: Mutex::new(RefCell::new(inner)),
            conversion,
            overflow_limit: overflow_limit.max(1),
        }
    }

    pub fn from_config(config: &config::Sonar) -> Self {
        Self::new(config.conversion, config.averaging as usize, config.overflow_limit)
    }

    pub fn state(&self) -> State {
        critical_section::with(|cs| self.inner.borrow_ref(cs).state)
    }

    pub fn ready(&self) -> bool {
        self.state() == State::Ready
    }

    pub fn ping(&self) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.state != State::Ready {
                return Err(Error::Busy);
            }
            inner.state = State::Pinging;
            inner.overflows = 0;
            Ok(())
        })
    }

    /// Capture interrupt entry, returns the edge to arm next
    pub fn on_capture(&self, ticks: u16) -> Edge {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            match inner.state {
                State::Pinging => {
                    inner.state = State::AwaitingEcho;
                    inner.rising = ticks;
                    Edge::Falling
                }
                State::AwaitingEcho => {
                    let width = ticks.wrapping_sub(inner.rising);
                    inner.record(RangingSample::from_ticks(width));
                    Edge::Rising
                }
                State::Ready => {
                    trace!("Capture while idle ignored");
                    Edge::Rising
                }
            }
        })
    }

    /// Overflow interrupt entry, returns the edge to arm next
    pub fn on_overflow(&self) -> Edge {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let pending = match inner.state {
                State::Ready => return Edge::Rising,
                State::Pinging => Edge::Rising,
                State::AwaitingEcho => Edge::Falling,
            };
            inner.overflows = inner.overflows.saturating_add(1);
            if inner.overflows < self.overflow_limit {
                return pending;
            }
            debug!("No echo after {} timer overflows", inner.overflows);
            inner.record(RangingSample::INVALID);
            Edge::Rising
        })
    }

    /// Latest sample, averaged when a window is configured
    pub fn last_sample(&self) -> RangingSample {
        critical_section::with(|cs| self.inner.borrow_ref(cs).last)
    }

    pub fn last_distance(&self) -> Option<u16> {
        self.last_sample().ticks().map(|ticks| self.conversion.centimeters(ticks))
    }
}

mod test {
    #[test]
    fn test_echo() {
        use hal::capture::Edge;

        use super::{Conversion, EchoRanging, State};

        for &(conversion, expected) in [(Conversion::Exact, 10), (Conversion::Approximate, 9)].iter() {
            let ranging = EchoRanging::new(conversion, 0, 1);
            assert_eq!(ranging.last_distance(), None);
            ranging.ping().unwrap();
            assert_eq!(ranging.state(), State::Pinging);
            assert_eq!(ranging.on_capture(1200), Edge::Falling);
            assert_eq!(ranging.state(), State::AwaitingEcho);
            assert_eq!(ranging.on_capture(1780), Edge::Rising);
            assert!(ranging.ready());
            assert_eq!(ranging.last_distance(), Some(expected));
        }
    }

    #[test]
    fn test_echo_across_counter_wrap() {
        use hal::capture::Edge;

        use super::{Conversion, EchoRanging, RangingSample};

        let ranging = EchoRanging::new(Conversion::Exact, 0, 2);
        ranging.ping().unwrap();
        ranging.on_capture(0xFF00);
        assert_eq!(ranging.on_overflow(), Edge::Falling);
        assert_eq!(ranging.on_capture(0x0144), Edge::Rising);
        assert_eq!(ranging.last_sample(), RangingSample::from_ticks(0x244));
        assert_eq!(ranging.last_distance(), Some(10));

        ranging.ping().unwrap();
        ranging.on_capture(1000);
        ranging.on_capture(1580);
        assert_eq!(ranging.last_distance(), Some(10));
    }

    #[test]
    fn test_busy() {
        use super::{Conversion, EchoRanging};
        use crate::Error;

        let ranging = EchoRanging::new(Conversion::Exact, 0, 1);
        ranging.ping().unwrap();
        assert_eq!(ranging.ping(), Err(Error::Busy));
        ranging.on_capture(0);
        assert_eq!(ranging.ping(), Err(Error::Busy));
    }

    #[test]
    fn test_timeout() {
        use hal::capture::Edge;

        use super::{Conversion, EchoRanging, RangingSample, State};

        let ranging = EchoRanging::new(Conversion::Exact, 0, 1);
        assert_eq!(ranging.on_overflow(), Edge::Rising);
        assert_eq!(ranging.state(), State::Ready);

        ranging.ping().unwrap();
        ranging.on_capture(300);
        ranging.on_capture(880);
        assert_eq!(ranging.last_distance(), Some(10));

        ranging.ping().unwrap();
        ranging.on_capture(0);
        assert_eq!(ranging.on_overflow(), Edge::Rising);
        assert_eq!(ranging.state(), State::Ready);
        assert_eq!(ranging.last_sample(), RangingSample::INVALID);
        assert_eq!(ranging.last_distance(), None);
    }

    #[test]
    fn test_overflow_limit() {
        use hal::capture::Edge;

        use super::{Conversion, EchoRanging, State};

        let ranging = EchoRanging::new(Conversion::Exact, 0, 3);
        ranging.ping().unwrap();
        assert_eq!(ranging.on_overflow(), Edge::Rising);
        assert_eq!(ranging.on_capture(0), Edge::Falling);
        assert_eq!(ranging.on_overflow(), Edge::Falling);
        assert_eq!(ranging.state(), State::AwaitingEcho);
        assert_eq!(ranging.on_overflow(), Edge::Rising);
        assert_eq!(ranging.state(), State::Ready);
        assert_eq!(ranging.last_distance(), None);
    }

    #[test]
    fn test_averaging() {
        use super::{Conversion, EchoRanging};

        let ranging = EchoRanging::new(Conversion::Exact, 2, 1);
        let echo = |ticks: Option<u16>| {
            ranging.ping().unwrap();
            ranging.on_capture(100);
            match ticks {
                Some(ticks) => ranging.on_capture(100 + ticks),
                None => ranging.on_overflow(),
            };
        };
        echo(Some(1160));
        assert_eq!(ranging.last_distance(), Some(10));
        echo(Some(1160));
        assert_eq!(ranging.last_distance(), Some(20));
        echo(None);
        assert_eq!(ranging.last_distance(), Some(10));
        echo(None);
        assert_eq!(ranging.last_distance(), None);
    }

    #[test]
    fn test_elapsed() {
        use super::RangingSample;

        let sample = RangingSample::from_ticks(580);
        assert_eq!(sample.elapsed().map(|ticks| ticks.to_micros()), Some(580));
        assert_eq!(RangingSample::INVALID.elapsed(), None);
    }
}
