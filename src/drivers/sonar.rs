//! Ultrasonic rangefinder wiring: trigger pin, input capture timer on the
//! echo line and a delay source for the trigger pulse.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;
use hal::capture::{Edge, InputCapture};

use crate::ranging::EchoRanging;
use crate::scheduler::Ranging;
use crate::Error;

pub const TRIGGER_PULSE_MICROS: u8 = 10;

/// Routes capture and overflow interrupts of a timer into the ranging engine
pub struct CaptureTimer<'a, T> {
    ranging: &'a EchoRanging,
    timer: Mutex<RefCell<T>>,
}

impl<'a, T: InputCapture> CaptureTimer<'a, T> {
    pub fn new(ranging: &'a EchoRanging, mut timer: T) -> Self {
        timer.arm(Edge::Rising);
        Self { ranging, timer: Mutex::new(RefCell::new(timer)) }
    }

    pub fn ranging(&self) -> &'a EchoRanging {
        self.ranging
    }

    /// Capture interrupt handler
    pub fn on_capture(&self) {
        critical_section::with(|cs| {
            let mut timer = self.timer.borrow_ref_mut(cs);
            let edge = self.ranging.on_capture(timer.captured());
            timer.arm(edge);
        })
    }

    /// Overflow interrupt handler
    pub fn on_overflow(&self) {
        critical_section::with(|cs| {
            let edge = self.ranging.on_overflow();
            self.timer.borrow_ref_mut(cs).arm(edge);
        })
    }

    /// Counter restarts here and runs free until the echo is measured
    fn ping(&self) -> Result<(), Error> {
        critical_section::with(|cs| {
            self.ranging.ping()?;
            let mut timer = self.timer.borrow_ref_mut(cs);
            timer.reset_counter();
            timer.arm(Edge::Rising);
            Ok(())
        })
    }
}

pub struct Sonar<'a, P, T, D> {
    trigger: P,
    timer: &'a CaptureTimer<'a, T>,
    delay: D,
}

impl<'a, P: OutputPin, T: InputCapture, D: DelayUs<u8>> Sonar<'a, P, T, D> {
    pub fn new(trigger: P, timer: &'a CaptureTimer<'a, T>, delay: D) -> Self {
        Self { trigger, timer, delay }
    }
}

impl<'a, P: OutputPin, T: InputCapture, D: DelayUs<u8>> Ranging for Sonar<'a, P, T, D> {
    fn ready(&self) -> bool {
        self.timer.ranging().ready()
    }

    /// Timer restart and trigger rise happen without interruption,
    /// so that the first overflow cannot fire before the pulse
    fn ping(&mut self) -> Result<(), Error> {
        let timer = self.timer;
        let trigger = &mut self.trigger;
        critical_section::with(|_| {
            timer.ping()?;
            trigger.set_high().map_err(|_| Error::Bus)
        })?;
        self.delay.delay_us(TRIGGER_PULSE_MICROS);
        self.trigger.set_low().map_err(|_| Error::Bus)
    }

    fn last_distance(&self) -> Option<u16> {
        self.timer.ranging().last_distance()
    }
}

mod test {
    #[cfg(test)]
    use std::{cell::RefCell, convert::Infallible, rc::Rc, vec::Vec};

    #[cfg(test)]
    use hal::capture::{Edge, InputCapture};

    #[cfg(test)]
    #[derive(Default)]
    struct Board {
        trigger: Vec<bool>,
        armed: Vec<Edge>,
        resets: usize,
        captured: u16,
        micros: u32,
    }

    #[cfg(test)]
    struct Timer(Rc<RefCell<Board>>);

    #[cfg(test)]
    impl InputCapture for Timer {
        fn arm(&mut self, edge: Edge) {
            self.0.borrow_mut().armed.push(edge)
        }

        fn reset_counter(&mut self) {
            self.0.borrow_mut().resets += 1
        }

        fn captured(&self) -> u16 {
            self.0.borrow().captured
        }
    }

    #[cfg(test)]
    struct Trigger(Rc<RefCell<Board>>);

    #[cfg(test)]
    impl embedded_hal::digital::v2::OutputPin for Trigger {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(self.0.borrow_mut().trigger.push(false))
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            Ok(self.0.borrow_mut().trigger.push(true))
        }
    }

    #[cfg(test)]
    struct Delay(Rc<RefCell<Board>>);

    #[cfg(test)]
    impl embedded_hal::blocking::delay::DelayUs<u8> for Delay {
        fn delay_us(&mut self, us: u8) {
            self.0.borrow_mut().micros += us as u32
        }
    }

    #[test]
    fn test_ping_and_echo() {
        use super::{CaptureTimer, Sonar};
        use crate::ranging::{Conversion, EchoRanging};
        use crate::scheduler::Ranging;
        use crate::Error;

        let board: Rc<RefCell<Board>> = Default::default();
        let ranging = EchoRanging::new(Conversion::Exact, 0, 1);
        let timer = CaptureTimer::new(&ranging, Timer(board.clone()));
        let mut sonar = Sonar::new(Trigger(board.clone()), &timer, Delay(board.clone()));

        assert!(sonar.ready());
        sonar.ping().unwrap();
        assert_eq!(sonar.ping(), Err(Error::Busy));
        {
            let board = board.borrow();
            assert_eq!(board.trigger, vec![true, false]);
            assert_eq!(board.micros, 10);
            assert_eq!(board.resets, 1);
        }

        board.borrow_mut().captured = 1200;
        timer.on_capture();
        board.borrow_mut().captured = 1780;
        timer.on_capture();
        assert_eq!(board.borrow().resets, 1);
        assert_eq!(board.borrow().armed, vec![Edge::Rising, Edge::Rising, Edge::Falling, Edge::Rising]);
        assert!(sonar.ready());
        assert_eq!(sonar.last_distance(), Some(10));
    }

    #[test]
    fn test_no_echo() {
        use super::{CaptureTimer, Sonar};
        use crate::ranging::{Conversion, EchoRanging};
        use crate::scheduler::Ranging;

        let board: Rc<RefCell<Board>> = Default::default();
        let ranging = EchoRanging::new(Conversion::Exact, 0, 1);
        let timer = CaptureTimer::new(&ranging, Timer(board.clone()));
        let mut sonar = Sonar::new(Trigger(board.clone()), &timer, Delay(board.clone()));

        timer.on_overflow();
        assert!(sonar.ready());
        sonar.ping().unwrap();
        timer.on_overflow();
        assert!(sonar.ready());
        assert_eq!(sonar.last_distance(), None);
        assert_eq!(board.borrow().armed.last(), Some(&Edge::Rising));
    }
}
