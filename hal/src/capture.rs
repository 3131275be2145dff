use fugit::TimerDurationU32;

/// Capture timer runs at 1MHz, one tick per microsecond
pub const TICK_HZ: u32 = 1_000_000;

pub type Ticks = TimerDurationU32<TICK_HZ>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Free running 16 bit timer with a single input capture channel.
///
/// The capture interrupt and the overflow interrupt are both routed to
/// whoever owns the implementation, usually an echo ranging driver.
pub trait InputCapture {
    /// Select which edge latches the counter on the next capture
    fn arm(&mut self, edge: Edge);
    fn reset_counter(&mut self);
    /// Counter value latched by the last capture
    fn captured(&self) -> u16;
}
