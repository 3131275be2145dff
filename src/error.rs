#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Ranging cycle still in flight
    Busy,
    /// Receive ring cannot hold the worst burst between two loop iterations
    RingTooSmall,
    InvalidConfig,
    /// Pin or serial level failure
    Bus,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "busy"),
            Self::RingTooSmall => write!(f, "receive ring too small"),
            Self::InvalidConfig => write!(f, "invalid config"),
            Self::Bus => write!(f, "bus error"),
        }
    }
}
