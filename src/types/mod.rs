pub mod altitude;
pub mod bcd;
pub mod coordinate;
pub mod fix;
pub mod time;

pub use altitude::AltitudeReading;
pub use bcd::{Bcd, NibbleOrder};
pub use coordinate::Coordinate;
pub use fix::{FixFlags, FixRecord};
pub use time::{CalendarDate, ClockTime};
