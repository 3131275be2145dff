use serde::Serialize;

use super::bcd::Bcd;

pub const MINUTE_FRACTION_DIGITS: usize = 4;

/// Angle as received, degrees and minutes with BCD packed fractions of a minute
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct Coordinate {
    /// 0-180 for longitude, 0-90 for latitude
    pub degrees: u8,
    /// 0-59
    pub minutes: u8,
    #[serde(rename = "minute-fraction")]
    pub minute_fraction: Bcd<{ (MINUTE_FRACTION_DIGITS + 1) / 2 }>,
}

impl Coordinate {
    pub const SIZE: usize = 2 + (MINUTE_FRACTION_DIGITS + 1) / 2;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let fraction = self.minute_fraction.as_bytes();
        [self.degrees, self.minutes, fraction[0], fraction[1]]
    }
}
