use fixed_point::FixedPoint;
use serde::Serialize;

use super::bcd::{Bcd, NibbleOrder};

pub const ALTITUDE_FRACTION_DIGITS: usize = 2;

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct AltitudeReading {
    pub meters: i16,
    pub fraction: Bcd<{ (ALTITUDE_FRACTION_DIGITS + 1) / 2 }>,
}

impl AltitudeReading {
    pub const SIZE: usize = 2 + (ALTITUDE_FRACTION_DIGITS + 1) / 2;

    /// Altitude in meters with centimeter resolution.
    /// The fraction takes the sign of the whole meters.
    pub fn to_fixed_point(self, order: NibbleOrder) -> FixedPoint<i32, 2> {
        let centimeters = self.fraction.value(order) as i32;
        let meters = self.meters as i32 * 100;
        FixedPoint(if self.meters < 0 { meters - centimeters } else { meters + centimeters })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let meters = self.meters.to_le_bytes();
        [meters[0], meters[1], self.fraction.as_bytes()[0]]
    }
}

mod test {
    #[test]
    fn test_to_fixed_point() {
        use super::{AltitudeReading, Bcd, NibbleOrder};

        let order = NibbleOrder::EvenLow;
        let altitude = AltitudeReading { meters: 102, fraction: Bcd::pack(b"35", order) };
        assert_eq!(altitude.to_fixed_point(order).0, 10235);
        let altitude = AltitudeReading { meters: -12, fraction: Bcd::pack(b"5", order) };
        assert_eq!(altitude.to_fixed_point(order).0, -1250);
        assert_eq!(altitude.to_bytes(), [0xF4, 0xFF, 0x05]);
    }
}
