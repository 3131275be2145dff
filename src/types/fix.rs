use serde::Serialize;

use super::{
    altitude::AltitudeReading,
    coordinate::Coordinate,
    time::{self, CalendarDate, ClockTime},
};

/// Flag bits, least significant first: status, latitude, longitude
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct FixFlags(pub u8);

impl FixFlags {
    pub const STATUS_OK: u8 = 1 << 0;
    pub const LATITUDE_NORTH: u8 = 1 << 1;
    pub const LONGITUDE_EAST: u8 = 1 << 2;

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn set(&mut self, flag: u8, value: bool) {
        if value {
            self.0 |= flag
        } else {
            self.0 &= !flag
        }
    }

    pub fn status_ok(self) -> bool {
        self.contains(Self::STATUS_OK)
    }

    pub fn north(self) -> bool {
        self.contains(Self::LATITUDE_NORTH)
    }

    pub fn east(self) -> bool {
        self.contains(Self::LONGITUDE_EAST)
    }
}

/// Latest GPS state, merged from every committed sentence
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct FixRecord {
    pub flags: FixFlags,
    pub date: CalendarDate,
    pub clock: ClockTime,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    pub altitude: AltitudeReading,
    pub quality: u8,
    pub satellites: u8,
}

impl FixRecord {
    pub fn datetime(&self) -> Option<chrono::naive::NaiveDateTime> {
        time::to_naive_datetime(self.date, self.clock)
    }
}
