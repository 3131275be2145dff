use crate::codec::{parse_altitude, parse_clock, parse_coordinate, parse_date, parse_u8};
use crate::config::Sentences;
use crate::types::{
    AltitudeReading, CalendarDate, ClockTime, Coordinate, FixFlags, FixRecord, NibbleOrder,
};

use super::ParserOptions;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SentenceKind {
    RMC,
    GGA,
}

/// Recommended minimum data
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RMC {
    pub flags: FixFlags,
    pub clock: ClockTime,
    pub date: CalendarDate,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
}

impl RMC {
    fn field(&mut self, index: u8, token: &[u8], options: &ParserOptions) {
        let order = options.nibble_order;
        match index {
            1 if options.parse_time => self.clock = parse_clock(token),
            2 => self.flags.set(FixFlags::STATUS_OK, token == b"A"),
            3 => update_coordinate(&mut self.latitude, token, order),
            4 => self.flags.set(FixFlags::LATITUDE_NORTH, token == b"N"),
            5 => update_coordinate(&mut self.longitude, token, order),
            6 => self.flags.set(FixFlags::LONGITUDE_EAST, token == b"E"),
            9 if options.parse_time => self.date = parse_date(token),
            // speed, course, magnetic variation and mode are not published
            _ => (),
        }
    }

    fn commit(&self, fix: &mut FixRecord, options: &ParserOptions) {
        if options.parse_time {
            fix.date = self.date;
            fix.clock = self.clock;
        }
        fix.flags = self.flags;
        fix.latitude = self.latitude;
        fix.longitude = self.longitude;
    }
}

/// Fix information
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GGA {
    pub flags: FixFlags,
    pub clock: ClockTime,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    pub quality: u8,
    pub satellites: u8,
    pub altitude: AltitudeReading,
}

impl GGA {
    fn field(&mut self, index: u8, token: &[u8], options: &ParserOptions) {
        let order = options.nibble_order;
        match index {
            1 if options.parse_time => self.clock = parse_clock(token),
            2 => update_coordinate(&mut self.latitude, token, order),
            3 => self.flags.set(FixFlags::LATITUDE_NORTH, token == b"N"),
            4 => update_coordinate(&mut self.longitude, token, order),
            5 => self.flags.set(FixFlags::LONGITUDE_EAST, token == b"E"),
            6 => {
                self.quality = parse_u8(token);
                self.flags.set(FixFlags::STATUS_OK, self.quality != 0);
            }
            7 => self.satellites = parse_u8(token),
            9 if options.parse_altitude => self.altitude = parse_altitude(token, order),
            _ => (),
        }
    }

    fn commit(&self, fix: &mut FixRecord, options: &ParserOptions) {
        if options.parse_time {
            fix.clock = self.clock;
        }
        fix.flags = self.flags;
        fix.latitude = self.latitude;
        fix.longitude = self.longitude;
        fix.quality = self.quality;
        fix.satellites = self.satellites;
        if options.parse_altitude {
            fix.altitude = self.altitude;
        }
    }
}

fn update_coordinate(coordinate: &mut Coordinate, token: &[u8], order: NibbleOrder) {
    match parse_coordinate(token, order) {
        Some(parsed) => *coordinate = parsed,
        None => trace!("Coordinate without decimal point ignored"),
    }
}

/// Sentence under construction, starts out empty once its identifier is known
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sentence {
    Unknown,
    RMC(RMC),
    GGA(GGA),
}

impl Default for Sentence {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Sentence {
    pub fn select(identifier: &[u8], filter: Sentences) -> Self {
        match identifier {
            b"GPRMC" if filter.rmc => Self::RMC(RMC::default()),
            b"GPGGA" if filter.gga => Self::GGA(GGA::default()),
            _ => Self::Unknown,
        }
    }

    pub fn kind(&self) -> Option<SentenceKind> {
        match self {
            Self::Unknown => None,
            Self::RMC(_) => Some(SentenceKind::RMC),
            Self::GGA(_) => Some(SentenceKind::GGA),
        }
    }

    pub fn field(&mut self, index: u8, token: &[u8], options: &ParserOptions) {
        match self {
            Self::Unknown => (),
            Self::RMC(rmc) => rmc.field(index, token, options),
            Self::GGA(gga) => gga.field(index, token, options),
        }
    }

    /// Merges into `fix` the fields this sentence carries
    pub fn commit(&self, fix: &mut FixRecord, options: &ParserOptions) -> Option<SentenceKind> {
        match self {
            Self::Unknown => return None,
            Self::RMC(rmc) => rmc.commit(fix, options),
            Self::GGA(gga) => gga.commit(fix, options),
        }
        self.kind()
    }
}

mod test {
    #[test]
    fn test_select() {
        use super::{Sentence, SentenceKind};
        use crate::config::Sentences;

        let all = Sentences::default();
        assert_eq!(Sentence::select(b"GPRMC", all).kind(), Some(SentenceKind::RMC));
        assert_eq!(Sentence::select(b"GPGGA", all).kind(), Some(SentenceKind::GGA));
        assert_eq!(Sentence::select(b"GPGSV", all), Sentence::Unknown);
        assert_eq!(Sentence::select(b"GPRMCX", all), Sentence::Unknown);

        let rmc_only = Sentences { rmc: true, gga: false };
        assert_eq!(Sentence::select(b"GPGGA", rmc_only), Sentence::Unknown);
    }

    #[test]
    fn test_gga_fields() {
        use super::Sentence;
        use crate::config::Sentences;
        use crate::protocol::nmea::ParserOptions;
        use crate::types::FixRecord;

        let options = ParserOptions { parse_altitude: false, ..Default::default() };
        let mut sentence = Sentence::select(b"GPGGA", Sentences::default());
        let tokens: [&[u8]; 9] =
            [b"120000", b"4807.038", b"S", b"01131.000", b"W", b"2", b"08", b"0.9", b"545.4"];
        for (index, token) in tokens.iter().enumerate() {
            sentence.field(index as u8 + 1, token, &options);
        }
        let mut fix = FixRecord::default();
        sentence.commit(&mut fix, &options);
        assert!(fix.flags.status_ok());
        assert!(!fix.flags.north());
        assert!(!fix.flags.east());
        assert_eq!((fix.latitude.degrees, fix.latitude.minutes), (48, 7));
        assert_eq!((fix.longitude.degrees, fix.longitude.minutes), (11, 31));
        assert_eq!((fix.quality, fix.satellites), (2, 8));
        assert_eq!(fix.clock.hour, 12);
        assert_eq!(fix.altitude, Default::default());
    }
}
