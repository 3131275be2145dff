//! Conversions of single NMEA tokens into fix fields.
//!
//! Every function takes the bare token, without delimiters. Missing parts
//! decode as zeros, except coordinates which need a decimal point and
//! yield `None` without one.

use crate::types::{AltitudeReading, Bcd, CalendarDate, ClockTime, Coordinate, NibbleOrder};

/// Optional sign followed by digits, anything else ends the number
pub fn parse_integer(text: &[u8]) -> i32 {
    let (negative, digits) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .fold(0i32, |value, &c| value.saturating_mul(10).saturating_add((c - b'0') as i32));
    if negative {
        -value
    } else {
        value
    }
}

/// Like `parse_integer`, clamped into `u8`
pub fn parse_u8(text: &[u8]) -> u8 {
    parse_integer(text).clamp(0, u8::MAX as i32) as u8
}

/// `DDDMM.mmmm`, degrees may have one to three digits
pub fn parse_coordinate(token: &[u8], order: NibbleOrder) -> Option<Coordinate> {
    let point = token.iter().position(|&c| c == b'.')?;
    let split = point.saturating_sub(2);
    Some(Coordinate {
        degrees: parse_u8(&token[..split]),
        minutes: parse_u8(&token[split..point]),
        minute_fraction: Bcd::pack(&token[point + 1..], order),
    })
}

/// Splits the first six characters into three two digit numbers
fn parse_six_digits(token: &[u8]) -> (u8, u8, u8) {
    if token.len() < 6 {
        return (0, 0, 0);
    }
    let last = parse_u8(&token[4..6]);
    let middle = parse_u8(&token[2..4]);
    let first = parse_u8(&token[..2]);
    (first, middle, last)
}

/// `HHMMSS`, sub seconds are ignored
pub fn parse_clock(token: &[u8]) -> ClockTime {
    let (hour, minute, second) = parse_six_digits(token);
    ClockTime { hour, minute, second }
}

/// `DDMMYY`
pub fn parse_date(token: &[u8]) -> CalendarDate {
    let (day, month, year) = parse_six_digits(token);
    CalendarDate { day, month, year }
}

pub fn parse_altitude(token: &[u8], order: NibbleOrder) -> AltitudeReading {
    let (whole, fraction) = match token.iter().position(|&c| c == b'.') {
        Some(point) => (&token[..point], Bcd::pack(&token[point + 1..], order)),
        None => (token, Bcd::default()),
    };
    let meters = parse_integer(whole).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    AltitudeReading { meters, fraction }
}

mod test {
    #[test]
    fn test_parse_integer() {
        use super::parse_integer;

        assert_eq!(parse_integer(b"51"), 51);
        assert_eq!(parse_integer(b"-12"), -12);
        assert_eq!(parse_integer(b"+7"), 7);
        assert_eq!(parse_integer(b"07x9"), 7);
        assert_eq!(parse_integer(b""), 0);
        assert_eq!(parse_integer(b"-"), 0);
        assert_eq!(parse_integer(b"99999999999"), i32::MAX);
    }

    #[test]
    fn test_parse_coordinate() {
        use super::parse_coordinate;
        use crate::types::{Bcd, NibbleOrder};

        let order = NibbleOrder::EvenLow;
        let latitude = parse_coordinate(b"5123.1457", order).unwrap();
        assert_eq!(latitude.degrees, 51);
        assert_eq!(latitude.minutes, 23);
        assert_eq!(latitude.minute_fraction, Bcd([0x41, 0x75]));
        let digits: Vec<u8> = latitude.minute_fraction.digits(order).collect();
        assert_eq!(digits, vec![1, 4, 5, 7]);

        let longitude = parse_coordinate(b"00645.0808", order).unwrap();
        assert_eq!((longitude.degrees, longitude.minutes), (6, 45));
        assert_eq!(longitude.minute_fraction.value(order), 808);

        let longitude = parse_coordinate(b"17959.99", order).unwrap();
        assert_eq!((longitude.degrees, longitude.minutes), (179, 59));
        assert_eq!(longitude.minute_fraction.value(order), 9900);

        assert_eq!(parse_coordinate(b"5123", order), None);
        assert_eq!(parse_coordinate(b"", order), None);

        let short = parse_coordinate(b"3.5", order).unwrap();
        assert_eq!((short.degrees, short.minutes), (0, 3));
    }

    #[test]
    fn test_parse_clock_and_date() {
        use super::{parse_clock, parse_date};
        use crate::types::{CalendarDate, ClockTime};

        let expected = ClockTime { hour: 12, minute: 59, second: 34 };
        assert_eq!(parse_clock(b"125934"), expected);
        assert_eq!(parse_clock(b"125934.000"), expected);
        assert_eq!(parse_clock(b"1259"), ClockTime::default());
        assert_eq!(parse_clock(b""), ClockTime::default());

        assert_eq!(parse_date(b"020811"), CalendarDate { day: 2, month: 8, year: 11 });
    }

    #[test]
    fn test_parse_altitude() {
        use super::parse_altitude;
        use crate::types::{AltitudeReading, Bcd, NibbleOrder};

        let order = NibbleOrder::EvenLow;
        let expected = AltitudeReading { meters: 102, fraction: Bcd([0x53]) };
        assert_eq!(parse_altitude(b"102.35", order), expected);
        let expected = AltitudeReading { meters: -12, fraction: Bcd([0x05]) };
        assert_eq!(parse_altitude(b"-12.5", order), expected);
        let expected = AltitudeReading { meters: 61, fraction: Bcd::default() };
        assert_eq!(parse_altitude(b"61", order), expected);
        assert_eq!(parse_altitude(b"1.234", order).fraction.value(order), 23);
    }
}
