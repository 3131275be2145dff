use chrono::naive::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ClockTime {
    pub fn to_naive_time(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct CalendarDate {
    pub day: u8,
    pub month: u8,
    /// Two digit year, 11 stands for 2011
    pub year: u8,
}

impl CalendarDate {
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2000 + self.year as i32, self.month.into(), self.day.into())
    }
}

pub fn to_naive_datetime(date: CalendarDate, clock: ClockTime) -> Option<NaiveDateTime> {
    Some(NaiveDateTime::new(date.to_naive_date()?, clock.to_naive_time()?))
}

mod test {
    #[test]
    fn test_to_naive_datetime() {
        use chrono::naive::NaiveDate;

        use super::{to_naive_datetime, CalendarDate, ClockTime};

        let date = CalendarDate { day: 2, month: 8, year: 11 };
        let clock = ClockTime { hour: 12, minute: 59, second: 34 };
        let expected = NaiveDate::from_ymd_opt(2011, 8, 2).unwrap().and_hms_opt(12, 59, 34);
        assert_eq!(to_naive_datetime(date, clock), expected);

        assert_eq!(CalendarDate::default().to_naive_date(), None);
        let clock = ClockTime { hour: 24, minute: 0, second: 0 };
        assert_eq!(clock.to_naive_time(), None);
    }
}
