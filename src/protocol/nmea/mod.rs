//! Incremental NMEA 0183 parser.
//!
//! Bytes are fed one at a time, typically straight out of the receive
//! ring. Fields are decoded as soon as their token completes and merged
//! into the fix record once the sentence ends with an acceptable checksum.

pub mod checksum;
pub mod sentence;

use ascii::AsciiChar;
use heapless::Vec;

use crate::config::{Sentences, GNSS};
use crate::types::{FixRecord, NibbleOrder};
pub use checksum::{Checksum, ChecksumPhase};
pub use sentence::{Sentence, SentenceKind};

/// Longer tokens are truncated
pub const TOKEN_CAPACITY: usize = 15;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    pub sentences: Sentences,
    pub parse_time: bool,
    pub parse_altitude: bool,
    pub nibble_order: NibbleOrder,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::from(&GNSS::default())
    }
}

impl From<&GNSS> for ParserOptions {
    fn from(config: &GNSS) -> Self {
        Self {
            sentences: config.sentences,
            parse_time: config.parse_time,
            parse_altitude: config.parse_altitude,
            nibble_order: config.nibble_order,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub committed: u32,
    pub rejected: u32,
}

pub struct Parser {
    options: ParserOptions,
    sentence: Sentence,
    checksum: Checksum,
    token_index: u8,
    token: Vec<u8, TOKEN_CAPACITY>,
    fix: FixRecord,
    statistics: Statistics,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            sentence: Sentence::Unknown,
            checksum: Checksum::default(),
            token_index: 0,
            token: Vec::new(),
            fix: FixRecord::default(),
            statistics: Statistics::default(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Fields merged from every accepted sentence so far
    pub fn fix(&self) -> &FixRecord {
        &self.fix
    }

    pub fn checksum_phase(&self) -> ChecksumPhase {
        self.checksum.phase()
    }

    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Drops the sentence in progress, the fix record is kept
    pub fn reset(&mut self) {
        self.sentence = Sentence::Unknown;
        self.checksum = Checksum::default();
        self.token_index = 0;
        self.token.clear();
    }

    fn start_sentence(&mut self) {
        self.reset();
        self.checksum.start();
    }

    fn finish_token(&mut self) {
        match self.checksum.phase() {
            ChecksumPhase::Reading => self.checksum.verify(&self.token),
            ChecksumPhase::Accumulating if self.token_index == 0 => {
                self.sentence = Sentence::select(&self.token, self.options.sentences)
            }
            _ => self.sentence.field(self.token_index, &self.token, &self.options),
        }
        self.token.clear();
        self.token_index = self.token_index.saturating_add(1);
    }

    fn finish_sentence(&mut self) -> Option<SentenceKind> {
        let sentence = core::mem::take(&mut self.sentence);
        let phase = self.checksum.phase();
        self.checksum.finish();
        if phase == ChecksumPhase::Invalid {
            self.statistics.rejected = self.statistics.rejected.wrapping_add(1);
            debug!("Checksum mismatch, {:?} sentence dropped", sentence.kind());
            return None;
        }
        let kind = sentence.commit(&mut self.fix, &self.options)?;
        self.statistics.committed = self.statistics.committed.wrapping_add(1);
        trace!("{:?} sentence committed", kind);
        Some(kind)
    }

    /// Feeds one byte, returns the kind of sentence it completed
    pub fn process(&mut self, byte: u8) -> Option<SentenceKind> {
        match AsciiChar::from_ascii(byte) {
            Ok(AsciiChar::Dollar) => self.start_sentence(),
            Ok(AsciiChar::Comma) => {
                self.checksum.feed(byte);
                self.finish_token();
            }
            Ok(AsciiChar::Asterisk) => {
                self.finish_token();
                self.checksum.expect();
            }
            Ok(AsciiChar::CarriageReturn) => (),
            Ok(AsciiChar::LineFeed) => {
                self.finish_token();
                return self.finish_sentence();
            }
            _ => {
                self.token.push(byte).ok();
                self.checksum.feed(byte);
            }
        }
        None
    }

    /// Feeds a chunk of bytes, returns the last sentence it completed
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Option<SentenceKind> {
        bytes.iter().fold(None, |last, &byte| self.process(byte).or(last))
    }
}

mod test {
    #[cfg(test)]
    const RMC: &[u8] = b"$GPRMC,125934.000,V,5123.1457,N,00645.0808,E,,,020811,,*13\r\n";
    #[cfg(test)]
    const GGA: &[u8] =
        b"$GPGGA,125934.000,5123.1457,N,00645.0808,E,1,07,1.2,102.35,M,47.0,M,,*63\r\n";

    #[test]
    fn test_rmc() {
        use super::{ChecksumPhase, Parser, SentenceKind};
        use crate::types::{Bcd, CalendarDate, ClockTime, NibbleOrder};

        let mut parser = Parser::new(Default::default());
        let mut committed = None;
        for &byte in RMC.iter() {
            if let Some(kind) = parser.process(byte) {
                assert_eq!(committed, None);
                committed = Some(kind);
            }
        }
        assert_eq!(committed, Some(SentenceKind::RMC));
        assert_eq!(parser.checksum_phase(), ChecksumPhase::Inactive);

        let fix = parser.fix();
        assert!(!fix.flags.status_ok());
        assert!(fix.flags.north());
        assert!(fix.flags.east());
        assert_eq!((fix.latitude.degrees, fix.latitude.minutes), (51, 23));
        assert_eq!(fix.latitude.minute_fraction, Bcd([0x41, 0x75]));
        let digits: Vec<u8> =
            fix.latitude.minute_fraction.digits(NibbleOrder::EvenLow).collect();
        assert_eq!(digits, vec![1, 4, 5, 7]);
        assert_eq!((fix.longitude.degrees, fix.longitude.minutes), (6, 45));
        assert_eq!(fix.longitude.minute_fraction.value(NibbleOrder::EvenLow), 808);
        assert_eq!(fix.date, CalendarDate { day: 2, month: 8, year: 11 });
        assert_eq!(fix.clock, ClockTime { hour: 12, minute: 59, second: 34 });
        assert_eq!(parser.statistics().committed, 1);
    }

    #[test]
    fn test_corrupted_checksum() {
        use super::Parser;

        let mut parser = Parser::new(Default::default());
        let mut corrupted = RMC.to_vec();
        let position = corrupted.iter().position(|&c| c == b'*').unwrap();
        corrupted[position + 2] = b'4';
        assert_eq!(parser.process_bytes(&corrupted), None);
        assert_eq!(parser.fix(), &Default::default());
        assert_eq!(parser.statistics().rejected, 1);

        let mut altered = RMC.to_vec();
        altered[18] = b'A';
        assert_eq!(parser.process_bytes(&altered), None);
        assert_eq!(parser.fix(), &Default::default());
    }

    #[test]
    fn test_missing_checksum() {
        use super::{Parser, SentenceKind};

        let mut parser = Parser::new(Default::default());
        let sentence = b"$GPRMC,125934.000,A,5123.1457,N,00645.0808,E,,,020811,,*\r\n";
        assert_eq!(parser.process_bytes(sentence), Some(SentenceKind::RMC));
        assert!(parser.fix().flags.status_ok());

        let sentence = b"$GPRMC,125935.000,A,5123.1457,N,00645.0808,E,,,020811,,\r\n";
        assert_eq!(parser.process_bytes(sentence), Some(SentenceKind::RMC));
        assert_eq!(parser.fix().clock.second, 35);
    }

    #[test]
    fn test_merge() {
        use super::{Parser, SentenceKind};
        use crate::types::{AltitudeReading, Bcd};

        let mut parser = Parser::new(Default::default());
        assert_eq!(parser.process_bytes(GGA), Some(SentenceKind::GGA));
        let fix = *parser.fix();
        assert!(fix.flags.status_ok());
        assert_eq!((fix.quality, fix.satellites), (1, 7));
        assert_eq!(fix.altitude, AltitudeReading { meters: 102, fraction: Bcd([0x53]) });
        assert_eq!(fix.date, Default::default());

        assert_eq!(parser.process_bytes(RMC), Some(SentenceKind::RMC));
        let fix = *parser.fix();
        assert!(!fix.flags.status_ok());
        assert_eq!(fix.date.year, 11);
        assert_eq!((fix.quality, fix.satellites), (1, 7));
        assert_eq!(fix.altitude.meters, 102);

        let south_west = b"$GPGGA,120000,4807.0380,S,01131.0000,W,0,00,,-12.5,M,,M,,*66\r\n";
        assert_eq!(parser.process_bytes(south_west), Some(SentenceKind::GGA));
        let fix = *parser.fix();
        assert!(!fix.flags.north());
        assert!(!fix.flags.east());
        assert_eq!(fix.altitude, AltitudeReading { meters: -12, fraction: Bcd([0x05]) });
        assert_eq!(fix.date.year, 11);
        assert_eq!(fix.clock.hour, 12);
    }

    #[test]
    fn test_options() {
        use super::{Parser, ParserOptions, SentenceKind};
        use crate::config::Sentences;

        let mut parser = Parser::new(ParserOptions {
            parse_time: false,
            parse_altitude: false,
            ..Default::default()
        });
        parser.process_bytes(GGA);
        parser.process_bytes(RMC);
        assert_eq!(parser.fix().clock, Default::default());
        assert_eq!(parser.fix().date, Default::default());
        assert_eq!(parser.fix().altitude, Default::default());
        assert_eq!(parser.fix().latitude.degrees, 51);

        let sentences = Sentences { rmc: false, gga: true };
        let mut parser = Parser::new(ParserOptions { sentences, ..Default::default() });
        assert_eq!(parser.process_bytes(RMC), None);
        assert_eq!(parser.process_bytes(GGA), Some(SentenceKind::GGA));
    }

    #[test]
    fn test_noise() {
        use super::{Parser, SentenceKind};

        let mut parser = Parser::new(Default::default());
        let unknown = b"$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00*74\r\n";
        assert_eq!(parser.process_bytes(unknown), None);
        assert_eq!(parser.process_bytes(b"GPRMC,125934.000,A,5123.1457,N\r\n"), None);
        assert_eq!(parser.process_bytes(b"\xff\x00garbage$GP"), None);
        assert_eq!(parser.fix(), &Default::default());

        assert_eq!(parser.process_bytes(RMC), Some(SentenceKind::RMC));
        assert_eq!(parser.process_bytes(b"\r\n"), None);
        assert_eq!(parser.statistics().committed, 1);
    }

    #[test]
    fn test_token_truncation() {
        use super::{Parser, SentenceKind, TOKEN_CAPACITY};

        let mut parser = Parser::new(Default::default());
        let sentence = b"$GPGGA,125934.000,5123.14571234567890,N,00645.0808,E,1,07,1.2,1.5,M,,M,,\r\n";
        assert_eq!(parser.process_bytes(sentence), Some(SentenceKind::GGA));
        assert_eq!(parser.fix().latitude.minute_fraction.value(Default::default()), 1457);

        parser.process_bytes(b"$GPRMC,");
        parser.process_bytes(&[b'1'; TOKEN_CAPACITY + 10]);
        assert_eq!(parser.token.len(), TOKEN_CAPACITY);
    }
}
