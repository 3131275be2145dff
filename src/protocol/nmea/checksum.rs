#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChecksumPhase {
    /// Outside of a sentence, or the sentence carried no checksum
    Inactive,
    /// Between `$` and `*`
    Accumulating,
    /// Collecting the transmitted checksum after `*`
    Reading,
    Valid,
    Invalid,
}

impl Default for ChecksumPhase {
    fn default() -> Self {
        Self::Inactive
    }
}

/// XOR over every byte strictly between `$` and `*`
#[derive(Copy, Clone, Debug, Default)]
pub struct Checksum {
    phase: ChecksumPhase,
    value: u8,
}

fn parse_hex(token: &[u8]) -> Option<u8> {
    if token.len() > 2 {
        return None;
    }
    token.iter().try_fold(0u8, |value, &c| Some(value << 4 | (c as char).to_digit(16)? as u8))
}

impl Checksum {
    pub fn phase(&self) -> ChecksumPhase {
        self.phase
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn start(&mut self) {
        self.phase = ChecksumPhase::Accumulating;
        self.value = 0;
    }

    pub fn feed(&mut self, byte: u8) {
        if self.phase == ChecksumPhase::Accumulating {
            self.value ^= byte;
        }
    }

    pub fn expect(&mut self) {
        self.phase = ChecksumPhase::Reading;
    }

    /// An empty token means no checksum was transmitted
    pub fn verify(&mut self, token: &[u8]) {
        self.phase = match token {
            [] => ChecksumPhase::Inactive,
            _ if parse_hex(token) == Some(self.value) => ChecksumPhase::Valid,
            _ => ChecksumPhase::Invalid,
        };
    }

    pub fn finish(&mut self) {
        self.phase = ChecksumPhase::Inactive;
    }
}

mod test {
    #[test]
    fn test_checksum() {
        use super::{Checksum, ChecksumPhase};

        let mut checksum = Checksum::default();
        assert_eq!(checksum.phase(), ChecksumPhase::Inactive);
        checksum.feed(b'G');
        assert_eq!(checksum.value(), 0);

        let body = b"GPGGA,125934.000,5123.1457,N,00645.0808,E,1,07,1.2,102.35,M,47.0,M,,";
        checksum.start();
        body.iter().for_each(|&byte| checksum.feed(byte));
        checksum.expect();
        assert_eq!(checksum.phase(), ChecksumPhase::Reading);
        assert_eq!(checksum.value(), 0x63);

        checksum.verify(b"63");
        assert_eq!(checksum.phase(), ChecksumPhase::Valid);
        checksum.verify(b"64");
        assert_eq!(checksum.phase(), ChecksumPhase::Invalid);
        checksum.verify(b"6G");
        assert_eq!(checksum.phase(), ChecksumPhase::Invalid);
        checksum.verify(b"");
        assert_eq!(checksum.phase(), ChecksumPhase::Inactive);
    }

    #[test]
    fn test_lowercase_hex() {
        use super::{Checksum, ChecksumPhase};

        let mut checksum = Checksum::default();
        checksum.start();
        b"GPRMC,092750.000,A,5321.6802,N,00630.3372,W,0.02,31.66,280511,,,A"
            .iter()
            .for_each(|&byte| checksum.feed(byte));
        checksum.verify(b"43");
        assert_eq!(checksum.phase(), ChecksumPhase::Valid);

        let mut checksum = Checksum::default();
        checksum.start();
        checksum.feed(0xAB);
        checksum.verify(b"ab");
        assert_eq!(checksum.phase(), ChecksumPhase::Valid);
    }
}
