use serde::{Deserialize, Serialize};

/// Placement of the two digits sharing one byte.
///
/// Firmware revisions disagree here; `EvenLow` is what the richer revision
/// puts on the wire and stays the default until a bus master confirms one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NibbleOrder {
    /// Digit 0 in the low nibble, digit 1 in the high nibble
    EvenLow,
    /// Digit 0 in the high nibble, digit 1 in the low nibble
    EvenHigh,
}

impl Default for NibbleOrder {
    fn default() -> Self {
        Self::EvenLow
    }
}

impl core::str::FromStr for NibbleOrder {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "even-low" => Ok(Self::EvenLow),
            "even-high" => Ok(Self::EvenHigh),
            _ => Err(()),
        }
    }
}

impl NibbleOrder {
    fn is_high(self, index: usize) -> bool {
        (index % 2 == 1) == (self == Self::EvenLow)
    }
}

/// Decimal digits packed two per byte, earlier digits in earlier bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bcd<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for Bcd<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> Bcd<N> {
    pub const DIGITS: usize = N * 2;

    /// Packs the leading digits of `text`, zero padded.
    /// Stops at the first non digit or once `DIGITS` digits are stored.
    pub fn pack(text: &[u8], order: NibbleOrder) -> Self {
        let mut bytes = [0u8; N];
        for (index, &c) in text.iter().take(Self::DIGITS).enumerate() {
            if !c.is_ascii_digit() {
                break;
            }
            let digit = c - b'0';
            bytes[index / 2] |= if order.is_high(index) { digit << 4 } else { digit };
        }
        Self(bytes)
    }

    pub fn digit(&self, index: usize, order: NibbleOrder) -> u8 {
        if index >= Self::DIGITS {
            return 0;
        }
        let byte = self.0[index / 2];
        if order.is_high(index) {
            byte >> 4
        } else {
            byte & 0x0F
        }
    }

    pub fn digits(self, order: NibbleOrder) -> impl Iterator<Item = u8> {
        (0..Self::DIGITS).map(move |index| self.digit(index, order))
    }

    /// Digits read as one decimal number, `.1457` gives 1457
    pub fn value(&self, order: NibbleOrder) -> u32 {
        self.digits(order).fold(0, |value, digit| value * 10 + digit as u32)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Serialize for Bcd<N> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

mod test {
    #[test]
    fn test_pack() {
        use super::{Bcd, NibbleOrder};

        let bcd = Bcd::<2>::pack(b"1457", NibbleOrder::EvenLow);
        assert_eq!(bcd, Bcd([0x41, 0x75]));
        let bcd = Bcd::<2>::pack(b"1457", NibbleOrder::EvenHigh);
        assert_eq!(bcd, Bcd([0x14, 0x57]));

        assert_eq!(Bcd::<2>::pack(b"1", NibbleOrder::EvenLow), Bcd([0x01, 0x00]));
        assert_eq!(Bcd::<2>::pack(b"", NibbleOrder::EvenLow), Bcd::default());
        assert_eq!(Bcd::<1>::pack(b"35", NibbleOrder::EvenLow), Bcd([0x53]));
    }

    #[test]
    fn test_truncate() {
        use super::{Bcd, NibbleOrder};

        let bcd = Bcd::<2>::pack(b"123456", NibbleOrder::EvenLow);
        assert_eq!(bcd.value(NibbleOrder::EvenLow), 1234);
        let bcd = Bcd::<2>::pack(b"12x4", NibbleOrder::EvenLow);
        assert_eq!(bcd.value(NibbleOrder::EvenLow), 1200);
    }

    #[test]
    fn test_digits() {
        use super::{Bcd, NibbleOrder};

        for &order in [NibbleOrder::EvenLow, NibbleOrder::EvenHigh].iter() {
            let bcd = Bcd::<2>::pack(b"1457", order);
            let mut digits = bcd.digits(order);
            assert_eq!(digits.next(), Some(1));
            assert_eq!(digits.next(), Some(4));
            assert_eq!(digits.next(), Some(5));
            assert_eq!(digits.next(), Some(7));
            assert_eq!(digits.next(), None);
            assert_eq!(bcd.digit(4, order), 0);
        }
    }
}
