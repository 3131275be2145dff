//! The navigation record served to the bus master.
//!
//! Producers update their part of the record whenever they have news, the
//! main loop then encodes everything into a byte image. The bus master
//! reads the image byte by byte at its own pace, each byte is consistent
//! on its own while a multi byte read may straddle two publications.
//!
//! Optical deltas are the exception: they count motion since the previous
//! readout. Their bytes are written together with the accumulator's record
//! of what was published, and withdrawn together with it once the master
//! completes a read.

use core::sync::atomic::{AtomicU8, Ordering};

use heapless::Vec;
use serde::Serialize;

use crate::config::Config;
use crate::optical::{Delta, OpticalAccumulator};
use crate::sync::Shared;
use crate::types::{AltitudeReading, Coordinate, FixRecord};

/// Flags, date, clock, coordinates, altitude, quality, satellites,
/// distance and deltas
pub const MAX_IMAGE_SIZE: usize =
    1 + 3 + 3 + 2 * Coordinate::SIZE + AltitudeReading::SIZE + 1 + 1 + 2 + Delta::SIZE;

/// Sections present in the published image
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub gps: bool,
    pub time: bool,
    pub altitude: bool,
    pub sonar: bool,
    pub optical: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Layout {
    pub fn from_config(config: &Config) -> Self {
        let gps = config.gps.enable;
        Self {
            gps,
            time: gps && config.gps.parse_time,
            altitude: gps && config.gps.parse_altitude,
            sonar: config.sonar.enable,
            optical: config.optical.enable,
        }
    }

    pub fn size(&self) -> usize {
        let mut size = 0;
        if self.gps {
            size += 1 + 2 * Coordinate::SIZE + 1 + 1;
        }
        if self.time {
            size += 3 + 3;
        }
        if self.altitude {
            size += AltitudeReading::SIZE;
        }
        if self.sonar {
            size += 2;
        }
        if self.optical {
            size += Delta::SIZE;
        }
        size
    }

    /// Where the optical deltas start, they close the image
    pub fn optical_offset(&self) -> usize {
        match self.optical {
            true => self.size() - Delta::SIZE,
            false => self.size(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NavSnapshot {
    pub fix: FixRecord,
    pub distance: Option<u16>,
    pub optical: Delta,
}

impl core::fmt::Display for NavSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        serde_json_core_fmt::to_fmt(f, self)
    }
}

pub struct NavAggregate {
    layout: Layout,
    fix: Shared<FixRecord>,
    distance: Shared<Option<u16>>,
    optical: OpticalAccumulator,
    image: [AtomicU8; MAX_IMAGE_SIZE],
}

impl NavAggregate {
    pub fn new(layout: Layout) -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const ZERO: AtomicU8 = AtomicU8::new(0);
        Self {
            layout,
            fix: Shared::default(),
            distance: Shared::new(None),
            optical: OpticalAccumulator::new(),
            image: [ZERO; MAX_IMAGE_SIZE],
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn set_fix(&self, fix: FixRecord) {
        self.fix.set(fix)
    }

    pub fn fix(&self) -> FixRecord {
        self.fix.get()
    }

    /// Centimeters, `None` when the last ping got no echo
    pub fn set_distance(&self, distance: Option<u16>) {
        self.distance.set(distance)
    }

    pub fn distance(&self) -> Option<u16> {
        self.distance.get()
    }

    pub fn optical(&self) -> &OpticalAccumulator {
        &self.optical
    }

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot { fix: self.fix(), distance: self.distance(), optical: self.optical.read() }
    }

    /// Little endian multi byte fields, sections in declaration order of `Layout`
    pub fn encode(&self) -> Vec<u8, MAX_IMAGE_SIZE> {
        let snapshot = self.snapshot();
        let layout = self.layout;
        let fix = &snapshot.fix;
        let mut bytes: Vec<u8, MAX_IMAGE_SIZE> = Vec::new();
        if layout.gps {
            bytes.push(fix.flags.0).ok();
        }
        if layout.time {
            bytes.extend_from_slice(&[fix.date.day, fix.date.month, fix.date.year]).ok();
            bytes.extend_from_slice(&[fix.clock.hour, fix.clock.minute, fix.clock.second]).ok();
        }
        if layout.gps {
            bytes.extend_from_slice(&fix.latitude.to_bytes()).ok();
            bytes.extend_from_slice(&fix.longitude.to_bytes()).ok();
        }
        if layout.altitude {
            bytes.extend_from_slice(&fix.altitude.to_bytes()).ok();
        }
        if layout.gps {
            bytes.extend_from_slice(&[fix.quality, fix.satellites]).ok();
        }
        if layout.sonar {
            let distance = match snapshot.distance {
                Some(distance) => distance.min(i16::MAX as u16) as i16,
                None => -1,
            };
            bytes.extend_from_slice(&distance.to_le_bytes()).ok();
        }
        if layout.optical {
            bytes.extend_from_slice(&snapshot.optical.to_bytes()).ok();
        }
        bytes
    }

    fn optical_window(&self) -> &[AtomicU8] {
        &self.window()[self.layout.optical_offset()..]
    }

    /// Refreshes the image served to the bus master
    pub fn publish(&self) {
        let bytes = self.encode();
        let offset = self.layout.optical_offset();
        store(&self.image[..offset], &bytes[..offset]);
        let window = self.optical_window();
        self.optical.publish(|delta| store(window, &delta.to_bytes()));
    }

    /// The bus master has read the image, published deltas are accounted for
    pub fn readout_complete(&self) {
        let window = self.optical_window();
        self.optical.acknowledge(|| store(window, &[0; Delta::SIZE]));
    }

    /// The part of the image covered by the layout
    pub fn window(&self) -> &[AtomicU8] {
        &self.image[..self.layout.size()]
    }

    pub fn read_byte(&self, index: usize) -> Option<u8> {
        self.window().get(index).map(|byte| byte.load(Ordering::Relaxed))
    }
}

fn store(slots: &[AtomicU8], bytes: &[u8]) {
    for (slot, &byte) in slots.iter().zip(bytes.iter()) {
        slot.store(byte, Ordering::Relaxed);
    }
}

mod test {
    #[cfg(test)]
    fn fix() -> crate::types::FixRecord {
        use crate::types::{
            AltitudeReading, Bcd, CalendarDate, ClockTime, Coordinate, FixFlags, FixRecord,
        };

        FixRecord {
            flags: FixFlags(FixFlags::STATUS_OK | FixFlags::LATITUDE_NORTH | FixFlags::LONGITUDE_EAST),
            date: CalendarDate { day: 2, month: 8, year: 11 },
            clock: ClockTime { hour: 12, minute: 59, second: 34 },
            latitude: Coordinate { degrees: 51, minutes: 23, minute_fraction: Bcd([0x41, 0x75]) },
            longitude: Coordinate { degrees: 6, minutes: 45, minute_fraction: Bcd([0x80, 0x80]) },
            altitude: AltitudeReading { meters: 102, fraction: Bcd([0x53]) },
            quality: 1,
            satellites: 7,
        }
    }

    #[test]
    fn test_full_layout() {
        use hex_literal::hex;

        use super::{Layout, NavAggregate, MAX_IMAGE_SIZE};

        let layout = Layout::default();
        assert_eq!(layout.size(), MAX_IMAGE_SIZE);
        let aggregate = NavAggregate::new(layout);
        aggregate.set_fix(fix());
        aggregate.set_distance(Some(10));
        aggregate.optical().accumulate(2, -1);
        aggregate.optical().accumulate(-1, 3);

        assert_eq!(aggregate.read_byte(0), Some(0));
        aggregate.publish();
        let image: Vec<u8> = (0..layout.size()).filter_map(|i| aggregate.read_byte(i)).collect();
        let expected = hex!("07 02080b 0c3b22 33174175 062d8080 660053 01 07 0a00 01000200");
        assert_eq!(image, expected.to_vec());
        assert_eq!(aggregate.read_byte(MAX_IMAGE_SIZE), None);
    }

    #[test]
    fn test_partial_layout() {
        use hex_literal::hex;

        use super::{Layout, NavAggregate};

        let layout = Layout { gps: true, time: false, altitude: false, sonar: true, optical: false };
        assert_eq!(layout.size(), 13);
        let aggregate = NavAggregate::new(layout);
        aggregate.set_fix(fix());
        aggregate.publish();
        assert_eq!(aggregate.window().len(), 13);
        assert_eq!(&aggregate.encode()[..], &hex!("07 33174175 062d8080 01 07 ffff")[..]);

        let layout = Layout { gps: false, time: false, altitude: false, sonar: false, optical: true };
        let aggregate = NavAggregate::new(layout);
        aggregate.optical().accumulate(-2, 1);
        assert_eq!(&aggregate.encode()[..], &hex!("feff 0100")[..]);
    }

    #[test]
    fn test_from_config() {
        use super::Layout;
        use crate::config::Config;

        let mut config = Config::default();
        config.gps.parse_time = false;
        config.optical.enable = false;
        let layout = Layout::from_config(&config);
        assert_eq!(layout.size(), 1 + 8 + 3 + 1 + 1 + 2);

        config.gps.enable = false;
        assert_eq!(Layout::from_config(&config).size(), 2);
    }

    #[test]
    fn test_snapshot_json() {
        use super::NavAggregate;

        let aggregate = NavAggregate::new(Default::default());
        aggregate.set_distance(Some(10));
        let json = format!("{}", aggregate.snapshot());
        assert!(json.starts_with("{\"fix\":{"));
        assert!(json.contains("\"distance\":10"));
        assert!(json.ends_with("\"optical\":{\"dx\":0,\"dy\":0}}"));
    }
}
