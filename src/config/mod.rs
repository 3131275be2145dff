//! Runtime configuration.
//!
//! Deserialized from JSON at startup, individual values can then be
//! overridden through dotted paths such as `sonar.conversion`.

pub mod gnss;
pub mod setter;
pub mod sonar;

use core::str::Split;

use serde::{Deserialize, Serialize};

use crate::ranging::window::MAX_WINDOW;
use crate::sync::ring_buffer::burst_size;
use crate::Error;
pub use gnss::{Sentences, GNSS};
pub use setter::{Setter, Value};
pub use sonar::Sonar;

pub const DEFAULT_ADDRESS: u8 = 0x11;
pub const DEFAULT_LOOP_MICROS: u32 = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Optical {
    pub enable: bool,
}

impl Default for Optical {
    fn default() -> Self {
        Self { enable: true }
    }
}

impl Setter for Optical {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), setter::Error> {
        match path.next().ok_or(setter::Error::MalformedPath)? {
            "enable" => self.enable = value.parse()?.unwrap_or(true),
            _ => return Err(setter::Error::MalformedPath),
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transport {
    /// 7 bit bus slave address
    pub address: u8,
}

impl Default for Transport {
    fn default() -> Self {
        Self { address: DEFAULT_ADDRESS }
    }
}

impl Setter for Transport {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), setter::Error> {
        match path.next().ok_or(setter::Error::MalformedPath)? {
            "address" => self.address = value.parse()?.unwrap_or(DEFAULT_ADDRESS),
            _ => return Err(setter::Error::MalformedPath),
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Scheduler {
    /// Worst case time between two main loop iterations
    pub loop_micros: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { loop_micros: DEFAULT_LOOP_MICROS }
    }
}

impl Setter for Scheduler {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), setter::Error> {
        match path.next().ok_or(setter::Error::MalformedPath)? {
            "loop-micros" => self.loop_micros = value.parse()?.unwrap_or(DEFAULT_LOOP_MICROS),
            _ => return Err(setter::Error::MalformedPath),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gps: GNSS,
    pub sonar: Sonar,
    pub optical: Optical,
    pub transport: Transport,
    pub scheduler: Scheduler,
}

impl Setter for Config {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), setter::Error> {
        match path.next().ok_or(setter::Error::MalformedPath)? {
            "gps" => self.gps.set(path, value),
            "sonar" => self.sonar.set(path, value),
            "optical" => self.optical.set(path, value),
            "transport" => self.transport.set(path, value),
            "scheduler" => self.scheduler.set(path, value),
            _ => Err(setter::Error::MalformedPath),
        }
    }
}

impl Config {
    /// Applies `path=value`, a bare `path` restores that value's default
    pub fn apply(&mut self, line: &str) -> Result<(), setter::Error> {
        let mut split = line.splitn(2, '=');
        let path = split.next().unwrap_or_default().trim();
        let value = Value(split.next().map(str::trim));
        self.set(&mut path.split('.'), value)
    }

    /// Checks the combination of values against what the firmware can honor.
    /// `ring_capacity` is the size of the GPS receive ring.
    pub fn validate(&self, ring_capacity: usize) -> Result<(), Error> {
        if self.transport.address > 0x7F {
            warn!("Bus address {:#x} exceeds 7 bits", self.transport.address);
            return Err(Error::InvalidConfig);
        }
        let sonar = &self.sonar;
        if sonar.enable && (sonar.overflow_limit == 0 || sonar.averaging as usize > MAX_WINDOW) {
            warn!("Sonar averaging or overflow limit out of range");
            return Err(Error::InvalidConfig);
        }
        if !self.gps.enable {
            return Ok(());
        }
        if !self.gps.sentences.rmc && !self.gps.sentences.gga {
            warn!("GPS enabled without any sentence");
            return Err(Error::InvalidConfig);
        }
        let burst = burst_size(self.gps.baud, self.scheduler.loop_micros);
        if burst > ring_capacity {
            warn!("Receive ring of {} bytes cannot hold bursts of {} bytes", ring_capacity, burst);
            return Err(Error::RingTooSmall);
        }
        Ok(())
    }
}

mod test {
    #[test]
    fn test_deserialize() {
        use super::Config;
        use crate::ranging::Conversion;
        use crate::types::NibbleOrder;

        let json = r#"{
            "gps": {
                "baud": 9600,
                "parse-altitude": false,
                "sentences": {"gga": false},
                "nibble-order": "even-high",
                "init-string": "$PMTK220,200*2C\r\n"
            },
            "sonar": {"conversion": "approximate", "averaging": 4},
            "transport": {"address": 34}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.gps.baud, 9600);
        assert!(config.gps.parse_time);
        assert!(!config.gps.parse_altitude);
        assert!(config.gps.sentences.rmc);
        assert!(!config.gps.sentences.gga);
        assert_eq!(config.gps.nibble_order, NibbleOrder::EvenHigh);
        assert_eq!(config.gps.init_string.as_deref(), Some("$PMTK220,200*2C\r\n"));
        assert_eq!(config.sonar.conversion, Conversion::Approximate);
        assert_eq!(config.sonar.averaging, 4);
        assert_eq!(config.sonar.overflow_limit, 1);
        assert!(config.optical.enable);
        assert_eq!(config.transport.address, 0x22);
        assert_eq!(config.scheduler.loop_micros, 1000);

        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_apply() {
        use super::setter::Error;
        use super::Config;
        use crate::ranging::Conversion;

        let mut config = Config::default();
        config.apply("sonar.conversion=approximate").unwrap();
        assert_eq!(config.sonar.conversion, Conversion::Approximate);
        config.apply("gps.sentences.gga = false").unwrap();
        assert!(!config.gps.sentences.gga);
        config.apply("gps.init-string=$PMTK251,9600*17").unwrap();
        assert_eq!(config.gps.init_string.as_deref(), Some("$PMTK251,9600*17"));

        config.apply("sonar.conversion").unwrap();
        assert_eq!(config.sonar.conversion, Conversion::Exact);
        config.apply("gps.init-string").unwrap();
        assert_eq!(config.gps.init_string, None);

        assert_eq!(config.apply("sonar.averaging=many"), Err(Error::UnexpectedValue));
        assert_eq!(config.apply("sonar"), Err(Error::MalformedPath));
        assert_eq!(config.apply("lidar.enable=true"), Err(Error::MalformedPath));
    }

    #[test]
    fn test_validate() {
        use super::Config;
        use crate::Error;

        let mut config = Config::default();
        assert_eq!(config.validate(16), Ok(()));
        assert_eq!(config.validate(2), Err(Error::RingTooSmall));

        config.gps.enable = false;
        assert_eq!(config.validate(0), Ok(()));

        config.sonar.overflow_limit = 0;
        assert_eq!(config.validate(16), Err(Error::InvalidConfig));
        config.sonar.overflow_limit = 1;
        config.sonar.averaging = 17;
        assert_eq!(config.validate(16), Err(Error::InvalidConfig));
        config.sonar.averaging = 16;
        config.transport.address = 0x80;
        assert_eq!(config.validate(16), Err(Error::InvalidConfig));

        let mut config = Config::default();
        config.gps.sentences.rmc = false;
        config.gps.sentences.gga = false;
        assert_eq!(config.validate(16), Err(Error::InvalidConfig));
    }
}
