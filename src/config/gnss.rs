use core::str::Split;

use heapless::String;
use serde::{Deserialize, Serialize};

use super::setter::{Error, Setter, Value};
use crate::types::NibbleOrder;

pub const DEFAULT_BAUDRATE: u32 = 38400;
pub const DEFAULT_INIT_DELAY_MS: u16 = 250;
pub const MAX_INIT_STRING: usize = 64;

/// Sentence identifiers the parser should recognise
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentences {
    pub rmc: bool,
    pub gga: bool,
}

impl Default for Sentences {
    fn default() -> Self {
        Self { rmc: true, gga: true }
    }
}

impl Setter for Sentences {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), Error> {
        match path.next().ok_or(Error::MalformedPath)? {
            "rmc" => self.rmc = value.parse()?.unwrap_or(true),
            "gga" => self.gga = value.parse()?.unwrap_or(true),
            _ => return Err(Error::MalformedPath),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GNSS {
    pub enable: bool,
    pub baud: u32,
    pub parse_time: bool,
    pub parse_altitude: bool,
    pub sentences: Sentences,
    pub nibble_order: NibbleOrder,
    /// Written to the receiver once at startup, e.g. `$PMTK220,200*2C\r\n`
    pub init_string: Option<String<MAX_INIT_STRING>>,
    pub init_delay_ms: u16,
}

impl Default for GNSS {
    fn default() -> Self {
        Self {
            enable: true,
            baud: DEFAULT_BAUDRATE,
            parse_time: true,
            parse_altitude: true,
            sentences: Sentences::default(),
            nibble_order: NibbleOrder::default(),
            init_string: None,
            init_delay_ms: DEFAULT_INIT_DELAY_MS,
        }
    }
}

impl Setter for GNSS {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), Error> {
        match path.next().ok_or(Error::MalformedPath)? {
            "enable" => self.enable = value.parse()?.unwrap_or(true),
            "baud" => self.baud = value.parse()?.unwrap_or(DEFAULT_BAUDRATE),
            "parse-time" => self.parse_time = value.parse()?.unwrap_or(true),
            "parse-altitude" => self.parse_altitude = value.parse()?.unwrap_or(true),
            "sentences" => return self.sentences.set(path, value),
            "nibble-order" => self.nibble_order = value.parse()?.unwrap_or_default(),
            "init-string" => self.init_string = value.parse()?,
            "init-delay-ms" => {
                self.init_delay_ms = value.parse()?.unwrap_or(DEFAULT_INIT_DELAY_MS)
            }
            _ => return Err(Error::MalformedPath),
        }
        Ok(())
    }
}
