use core::str::Split;

use serde::{Deserialize, Serialize};

use super::setter::{Error, Setter, Value};
use crate::ranging::{Conversion, DEFAULT_OVERFLOW_LIMIT};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Sonar {
    pub enable: bool,
    pub conversion: Conversion,
    /// Window size of the moving average, 0 or 1 disables averaging
    pub averaging: u8,
    /// Timer overflows without an echo before a ping is given up
    pub overflow_limit: u8,
}

impl Default for Sonar {
    fn default() -> Self {
        Self {
            enable: true,
            conversion: Conversion::default(),
            averaging: 0,
            overflow_limit: DEFAULT_OVERFLOW_LIMIT,
        }
    }
}

impl Setter for Sonar {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), Error> {
        match path.next().ok_or(Error::MalformedPath)? {
            "enable" => self.enable = value.parse()?.unwrap_or(true),
            "conversion" => self.conversion = value.parse()?.unwrap_or_default(),
            "averaging" => self.averaging = value.parse()?.unwrap_or(0),
            "overflow-limit" => {
                self.overflow_limit = value.parse()?.unwrap_or(DEFAULT_OVERFLOW_LIMIT)
            }
            _ => return Err(Error::MalformedPath),
        }
        Ok(())
    }
}
