use core::str::{FromStr, Split};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    MalformedPath,
    UnexpectedValue,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let err_string = match self {
            Self::MalformedPath => "Specified path not exists or invalid",
            Self::UnexpectedValue => "Value not valid",
        };
        write!(f, "{}", err_string)
    }
}

/// Right hand side of `path=value`, absent value restores the default
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Value<'a>(pub Option<&'a str>);

impl<'a> Value<'a> {
    pub fn parse<T: FromStr>(self) -> Result<Option<T>, Error> {
        match self.0 {
            Some(value) => T::from_str(value).map(Some).map_err(|_| Error::UnexpectedValue),
            None => Ok(None),
        }
    }
}

pub trait Setter {
    fn set(&mut self, path: &mut Split<char>, value: Value) -> Result<(), Error>;
}
