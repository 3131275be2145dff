#![cfg_attr(not(test), no_std)]

extern crate ascii;
extern crate chrono;
extern crate fixed_point;
extern crate heapless;
#[macro_use]
extern crate log;
extern crate nb;
extern crate serde;

pub mod aggregate;
pub mod codec;
pub mod config;
pub mod drivers;
pub mod error;
pub mod logger;
pub mod optical;
pub mod protocol;
pub mod ranging;
pub mod scheduler;
pub mod sync;
pub mod transport;
pub mod types;

pub use error::Error;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;
