#![no_std]

pub mod capture;
pub mod register;
pub mod transport;
