#![no_std]

#[macro_use]
extern crate log;

pub mod algorithm;
pub mod components;
pub mod config;
pub mod hal;
pub mod logger;
pub mod scheduler;
pub mod sys;
pub mod types;

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;
