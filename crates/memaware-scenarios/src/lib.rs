//! Memory-awareness scenarios and the driver that runs them.
//!
//! Each [`scenario::Scenario`] turns domain parameters such as `"100m"`
//! into a launch configuration plus the expectations the runtime must meet.
//! The [`driver::Driver`] probes the environment, owns the test image for
//! the duration of the run, and executes scenarios one at a time.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod catalog;
pub mod context;
pub mod driver;
pub mod exceeds;
pub mod programs;
pub mod report;
pub mod scenario;

#[cfg(test)]
pub(crate) mod testing;
