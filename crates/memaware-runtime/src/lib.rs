//! Container launch configuration and execution for the memaware harness.
//!
//! A [`launch::LaunchConfig`] describes one container run, a
//! [`backend::ContainerEngine`] turns it into an engine invocation, and the
//! [`runner::ContainerRunner`] supervises that invocation and hands back a
//! [`result::RunResult`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod image;
pub mod launch;
pub mod process;
pub mod result;
pub mod runner;
