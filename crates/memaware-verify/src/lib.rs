//! Assertions over the captured output of a container run.
//!
//! [`analyzer::OutputAnalyzer`] checks a [`memaware_runtime::result::RunResult`]
//! against [`expectation::Expectation`]s. Every check returns a `Result` so
//! checks chain with `?`, and a failed check carries the expectation and an
//! excerpt of the actual output.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod analyzer;
pub mod error;
pub mod expectation;

pub use analyzer::OutputAnalyzer;
pub use error::{AssertionFailure, VerifyError};
pub use expectation::{Check, CheckOutcome, Expectation};
