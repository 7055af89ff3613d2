//! Verification failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::expectation::Expectation;

/// An expectation that did not hold against a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    /// The expectation that failed.
    pub expectation: Expectation,
    /// Fallback that was also tried and failed, if any.
    pub fallback: Option<Expectation>,
    /// Exit code of the run.
    pub exit_code: i32,
    /// Tail of the merged output.
    pub excerpt: String,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}", self.expectation)?;
        if let Some(fallback) = &self.fallback {
            write!(f, " (or tolerated: {fallback})")?;
        }
        write!(f, "; exit code {}; output tail:\n{}", self.exit_code, self.excerpt)
    }
}

impl std::error::Error for AssertionFailure {}

/// Why a check could not pass.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The expectation did not hold.
    #[error(transparent)]
    Failed(Box<AssertionFailure>),

    /// The pattern is not a valid regex. Never tolerated by a fallback.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Regex compilation error.
        source: regex::Error,
    },

    /// The pattern has no capture group with the requested index.
    #[error("pattern `{pattern}` has no capture group {group}")]
    NoSuchGroup {
        /// Pattern that was searched.
        pattern: String,
        /// Requested group index.
        group: usize,
    },
}

impl VerifyError {
    /// Returns the assertion failure if this is a plain mismatch.
    #[must_use]
    pub fn as_failure(&self) -> Option<&AssertionFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            Self::InvalidPattern { .. } | Self::NoSuchGroup { .. } => None,
        }
    }
}

impl From<AssertionFailure> for VerifyError {
    fn from(failure: AssertionFailure) -> Self {
        Self::Failed(Box::new(failure))
    }
}
