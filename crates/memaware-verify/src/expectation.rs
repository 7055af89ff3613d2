//! Expectations over one run's output.

use std::fmt;

use serde::Serialize;

use crate::error::AssertionFailure;

/// A single predicate evaluated against one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expectation {
    /// Output contains the literal text.
    Contains(String),
    /// Output does not contain the literal text.
    NotContains(String),
    /// The regex is found somewhere in the output.
    Matches(String),
    /// The regex is found nowhere in the output.
    NotMatches(String),
    /// The regex is found and capture `group` participated in the match.
    FirstMatch {
        /// Pattern to search for.
        pattern: String,
        /// Capture group index.
        group: usize,
    },
    /// Exit code equals the value.
    ExitCodeEquals(i32),
    /// Exit code is anything but zero.
    ExitCodeNonZero,
}

impl Expectation {
    /// Shorthand for [`Expectation::Contains`].
    #[must_use]
    pub fn contains(text: impl Into<String>) -> Self {
        Self::Contains(text.into())
    }

    /// Shorthand for [`Expectation::NotContains`].
    #[must_use]
    pub fn not_contains(text: impl Into<String>) -> Self {
        Self::NotContains(text.into())
    }

    /// Shorthand for [`Expectation::Matches`].
    #[must_use]
    pub fn matches(pattern: impl Into<String>) -> Self {
        Self::Matches(pattern.into())
    }

    /// Tolerates failure of this expectation if `fallback` holds instead.
    #[must_use]
    pub fn or_tolerate(self, fallback: Self, reason: impl Into<String>) -> Check {
        Check {
            primary: self,
            fallback: Some(Fallback {
                expectation: fallback,
                reason: reason.into(),
            }),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(text) => write!(f, "output contains {text:?}"),
            Self::NotContains(text) => write!(f, "output does not contain {text:?}"),
            Self::Matches(pattern) => write!(f, "output matches /{pattern}/"),
            Self::NotMatches(pattern) => write!(f, "output does not match /{pattern}/"),
            Self::FirstMatch { pattern, group } => {
                write!(f, "output captures group {group} of /{pattern}/")
            }
            Self::ExitCodeEquals(code) => write!(f, "exit code is {code}"),
            Self::ExitCodeNonZero => write!(f, "exit code is non-zero"),
        }
    }
}

/// A fallback accepted when the primary expectation does not hold for an
/// environment reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    /// Expectation tried after the primary one failed.
    pub expectation: Expectation,
    /// Environment condition that justifies the fallback.
    pub reason: String,
}

/// A primary expectation with an optional tolerated fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    /// Expectation attempted first.
    pub primary: Expectation,
    /// Expectation attempted only after the primary fails by mismatch.
    pub fallback: Option<Fallback>,
}

impl From<Expectation> for Check {
    fn from(primary: Expectation) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }
}

/// Result of a [`Check`] that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The primary expectation held.
    Passed,
    /// The primary failed and the fallback held.
    Tolerated {
        /// How the primary expectation failed.
        primary: Box<AssertionFailure>,
        /// Why the fallback is acceptable.
        reason: String,
    },
}
