//! Chained checks over a run's output.
//!
//! Text checks see stdout followed by stderr, so a trace line is found
//! whichever stream the target program wrote it to. Regex checks search
//! (they do not anchor to the whole output) with `^`/`$` matching at line
//! boundaries.

use memaware_common::constants::EXCERPT_LINES;
use memaware_runtime::result::RunResult;
use regex::{Regex, RegexBuilder};

use crate::error::{AssertionFailure, VerifyError};
use crate::expectation::{Check, CheckOutcome, Expectation};

/// Convenience alias for verification results.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Checker over one [`RunResult`].
#[derive(Debug)]
pub struct OutputAnalyzer<'a> {
    result: &'a RunResult,
    output: String,
}

impl<'a> OutputAnalyzer<'a> {
    /// Creates an analyzer for `result`.
    #[must_use]
    pub fn new(result: &'a RunResult) -> Self {
        Self {
            result,
            output: result.output(),
        }
    }

    /// Returns the merged output being checked.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the exit code of the run.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.result.exit_code
    }

    /// Fails unless the output contains `text`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] when the text is absent.
    pub fn should_contain(&self, text: &str) -> Result<&Self> {
        self.check(&Expectation::contains(text))
    }

    /// Fails if the output contains `text`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] when the text is present.
    pub fn should_not_contain(&self, text: &str) -> Result<&Self> {
        self.check(&Expectation::not_contains(text))
    }

    /// Fails unless `pattern` is found somewhere in the output.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] on no match, or
    /// [`VerifyError::InvalidPattern`] for a malformed pattern.
    pub fn should_match(&self, pattern: &str) -> Result<&Self> {
        self.check(&Expectation::matches(pattern))
    }

    /// Fails if `pattern` is found anywhere in the output.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] on a match, or
    /// [`VerifyError::InvalidPattern`] for a malformed pattern.
    pub fn should_not_match(&self, pattern: &str) -> Result<&Self> {
        self.check(&Expectation::NotMatches(pattern.to_string()))
    }

    /// Fails unless the run exited with `code`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] for any other exit code.
    pub fn should_have_exit_value(&self, code: i32) -> Result<&Self> {
        self.check(&Expectation::ExitCodeEquals(code))
    }

    /// Fails if the run exited with zero.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] for a successful exit.
    pub fn should_fail(&self) -> Result<&Self> {
        self.check(&Expectation::ExitCodeNonZero)
    }

    /// Returns capture `group` of the first match of `pattern`.
    ///
    /// `Ok(None)` means the pattern does not occur; callers decide whether
    /// that is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidPattern`] for a malformed pattern, or
    /// [`VerifyError::NoSuchGroup`] if the pattern has fewer groups.
    pub fn first_match(&self, pattern: &str, group: usize) -> Result<Option<String>> {
        let regex = compile(pattern)?;
        if group >= regex.captures_len() {
            return Err(VerifyError::NoSuchGroup {
                pattern: pattern.to_string(),
                group,
            });
        }
        Ok(regex
            .captures(&self.output)
            .and_then(|caps| caps.get(group))
            .map(|m| m.as_str().to_string()))
    }

    /// Evaluates one expectation.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] when the expectation does not hold.
    pub fn check(&self, expectation: &Expectation) -> Result<&Self> {
        let holds = match expectation {
            Expectation::Contains(text) => self.output.contains(text.as_str()),
            Expectation::NotContains(text) => !self.output.contains(text.as_str()),
            Expectation::Matches(pattern) => compile(pattern)?.is_match(&self.output),
            Expectation::NotMatches(pattern) => !compile(pattern)?.is_match(&self.output),
            Expectation::FirstMatch { pattern, group } => {
                self.first_match(pattern, *group)?.is_some()
            }
            Expectation::ExitCodeEquals(code) => self.result.exit_code == *code,
            Expectation::ExitCodeNonZero => self.result.exit_code != 0,
        };
        if holds {
            Ok(self)
        } else {
            Err(self.failure(expectation.clone(), None).into())
        }
    }

    /// Evaluates a check, falling back only when the primary expectation
    /// failed by mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Failed`] when both expectations fail, or any
    /// non-mismatch error from either one.
    pub fn verify(&self, check: &Check) -> Result<CheckOutcome> {
        let primary = match self.check(&check.primary) {
            Ok(_) => return Ok(CheckOutcome::Passed),
            Err(VerifyError::Failed(failure)) => failure,
            Err(other) => return Err(other),
        };
        let Some(fallback) = &check.fallback else {
            return Err(VerifyError::Failed(primary));
        };
        match self.check(&fallback.expectation) {
            Ok(_) => {
                tracing::info!(
                    primary = %check.primary,
                    fallback = %fallback.expectation,
                    reason = %fallback.reason,
                    "primary expectation failed, tolerated alternate held"
                );
                Ok(CheckOutcome::Tolerated {
                    primary,
                    reason: fallback.reason.clone(),
                })
            }
            Err(VerifyError::Failed(_)) => Err(self
                .failure(check.primary.clone(), Some(fallback.expectation.clone()))
                .into()),
            Err(other) => Err(other),
        }
    }

    fn failure(&self, expectation: Expectation, fallback: Option<Expectation>) -> AssertionFailure {
        AssertionFailure {
            expectation,
            fallback,
            exit_code: self.result.exit_code,
            excerpt: self.result.tail(EXCERPT_LINES),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|e| VerifyError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })
}
