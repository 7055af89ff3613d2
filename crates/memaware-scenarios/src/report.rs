//! Per-scenario outcomes and the run summary.

use chrono::{DateTime, Utc};
use memaware_verify::AssertionFailure;
use serde::Serialize;

/// How one scenario ended, short of a harness-fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every primary expectation held.
    Passed,
    /// Passed, but at least one expectation held only via its fallback.
    PassedWithFallback {
        /// One note per tolerated expectation.
        notes: Vec<String>,
    },
    /// An expectation failed.
    Failed {
        /// The failing expectation with an output excerpt.
        failure: Box<AssertionFailure>,
    },
}

impl ScenarioOutcome {
    /// Returns `true` unless the scenario failed.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Outcome of one scenario with timing.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub name: String,
    /// Human-readable parameters.
    pub description: String,
    /// How the scenario ended.
    pub outcome: ScenarioOutcome,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Aggregated result of a harness run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Image the scenarios ran in.
    pub image: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Set when the environment could not host the run at all.
    pub skipped: Option<String>,
    /// Set when the run was interrupted between scenarios.
    pub cancelled: bool,
    /// Reports in execution order.
    pub reports: Vec<ScenarioReport>,
    /// Set when removing the image failed after the scenarios ran.
    pub teardown_error: Option<String>,
}

impl RunSummary {
    /// Creates an empty summary for a run against `image`.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            started_at: Utc::now(),
            skipped: None,
            cancelled: false,
            reports: Vec::new(),
            teardown_error: None,
        }
    }

    /// Creates the summary of a run that was skipped.
    #[must_use]
    pub fn skipped(image: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::new(image)
        }
    }

    /// Number of scenarios that passed, with or without fallbacks.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_pass()).count()
    }

    /// Number of scenarios that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    /// Returns `true` when no scenario failed and teardown succeeded.
    ///
    /// A skipped run counts as a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.teardown_error.is_none()
    }

    /// Serializes the summary as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
