//! Container limit above host physical memory.
//!
//! The runtime must ignore a container memory limit larger than the host's
//! physical memory and fall back to the host value. The host value is not
//! known in advance, so the check takes two runs:
//!
//! 1. **Discover**: run the default program and read the host's physical
//!    memory from the container trace.
//! 2. **Derive**: append a `0` to that number, giving a limit ten times
//!    larger.
//! 3. **Verify**: run again with the derived limit and expect the trace to
//!    report that the host value is used.

use memaware_common::constants::EXCERPT_LINES;
use memaware_common::error::{HarnessError, Result};
use memaware_runtime::launch::LaunchConfig;
use memaware_verify::{Check, Expectation, OutputAnalyzer};

use crate::context::ScenarioContext;
use crate::programs;
use crate::report::ScenarioOutcome;
use crate::scenario::evaluate;

/// Placeholder shown for the host value in previews.
pub const HOST_PLACEHOLDER: &str = "<host-physical-bytes>";

/// Progress of the two-run check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceedPhase {
    /// Host physical memory not yet known.
    Discover,
    /// Host value captured; limit not yet derived.
    Derive {
        /// Host physical memory in bytes, as printed.
        host: String,
    },
    /// Ready to run with the inflated limit.
    Verify {
        /// Host physical memory in bytes, as printed.
        host: String,
        /// Limit passed to `--memory`.
        inflated: String,
    },
    /// Finished.
    Done(ScenarioOutcome),
}

/// Returns a limit one decimal order of magnitude above `host`.
#[must_use]
pub fn derive_limit(host: &str) -> String {
    format!("{host}0")
}

/// Pattern the verify run must match.
#[must_use]
pub fn fallback_pattern(host: &str, inflated: &str) -> String {
    format!("container memory limit (ignored: {inflated}|unlimited: -1), using host value {host}")
}

/// Configuration of the verify run.
#[must_use]
pub fn verify_config(ctx: &ScenarioContext<'_>, inflated: &str) -> LaunchConfig {
    ctx.default_config().with_engine_flag("--memory", inflated)
}

/// Launch configurations of both runs, with a placeholder host value.
#[must_use]
pub fn preview(ctx: &ScenarioContext<'_>) -> Vec<LaunchConfig> {
    vec![
        ctx.default_config(),
        verify_config(ctx, &derive_limit(HOST_PLACEHOLDER)),
    ]
}

/// Walks the phases to completion.
///
/// # Errors
///
/// Returns [`HarnessError::MissingCapture`] if the discover run does not
/// print the host's physical memory, or any error from the runner.
pub fn run(ctx: &ScenarioContext<'_>) -> Result<ScenarioOutcome> {
    let mut phase = ExceedPhase::Discover;
    loop {
        phase = match phase {
            ExceedPhase::Discover => ExceedPhase::Derive {
                host: discover(ctx)?,
            },
            ExceedPhase::Derive { host } => {
                let inflated = derive_limit(&host);
                tracing::info!(%host, %inflated, "derived limit above host memory");
                ExceedPhase::Verify { host, inflated }
            }
            ExceedPhase::Verify { host, inflated } => {
                let result = ctx.runner().run(verify_config(ctx, &inflated))?;
                let checks: [Check; 1] = [Expectation::matches(fallback_pattern(&host, &inflated)).into()];
                ExceedPhase::Done(evaluate(&OutputAnalyzer::new(&result), &checks)?)
            }
            ExceedPhase::Done(outcome) => return Ok(outcome),
        };
    }
}

fn discover(ctx: &ScenarioContext<'_>) -> Result<String> {
    let result = ctx.runner().run(ctx.default_config())?;
    let out = OutputAnalyzer::new(&result);
    let captured = out
        .first_match(programs::TOTAL_PHYSICAL_PATTERN, 1)
        .map_err(|e| HarnessError::Config {
            message: e.to_string(),
        })?;
    captured.ok_or_else(|| HarnessError::MissingCapture {
        what: "host physical memory".into(),
        pattern: programs::TOTAL_PHYSICAL_PATTERN.into(),
        excerpt: result.tail(EXCERPT_LINES),
    })
}
