//! Memory-awareness scenarios.
//!
//! Each scenario is a stateless template: executing it builds fresh launch
//! configurations from the context, runs them, and checks the output.
//! Assertion failures become [`ScenarioOutcome::Failed`]; anything that
//! means the environment is not test-capable is returned as an error.

use std::fmt;

use memaware_common::error::{HarnessError, Result};
use memaware_common::types::MemorySize;
use memaware_runtime::launch::LaunchConfig;
use memaware_verify::{Check, CheckOutcome, Expectation, OutputAnalyzer, VerifyError};

use crate::context::{ScenarioContext, with_whitebox};
use crate::exceeds;
use crate::programs;
use crate::report::ScenarioOutcome;

/// Mebibytes the OOM scenario tries to allocate beyond the container cap.
pub const OOM_HEADROOM_MIB: u64 = 10;

/// One named behaviour check of the system under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// The detected hard limit equals the configured `--memory`.
    HardLimit {
        /// Value passed to `--memory`.
        limit: MemorySize,
    },
    /// The detected soft limit equals the configured reservation.
    SoftLimit {
        /// Value passed to `--memory-reservation`.
        reservation: MemorySize,
    },
    /// Allocating past the container cap ends in an out-of-memory error.
    OutOfMemory {
        /// Value passed to `--memory` and `--memory-swap`.
        container_limit: MemorySize,
        /// Mebibytes the target program tries to allocate.
        allocation_mib: u64,
    },
    /// The metrics API reports the container's memory and swap.
    MetricsApi {
        /// Value passed to `--memory`.
        memory: MemorySize,
        /// Value passed to `--memory-swap` (memory plus swap).
        swap: MemorySize,
    },
    /// A limit above host physical memory is ignored.
    ExceedsPhysical,
}

/// Launch configuration and checks of a single-run scenario.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    /// What to run.
    pub config: LaunchConfig,
    /// What must hold afterwards, in order.
    pub checks: Vec<Check>,
}

impl Scenario {
    /// Hard-limit scenario for `limit`, e.g. `"100m"`.
    ///
    /// # Errors
    ///
    /// Returns an error if `limit` is not a valid memory size.
    pub fn hard_limit(limit: &str) -> Result<Self> {
        Ok(Self::HardLimit {
            limit: MemorySize::parse(limit)?,
        })
    }

    /// Soft-limit scenario for `reservation`.
    ///
    /// # Errors
    ///
    /// Returns an error if `reservation` is not a valid memory size.
    pub fn soft_limit(reservation: &str) -> Result<Self> {
        Ok(Self::SoftLimit {
            reservation: MemorySize::parse(reservation)?,
        })
    }

    /// OOM scenario capping the container at `container_limit` and
    /// allocating [`OOM_HEADROOM_MIB`] more than that.
    ///
    /// # Errors
    ///
    /// Returns an error if `container_limit` is not a valid memory size or
    /// is below one mebibyte.
    pub fn out_of_memory(container_limit: &str) -> Result<Self> {
        let container_limit = MemorySize::parse(container_limit)?;
        if container_limit.mib() == 0 {
            return Err(HarnessError::Config {
                message: format!("OOM container limit {container_limit} is below 1 MiB"),
            });
        }
        Ok(Self::OutOfMemory {
            allocation_mib: container_limit.mib() + OOM_HEADROOM_MIB,
            container_limit,
        })
    }

    /// Metrics-API scenario for a memory and memory-plus-swap pair.
    ///
    /// # Errors
    ///
    /// Returns an error if either size is invalid or `swap` is smaller
    /// than `memory`.
    pub fn metrics_api(memory: &str, swap: &str) -> Result<Self> {
        let memory = MemorySize::parse(memory)?;
        let swap = MemorySize::parse(swap)?;
        if swap.bytes() < memory.bytes() {
            return Err(HarnessError::Config {
                message: format!("--memory-swap {swap} is smaller than --memory {memory}"),
            });
        }
        Ok(Self::MetricsApi { memory, swap })
    }

    /// Stable identifier used for filtering and reports.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::HardLimit { limit } => format!("memory-limit-{limit}"),
            Self::SoftLimit { reservation } => format!("memory-soft-limit-{reservation}"),
            Self::OutOfMemory {
                container_limit, ..
            } => format!("oom-{container_limit}"),
            Self::MetricsApi { memory, swap } => format!("os-mxbean-{memory}-{swap}"),
            Self::ExceedsPhysical => "memory-exceeds-physical".to_string(),
        }
    }

    /// Memory figure the scenario configures on the container, in bytes.
    ///
    /// `None` for [`Scenario::ExceedsPhysical`], whose limit depends on the host.
    #[must_use]
    pub const fn limit_bytes(&self) -> Option<u64> {
        match self {
            Self::HardLimit { limit } => Some(limit.bytes()),
            Self::SoftLimit { reservation } => Some(reservation.bytes()),
            Self::OutOfMemory {
                container_limit, ..
            } => Some(container_limit.bytes()),
            Self::MetricsApi { memory, .. } => Some(memory.bytes()),
            Self::ExceedsPhysical => None,
        }
    }

    /// Returns `true` if `filter` equals the name or is a prefix of it.
    #[must_use]
    pub fn matches_filter(&self, filter: &str) -> bool {
        self.name().starts_with(filter)
    }

    /// Builds the launch configuration and checks of a single-run scenario.
    ///
    /// Returns `None` for [`Scenario::ExceedsPhysical`], whose second run
    /// depends on the output of the first.
    #[must_use]
    pub fn plan(&self, ctx: &ScenarioContext<'_>) -> Option<ScenarioPlan> {
        let plan = match self {
            Self::HardLimit { limit } => ScenarioPlan {
                config: ctx
                    .default_config()
                    .with_engine_flag("--memory", limit.raw()),
                checks: vec![
                    Expectation::matches(format!(
                        "{}.*{}",
                        programs::MEMORY_LIMIT_TRACE,
                        limit.bytes()
                    ))
                    .into(),
                ],
            },
            Self::SoftLimit { reservation } => ScenarioPlan {
                config: with_whitebox(ctx.new_config(programs::PRINT_CONTAINER_INFO))
                    .with_engine_flag("--memory-reservation", reservation.raw()),
                checks: vec![
                    Expectation::matches(format!(
                        "{}.*{}",
                        programs::MEMORY_SOFT_LIMIT_TRACE,
                        reservation.bytes()
                    ))
                    .into(),
                ],
            },
            Self::OutOfMemory {
                container_limit,
                allocation_mib,
            } => ScenarioPlan {
                config: ctx
                    .new_config(programs::ATTEMPT_OOM)
                    .with_engine_flag("--memory", container_limit.raw())
                    .with_engine_flag("--memory-swappiness", "0")
                    .with_engine_flag("--memory-swap", container_limit.raw())
                    .with_program_arg(allocation_mib.to_string())
                    .with_appended_runtime_option(format!("-Xmx{}m", allocation_mib / 2)),
                checks: vec![
                    Expectation::ExitCodeNonZero.into(),
                    Expectation::contains(programs::OOM_START_MARKER).into(),
                    Expectation::not_contains(programs::OOM_SUCCESS_MARKER).into(),
                    Expectation::contains(programs::OOM_ERROR).into(),
                ],
            },
            Self::MetricsApi { memory, swap } => ScenarioPlan {
                config: programs::METRICS_EXPORT_OPTIONS.iter().fold(
                    ctx.new_config(programs::CHECK_OS_MXBEAN)
                        .with_engine_flag("--memory", memory.raw())
                        .with_engine_flag("--memory-swap", swap.raw()),
                    |config, option| config.with_runtime_option(*option),
                ),
                checks: metrics_checks(memory.bytes(), swap.bytes().saturating_sub(memory.bytes())),
            },
            Self::ExceedsPhysical => return None,
        };
        Some(plan)
    }

    /// Launch configurations the scenario would run, without running them.
    #[must_use]
    pub fn preview(&self, ctx: &ScenarioContext<'_>) -> Vec<LaunchConfig> {
        match self.plan(ctx) {
            Some(plan) => vec![plan.config],
            None => exceeds::preview(ctx),
        }
    }

    /// Runs the scenario and checks its expectations.
    ///
    /// # Errors
    ///
    /// Returns a harness-fatal error if a container cannot be run, a value
    /// the scenario depends on is missing from the output, or a pattern is
    /// malformed.
    pub fn execute(&self, ctx: &ScenarioContext<'_>) -> Result<ScenarioOutcome> {
        match self.plan(ctx) {
            Some(plan) => run_plan(ctx, plan),
            None => exceeds::run(ctx),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardLimit { limit } => {
                write!(f, "memory limit: {limit} ({} bytes)", limit.bytes())
            }
            Self::SoftLimit { reservation } => {
                write!(f, "memory soft limit: {reservation} ({} bytes)", reservation.bytes())
            }
            Self::OutOfMemory {
                container_limit,
                allocation_mib,
            } => write!(
                f,
                "OOM: cap {container_limit}, allocate {allocation_mib}m, heap {}m",
                allocation_mib / 2
            ),
            Self::MetricsApi { memory, swap } => {
                write!(f, "OperatingSystemMXBean: memory {memory}, memory+swap {swap}")
            }
            Self::ExceedsPhysical => write!(f, "container memory limit exceeds physical memory"),
        }
    }
}

/// Checks for the metrics-API scenario.
///
/// Swap figures are checked in two tiers: the exact expected value, or on
/// hosts without swap accounting any plausible figure.
fn metrics_checks(memory_bytes: u64, swap_bytes: u64) -> Vec<Check> {
    const NO_SWAP_ACCOUNTING: &str =
        "swap limit unsupported by the host kernel; metrics report host swap values";
    vec![
        Expectation::ExitCodeEquals(0).into(),
        Expectation::contains(programs::MXBEAN_BANNER).into(),
        Expectation::contains(format!("{}{memory_bytes}", programs::MXBEAN_TOTAL_PHYSICAL)).into(),
        Expectation::matches(r"OperatingSystemMXBean\.getFreePhysicalMemorySize: [1-9][0-9]+").into(),
        Expectation::contains(format!("{}{swap_bytes}", programs::MXBEAN_TOTAL_SWAP)).or_tolerate(
            Expectation::matches(r"OperatingSystemMXBean\.getTotalSwapSpaceSize: [0-9]+"),
            NO_SWAP_ACCOUNTING,
        ),
        Expectation::matches(r"OperatingSystemMXBean\.getFreeSwapSpaceSize: [1-9][0-9]+").or_tolerate(
            Expectation::matches(r"OperatingSystemMXBean\.getFreeSwapSpaceSize: 0"),
            NO_SWAP_ACCOUNTING,
        ),
    ]
}

/// Runs a single-run plan and evaluates its checks in order.
pub(crate) fn run_plan(ctx: &ScenarioContext<'_>, plan: ScenarioPlan) -> Result<ScenarioOutcome> {
    let result = ctx.runner().run(plan.config)?;
    evaluate(&OutputAnalyzer::new(&result), &plan.checks)
}

/// Evaluates `checks` in order, stopping at the first failure.
pub(crate) fn evaluate(out: &OutputAnalyzer<'_>, checks: &[Check]) -> Result<ScenarioOutcome> {
    let mut notes = Vec::new();
    for check in checks {
        match out.verify(check) {
            Ok(CheckOutcome::Passed) => {}
            Ok(CheckOutcome::Tolerated { primary, reason }) => {
                notes.push(format!("{}: {reason}", primary.expectation));
            }
            Err(VerifyError::Failed(failure)) => {
                tracing::warn!(expectation = %failure.expectation, "expectation failed");
                return Ok(ScenarioOutcome::Failed { failure });
            }
            Err(other) => {
                return Err(HarnessError::Config {
                    message: other.to_string(),
                });
            }
        }
    }
    if notes.is_empty() {
        Ok(ScenarioOutcome::Passed)
    } else {
        Ok(ScenarioOutcome::PassedWithFallback { notes })
    }
}

#[cfg(test)]
mod tests {
    use memaware_runtime::result::RunResult;

    use super::*;
    use crate::testing::{ScriptedEngine, with_context};

    #[test]
    fn names_are_stable() {
        assert_eq!(Scenario::hard_limit("100m").unwrap().name(), "memory-limit-100m");
        assert_eq!(
            Scenario::metrics_api("1G", "1500M").unwrap().name(),
            "os-mxbean-1G-1500M"
        );
        assert_eq!(Scenario::out_of_memory("256m").unwrap().name(), "oom-256m");
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(Scenario::hard_limit("lots").is_err());
        assert!(Scenario::metrics_api("1G", "512M").is_err());
        assert!(Scenario::out_of_memory("512k").is_err());
    }

    #[test]
    fn oom_allocates_ten_past_the_cap_with_half_heap() {
        let scenario = Scenario::out_of_memory("256m").unwrap();
        assert_eq!(
            scenario,
            Scenario::OutOfMemory {
                container_limit: MemorySize::parse("256m").unwrap(),
                allocation_mib: 266,
            }
        );
        let engine = ScriptedEngine::new(|_| Ok(RunResult::new(1, "", "")));
        with_context(&engine, |ctx| {
            let plan = scenario.plan(ctx).expect("single run");
            let cmd = plan.config.runtime_command(&["-Xmx1g".to_string()]);
            let inherited = cmd.iter().position(|a| a == "-Xmx1g").expect("inherited");
            let appended = cmd.iter().position(|a| a == "-Xmx133m").expect("appended");
            assert!(appended > inherited, "appended heap cap must override inherited");
            assert_eq!(cmd.last().map(String::as_str), Some("266"));
            assert_eq!(plan.config.last_flag_value("--memory-swap"), Some("256m"));
            assert_eq!(plan.config.last_flag_value("--memory-swappiness"), Some("0"));
        });
    }

    #[test]
    fn hard_limit_expects_bytes() {
        let engine = ScriptedEngine::new(|config| {
            assert_eq!(config.last_flag_value("--memory"), Some("1g"));
            Ok(RunResult::new(0, "[os,container] Memory Limit is: 1073741824\n", ""))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::hard_limit("1g").unwrap().execute(ctx).expect("run");
            assert_eq!(outcome, ScenarioOutcome::Passed);
        });
    }

    #[test]
    fn hard_limit_mismatch_is_scenario_failure() {
        let engine = ScriptedEngine::new(|_| {
            Ok(RunResult::new(0, "Memory Limit is: Unlimited\n", ""))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::hard_limit("100m").unwrap().execute(ctx).expect("run");
            match outcome {
                ScenarioOutcome::Failed { failure } => {
                    assert_eq!(
                        failure.expectation,
                        Expectation::matches("Memory Limit is:.*104857600")
                    );
                    assert!(failure.excerpt.contains("Unlimited"));
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        });
    }

    #[test]
    fn soft_limit_uses_whitebox_and_reservation() {
        let engine = ScriptedEngine::new(|config| {
            assert_eq!(config.target_program(), programs::PRINT_CONTAINER_INFO);
            assert_eq!(config.last_flag_value("--memory-reservation"), Some("500m"));
            let cmd = config.runtime_command(&[]);
            assert!(cmd.iter().any(|a| a == "-XX:+WhiteBoxAPI"));
            Ok(RunResult::new(0, "Memory Soft Limit is: 524288000\n", ""))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::soft_limit("500m").unwrap().execute(ctx).expect("run");
            assert!(outcome.is_pass());
        });
    }

    #[test]
    fn oom_passes_on_out_of_memory_error() {
        let engine = ScriptedEngine::new(|_| {
            Ok(RunResult::new(
                1,
                "Entering AttemptOOM main\n",
                "Exception in thread \"main\" java.lang.OutOfMemoryError: Java heap space\n",
            ))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::out_of_memory("256m").unwrap().execute(ctx).expect("run");
            assert_eq!(outcome, ScenarioOutcome::Passed);
        });
    }

    #[test]
    fn oom_fails_when_program_exits_cleanly() {
        let engine = ScriptedEngine::new(|_| {
            Ok(RunResult::new(
                0,
                "Entering AttemptOOM main\nAttemptOOM allocation successful\n",
                "",
            ))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::out_of_memory("256m").unwrap().execute(ctx).expect("run");
            match outcome {
                ScenarioOutcome::Failed { failure } => {
                    assert_eq!(failure.expectation, Expectation::ExitCodeNonZero);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        });
    }

    #[test]
    fn oom_fails_when_success_marker_printed() {
        let engine = ScriptedEngine::new(|_| {
            Ok(RunResult::new(
                137,
                "Entering AttemptOOM main\nAttemptOOM allocation successful\n",
                "java.lang.OutOfMemoryError",
            ))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::out_of_memory("256m").unwrap().execute(ctx).expect("run");
            match outcome {
                ScenarioOutcome::Failed { failure } => assert_eq!(
                    failure.expectation,
                    Expectation::not_contains(programs::OOM_SUCCESS_MARKER)
                ),
                other => panic!("unexpected outcome {other:?}"),
            }
        });
    }

    fn mxbean_output(total_swap: &str, free_swap: &str) -> String {
        format!(
            "Checking OperatingSystemMXBean\n\
             OperatingSystemMXBean.getTotalPhysicalMemorySize: 104857600\n\
             OperatingSystemMXBean.getFreePhysicalMemorySize: 101957632\n\
             OperatingSystemMXBean.getTotalSwapSpaceSize: {total_swap}\n\
             OperatingSystemMXBean.getFreeSwapSpaceSize: {free_swap}\n"
        )
    }

    #[test]
    fn metrics_exact_swap_passes() {
        let engine = ScriptedEngine::new(|config| {
            assert_eq!(config.last_flag_value("--memory-swap"), Some("150M"));
            Ok(RunResult::new(0, mxbean_output("52428800", "52428800"), ""))
        });
        with_context(&engine, |ctx| {
            let outcome = Scenario::metrics_api("100M", "150M").unwrap().execute(ctx).expect("run");
            assert_eq!(outcome, ScenarioOutcome::Passed);
        });
    }

    #[test]
    fn metrics_without_swap_accounting_is_tolerated() {
        let engine = ScriptedEngine::new(|_| Ok(RunResult::new(0, mxbean_output("8589934592", "0"), "")));
        with_context(&engine, |ctx| {
            let outcome = Scenario::metrics_api("100M", "150M").unwrap().execute(ctx).expect("run");
            match outcome {
                ScenarioOutcome::PassedWithFallback { notes } => assert_eq!(notes.len(), 2),
                other => panic!("unexpected outcome {other:?}"),
            }
        });
    }

    #[test]
    fn metrics_negative_swap_fails() {
        let engine = ScriptedEngine::new(|_| Ok(RunResult::new(0, mxbean_output("-1", "0"), "")));
        with_context(&engine, |ctx| {
            let outcome = Scenario::metrics_api("100M", "150M").unwrap().execute(ctx).expect("run");
            assert!(!outcome.is_pass());
        });
    }

    #[test]
    fn metrics_swap_below_memory_expects_no_swap() {
        let scenario = Scenario::MetricsApi {
            memory: MemorySize::parse("100M").unwrap(),
            swap: MemorySize::parse("50M").unwrap(),
        };
        let engine = ScriptedEngine::new(|_| Ok(RunResult::new(0, mxbean_output("0", "0"), "")));
        with_context(&engine, |ctx| {
            assert_eq!(scenario.preview(ctx).len(), 1);
            assert!(scenario.execute(ctx).expect("run").is_pass());
        });
    }

    #[test]
    fn metrics_wrong_physical_total_fails() {
        let engine = ScriptedEngine::new(|_| Ok(RunResult::new(0, mxbean_output("52428800", "1024"), "")));
        with_context(&engine, |ctx| {
            let outcome = Scenario::metrics_api("128M", "256M").unwrap().execute(ctx).expect("run");
            match outcome {
                ScenarioOutcome::Failed { failure } => assert_eq!(
                    failure.expectation,
                    Expectation::contains("OperatingSystemMXBean.getTotalPhysicalMemorySize: 134217728")
                ),
                other => panic!("unexpected outcome {other:?}"),
            }
        });
    }

    #[test]
    fn engine_errors_are_fatal_not_failures() {
        let engine = ScriptedEngine::new(|_| {
            Err(HarnessError::ContainerStart {
                exit_code: 125,
                stderr: "invalid reference format".into(),
            })
        });
        with_context(&engine, |ctx| {
            let err = Scenario::hard_limit("100m").unwrap().execute(ctx).unwrap_err();
            assert!(matches!(err, HarnessError::ContainerStart { .. }));
        });
    }
}
