//! Runs a set of scenarios against one test image.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use memaware_common::config::HarnessConfig;
use memaware_common::constants::WHITEBOX_JAR;
use memaware_common::error::{HarnessError, Result};
use memaware_common::types::ImageName;
use memaware_runtime::backend::ContainerEngine;
use memaware_runtime::image::ImageGuard;
use memaware_runtime::runner::ContainerRunner;

use crate::context::ScenarioContext;
use crate::report::{RunSummary, ScenarioReport};
use crate::scenario::Scenario;

/// Rendered engine command lines of one scenario.
#[derive(Debug, Clone)]
pub struct PlannedScenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable parameters.
    pub description: String,
    /// One command line per container run.
    pub commands: Vec<Vec<String>>,
}

/// Owns the harness lifecycle: probe, build, run, tear down.
pub struct Driver<'e> {
    engine: &'e dyn ContainerEngine,
    config: HarnessConfig,
    cancel: Arc<AtomicBool>,
}

impl<'e> Driver<'e> {
    /// Creates a driver over `engine`.
    #[must_use]
    pub fn new(engine: &'e dyn ContainerEngine, config: HarnessConfig) -> Self {
        Self {
            engine,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `cancel` to stop between scenarios once it is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs `scenarios` in order and returns their reports.
    ///
    /// When the engine reports the environment as unusable, nothing is
    /// built or run and a skipped summary is returned. Otherwise the image
    /// is built once, and removed exactly once afterwards unless
    /// `retain_image` is set, including when a scenario aborts the run.
    ///
    /// # Errors
    ///
    /// Returns a harness-fatal error from staging, the image build, or any
    /// scenario. Assertion failures are reported in the summary instead.
    pub fn run(&self, scenarios: &[Scenario]) -> Result<RunSummary> {
        let image = self.config.image();
        if let Err(e) = self.engine.probe() {
            if e.is_environment_unavailable() {
                tracing::warn!(engine = self.engine.name(), reason = %e, "skipping: environment unavailable");
                return Ok(RunSummary::skipped(image.as_str(), e.to_string()));
            }
            return Err(e);
        }

        stage_artifacts(&self.config)?;
        let guard = ImageGuard::acquire(self.engine, &self.config)?;
        let mut summary = RunSummary::new(image.as_str());
        self.run_scenarios(guard.image(), scenarios, &mut summary)?;

        if let Err(e) = guard.release() {
            tracing::warn!(%image, error = %e, "image removal failed");
            summary.teardown_error = Some(e.to_string());
        }
        tracing::info!(
            passed = summary.passed(),
            failed = summary.failed(),
            cancelled = summary.cancelled,
            "run complete"
        );
        Ok(summary)
    }

    /// Renders what `scenarios` would run, without touching the engine.
    #[must_use]
    pub fn plan(&self, scenarios: &[Scenario]) -> Vec<PlannedScenario> {
        let runner = ContainerRunner::from_config(self.engine, &self.config);
        let ctx = ScenarioContext::new(&runner, &self.config, self.config.image());
        scenarios
            .iter()
            .map(|scenario| PlannedScenario {
                name: scenario.name(),
                description: scenario.to_string(),
                commands: scenario
                    .preview(&ctx)
                    .iter()
                    .map(|config| runner.render(config))
                    .collect(),
            })
            .collect()
    }

    fn run_scenarios(
        &self,
        image: &ImageName,
        scenarios: &[Scenario],
        summary: &mut RunSummary,
    ) -> Result<()> {
        let runner = ContainerRunner::from_config(self.engine, &self.config);
        let ctx = ScenarioContext::new(&runner, &self.config, image.clone());
        for scenario in scenarios {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!("interrupted, skipping remaining scenarios");
                summary.cancelled = true;
                break;
            }
            tracing::info!(scenario = %scenario.name(), "========== new test case: {scenario} ==========");
            let start = Instant::now();
            let outcome = scenario.execute(&ctx)?;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let failed = !outcome.is_pass();
            if failed {
                tracing::error!(scenario = %scenario.name(), duration_ms, "scenario failed");
            } else {
                tracing::info!(scenario = %scenario.name(), duration_ms, "scenario passed");
            }
            summary.reports.push(ScenarioReport {
                name: scenario.name(),
                description: scenario.to_string(),
                outcome,
                duration_ms,
            });
            if failed && self.config.strict {
                tracing::warn!("strict mode: stopping after first failure");
                break;
            }
        }
        Ok(())
    }
}

/// Copies the diagnostics jar into the program directory if it is
/// configured and not already there.
///
/// # Errors
///
/// Returns an error if the configured jar does not exist or cannot be copied.
pub fn stage_artifacts(config: &HarnessConfig) -> Result<()> {
    let Some(source) = config.whitebox_jar.as_deref() else {
        return Ok(());
    };
    let dest = config.program_dir.join(WHITEBOX_JAR);
    if dest.exists() {
        tracing::debug!(path = %dest.display(), "whitebox jar already staged");
        return Ok(());
    }
    if !source.is_file() {
        return Err(HarnessError::Config {
            message: format!("whitebox jar {} does not exist", source.display()),
        });
    }
    copy_file(source, &dest)?;
    tracing::info!(from = %source.display(), to = %dest.display(), "staged whitebox jar");
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let _ = std::fs::copy(from, to).map_err(|e| HarnessError::Io {
        path: to.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use memaware_runtime::result::RunResult;
    use tempfile::TempDir;

    use super::*;
    use crate::report::ScenarioOutcome;
    use crate::testing::ScriptedEngine;

    fn config_with_runtime() -> (TempDir, HarnessConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let home = dir.path().join("jdk");
        std::fs::create_dir_all(home.join("bin")).expect("mkdir");
        std::fs::write(home.join("bin/java"), "#!/bin/sh\n").expect("write");
        let config = HarnessConfig {
            runtime_home: Some(home),
            program_dir: dir.path().to_path_buf(),
            ..HarnessConfig::default()
        };
        (dir, config)
    }

    fn limit_engine() -> ScriptedEngine {
        ScriptedEngine::new(|config| {
            let bytes = match config.last_flag_value("--memory") {
                Some("100m") => "104857600",
                _ => "0",
            };
            Ok(RunResult::new(0, format!("Memory Limit is: {bytes}\n"), ""))
        })
    }

    fn scenarios() -> Vec<Scenario> {
        vec![
            Scenario::hard_limit("100m").unwrap(),
            Scenario::hard_limit("500m").unwrap(),
            Scenario::hard_limit("1g").unwrap(),
        ]
    }

    #[test]
    fn failures_are_reported_and_image_removed_once() {
        let (_dir, config) = config_with_runtime();
        let engine = limit_engine();
        let summary = Driver::new(&engine, config).run(&scenarios()).expect("run");
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.failed(), 2);
        assert_eq!(engine.builds.get(), 1);
        assert_eq!(engine.removals.get(), 1);
    }

    #[test]
    fn strict_stops_after_first_failure() {
        let (_dir, mut config) = config_with_runtime();
        config.strict = true;
        let engine = limit_engine();
        let summary = Driver::new(&engine, config).run(&scenarios()).expect("run");
        assert_eq!(summary.reports.len(), 2);
        assert!(matches!(summary.reports[1].outcome, ScenarioOutcome::Failed { .. }));
        assert_eq!(engine.removals.get(), 1);
    }

    #[test]
    fn fatal_error_still_removes_image() {
        let (_dir, config) = config_with_runtime();
        let engine = ScriptedEngine::new(|_| {
            Err(HarnessError::Timeout {
                container: "memaware-x".into(),
                timeout_secs: 300,
            })
        });
        let err = Driver::new(&engine, config).run(&scenarios()).unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
        assert_eq!(engine.launches.borrow().len(), 1);
        assert_eq!(engine.removals.get(), 1);
    }

    #[test]
    fn unavailable_environment_is_a_no_op() {
        let (_dir, config) = config_with_runtime();
        let mut engine = limit_engine();
        engine.probe_error = Some("docker not found".into());
        let summary = Driver::new(&engine, config).run(&scenarios()).expect("run");
        assert!(summary.is_success());
        assert!(summary.skipped.as_deref().unwrap_or_default().contains("docker not found"));
        assert_eq!(engine.builds.get(), 0);
        assert_eq!(engine.removals.get(), 0);
        assert!(engine.launches.borrow().is_empty());
    }

    #[test]
    fn retained_image_is_not_removed() {
        let (_dir, mut config) = config_with_runtime();
        config.retain_image = true;
        let engine = limit_engine();
        let _ = Driver::new(&engine, config).run(&scenarios()).expect("run");
        assert_eq!(engine.removals.get(), 0);
    }

    #[test]
    fn removal_failure_is_recorded() {
        let (_dir, config) = config_with_runtime();
        let mut engine = limit_engine();
        engine.remove_fails = true;
        let summary = Driver::new(&engine, config)
            .run(&scenarios()[..1])
            .expect("run");
        assert_eq!(summary.passed(), 1);
        assert!(summary.teardown_error.is_some());
        assert!(!summary.is_success());
        assert_eq!(engine.removals.get(), 1);
    }

    #[test]
    fn cancel_flag_stops_before_next_scenario() {
        let (_dir, config) = config_with_runtime();
        let engine = limit_engine();
        let cancel = Arc::new(AtomicBool::new(true));
        let summary = Driver::new(&engine, config)
            .with_cancel_flag(cancel)
            .run(&scenarios())
            .expect("run");
        assert!(summary.cancelled);
        assert!(summary.reports.is_empty());
        assert_eq!(engine.removals.get(), 1);
    }

    #[test]
    fn missing_runtime_home_fails_before_running() {
        let engine = limit_engine();
        let err = Driver::new(&engine, HarnessConfig::default())
            .run(&scenarios())
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
        assert_eq!(engine.builds.get(), 0);
        assert_eq!(engine.removals.get(), 0);
    }

    #[test]
    fn stages_whitebox_jar_once() {
        let (dir, mut config) = config_with_runtime();
        let jar = dir.path().join("wb-src.jar");
        std::fs::write(&jar, b"jar").expect("write");
        config.whitebox_jar = Some(jar);
        stage_artifacts(&config).expect("stage");
        assert_eq!(std::fs::read(dir.path().join(WHITEBOX_JAR)).expect("read"), b"jar");
        stage_artifacts(&config).expect("idempotent");
    }

    #[test]
    fn missing_whitebox_jar_is_config_error() {
        let (dir, mut config) = config_with_runtime();
        config.whitebox_jar = Some(dir.path().join("absent.jar"));
        assert!(matches!(stage_artifacts(&config), Err(HarnessError::Config { .. })));
    }

    #[test]
    fn plan_renders_without_running() {
        let (_dir, config) = config_with_runtime();
        let engine = limit_engine();
        let planned = Driver::new(&engine, config).plan(&[Scenario::ExceedsPhysical]);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].commands.len(), 2);
        assert!(planned[0].commands[1].iter().any(|a| a == "<host-physical-bytes>0"));
        assert!(engine.launches.borrow().is_empty());
    }
}
