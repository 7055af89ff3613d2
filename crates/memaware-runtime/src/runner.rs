//! Executes launch configurations against an engine.

use std::time::{Duration, Instant};

use memaware_common::config::HarnessConfig;
use memaware_common::error::Result;

use crate::backend::ContainerEngine;
use crate::launch::LaunchConfig;
use crate::result::RunResult;

/// Runs one [`LaunchConfig`] at a time, applying the inherited runtime
/// options and the supervising timeout from the harness configuration.
pub struct ContainerRunner<'a> {
    engine: &'a dyn ContainerEngine,
    inherited: Vec<String>,
    timeout: Duration,
}

impl<'a> ContainerRunner<'a> {
    /// Creates a runner over `engine`.
    #[must_use]
    pub fn new(engine: &'a dyn ContainerEngine, inherited: Vec<String>, timeout: Duration) -> Self {
        Self {
            engine,
            inherited,
            timeout,
        }
    }

    /// Creates a runner using the inherited options and timeout in `config`.
    #[must_use]
    pub fn from_config(engine: &'a dyn ContainerEngine, config: &HarnessConfig) -> Self {
        Self::new(engine, config.inherited_options.clone(), config.run_timeout())
    }

    /// Runs `config` to completion and returns its captured output.
    ///
    /// The configuration is consumed: it cannot be altered once handed over.
    ///
    /// # Errors
    ///
    /// Returns a harness-fatal error if the engine cannot start the
    /// container or the run exceeds the timeout.
    pub fn run(&self, config: LaunchConfig) -> Result<RunResult> {
        let start = Instant::now();
        let result = self.engine.run(&config, &self.inherited, self.timeout)?;
        tracing::debug!(
            engine = self.engine.name(),
            program = config.target_program(),
            exit_code = result.exit_code,
            elapsed_ms = start.elapsed().as_millis(),
            "run finished"
        );
        Ok(result)
    }

    /// Returns the command line a run of `config` would execute.
    #[must_use]
    pub fn render(&self, config: &LaunchConfig) -> Vec<String> {
        self.engine.render(config, &self.inherited)
    }

    /// Returns the engine behind this runner.
    #[must_use]
    pub fn engine(&self) -> &'a dyn ContainerEngine {
        self.engine
    }
}
