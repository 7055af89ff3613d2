//! Container engine abstraction.
//!
//! The harness never talks to an engine directly; everything goes through
//! [`ContainerEngine`] so scenarios and the driver can be exercised against
//! a scripted engine in tests.

pub mod docker;

use std::path::Path;
use std::time::Duration;

use memaware_common::config::HarnessConfig;
use memaware_common::error::Result;
use memaware_common::types::ImageName;

use crate::launch::LaunchConfig;
use crate::result::RunResult;

/// Operations the harness needs from a container engine.
pub trait ContainerEngine {
    /// Returns a short engine name for logs.
    fn name(&self) -> &str;

    /// Checks once whether this host can run container tests at all.
    ///
    /// # Errors
    ///
    /// Returns [`memaware_common::error::HarnessError::EnvironmentUnavailable`]
    /// when the engine is missing or not usable.
    fn probe(&self) -> Result<()>;

    /// Builds `image` from the build context at `context_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be invoked or the build fails.
    fn build_image(&self, image: &ImageName, context_dir: &Path) -> Result<()>;

    /// Removes `image` from the engine's local store.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be invoked or refuses.
    fn remove_image(&self, image: &ImageName) -> Result<()>;

    /// Runs `config` in a fresh container, blocking until it exits or
    /// `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns a harness-fatal error if the container cannot be started
    /// or times out. A non-zero exit of the target program is not an error.
    fn run(&self, config: &LaunchConfig, inherited: &[String], timeout: Duration) -> Result<RunResult>;

    /// Renders the command line [`ContainerEngine::run`] would execute.
    fn render(&self, config: &LaunchConfig, inherited: &[String]) -> Vec<String>;
}

/// Creates the engine named in `config`.
#[must_use]
pub fn detect_engine(config: &HarnessConfig) -> Box<dyn ContainerEngine> {
    Box::new(docker::DockerEngine::new(config.engine.clone()))
}
