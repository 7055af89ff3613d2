//! Shared inputs for scenario execution.

use std::path::PathBuf;

use memaware_common::config::HarnessConfig;
use memaware_common::constants::CONTAINER_PROGRAM_DIR;
use memaware_common::types::ImageName;
use memaware_runtime::launch::LaunchConfig;
use memaware_runtime::runner::ContainerRunner;

use crate::programs;

/// Everything a scenario needs to build and run its containers.
///
/// Holds no mutable state, so scenarios cannot influence each other
/// through it.
pub struct ScenarioContext<'r> {
    runner: &'r ContainerRunner<'r>,
    image: ImageName,
    launcher: String,
    program_dir: PathBuf,
}

impl<'r> ScenarioContext<'r> {
    /// Creates a context running `image` through `runner`.
    #[must_use]
    pub fn new(runner: &'r ContainerRunner<'r>, config: &HarnessConfig, image: ImageName) -> Self {
        let program_dir = std::path::absolute(&config.program_dir)
            .unwrap_or_else(|_| config.program_dir.clone());
        Self {
            runner,
            image,
            launcher: config.launcher.clone(),
            program_dir,
        }
    }

    /// Returns the runner.
    #[must_use]
    pub const fn runner(&self) -> &'r ContainerRunner<'r> {
        self.runner
    }

    /// Returns the image under test.
    #[must_use]
    pub const fn image(&self) -> &ImageName {
        &self.image
    }

    /// Base configuration for `program`: target programs mounted, container
    /// trace enabled, classpath pointing at the mount.
    #[must_use]
    pub fn new_config(&self, program: &str) -> LaunchConfig {
        LaunchConfig::new(self.image.clone(), program)
            .with_launcher(self.launcher.clone())
            .with_engine_flag(
                "--volume",
                format!("{}:{CONTAINER_PROGRAM_DIR}", self.program_dir.display()),
            )
            .with_runtime_option(programs::CONTAINER_TRACE_OPTION)
            .with_runtime_option("-cp")
            .with_runtime_option(CONTAINER_PROGRAM_DIR)
    }

    /// Base configuration for the default program.
    #[must_use]
    pub fn default_config(&self) -> LaunchConfig {
        self.new_config(programs::HELLO)
    }
}

/// Adds the options enabling the diagnostics API.
#[must_use]
pub fn with_whitebox(config: LaunchConfig) -> LaunchConfig {
    programs::WHITEBOX_OPTIONS
        .iter()
        .fold(config, |config, option| config.with_runtime_option(*option))
}
