//! Docker-compatible CLI backend.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use memaware_common::constants::{
    ENGINE_EXIT_CANNOT_INVOKE, ENGINE_EXIT_DAEMON_ERROR, ENGINE_EXIT_NOT_FOUND,
};
use memaware_common::error::{HarnessError, Result};
use memaware_common::types::{ContainerName, ImageName};

use super::ContainerEngine;
use crate::launch::LaunchConfig;
use crate::process::{self, Completion};
use crate::result::RunResult;

/// Timeout for short management commands (probe, rmi, kill).
const MANAGEMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for image builds.
const BUILD_TIMEOUT: Duration = Duration::from_secs(1_800);

/// Backend that shells out to `docker` or a compatible CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    program: String,
}

impl DockerEngine {
    /// Creates a backend invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|_| HarnessError::EnvironmentUnavailable {
            reason: format!("container engine '{}' not found on PATH", self.program),
        })
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        let _ = cmd.args(args);
        cmd
    }

    /// Runs a management command and returns its result.
    fn manage(&self, args: &[String], timeout: Duration) -> Result<RunResult> {
        match process::run_supervised(self.command(args), timeout, || {})? {
            Completion::Exited(result) => Ok(result),
            Completion::TimedOut => Err(HarnessError::Timeout {
                container: format!("{} {}", self.program, args.join(" ")),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    fn run_args(&self, name: &ContainerName, config: &LaunchConfig, inherited: &[String]) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            name.to_string(),
        ];
        args.extend(config.engine_args());
        args.push(config.image().to_string());
        args.extend(config.runtime_command(inherited));
        args
    }

    fn kill_container(&self, name: &ContainerName) {
        let args = ["kill".to_string(), name.to_string()];
        match self.manage(&args, MANAGEMENT_TIMEOUT) {
            Ok(result) if result.exit_code == 0 => {
                tracing::info!(container = %name, "killed hung container");
            }
            Ok(result) => {
                tracing::warn!(container = %name, exit_code = result.exit_code, stderr = %result.stderr.trim(), "engine refused to kill container");
            }
            Err(e) => tracing::warn!(container = %name, error = %e, "failed to kill container"),
        }
    }
}

impl ContainerEngine for DockerEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn probe(&self) -> Result<()> {
        let path = self.locate()?;
        tracing::debug!(engine = %path.display(), "probing container engine");
        let result = self
            .manage(&["ps".to_string()], MANAGEMENT_TIMEOUT)
            .map_err(|e| HarnessError::EnvironmentUnavailable {
                reason: format!("'{} ps' could not run: {e}", self.program),
            })?;
        if result.exit_code != 0 {
            return Err(HarnessError::EnvironmentUnavailable {
                reason: format!(
                    "'{} ps' exited with {}: {}",
                    self.program,
                    result.exit_code,
                    result.stderr.trim()
                ),
            });
        }
        Ok(())
    }

    fn build_image(&self, image: &ImageName, context_dir: &Path) -> Result<()> {
        tracing::info!(%image, context = %context_dir.display(), "building image");
        let args = vec![
            "build".to_string(),
            "--no-cache".to_string(),
            "--tag".to_string(),
            image.to_string(),
            context_dir.display().to_string(),
        ];
        let result = self.manage(&args, BUILD_TIMEOUT)?;
        if result.exit_code != 0 {
            return Err(HarnessError::ImageBuild {
                image: image.to_string(),
                exit_code: result.exit_code,
                output: result.output(),
            });
        }
        Ok(())
    }

    fn remove_image(&self, image: &ImageName) -> Result<()> {
        tracing::info!(%image, "removing image");
        let args = vec!["rmi".to_string(), "--force".to_string(), image.to_string()];
        let result = self.manage(&args, MANAGEMENT_TIMEOUT)?;
        if result.exit_code != 0 {
            return Err(HarnessError::ImageRemove {
                image: image.to_string(),
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    fn run(&self, config: &LaunchConfig, inherited: &[String], timeout: Duration) -> Result<RunResult> {
        let name = ContainerName::generate();
        let args = self.run_args(&name, config, inherited);
        tracing::info!(container = %name, cmd = %args.join(" "), "running container");

        let completion =
            process::run_supervised(self.command(&args), timeout, || self.kill_container(&name))?;
        let result = match completion {
            Completion::Exited(result) => result,
            Completion::TimedOut => {
                return Err(HarnessError::Timeout {
                    container: name.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        if matches!(
            result.exit_code,
            ENGINE_EXIT_DAEMON_ERROR | ENGINE_EXIT_CANNOT_INVOKE | ENGINE_EXIT_NOT_FOUND
        ) {
            return Err(HarnessError::ContainerStart {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        tracing::info!(container = %name, exit_code = result.exit_code, "container exited");
        Ok(result)
    }

    fn render(&self, config: &LaunchConfig, inherited: &[String]) -> Vec<String> {
        let name = ContainerName::new("<generated>");
        std::iter::once(self.program.clone())
            .chain(self.run_args(&name, config, inherited))
            .collect()
    }
}
