//! Unified error types for the memaware workspace.
//!
//! Every variant except [`HarnessError::EnvironmentUnavailable`] is
//! harness-fatal: it aborts the run instead of being recorded as a
//! scenario failure. Assertion failures are not represented here; they
//! belong to the verification crate.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The host cannot run container tests at all.
    #[error("container testing unavailable: {reason}")]
    EnvironmentUnavailable {
        /// Why the environment was rejected.
        reason: String,
    },

    /// Building the test image failed.
    #[error("failed to build image {image} (exit code {exit_code}):\n{output}")]
    ImageBuild {
        /// Image reference that was being built.
        image: String,
        /// Exit code of the engine build command.
        exit_code: i32,
        /// Captured build output.
        output: String,
    },

    /// The engine refused to remove the test image.
    #[error("failed to remove image {image}: {stderr}")]
    ImageRemove {
        /// Image reference that was being removed.
        image: String,
        /// Engine diagnostics.
        stderr: String,
    },

    /// The container engine binary could not be invoked.
    #[error("failed to invoke {program}: {source}")]
    Engine {
        /// Engine program that failed to spawn.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The engine could not start the container or its entry program.
    #[error("container failed to start (exit code {exit_code}): {stderr}")]
    ContainerStart {
        /// Exit code reported by the engine.
        exit_code: i32,
        /// Engine diagnostics.
        stderr: String,
    },

    /// A container did not terminate within the supervising timeout.
    #[error("container {container} did not exit within {timeout_secs}s and was killed")]
    Timeout {
        /// Name of the container that hung.
        container: String,
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },

    /// A value the harness depends on was absent from the trace output.
    #[error("no match for '{what}' (pattern `{pattern}`) in output:\n{excerpt}")]
    MissingCapture {
        /// Human description of the missing value.
        what: String,
        /// Pattern that failed to match.
        pattern: String,
        /// Excerpt of the output that was searched.
        excerpt: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A memory size string could not be parsed.
    #[error("invalid memory size: {value:?}")]
    InvalidSize {
        /// Offending input.
        value: String,
    },

    /// A configuration file could not be parsed.
    #[error("configuration parse error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl HarnessError {
    /// Returns `true` when the error means the run should be skipped rather
    /// than reported as a failure.
    #[must_use]
    pub const fn is_environment_unavailable(&self) -> bool {
        matches!(self, Self::EnvironmentUnavailable { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HarnessError>;
