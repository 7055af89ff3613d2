//! Fluent API for describing one container run.

use memaware_common::constants::DEFAULT_LAUNCHER;
use memaware_common::types::ImageName;

/// A single engine-level flag such as `--memory 100m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFlag {
    /// Flag name including leading dashes.
    pub key: String,
    /// Flag value, absent for switches.
    pub value: Option<String>,
}

/// Builder for the parameters of one container run.
///
/// Every collection is append-only. Order is significant: the engine sees
/// flags in insertion order, so a repeated `--memory` takes its last value,
/// and runtime options are laid out as own options, inherited defaults,
/// then appended options so an appended option overrides an inherited one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    base_image: ImageName,
    launcher: String,
    engine_flags: Vec<EngineFlag>,
    target_program: String,
    program_args: Vec<String>,
    runtime_options: Vec<String>,
    appended_runtime_options: Vec<String>,
}

impl LaunchConfig {
    /// Creates a configuration running `entry_program` in `image` with no
    /// extra flags or options.
    #[must_use]
    pub fn new(image: ImageName, entry_program: impl Into<String>) -> Self {
        Self {
            base_image: image,
            launcher: DEFAULT_LAUNCHER.to_string(),
            engine_flags: Vec::new(),
            target_program: entry_program.into(),
            program_args: Vec::new(),
            runtime_options: Vec::new(),
            appended_runtime_options: Vec::new(),
        }
    }

    /// Sets the runtime launcher path inside the image.
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Into<String>) -> Self {
        self.launcher = launcher.into();
        self
    }

    /// Appends an engine flag with a value.
    #[must_use]
    pub fn with_engine_flag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.engine_flags.push(EngineFlag {
            key: key.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Appends an engine flag without a value.
    #[must_use]
    pub fn with_engine_switch(mut self, key: impl Into<String>) -> Self {
        self.engine_flags.push(EngineFlag {
            key: key.into(),
            value: None,
        });
        self
    }

    /// Appends a positional argument for the target program.
    #[must_use]
    pub fn with_program_arg(mut self, value: impl Into<String>) -> Self {
        self.program_args.push(value.into());
        self
    }

    /// Appends a runtime option placed before the inherited defaults.
    #[must_use]
    pub fn with_runtime_option(mut self, option: impl Into<String>) -> Self {
        self.runtime_options.push(option.into());
        self
    }

    /// Appends a runtime option placed after the inherited defaults.
    #[must_use]
    pub fn with_appended_runtime_option(mut self, option: impl Into<String>) -> Self {
        self.appended_runtime_options.push(option.into());
        self
    }

    /// Returns the image the container runs.
    #[must_use]
    pub const fn image(&self) -> &ImageName {
        &self.base_image
    }

    /// Returns the target program.
    #[must_use]
    pub fn target_program(&self) -> &str {
        &self.target_program
    }

    /// Returns the engine flags in insertion order.
    #[must_use]
    pub fn engine_flags(&self) -> &[EngineFlag] {
        &self.engine_flags
    }

    /// Returns the positional program arguments.
    #[must_use]
    pub fn program_args(&self) -> &[String] {
        &self.program_args
    }

    /// Returns the value the engine will act on for `key`: the last one given.
    #[must_use]
    pub fn last_flag_value(&self, key: &str) -> Option<&str> {
        self.engine_flags
            .iter()
            .rev()
            .find(|flag| flag.key == key)
            .and_then(|flag| flag.value.as_deref())
    }

    /// Renders the engine flags as command-line words.
    #[must_use]
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.engine_flags.len() * 2);
        for flag in &self.engine_flags {
            args.push(flag.key.clone());
            if let Some(value) = &flag.value {
                args.push(value.clone());
            }
        }
        args
    }

    /// Renders the command executed inside the container.
    ///
    /// `inherited` options sit between this config's own runtime options
    /// and its appended ones.
    #[must_use]
    pub fn runtime_command(&self, inherited: &[String]) -> Vec<String> {
        std::iter::once(self.launcher.clone())
            .chain(self.runtime_options.iter().cloned())
            .chain(inherited.iter().cloned())
            .chain(self.appended_runtime_options.iter().cloned())
            .chain(std::iter::once(self.target_program.clone()))
            .chain(self.program_args.iter().cloned())
            .collect()
    }
}
