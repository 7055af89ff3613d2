//! Harness configuration model.
//!
//! Values come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, then `MEMAWARE_*` environment variables. The CLI
//! applies its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{HarnessError, Result};
use crate::types::ImageName;

/// Root configuration for a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Container engine CLI name or path.
    pub engine: String,
    /// Tag of the image built for the run.
    pub image_name: String,
    /// Base image the test image is built from.
    pub base_image: String,
    /// Host directory holding the runtime copied into the image.
    pub runtime_home: Option<PathBuf>,
    /// Host directory holding the compiled target programs.
    pub program_dir: PathBuf,
    /// Diagnostics jar staged into `program_dir` before the run.
    pub whitebox_jar: Option<PathBuf>,
    /// Runtime launcher path inside the image.
    pub launcher: String,
    /// Runtime options every run inherits, placed between a scenario's
    /// own options and its appended options.
    pub inherited_options: Vec<String>,
    /// Supervising timeout for one container run, in seconds.
    pub run_timeout_secs: u64,
    /// Keep the image after the run instead of removing it.
    pub retain_image: bool,
    /// Stop after the first failing scenario.
    pub strict: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            engine: constants::DEFAULT_ENGINE.to_string(),
            image_name: constants::DEFAULT_IMAGE_NAME.to_string(),
            base_image: constants::DEFAULT_BASE_IMAGE.to_string(),
            runtime_home: None,
            program_dir: PathBuf::from("."),
            whitebox_jar: None,
            launcher: constants::DEFAULT_LAUNCHER.to_string(),
            inherited_options: Vec::new(),
            run_timeout_secs: constants::DEFAULT_RUN_TIMEOUT_SECS,
            retain_image: false,
            strict: false,
        }
    }
}

impl HarnessConfig {
    /// Loads the configuration from an optional YAML file and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// environment override has an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading harness configuration");
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Applies `MEMAWARE_*` overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a boolean or numeric override cannot be parsed.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(engine) = lookup("MEMAWARE_ENGINE") {
            self.engine = engine;
        }
        if let Some(image) = lookup("MEMAWARE_IMAGE") {
            self.image_name = image;
        }
        if let Some(home) = lookup("MEMAWARE_RUNTIME_HOME") {
            self.runtime_home = Some(PathBuf::from(home));
        }
        if let Some(dir) = lookup("MEMAWARE_PROGRAM_DIR") {
            self.program_dir = PathBuf::from(dir);
        }
        if let Some(jar) = lookup("MEMAWARE_WHITEBOX_JAR") {
            self.whitebox_jar = Some(PathBuf::from(jar));
        }
        if let Some(opts) = lookup("MEMAWARE_INHERITED_OPTIONS") {
            self.inherited_options = opts.split_whitespace().map(str::to_string).collect();
        }
        if let Some(secs) = lookup("MEMAWARE_TIMEOUT_SECS") {
            self.run_timeout_secs = secs.trim().parse().map_err(|_| HarnessError::Config {
                message: format!("MEMAWARE_TIMEOUT_SECS is not a number: {secs}"),
            })?;
        }
        if let Some(retain) = lookup("MEMAWARE_RETAIN_IMAGE") {
            self.retain_image = parse_flag("MEMAWARE_RETAIN_IMAGE", &retain)?;
        }
        Ok(())
    }

    /// Checks values that would otherwise fail deep inside a run.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty engine or image name, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            return Err(HarnessError::Config {
                message: "engine must not be empty".into(),
            });
        }
        if self.image_name.trim().is_empty() {
            return Err(HarnessError::Config {
                message: "image_name must not be empty".into(),
            });
        }
        if self.run_timeout_secs == 0 {
            return Err(HarnessError::Config {
                message: "run_timeout_secs must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Returns the image reference for this run.
    #[must_use]
    pub fn image(&self) -> ImageName {
        ImageName::new(self.image_name.clone())
    }

    /// Returns the supervising timeout for one container run.
    #[must_use]
    pub const fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(HarnessError::Config {
            message: format!("{key} is not a boolean: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = HarnessConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.engine, "docker");
        assert_eq!(config.run_timeout(), Duration::from_secs(300));
        assert!(!config.retain_image);
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memaware.yaml");
        std::fs::write(
            &path,
            "engine: podman\nimage_name: local/mem:1\nretain_image: true\ninherited_options: [\"-Xmx1g\"]\n",
        )
        .expect("write config");

        let config = HarnessConfig::from_file(&path).expect("parse");
        assert_eq!(config.engine, "podman");
        assert_eq!(config.image().as_str(), "local/mem:1");
        assert!(config.retain_image);
        assert_eq!(config.inherited_options, vec!["-Xmx1g"]);
        assert_eq!(config.launcher, constants::DEFAULT_LAUNCHER);
    }

    #[test]
    fn unknown_yaml_key_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "engnie: docker\n").expect("write config");
        assert!(matches!(
            HarnessConfig::from_file(&path),
            Err(HarnessError::Yaml { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = HarnessConfig::from_file(Path::new("/nonexistent/memaware.yaml")).unwrap_err();
        assert!(matches!(err, HarnessError::Io { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = HarnessConfig::default();
        config
            .apply_env(env(&[
                ("MEMAWARE_RETAIN_IMAGE", "yes"),
                ("MEMAWARE_TIMEOUT_SECS", "42"),
                ("MEMAWARE_INHERITED_OPTIONS", "-Xmx512m  -XX:+UseSerialGC"),
                ("MEMAWARE_PROGRAM_DIR", "/tmp/classes"),
            ]))
            .expect("apply");
        assert!(config.retain_image);
        assert_eq!(config.run_timeout_secs, 42);
        assert_eq!(config.inherited_options, vec!["-Xmx512m", "-XX:+UseSerialGC"]);
        assert_eq!(config.program_dir, PathBuf::from("/tmp/classes"));
    }

    #[test]
    fn env_override_rejects_bad_values() {
        let mut config = HarnessConfig::default();
        assert!(config.apply_env(env(&[("MEMAWARE_TIMEOUT_SECS", "soon")])).is_err());
        assert!(config.apply_env(env(&[("MEMAWARE_RETAIN_IMAGE", "maybe")])).is_err());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let config = HarnessConfig {
            run_timeout_secs: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
