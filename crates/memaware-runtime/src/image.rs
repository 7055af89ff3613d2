//! Test image lifecycle.
//!
//! [`ImageGuard`] owns the image for the duration of a harness run: it is
//! built on acquisition and removed exactly once, either by an explicit
//! [`ImageGuard::release`] or when the guard is dropped on an early return.

use std::path::Path;

use memaware_common::config::HarnessConfig;
use memaware_common::constants::IMAGE_RUNTIME_HOME;
use memaware_common::error::{HarnessError, Result};
use memaware_common::types::ImageName;
use tempfile::TempDir;

use crate::backend::ContainerEngine;

/// Renders the build recipe for the test image.
#[must_use]
pub fn dockerfile(base_image: &str) -> String {
    format!(
        "FROM {base_image}\n\
         COPY {IMAGE_RUNTIME_HOME} {IMAGE_RUNTIME_HOME}\n\
         ENV JAVA_HOME={IMAGE_RUNTIME_HOME}\n\
         CMD [\"/bin/bash\"]\n"
    )
}

/// Creates a temporary build context holding the recipe and a copy of the
/// configured runtime.
///
/// # Errors
///
/// Returns an error if no runtime home is configured, it is not a
/// directory, or copying fails.
pub fn prepare_build_context(config: &HarnessConfig) -> Result<TempDir> {
    let runtime_home = config
        .runtime_home
        .as_deref()
        .ok_or_else(|| HarnessError::Config {
            message: "runtime_home is required to build the test image".into(),
        })?;
    if !runtime_home.is_dir() {
        return Err(HarnessError::Config {
            message: format!("runtime_home {} is not a directory", runtime_home.display()),
        });
    }

    let context = tempfile::Builder::new()
        .prefix("memaware-build-")
        .tempdir()
        .map_err(|e| HarnessError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
    let recipe = context.path().join("Dockerfile");
    std::fs::write(&recipe, dockerfile(&config.base_image)).map_err(|e| HarnessError::Io {
        path: recipe.clone(),
        source: e,
    })?;

    let target = context
        .path()
        .join(IMAGE_RUNTIME_HOME.trim_start_matches('/'));
    copy_tree(runtime_home, &target)?;
    tracing::debug!(context = %context.path().display(), "build context prepared");
    Ok(context)
}

/// Recursively copies `src` to `dst`, recreating symlinks on Unix.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |e| HarnessError::Io { path, source: e }
    };
    std::fs::create_dir_all(dst).map_err(io(dst))?;
    for entry in std::fs::read_dir(src).map_err(io(src))? {
        let entry = entry.map_err(io(src))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let kind = entry.file_type().map_err(io(&from))?;
        if kind.is_dir() {
            copy_tree(&from, &to)?;
        } else if kind.is_symlink() {
            copy_symlink(&from, &to)?;
        } else {
            let _ = std::fs::copy(&from, &to).map_err(io(&from))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let target = std::fs::read_link(from).map_err(|e| HarnessError::Io {
        path: from.to_path_buf(),
        source: e,
    })?;
    std::os::unix::fs::symlink(&target, to).map_err(|e| HarnessError::Io {
        path: to.to_path_buf(),
        source: e,
    })
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to).map(|_| ()).map_err(|e| HarnessError::Io {
        path: from.to_path_buf(),
        source: e,
    })
}

/// Scoped ownership of the test image.
pub struct ImageGuard<'a> {
    engine: &'a dyn ContainerEngine,
    image: ImageName,
    retain: bool,
    released: bool,
}

impl<'a> ImageGuard<'a> {
    /// Builds the configured image and takes ownership of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the build context cannot be prepared or the
    /// engine fails to build the image.
    pub fn acquire(engine: &'a dyn ContainerEngine, config: &HarnessConfig) -> Result<Self> {
        let image = config.image();
        let context = prepare_build_context(config)?;
        engine.build_image(&image, context.path())?;
        tracing::info!(%image, engine = engine.name(), "image ready");
        Ok(Self::adopt(engine, image, config.retain_image))
    }

    /// Takes ownership of an image that already exists.
    #[must_use]
    pub const fn adopt(engine: &'a dyn ContainerEngine, image: ImageName, retain: bool) -> Self {
        Self {
            engine,
            image,
            retain,
            released: false,
        }
    }

    /// Returns the owned image.
    #[must_use]
    pub const fn image(&self) -> &ImageName {
        &self.image
    }

    /// Removes the image now, unless retention was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to remove the image.
    pub fn release(mut self) -> Result<()> {
        self.release_once()
    }

    fn release_once(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if self.retain {
            tracing::info!(image = %self.image, "retaining image after run");
            return Ok(());
        }
        self.engine.remove_image(&self.image)
    }
}

impl Drop for ImageGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release_once() {
            tracing::warn!(image = %self.image, error = %e, "image removal failed");
        }
    }
}
