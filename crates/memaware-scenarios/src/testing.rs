//! Scripted engine for unit tests.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::time::Duration;

use memaware_common::config::HarnessConfig;
use memaware_common::error::{HarnessError, Result};
use memaware_common::types::ImageName;
use memaware_runtime::backend::ContainerEngine;
use memaware_runtime::launch::LaunchConfig;
use memaware_runtime::result::RunResult;
use memaware_runtime::runner::ContainerRunner;

use crate::context::ScenarioContext;

type Responder = Box<dyn Fn(&LaunchConfig) -> Result<RunResult>>;

/// Engine answering runs from a closure and recording every call.
pub struct ScriptedEngine {
    responder: Responder,
    pub probe_error: Option<String>,
    pub remove_fails: bool,
    pub launches: RefCell<Vec<LaunchConfig>>,
    pub builds: Cell<usize>,
    pub removals: Cell<usize>,
}

impl ScriptedEngine {
    pub fn new(responder: impl Fn(&LaunchConfig) -> Result<RunResult> + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            probe_error: None,
            remove_fails: false,
            launches: RefCell::new(Vec::new()),
            builds: Cell::new(0),
            removals: Cell::new(0),
        }
    }
}

impl ContainerEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn probe(&self) -> Result<()> {
        match &self.probe_error {
            Some(reason) => Err(HarnessError::EnvironmentUnavailable {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn build_image(&self, _image: &ImageName, _context_dir: &Path) -> Result<()> {
        self.builds.set(self.builds.get() + 1);
        Ok(())
    }

    fn remove_image(&self, _image: &ImageName) -> Result<()> {
        self.removals.set(self.removals.get() + 1);
        if self.remove_fails {
            return Err(HarnessError::Engine {
                program: "scripted".into(),
                source: std::io::Error::other("image is in use"),
            });
        }
        Ok(())
    }

    fn run(&self, config: &LaunchConfig, _inherited: &[String], _timeout: Duration) -> Result<RunResult> {
        self.launches.borrow_mut().push(config.clone());
        (self.responder)(config)
    }

    fn render(&self, config: &LaunchConfig, inherited: &[String]) -> Vec<String> {
        let mut args = vec!["scripted".to_string()];
        args.extend(config.engine_args());
        args.push(config.image().to_string());
        args.extend(config.runtime_command(inherited));
        args
    }
}

/// Runs `f` with a context over `engine` and default configuration.
pub fn with_context(engine: &ScriptedEngine, f: impl FnOnce(&ScenarioContext<'_>)) {
    let config = HarnessConfig::default();
    let runner = ContainerRunner::from_config(engine, &config);
    let ctx = ScenarioContext::new(&runner, &config, config.image());
    f(&ctx);
}
