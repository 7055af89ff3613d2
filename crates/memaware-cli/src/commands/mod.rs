//! CLI command definitions and dispatch.

pub mod list;
pub mod plan;
pub mod run;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use memaware_common::config::HarnessConfig;
use memaware_scenarios::catalog;
use memaware_scenarios::scenario::Scenario;

/// memaware: checks that a managed runtime honours container memory limits.
#[derive(Parser, Debug)]
#[command(name = "memaware", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a YAML harness configuration file.
    #[arg(long, global = true, env = "MEMAWARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the test image and run the scenarios.
    Run(run::RunArgs),
    /// Print the engine command line of each scenario without running it.
    Plan(plan::PlanArgs),
    /// List the scenarios in the default catalog.
    List(list::ListArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Run(args) => run::execute(args, config),
        Command::Plan(args) => plan::execute(&args, config),
        Command::List(args) => list::execute(&args),
    }
}

/// Loads the configuration file and environment overrides.
fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    let config = HarnessConfig::load(path)?;
    tracing::debug!(
        path = ?path,
        engine = %config.engine,
        image = %config.image_name,
        timeout_secs = config.run_timeout_secs,
        "configuration loaded"
    );
    Ok(config)
}

/// Returns the default catalog narrowed to `only`.
fn selected_scenarios(only: &[String]) -> anyhow::Result<Vec<Scenario>> {
    let scenarios = catalog::select(catalog::default_catalog()?, only)?;
    tracing::info!(count = scenarios.len(), filter = ?only, "scenarios selected");
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged<T>(f: impl FnOnce() -> T) -> (T, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        (value, text)
    }

    #[test]
    fn scenario_selection_is_logged() {
        let (scenarios, log) = logged(|| selected_scenarios(&["oom".to_string()]));
        assert_eq!(scenarios.unwrap().len(), 1);
        assert!(log.contains("scenarios selected"), "{log}");
        assert!(log.contains("count=1"), "{log}");
    }

    #[test]
    fn loaded_configuration_is_logged() {
        let (config, log) = logged(|| load_config(None));
        let config = config.unwrap();
        assert!(log.contains("configuration loaded"), "{log}");
        assert!(log.contains(&format!("engine={}", config.engine)), "{log}");
    }
}
