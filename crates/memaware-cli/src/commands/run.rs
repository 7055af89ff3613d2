//! `memaware run`: build the test image and run the scenarios.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Args;
use memaware_common::config::HarnessConfig;
use memaware_runtime::backend::detect_engine;
use memaware_scenarios::driver::Driver;
use memaware_scenarios::report::{RunSummary, ScenarioOutcome};

use crate::output::{BOLD, DIM, GREEN, RED, RESET, YELLOW, format_duration_ms};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only run scenarios whose name equals or starts with NAME.
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Keep the test image after the run.
    #[arg(long)]
    pub retain_image: bool,

    /// Stop after the first failing scenario.
    #[arg(long)]
    pub strict: bool,

    /// Supervising timeout for each container run, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Runtime installation copied into the test image.
    #[arg(long, value_name = "DIR")]
    pub runtime_home: Option<PathBuf>,

    /// Directory holding the compiled target programs.
    #[arg(long, value_name = "DIR")]
    pub program_dir: Option<PathBuf>,

    /// Container engine CLI to invoke.
    #[arg(long, value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Applies command-line overrides on top of `config`.
    fn apply(&self, config: &mut HarnessConfig) {
        if self.retain_image {
            config.retain_image = true;
        }
        if self.strict {
            config.strict = true;
        }
        if let Some(secs) = self.timeout {
            config.run_timeout_secs = secs;
        }
        if let Some(home) = &self.runtime_home {
            config.runtime_home = Some(home.clone());
        }
        if let Some(dir) = &self.program_dir {
            config.program_dir.clone_from(dir);
        }
        if let Some(engine) = &self.engine {
            config.engine.clone_from(engine);
        }
    }
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the harness hits a
/// fatal error, or any scenario fails.
pub fn execute(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = super::load_config(config_path)?;
    args.apply(&mut config);
    config.validate()?;
    let scenarios = super::selected_scenarios(&args.only)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    print_header(&config, scenarios.len());
    let engine = detect_engine(&config);
    let summary = Driver::new(engine.as_ref(), config)
        .with_cancel_flag(cancel)
        .run(&scenarios)?;

    if args.json {
        println!("{}", summary.to_json()?);
    }
    print_summary(&summary, start);

    if summary.is_success() {
        Ok(())
    } else if let Some(teardown) = &summary.teardown_error {
        Err(anyhow::anyhow!("image teardown failed: {teardown}"))
    } else {
        Err(anyhow::anyhow!("{} scenario(s) failed", summary.failed()))
    }
}

fn print_header(config: &HarnessConfig, count: usize) {
    eprintln!();
    eprintln!("  {BOLD}memaware{RESET} {DIM}v{}{RESET}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  {DIM}{count} scenario(s) against {} via {}{RESET}",
        config.image_name, config.engine
    );
    eprintln!();
}

fn print_summary(summary: &RunSummary, start: Instant) {
    if let Some(reason) = &summary.skipped {
        eprintln!("  {YELLOW}Skipped:{RESET} {reason}");
        return;
    }

    for report in &summary.reports {
        let took = format_duration_ms(report.duration_ms);
        match &report.outcome {
            ScenarioOutcome::Passed => {
                eprintln!("    {GREEN}●{RESET} {BOLD}{}{RESET} {DIM}{took}{RESET}", report.name);
            }
            ScenarioOutcome::PassedWithFallback { notes } => {
                eprintln!("    {YELLOW}●{RESET} {BOLD}{}{RESET} {DIM}{took}{RESET}", report.name);
                for note in notes {
                    eprintln!("        {DIM}tolerated: {note}{RESET}");
                }
            }
            ScenarioOutcome::Failed { failure } => {
                eprintln!("    {RED}●{RESET} {BOLD}{}{RESET} {DIM}{took}{RESET}", report.name);
                for line in failure.to_string().lines() {
                    eprintln!("        {line}");
                }
            }
        }
    }

    eprintln!();
    if summary.cancelled {
        eprintln!("  {YELLOW}Interrupted:{RESET} remaining scenarios were not run.");
    }
    if let Some(teardown) = &summary.teardown_error {
        eprintln!("  {RED}Teardown failed:{RESET} {teardown}");
    }
    let colour = if summary.failed() == 0 { GREEN } else { RED };
    eprintln!(
        "  {colour}{BOLD}{} passed, {} failed{RESET} in {}",
        summary.passed(),
        summary.failed(),
        format_duration_ms(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX))
    );
}
