//! `memaware plan`: show what each scenario would run.

use std::path::Path;

use clap::Args;
use memaware_runtime::backend::detect_engine;
use memaware_scenarios::driver::Driver;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Only show scenarios whose name equals or starts with NAME.
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

/// Executes the `plan` command.
///
/// Nothing is built or run; the engine is only asked to render its
/// command lines.
///
/// # Errors
///
/// Returns an error if the configuration or the scenario filter is invalid.
pub fn execute(args: &PlanArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    config.validate()?;
    let scenarios = super::selected_scenarios(&args.only)?;
    let engine = detect_engine(&config);
    let driver = Driver::new(engine.as_ref(), config);

    println!("Scenario plan for image: {}", driver.config().image_name);
    println!("{}", "\u{2550}".repeat(35));
    println!();

    for planned in driver.plan(&scenarios) {
        println!("  + {}", planned.name);
        println!("      {}", planned.description);
        for command in &planned.commands {
            println!("      $ {}", command.join(" "));
        }
    }

    println!();
    println!("  {} scenario(s) will run.", scenarios.len());
    Ok(())
}
