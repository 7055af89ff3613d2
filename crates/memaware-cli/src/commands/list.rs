//! `memaware list`: list the scenario catalog.

use clap::Args;

use crate::output::format_bytes;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list scenarios whose name equals or starts with NAME.
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if the scenario filter matches nothing.
pub fn execute(args: &ListArgs) -> anyhow::Result<()> {
    let scenarios = super::selected_scenarios(&args.only)?;
    println!("{:<28} {:>10}  DESCRIPTION", "NAME", "MEMORY");
    for scenario in &scenarios {
        let memory = scenario
            .limit_bytes()
            .map_or_else(|| "host".to_string(), format_bytes);
        println!("{:<28} {memory:>10}  {scenario}", scenario.name());
    }
    Ok(())
}
