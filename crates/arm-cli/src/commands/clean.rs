//! clean cache / clean sinks

use std::process::ExitCode;

use colored::Colorize;

use arm_core::{DEFAULT_MAX_AGE, parse_age};

use crate::cli::CleanTarget;
use crate::context::Context;
use crate::error::Result;

pub fn run_clean(ctx: &Context, target: CleanTarget) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    match target {
        CleanTarget::Cache { max_age, nuke } => {
            let age = parse_age(max_age.as_deref().unwrap_or(DEFAULT_MAX_AGE))?;
            let report = arm.clean_cache(age, nuke)?;
            if report.nuked {
                println!("{} Removed {}", "OK".green().bold(), arm.cache().root().display());
            } else {
                for entry in &report.removed {
                    println!(
                        "   {} {} {}",
                        "-".red().bold(),
                        entry.index.package.cyan(),
                        entry.index.display
                    );
                }
                println!(
                    "{} Removed {} cache entr{}",
                    "OK".green().bold(),
                    report.removed.len(),
                    if report.removed.len() == 1 { "y" } else { "ies" }
                );
            }
        }
        CleanTarget::Sinks { nuke } => {
            for sink in arm.clean_sinks(nuke)? {
                println!("{} ({} removed)", sink.sink.cyan(), sink.removed.len());
                for file in &sink.removed {
                    println!("   {} {}", "-".red().bold(), file);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
