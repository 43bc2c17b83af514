//! Shared report rendering

use colored::Colorize;

use arm_core::{BatchReport, PackageOutcome, PackageStatus};

use crate::error::{CliError, Result};

pub fn outcome(outcome: &PackageOutcome) {
    let status = &outcome.status;
    let marker = match status {
        PackageStatus::Installed { .. } | PackageStatus::Updated { .. } => "+".green().bold(),
        PackageStatus::Repaired { .. } => "~".yellow().bold(),
        PackageStatus::Unchanged { .. } => "=".dimmed(),
        PackageStatus::Removed => "-".red().bold(),
        PackageStatus::RolledBack => "<".yellow().bold(),
        PackageStatus::Failed(_) => "!".red().bold(),
    };
    match status {
        PackageStatus::Failed(e) => println!(
            "   {} {} {}",
            marker,
            outcome.package.cyan(),
            format!("[{}] {}", e.kind(), e).red()
        ),
        other => println!("   {} {} {}", marker, outcome.package.cyan(), other),
    }
}

/// Print every outcome, then fail when any package failed.
pub fn batch(report: &BatchReport) -> Result<()> {
    for line in &report.reconciled {
        println!("   {} {} (not locked there)", "-".red().bold(), line);
    }
    for item in &report.outcomes {
        outcome(item);
    }
    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::Partial {
            failed,
            total: report.outcomes.len(),
        });
    }
    if report.outcomes.is_empty() && report.reconciled.is_empty() {
        println!("{} Nothing to do.", "OK".green().bold());
    }
    Ok(())
}

pub fn heading(text: &str) {
    println!("{} {}", "=>".blue().bold(), text);
}
