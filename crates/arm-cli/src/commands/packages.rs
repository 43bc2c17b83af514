//! install / uninstall / update / upgrade / outdated

use std::process::ExitCode;

use colored::Colorize;

use arm_core::{BatchOptions, InstallRequest, PackageKey, PackageSpec};

use super::{is_all, parse_kind, print};
use crate::cli::{BatchArgs, InstallArgs};
use crate::context::Context;
use crate::error::{CliError, Result};

pub fn run_install(ctx: &Context, args: InstallArgs) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    let options = BatchOptions {
        fail_fast: args.fail_fast,
    };

    if is_all(args.package.as_deref()) {
        if !args.sinks.is_empty() || args.kind.is_some() || args.priority.is_some() {
            return Err(CliError::user(
                "sinks, --type and --priority need a package; `arm install` alone installs the manifest",
            ));
        }
        print::heading("Installing manifest dependencies");
        let report = arm.install_all(options)?;
        print::batch(&report)?;
        return Ok(ExitCode::SUCCESS);
    }

    let spec = PackageSpec::parse(args.package.as_deref().unwrap_or_default())?;
    let mut request = InstallRequest::new(spec, args.sinks);
    request.kind = args.kind.as_deref().map(parse_kind).transpose()?;
    request.include = args.include;
    request.exclude = args.exclude;
    request.priority = args.priority;

    print::heading(&format!("Installing {}", request.spec.key.to_string().cyan()));
    let outcome = arm.install(&request)?;
    print::outcome(&outcome);
    Ok(ExitCode::SUCCESS)
}

pub fn run_uninstall(ctx: &Context, package: &str) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    if package == "all" {
        print::heading("Uninstalling every dependency");
        print::batch(&arm.uninstall_all()?)?;
    } else {
        let outcome = arm.uninstall(&PackageKey::parse(package)?)?;
        print::outcome(&outcome);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_update(ctx: &Context, args: BatchArgs, upgrade: bool) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    let options = BatchOptions {
        fail_fast: args.fail_fast,
    };
    let target = match args.package.as_deref() {
        package if is_all(package) => None,
        Some(package) => Some(PackageKey::parse(package)?),
        None => None,
    };

    let verb = if upgrade { "Upgrading" } else { "Updating" };
    match &target {
        Some(key) => print::heading(&format!("{verb} {}", key.to_string().cyan())),
        None => print::heading(&format!("{verb} every dependency")),
    }
    let report = if upgrade {
        arm.upgrade(target.as_ref(), options)?
    } else {
        arm.update(target.as_ref(), options)?
    };
    print::batch(&report)?;
    Ok(ExitCode::SUCCESS)
}

pub fn run_outdated(ctx: &Context) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    let entries = arm.outdated()?;
    if entries.is_empty() {
        println!("No dependencies.");
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<32} {:<12} {:<12} {:<12} {}",
        "Package".bold(),
        "Current".bold(),
        "Wanted".bold(),
        "Latest".bold(),
        "Constraint".bold()
    );
    let mut failed = 0;
    for entry in &entries {
        let cell = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        if let Some(error) = &entry.error {
            failed += 1;
            println!("{:<32} {}", entry.package, format!("[{}] {}", error.kind(), error).red());
            continue;
        }
        let package = if entry.is_outdated() {
            entry.package.yellow()
        } else {
            entry.package.normal()
        };
        println!(
            "{:<32} {:<12} {:<12} {:<12} {}",
            package,
            cell(&entry.current),
            cell(&entry.wanted),
            cell(&entry.latest),
            entry.constraint.dimmed()
        );
    }
    if failed > 0 {
        return Err(CliError::Partial {
            failed,
            total: entries.len(),
        });
    }
    Ok(ExitCode::SUCCESS)
}
