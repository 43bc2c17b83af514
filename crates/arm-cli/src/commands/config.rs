//! add / remove / set / list / info

use std::process::ExitCode;
use std::str::FromStr;

use colored::Colorize;

use arm_compiler::CompileTarget;
use arm_core::{Layout, PackageKey, SinkConfig};
use arm_registry::{RegistryConfig, RegistryKind};

use super::print;
use crate::cli::{AddTarget, ListTarget, RemoveTarget, SetTarget};
use crate::context::Context;
use crate::error::{CliError, Result};

pub fn run_add(ctx: &Context, target: AddTarget) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    match target {
        AddTarget::Registry {
            name,
            kind,
            url,
            branches,
            project_id,
            group_id,
            api_version,
            owner,
            repository,
            force,
        } => {
            let kind = RegistryKind::from_str(&kind).map_err(CliError::user)?;
            let mut config = match kind {
                RegistryKind::Git => RegistryConfig::git(url.unwrap_or_default(), branches),
                RegistryKind::Gitlab => RegistryConfig::gitlab(
                    url.unwrap_or_default(),
                    project_id,
                    group_id,
                    api_version,
                ),
                RegistryKind::Cloudsmith => RegistryConfig::cloudsmith(
                    url,
                    owner.unwrap_or_default(),
                    repository.unwrap_or_default(),
                ),
            };
            if kind != RegistryKind::Git && !config.branches.is_empty() {
                config.branches.clear();
                tracing::warn!("--branches only applies to git registries; ignored");
            }
            arm.add_registry(&name, config, force)?;
            println!("{} Added registry {}", "OK".green().bold(), name.cyan());
        }
        AddTarget::Sink {
            name,
            directory,
            compile_target,
            layout,
            force,
        } => {
            let config = SinkConfig::new(
                directory,
                layout.parse::<Layout>()?,
                compile_target.parse::<CompileTarget>()?,
            );
            arm.add_sink(&name, config, force)?;
            println!("{} Added sink {}", "OK".green().bold(), name.cyan());
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_remove(ctx: &Context, target: RemoveTarget) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    let report = match target {
        RemoveTarget::Registry { name } => {
            print::heading(&format!("Removing registry {}", name.cyan()));
            arm.remove_registry(&name)?
        }
        RemoveTarget::Sink { name } => {
            print::heading(&format!("Removing sink {}", name.cyan()));
            arm.remove_sink(&name)?
        }
        RemoveTarget::Dependency { package } => {
            let outcome = arm.uninstall(&PackageKey::parse(&package)?)?;
            print::outcome(&outcome);
            return Ok(ExitCode::SUCCESS);
        }
    };
    print::batch(&report)?;
    Ok(ExitCode::SUCCESS)
}

pub fn run_set(ctx: &Context, target: SetTarget) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    match target {
        SetTarget::Registry { name, field, value } => {
            arm.set_registry(&name, &field, &value)?;
            println!("{} {}.{} = {}", "OK".green().bold(), name.cyan(), field, value);
        }
        SetTarget::Sink { name, field, value } => {
            let report = arm.set_sink(&name, &field, &value)?;
            println!("{} {}.{} = {}", "OK".green().bold(), name.cyan(), field, value);
            print::batch(&report)?;
        }
        SetTarget::Dependency {
            package,
            field,
            value,
        } => {
            let report = arm.set_dependency(&PackageKey::parse(&package)?, &field, &value)?;
            println!("{} {}.{} = {}", "OK".green().bold(), package.cyan(), field, value);
            print::batch(&report)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_list(ctx: &Context, target: Option<ListTarget>) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    let show = |t: ListTarget| target.is_none_or(|wanted| wanted == t);

    if show(ListTarget::Registries) {
        println!("{}", "Registries".bold());
        for (name, config) in arm.list_registries()? {
            println!(
                "   {} {} ({})",
                name.cyan(),
                config.address(),
                config.kind.as_str().dimmed()
            );
        }
    }
    if show(ListTarget::Sinks) {
        println!("{}", "Sinks".bold());
        for (name, config) in arm.list_sinks()? {
            println!(
                "   {} {} ({}, {})",
                name.cyan(),
                config.directory,
                config.compile_target,
                config.layout.to_string().dimmed()
            );
        }
    }
    if show(ListTarget::Dependencies) {
        println!("{}", "Dependencies".bold());
        for status in arm.list_dependencies()? {
            let locked = status
                .lock
                .as_ref()
                .map(|l| l.display.clone())
                .unwrap_or_else(|| "unlocked".to_string());
            let marker = if status.is_in_sync() {
                "OK".green()
            } else {
                "!!".yellow()
            };
            println!(
                "   {} {} {} -> {} [{}]",
                marker,
                status.package.cyan(),
                status.config.version,
                locked,
                status.config.sinks.join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_info(ctx: &Context, package: &str, versions: bool) -> Result<ExitCode> {
    let arm = ctx.arm()?;
    let key = PackageKey::parse(package)?;
    let status = arm.dependency_info(&key)?;
    let config = &status.config;

    println!("{}", status.package.cyan().bold());
    println!("   type:       {}", config.kind);
    println!("   constraint: {}", config.version);
    if let Some(priority) = config.effective_priority() {
        println!("   priority:   {priority}");
    }
    println!("   sinks:      {}", config.sinks.join(", "));
    if !config.include.is_empty() {
        println!("   include:    {}", config.include.join(", "));
    }
    if !config.exclude.is_empty() {
        println!("   exclude:    {}", config.exclude.join(", "));
    }
    match &status.lock {
        Some(lock) => {
            println!("   locked:     {} ({})", lock.display, lock.version.dimmed());
            println!("   checksum:   {}", lock.checksum.dimmed());
        }
        None => println!("   locked:     {}", "no".yellow()),
    }
    for sink in &config.sinks {
        match status.installed.get(sink) {
            Some(version) => println!("   {sink}: installed {}", version.display),
            None => println!("   {sink}: {}", "not installed".yellow()),
        }
    }

    if versions {
        println!("{}", "Available versions".bold());
        for version in arm.available_versions(&key)? {
            let label = if version.is_tagged() { "tag" } else { "branch" };
            println!("   {} {}", version.display, label.dimmed());
        }
    }
    Ok(ExitCode::SUCCESS)
}
