//! Command implementations for arm-cli

pub mod clean;
pub mod config;
pub mod local;
pub mod packages;
mod print;

use std::process::ExitCode;

use arm_meta::ResourceKind;

use crate::cli::Commands;
use crate::context::Context;
use crate::error::{CliError, Result};

/// Run one parsed command to completion.
pub fn dispatch(command: Commands, ctx: &Context) -> Result<ExitCode> {
    match command {
        Commands::Add { target } => config::run_add(ctx, target),
        Commands::Remove { target } => config::run_remove(ctx, target),
        Commands::Set { target } => config::run_set(ctx, target),
        Commands::List { target } => config::run_list(ctx, target),
        Commands::Info { package, versions } => config::run_info(ctx, &package, versions),
        Commands::Install(args) => packages::run_install(ctx, args),
        Commands::Uninstall { package } => packages::run_uninstall(ctx, &package),
        Commands::Update(args) => packages::run_update(ctx, args, false),
        Commands::Upgrade(args) => packages::run_update(ctx, args, true),
        Commands::Outdated => packages::run_outdated(ctx),
        Commands::Clean { target } => clean::run_clean(ctx, target),
        Commands::Compile {
            inputs,
            target,
            output,
            kind,
            fail_fast,
        } => local::run_compile(&inputs, &target, &output, kind.as_deref(), fail_fast),
        Commands::Convert {
            inputs,
            kind,
            id,
            name,
            description,
            output,
        } => local::run_convert(&inputs, &kind, id, name, description, output.as_deref()),
        Commands::Version => {
            println!("arm {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub(crate) fn parse_kind(value: &str) -> Result<ResourceKind> {
    ResourceKind::parse(value)
        .ok_or_else(|| CliError::user(format!("unknown type '{value}' (expected ruleset or promptset)")))
}

/// `None` and `all` both mean every package.
pub(crate) fn is_all(package: Option<&str>) -> bool {
    matches!(package, None | Some("all"))
}
