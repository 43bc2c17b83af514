//! compile / convert: local files only, no manifest needed

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::Colorize;

use arm_compiler::{CompileTarget, ConvertOptions};
use arm_core::{LocalCompileOptions, compile_paths, convert_paths};

use super::parse_kind;
use crate::error::{CliError, Result};

pub fn run_compile(
    inputs: &[PathBuf],
    target: &str,
    output: &Path,
    kind: Option<&str>,
    fail_fast: bool,
) -> Result<ExitCode> {
    let options = LocalCompileOptions {
        target: target.parse::<CompileTarget>()?,
        kind: kind.map(parse_kind).transpose()?,
        fail_fast,
    };
    let report = compile_paths(inputs, output, &options)?;

    for path in &report.written {
        println!("   {} {}", "+".green().bold(), path.display());
    }
    for failure in &report.failures {
        println!(
            "   {} {}: {}",
            "!".red().bold(),
            failure.path.cyan(),
            failure.message.red()
        );
    }
    if !report.is_success() {
        return Err(CliError::Partial {
            failed: report.failures.len(),
            total: report.failures.len() + report.written.len(),
        });
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_convert(
    inputs: &[PathBuf],
    kind: &str,
    id: String,
    name: Option<String>,
    description: Option<String>,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let options = ConvertOptions {
        kind: parse_kind(kind)?,
        name: name.unwrap_or_else(|| id.clone()),
        id,
        description,
    };
    let yaml = convert_paths(inputs, &options, output)?;
    match output {
        Some(path) => println!("{} Wrote {}", "OK".green().bold(), path.display()),
        None => print!("{yaml}"),
    }
    Ok(ExitCode::SUCCESS)
}
