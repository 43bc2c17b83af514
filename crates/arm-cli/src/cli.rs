//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// arm - install AI rulesets and promptsets into your tools
#[derive(Parser, Debug)]
#[command(name = "arm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Manifest to operate on
    #[arg(long, global = true, env = "ARM_MANIFEST_PATH")]
    pub manifest: Option<PathBuf>,

    /// Content cache directory (default: ~/.arm/cache)
    #[arg(long, global = true, env = "ARM_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a registry or sink to the manifest
    Add {
        #[command(subcommand)]
        target: AddTarget,
    },

    /// Remove a registry, sink or dependency
    ///
    /// Removing a registry uninstalls its packages. Removing a sink
    /// uninstalls everything from it and drops it from every dependency.
    Remove {
        #[command(subcommand)]
        target: RemoveTarget,
    },

    /// Change one field of a registry, sink or dependency
    ///
    /// Examples:
    ///   arm set sink cursor directory .cursor/rules/team
    ///   arm set dependency team/python version ^2
    ///   arm set dependency team/python include "**/*.yml,rules/*.yaml"
    Set {
        #[command(subcommand)]
        target: SetTarget,
    },

    /// List registries, sinks or dependencies
    List {
        #[command(subcommand)]
        target: Option<ListTarget>,
    },

    /// Show a dependency's declared, locked and installed state
    Info {
        /// Package as <registry>/<name>
        package: String,

        /// Also query the registry for available versions
        #[arg(long)]
        versions: bool,
    },

    /// Install a package, or everything in the manifest
    ///
    /// Examples:
    ///   arm install                            # everything, lockfile-pinned
    ///   arm install team/python@^1 cursor      # one package into one sink
    ///   arm install team/prompts@main copilot --type promptset
    Install(InstallArgs),

    /// Remove a package (or `all`) from sinks, lockfile and manifest
    Uninstall {
        /// Package as <registry>/<name>, or `all`
        package: String,
    },

    /// Re-resolve within manifest constraints and reinstall what changed
    Update(BatchArgs),

    /// Resolve `latest`, ignoring manifest constraints (which stay as written)
    Upgrade(BatchArgs),

    /// Show current, wanted and latest versions
    Outdated,

    /// Clean the content cache or sink directories
    Clean {
        #[command(subcommand)]
        target: CleanTarget,
    },

    /// Compile local resource files for a tool
    Compile {
        /// Resource files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Compile target: cursor, amazonq, copilot or markdown
        #[arg(short, long)]
        target: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Only accept documents of this kind (ruleset or promptset)
        #[arg(long = "type")]
        kind: Option<String>,

        /// Stop at the first file that fails
        #[arg(long)]
        fail_fast: bool,
    },

    /// Convert tool markdown files into one ruleset or promptset document
    Convert {
        /// Markdown files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// ruleset or promptset
        #[arg(long = "type", default_value = "ruleset")]
        kind: String,

        /// Resource id
        #[arg(long)]
        id: String,

        /// Resource name (defaults to the id)
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the arm version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum AddTarget {
    /// Add a package registry
    ///
    /// Examples:
    ///   arm add registry team --type git --url https://github.com/acme/rules
    ///   arm add registry lab --type gitlab --url https://gitlab.com --project-id 42
    ///   arm add registry cs --type cloudsmith --owner acme --repository rules
    Registry {
        name: String,

        /// git, gitlab or cloudsmith
        #[arg(long = "type")]
        kind: String,

        #[arg(long)]
        url: Option<String>,

        /// Git branches offered as versions, comma separated
        #[arg(long, value_delimiter = ',')]
        branches: Vec<String>,

        #[arg(long)]
        project_id: Option<String>,

        #[arg(long)]
        group_id: Option<String>,

        #[arg(long)]
        api_version: Option<String>,

        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        repository: Option<String>,

        /// Replace an existing registry of the same name
        #[arg(long)]
        force: bool,
    },

    /// Add an output directory
    Sink {
        name: String,

        /// Directory, relative to the manifest
        #[arg(long)]
        directory: String,

        /// cursor, amazonq, copilot or markdown
        #[arg(long)]
        compile_target: String,

        /// hierarchical or flat
        #[arg(long, default_value = "hierarchical")]
        layout: String,

        /// Replace an existing sink of the same name
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoveTarget {
    Registry { name: String },
    Sink { name: String },
    /// Same as `arm uninstall <package>`
    Dependency { package: String },
}

#[derive(Subcommand, Debug)]
pub enum SetTarget {
    /// Fields: type, url, branches, projectId, groupId, apiVersion, owner, repository
    Registry {
        name: String,
        field: String,
        value: String,
    },
    /// Fields: directory, layout, compileTarget
    Sink {
        name: String,
        field: String,
        value: String,
    },
    /// Fields: version, priority, sinks, include, exclude
    Dependency {
        package: String,
        field: String,
        value: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    Registries,
    Sinks,
    Dependencies,
}

#[derive(Subcommand, Debug)]
pub enum CleanTarget {
    /// Remove cache entries not used recently
    Cache {
        /// Age such as 30m, 12h or 7d
        #[arg(long, conflicts_with = "nuke")]
        max_age: Option<String>,

        /// Delete the entire cache
        #[arg(long)]
        nuke: bool,
    },

    /// Remove files in sink directories that arm does not track
    Sinks {
        /// Remove everything arm installed, index included
        #[arg(long)]
        nuke: bool,
    },
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// <registry>/<name>[@constraint]; omit (or `all`) for everything
    pub package: Option<String>,

    /// Sinks to install into
    pub sinks: Vec<String>,

    /// ruleset or promptset
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Glob of files to take from the package (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Glob of files to skip (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Ruleset priority; higher wins
    #[arg(long)]
    pub priority: Option<i64>,

    /// Stop and roll back at the first failing package
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// <registry>/<name>; omit (or `all`) for everything
    pub package: Option<String>,

    /// Stop and roll back at the first failing package
    #[arg(long)]
    pub fail_fast: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_takes_package_then_sinks() {
        let cli = Cli::parse_from(["arm", "install", "team/python@^1", "cursor", "copilot"]);
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.package.as_deref(), Some("team/python@^1"));
                assert_eq!(args.sinks, vec!["cursor", "copilot"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn branches_split_on_commas() {
        let cli = Cli::parse_from([
            "arm", "add", "registry", "team", "--type", "git", "--url", "u", "--branches", "main,dev",
        ]);
        match cli.command {
            Commands::Add {
                target: AddTarget::Registry { branches, .. },
            } => assert_eq!(branches, vec!["main", "dev"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn max_age_conflicts_with_nuke() {
        let parsed = Cli::try_parse_from(["arm", "clean", "cache", "--max-age", "1d", "--nuke"]);
        assert!(parsed.is_err());
    }
}
