//! Materializes packages in one sink directory
//!
//! Compiled output is written to a staging directory inside the sink and
//! then moved into place, so a failed install leaves the previous
//! installation untouched. The sink index is updated last.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use arm_compiler::{CompileOptions, CompileTarget, Compiler, is_compilable};
use arm_fs::file::{sort_canonical, write_tree};
use arm_fs::{PackageFile, io};
use arm_meta::ResourceKind;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::lockfile::ResolvedVersion;
use crate::manifest::{Layout, SinkConfig};
use crate::package::PackageKey;
use crate::sink::index::{INDEX_FILE, IndexEntry, SinkIndex};

/// Root of hierarchical installs inside a sink.
pub const ARM_DIR: &str = "arm";
pub const STAGING_PREFIX: &str = ".arm-staging-";

/// A package as recorded in a sink index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub package: String,
    pub version: ResolvedVersion,
    pub priority: Option<i64>,
    /// Paths relative to the sink directory
    pub files: Vec<String>,
}

impl Installation {
    fn from_entry(package: &str, entry: &IndexEntry) -> Self {
        Self {
            package: package.to_string(),
            version: ResolvedVersion {
                id: entry.resolved_id.clone(),
                display: entry.version.clone(),
            },
            priority: entry.priority,
            files: entry.files.clone(),
        }
    }
}

pub struct SinkInstaller {
    name: String,
    config: SinkConfig,
    root: PathBuf,
    compiler: Compiler,
}

impl SinkInstaller {
    pub fn new(name: &str, config: &SinkConfig, project_root: &Path) -> Self {
        Self {
            name: name.to_string(),
            config: config.clone(),
            root: config.resolve_directory(project_root),
            compiler: Compiler::new(config.compile_target),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn target(&self) -> CompileTarget {
        self.config.compile_target
    }

    /// The files this sink receives for a package's content.
    ///
    /// Resource documents are compiled; a markdown sink additionally keeps
    /// the raw sources and any other files.
    pub fn render(&self, kind: ResourceKind, files: &[PackageFile]) -> Result<Vec<PackageFile>> {
        let keep_sources = self.target().keeps_sources();
        let options = CompileOptions {
            expected_kind: Some(kind),
            fail_fast: true,
            passthrough: keep_sources,
        };
        let mut outputs = self.compiler.compile_files(files, options)?.into_result()?;
        if keep_sources {
            let produced: BTreeSet<String> =
                outputs.iter().map(|f| f.path.as_str().to_string()).collect();
            outputs.extend(
                files
                    .iter()
                    .filter(|f| is_compilable(&f.path) && !produced.contains(f.path.as_str()))
                    .cloned(),
            );
            sort_canonical(&mut outputs);
        }
        Ok(outputs)
    }

    /// Install one package version, replacing any earlier installation of it.
    pub fn install(
        &self,
        key: &PackageKey,
        kind: ResourceKind,
        version: &ResolvedVersion,
        files: &[PackageFile],
        priority: Option<i64>,
    ) -> Result<Installation> {
        let package = key.to_string();
        let outputs = self.render(kind, files)?;
        let mut index = SinkIndex::load(&self.root)?;
        let previous = index.get(&package).cloned();

        // Flat names share one directory; never take over another package's file
        let placed: Vec<String> = match self.config.layout {
            Layout::Hierarchical => {
                let dir = package_dir(key, &version.display);
                outputs
                    .iter()
                    .map(|f| format!("{dir}/{}", f.path.as_str()))
                    .collect()
            }
            Layout::Flat => {
                let names: Vec<String> = outputs
                    .iter()
                    .map(|f| flat_name(key, priority, f.path.as_str()))
                    .collect();
                for name in &names {
                    if let Some(owner) = index.owner_of(name).filter(|o| *o != package) {
                        return Err(Error::invalid_config(format!(
                            "sink '{}': {name} is already installed by {owner}",
                            self.name
                        )));
                    }
                }
                names
            }
        };

        let staging = self.root.join(format!("{STAGING_PREFIX}{}", Uuid::new_v4()));
        tracing::debug!(sink = %self.name, package = %package, staging = %staging.display(), "Staging package");
        fs::create_dir_all(&staging).map_err(|e| arm_fs::Error::io(&staging, e))?;
        write_tree(&staging, &outputs)?;

        match self.config.layout {
            Layout::Hierarchical => {
                let target = self.root.join(package_dir(key, &version.display));
                io::remove_dir_all_if_exists(&target)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| arm_fs::Error::io(parent, e))?;
                }
                fs::rename(&staging, &target).map_err(|e| arm_fs::Error::io(&target, e))?;
            }
            Layout::Flat => {
                for (file, name) in outputs.iter().zip(&placed) {
                    let from = staging.join(file.path.to_native());
                    let to = self.root.join(name);
                    fs::rename(&from, &to).map_err(|e| arm_fs::Error::io(&to, e))?;
                }
                io::remove_dir_all_if_exists(&staging)?;
            }
        }

        if let Some(previous) = previous {
            let current: BTreeSet<&str> = placed.iter().map(String::as_str).collect();
            for stale in previous.files.iter().filter(|f| !current.contains(f.as_str())) {
                self.remove_owned_file(stale)?;
            }
        }

        let entry = IndexEntry {
            version: version.display.clone(),
            resolved_id: version.id.clone(),
            priority,
            files: placed,
        };
        let installation = Installation::from_entry(&package, &entry);
        index.insert(&package, entry);
        index.save(&self.root)?;

        tracing::info!(
            sink = %self.name,
            package = %package,
            version = %version.display,
            files = installation.files.len(),
            "Installed package"
        );
        Ok(installation)
    }

    /// Remove a package. `Ok(None)` when it was not installed here.
    pub fn uninstall(&self, key: &PackageKey) -> Result<Option<Installation>> {
        let package = key.to_string();
        let mut index = SinkIndex::load(&self.root)?;
        let Some(entry) = index.remove(&package) else {
            return Ok(None);
        };

        for file in &entry.files {
            self.remove_owned_file(file)?;
        }
        if self.config.layout == Layout::Hierarchical {
            let dir = self.root.join(package_dir(key, &entry.version));
            io::remove_dir_all_if_exists(&dir)?;
            if let Some(parent) = dir.parent() {
                io::prune_empty_ancestors(parent, &self.root)?;
            }
        }
        index.save(&self.root)?;

        tracing::info!(sink = %self.name, package = %package, "Uninstalled package");
        Ok(Some(Installation::from_entry(&package, &entry)))
    }

    fn remove_owned_file(&self, relative: &str) -> Result<()> {
        let path = self.root.join(relative);
        io::remove_file_if_exists(&path)?;
        if let Some(parent) = path.parent() {
            io::prune_empty_ancestors(parent, &self.root)?;
        }
        Ok(())
    }

    pub fn list_installed(&self) -> Result<Vec<Installation>> {
        let index = SinkIndex::load(&self.root)?;
        Ok(index
            .packages
            .iter()
            .map(|(package, entry)| Installation::from_entry(package, entry))
            .collect())
    }

    pub fn is_installed(&self, key: &PackageKey) -> Result<Option<Installation>> {
        let index = SinkIndex::load(&self.root)?;
        Ok(index
            .get(&key.to_string())
            .map(|entry| Installation::from_entry(&key.to_string(), entry)))
    }

    /// Whether `key` is installed at `version` with every indexed file present.
    pub fn is_current(&self, key: &PackageKey, version: &ResolvedVersion) -> Result<bool> {
        Ok(self.is_installed(key)?.is_some_and(|installation| {
            installation.version.id == version.id
                && installation.files.iter().all(|f| self.root.join(f).is_file())
        }))
    }

    /// Delete files nothing in the index claims, plus leftover staging
    /// directories. With `nuke`, delete everything arm owns, index included.
    ///
    /// Returns the removed paths relative to the sink directory.
    pub fn clean(&self, nuke: bool) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let index = SinkIndex::load(&self.root)?;
        let mut removed = Vec::new();

        let entries = fs::read_dir(&self.root).map_err(|e| arm_fs::Error::io(&self.root, e))?;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(STAGING_PREFIX) && entry.path().is_dir() {
                io::remove_dir_all_if_exists(&entry.path())?;
                removed.push(name);
            }
        }

        if nuke {
            for file in index.claimed_files() {
                let path = self.root.join(&file);
                if path.is_file() {
                    io::remove_file_if_exists(&path)?;
                    removed.push(file);
                }
            }
            let arm_dir = self.root.join(ARM_DIR);
            if arm_dir.is_dir() {
                removed.extend(relative_files(&self.root, &arm_dir));
                io::remove_dir_all_if_exists(&arm_dir)?;
            }
            io::remove_file_if_exists(&self.root.join(INDEX_FILE))?;
        } else {
            let claimed = index.claimed_files();
            for file in relative_files(&self.root, &self.root) {
                if file == INDEX_FILE || claimed.contains(&file) {
                    continue;
                }
                io::remove_file_if_exists(&self.root.join(&file))?;
                removed.push(file);
            }
        }

        io::prune_empty_dirs(&self.root)?;
        removed.sort();
        removed.dedup();
        if !removed.is_empty() {
            tracing::info!(sink = %self.name, removed = removed.len(), "Cleaned sink");
        }
        Ok(removed)
    }
}

/// `arm/<registry>/<name>/<display>` relative to the sink.
pub fn package_dir(key: &PackageKey, display: &str) -> String {
    let name: Vec<String> = key.name.split('/').map(segment).collect();
    format!(
        "{ARM_DIR}/{}/{}/{}",
        segment(&key.registry),
        name.join("/"),
        segment(display)
    )
}

/// Synthetic file name for flat layouts.
///
/// Rulesets embed their zero-padded priority so that name order follows
/// priority order.
pub fn flat_name(key: &PackageKey, priority: Option<i64>, path: &str) -> String {
    let registry = segment(&key.registry);
    let package = segment(&key.name.replace('/', "_"));
    let file = path.replace('/', "_");
    match priority {
        Some(priority) => format!("arm_{priority:04}_{registry}_{package}_{file}"),
        None => format!("arm_{registry}_{package}_{file}"),
    }
}

fn segment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Files below `dir`, as forward-slash paths relative to `root`.
fn relative_files(root: &Path, dir: &Path) -> Vec<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(root).ok()?;
            Some(arm_fs::NormalizedPath::new(relative).as_str().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Some(100), "rules/a.mdc", "arm_0100_reg_pkg_rules_a.mdc")]
    #[case(Some(5), "a.mdc", "arm_0005_reg_pkg_a.mdc")]
    #[case(None, "p.md", "arm_reg_pkg_p.md")]
    fn flat_names(#[case] priority: Option<i64>, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(flat_name(&PackageKey::new("reg", "pkg"), priority, path), expected);
    }

    #[test]
    fn package_dir_keeps_nested_names() {
        let key = PackageKey::new("lab", "group/rules");
        assert_eq!(package_dir(&key, "1.0.0"), "arm/lab/group/rules/1.0.0");
        assert_eq!(package_dir(&key, "feature/x"), "arm/lab/group/rules/feature_x");
    }
}
