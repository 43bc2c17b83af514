//! In-memory registry driver.
//!
//! Holds packages in process memory. Used by tests and demos to drive the
//! full install pipeline without a network; clones share the same state, so
//! a test can keep a handle and publish new versions after handing a clone
//! to the code under test.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arm_fs::PackageFile;

use crate::error::{Error, Result};
use crate::version::{Version, parse_tag};
use crate::RegistryDriver;

#[derive(Debug, Default)]
struct Package {
    tags: Vec<Version>,
    /// Branch name to current head
    branches: BTreeMap<String, Version>,
}

#[derive(Debug, Default)]
struct State {
    packages: BTreeMap<String, Package>,
    contents: BTreeMap<String, Vec<PackageFile>>,
    next_id: u64,
    unreachable: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    name: String,
    state: Arc<Mutex<State>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::default(),
            fetches: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store(state: &mut State, files: Vec<PackageFile>) -> String {
        state.next_id += 1;
        let id = format!("{:040x}", state.next_id);
        state.contents.insert(id.clone(), files);
        id
    }

    /// Publish a tagged release.
    pub fn publish(&self, package: &str, tag: &str, files: Vec<PackageFile>) -> Result<Version> {
        let semver = parse_tag(tag).ok_or_else(|| Error::InvalidConfig {
            registry: self.name.clone(),
            message: format!("'{tag}' is not a semver tag"),
        })?;
        let mut state = self.state();
        let id = Self::store(&mut state, files);
        let version = Version::tagged(id, semver);
        state
            .packages
            .entry(package.to_string())
            .or_default()
            .tags
            .push(version.clone());
        Ok(version)
    }

    /// Move a branch to a new commit with the given content.
    pub fn push_branch(
        &self,
        package: &str,
        branch: &str,
        default: bool,
        files: Vec<PackageFile>,
    ) -> Version {
        let mut state = self.state();
        let id = Self::store(&mut state, files);
        let version = Version::branch_head(id, branch, default);
        state
            .packages
            .entry(package.to_string())
            .or_default()
            .branches
            .insert(branch.to_string(), version.clone());
        version
    }

    /// Make every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, state: &State) -> Result<()> {
        if state.unreachable {
            return Err(Error::Unreachable {
                registry: self.name.clone(),
                message: "registry is offline".to_string(),
            });
        }
        Ok(())
    }
}

impl RegistryDriver for MemoryRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions(&self, package: &str) -> Result<Vec<Version>> {
        let state = self.state();
        self.check_reachable(&state)?;
        let entry = state
            .packages
            .get(package)
            .ok_or_else(|| Error::PackageNotFound {
                registry: self.name.clone(),
                package: package.to_string(),
            })?;
        let mut versions = entry.tags.clone();
        versions.extend(entry.branches.values().cloned());
        Ok(versions)
    }

    fn fetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        let state = self.state();
        self.check_reachable(&state)?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        state
            .contents
            .get(&version.id)
            .cloned()
            .ok_or_else(|| Error::VersionNotFound {
                registry: self.name.clone(),
                package: package.to_string(),
                version: version.display.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Constraint;

    #[test]
    fn branch_push_replaces_head() {
        let registry = MemoryRegistry::new("mem");
        let first = registry.push_branch("pkg", "main", true, vec![PackageFile::new("a.yml", "1")]);
        let second = registry.push_branch("pkg", "main", true, vec![PackageFile::new("a.yml", "2")]);
        assert_ne!(first.id, second.id);

        let resolved = registry
            .resolve_version("pkg", &Constraint::parse("main").unwrap())
            .unwrap();
        assert_eq!(resolved.id, second.id);
        // Old content stays fetchable by id
        assert_eq!(registry.fetch("pkg", &first).unwrap()[0].content, b"1");
    }

    #[test]
    fn unknown_package_is_not_found() {
        let registry = MemoryRegistry::new("mem");
        assert!(matches!(
            registry.list_versions("nope"),
            Err(Error::PackageNotFound { .. })
        ));
    }

    #[test]
    fn offline_registry_is_unreachable() {
        let registry = MemoryRegistry::new("mem");
        registry.publish("pkg", "1.0.0", vec![]).unwrap();
        registry.set_unreachable(true);
        assert!(registry.list_versions("pkg").unwrap_err().is_network());
    }
}
