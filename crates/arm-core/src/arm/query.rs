//! Read-only listings

use std::collections::BTreeMap;

use arm_registry::{RegistryConfig, Version};

use super::Arm;
use crate::error::Result;
use crate::lockfile::{LockEntry, Lockfile, ResolvedVersion};
use crate::manifest::{DependencyConfig, Manifest, SinkConfig};
use crate::package::PackageKey;

/// A dependency as declared, locked and found in its sinks.
#[derive(Debug, Clone)]
pub struct DependencyStatus {
    pub package: String,
    pub config: DependencyConfig,
    pub lock: Option<LockEntry>,
    /// Sink name to the version its index records
    pub installed: BTreeMap<String, ResolvedVersion>,
}

impl DependencyStatus {
    /// Every declared sink holds the locked version.
    pub fn is_in_sync(&self) -> bool {
        let Some(lock) = &self.lock else {
            return false;
        };
        self.config.sinks.iter().all(|sink| {
            self.installed
                .get(sink)
                .is_some_and(|v| v.id == lock.version)
        })
    }
}

impl Arm {
    pub fn list_registries(&self) -> Result<BTreeMap<String, RegistryConfig>> {
        Ok(self.manifest.load()?.registries)
    }

    pub fn list_sinks(&self) -> Result<BTreeMap<String, SinkConfig>> {
        Ok(self.manifest.load()?.sinks)
    }

    pub fn list_dependencies(&self) -> Result<Vec<DependencyStatus>> {
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;
        manifest
            .dependency_keys()
            .iter()
            .map(|key| self.status_of(&manifest, &lockfile, key))
            .collect()
    }

    pub fn dependency_info(&self, key: &PackageKey) -> Result<DependencyStatus> {
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;
        self.status_of(&manifest, &lockfile, key)
    }

    /// Versions a registry currently offers for a package.
    pub fn available_versions(&self, key: &PackageKey) -> Result<Vec<Version>> {
        let manifest = self.manifest.load()?;
        let registry = self.registry(&manifest, &key.registry)?;
        Ok(registry.list_versions(&key.name)?)
    }

    fn status_of(&self, manifest: &Manifest, lockfile: &Lockfile, key: &PackageKey) -> Result<DependencyStatus> {
        let config = manifest.dependency(key)?.clone();
        let mut installed = BTreeMap::new();
        for installer in self.installers(manifest) {
            if let Some(installation) = installer.is_installed(key)? {
                installed.insert(installer.name().to_string(), installation.version);
            }
        }
        Ok(DependencyStatus {
            package: key.to_string(),
            config,
            lock: lockfile.get(key).cloned(),
            installed,
        })
    }
}
