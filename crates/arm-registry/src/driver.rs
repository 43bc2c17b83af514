//! Registry driver trait and the cached registry handle

use arm_fs::PackageFile;

use crate::cache::ContentCache;
use crate::cloudsmith::CloudsmithDriver;
use crate::config::{RegistryConfig, RegistryKind};
use crate::error::{Error, Result};
use crate::filter::ContentSelector;
use crate::git::GitDriver;
use crate::gitlab::GitlabDriver;
use crate::version::{Constraint, Version, resolve};

/// Capabilities every registry backend provides.
///
/// Implementations talk to exactly one remote. They do not cache; the
/// [`Registry`] wrapper consults the [`ContentCache`] around `fetch`.
pub trait RegistryDriver: Send + Sync {
    /// Name of the registry in the manifest, used in error messages.
    fn name(&self) -> &str;

    /// Every version the remote currently offers for a package.
    ///
    /// Branch heads are always re-queried from the remote.
    fn list_versions(&self, package: &str) -> Result<Vec<Version>>;

    /// Resolve a constraint against the remote's current versions.
    fn resolve_version(&self, package: &str, constraint: &Constraint) -> Result<Version> {
        let versions = self.list_versions(package)?;
        resolve(constraint, &versions)
            .cloned()
            .ok_or_else(|| Error::NoVersionSatisfiesConstraint {
                registry: self.name().to_string(),
                package: package.to_string(),
                constraint: constraint.to_string(),
            })
    }

    /// Download the complete, unfiltered content of a version.
    fn fetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>>;

    /// Download a version and keep only the selected files.
    fn get_content(
        &self,
        package: &str,
        version: &Version,
        selector: &ContentSelector,
    ) -> Result<Vec<PackageFile>> {
        Ok(selector.apply(self.fetch(package, version)?))
    }
}

/// Create the driver for a configured registry.
pub fn open_driver(
    name: &str,
    config: &RegistryConfig,
    cache: &ContentCache,
) -> Result<Box<dyn RegistryDriver>> {
    config.validate(name)?;
    Ok(match config.kind {
        RegistryKind::Git => Box::new(GitDriver::new(name, config, cache.clone())?),
        RegistryKind::Gitlab => Box::new(GitlabDriver::new(name, config)?),
        RegistryKind::Cloudsmith => Box::new(CloudsmithDriver::new(name, config)?),
    })
}

/// A driver paired with the shared content cache.
pub struct Registry {
    key: String,
    address: String,
    driver: Box<dyn RegistryDriver>,
    cache: ContentCache,
}

impl Registry {
    /// Open a configured registry.
    pub fn open(name: &str, config: &RegistryConfig, cache: ContentCache) -> Result<Self> {
        let driver = open_driver(name, config, &cache)?;
        Ok(Self::with_driver(config.cache_key(), config.address(), driver, cache))
    }

    /// Wrap an existing driver.
    pub fn with_driver(
        key: impl Into<String>,
        address: impl Into<String>,
        driver: Box<dyn RegistryDriver>,
        cache: ContentCache,
    ) -> Self {
        Self {
            key: key.into(),
            address: address.into(),
            driver,
            cache,
        }
    }

    pub fn name(&self) -> &str {
        self.driver.name()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn list_versions(&self, package: &str) -> Result<Vec<Version>> {
        self.driver.list_versions(package)
    }

    pub fn resolve_version(&self, package: &str, constraint: &Constraint) -> Result<Version> {
        let version = self.driver.resolve_version(package, constraint)?;
        tracing::debug!(
            registry = self.name(),
            package,
            constraint = %constraint,
            version = %version.display,
            id = %version.id,
            "Resolved version"
        );
        Ok(version)
    }

    /// Unfiltered content of a version, served from the cache when present.
    ///
    /// Only the resolved id is used as the cache key, so a branch head is
    /// looked up after its tip has been resolved, never by branch name.
    pub fn fetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        if let Some(files) = self.cache.get(&self.key, package, &version.id)? {
            return Ok(files);
        }
        tracing::info!(
            registry = self.name(),
            package,
            version = %version.display,
            "Fetching package content"
        );
        let files = self.driver.fetch(package, version)?;
        self.cache.put(
            &self.key,
            &self.address,
            package,
            &version.id,
            &version.display,
            &files,
        )?;
        Ok(files)
    }

    /// Unfiltered content straight from the remote, replacing the cached
    /// copy.
    pub fn refetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        self.cache.remove(&self.key, package, &version.id)?;
        self.fetch(package, version)
    }

    /// Selected content of a version.
    pub fn get_content(
        &self,
        package: &str,
        version: &Version,
        selector: &ContentSelector,
    ) -> Result<Vec<PackageFile>> {
        Ok(selector.apply(self.fetch(package, version)?))
    }
}
