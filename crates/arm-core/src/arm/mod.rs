//! The package manager service
//!
//! [`Arm`] ties the manifest, lockfile, content cache, registries and sinks
//! together. Every CLI verb is one method here; the CLI only parses and
//! prints.

mod clean;
mod config;
mod install;
mod query;
mod remove;
mod report;
mod update;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arm_registry::{ContentCache, Registry, RegistryConfig, RegistryDriver, open_driver};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::lockfile::LockfileStore;
use crate::manifest::{Manifest, ManifestStore};
use crate::sink::SinkInstaller;

pub use install::InstallRequest;
pub use query::DependencyStatus;
pub use report::{
    BatchReport, CacheCleanReport, OutdatedEntry, PackageOutcome, PackageStatus, SinkCleanReport,
};

/// Environment variable overriding the cache root
pub const CACHE_ENV: &str = "ARM_CACHE_DIR";

/// Opens registry drivers from manifest entries.
///
/// The default opens the real git/gitlab/cloudsmith backends; tests swap in
/// in-memory registries.
pub trait RegistryFactory: Send + Sync {
    fn open(
        &self,
        name: &str,
        config: &RegistryConfig,
        cache: &ContentCache,
    ) -> arm_registry::Result<Box<dyn RegistryDriver>>;
}

/// Factory for the built-in registry backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteRegistries;

impl RegistryFactory for RemoteRegistries {
    fn open(
        &self,
        name: &str,
        config: &RegistryConfig,
        cache: &ContentCache,
    ) -> arm_registry::Result<Box<dyn RegistryDriver>> {
        open_driver(name, config, cache)
    }
}

/// Options shared by the batch verbs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Stop at the first failing package and roll back the ones completed
    pub fail_fast: bool,
}

/// Default cache location: `$ARM_CACHE_DIR`, else `~/.arm/cache`.
pub fn default_cache_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".arm").join("cache"))
        .ok_or_else(|| Error::invalid_config(format!("cannot locate a home directory; set {CACHE_ENV}")))
}

pub struct Arm {
    manifest: ManifestStore,
    lockfile: LockfileStore,
    project_root: PathBuf,
    cache: ContentCache,
    factory: Arc<dyn RegistryFactory>,
    cancel: CancelToken,
}

impl Arm {
    /// Service for an explicit manifest path and cache root.
    pub fn new(manifest_path: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        let manifest = ManifestStore::new(manifest_path);
        Self::from_store(manifest, ContentCache::new(cache_root))
    }

    /// Service for a project directory, honoring `ARM_MANIFEST_PATH` and
    /// `ARM_CACHE_DIR`.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let manifest = ManifestStore::discover(project_dir);
        Ok(Self::from_store(
            manifest,
            ContentCache::new(default_cache_root()?),
        ))
    }

    fn from_store(manifest: ManifestStore, cache: ContentCache) -> Self {
        Self {
            lockfile: LockfileStore::for_manifest(manifest.path()),
            project_root: manifest.project_root(),
            manifest,
            cache,
            factory: Arc::new(RemoteRegistries),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_registry_factory(mut self, factory: Arc<dyn RegistryFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn manifest_store(&self) -> &ManifestStore {
        &self.manifest
    }

    pub fn lockfile_store(&self) -> &LockfileStore {
        &self.lockfile
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn registry(&self, manifest: &Manifest, name: &str) -> Result<Registry> {
        self.cancel.check()?;
        let config = manifest.registry(name)?;
        let driver = self.factory.open(name, config, &self.cache)?;
        Ok(Registry::with_driver(
            config.cache_key(),
            config.address(),
            driver,
            self.cache.clone(),
        ))
    }

    fn installer(&self, manifest: &Manifest, sink: &str) -> Result<SinkInstaller> {
        Ok(SinkInstaller::new(
            sink,
            manifest.sink(sink)?,
            &self.project_root,
        ))
    }

    fn installers(&self, manifest: &Manifest) -> Vec<SinkInstaller> {
        manifest
            .sinks
            .iter()
            .map(|(name, config)| SinkInstaller::new(name, config, &self.project_root))
            .collect()
    }
}
