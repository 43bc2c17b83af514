//! Uninstall and the removal cascades

use super::report::{BatchReport, PackageOutcome, PackageStatus};
use super::Arm;
use crate::error::{Error, Result};
use crate::package::PackageKey;

impl Arm {
    /// Remove a package from every sink, then the lockfile, then the
    /// manifest. A package known to none of them is `NotFound`.
    pub fn uninstall(&self, key: &PackageKey) -> Result<PackageOutcome> {
        let mut manifest = self.manifest.load()?;
        let mut lockfile = self.lockfile.load()?;
        let name = key.to_string();

        let mut removed = false;
        for installer in self.installers(&manifest) {
            self.cancel.check()?;
            if installer.uninstall(key)?.is_some() {
                tracing::debug!(sink = installer.name(), package = %name, "Uninstalled");
                removed = true;
            }
        }
        if lockfile.remove(key).is_some() {
            self.lockfile.save(&lockfile)?;
            removed = true;
        }
        if manifest.dependencies.contains_key(&name) {
            manifest.remove_dependency(key)?;
            self.manifest.save(&manifest)?;
            removed = true;
        }
        if !removed {
            return Err(Error::not_found("package", name));
        }

        tracing::info!(package = %name, "Uninstalled package");
        Ok(PackageOutcome {
            package: name,
            status: PackageStatus::Removed,
        })
    }

    /// Uninstall every dependency in the manifest.
    pub fn uninstall_all(&self) -> Result<BatchReport> {
        let manifest = self.manifest.load()?;
        let mut report = BatchReport::default();
        for key in manifest.dependency_keys() {
            match self.uninstall(&key) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => report.push(key.to_string(), PackageStatus::Failed(e.for_package(key.to_string()))),
            }
        }
        Ok(report)
    }

    /// Uninstall every dependency of a registry, then drop the registry.
    pub fn remove_registry(&self, name: &str) -> Result<BatchReport> {
        let manifest = self.manifest.load()?;
        manifest.registry(name)?;

        let mut report = BatchReport::default();
        for key in manifest.dependencies_of_registry(name) {
            let outcome = self.uninstall(&key)?;
            report.outcomes.push(outcome);
        }
        self.manifest.update(|m| m.remove_registry(name).map(|_| ()))?;
        tracing::info!(registry = name, "Removed registry");
        Ok(report)
    }

    /// Uninstall everything from a sink and drop the sink from every
    /// dependency. A dependency left with no sink is removed entirely.
    pub fn remove_sink(&self, name: &str) -> Result<BatchReport> {
        let mut manifest = self.manifest.load()?;
        let installer = self.installer(&manifest, name)?;

        let mut report = BatchReport::default();
        for installation in installer.list_installed()? {
            self.cancel.check()?;
            let key = PackageKey::parse(&installation.package)?;
            installer.uninstall(&key)?;
            report.push(installation.package, PackageStatus::Removed);
        }

        manifest.remove_sink(name)?;
        let mut orphaned = Vec::new();
        for (package, dependency) in manifest.dependencies.iter_mut() {
            dependency.sinks.retain(|s| s != name);
            if dependency.sinks.is_empty() {
                orphaned.push(package.clone());
            }
        }
        let mut lockfile = self.lockfile.load()?;
        for package in &orphaned {
            let key = PackageKey::parse(package)?;
            manifest.remove_dependency(&key)?;
            lockfile.remove(&key);
            tracing::info!(package = %package, "Removed dependency left without sinks");
        }

        self.manifest.save(&manifest)?;
        if !orphaned.is_empty() {
            self.lockfile.save(&lockfile)?;
        }
        tracing::info!(sink = name, "Removed sink");
        Ok(report)
    }
}
