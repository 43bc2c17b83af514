//! Manifest editing verbs and their cascades onto installed content

use arm_registry::RegistryConfig;

use super::install::{Pin, Plan};
use super::report::{BatchReport, PackageStatus};
use super::{Arm, BatchOptions};
use crate::error::Result;
use crate::manifest::SinkConfig;
use crate::package::PackageKey;

impl Arm {
    pub fn add_registry(&self, name: &str, config: RegistryConfig, force: bool) -> Result<()> {
        self.manifest.update(|m| m.add_registry(name, config, force))?;
        tracing::info!(registry = name, "Added registry");
        Ok(())
    }

    /// Change a registry field. Installed content is not touched; the next
    /// update resolves against the new address.
    pub fn set_registry(&self, name: &str, field: &str, value: &str) -> Result<()> {
        let mut manifest = self.manifest.load()?;
        manifest.set_registry_field(name, field, value)?;
        self.manifest.save(&manifest)
    }

    pub fn add_sink(&self, name: &str, config: SinkConfig, force: bool) -> Result<()> {
        self.manifest.update(|m| m.add_sink(name, config, force))?;
        tracing::info!(sink = name, "Added sink");
        Ok(())
    }

    /// Change a sink field and move its installed packages to the new
    /// directory, layout or target at their locked versions.
    pub fn set_sink(&self, name: &str, field: &str, value: &str) -> Result<BatchReport> {
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;
        let mut next = manifest.clone();
        next.set_sink_field(name, field, value)?;

        let old = self.installer(&manifest, name)?;
        let installed = old.list_installed()?;
        let mut report = BatchReport::default();
        for installation in &installed {
            self.cancel.check()?;
            old.uninstall(&PackageKey::parse(&installation.package)?)?;
        }
        self.manifest.save(&next)?;

        let mut plans = Vec::new();
        for installation in installed {
            let key = PackageKey::parse(&installation.package)?;
            match (next.dependency(&key), lockfile.get(&key)) {
                (Ok(dependency), Some(entry)) => plans.push(Plan {
                    key,
                    dependency: dependency.clone(),
                    pin: Pin::Locked(entry.clone()),
                    force: true,
                    reselect: false,
                }),
                _ => report.push(installation.package, PackageStatus::Removed),
            }
        }
        self.run_batch(
            &next,
            &lockfile,
            lockfile.clone(),
            plans,
            BatchOptions::default(),
            &mut report,
        )?;
        Ok(report)
    }

    /// Change a dependency field and reinstall it under the new values.
    pub fn set_dependency(&self, key: &PackageKey, field: &str, value: &str) -> Result<BatchReport> {
        let lockfile = self.lockfile.load()?;
        let mut manifest = self.manifest.load()?;
        manifest.set_dependency_field(key, field, value)?;
        let dependency = manifest.dependency(key)?.clone();
        self.manifest.save(&manifest)?;

        let plan = Plan {
            key: key.clone(),
            pin: Pin::Resolve(dependency.constraint()?),
            dependency,
            force: true,
            reselect: matches!(field, "include" | "exclude"),
        };
        let mut report = BatchReport::default();
        self.run_batch(
            &manifest,
            &lockfile,
            lockfile.clone(),
            vec![plan],
            BatchOptions::default(),
            &mut report,
        )?;
        Ok(report)
    }
}
