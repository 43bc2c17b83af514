//! update, upgrade and outdated

use arm_registry::Constraint;
use rayon::prelude::*;

use super::install::{Pin, Plan};
use super::report::{BatchReport, OutdatedEntry};
use super::{Arm, BatchOptions};
use crate::error::{Error, Result};
use crate::manifest::{DependencyConfig, Manifest};
use crate::package::PackageKey;

impl Arm {
    /// Re-resolve within each manifest constraint and reinstall what moved
    /// or drifted. `None` updates every dependency.
    pub fn update(&self, target: Option<&PackageKey>, options: BatchOptions) -> Result<BatchReport> {
        self.refresh(target, options, |dependency| dependency.constraint())
    }

    /// Like [`Arm::update`] but resolves `latest`. The manifest constraint
    /// is left as written.
    pub fn upgrade(&self, target: Option<&PackageKey>, options: BatchOptions) -> Result<BatchReport> {
        self.refresh(target, options, |_| Ok(Constraint::Latest))
    }

    fn refresh(
        &self,
        target: Option<&PackageKey>,
        options: BatchOptions,
        constraint: impl Fn(&DependencyConfig) -> Result<Constraint>,
    ) -> Result<BatchReport> {
        if !self.manifest.exists() {
            return Err(Error::NoConfiguration {
                path: self.manifest.path().to_path_buf(),
            });
        }
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;

        let selected: Vec<(PackageKey, &DependencyConfig)> = match target {
            Some(key) => vec![(key.clone(), manifest.dependency(key)?)],
            None => manifest
                .dependencies
                .iter()
                .map(|(name, dependency)| Ok((PackageKey::parse(name)?, dependency)))
                .collect::<Result<_>>()?,
        };
        let plans = selected
            .into_iter()
            .map(|(key, dependency)| {
                Ok(Plan {
                    key,
                    dependency: dependency.clone(),
                    pin: Pin::Resolve(constraint(dependency)?),
                    force: false,
                    reselect: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = BatchReport::default();
        let next = if target.is_none() {
            self.reconcile(&manifest, &lockfile, &mut report)?
        } else {
            lockfile.clone()
        };
        self.run_batch(&manifest, &lockfile, next, plans, options, &mut report)?;
        Ok(report)
    }

    /// Current, wanted and latest version of every dependency.
    ///
    /// Registry failures are recorded per entry rather than aborting.
    pub fn outdated(&self) -> Result<Vec<OutdatedEntry>> {
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;
        let keys = manifest.dependency_keys();

        Ok(keys
            .par_iter()
            .map(|key| {
                let current = lockfile.get(key).map(|entry| entry.display.clone());
                let constraint = manifest
                    .dependencies
                    .get(&key.to_string())
                    .map(|d| d.version.clone())
                    .unwrap_or_default();
                match self.wanted_and_latest(&manifest, key) {
                    Ok((wanted, latest)) => OutdatedEntry {
                        package: key.to_string(),
                        constraint,
                        current,
                        wanted: Some(wanted),
                        latest: Some(latest),
                        error: None,
                    },
                    Err(e) => OutdatedEntry {
                        package: key.to_string(),
                        constraint,
                        current,
                        wanted: None,
                        latest: None,
                        error: Some(e.for_package(key.to_string())),
                    },
                }
            })
            .collect())
    }

    fn wanted_and_latest(&self, manifest: &Manifest, key: &PackageKey) -> Result<(String, String)> {
        let dependency = manifest.dependency(key)?;
        let registry = self.registry(manifest, &key.registry)?;
        let wanted = registry.resolve_version(&key.name, &dependency.constraint()?)?;
        let latest = registry.resolve_version(&key.name, &Constraint::Latest)?;
        Ok((wanted.display, latest.display))
    }
}
