//! Install paths: single package, whole manifest, and the shared batch runner

use arm_fs::{PackageFile, compute_package_checksum};
use arm_meta::ResourceKind;
use arm_registry::{Constraint, ContentSelector};
use rayon::prelude::*;

use super::report::{BatchReport, PackageOutcome, PackageStatus};
use super::{Arm, BatchOptions};
use crate::error::{Error, Result};
use crate::lockfile::{LockEntry, Lockfile, ResolvedVersion};
use crate::manifest::{DependencyConfig, Manifest};
use crate::package::{PackageKey, PackageSpec};

/// Arguments of `install <reg>/<pkg>[@constraint]`.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub spec: PackageSpec,
    /// Defaults to the existing dependency's kind, else ruleset
    pub kind: Option<ResourceKind>,
    /// Defaults to the existing dependency's sinks
    pub sinks: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub priority: Option<i64>,
}

impl InstallRequest {
    pub fn new(spec: PackageSpec, sinks: Vec<String>) -> Self {
        Self {
            spec,
            kind: None,
            sinks,
            include: Vec::new(),
            exclude: Vec::new(),
            priority: None,
        }
    }
}

/// Which version a plan installs.
#[derive(Debug, Clone)]
pub(super) enum Pin {
    /// Exactly the locked id, verified against the locked checksum
    Locked(LockEntry),
    /// Whatever the constraint resolves to now
    Resolve(Constraint),
}

/// One package scheduled in a batch.
#[derive(Debug, Clone)]
pub(super) struct Plan {
    pub key: PackageKey,
    pub dependency: DependencyConfig,
    pub pin: Pin,
    /// Rewrite sinks even when their index already records this version
    pub force: bool,
    /// Include/exclude changed since the lock entry was written, so its
    /// checksum no longer describes the selected files
    pub reselect: bool,
}

/// Content fetched, filtered and checksummed, ready for the sinks.
pub(super) struct Prepared {
    pub key: PackageKey,
    pub dependency: DependencyConfig,
    pub version: ResolvedVersion,
    pub files: Vec<PackageFile>,
    pub checksum: String,
}

impl Arm {
    /// Install or re-install one package and record it in the manifest and
    /// lockfile.
    ///
    /// Nothing is written until the content has been fetched and filtered.
    /// If a sink then fails, the manifest, lockfile and sinks are put back.
    pub fn install(&self, request: &InstallRequest) -> Result<PackageOutcome> {
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;
        let key = &request.spec.key;
        let existing = manifest.dependencies.get(&key.to_string());

        let constraint = Constraint::parse(request.spec.constraint.as_deref().unwrap_or("latest"))?;
        let kind = request
            .kind
            .or(existing.map(|d| d.kind))
            .unwrap_or(ResourceKind::Ruleset);
        let sinks = if request.sinks.is_empty() {
            existing.map(|d| d.sinks.clone()).unwrap_or_default()
        } else {
            request.sinks.clone()
        };
        if sinks.is_empty() {
            return Err(Error::invalid_config(format!(
                "{key}: at least one sink is required"
            )));
        }

        let mut dependency = DependencyConfig::new(kind, &constraint, sinks);
        dependency.include = request.include.clone();
        dependency.exclude = request.exclude.clone();
        if kind == ResourceKind::Ruleset {
            dependency.priority = request.priority.or(existing.and_then(|d| d.priority));
        }
        if let Some(existing) = existing {
            dependency.extra = existing.extra.clone();
        }

        let mut next_manifest = manifest.clone();
        next_manifest.upsert_dependency(key, dependency.clone())?;

        let reselect = existing
            .is_some_and(|d| d.include != dependency.include || d.exclude != dependency.exclude);
        let plan = Plan {
            key: key.clone(),
            dependency,
            pin: Pin::Resolve(constraint),
            force: false,
            reselect,
        };
        let prepared = self.prepare(&next_manifest, &plan, lockfile.get(key))?;
        let status = self.status_for(lockfile.get(key), &prepared);

        let mut next_lock = lockfile.clone();
        next_lock.upsert(
            &next_manifest,
            key,
            LockEntry::new(&prepared.version, &prepared.checksum),
        )?;

        let lock_existed = self.lockfile.exists();
        self.manifest.save(&next_manifest)?;
        self.lockfile.save(&next_lock)?;

        // Changed filters, sinks or priority alter what lands on disk
        let force =
            matches!(status, PackageStatus::Updated { .. }) || existing != Some(&plan.dependency);
        let wrote = match self.apply(&next_manifest, &prepared, force) {
            Ok(wrote) => wrote,
            Err(e) => {
                tracing::warn!(package = %key, error = %e, "Install failed; restoring previous state");
                self.restore(&manifest, &lockfile, key);
                self.manifest.save(&manifest)?;
                if lock_existed {
                    self.lockfile.save(&lockfile)?;
                } else {
                    self.lockfile.remove()?;
                }
                return Err(e.for_package(key.to_string()));
            }
        };

        tracing::info!(package = %key, version = %prepared.version.display, "Installed");
        Ok(PackageOutcome {
            package: key.to_string(),
            status: settle(status, wrote),
        })
    }

    /// Install everything the manifest declares.
    ///
    /// Locked packages are installed at exactly their locked id and their
    /// content is verified against the lock checksum; packages without a
    /// lock entry, or whose lock no longer meets the manifest constraint,
    /// are resolved fresh.
    pub fn install_all(&self, options: BatchOptions) -> Result<BatchReport> {
        match (self.manifest.exists(), self.lockfile.exists()) {
            (false, false) => {
                return Err(Error::NoConfiguration {
                    path: self.manifest.path().to_path_buf(),
                });
            }
            (false, true) => {
                return Err(Error::ManifestMissing {
                    lockfile: self.lockfile.path().to_path_buf(),
                });
            }
            _ => {}
        }
        let manifest = self.manifest.load()?;
        let lockfile = self.lockfile.load()?;

        let plans = manifest
            .dependencies
            .iter()
            .map(|(name, dependency)| {
                let key = PackageKey::parse(name)?;
                let constraint = dependency.constraint()?;
                // An edited constraint the lock no longer meets is resolved again
                let pin = match lockfile.get(&key) {
                    Some(entry) if entry.satisfies(&constraint) => Pin::Locked(entry.clone()),
                    Some(entry) => {
                        tracing::info!(
                            package = %key,
                            locked = %entry.display,
                            constraint = %constraint,
                            "Locked version no longer meets the manifest constraint"
                        );
                        Pin::Resolve(constraint)
                    }
                    None => Pin::Resolve(constraint),
                };
                Ok(Plan {
                    key,
                    dependency: dependency.clone(),
                    pin,
                    force: false,
                    reselect: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = BatchReport::default();
        let start = self.reconcile(&manifest, &lockfile, &mut report)?;
        self.run_batch(&manifest, &lockfile, start, plans, options, &mut report)?;
        Ok(report)
    }

    /// Resolve or pin, fetch through the cache, filter and checksum.
    ///
    /// A resolved id is immutable, so content for the id in `previous` must
    /// match its checksum. A locked install fails on any difference; a fresh
    /// resolve first fetches the id again from the registry in case only the
    /// cached copy is damaged.
    pub(super) fn prepare(
        &self,
        manifest: &Manifest,
        plan: &Plan,
        previous: Option<&LockEntry>,
    ) -> Result<Prepared> {
        let key = &plan.key;
        let registry = self.registry(manifest, &key.registry)?;
        let version = match &plan.pin {
            Pin::Locked(entry) => entry.resolved().to_version(),
            Pin::Resolve(constraint) => registry.resolve_version(&key.name, constraint)?,
        };
        let selector = ContentSelector::new(&plan.dependency.include, &plan.dependency.exclude)?;
        self.cancel.check()?;
        let mut files = registry.get_content(&key.name, &version, &selector)?;
        let mut checksum = compute_package_checksum(&files);

        let expected = match &plan.pin {
            Pin::Locked(entry) => Some(entry),
            Pin::Resolve(_) if plan.reselect => None,
            Pin::Resolve(_) => previous.filter(|entry| entry.version == version.id),
        };
        if let Some(entry) = expected
            && entry.checksum != checksum
        {
            if matches!(plan.pin, Pin::Resolve(_)) {
                tracing::warn!(
                    package = %key,
                    version = %version.display,
                    "Cached content does not match the lockfile; fetching again"
                );
                self.cancel.check()?;
                files = selector.apply(registry.refetch(&key.name, &version)?);
                checksum = compute_package_checksum(&files);
            }
            if entry.checksum != checksum {
                return Err(Error::ChecksumMismatch {
                    package: key.to_string(),
                    expected: entry.checksum.clone(),
                    actual: checksum,
                });
            }
        }

        Ok(Prepared {
            key: key.clone(),
            dependency: plan.dependency.clone(),
            version: ResolvedVersion::from(&version),
            files,
            checksum,
        })
    }

    /// Write prepared content into every sink the dependency names and
    /// drop it from every other sink. Returns whether anything changed.
    pub(super) fn apply(&self, manifest: &Manifest, prepared: &Prepared, force: bool) -> Result<bool> {
        let key = &prepared.key;
        let dependency = &prepared.dependency;
        let (targets, others): (Vec<_>, Vec<_>) = self
            .installers(manifest)
            .into_iter()
            .partition(|installer| dependency.sinks.iter().any(|s| s == installer.name()));
        for sink in &dependency.sinks {
            manifest.sink(sink)?;
        }

        let written = targets
            .par_iter()
            .map(|installer| -> Result<bool> {
                self.cancel.check()?;
                if !force && installer.is_current(key, &prepared.version)? {
                    return Ok(false);
                }
                installer.install(
                    key,
                    dependency.kind,
                    &prepared.version,
                    &prepared.files,
                    dependency.effective_priority(),
                )?;
                Ok(true)
            })
            .collect::<Result<Vec<bool>>>()?;

        let mut changed = written.contains(&true);
        for installer in &others {
            if installer.uninstall(key)?.is_some() {
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Prepare in parallel, then install package by package.
    ///
    /// `lockfile` is the document before the batch and is what fail-fast
    /// restores; `next` is what gets written on completion.
    pub(super) fn run_batch(
        &self,
        manifest: &Manifest,
        lockfile: &Lockfile,
        mut next: Lockfile,
        plans: Vec<Plan>,
        options: BatchOptions,
        report: &mut BatchReport,
    ) -> Result<()> {
        let prepared: Vec<(Plan, Result<Prepared>)> = plans
            .into_par_iter()
            .map(|plan| {
                let result = self.prepare(manifest, &plan, lockfile.get(&plan.key));
                (plan, result)
            })
            .collect();

        let mut completed: Vec<PackageKey> = Vec::new();
        for (plan, result) in prepared {
            if self.cancel.is_cancelled() {
                self.save_lockfile(lockfile, &next)?;
                return Err(Error::Cancelled);
            }
            let key = plan.key;
            let outcome = result.and_then(|prepared| {
                let status = self.status_for(lockfile.get(&key), &prepared);
                let force = plan.force || matches!(status, PackageStatus::Updated { .. });
                let wrote = self.apply(manifest, &prepared, force)?;
                next.upsert(
                    manifest,
                    &key,
                    LockEntry::new(&prepared.version, &prepared.checksum),
                )?;
                Ok(settle(status, wrote))
            });

            match outcome {
                Ok(status) => {
                    tracing::info!(package = %key, status = %status, "Package done");
                    completed.push(key.clone());
                    report.push(key.to_string(), status);
                }
                Err(e) => {
                    tracing::warn!(package = %key, error = %e, "Package failed");
                    report.push(key.to_string(), PackageStatus::Failed(e.for_package(key.to_string())));
                    if options.fail_fast {
                        for done in completed.iter().rev() {
                            self.restore(manifest, lockfile, done);
                            report.mark_rolled_back(&done.to_string());
                        }
                        // The lockfile is only written once the batch completes
                        return Ok(());
                    }
                }
            }
        }

        self.save_lockfile(lockfile, &next)
    }

    /// Put one package back to its pre-batch state: the locked version if
    /// there was one, otherwise absent from every sink. Best effort.
    pub(super) fn restore(&self, manifest: &Manifest, lockfile: &Lockfile, key: &PackageKey) {
        let locked = lockfile
            .get(key)
            .zip(manifest.dependencies.get(&key.to_string()));
        let result = match locked {
            Some((entry, dependency)) => {
                let plan = Plan {
                    key: key.clone(),
                    dependency: dependency.clone(),
                    pin: Pin::Locked(entry.clone()),
                    force: true,
                    reselect: false,
                };
                self.prepare(manifest, &plan, Some(entry))
                    .and_then(|prepared| self.apply(manifest, &prepared, true))
                    .map(|_| ())
            }
            None => self
                .installers(manifest)
                .iter()
                .try_for_each(|installer| installer.uninstall(key).map(|_| ())),
        };
        if let Err(e) = result {
            tracing::warn!(package = %key, error = %e, "Could not restore previous installation");
        }
    }

    /// Remove sink installations nothing locks there any more.
    pub(super) fn reconcile(
        &self,
        manifest: &Manifest,
        lockfile: &Lockfile,
        report: &mut BatchReport,
    ) -> Result<Lockfile> {
        let mut next = lockfile.clone();
        for orphan in lockfile.orphans(manifest) {
            tracing::info!(package = %orphan, "Dropping lock entry with no manifest dependency");
            next.dependencies.remove(&orphan);
        }

        for installer in self.installers(manifest) {
            for installation in installer.list_installed()? {
                let wanted = manifest
                    .dependencies
                    .get(&installation.package)
                    .is_some_and(|d| d.sinks.iter().any(|s| s == installer.name()));
                if wanted {
                    continue;
                }
                let key = PackageKey::parse(&installation.package)?;
                installer.uninstall(&key)?;
                tracing::info!(sink = installer.name(), package = %key, "Removed unlocked installation");
                report
                    .reconciled
                    .push(format!("{}: {}", installer.name(), installation.package));
            }
        }
        Ok(next)
    }

    fn status_for(&self, previous: Option<&LockEntry>, prepared: &Prepared) -> PackageStatus {
        match previous {
            None => PackageStatus::Installed {
                version: prepared.version.display.clone(),
            },
            Some(entry) if entry.version != prepared.version.id => PackageStatus::Updated {
                from: entry.display.clone(),
                to: prepared.version.display.clone(),
            },
            Some(_) => PackageStatus::Unchanged {
                version: prepared.version.display.clone(),
            },
        }
    }

    /// Write the lockfile unless nothing changed. An empty lockfile is not
    /// created.
    fn save_lockfile(&self, before: &Lockfile, next: &Lockfile) -> Result<()> {
        if before == next && (self.lockfile.exists() || next.dependencies.is_empty()) {
            return Ok(());
        }
        self.lockfile.save(next)
    }
}

/// An unchanged package whose sinks had to be rewritten was repaired.
fn settle(status: PackageStatus, wrote: bool) -> PackageStatus {
    match status {
        PackageStatus::Unchanged { version } if wrote => PackageStatus::Repaired { version },
        other => other,
    }
}
