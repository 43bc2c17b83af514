//! Outcome records returned by the orchestrator's verbs

use std::fmt;

use crate::error::Error;

/// What happened to one package during a verb.
#[derive(Debug)]
pub enum PackageStatus {
    /// Newly installed
    Installed { version: String },
    /// Moved from one resolved version to another
    Updated { from: String, to: String },
    /// Same version, but missing or drifted sink content was rewritten
    Repaired { version: String },
    /// Already installed and intact; nothing written
    Unchanged { version: String },
    Removed,
    /// Completed, then undone because a later package failed under fail-fast
    RolledBack,
    Failed(Error),
}

impl PackageStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { version } => write!(f, "installed {version}"),
            Self::Updated { from, to } => write!(f, "updated {from} -> {to}"),
            Self::Repaired { version } => write!(f, "repaired {version}"),
            Self::Unchanged { version } => write!(f, "up to date at {version}"),
            Self::Removed => f.write_str("removed"),
            Self::RolledBack => f.write_str("rolled back"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct PackageOutcome {
    pub package: String,
    pub status: PackageStatus,
}

/// Per-package results of a verb, plus any reconciliation performed first.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PackageOutcome>,
    /// `<sink>: <package>` entries removed because nothing locks them there
    pub reconciled: Vec<String>,
}

impl BatchReport {
    pub fn push(&mut self, package: impl Into<String>, status: PackageStatus) {
        self.outcomes.push(PackageOutcome {
            package: package.into(),
            status,
        });
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            PackageStatus::Failed(e) => Some((o.package.as_str(), e)),
            _ => None,
        })
    }

    pub fn status_of(&self, package: &str) -> Option<&PackageStatus> {
        self.outcomes
            .iter()
            .find(|o| o.package == package)
            .map(|o| &o.status)
    }

    pub(crate) fn mark_rolled_back(&mut self, package: &str) {
        if let Some(outcome) = self.outcomes.iter_mut().find(|o| o.package == package) {
            outcome.status = PackageStatus::RolledBack;
        }
    }

    /// The first failure as an error, consuming the report.
    pub fn into_result(self) -> Result<Self, Error> {
        if !self.has_failures() {
            return Ok(self);
        }
        let mut outcomes = self.outcomes;
        let index = outcomes
            .iter()
            .position(|o| o.status.is_failure())
            .unwrap_or_default();
        match outcomes.swap_remove(index).status {
            PackageStatus::Failed(e) => Err(e),
            _ => Err(Error::Internal("failure disappeared from report".into())),
        }
    }
}

/// Current, wanted and latest versions of one dependency.
#[derive(Debug)]
pub struct OutdatedEntry {
    pub package: String,
    pub constraint: String,
    /// Locked display version
    pub current: Option<String>,
    /// Resolution of the manifest constraint
    pub wanted: Option<String>,
    /// Resolution of `latest`
    pub latest: Option<String>,
    pub error: Option<Error>,
}

impl OutdatedEntry {
    pub fn is_outdated(&self) -> bool {
        self.error.is_none() && (self.current != self.wanted || self.wanted != self.latest)
    }
}

/// Result of `clean cache`.
#[derive(Debug, Default)]
pub struct CacheCleanReport {
    pub removed: Vec<arm_registry::CachedEntry>,
    pub nuked: bool,
}

/// Result of `clean sinks` for one sink.
#[derive(Debug)]
pub struct SinkCleanReport {
    pub sink: String,
    pub removed: Vec<String>,
}
