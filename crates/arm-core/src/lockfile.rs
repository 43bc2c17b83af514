//! The lockfile: exact resolved versions and content checksums
//!
//! Lives next to the manifest with `-lock` inserted before the extension
//! (`arm.json` → `arm-lock.json`). A missing lockfile reads as empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arm_fs::{NormalizedPath, io, is_valid_checksum};
use arm_registry::{Constraint, Version, parse_tag};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::package::PackageKey;

pub const LOCKFILE_VERSION: u32 = 1;

fn default_version() -> u32 {
    LOCKFILE_VERSION
}

/// A resolved version reduced to what the lockfile and sink index record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub id: String,
    pub display: String,
}

impl ResolvedVersion {
    /// Rebuild a registry version for fetching by id.
    ///
    /// Displays that parse as semver become tagged versions; anything else
    /// was a branch head.
    pub fn to_version(&self) -> Version {
        match parse_tag(&self.display) {
            Some(semver) => {
                let mut version = Version::tagged(self.id.clone(), semver);
                version.display = self.display.clone();
                version
            }
            None => Version::branch_head(self.id.clone(), self.display.clone(), false),
        }
    }
}

impl From<&Version> for ResolvedVersion {
    fn from(version: &Version) -> Self {
        Self {
            id: version.id.clone(),
            display: version.display.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Opaque resolved id
    pub version: String,
    pub display: String,
    pub checksum: String,
}

impl LockEntry {
    pub fn new(version: &ResolvedVersion, checksum: impl Into<String>) -> Self {
        Self {
            version: version.id.clone(),
            display: version.display.clone(),
            checksum: checksum.into(),
        }
    }

    pub fn resolved(&self) -> ResolvedVersion {
        ResolvedVersion {
            id: self.version.clone(),
            display: self.display.clone(),
        }
    }

    /// Whether the locked version still meets a manifest constraint.
    pub fn satisfies(&self, constraint: &Constraint) -> bool {
        let version = self.resolved().to_version();
        match constraint {
            // `latest` locks the default branch head while nothing is tagged
            Constraint::Latest if !version.is_tagged() => true,
            _ => constraint.matches(&version),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub dependencies: BTreeMap<String, LockEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: LOCKFILE_VERSION,
            dependencies: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl Lockfile {
    pub fn get(&self, key: &PackageKey) -> Option<&LockEntry> {
        self.dependencies.get(&key.to_string())
    }

    /// Record a resolved package. Refused when the manifest has no entry
    /// for it.
    pub fn upsert(&mut self, manifest: &Manifest, key: &PackageKey, entry: LockEntry) -> Result<()> {
        manifest.dependency(key)?;
        if !is_valid_checksum(&entry.checksum) {
            return Err(Error::Internal(format!(
                "refusing to lock {key} with malformed checksum '{}'",
                entry.checksum
            )));
        }
        self.dependencies.insert(key.to_string(), entry);
        Ok(())
    }

    pub fn remove(&mut self, key: &PackageKey) -> Option<LockEntry> {
        self.dependencies.remove(&key.to_string())
    }

    /// Entries with no manifest counterpart.
    pub fn orphans(&self, manifest: &Manifest) -> Vec<String> {
        self.dependencies
            .keys()
            .filter(|k| !manifest.dependencies.contains_key(*k))
            .cloned()
            .collect()
    }
}

/// `<stem>-lock<.ext>` next to the manifest.
pub fn lockfile_path(manifest_path: &Path) -> PathBuf {
    let stem = manifest_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "arm".to_string());
    let name = match manifest_path.extension() {
        Some(ext) => format!("{stem}-lock.{}", ext.to_string_lossy()),
        None => format!("{stem}-lock"),
    };
    manifest_path.with_file_name(name)
}

#[derive(Debug, Clone)]
pub struct LockfileStore {
    path: PathBuf,
}

impl LockfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_manifest(manifest_path: &Path) -> Self {
        Self::new(lockfile_path(manifest_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<Lockfile> {
        if !self.exists() {
            return Ok(Lockfile::default());
        }
        let content = io::read_text(&NormalizedPath::new(&self.path))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::invalid_config(format!("malformed lockfile {}: {e}", self.path.display()))
        })
    }

    pub fn save(&self, lockfile: &Lockfile) -> Result<()> {
        io::write_json(&NormalizedPath::new(&self.path), lockfile)?;
        tracing::debug!(path = %self.path.display(), "Wrote lockfile");
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        io::remove_file_if_exists(&self.path)?;
        Ok(())
    }
}
