//! Content-addressed cache of fetched package content
//!
//! Layout under the cache root:
//!
//! ```text
//! registries/
//!   .locks/<registry-key>.lock
//!   <registry-key>/
//!     .repo/                      git mirror (git registries only)
//!     <package>/<resolved-id>/
//!       index.json
//!       files/<relative paths>
//! ```
//!
//! Writers hold the per-registry lock. Entries are assembled in a hidden
//! sibling directory and renamed into place, so an entry whose `index.json`
//! exists is complete and readers never need the lock.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use arm_fs::file::{read_tree, write_tree};
use arm_fs::{NormalizedPath, PackageFile, io};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const REGISTRIES_DIR: &str = "registries";
const LOCKS_DIR: &str = ".locks";
const MIRROR_DIR: &str = ".repo";
const INDEX_FILE: &str = "index.json";
const FILES_DIR: &str = "files";

/// Metadata stored next to every cached version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryIndex {
    /// Registry address the content came from
    pub registry: String,
    pub package: String,
    pub resolved_id: String,
    pub display: String,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

/// A cached version found on disk.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub key: String,
    pub path: PathBuf,
    pub index: EntryIndex,
}

/// Exclusive per-registry lock, released on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[derive(Debug, Clone)]
pub struct ContentCache {
    root: PathBuf,
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn registries_dir(&self) -> PathBuf {
        self.root.join(REGISTRIES_DIR)
    }

    pub fn registry_dir(&self, key: &str) -> PathBuf {
        self.registries_dir().join(key)
    }

    /// Directory holding the bare git mirror of a git registry.
    pub fn mirror_dir(&self, key: &str) -> PathBuf {
        self.registry_dir(key).join(MIRROR_DIR)
    }

    pub fn entry_dir(&self, key: &str, package: &str, resolved_id: &str) -> PathBuf {
        self.registry_dir(key)
            .join(path_segment(package))
            .join(path_segment(resolved_id))
    }

    /// Take the exclusive writer lock for one registry. Blocks until free.
    pub fn lock(&self, key: &str) -> Result<CacheLock> {
        let dir = self.registries_dir().join(LOCKS_DIR);
        fs::create_dir_all(&dir).map_err(|e| arm_fs::Error::io(&dir, e))?;
        let path = dir.join(format!("{key}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| arm_fs::Error::io(&path, e))?;
        file.lock_exclusive()
            .map_err(|_| Error::CacheLock { path: path.clone() })?;
        tracing::debug!(lock = %path.display(), "Acquired cache lock");
        Ok(CacheLock { file, path })
    }

    /// Whether a complete entry exists.
    pub fn contains(&self, key: &str, package: &str, resolved_id: &str) -> bool {
        self.entry_dir(key, package, resolved_id)
            .join(INDEX_FILE)
            .is_file()
    }

    /// Read a cached version, updating its last-access time.
    ///
    /// Entries that cannot be read are deleted and reported as a miss.
    pub fn get(&self, key: &str, package: &str, resolved_id: &str) -> Result<Option<Vec<PackageFile>>> {
        let dir = self.entry_dir(key, package, resolved_id);
        if !dir.exists() {
            return Ok(None);
        }

        let index_path = NormalizedPath::new(dir.join(INDEX_FILE));
        let mut index: EntryIndex = match io::read_json(&index_path) {
            Ok(index) => index,
            Err(e) => {
                self.discard_corrupt(&dir, &e.to_string())?;
                return Ok(None);
            }
        };

        let files = match read_tree(&dir.join(FILES_DIR)) {
            Ok(files) => files,
            Err(e) => {
                self.discard_corrupt(&dir, &e.to_string())?;
                return Ok(None);
            }
        };

        index.last_access = index.last_access.max(Utc::now());
        if let Err(e) = io::write_json(&index_path, &index) {
            tracing::warn!(entry = %dir.display(), error = %e, "Failed to update cache access time");
        }

        tracing::debug!(package, resolved_id, files = files.len(), "Cache hit");
        Ok(Some(files))
    }

    /// Store a version's files, replacing any existing entry.
    pub fn put(
        &self,
        key: &str,
        registry: &str,
        package: &str,
        resolved_id: &str,
        display: &str,
        files: &[PackageFile],
    ) -> Result<()> {
        let _lock = self.lock(key)?;

        let dir = self.entry_dir(key, package, resolved_id);
        let parent = dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.registry_dir(key));
        fs::create_dir_all(&parent).map_err(|e| arm_fs::Error::io(&parent, e))?;

        let staging = parent.join(format!(
            ".{}.staging-{}",
            path_segment(resolved_id),
            uuid::Uuid::new_v4()
        ));

        let result = (|| -> Result<()> {
            let files_dir = staging.join(FILES_DIR);
            fs::create_dir_all(&files_dir).map_err(|e| arm_fs::Error::io(&files_dir, e))?;
            write_tree(&files_dir, files)?;

            let now = Utc::now();
            let index = EntryIndex {
                registry: registry.to_string(),
                package: package.to_string(),
                resolved_id: resolved_id.to_string(),
                display: display.to_string(),
                created_at: now,
                last_access: now,
            };
            io::write_json(&NormalizedPath::new(staging.join(INDEX_FILE)), &index)?;

            io::remove_dir_all_if_exists(&dir)?;
            fs::rename(&staging, &dir).map_err(|e| arm_fs::Error::io(&dir, e))?;
            Ok(())
        })();

        if result.is_err() {
            let _ = io::remove_dir_all_if_exists(&staging);
        } else {
            tracing::info!(package, resolved_id, files = files.len(), "Cached package content");
        }
        result
    }

    /// Every readable entry in the cache.
    pub fn entries(&self) -> Result<Vec<CachedEntry>> {
        let mut entries = Vec::new();
        for key_dir in visible_subdirs(&self.registries_dir())? {
            let key = dir_name(&key_dir);
            for package_dir in visible_subdirs(&key_dir)? {
                for entry_dir in visible_subdirs(&package_dir)? {
                    let index_path = NormalizedPath::new(entry_dir.join(INDEX_FILE));
                    match io::read_json::<EntryIndex>(&index_path) {
                        Ok(index) => entries.push(CachedEntry {
                            key: key.clone(),
                            path: entry_dir,
                            index,
                        }),
                        Err(e) => self.discard_corrupt(&entry_dir, &e.to_string())?,
                    }
                }
            }
        }
        Ok(entries)
    }

    /// Remove entries not accessed within `max_age`.
    pub fn clean(&self, max_age: chrono::Duration) -> Result<Vec<CachedEntry>> {
        self.clean_older_than(Utc::now() - max_age)
    }

    /// Remove entries whose last access is before `cutoff`.
    pub fn clean_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<CachedEntry>> {
        let mut removed = Vec::new();
        for entry in self.entries()? {
            if entry.index.last_access >= cutoff {
                continue;
            }
            let _lock = self.lock(&entry.key)?;
            io::remove_dir_all_if_exists(&entry.path)?;
            if let Some(package_dir) = entry.path.parent() {
                io::prune_empty_ancestors(package_dir, &self.registry_dir(&entry.key))?;
            }
            tracing::info!(
                package = %entry.index.package,
                version = %entry.index.display,
                "Removed stale cache entry"
            );
            removed.push(entry);
        }
        Ok(removed)
    }

    /// Overwrite an entry's last-access time.
    pub fn set_last_access(
        &self,
        key: &str,
        package: &str,
        resolved_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let path = NormalizedPath::new(self.entry_dir(key, package, resolved_id).join(INDEX_FILE));
        let mut index: EntryIndex = io::read_json(&path)?;
        index.last_access = at;
        io::write_json(&path, &index)?;
        Ok(())
    }

    /// Drop one entry. Returns whether it existed.
    pub fn remove(&self, key: &str, package: &str, resolved_id: &str) -> Result<bool> {
        let dir = self.entry_dir(key, package, resolved_id);
        if !dir.exists() {
            return Ok(false);
        }
        let _lock = self.lock(key)?;
        io::remove_dir_all_if_exists(&dir)?;
        tracing::info!(package, resolved_id, "Evicted cache entry");
        Ok(true)
    }

    /// Delete the whole cache.
    pub fn nuke(&self) -> Result<()> {
        io::remove_dir_all_if_exists(&self.root)?;
        tracing::info!(root = %self.root.display(), "Removed cache");
        Ok(())
    }

    fn discard_corrupt(&self, dir: &Path, reason: &str) -> Result<()> {
        tracing::warn!(entry = %dir.display(), reason, "Discarding corrupt cache entry");
        io::remove_dir_all_if_exists(dir)?;
        Ok(())
    }
}

/// Map a package name or id to a single safe directory name.
fn path_segment(value: &str) -> String {
    let mapped: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if mapped.is_empty() || mapped.starts_with('.') {
        format!("_{mapped}")
    } else {
        mapped
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Subdirectories not starting with `.` (locks, mirrors and staging dirs).
fn visible_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(arm_fs::Error::io(dir, e).into()),
    };
    let mut dirs: Vec<PathBuf> = read
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn files() -> Vec<PackageFile> {
        vec![
            PackageFile::new("a.yml", "A"),
            PackageFile::new("nested/b.yml", "B"),
        ]
    }

    #[test]
    fn put_then_get_returns_same_files() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        cache.put("k1", "https://r", "pkg", "abc", "1.0.0", &files()).unwrap();

        assert!(cache.contains("k1", "pkg", "abc"));
        let got = cache.get("k1", "pkg", "abc").unwrap().unwrap();
        assert_eq!(got, files());
    }

    #[test]
    fn miss_returns_none() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        assert!(cache.get("k1", "pkg", "nope").unwrap().is_none());
    }

    #[test]
    fn corrupt_index_is_discarded() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        cache.put("k1", "r", "pkg", "abc", "1.0.0", &files()).unwrap();
        let dir = cache.entry_dir("k1", "pkg", "abc");
        fs::write(dir.join(INDEX_FILE), "{ not json").unwrap();

        assert!(cache.get("k1", "pkg", "abc").unwrap().is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn access_time_never_moves_backwards() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        cache.put("k1", "r", "pkg", "abc", "1.0.0", &files()).unwrap();
        let future = Utc::now() + chrono::Duration::days(1);
        cache.set_last_access("k1", "pkg", "abc", future).unwrap();

        cache.get("k1", "pkg", "abc").unwrap();
        let entry = cache.entries().unwrap().pop().unwrap();
        assert_eq!(entry.index.last_access, future);
    }

    #[test]
    fn clean_removes_only_stale_entries() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        let now = Utc::now();
        for (id, days) in [("old", 30), ("mid", 3), ("new", 1)] {
            cache.put("k1", "r", "pkg", id, id, &files()).unwrap();
            cache
                .set_last_access("k1", "pkg", id, now - chrono::Duration::days(days))
                .unwrap();
        }

        let removed = cache.clean(chrono::Duration::days(7)).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].index.resolved_id, "old");
        assert!(cache.contains("k1", "pkg", "mid"));
        assert!(cache.contains("k1", "pkg", "new"));
    }

    #[test]
    fn entries_skip_hidden_dirs() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        cache.put("k1", "r", "pkg", "abc", "1.0.0", &files()).unwrap();
        fs::create_dir_all(cache.mirror_dir("k1").join("objects")).unwrap();

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "k1");
    }

    #[test]
    fn package_names_map_to_one_segment() {
        assert_eq!(path_segment("team/rules"), "team_rules");
        assert_eq!(path_segment(".."), "_..");
        assert_eq!(path_segment(""), "_");
    }

    #[test]
    fn remove_drops_one_entry() {
        let temp = TempDir::new().unwrap();
        let cache = ContentCache::new(temp.path());
        cache.put("k1", "r", "pkg", "abc", "1.0.0", &files()).unwrap();
        cache.put("k1", "r", "pkg", "def", "1.1.0", &files()).unwrap();

        assert!(cache.remove("k1", "pkg", "abc").unwrap());
        assert!(!cache.remove("k1", "pkg", "abc").unwrap());
        assert!(!cache.contains("k1", "pkg", "abc"));
        assert!(cache.contains("k1", "pkg", "def"));
    }

    #[test]
    fn nuke_removes_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        let cache = ContentCache::new(&root);
        cache.put("k1", "r", "pkg", "abc", "1.0.0", &files()).unwrap();
        cache.nuke().unwrap();
        assert!(!root.exists());
    }
}
