//! Per-sink reverse index: `<sink-dir>/arm-index.json`
//!
//! Records which files each installed package owns in the sink. The file is
//! removed once no packages remain.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use arm_fs::{NormalizedPath, io};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const INDEX_FILE: &str = "arm-index.json";
pub const INDEX_VERSION: u32 = 1;

fn default_version() -> u32 {
    INDEX_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Display version
    pub version: String,
    pub resolved_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Paths relative to the sink directory
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkIndex {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub packages: BTreeMap<String, IndexEntry>,
}

impl Default for SinkIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            packages: BTreeMap::new(),
        }
    }
}

impl SinkIndex {
    pub fn load(sink_dir: &Path) -> Result<Self> {
        let path = sink_dir.join(INDEX_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = io::read_text(&NormalizedPath::new(&path))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::invalid_config(format!("malformed sink index {}: {e}", path.display()))
        })
    }

    /// Write the index, or delete it when empty.
    pub fn save(&self, sink_dir: &Path) -> Result<()> {
        let path = sink_dir.join(INDEX_FILE);
        if self.packages.is_empty() {
            io::remove_file_if_exists(&path)?;
            return Ok(());
        }
        io::write_json(&NormalizedPath::new(&path), self)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.packages.get(key)
    }

    pub fn insert(&mut self, key: &str, entry: IndexEntry) -> Option<IndexEntry> {
        self.packages.insert(key.to_string(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        self.packages.remove(key)
    }

    /// Every file claimed by any package.
    pub fn claimed_files(&self) -> BTreeSet<String> {
        self.packages
            .values()
            .flat_map(|e| e.files.iter().cloned())
            .collect()
    }

    /// Which package claims a file, if any.
    pub fn owner_of(&self, file: &str) -> Option<&str> {
        self.packages
            .iter()
            .find(|(_, e)| e.files.iter().any(|f| f == file))
            .map(|(k, _)| k.as_str())
    }
}
