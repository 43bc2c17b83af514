//! In-memory package files

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result, io, validate_relative_path};

/// A byte-exact artifact of a package, addressed relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    /// Path relative to the package root, forward-slash separated
    pub path: NormalizedPath,
    /// Raw file content
    pub content: Vec<u8>,
}

impl PackageFile {
    /// Create a new package file.
    pub fn new(path: impl Into<NormalizedPath>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Content decoded as UTF-8, if valid.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Sort files into canonical (lexicographic by path) order.
pub fn sort_canonical(files: &mut [PackageFile]) {
    files.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
}

/// Read every regular file under `root` into memory.
///
/// Paths are recorded relative to `root`. The result is in canonical order.
pub fn read_tree(root: &Path) -> Result<Vec<PackageFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            Error::io(path, std::io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::io(entry.path(), std::io::Error::other(e.to_string())))?;
        let content = fs::read(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
        files.push(PackageFile::new(NormalizedPath::new(relative), content));
    }
    sort_canonical(&mut files);
    Ok(files)
}

/// Write files beneath `root`, creating parent directories as needed.
///
/// Every path is validated so that nothing can be written outside `root`.
pub fn write_tree(root: &Path, files: &[PackageFile]) -> Result<()> {
    for file in files {
        validate_relative_path(file.path.as_str())?;
        let target = NormalizedPath::new(root).join(file.path.as_str());
        io::write_plain(&target, &file.content)?;
    }
    Ok(())
}
