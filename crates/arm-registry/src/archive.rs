//! Downloaded package artifacts
//!
//! GitLab generic packages and Cloudsmith raw packages are either a single
//! file or a gzipped tarball. Tarballs are unpacked in memory; every entry
//! path is validated before it can reach the cache.

use std::io::Read;

use arm_fs::file::sort_canonical;
use arm_fs::{PackageFile, compute_content_checksum, validate_relative_path};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Error, Result};

/// Whether a file name denotes a gzipped tarball.
pub fn is_tarball(file_name: &str) -> bool {
    file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz")
}

/// Turn one downloaded artifact into package files.
pub fn unpack_artifact(package: &str, file_name: &str, bytes: Vec<u8>) -> Result<Vec<PackageFile>> {
    if is_tarball(file_name) {
        return extract_tar_gz(package, &bytes);
    }
    validate_relative_path(file_name).map_err(|e| Error::InvalidArchive {
        package: package.to_string(),
        message: e.to_string(),
    })?;
    Ok(vec![PackageFile::new(file_name, bytes)])
}

/// Extract a `.tar.gz` into memory.
///
/// Directory entries are skipped. When every file shares a single top-level
/// directory (as with `package/...` tarballs) that directory is stripped.
pub fn extract_tar_gz(package: &str, bytes: &[u8]) -> Result<Vec<PackageFile>> {
    let invalid = |message: String| Error::InvalidArchive {
        package: package.to_string(),
        message,
    };

    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut files = Vec::new();
    for entry in archive
        .entries()
        .map_err(|e| invalid(format!("invalid tarball: {e}")))?
    {
        let mut entry = entry.map_err(|e| invalid(format!("invalid tarball entry: {e}")))?;
        let kind = entry.header().entry_type();
        if kind.is_dir() {
            continue;
        }
        if !kind.is_file() {
            tracing::debug!(package, "Skipping non-regular tarball entry");
            continue;
        }
        let raw_path = entry
            .path()
            .map_err(|e| invalid(format!("invalid entry path: {e}")))?
            .to_string_lossy()
            .into_owned();
        let path = raw_path.trim_start_matches("./").to_string();
        validate_relative_path(&path).map_err(|e| invalid(e.to_string()))?;

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| invalid(format!("failed to read {path}: {e}")))?;
        files.push(PackageFile::new(path, content));
    }

    let mut files = strip_common_root(files);
    sort_canonical(&mut files);
    Ok(files)
}

fn strip_common_root(files: Vec<PackageFile>) -> Vec<PackageFile> {
    let root = match files.first().and_then(|f| f.path.as_str().split_once('/')) {
        Some((root, _)) => root.to_string(),
        None => return files,
    };
    let prefix = format!("{root}/");
    if !files.iter().all(|f| f.path.as_str().starts_with(&prefix)) {
        return files;
    }
    files
        .into_iter()
        .map(|f| {
            let stripped = f.path.as_str()[prefix.len()..].to_string();
            PackageFile::new(stripped, f.content)
        })
        .collect()
}

/// Compare downloaded bytes with a published hex SHA-256, when one exists.
pub fn verify_sha256(package: &str, bytes: &[u8], expected_hex: Option<&str>) -> Result<()> {
    let Some(expected) = expected_hex.filter(|h| !h.is_empty()) else {
        return Ok(());
    };
    let actual = compute_content_checksum(bytes);
    if actual.strip_prefix("sha256:") == Some(&expected.to_ascii_lowercase()) {
        Ok(())
    } else {
        Err(Error::DownloadChecksum {
            package: package.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use pretty_assertions::assert_eq;

    fn tarball(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn extracts_and_strips_shared_root() {
        let bytes = tarball(&[("package/b.yml", "B"), ("package/rules/a.yml", "A")]);
        let files = extract_tar_gz("pkg", &bytes).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["b.yml", "rules/a.yml"]);
        assert_eq!(files[1].content, b"A");
    }

    #[test]
    fn keeps_mixed_roots() {
        let bytes = tarball(&[("a/x.yml", "1"), ("b/y.yml", "2")]);
        let files = extract_tar_gz("pkg", &bytes).unwrap();
        assert_eq!(files[0].path.as_str(), "a/x.yml");
    }

    #[test]
    fn single_file_artifact() {
        let files = unpack_artifact("pkg", "rules.yml", b"x".to_vec()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path.as_str(), "rules.yml");
    }

    #[test]
    fn rejects_garbage() {
        assert!(extract_tar_gz("pkg", b"not a tarball").is_err());
    }

    #[test]
    fn verifies_published_checksum() {
        let hex = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        verify_sha256("pkg", b"hello world", Some(hex)).unwrap();
        verify_sha256("pkg", b"hello world", None).unwrap();
        assert!(verify_sha256("pkg", b"tampered", Some(hex)).is_err());
    }
}
