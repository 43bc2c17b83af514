//! Builds the core service from global flags

use std::path::PathBuf;

use arm_core::{Arm, CancelToken, ManifestStore, default_cache_root};

use crate::error::Result;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub manifest: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub cancel: CancelToken,
}

impl Context {
    pub fn arm(&self) -> Result<Arm> {
        let cwd = std::env::current_dir()?;
        let manifest = match &self.manifest {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => cwd.join(path),
            None => ManifestStore::discover(&cwd).path().to_path_buf(),
        };
        let cache = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_root()?,
        };
        tracing::debug!(manifest = %manifest.display(), cache = %cache.display(), "Opening project");
        Ok(Arm::new(manifest, cache).with_cancel_token(self.cancel.clone()))
    }
}
