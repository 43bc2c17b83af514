//! Error types for arm-registry

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("No version of {registry}/{package} satisfies '{constraint}'")]
    NoVersionSatisfiesConstraint {
        registry: String,
        package: String,
        constraint: String,
    },

    #[error("Package '{package}' not found in registry '{registry}'")]
    PackageNotFound { registry: String, package: String },

    #[error("Version '{version}' of {registry}/{package} not found")]
    VersionNotFound {
        registry: String,
        package: String,
        version: String,
    },

    #[error("Registry '{registry}' is unreachable: {message}")]
    Unreachable { registry: String, message: String },

    #[error("Authentication failed for registry '{registry}': {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Invalid configuration for registry '{registry}': {message}")]
    InvalidConfig { registry: String, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid archive for {package}: {message}")]
    InvalidArchive { package: String, message: String },

    #[error("Downloaded content for {package} does not match its published checksum")]
    DownloadChecksum { package: String },

    #[error("Cache lock failed at {path}")]
    CacheLock { path: PathBuf },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Fs(#[from] arm_fs::Error),
}

impl Error {
    /// Whether this error means the remote could not be reached or refused us.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::AuthFailed { .. })
    }
}
