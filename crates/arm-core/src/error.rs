//! Error types for arm-core

use std::fmt;
use std::path::PathBuf;

/// Result type for arm-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Flat classification of every error the CLI can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidConfig,
    InvalidConstraint,
    NoVersionSatisfiesConstraint,
    RegistryUnreachable,
    AuthFailed,
    ChecksumMismatch,
    ManifestMissing,
    NoConfiguration,
    UnsupportedTarget,
    CompileError,
    Io,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::InvalidConfig => "InvalidConfig",
            Self::InvalidConstraint => "InvalidConstraint",
            Self::NoVersionSatisfiesConstraint => "NoVersionSatisfiesConstraint",
            Self::RegistryUnreachable => "RegistryUnreachable",
            Self::AuthFailed => "AuthFailed",
            Self::ChecksumMismatch => "ChecksumMismatch",
            Self::ManifestMissing => "ManifestMissing",
            Self::NoConfiguration => "NoConfiguration",
            Self::UnsupportedTarget => "UnsupportedTarget",
            Self::CompileError => "CompileError",
            Self::Io => "Io",
            Self::Cancelled => "Cancelled",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in arm-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A named manifest entry, lock entry or installation is absent
    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    #[error("{what} '{name}' already exists (use --force to replace it)")]
    AlreadyExists { what: &'static str, name: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Checksum mismatch for {package}: lockfile has {expected}, content is {actual}")]
    ChecksumMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("Lockfile {lockfile} exists but its manifest is missing")]
    ManifestMissing { lockfile: PathBuf },

    #[error("No manifest or lockfile found at {path}")]
    NoConfiguration { path: PathBuf },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{package}: {source}")]
    Package {
        package: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    // Transparent wrappers for underlying crate errors
    #[error(transparent)]
    Registry(#[from] arm_registry::Error),

    #[error(transparent)]
    Compiler(#[from] arm_compiler::Error),

    #[error(transparent)]
    Meta(#[from] arm_meta::Error),

    #[error(transparent)]
    Fs(#[from] arm_fs::Error),
}

impl Error {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn already_exists(what: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            what,
            name: name.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Attach a package identity to an error, once.
    pub fn for_package(self, package: impl Into<String>) -> Self {
        match self {
            Self::Package { .. } | Self::ChecksumMismatch { .. } | Self::Cancelled => self,
            other => Self::Package {
                package: package.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::ManifestMissing { .. } => ErrorKind::ManifestMissing,
            Self::NoConfiguration { .. } => ErrorKind::NoConfiguration,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Package { source, .. } => source.kind(),
            Self::Internal(_) => ErrorKind::Internal,
            Self::Registry(e) => registry_kind(e),
            Self::Compiler(e) => match e {
                arm_compiler::Error::UnsupportedTarget { .. } => ErrorKind::UnsupportedTarget,
                arm_compiler::Error::Fs(_) => ErrorKind::Io,
                _ => ErrorKind::CompileError,
            },
            Self::Meta(_) => ErrorKind::CompileError,
            Self::Fs(e) => match e {
                arm_fs::Error::JsonParse { .. } => ErrorKind::InvalidConfig,
                arm_fs::Error::UnsafePath { .. } => ErrorKind::InvalidConfig,
                _ => ErrorKind::Io,
            },
        }
    }

    /// Network and authentication failures abort one package, not a batch.
    pub fn is_network(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RegistryUnreachable | ErrorKind::AuthFailed
        )
    }
}

fn registry_kind(err: &arm_registry::Error) -> ErrorKind {
    use arm_registry::Error as E;
    match err {
        E::InvalidConstraint { .. } => ErrorKind::InvalidConstraint,
        E::NoVersionSatisfiesConstraint { .. } => ErrorKind::NoVersionSatisfiesConstraint,
        E::PackageNotFound { .. } | E::VersionNotFound { .. } => ErrorKind::NotFound,
        E::Unreachable { .. } => ErrorKind::RegistryUnreachable,
        E::AuthFailed { .. } => ErrorKind::AuthFailed,
        E::InvalidConfig { .. } | E::InvalidPattern { .. } => ErrorKind::InvalidConfig,
        E::DownloadChecksum { .. } => ErrorKind::ChecksumMismatch,
        E::InvalidArchive { .. } => ErrorKind::Internal,
        E::CacheLock { .. } | E::Fs(_) => ErrorKind::Io,
        E::Git(_) => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::not_found("sink", "s1"), ErrorKind::NotFound)]
    #[case(Error::already_exists("registry", "r"), ErrorKind::AlreadyExists)]
    #[case(Error::Cancelled, ErrorKind::Cancelled)]
    #[case(
        Error::Registry(arm_registry::Error::Unreachable { registry: "r".into(), message: "down".into() }),
        ErrorKind::RegistryUnreachable
    )]
    #[case(
        Error::Compiler(arm_compiler::Error::UnsupportedTarget { target: "vim".into() }),
        ErrorKind::UnsupportedTarget
    )]
    fn classifies_errors(#[case] error: Error, #[case] kind: ErrorKind) {
        assert_eq!(error.kind(), kind);
    }

    #[test]
    fn package_context_keeps_kind_and_names_package() {
        let err = Error::Registry(arm_registry::Error::AuthFailed {
            registry: "lab".into(),
            message: "401".into(),
        })
        .for_package("lab/rules");
        assert_eq!(err.kind(), ErrorKind::AuthFailed);
        assert!(err.to_string().starts_with("lab/rules: "));
        assert!(err.is_network());
    }
}
