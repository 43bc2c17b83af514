//! Core of the arm package manager.
//!
//! Holds the project's declarative state (the [`manifest`] and
//! [`lockfile`]), the per-directory [`sink`] installer, and the [`Arm`]
//! service that runs every verb against them.
//!
//! ```no_run
//! use arm_core::{Arm, BatchOptions};
//!
//! let arm = Arm::discover(std::path::Path::new("."))?;
//! let report = arm.install_all(BatchOptions::default())?;
//! for outcome in &report.outcomes {
//!     println!("{}: {}", outcome.package, outcome.status);
//! }
//! # Ok::<(), arm_core::Error>(())
//! ```

pub mod age;
pub mod arm;
pub mod cancel;
pub mod error;
pub mod local;
pub mod lockfile;
pub mod manifest;
pub mod package;
pub mod sink;

pub use age::{DEFAULT_MAX_AGE, parse_age};
pub use arm::{
    Arm, BatchOptions, BatchReport, CacheCleanReport, DependencyStatus, InstallRequest,
    OutdatedEntry, PackageOutcome, PackageStatus, RegistryFactory, RemoteRegistries,
    SinkCleanReport, default_cache_root,
};
pub use cancel::CancelToken;
pub use error::{Error, ErrorKind, Result};
pub use local::{LocalCompileOptions, LocalCompileReport, compile_paths, convert_paths};
pub use lockfile::{LockEntry, Lockfile, LockfileStore, ResolvedVersion};
pub use manifest::{DependencyConfig, Layout, Manifest, ManifestStore, SinkConfig};
pub use package::{PackageKey, PackageSpec};
