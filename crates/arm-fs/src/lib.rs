//! Filesystem primitives for arm
//!
//! Provides normalized relative paths, atomic writes, directory pruning and the
//! canonical package checksum shared by the cache, lockfile and installers.

pub mod checksum;
pub mod error;
pub mod file;
pub mod io;
pub mod path;

pub use checksum::{compute_content_checksum, compute_package_checksum, is_valid_checksum};
pub use error::{Error, Result};
pub use file::PackageFile;
pub use path::{NormalizedPath, validate_relative_path};
