//! Registry access for arm
//!
//! - [`version`]: versions, constraints and the resolver
//! - [`filter`]: include/exclude content selection
//! - [`cache`]: the on-disk content cache shared by all projects
//! - [`driver`]: the [`RegistryDriver`] trait and the cached [`Registry`]
//! - [`git`], [`gitlab`], [`cloudsmith`]: remote backends
//! - [`memory`]: an in-process backend for tests and demos

pub mod archive;
pub mod cache;
pub mod cloudsmith;
pub mod config;
pub mod driver;
pub mod error;
pub mod filter;
pub mod git;
pub mod gitlab;
pub mod http;
pub mod memory;
pub mod version;

pub use cache::{CachedEntry, ContentCache, EntryIndex};
pub use config::{RegistryConfig, RegistryKind};
pub use driver::{Registry, RegistryDriver, open_driver};
pub use error::{Error, Result};
pub use filter::{ContentSelector, DEFAULT_INCLUDE, validate_pattern};
pub use memory::MemoryRegistry;
pub use version::{Constraint, Version, VersionKind, parse_tag, resolve};
