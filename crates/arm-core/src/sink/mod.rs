//! Sinks: output directories that receive compiled packages

pub mod index;
pub mod installer;

pub use index::{INDEX_FILE, IndexEntry, SinkIndex};
pub use installer::{Installation, SinkInstaller, flat_name, package_dir};
