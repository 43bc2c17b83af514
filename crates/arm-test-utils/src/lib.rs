//! Shared test utilities for the arm workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: [`GitRemote`](git::GitRemote), a local git repository used as a
//!   registry remote
//! - [`project`]: [`TestProject`](project::TestProject), a temporary project
//!   directory with assertion helpers
//! - [`resources`]: ruleset/promptset YAML builders

pub mod git;
pub mod project;
pub mod resources;
