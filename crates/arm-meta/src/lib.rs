//! Resource schema for arm.
//!
//! Rulesets and promptsets are authored in a neutral YAML form and compiled
//! per tool at install time. This crate parses that form, validates it, and
//! exposes the validated [`Resource`] model the compiler consumes.

pub mod error;
pub mod schema;
pub mod validation;

pub use error::{Error, Result, ValidationIssue};
pub use schema::{Enforcement, Resource, ResourceDocument, ResourceItem, ResourceKind, ResourceMetadata};
pub use validation::parse_resource;
