//! Schema definitions for neutral resource documents
//!
//! [`ResourceDocument`] is the permissive wire form read from YAML;
//! [`Resource`] is the validated model produced by
//! [`parse_resource`](crate::parse_resource).

mod document;
mod resource;

pub use document::{
    ItemDocument, MetadataDocument, ResourceDocument, ScopeDocument, ScopeFiles, SpecDocument,
};
pub use resource::{Enforcement, Resource, ResourceItem, ResourceKind, ResourceMetadata};

/// API version written by arm when it generates documents.
pub const API_VERSION: &str = "v1";
