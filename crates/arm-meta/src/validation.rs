//! Parsing and validation of resource documents
//!
//! Validation does not stop at the first problem: every missing or invalid
//! field is collected into a [`ValidationIssue`] so a single run reports
//! everything an author needs to fix.

use std::collections::BTreeMap;

use crate::schema::{
    Enforcement, ItemDocument, MetadataDocument, Resource, ResourceDocument, ResourceItem,
    ResourceKind, ResourceMetadata,
};
use crate::{Error, Result, ValidationIssue};

/// Parse YAML text into a validated [`Resource`].
pub fn parse_resource(text: &str) -> Result<Resource> {
    let document: ResourceDocument = serde_yaml::from_str(text)?;
    validate_document(document)
}

/// Validate an already-deserialized document.
pub fn validate_document(document: ResourceDocument) -> Result<Resource> {
    let mut issues = Vec::new();

    let api_version = match document.api_version.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            push(&mut issues, "apiVersion", "is required");
            String::new()
        }
    };

    let kind = match document.kind.as_deref() {
        Some(raw) => match ResourceKind::parse(raw.trim()) {
            Some(kind) => Some(kind),
            None => {
                push(
                    &mut issues,
                    "kind",
                    format!("must be Ruleset or Promptset, got '{raw}'"),
                );
                None
            }
        },
        None => {
            push(&mut issues, "kind", "is required");
            None
        }
    };

    let metadata = validate_metadata(document.metadata, &mut issues);

    let items = match (kind, document.spec) {
        (Some(kind), Some(spec)) => {
            let (field, entries) = match kind {
                ResourceKind::Ruleset => ("spec.rules", spec.rules),
                ResourceKind::Promptset => ("spec.prompts", spec.prompts),
            };
            match entries {
                Some(entries) if !entries.is_empty() => {
                    validate_items(field, kind, entries, &mut issues)
                }
                _ => {
                    push(&mut issues, field, "must contain at least one item");
                    Vec::new()
                }
            }
        }
        (_, None) => {
            push(&mut issues, "spec", "is required");
            Vec::new()
        }
        // Unknown kind was already reported
        (None, Some(_)) => Vec::new(),
    };

    match (kind, metadata) {
        (Some(kind), Some(metadata)) if issues.is_empty() => Ok(Resource {
            api_version,
            kind,
            metadata,
            items,
        }),
        _ => {
            tracing::debug!(count = issues.len(), "Resource failed validation");
            Err(Error::Validation { issues })
        }
    }
}

fn validate_metadata(
    metadata: Option<MetadataDocument>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ResourceMetadata> {
    let Some(metadata) = metadata else {
        push(issues, "metadata", "is required");
        return None;
    };

    let id = required_text(metadata.id, "metadata.id", issues);
    let name = required_text(metadata.name, "metadata.name", issues);

    Some(ResourceMetadata {
        id: id?,
        name: name?,
        description: metadata.description,
    })
}

fn validate_items(
    field: &str,
    kind: ResourceKind,
    entries: BTreeMap<String, ItemDocument>,
    issues: &mut Vec<ValidationIssue>,
) -> Vec<ResourceItem> {
    let mut items = Vec::with_capacity(entries.len());

    for (id, item) in entries {
        let prefix = format!("{field}.{id}");
        if id.trim().is_empty() {
            push(issues, field, "item ids must not be empty");
            continue;
        }

        let name = required_text(item.name, &format!("{prefix}.name"), issues);
        let body = required_text(item.body, &format!("{prefix}.body"), issues);

        let enforcement = match item.enforcement.as_deref() {
            None => None,
            Some(raw) => match Enforcement::parse(raw) {
                Some(e) => Some(e),
                None => {
                    push(
                        issues,
                        format!("{prefix}.enforcement"),
                        format!("must be one of may, should, must; got '{raw}'"),
                    );
                    None
                }
            },
        };

        if kind == ResourceKind::Promptset && item.enforcement.is_some() {
            tracing::debug!(item = %id, "Ignoring enforcement on prompt item");
        }

        let scope_files = item.scope.map(|s| s.files()).unwrap_or_default();
        if scope_files.iter().any(|f| f.trim().is_empty()) {
            push(issues, format!("{prefix}.scope.files"), "must not contain empty globs");
        }

        if let (Some(name), Some(body)) = (name, body) {
            items.push(ResourceItem {
                id,
                name,
                description: item.description,
                priority: item.priority,
                enforcement: match kind {
                    ResourceKind::Ruleset => enforcement,
                    ResourceKind::Promptset => None,
                },
                scope_files,
                body,
            });
        }
    }

    items
}

fn required_text(
    value: Option<String>,
    field: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            push(issues, field, "is required");
            None
        }
    }
}

fn push(issues: &mut Vec<ValidationIssue>, field: impl Into<String>, message: impl Into<String>) {
    issues.push(ValidationIssue {
        field: field.into(),
        message: message.into(),
    });
}
