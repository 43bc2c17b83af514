//! Validated resource model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::API_VERSION;
use super::document::{ItemDocument, MetadataDocument, ResourceDocument, ScopeDocument, SpecDocument};

/// Kind of a resource document and of a manifest package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Ruleset,
    Promptset,
}

impl ResourceKind {
    /// The `kind:` value used in resource documents.
    pub fn document_name(&self) -> &'static str {
        match self {
            Self::Ruleset => "Ruleset",
            Self::Promptset => "Promptset",
        }
    }

    /// The lowercase name used in manifests and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ruleset => "ruleset",
            Self::Promptset => "promptset",
        }
    }

    /// Parse either spelling, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ruleset" => Some(Self::Ruleset),
            "promptset" => Some(Self::Promptset),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly an assistant should follow a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    May,
    Should,
    Must,
}

impl Enforcement {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "may" => Some(Self::May),
            "should" => Some(Self::Should),
            "must" => Some(Self::Must),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::May => "may",
            Self::Should => "should",
            Self::Must => "must",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// One rule or prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Key of the item in the `spec` map
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub enforcement: Option<Enforcement>,
    /// File globs the item applies to; empty means "always"
    pub scope_files: Vec<String>,
    pub body: String,
}

/// A validated ruleset or promptset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub api_version: String,
    pub kind: ResourceKind,
    pub metadata: ResourceMetadata,
    /// Items ordered by id
    pub items: Vec<ResourceItem>,
}

impl Resource {
    /// Convert back to the wire form for serialization.
    pub fn to_document(&self) -> ResourceDocument {
        let items: BTreeMap<String, ItemDocument> = self
            .items
            .iter()
            .map(|item| {
                let doc = ItemDocument {
                    name: Some(item.name.clone()),
                    description: item.description.clone(),
                    priority: item.priority,
                    enforcement: item.enforcement.map(|e| e.as_str().to_string()),
                    scope: (!item.scope_files.is_empty())
                        .then(|| ScopeDocument::from_files(item.scope_files.clone())),
                    body: Some(item.body.clone()),
                };
                (item.id.clone(), doc)
            })
            .collect();

        let spec = match self.kind {
            ResourceKind::Ruleset => SpecDocument {
                rules: Some(items),
                prompts: None,
            },
            ResourceKind::Promptset => SpecDocument {
                rules: None,
                prompts: Some(items),
            },
        };

        ResourceDocument {
            api_version: Some(if self.api_version.is_empty() {
                API_VERSION.to_string()
            } else {
                self.api_version.clone()
            }),
            kind: Some(self.kind.document_name().to_string()),
            metadata: Some(MetadataDocument {
                id: Some(self.metadata.id.clone()),
                name: Some(self.metadata.name.clone()),
                description: self.metadata.description.clone(),
            }),
            spec: Some(spec),
        }
    }

    /// Serialize to YAML text.
    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(&self.to_document())?)
    }
}
