//! Wire form of a resource document
//!
//! Every field is optional here so that validation can report all missing
//! fields at once instead of stopping at the first serde error.
//!
//! # Example YAML
//!
//! ```yaml
//! apiVersion: v1
//! kind: Ruleset
//! metadata:
//!   id: clean-code
//!   name: Clean Code
//! spec:
//!   rules:
//!     meaningful-names:
//!       name: Meaningful names
//!       enforcement: must
//!       priority: 100
//!       scope:
//!         files: ["**/*.py"]
//!       body: Use intention-revealing names.
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<SpecDocument>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetadataDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Items keyed by id. Rulesets use `rules`, promptsets use `prompts`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpecDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<BTreeMap<String, ItemDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<BTreeMap<String, ItemDocument>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Kept as a string so that bad values surface as validation issues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// `scope` accepts either a single `{files: [...]}` block or a list of them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScopeDocument {
    Single(ScopeFiles),
    List(Vec<ScopeFiles>),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScopeFiles {
    #[serde(default)]
    pub files: Vec<String>,
}

impl ScopeDocument {
    /// All file globs, flattened in declaration order.
    pub fn files(&self) -> Vec<String> {
        match self {
            Self::Single(scope) => scope.files.clone(),
            Self::List(scopes) => scopes.iter().flat_map(|s| s.files.clone()).collect(),
        }
    }

    pub fn from_files(files: Vec<String>) -> Self {
        Self::Single(ScopeFiles { files })
    }
}
