//! Registry configuration as stored in the manifest
//!
//! ```json
//! "registries": {
//!   "team": { "type": "git", "url": "https://github.com/acme/rules", "branches": ["main"] },
//!   "lab":  { "type": "gitlab", "url": "https://gitlab.example.com", "projectId": "42" },
//!   "cs":   { "type": "cloudsmith", "owner": "acme", "repository": "ai-rules" }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const DEFAULT_GITLAB_API_VERSION: &str = "v4";
pub const DEFAULT_CLOUDSMITH_URL: &str = "https://api.cloudsmith.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Git,
    Gitlab,
    Cloudsmith,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Gitlab => "gitlab",
            Self::Cloudsmith => "cloudsmith",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "gitlab" => Ok(Self::Gitlab),
            "cloudsmith" => Ok(Self::Cloudsmith),
            other => Err(format!(
                "unknown registry type '{other}' (expected git, gitlab or cloudsmith)"
            )),
        }
    }
}

/// A named remote source of packages.
///
/// Unknown keys are kept in `extra` so that rewriting the manifest does not
/// drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(rename = "type")]
    pub kind: RegistryKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Git only: branches exposed as branch-head versions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub project_id: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub group_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RegistryConfig {
    fn empty(kind: RegistryKind) -> Self {
        Self {
            kind,
            url: None,
            branches: Vec::new(),
            project_id: None,
            group_id: None,
            api_version: None,
            owner: None,
            repository: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn git(url: impl Into<String>, branches: Vec<String>) -> Self {
        Self {
            url: Some(url.into()),
            branches,
            ..Self::empty(RegistryKind::Git)
        }
    }

    pub fn gitlab(
        url: impl Into<String>,
        project_id: Option<String>,
        group_id: Option<String>,
        api_version: Option<String>,
    ) -> Self {
        Self {
            url: Some(url.into()),
            project_id,
            group_id,
            api_version,
            ..Self::empty(RegistryKind::Gitlab)
        }
    }

    pub fn cloudsmith(
        url: Option<String>,
        owner: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            url,
            owner: Some(owner.into()),
            repository: Some(repository.into()),
            ..Self::empty(RegistryKind::Cloudsmith)
        }
    }

    /// Check the kind-specific required fields.
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |message: &str| Error::InvalidConfig {
            registry: name.to_string(),
            message: message.to_string(),
        };
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

        match self.kind {
            RegistryKind::Git => {
                if !present(&self.url) {
                    return Err(invalid("git registries require a url"));
                }
                if let Some(bad) = self
                    .branches
                    .iter()
                    .find(|b| !git2::Reference::is_valid_name(&format!("refs/heads/{b}")))
                {
                    return Err(invalid(&format!("'{bad}' is not a valid branch name")));
                }
            }
            RegistryKind::Gitlab => {
                if !present(&self.url) {
                    return Err(invalid("gitlab registries require a url"));
                }
                match (present(&self.project_id), present(&self.group_id)) {
                    (true, true) => {
                        return Err(invalid("set either projectId or groupId, not both"));
                    }
                    (false, false) => return Err(invalid("gitlab registries require projectId or groupId")),
                    _ => {}
                }
            }
            RegistryKind::Cloudsmith => {
                if !present(&self.owner) || !present(&self.repository) {
                    return Err(invalid("cloudsmith registries require owner and repository"));
                }
            }
        }
        Ok(())
    }

    pub fn gitlab_api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .unwrap_or(DEFAULT_GITLAB_API_VERSION)
    }

    pub fn cloudsmith_url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_CLOUDSMITH_URL)
    }

    /// Stable cache key derived from the registry's kind and address.
    ///
    /// The registry's name is not part of the key, so renaming a registry
    /// keeps its cache.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        let fields: [&str; 7] = [
            self.kind.as_str(),
            self.url.as_deref().unwrap_or(""),
            self.project_id.as_deref().unwrap_or(""),
            self.group_id.as_deref().unwrap_or(""),
            self.api_version.as_deref().unwrap_or(""),
            self.owner.as_deref().unwrap_or(""),
            self.repository.as_deref().unwrap_or(""),
        ];
        for field in fields {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }

    /// Human-readable address for listings.
    pub fn address(&self) -> String {
        match self.kind {
            RegistryKind::Git => self.url.clone().unwrap_or_default(),
            RegistryKind::Gitlab => {
                let scope = match (&self.project_id, &self.group_id) {
                    (Some(p), _) => format!("project {p}"),
                    (None, Some(g)) => format!("group {g}"),
                    (None, None) => String::new(),
                };
                format!("{} ({scope})", self.url.as_deref().unwrap_or_default())
            }
            RegistryKind::Cloudsmith => format!(
                "{}/{}/{}",
                self.cloudsmith_url(),
                self.owner.as_deref().unwrap_or_default(),
                self.repository.as_deref().unwrap_or_default()
            ),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_gitlab_numeric_project_id() {
        let config: RegistryConfig = serde_json::from_str(
            r#"{"type": "gitlab", "url": "https://gitlab.example.com", "projectId": 42}"#,
        )
        .unwrap();
        assert_eq!(config.project_id.as_deref(), Some("42"));
        assert_eq!(config.gitlab_api_version(), "v4");
        config.validate("lab").unwrap();
    }

    #[test]
    fn preserves_unknown_keys() {
        let text = r#"{"type":"git","url":"https://x/y.git","mirror":true}"#;
        let config: RegistryConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.extra.get("mirror"), Some(&serde_json::Value::Bool(true)));
        let back = serde_json::to_string(&config).unwrap();
        assert!(back.contains("\"mirror\":true"));
    }

    #[test]
    fn cache_key_ignores_branches_and_is_short() {
        let a = RegistryConfig::git("https://x/y.git", vec![]);
        let b = RegistryConfig::git("https://x/y.git", vec!["main".into()]);
        let c = RegistryConfig::git("https://x/z.git", vec![]);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key().len(), 16);
    }

    #[test]
    fn validation_reports_missing_fields() {
        assert!(RegistryConfig::git("", vec![]).validate("r").is_err());
        assert!(
            RegistryConfig::gitlab("https://g", None, None, None)
                .validate("r")
                .is_err()
        );
        assert!(
            RegistryConfig::gitlab("https://g", Some("1".into()), Some("2".into()), None)
                .validate("r")
                .is_err()
        );
        assert!(
            RegistryConfig::git("https://x", vec!["bad..name".into()])
                .validate("r")
                .is_err()
        );
        RegistryConfig::cloudsmith(None, "acme", "rules")
            .validate("r")
            .unwrap();
    }

    #[test]
    fn kind_serializes_as_type() {
        let config = RegistryConfig::cloudsmith(None, "acme", "rules");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "cloudsmith");
        assert_eq!(value["owner"], "acme");
    }
}
