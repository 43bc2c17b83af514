//! Plain Markdown emitter.
//!
//! Output keeps the full item metadata in a front matter block so a
//! generic consumer (or `arm convert`) can recover the neutral form.

use arm_meta::{Resource, ResourceItem, ResourceKind};
use serde::Serialize;

use crate::emitter::Emitter;
use crate::error::Result;
use crate::target::CompileTarget;

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownEmitter;

#[derive(Serialize)]
struct MarkdownMetadata<'a> {
    kind: &'a str,
    resource: ResourceRef<'a>,
    item: ItemMetadata<'a>,
}

#[derive(Serialize)]
struct ResourceRef<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct ItemMetadata<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enforcement: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<i64>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    scope: &'a [String],
}

impl Emitter for MarkdownEmitter {
    fn target(&self) -> CompileTarget {
        CompileTarget::Markdown
    }

    fn extension(&self, _kind: ResourceKind) -> &'static str {
        ".md"
    }

    fn front_matter(&self, resource: &Resource, item: &ResourceItem) -> Result<Option<String>> {
        let metadata = MarkdownMetadata {
            kind: resource.kind.as_str(),
            resource: ResourceRef {
                id: &resource.metadata.id,
                name: &resource.metadata.name,
            },
            item: ItemMetadata {
                id: &item.id,
                name: &item.name,
                description: item.description.as_deref(),
                enforcement: item.enforcement.map(|e| e.as_str()),
                priority: item.priority,
                scope: &item.scope_files,
            },
        };
        Ok(Some(serde_yaml::to_string(&metadata)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_meta::parse_resource;

    #[test]
    fn front_matter_carries_item_metadata() {
        let resource = parse_resource(
            "apiVersion: v1\nkind: Ruleset\nmetadata: {id: r, name: R}\nspec:\n  rules:\n    a:\n      name: A\n      enforcement: may\n      priority: 5\n      body: B\n",
        )
        .unwrap();
        let text = MarkdownEmitter.render(&resource, &resource.items[0]).unwrap();
        assert!(text.starts_with("---\nkind: ruleset\n"));
        assert!(text.contains("  enforcement: may\n"));
        assert!(text.contains("  priority: 5\n"));
        assert!(!text.contains("scope"));
        assert!(text.ends_with("# A\n\n**Enforcement:** MAY\n**Priority:** 5\n\nB\n"));
    }
}
