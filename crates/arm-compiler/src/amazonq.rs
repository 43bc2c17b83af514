//! Amazon Q emitter.
//!
//! Amazon Q reads plain Markdown from `.amazonq/rules/`; there is no front
//! matter, so scope globs are listed in the body instead.

use arm_meta::{Resource, ResourceItem, ResourceKind};

use crate::emitter::{Emitter, decorate_body};
use crate::error::Result;
use crate::target::CompileTarget;

#[derive(Debug, Clone, Copy, Default)]
pub struct AmazonQEmitter;

impl Emitter for AmazonQEmitter {
    fn target(&self) -> CompileTarget {
        CompileTarget::AmazonQ
    }

    fn extension(&self, _kind: ResourceKind) -> &'static str {
        ".md"
    }

    fn front_matter(&self, _resource: &Resource, _item: &ResourceItem) -> Result<Option<String>> {
        Ok(None)
    }

    fn body(&self, resource: &Resource, item: &ResourceItem) -> String {
        let text = decorate_body(resource.kind, item);
        if item.scope_files.is_empty() {
            return text;
        }
        // Insert the scope line right after the heading block
        let scope = format!("**Applies to:** {}\n\n", item.scope_files.join(", "));
        match text.find("\n\n") {
            Some(at) => format!("{}{}{}", &text[..at + 2], scope, &text[at + 2..]),
            None => format!("{text}\n{scope}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_meta::parse_resource;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_plain_markdown_with_scope() {
        let resource = parse_resource(
            "apiVersion: v1\nkind: Ruleset\nmetadata: {id: r, name: R}\nspec:\n  rules:\n    a:\n      name: Tests\n      scope: {files: [\"tests/**\"]}\n      body: Write tests.\n",
        )
        .unwrap();
        let text = AmazonQEmitter.render(&resource, &resource.items[0]).unwrap();
        assert_eq!(text, "# Tests\n\n**Applies to:** tests/**\n\nWrite tests.\n");
    }
}
