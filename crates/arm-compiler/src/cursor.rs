//! Cursor emitter.
//!
//! Rules become `.mdc` files under Cursor's rules directory with a front
//! matter block Cursor reads to decide when to attach the rule:
//!
//! ```yaml
//! ---
//! description: "Meaningful names"
//! globs: "**/*.py"
//! alwaysApply: false
//! ---
//! ```
//!
//! Prompts become plain `.md` command files.

use arm_meta::{Resource, ResourceItem, ResourceKind};

use crate::emitter::{Emitter, item_description, yaml_string};
use crate::error::Result;
use crate::target::CompileTarget;

#[derive(Debug, Clone, Copy, Default)]
pub struct CursorEmitter;

impl Emitter for CursorEmitter {
    fn target(&self) -> CompileTarget {
        CompileTarget::Cursor
    }

    fn extension(&self, kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Ruleset => ".mdc",
            ResourceKind::Promptset => ".md",
        }
    }

    fn front_matter(&self, resource: &Resource, item: &ResourceItem) -> Result<Option<String>> {
        if resource.kind == ResourceKind::Promptset {
            return Ok(None);
        }
        let always_apply = item.scope_files.is_empty();
        let globs = item.scope_files.join(",");
        Ok(Some(format!(
            "description: {}\nglobs: {}\nalwaysApply: {}\n",
            yaml_string(item_description(item)),
            yaml_string(&globs),
            always_apply
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_meta::parse_resource;
    use pretty_assertions::assert_eq;

    const RULES: &str = r#"
apiVersion: v1
kind: Ruleset
metadata: {id: py, name: Python}
spec:
  rules:
    naming:
      name: Naming
      description: Names matter
      enforcement: should
      scope:
        files: ["**/*.py", "scripts/*.py"]
      body: Use snake_case.
"#;

    #[test]
    fn rule_front_matter_lists_globs() {
        let resource = parse_resource(RULES).unwrap();
        let text = CursorEmitter.render(&resource, &resource.items[0]).unwrap();
        assert_eq!(
            text,
            "---\ndescription: \"Names matter\"\nglobs: \"**/*.py,scripts/*.py\"\nalwaysApply: false\n---\n\n# Naming\n\nNames matter\n\n**Enforcement:** SHOULD\n\nUse snake_case.\n"
        );
    }

    #[test]
    fn unscoped_rule_always_applies() {
        let mut resource = parse_resource(RULES).unwrap();
        resource.items[0].scope_files.clear();
        let front = CursorEmitter
            .front_matter(&resource, &resource.items[0])
            .unwrap()
            .unwrap();
        assert!(front.contains("alwaysApply: true"));
        assert!(front.contains("globs: \"\""));
    }

    #[test]
    fn extensions_by_kind() {
        assert_eq!(CursorEmitter.extension(ResourceKind::Ruleset), ".mdc");
        assert_eq!(CursorEmitter.extension(ResourceKind::Promptset), ".md");
    }
}
