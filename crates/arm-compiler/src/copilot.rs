//! GitHub Copilot emitter.
//!
//! Rules become path-specific `.instructions.md` files whose front matter
//! carries `applyTo`; prompts become `.prompt.md` prompt files.

use arm_meta::{Resource, ResourceItem, ResourceKind};

use crate::emitter::{Emitter, item_description, yaml_string};
use crate::error::Result;
use crate::target::CompileTarget;

/// Glob used when a rule has no scope
const APPLY_TO_ALL: &str = "**";

#[derive(Debug, Clone, Copy, Default)]
pub struct CopilotEmitter;

impl Emitter for CopilotEmitter {
    fn target(&self) -> CompileTarget {
        CompileTarget::Copilot
    }

    fn extension(&self, kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Ruleset => ".instructions.md",
            ResourceKind::Promptset => ".prompt.md",
        }
    }

    fn front_matter(&self, resource: &Resource, item: &ResourceItem) -> Result<Option<String>> {
        let description = format!("description: {}\n", yaml_string(item_description(item)));
        match resource.kind {
            ResourceKind::Ruleset => {
                let apply_to = if item.scope_files.is_empty() {
                    APPLY_TO_ALL.to_string()
                } else {
                    item.scope_files.join(",")
                };
                Ok(Some(format!("applyTo: {}\n{description}", yaml_string(&apply_to))))
            }
            ResourceKind::Promptset => Ok(Some(description)),
        }
    }
}
