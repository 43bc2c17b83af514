//! Emitter trait shared by all compile targets
//!
//! Targets differ only in file extension, front matter and body decoration.
//! The default methods here render the common parts; each target overrides
//! what its tool expects.

use arm_meta::{Resource, ResourceItem, ResourceKind};

use crate::amazonq::AmazonQEmitter;
use crate::copilot::CopilotEmitter;
use crate::cursor::CursorEmitter;
use crate::error::Result;
use crate::markdown::MarkdownEmitter;
use crate::target::CompileTarget;

/// Renders one resource item into a target tool's file format.
pub trait Emitter: Send + Sync {
    /// The target this emitter produces files for.
    fn target(&self) -> CompileTarget;

    /// File extension (including the leading dot) for a resource kind.
    fn extension(&self, kind: ResourceKind) -> &'static str;

    /// YAML front matter without the `---` fences, or `None` for plain files.
    fn front_matter(&self, resource: &Resource, item: &ResourceItem) -> Result<Option<String>>;

    /// Body text following the front matter.
    fn body(&self, resource: &Resource, item: &ResourceItem) -> String {
        decorate_body(resource.kind, item)
    }

    /// Full file content.
    fn render(&self, resource: &Resource, item: &ResourceItem) -> Result<String> {
        let mut out = String::new();
        if let Some(front_matter) = self.front_matter(resource, item)? {
            out.push_str("---\n");
            out.push_str(&front_matter);
            if !front_matter.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("---\n\n");
        }
        out.push_str(&self.body(resource, item));
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}

/// Create the emitter for a target.
pub fn emitter_for(target: CompileTarget) -> Box<dyn Emitter> {
    match target {
        CompileTarget::Cursor => Box::new(CursorEmitter),
        CompileTarget::AmazonQ => Box::new(AmazonQEmitter),
        CompileTarget::Copilot => Box::new(CopilotEmitter),
        CompileTarget::Markdown => Box::new(MarkdownEmitter),
    }
}

/// Heading, optional description, rule metadata lines, then the body.
///
/// ```text
/// # Meaningful names
///
/// **Enforcement:** MUST
/// **Priority:** 100
///
/// Use intention-revealing names.
/// ```
pub fn decorate_body(kind: ResourceKind, item: &ResourceItem) -> String {
    let mut out = format!("# {}\n\n", item.name.trim());

    if let Some(description) = item.description.as_deref().map(str::trim)
        && !description.is_empty()
    {
        out.push_str(description);
        out.push_str("\n\n");
    }

    if kind == ResourceKind::Ruleset {
        let mut meta = Vec::new();
        if let Some(enforcement) = item.enforcement {
            meta.push(format!(
                "{ENFORCEMENT_LABEL} {}",
                enforcement.as_str().to_ascii_uppercase()
            ));
        }
        if let Some(priority) = item.priority {
            meta.push(format!("{PRIORITY_LABEL} {priority}"));
        }
        if !meta.is_empty() {
            out.push_str(&meta.join("\n"));
            out.push_str("\n\n");
        }
    }

    out.push_str(item.body.trim_end());
    out.push('\n');
    out
}

pub(crate) const ENFORCEMENT_LABEL: &str = "**Enforcement:**";
pub(crate) const PRIORITY_LABEL: &str = "**Priority:**";

/// Quote a string as a YAML scalar.
///
/// JSON string syntax is valid YAML and survives globs such as `**/*.rs`.
pub(crate) fn yaml_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Description line for front matter: the item description, else its name.
pub(crate) fn item_description(item: &ResourceItem) -> &str {
    item.description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| item.name.trim())
}
