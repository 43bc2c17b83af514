//! Convert tool-specific Markdown back into a neutral resource
//!
//! Accepts Cursor `.mdc`, Copilot `.instructions.md` / `.prompt.md` and plain
//! `.md` files. Each file becomes one item. Front matter is optional; when
//! present it supplies description and scope, and the decoration written by
//! the emitters (heading, enforcement and priority lines) is read back.

use std::collections::BTreeSet;

use arm_fs::PackageFile;
use arm_meta::validation::validate_document;
use arm_meta::{Enforcement, Resource, ResourceItem, ResourceKind, ResourceMetadata};
use serde::Deserialize;

use crate::emitter::{ENFORCEMENT_LABEL, PRIORITY_LABEL};
use crate::error::{Error, Result};
use crate::naming::sanitize_filename;

const SCOPE_LABEL: &str = "**Applies to:**";

/// Identity of the resource being produced.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub kind: ResourceKind,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Front matter keys understood across the supported tools.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrontMatter {
    name: Option<String>,
    description: Option<String>,
    globs: Option<GlobList>,
    apply_to: Option<GlobList>,
    always_apply: Option<bool>,
    enforcement: Option<String>,
    priority: Option<i64>,
    item: Option<ItemFrontMatter>,
}

/// Metadata block written by the markdown target
#[derive(Debug, Default, Deserialize)]
struct ItemFrontMatter {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    enforcement: Option<String>,
    priority: Option<i64>,
    #[serde(default)]
    scope: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GlobList {
    Joined(String),
    List(Vec<String>),
}

impl GlobList {
    fn into_globs(self) -> Vec<String> {
        let raw = match self {
            Self::Joined(s) => s.split(',').map(str::to_string).collect(),
            Self::List(v) => v,
        };
        raw.into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect()
    }
}

/// Convert a set of Markdown files into a single resource.
pub fn convert_files(files: &[PackageFile], options: &ConvertOptions) -> Result<Resource> {
    if files.is_empty() {
        return Err(Error::Convert {
            path: options.id.clone(),
            message: "no input files".to_string(),
        });
    }

    let mut seen = BTreeSet::new();
    let mut items = Vec::with_capacity(files.len());
    for file in files {
        let item = convert_file(file, options.kind)?;
        if !seen.insert(item.id.clone()) {
            return Err(Error::Convert {
                path: file.path.as_str().to_string(),
                message: format!("duplicate item id '{}'", item.id),
            });
        }
        items.push(item);
    }
    items.sort_by(|a, b| a.id.cmp(&b.id));

    let resource = Resource {
        api_version: arm_meta::schema::API_VERSION.to_string(),
        kind: options.kind,
        metadata: ResourceMetadata {
            id: options.id.clone(),
            name: options.name.clone(),
            description: options.description.clone(),
        },
        items,
    };

    // Re-validate so that conversion can never emit a document compile rejects
    validate_document(resource.to_document()).map_err(|e| Error::Convert {
        path: options.id.clone(),
        message: e.to_string(),
    })
}

/// Convert one Markdown file into a resource item.
pub fn convert_file(file: &PackageFile, kind: ResourceKind) -> Result<ResourceItem> {
    let path = file.path.as_str();
    let fail = |message: String| Error::Convert {
        path: path.to_string(),
        message,
    };

    let text = file
        .text()
        .ok_or_else(|| fail("file is not valid UTF-8".to_string()))?;
    let (front_text, body_text) = split_front_matter(text);
    let front = match front_text {
        Some(raw) => parse_front_matter(raw),
        None => FrontMatter::default(),
    };
    let item_meta = front.item.unwrap_or_default();

    let id = item_meta
        .id
        .clone()
        .unwrap_or_else(|| sanitize_filename(&item_id_from_path(path)));
    let description = item_meta.description.or(front.description);

    let mut decoration = parse_decoration(body_text, description.as_deref());

    let enforcement_text = item_meta
        .enforcement
        .or(front.enforcement)
        .or(decoration.enforcement.take());
    let enforcement = match (kind, enforcement_text) {
        (ResourceKind::Ruleset, Some(raw)) => Some(
            Enforcement::parse(&raw.trim().to_ascii_lowercase())
                .ok_or_else(|| fail(format!("invalid enforcement '{raw}'")))?,
        ),
        _ => None,
    };

    let scope_files = if !item_meta.scope.is_empty() {
        item_meta.scope
    } else if let Some(globs) = front.globs.map(GlobList::into_globs).filter(|g| !g.is_empty()) {
        globs
    } else if let Some(globs) = front.apply_to.map(GlobList::into_globs) {
        // Copilot's "everything" glob carries no scope
        globs.into_iter().filter(|g| g != "**" && g != "**/*").collect()
    } else {
        decoration.scope
    };
    if front.always_apply == Some(true) && !scope_files.is_empty() {
        tracing::debug!(path, "alwaysApply set alongside globs; keeping globs");
    }

    let name = item_meta
        .name
        .or(front.name)
        .or(decoration.heading)
        .unwrap_or_else(|| id.clone());

    if decoration.body.trim().is_empty() {
        return Err(fail("body is empty".to_string()));
    }

    Ok(ResourceItem {
        id,
        name,
        description,
        priority: item_meta.priority.or(front.priority).or(decoration.priority),
        enforcement,
        scope_files,
        body: decoration.body,
    })
}

/// Split `---` fenced front matter from the rest of the text.
fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(front), body);
        }
        offset += line.len();
    }
    // Unterminated fence: treat everything as body
    (None, text)
}

fn parse_front_matter(raw: &str) -> FrontMatter {
    match serde_yaml::from_str::<Option<FrontMatter>>(raw) {
        Ok(front) => front.unwrap_or_default(),
        Err(e) => {
            // Cursor writes unquoted globs like `**/*.ts`, which are not valid YAML
            tracing::debug!(error = %e, "Front matter is not YAML; reading key/value lines");
            parse_front_matter_lines(raw)
        }
    }
}

fn parse_front_matter_lines(raw: &str) -> FrontMatter {
    let mut front = FrontMatter::default();
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key.trim() {
            "name" => front.name = Some(value),
            "description" => front.description = Some(value),
            "globs" => front.globs = Some(GlobList::Joined(value)),
            "applyTo" => front.apply_to = Some(GlobList::Joined(value)),
            "alwaysApply" => front.always_apply = value.parse().ok(),
            "enforcement" => front.enforcement = Some(value),
            "priority" => front.priority = value.parse().ok(),
            _ => {}
        }
    }
    front
}

#[derive(Debug, Default)]
struct Decoration {
    heading: Option<String>,
    enforcement: Option<String>,
    priority: Option<i64>,
    scope: Vec<String>,
    body: String,
}

/// Read back the heading and metadata lines an emitter puts before the body.
fn parse_decoration(text: &str, description: Option<&str>) -> Decoration {
    let mut decoration = Decoration::default();
    let mut rest = text.trim_start();

    if let Some(line) = rest.lines().next()
        && let Some(heading) = line.strip_prefix("# ")
    {
        decoration.heading = Some(heading.trim().to_string());
        rest = rest[line.len()..].trim_start();
    }

    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty())
        && let Some(after) = rest.strip_prefix(description)
        && (after.is_empty() || after.starts_with('\n'))
    {
        rest = after.trim_start();
    }

    loop {
        let Some(line) = rest.lines().next() else {
            break;
        };
        if let Some(value) = line.strip_prefix(ENFORCEMENT_LABEL) {
            decoration.enforcement = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix(PRIORITY_LABEL) {
            decoration.priority = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix(SCOPE_LABEL) {
            decoration.scope = GlobList::Joined(value.to_string()).into_globs();
        } else {
            break;
        }
        rest = rest[line.len()..].trim_start();
    }

    decoration.body = rest.trim_end().to_string();
    decoration
}

/// File stem with tool-specific double extensions removed.
fn item_id_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    for suffix in [".instructions.md", ".prompt.md", ".mdc", ".md", ".markdown"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            return stem.to_string();
        }
    }
    name.split('.').next().unwrap_or(name).to_string()
}
