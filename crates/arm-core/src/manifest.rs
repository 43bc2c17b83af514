//! The manifest: declarative registries, sinks and dependencies
//!
//! ```json
//! {
//!   "version": 1,
//!   "registries": { "team": { "type": "git", "url": "https://github.com/acme/rules" } },
//!   "sinks": { "cursor": { "directory": ".cursor/rules", "compileTarget": "cursor" } },
//!   "dependencies": {
//!     "team/python": { "type": "ruleset", "version": "^1.0.0", "priority": 200, "sinks": ["cursor"] }
//!   }
//! }
//! ```
//!
//! Unknown keys at every level are kept in `extra` maps and written back.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use arm_compiler::CompileTarget;
use arm_fs::{NormalizedPath, io};
use arm_meta::ResourceKind;
use arm_registry::{Constraint, RegistryConfig, RegistryKind, validate_pattern};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::package::PackageKey;

pub const MANIFEST_ENV: &str = "ARM_MANIFEST_PATH";
pub const MANIFEST_FILE: &str = "arm.json";
pub const LEGACY_MANIFEST_FILE: &str = "arm-manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// Ruleset priority used when the manifest names none.
pub const DEFAULT_PRIORITY: i64 = 100;

/// Priorities fit the four-digit field of flat file names.
pub const PRIORITY_RANGE: RangeInclusive<i64> = 0..=9999;

pub fn check_priority(priority: i64) -> Result<()> {
    if PRIORITY_RANGE.contains(&priority) {
        Ok(())
    } else {
        Err(Error::invalid_config(format!(
            "priority {priority} is outside {}..={}",
            PRIORITY_RANGE.start(),
            PRIORITY_RANGE.end()
        )))
    }
}

fn default_version() -> u32 {
    MANIFEST_VERSION
}

/// How a sink arranges installed files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<sink>/arm/<registry>/<package>/<version>/...`
    #[default]
    Hierarchical,
    /// Prefixed file names directly under the sink directory
    Flat,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::Flat => "flat",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hierarchical" => Ok(Self::Hierarchical),
            "flat" => Ok(Self::Flat),
            other => Err(Error::invalid_config(format!(
                "unknown layout '{other}' (expected hierarchical or flat)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkConfig {
    /// Output directory, relative to the manifest's directory unless absolute
    pub directory: String,
    #[serde(default)]
    pub layout: Layout,
    pub compile_target: CompileTarget,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SinkConfig {
    pub fn new(directory: impl Into<String>, layout: Layout, compile_target: CompileTarget) -> Self {
        Self {
            directory: directory.into(),
            layout,
            compile_target,
            extra: Map::new(),
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.directory.trim().is_empty() {
            return Err(Error::invalid_config(format!(
                "sink '{name}' requires a directory"
            )));
        }
        if self.extra.contains_key("tool") {
            return Err(Error::invalid_config(format!(
                "sink '{name}' uses the unsupported 'tool' key; use layout and compileTarget"
            )));
        }
        Ok(())
    }

    /// Absolute output directory for a project rooted at `project_root`.
    pub fn resolve_directory(&self, project_root: &Path) -> PathBuf {
        let directory = Path::new(&self.directory);
        if directory.is_absolute() {
            directory.to_path_buf()
        } else {
            project_root.join(directory)
        }
    }

    /// Lexical form of `directory`, equal for any two spellings of one path.
    fn directory_key(&self) -> PathBuf {
        let mut key = PathBuf::new();
        for component in Path::new(self.directory.trim()).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir
                    if matches!(key.components().next_back(), Some(Component::Normal(_))) =>
                {
                    key.pop();
                }
                other => key.push(other.as_os_str()),
            }
        }
        key
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConfig {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Normalized constraint
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default)]
    pub sinks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DependencyConfig {
    pub fn new(kind: ResourceKind, constraint: &Constraint, sinks: Vec<String>) -> Self {
        Self {
            kind,
            version: constraint.to_string(),
            priority: None,
            sinks,
            include: Vec::new(),
            exclude: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn constraint(&self) -> Result<Constraint> {
        Ok(Constraint::parse(&self.version)?)
    }

    /// Priority used for flat names; rulesets only.
    pub fn effective_priority(&self) -> Option<i64> {
        match self.kind {
            ResourceKind::Ruleset => Some(self.priority.unwrap_or(DEFAULT_PRIORITY)),
            ResourceKind::Promptset => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub registries: BTreeMap<String, RegistryConfig>,
    #[serde(default)]
    pub sinks: BTreeMap<String, SinkConfig>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            registries: BTreeMap::new(),
            sinks: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl Manifest {
    /// Parse and validate a manifest document.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(content)
            .map_err(|e| Error::invalid_config(format!("malformed manifest: {e}")))?;

        // Catch the legacy sink form before serde reports a missing field
        if let Some(sinks) = raw.get("sinks").and_then(Value::as_object) {
            for (name, sink) in sinks {
                if sink.get("tool").is_some() {
                    return Err(Error::invalid_config(format!(
                        "sink '{name}' uses the unsupported 'tool' key; use layout and compileTarget"
                    )));
                }
            }
        }

        let manifest: Manifest = serde_json::from_value(raw)
            .map_err(|e| Error::invalid_config(format!("malformed manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check cross references: every dependency names a known registry and
    /// known sinks, and carries a parseable constraint.
    pub fn validate(&self) -> Result<()> {
        for (name, registry) in &self.registries {
            registry.validate(name)?;
        }
        for (name, sink) in &self.sinks {
            sink.validate(name)?;
            self.ensure_distinct_directory(name, sink)?;
        }
        for (key, dependency) in &self.dependencies {
            let package = PackageKey::parse(key)?;
            if !self.registries.contains_key(&package.registry) {
                return Err(Error::invalid_config(format!(
                    "dependency '{key}' uses unknown registry '{}'",
                    package.registry
                )));
            }
            if let Some(sink) = dependency.sinks.iter().find(|s| !self.sinks.contains_key(*s)) {
                return Err(Error::invalid_config(format!(
                    "dependency '{key}' uses unknown sink '{sink}'"
                )));
            }
            dependency
                .constraint()
                .map_err(|e| Error::invalid_config(format!("dependency '{key}': {e}")))?;
            if let Some(priority) = dependency.priority {
                check_priority(priority)?;
            }
            for pattern in dependency.include.iter().chain(&dependency.exclude) {
                validate_pattern(pattern)?;
            }
        }
        Ok(())
    }

    pub fn registry(&self, name: &str) -> Result<&RegistryConfig> {
        self.registries
            .get(name)
            .ok_or_else(|| Error::not_found("registry", name))
    }

    pub fn sink(&self, name: &str) -> Result<&SinkConfig> {
        self.sinks
            .get(name)
            .ok_or_else(|| Error::not_found("sink", name))
    }

    pub fn dependency(&self, key: &PackageKey) -> Result<&DependencyConfig> {
        self.dependencies
            .get(&key.to_string())
            .ok_or_else(|| Error::not_found("dependency", key.to_string()))
    }

    pub fn add_registry(&mut self, name: &str, config: RegistryConfig, force: bool) -> Result<()> {
        config.validate(name)?;
        if self.registries.contains_key(name) && !force {
            return Err(Error::already_exists("registry", name));
        }
        self.registries.insert(name.to_string(), config);
        Ok(())
    }

    pub fn remove_registry(&mut self, name: &str) -> Result<RegistryConfig> {
        self.registries
            .remove(name)
            .ok_or_else(|| Error::not_found("registry", name))
    }

    /// Change one field of a registry.
    pub fn set_registry_field(&mut self, name: &str, field: &str, value: &str) -> Result<()> {
        let registry = self
            .registries
            .get_mut(name)
            .ok_or_else(|| Error::not_found("registry", name))?;
        let text = || Some(value.to_string());
        match field {
            "type" => {
                registry.kind = RegistryKind::from_str(value).map_err(Error::invalid_config)?;
            }
            "url" => registry.url = text(),
            "branches" => registry.branches = split_list(value),
            "projectId" => registry.project_id = text(),
            "groupId" => registry.group_id = text(),
            "apiVersion" => registry.api_version = text(),
            "owner" => registry.owner = text(),
            "repository" => registry.repository = text(),
            other => {
                return Err(Error::invalid_config(format!(
                    "unknown registry field '{other}'"
                )));
            }
        }
        registry.validate(name)?;
        Ok(())
    }

    pub fn add_sink(&mut self, name: &str, config: SinkConfig, force: bool) -> Result<()> {
        config.validate(name)?;
        if self.sinks.contains_key(name) && !force {
            return Err(Error::already_exists("sink", name));
        }
        self.ensure_distinct_directory(name, &config)?;
        self.sinks.insert(name.to_string(), config);
        Ok(())
    }

    /// Two sinks writing one directory would delete each other's files on
    /// every sync, so a directory belongs to at most one sink.
    fn ensure_distinct_directory(&self, name: &str, config: &SinkConfig) -> Result<()> {
        let key = config.directory_key();
        match self
            .sinks
            .iter()
            .find(|(other, sink)| other.as_str() != name && sink.directory_key() == key)
        {
            Some((other, _)) => Err(Error::invalid_config(format!(
                "sinks '{other}' and '{name}' share directory '{}'",
                config.directory
            ))),
            None => Ok(()),
        }
    }

    pub fn remove_sink(&mut self, name: &str) -> Result<SinkConfig> {
        self.sinks
            .remove(name)
            .ok_or_else(|| Error::not_found("sink", name))
    }

    pub fn set_sink_field(&mut self, name: &str, field: &str, value: &str) -> Result<()> {
        let mut sink = self.sink(name)?.clone();
        match field {
            "directory" => sink.directory = value.to_string(),
            "layout" => sink.layout = value.parse::<Layout>()?,
            "compileTarget" => sink.compile_target = value.parse::<CompileTarget>()?,
            other => {
                return Err(Error::invalid_config(format!("unknown sink field '{other}'")));
            }
        }
        sink.validate(name)?;
        self.ensure_distinct_directory(name, &sink)?;
        self.sinks.insert(name.to_string(), sink);
        Ok(())
    }

    /// Insert or replace a dependency.
    pub fn upsert_dependency(&mut self, key: &PackageKey, config: DependencyConfig) -> Result<()> {
        self.registry(&key.registry)?;
        for sink in &config.sinks {
            self.sink(sink)?;
        }
        if let Some(priority) = config.priority {
            check_priority(priority)?;
        }
        self.dependencies.insert(key.to_string(), config);
        Ok(())
    }

    pub fn remove_dependency(&mut self, key: &PackageKey) -> Result<DependencyConfig> {
        self.dependencies
            .remove(&key.to_string())
            .ok_or_else(|| Error::not_found("dependency", key.to_string()))
    }

    /// Change one installation-affecting field of a dependency.
    ///
    /// Only the manifest changes; reinstalling is the caller's job.
    pub fn set_dependency_field(&mut self, key: &PackageKey, field: &str, value: &str) -> Result<()> {
        let sinks = self.sinks.clone();
        let dependency = self
            .dependencies
            .get_mut(&key.to_string())
            .ok_or_else(|| Error::not_found("dependency", key.to_string()))?;
        match field {
            "version" => dependency.version = Constraint::parse(value)?.to_string(),
            "priority" => {
                let priority = value.parse::<i64>().map_err(|_| {
                    Error::invalid_config(format!("priority '{value}' is not an integer"))
                })?;
                if dependency.kind != ResourceKind::Ruleset {
                    return Err(Error::invalid_config("only rulesets have a priority"));
                }
                check_priority(priority)?;
                dependency.priority = Some(priority);
            }
            "sinks" => {
                let names = split_list(value);
                if names.is_empty() {
                    return Err(Error::invalid_config("a dependency needs at least one sink"));
                }
                if let Some(missing) = names.iter().find(|n| !sinks.contains_key(*n)) {
                    return Err(Error::not_found("sink", missing.clone()));
                }
                dependency.sinks = names;
            }
            "include" | "exclude" => {
                let patterns = split_list(value);
                for pattern in &patterns {
                    validate_pattern(pattern)?;
                }
                if field == "include" {
                    dependency.include = patterns;
                } else {
                    dependency.exclude = patterns;
                }
            }
            other => {
                return Err(Error::invalid_config(format!(
                    "unknown dependency field '{other}'"
                )));
            }
        }
        Ok(())
    }

    /// Dependencies whose registry is `registry`.
    pub fn dependencies_of_registry(&self, registry: &str) -> Vec<PackageKey> {
        self.dependency_keys()
            .into_iter()
            .filter(|k| k.registry == registry)
            .collect()
    }

    /// Dependencies installed to `sink`.
    pub fn dependencies_in_sink(&self, sink: &str) -> Vec<PackageKey> {
        self.dependencies
            .iter()
            .filter(|(_, d)| d.sinks.iter().any(|s| s == sink))
            .filter_map(|(k, _)| PackageKey::parse(k).ok())
            .collect()
    }

    pub fn dependency_keys(&self) -> Vec<PackageKey> {
        self.dependencies
            .keys()
            .filter_map(|k| PackageKey::parse(k).ok())
            .collect()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads and writes the manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate the manifest for a project directory.
    ///
    /// `ARM_MANIFEST_PATH` wins; otherwise `arm.json`, falling back to a
    /// legacy `arm-manifest.json` when only that exists.
    pub fn discover(project_dir: &Path) -> Self {
        if let Some(path) = std::env::var_os(MANIFEST_ENV).filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            let path = if path.is_absolute() {
                path
            } else {
                project_dir.join(path)
            };
            return Self::new(path);
        }
        let current = project_dir.join(MANIFEST_FILE);
        let legacy = project_dir.join(LEGACY_MANIFEST_FILE);
        if !current.exists() && legacy.exists() {
            tracing::debug!(path = %legacy.display(), "Using legacy manifest name");
            return Self::new(legacy);
        }
        Self::new(current)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory relative sink paths are resolved against.
    pub fn project_root(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the manifest; a missing file is `NotFound`.
    pub fn load(&self) -> Result<Manifest> {
        if !self.exists() {
            return Err(Error::not_found("manifest", self.path.display().to_string()));
        }
        let content = io::read_text(&NormalizedPath::new(&self.path))?;
        Manifest::parse(&content).map_err(|e| match e {
            Error::InvalidConfig { message } => Error::invalid_config(format!(
                "{}: {message}",
                self.path.display()
            )),
            other => other,
        })
    }

    /// Read the manifest, or an empty one when the file does not exist yet.
    pub fn load_or_default(&self) -> Result<Manifest> {
        if self.exists() {
            self.load()
        } else {
            Ok(Manifest::default())
        }
    }

    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        io::write_json(&NormalizedPath::new(&self.path), manifest)?;
        tracing::debug!(path = %self.path.display(), "Wrote manifest");
        Ok(())
    }

    /// Read-modify-write. The document is written only if `f` succeeds.
    pub fn update<T>(&self, f: impl FnOnce(&mut Manifest) -> Result<T>) -> Result<T> {
        let mut manifest = self.load_or_default()?;
        let out = f(&mut manifest)?;
        self.save(&manifest)?;
        Ok(out)
    }
}
