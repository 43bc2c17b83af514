//! Sandbox wiring an [`Arm`] to in-memory registries inside a temp project.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use arm_compiler::CompileTarget;
use arm_core::{
    Arm, InstallRequest, Layout, PackageKey, PackageOutcome, PackageSpec, RegistryFactory,
    SinkConfig,
};
use arm_fs::PackageFile;
use arm_registry::{ContentCache, MemoryRegistry, RegistryConfig, RegistryDriver, Version};
use arm_test_utils::project::TestProject;
use arm_test_utils::resources::ruleset_yaml;

/// Hands out in-memory registries by manifest name.
#[derive(Clone, Default)]
pub struct MemoryRegistries(BTreeMap<String, MemoryRegistry>);

impl RegistryFactory for MemoryRegistries {
    fn open(
        &self,
        name: &str,
        _config: &RegistryConfig,
        _cache: &ContentCache,
    ) -> arm_registry::Result<Box<dyn RegistryDriver>> {
        match self.0.get(name) {
            Some(registry) => Ok(Box::new(registry.clone())),
            None => Err(arm_registry::Error::InvalidConfig {
                registry: name.to_string(),
                message: "no in-memory registry with that name".to_string(),
            }),
        }
    }
}

pub struct Sandbox {
    pub project: TestProject,
    pub registries: MemoryRegistries,
}

impl Sandbox {
    /// A project with one registry `reg` and no sinks.
    pub fn new() -> Self {
        Self::with_registries(&["reg"])
    }

    pub fn with_registries(names: &[&str]) -> Self {
        let registries = MemoryRegistries(
            names
                .iter()
                .map(|name| (name.to_string(), MemoryRegistry::new(*name)))
                .collect(),
        );
        let sandbox = Self {
            project: TestProject::new(),
            registries,
        };
        for name in names {
            sandbox
                .arm()
                .add_registry(name, registry_config(name), false)
                .unwrap();
        }
        sandbox
    }

    /// A fresh service over the same files, like a new CLI invocation.
    pub fn arm(&self) -> Arm {
        Arm::new(self.project.manifest_path(), self.project.cache_dir())
            .with_registry_factory(Arc::new(self.registries.clone()))
    }

    pub fn registry(&self, name: &str) -> &MemoryRegistry {
        &self.registries.0[name]
    }

    pub fn reg(&self) -> &MemoryRegistry {
        self.registry("reg")
    }

    pub fn add_sink(&self, name: &str, directory: &str, layout: Layout, target: CompileTarget) {
        self.arm()
            .add_sink(name, SinkConfig::new(directory, layout, target), false)
            .unwrap();
    }

    /// A hierarchical cursor sink.
    pub fn add_cursor_sink(&self, name: &str, directory: &str) {
        self.add_sink(name, directory, Layout::Hierarchical, CompileTarget::Cursor);
    }

    pub fn install(&self, spec: &str, sinks: &[&str]) -> arm_core::Result<PackageOutcome> {
        let request = InstallRequest::new(
            PackageSpec::parse(spec)?,
            sinks.iter().map(|s| s.to_string()).collect(),
        );
        self.arm().install(&request)
    }

    /// Cache key the registry's content is stored under.
    pub fn cache_key(&self, registry: &str) -> String {
        registry_config(registry).cache_key()
    }

    pub fn cache(&self) -> ContentCache {
        ContentCache::new(self.project.cache_dir())
    }

    pub fn lock_entry(&self, package: &str) -> serde_json::Value {
        self.project.read_json("arm-lock.json")["dependencies"][package].clone()
    }
}

pub fn registry_config(name: &str) -> RegistryConfig {
    RegistryConfig::git(format!("https://rules.example.com/{name}.git"), Vec::new())
}

pub fn key(text: &str) -> PackageKey {
    PackageKey::parse(text).unwrap()
}

/// One single-rule ruleset file per name, `<name>.yml`.
pub fn rule_files(names: &[&str], body: &str) -> Vec<PackageFile> {
    names
        .iter()
        .map(|name| {
            PackageFile::new(
                format!("{name}.yml").as_str(),
                ruleset_yaml(name, &[(name, body)]),
            )
        })
        .collect()
}

pub fn publish(registry: &MemoryRegistry, package: &str, tag: &str, files: &[&str]) -> Version {
    registry
        .publish(package, tag, rule_files(files, &format!("{package} {tag}")))
        .unwrap()
}
