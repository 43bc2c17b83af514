//! Compile resource files for one target

use std::collections::BTreeMap;

use arm_fs::PackageFile;
use arm_meta::{Resource, ResourceKind, parse_resource};

use crate::emitter::{Emitter, emitter_for};
use crate::error::{Error, Result};
use crate::naming::{is_compilable, output_path};
use crate::target::CompileTarget;

/// A source file that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub path: String,
    pub message: String,
}

/// Result of compiling a batch of files.
#[derive(Debug, Default)]
pub struct CompileReport {
    /// Compiled outputs plus any passthrough files, in canonical order
    pub outputs: Vec<PackageFile>,
    pub failures: Vec<CompileFailure>,
}

impl CompileReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert the first failure into an error, if any.
    pub fn into_result(self) -> Result<Vec<PackageFile>> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(Error::Compile {
                path: failure.path,
                message: failure.message,
            }),
            None => Ok(self.outputs),
        }
    }
}

/// Options for a batch compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Reject documents whose `kind` differs from this
    pub expected_kind: Option<ResourceKind>,
    /// Stop at the first failing file
    pub fail_fast: bool,
    /// Copy non-resource files through unchanged
    pub passthrough: bool,
}

/// Compiles neutral resource documents into one target's file format.
///
/// Pure transformation: takes file contents in and returns file contents
/// out without touching the filesystem.
pub struct Compiler {
    emitter: Box<dyn Emitter>,
}

impl Compiler {
    pub fn new(target: CompileTarget) -> Self {
        Self {
            emitter: emitter_for(target),
        }
    }

    /// Create a compiler from a target name, failing with `UnsupportedTarget`.
    pub fn for_target_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn target(&self) -> CompileTarget {
        self.emitter.target()
    }

    /// Compile a parsed resource that was read from `source`.
    pub fn compile_resource(&self, source: &PackageFile, resource: &Resource) -> Result<Vec<PackageFile>> {
        let single = resource.items.len() == 1;
        let extension = self.emitter.extension(resource.kind);
        resource
            .items
            .iter()
            .map(|item| {
                let path = output_path(&source.path, &item.id, single, extension);
                let content = self.emitter.render(resource, item)?;
                Ok(PackageFile::new(path, content))
            })
            .collect()
    }

    /// Parse and compile one source file.
    pub fn compile_file(
        &self,
        source: &PackageFile,
        expected_kind: Option<ResourceKind>,
    ) -> Result<Vec<PackageFile>> {
        let path = source.path.as_str();
        let text = source
            .text()
            .ok_or_else(|| Error::compile(path, "file is not valid UTF-8"))?;
        let resource = parse_resource(text).map_err(|e| Error::compile(path, e))?;

        if let Some(expected) = expected_kind
            && resource.kind != expected
        {
            return Err(Error::compile(
                path,
                format!(
                    "document kind is {} but the package is a {}",
                    resource.kind, expected
                ),
            ));
        }

        tracing::debug!(
            path,
            target = %self.target(),
            items = resource.items.len(),
            "Compiling resource"
        );
        self.compile_resource(source, &resource)
    }

    /// Compile every compilable file in a batch.
    ///
    /// Per-file failures are collected in the report unless `fail_fast` is
    /// set, in which case the first one is returned as an error. Two sources
    /// that produce the same output path are reported as a failure of the
    /// later source.
    pub fn compile_files(&self, files: &[PackageFile], options: CompileOptions) -> Result<CompileReport> {
        let mut report = CompileReport::default();
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();

        for source in files {
            let outputs = if is_compilable(&source.path) {
                match self.compile_file(source, options.expected_kind) {
                    Ok(outputs) => outputs,
                    Err(e) if options.fail_fast => return Err(e),
                    Err(e) => {
                        tracing::warn!(path = source.path.as_str(), error = %e, "Compile failed");
                        report.failures.push(failure_from(source, e));
                        continue;
                    }
                }
            } else if options.passthrough {
                vec![source.clone()]
            } else {
                continue;
            };

            let clash = outputs
                .iter()
                .find_map(|out| claimed.get(out.path.as_str()).map(|owner| (out, owner)));
            if let Some((out, owner)) = clash {
                let err = Error::compile(
                    source.path.as_str(),
                    format!("output {} is also produced by {}", out.path.as_str(), owner),
                );
                if options.fail_fast {
                    return Err(err);
                }
                report.failures.push(failure_from(source, err));
                continue;
            }

            for out in outputs {
                claimed.insert(out.path.as_str().to_string(), source.path.as_str().to_string());
                report.outputs.push(out);
            }
        }

        arm_fs::file::sort_canonical(&mut report.outputs);
        Ok(report)
    }
}

fn failure_from(source: &PackageFile, err: Error) -> CompileFailure {
    let message = match err {
        Error::Compile { message, .. } => message,
        other => other.to_string(),
    };
    CompileFailure {
        path: source.path.as_str().to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ruleset(id: &str, items: &[&str]) -> String {
        let mut text = format!("apiVersion: v1\nkind: Ruleset\nmetadata: {{id: {id}, name: {id}}}\nspec:\n  rules:\n");
        for item in items {
            text.push_str(&format!("    {item}: {{name: {item}, body: Body of {item}}}\n"));
        }
        text
    }

    fn paths(files: &[PackageFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn compiles_one_file_per_item() {
        let compiler = Compiler::new(CompileTarget::Cursor);
        let source = PackageFile::new("rules/clean.yml", ruleset("clean", &["a", "b"]));
        let outputs = compiler.compile_file(&source, None).unwrap();
        assert_eq!(paths(&outputs), vec!["rules/clean_a.mdc", "rules/clean_b.mdc"]);
    }

    #[test]
    fn kind_mismatch_is_compile_error() {
        let compiler = Compiler::new(CompileTarget::Cursor);
        let source = PackageFile::new("clean.yml", ruleset("clean", &["a"]));
        let err = compiler
            .compile_file(&source, Some(ResourceKind::Promptset))
            .unwrap_err();
        assert!(matches!(err, Error::Compile { ref path, .. } if path == "clean.yml"));
    }

    #[test]
    fn batch_collects_failures_and_continues() {
        let compiler = Compiler::new(CompileTarget::AmazonQ);
        let files = vec![
            PackageFile::new("bad.yml", "apiVersion: v1\nkind: Ruleset\n"),
            PackageFile::new("good.yml", ruleset("good", &["x"])),
            PackageFile::new("README.md", "readme"),
        ];
        let report = compiler.compile_files(&files, CompileOptions::default()).unwrap();
        assert_eq!(paths(&report.outputs), vec!["good.md"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "bad.yml");
    }

    #[test]
    fn batch_fail_fast_returns_first_error() {
        let compiler = Compiler::new(CompileTarget::AmazonQ);
        let files = vec![
            PackageFile::new("bad.yml", "kind: ["),
            PackageFile::new("good.yml", ruleset("good", &["x"])),
        ];
        let options = CompileOptions {
            fail_fast: true,
            ..Default::default()
        };
        assert!(compiler.compile_files(&files, options).is_err());
    }

    #[test]
    fn passthrough_keeps_other_files() {
        let compiler = Compiler::new(CompileTarget::Markdown);
        let files = vec![
            PackageFile::new("a.yml", ruleset("a", &["x"])),
            PackageFile::new("notes.txt", "n"),
        ];
        let options = CompileOptions {
            passthrough: true,
            ..Default::default()
        };
        let report = compiler.compile_files(&files, options).unwrap();
        assert_eq!(paths(&report.outputs), vec!["a.md", "notes.txt"]);
    }

    #[test]
    fn output_clash_is_reported() {
        let compiler = Compiler::new(CompileTarget::Markdown);
        let files = vec![
            PackageFile::new("a.yml", ruleset("a", &["x"])),
            PackageFile::new("a.yaml", ruleset("a", &["x"])),
        ];
        let report = compiler.compile_files(&files, CompileOptions::default()).unwrap();
        assert_eq!(report.outputs.len(), 1);
        assert_eq!(report.failures[0].path, "a.yaml");
    }

    #[test]
    fn unknown_target_name_is_rejected() {
        assert!(matches!(
            Compiler::for_target_name("emacs"),
            Err(Error::UnsupportedTarget { .. })
        ));
    }
}
