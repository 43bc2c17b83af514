//! The `compile` and `convert` verbs, which work on local files only

use std::path::{Path, PathBuf};

use arm_compiler::{CompileFailure, CompileOptions, CompileTarget, Compiler, ConvertOptions, convert_files};
use arm_fs::file::{read_tree, write_tree};
use arm_fs::{NormalizedPath, PackageFile, io};
use arm_meta::ResourceKind;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct LocalCompileOptions {
    pub target: CompileTarget,
    /// Reject documents of the other kind
    pub kind: Option<ResourceKind>,
    pub fail_fast: bool,
}

#[derive(Debug, Default)]
pub struct LocalCompileReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<CompileFailure>,
}

impl LocalCompileReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compile resource files and directories into `output`.
///
/// Directory inputs keep their relative layout. Files that compile are
/// written even when others fail, unless `fail_fast` is set.
pub fn compile_paths(
    inputs: &[PathBuf],
    output: &Path,
    options: &LocalCompileOptions,
) -> Result<LocalCompileReport> {
    let sources = collect(inputs, |_| true)?;
    let compiler = Compiler::new(options.target);
    let report = compiler.compile_files(
        &sources,
        CompileOptions {
            expected_kind: options.kind,
            fail_fast: options.fail_fast,
            passthrough: false,
        },
    )?;

    write_tree(output, &report.outputs)?;
    let written = report
        .outputs
        .iter()
        .map(|f| output.join(f.path.to_native()))
        .collect();
    tracing::info!(
        target = %options.target,
        written = report.outputs.len(),
        failed = report.failures.len(),
        "Compiled local resources"
    );
    Ok(LocalCompileReport {
        written,
        failures: report.failures,
    })
}

/// Turn tool markdown into one neutral resource document.
///
/// Returns the YAML text; it is also written to `output` when given.
pub fn convert_paths(
    inputs: &[PathBuf],
    options: &ConvertOptions,
    output: Option<&Path>,
) -> Result<String> {
    let files = collect(inputs, is_markdown)?;
    let resource = convert_files(&files, options)?;
    let yaml = resource.to_yaml()?;
    if let Some(path) = output {
        io::write_atomic(&NormalizedPath::new(path), yaml.as_bytes())?;
    }
    Ok(yaml)
}

fn is_markdown(file: &PackageFile) -> bool {
    matches!(file.path.extension(), Some("md" | "mdc"))
}

/// Read inputs into package files. Explicit files are always taken;
/// directory contents pass through `keep`.
fn collect(inputs: &[PathBuf], keep: impl Fn(&PackageFile) -> bool) -> Result<Vec<PackageFile>> {
    if inputs.is_empty() {
        return Err(Error::invalid_config("no input files given"));
    }
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(read_tree(input)?.into_iter().filter(|f| keep(f)));
        } else if input.is_file() {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::invalid_config(format!("{} has no file name", input.display())))?;
            let content = std::fs::read(input).map_err(|e| arm_fs::Error::io(input, e))?;
            files.push(PackageFile::new(name.as_str(), content));
        } else {
            return Err(Error::not_found("input", input.display().to_string()));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_test_utils::resources::{promptset_yaml, ruleset_yaml};
    use tempfile::TempDir;

    fn options(target: CompileTarget) -> LocalCompileOptions {
        LocalCompileOptions {
            target,
            kind: None,
            fail_fast: false,
        }
    }

    #[test]
    fn compiles_directory_preserving_layout() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("python")).unwrap();
        std::fs::write(src.join("python/style.yml"), ruleset_yaml("style", &[("naming", "Use snake_case")])).unwrap();
        std::fs::write(src.join("notes.txt"), "ignored").unwrap();

        let out = temp.path().join("out");
        let report = compile_paths(&[src], &out, &options(CompileTarget::Cursor)).unwrap();

        assert!(report.is_success());
        assert!(out.join("python/style.mdc").is_file());
        assert!(!out.join("notes.txt").exists());
    }

    #[test]
    fn collects_failures_and_keeps_going() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good.yml");
        let bad = temp.path().join("bad.yml");
        std::fs::write(&good, ruleset_yaml("good", &[("one", "Body")])).unwrap();
        std::fs::write(&bad, "apiVersion: v1\nkind: Ruleset\n").unwrap();

        let out = temp.path().join("out");
        let report = compile_paths(&[good, bad], &out, &options(CompileTarget::Markdown)).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "bad.yml");
        assert_eq!(report.written.len(), 1);
    }

    #[test]
    fn fail_fast_stops_at_first_error() {
        let temp = TempDir::new().unwrap();
        let bad = temp.path().join("bad.yml");
        std::fs::write(&bad, "not: [a resource").unwrap();

        let mut opts = options(CompileTarget::Cursor);
        opts.fail_fast = true;
        let err = compile_paths(&[bad], &temp.path().join("out"), &opts).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::CompileError);
    }

    #[test]
    fn kind_filter_rejects_other_documents() {
        let temp = TempDir::new().unwrap();
        let prompts = temp.path().join("prompts.yml");
        std::fs::write(&prompts, promptset_yaml("p", &[("ask", "Ask nicely")])).unwrap();

        let mut opts = options(CompileTarget::Cursor);
        opts.kind = Some(ResourceKind::Ruleset);
        let report = compile_paths(&[prompts], &temp.path().join("out"), &opts).unwrap();
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn missing_input_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = compile_paths(
            &[temp.path().join("nope.yml")],
            &temp.path().join("out"),
            &options(CompileTarget::Cursor),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn converts_markdown_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("rules");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("naming.mdc"), "---\ndescription: Naming\nglobs: \"**/*.py\"\n---\nUse snake_case.\n").unwrap();
        std::fs::write(dir.join("image.png"), [0u8, 1, 2]).unwrap();

        let out = temp.path().join("team.yml");
        let options = ConvertOptions {
            kind: ResourceKind::Ruleset,
            id: "team".into(),
            name: "Team".into(),
            description: None,
        };
        let yaml = convert_paths(&[dir], &options, Some(&out)).unwrap();

        assert!(yaml.contains("kind: Ruleset"));
        assert!(yaml.contains("snake_case"));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), yaml);
    }
}
