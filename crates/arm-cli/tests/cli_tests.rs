//! End-to-end tests that run the compiled `arm` binary.

use std::path::{Path, PathBuf};

use arm_test_utils::git::GitRemote;
use arm_test_utils::resources::ruleset_yaml;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A project directory plus a private content cache.
struct Workspace {
    project: TempDir,
    cache: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            project: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.project.path()
    }

    fn arm(&self) -> Command {
        let mut cmd = Command::cargo_bin("arm").unwrap();
        cmd.current_dir(self.project.path())
            .env_remove("ARM_MANIFEST_PATH")
            .env_remove("RUST_LOG")
            .env("ARM_CACHE_DIR", self.cache.path())
            .env("NO_COLOR", "1");
        cmd
    }

    fn manifest(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.path().join("arm.json")).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn add_git_registry(&self, name: &str, remote: &GitRemote) {
        self.arm()
            .args(["add", "registry", name, "--type", "git", "--url"])
            .arg(remote.url())
            .assert()
            .success();
    }

    fn add_cursor_sink(&self, name: &str, directory: &str) {
        self.arm()
            .args(["add", "sink", name, "--directory", directory, "--compile-target", "cursor"])
            .assert()
            .success();
    }
}

fn rules_remote() -> GitRemote {
    let remote = GitRemote::new();
    remote.commit(
        &[("python.yml", &ruleset_yaml("python", &[("naming", "Use snake_case")]))],
        "first",
    );
    remote.tag("v1.0.0");
    remote
}

#[test]
fn test_help_lists_verbs() {
    Command::cargo_bin("arm")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("outdated"))
        .stdout(predicate::str::contains("compile"));
}

#[test]
fn test_version_prints_package_version() {
    Command::cargo_bin("arm")
        .unwrap()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_add_registry_and_sink_then_list() {
    let ws = Workspace::new();
    let remote = rules_remote();
    ws.add_git_registry("team", &remote);
    ws.add_cursor_sink("cursor", ".cursor/rules");

    let manifest = ws.manifest();
    assert_eq!(manifest["registries"]["team"]["type"], "git");
    assert_eq!(manifest["sinks"]["cursor"]["directory"], ".cursor/rules");

    ws.arm()
        .args(["list", "sinks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cursor"))
        .stdout(predicate::str::contains(".cursor/rules"));
}

#[test]
fn test_adding_duplicate_registry_fails_without_force() {
    let ws = Workspace::new();
    let remote = rules_remote();
    ws.add_git_registry("team", &remote);

    ws.arm()
        .args(["add", "registry", "team", "--type", "git", "--url"])
        .arg(remote.url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[AlreadyExists]"));

    ws.arm()
        .args(["add", "registry", "team", "--type", "git", "--force", "--url"])
        .arg(remote.url())
        .assert()
        .success();
}

#[test]
fn test_install_without_configuration_reports_kind() {
    let ws = Workspace::new();
    ws.arm()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[NoConfiguration]"));
}

#[test]
fn test_install_from_git_registry_writes_sink_and_lockfile() {
    let ws = Workspace::new();
    let remote = rules_remote();
    ws.add_git_registry("team", &remote);
    ws.add_cursor_sink("cursor", ".cursor/rules");

    ws.arm()
        .args(["install", "team/rules@1.0.0", "cursor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("team/rules"));

    let installed = ws.path().join(".cursor/rules/arm/team/rules/1.0.0/python.mdc");
    assert!(installed.is_file());
    let lock = std::fs::read_to_string(ws.path().join("arm-lock.json")).unwrap();
    assert!(lock.contains("team/rules"));
    assert_eq!(ws.manifest()["dependencies"]["team/rules"]["version"], "1.0.0");

    ws.arm()
        .args(["list", "dependencies"])
        .assert()
        .success()
        .stdout(predicate::str::contains("team/rules"));

    ws.arm().args(["uninstall", "team/rules"]).assert().success();
    assert!(!installed.exists());
    assert!(ws.manifest()["dependencies"].get("team/rules").is_none());
}

#[test]
fn test_install_into_unknown_sink_is_not_found() {
    let ws = Workspace::new();
    let remote = rules_remote();
    ws.add_git_registry("team", &remote);

    ws.arm()
        .args(["install", "team/rules", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[NotFound]"));
}

#[test]
fn test_uninstall_missing_package_is_not_found() {
    let ws = Workspace::new();
    let remote = rules_remote();
    ws.add_git_registry("team", &remote);

    ws.arm()
        .args(["uninstall", "team/ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[NotFound]"));
}

#[test]
fn test_set_sink_layout_updates_manifest() {
    let ws = Workspace::new();
    ws.add_cursor_sink("cursor", ".cursor/rules");

    ws.arm()
        .args(["set", "sink", "cursor", "layout", "flat"])
        .assert()
        .success();
    assert_eq!(ws.manifest()["sinks"]["cursor"]["layout"], "flat");

    ws.arm()
        .args(["remove", "sink", "cursor"])
        .assert()
        .success();
    assert!(ws.manifest()["sinks"].get("cursor").is_none());
}

#[test]
fn test_manifest_flag_points_elsewhere() {
    let ws = Workspace::new();
    let other = TempDir::new().unwrap();
    let manifest: PathBuf = other.path().join("arm.json");

    ws.arm()
        .arg("--manifest")
        .arg(&manifest)
        .args(["add", "sink", "md", "--directory", "docs", "--compile-target", "markdown"])
        .assert()
        .success();

    assert!(manifest.is_file());
    assert!(!ws.path().join("arm.json").exists());
}

#[test]
fn test_compile_local_directory() {
    let ws = Workspace::new();
    let src = ws.path().join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(
        src.join("style.yml"),
        ruleset_yaml("style", &[("naming", "Use snake_case")]),
    )
    .unwrap();

    ws.arm()
        .args(["compile", "src", "--target", "cursor", "--output", "out"])
        .assert()
        .success();
    assert!(ws.path().join("out/style.mdc").is_file());
}

#[test]
fn test_compile_rejects_unknown_target() {
    let ws = Workspace::new();
    std::fs::write(ws.path().join("a.yml"), ruleset_yaml("a", &[("r", "Body")])).unwrap();

    ws.arm()
        .args(["compile", "a.yml", "--target", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error["));
}

#[test]
fn test_compile_invalid_document_exits_nonzero() {
    let ws = Workspace::new();
    std::fs::write(ws.path().join("bad.yml"), "apiVersion: v1\nkind: Ruleset\n").unwrap();

    ws.arm()
        .args(["compile", "bad.yml", "--target", "markdown", "--output", "out"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("bad.yml"));
}

#[test]
fn test_convert_prints_yaml() {
    let ws = Workspace::new();
    std::fs::write(
        ws.path().join("naming.md"),
        "---\ndescription: Naming\n---\nUse snake_case.\n",
    )
    .unwrap();

    ws.arm()
        .args(["convert", "naming.md", "--id", "team"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: Ruleset"))
        .stdout(predicate::str::contains("snake_case"));
}

#[test]
fn test_clean_cache_rejects_bad_age() {
    let ws = Workspace::new();
    ws.add_cursor_sink("cursor", ".cursor/rules");

    ws.arm()
        .args(["clean", "cache", "--max-age", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[InvalidConfig]"));
}

#[test]
fn test_second_sink_in_same_directory_is_rejected() {
    let ws = Workspace::new();
    ws.add_cursor_sink("cursor", ".ai");

    ws.arm()
        .args(["add", "sink", "docs", "--directory", "./.ai", "--compile-target", "markdown"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[InvalidConfig]"));
    assert!(ws.manifest()["sinks"].get("docs").is_none());
}
