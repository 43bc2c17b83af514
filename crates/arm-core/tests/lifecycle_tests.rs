//! Uninstall, cascades, reconciliation, rollback and cleaning.

mod common;

use arm_compiler::CompileTarget;
use arm_core::{BatchOptions, ErrorKind, Layout, PackageStatus, parse_age};
use chrono::Utc;
use common::{Sandbox, key, publish};
use pretty_assertions::assert_eq;
use serde_json::json;

fn snapshot(sandbox: &Sandbox, dir: &str) -> Vec<(String, String)> {
    sandbox
        .project
        .files_under(dir)
        .into_iter()
        .map(|f| {
            let content = sandbox.project.read(&format!("{dir}/{f}"));
            (f, content)
        })
        .collect()
}

#[test]
fn install_then_uninstall_restores_sink() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", ".cursor/rules");
    sandbox.project.write(".cursor/rules/mine.mdc", "my own rule\n");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a", "b"]);
    let before = snapshot(&sandbox, ".cursor/rules");

    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();
    sandbox.arm().uninstall(&key("reg/pkg")).unwrap();

    assert_eq!(snapshot(&sandbox, ".cursor/rules"), before);
    sandbox.project.assert_missing(".cursor/rules/arm");
    let manifest = sandbox.project.read_json("arm.json");
    assert_eq!(manifest["dependencies"], json!({}));
    assert_eq!(
        sandbox.project.read_json("arm-lock.json")["dependencies"],
        json!({})
    );
}

#[test]
fn uninstalling_absent_package_is_not_found_every_time() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", ".cursor/rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();

    sandbox.arm().uninstall(&key("reg/pkg")).unwrap();
    for _ in 0..2 {
        let err = sandbox.arm().uninstall(&key("reg/pkg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[test]
fn removing_a_sink_only_touches_that_sink() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("s1", "one");
    sandbox.add_cursor_sink("s2", "two");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["s1", "s2"]).unwrap();
    let two_before = snapshot(&sandbox, "two");

    let report = sandbox.arm().remove_sink("s1").unwrap();

    assert!(matches!(report.status_of("reg/pkg"), Some(PackageStatus::Removed)));
    assert!(sandbox.project.files_under("one").is_empty());
    assert_eq!(snapshot(&sandbox, "two"), two_before);
    let manifest = sandbox.project.read_json("arm.json");
    assert_eq!(manifest["dependencies"]["reg/pkg"]["sinks"], json!(["s2"]));
    assert!(manifest["sinks"].get("s1").is_none());
}

#[test]
fn removing_the_last_sink_drops_the_dependency() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("s1", "one");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["s1"]).unwrap();

    sandbox.arm().remove_sink("s1").unwrap();

    let manifest = sandbox.project.read_json("arm.json");
    assert_eq!(manifest["dependencies"], json!({}));
    assert!(sandbox.lock_entry("reg/pkg").is_null());
}

#[test]
fn removing_a_registry_uninstalls_its_packages() {
    let sandbox = Sandbox::with_registries(&["reg", "other"]);
    sandbox.add_cursor_sink("sinkA", ".cursor/rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    publish(sandbox.registry("other"), "keep", "1.0.0", &["k"]);
    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();
    sandbox.install("other/keep@1.0.0", &["sinkA"]).unwrap();

    sandbox.arm().remove_registry("reg").unwrap();

    assert_eq!(
        sandbox.project.files_under(".cursor/rules"),
        vec!["arm-index.json", "arm/other/keep/1.0.0/k.mdc"]
    );
    let manifest = sandbox.project.read_json("arm.json");
    assert!(manifest["registries"].get("reg").is_none());
    assert!(manifest["dependencies"].get("other/keep").is_some());
}

#[test]
fn changing_sink_directory_moves_installed_packages() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "old");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();

    let report = sandbox.arm().set_sink("sinkA", "directory", "new").unwrap();

    assert!(!report.has_failures());
    assert!(sandbox.project.files_under("old").is_empty());
    sandbox.project.assert_file_exists("new/arm/reg/pkg/1.0.0/a.mdc");
}

#[test]
fn changing_sink_layout_rewrites_names() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();

    sandbox.arm().set_sink("sinkA", "layout", "flat").unwrap();

    assert_eq!(
        sandbox.project.files_under("rules"),
        vec!["arm-index.json", "arm_0100_reg_pkg_a.mdc"]
    );
}

#[test]
fn changing_dependency_priority_renames_flat_files() {
    let sandbox = Sandbox::new();
    sandbox.add_sink("flat", "rules", Layout::Flat, CompileTarget::Cursor);
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["flat"]).unwrap();

    sandbox
        .arm()
        .set_dependency(&key("reg/pkg"), "priority", "7")
        .unwrap();

    assert_eq!(
        sandbox.project.files_under("rules"),
        vec!["arm-index.json", "arm_0007_reg_pkg_a.mdc"]
    );
    assert_eq!(
        sandbox.project.read_json("arm.json")["dependencies"]["reg/pkg"]["priority"],
        7
    );
}

#[test]
fn upgrade_ignores_constraint_but_keeps_it() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@^1.0.0", &["sinkA"]).unwrap();
    publish(sandbox.reg(), "pkg", "2.0.0", &["a"]);

    let report = sandbox
        .arm()
        .upgrade(Some(&key("reg/pkg")), BatchOptions::default())
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(sandbox.lock_entry("reg/pkg")["display"], "2.0.0");
    assert_eq!(
        sandbox.project.read_json("arm.json")["dependencies"]["reg/pkg"]["version"],
        "^1.0.0"
    );
}

#[test]
fn fail_fast_rolls_back_completed_packages() {
    let sandbox = Sandbox::with_registries(&["reg", "zzz"]);
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "a", "1.0.0", &["a"]);
    publish(sandbox.registry("zzz"), "b", "1.0.0", &["b"]);
    sandbox.install("reg/a@^1.0.0", &["sinkA"]).unwrap();
    sandbox.install("zzz/b@^1.0.0", &["sinkA"]).unwrap();
    publish(sandbox.reg(), "a", "1.1.0", &["a"]);
    sandbox.registry("zzz").set_unreachable(true);
    let lock_before = sandbox.project.read("arm-lock.json");

    let report = sandbox
        .arm()
        .update(None, BatchOptions { fail_fast: true })
        .unwrap();

    assert!(matches!(report.status_of("reg/a"), Some(PackageStatus::RolledBack)));
    assert_eq!(
        report.failures().next().map(|(_, e)| e.kind()),
        Some(ErrorKind::RegistryUnreachable)
    );
    sandbox.project.assert_file_exists("rules/arm/reg/a/1.0.0/a.mdc");
    sandbox.project.assert_missing("rules/arm/reg/a/1.1.0");
    assert_eq!(sandbox.project.read("arm-lock.json"), lock_before);
}

#[test]
fn without_fail_fast_other_packages_still_update() {
    let sandbox = Sandbox::with_registries(&["reg", "zzz"]);
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "a", "1.0.0", &["a"]);
    publish(sandbox.registry("zzz"), "b", "1.0.0", &["b"]);
    sandbox.install("reg/a@^1.0.0", &["sinkA"]).unwrap();
    sandbox.install("zzz/b@^1.0.0", &["sinkA"]).unwrap();
    publish(sandbox.reg(), "a", "1.1.0", &["a"]);
    sandbox.registry("zzz").set_unreachable(true);

    let report = sandbox.arm().update(None, BatchOptions::default()).unwrap();

    assert!(report.has_failures());
    assert!(matches!(report.status_of("reg/a"), Some(PackageStatus::Updated { .. })));
    assert_eq!(sandbox.lock_entry("reg/a")["display"], "1.1.0");
    assert_eq!(sandbox.lock_entry("zzz/b")["display"], "1.0.0");
    sandbox.project.assert_file_exists("rules/arm/zzz/b/1.0.0/b.mdc");
}

#[test]
fn install_all_removes_packages_no_longer_declared() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "a", "1.0.0", &["a"]);
    publish(sandbox.reg(), "b", "1.0.0", &["b"]);
    sandbox.install("reg/a@1.0.0", &["sinkA"]).unwrap();
    sandbox.install("reg/b@1.0.0", &["sinkA"]).unwrap();

    // Hand edit: drop reg/b from the manifest only
    let mut manifest = sandbox.project.read_json("arm.json");
    manifest["dependencies"]
        .as_object_mut()
        .unwrap()
        .remove("reg/b");
    sandbox
        .project
        .write("arm.json", &serde_json::to_string_pretty(&manifest).unwrap());

    let report = sandbox.arm().install_all(BatchOptions::default()).unwrap();

    assert_eq!(report.reconciled, vec!["sinkA: reg/b".to_string()]);
    assert_eq!(
        sandbox.project.files_under("rules"),
        vec!["arm-index.json", "arm/reg/a/1.0.0/a.mdc"]
    );
    assert!(sandbox.lock_entry("reg/b").is_null());
}

#[test]
fn unknown_manifest_fields_survive_a_verb() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    let mut manifest = sandbox.project.read_json("arm.json");
    manifest["team"] = json!({"owner": "platform"});
    manifest["sinks"]["sinkA"]["note"] = json!("keep me");
    sandbox
        .project
        .write("arm.json", &serde_json::to_string_pretty(&manifest).unwrap());

    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();

    let manifest = sandbox.project.read_json("arm.json");
    assert_eq!(manifest["team"]["owner"], "platform");
    assert_eq!(manifest["sinks"]["sinkA"]["note"], "keep me");
}

#[test]
fn outdated_reports_current_wanted_and_latest() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@^1.0.0", &["sinkA"]).unwrap();
    publish(sandbox.reg(), "pkg", "1.2.0", &["a"]);
    publish(sandbox.reg(), "pkg", "2.0.0", &["a"]);

    let entries = sandbox.arm().outdated().unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.current.as_deref(), Some("1.0.0"));
    assert_eq!(entry.wanted.as_deref(), Some("1.2.0"));
    assert_eq!(entry.latest.as_deref(), Some("2.0.0"));
    assert!(entry.is_outdated());
}

#[test]
fn clean_cache_by_age_keeps_recent_entries() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    let cache = sandbox.cache();
    let cache_key = sandbox.cache_key("reg");
    let mut ids = Vec::new();
    for (tag, days) in [("1.0.0", 30), ("1.1.0", 3), ("1.2.0", 1)] {
        let version = publish(sandbox.reg(), "pkg", tag, &["a"]);
        sandbox.install(&format!("reg/pkg@{tag}"), &["sinkA"]).unwrap();
        cache
            .set_last_access(&cache_key, "pkg", &version.id, Utc::now() - chrono::Duration::days(days))
            .unwrap();
        ids.push(version.id);
    }

    let report = sandbox
        .arm()
        .clean_cache(parse_age("7d").unwrap(), false)
        .unwrap();

    assert_eq!(report.removed.len(), 1);
    assert!(!cache.contains(&cache_key, "pkg", &ids[0]));
    assert!(cache.contains(&cache_key, "pkg", &ids[1]));
    assert!(cache.contains(&cache_key, "pkg", &ids[2]));
}

#[test]
fn clean_sinks_removes_unclaimed_files() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();
    sandbox.project.write("rules/stray.mdc", "left behind");
    sandbox.project.write("rules/.arm-staging-dead/a.mdc", "interrupted");

    let reports = sandbox.arm().clean_sinks(false).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(
        sandbox.project.files_under("rules"),
        vec!["arm-index.json", "arm/reg/pkg/1.0.0/a.mdc"]
    );

    sandbox.arm().clean_sinks(true).unwrap();
    assert!(sandbox.project.files_under("rules").is_empty());
}

#[test]
fn list_dependencies_reports_sink_state() {
    let sandbox = Sandbox::new();
    sandbox.add_cursor_sink("sinkA", "rules");
    publish(sandbox.reg(), "pkg", "1.0.0", &["a"]);
    sandbox.install("reg/pkg@1.0.0", &["sinkA"]).unwrap();

    let statuses = sandbox.arm().list_dependencies().unwrap();

    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].is_in_sync());
    assert_eq!(statuses[0].installed["sinkA"].display, "1.0.0");

    std::fs::remove_dir_all(sandbox.project.path("rules")).unwrap();
    assert!(!sandbox.arm().list_dependencies().unwrap()[0].is_in_sync());
}
