//! End-to-end tests for the matters CLI commands.

#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ASSETS: &str = r#"[
    { "id": "tex", "properties": { "kind": "texture", "path": "crate.png" } },
    { "id": "mesh", "properties": { "kind": "mesh", "name": "crate", "tex": "@@tex" } },
    { "id": "variant", "inherites": "mesh", "properties": { "name": "barrel", "material": "@@material" } },
    { "id": "material", "owner": "variant", "properties": { "kind": "material" } }
]
"#;

/// Write `contents` to a snapshot file in a fresh temp directory.
fn snapshot(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("assets.json");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn matters() -> Command {
    let mut cmd = Command::cargo_bin("matters").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_passes_valid_snapshot() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("All checks passed")
                .and(predicate::str::contains("4 matters, 2 links, 1 variants, 1 composed")),
        );
}

#[test]
fn check_accepts_wrapped_layout() {
    let (_dir, path) = snapshot(&format!("{{ \"matters\": {ASSETS} }}"));
    matters()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed"));
}

#[test]
fn check_lists_every_issue() {
    let (_dir, path) = snapshot(
        r#"[
            { "id": "a", "inherites": "ghost" },
            { "id": "b", "properties": { "t": "@@gone" } }
        ]"#,
    );
    matters()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("a: parent ghost does not exist")
                .and(predicate::str::contains("b.t: link target gone does not exist"))
                .and(predicate::str::contains("error: 2 integrity issues")),
        );
}

#[test]
fn check_rejects_duplicate_ids() {
    let (_dir, path) = snapshot(r#"[{ "id": "a" }, { "id": "a" }]"#);
    matters()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate matter id a"));
}

#[test]
fn check_rejects_malformed_file() {
    let (_dir, path) = snapshot("this is not json");
    matters()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a matters snapshot"));
}

#[test]
fn check_missing_file() {
    let dir = TempDir::new().unwrap();
    matters()
        .arg("check")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn verbose_enables_logs() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .args(["-v", "check"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("loaded matters"));
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn list_shows_all_matters() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("list")
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("mesh")
                .and(predicate::str::contains("variant"))
                .and(predicate::str::contains("material"))
                .and(predicate::str::contains("4 matters")),
        );
}

#[test]
fn list_filters_on_inherited_value() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("list")
        .arg(&path)
        .args(["--where", "kind=mesh"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("variant")
                .and(predicate::str::contains("2 matters"))
                .and(predicate::str::contains("material").not()),
        );
}

#[test]
fn list_filters_with_pattern() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("list")
        .arg(&path)
        .args(["-w", "name~^bar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("variant").and(predicate::str::contains("1 matters")));
}

#[test]
fn list_standalone_and_descendants() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("list")
        .arg(&path)
        .arg("--standalone")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 matters"));

    matters()
        .arg("list")
        .arg(&path)
        .args(["--descends-from", "mesh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("variant").and(predicate::str::contains("1 matters")));
}

#[test]
fn list_no_matches() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("list")
        .arg(&path)
        .args(["--where", "kind=sound"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matters found"));
}

#[test]
fn list_rejects_bad_condition() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("list")
        .arg(&path)
        .args(["--where", "kind"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[test]
fn show_marks_provenance() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("show")
        .arg(&path)
        .arg("variant")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("parent:     mesh")
                .and(predicate::str::contains("(inherited from mesh)"))
                .and(predicate::str::contains("(overrides mesh)"))
                .and(predicate::str::contains("[composition]"))
                .and(predicate::str::contains("Composes:")),
        );
}

#[test]
fn show_lists_referrers() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("show")
        .arg(&path)
        .arg("tex")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("dependents: 1")
                .and(predicate::str::contains("Referenced by:"))
                .and(predicate::str::contains("mesh.tex")),
        );
}

#[test]
fn show_accepts_unique_prefix() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("show")
        .arg(&path)
        .arg("vari")
        .assert()
        .success()
        .stdout(predicate::str::contains("barrel"));
}

#[test]
fn show_ambiguous_prefix() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("show")
        .arg(&path)
        .arg("m")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"));
}

#[test]
fn show_not_found() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("show")
        .arg(&path)
        .arg("ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("matter not found"));
}

// ---------------------------------------------------------------------------
// tree
// ---------------------------------------------------------------------------

#[test]
fn tree_follows_inherited_links() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("tree")
        .arg(&path)
        .arg("variant")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("material → material [composition]")
                .and(predicate::str::contains("tex → tex (inherited from mesh)")),
        );
}

#[test]
fn tree_marks_cycles() {
    let (_dir, path) = snapshot(
        r#"[
            { "id": "a", "properties": { "next": "@@b" } },
            { "id": "b", "properties": { "back": "@@a" } }
        ]"#,
    );
    matters()
        .arg("tree")
        .arg(&path)
        .arg("a")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("next → b")
                .and(predicate::str::contains("back → a [cycle]")),
        );

    matters()
        .arg("tree")
        .arg(&path)
        .args(["a", "--depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next → b").and(predicate::str::contains("back").not()));
}

#[test]
fn tree_expands_shared_targets_once() {
    let (_dir, path) = snapshot(
        r#"[
            { "id": "scene", "properties": { "crate": "@@crate", "barrel": "@@barrel" } },
            { "id": "crate", "properties": { "tex": "@@wood" } },
            { "id": "barrel", "properties": { "tex": "@@wood" } },
            { "id": "wood", "properties": { "image": "@@png" } },
            { "id": "png" }
        ]"#,
    );
    matters()
        .arg("tree")
        .arg(&path)
        .arg("scene")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("tex → wood (shown above)")
                .and(predicate::str::contains("image → png").count(1)),
        );
}

#[test]
fn tree_without_links() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("tree")
        .arg(&path)
        .arg("tex")
        .assert()
        .success()
        .stdout(predicate::str::contains("(no links)"));
}

// ---------------------------------------------------------------------------
// remove
// ---------------------------------------------------------------------------

#[test]
fn remove_linked_matter_conflicts() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("remove")
        .arg(&path)
        .arg("tex")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("blocked by mesh.tex")
                .and(predicate::str::contains("error: conflict on tex: has 1 dependent")),
        );
}

#[test]
fn remove_inherited_matter_conflicts() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("remove")
        .arg(&path)
        .arg("mesh")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("blocked by variant")
                .and(predicate::str::contains("is inherited by 1 matter")),
        );
}

#[test]
fn remove_dry_run_leaves_file_untouched() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("remove")
        .arg(&path)
        .arg("variant")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Would remove 2 matters")
                .and(predicate::str::contains("Dry run")),
        );
    assert_eq!(fs::read_to_string(&path).unwrap(), ASSETS);
}

#[test]
fn remove_write_cascades_and_saves() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("remove")
        .arg(&path)
        .args(["variant", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 matters"));

    let saved = fs::read_to_string(&path).unwrap();
    assert!(!saved.contains("\"variant\""));
    assert!(!saved.contains("\"material\""));

    matters()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 matters"));

    matters()
        .arg("remove")
        .arg(&path)
        .args(["mesh", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tex (0 dependents left)"));
}

#[test]
fn remove_block_owners() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .arg("remove")
        .arg(&path)
        .args(["variant", "--block-owners"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("blocked by material")
                .and(predicate::str::contains("owns 1 matter")),
        );
}

#[test]
fn remove_lists_only_outside_blockers() {
    let (_dir, path) = snapshot(
        r#"[
            { "id": "mesh", "properties": { "material": "@@material" } },
            { "id": "material", "owner": "mesh" },
            { "id": "prop", "properties": { "borrowed": "@@material" } }
        ]"#,
    );
    matters()
        .arg("remove")
        .arg(&path)
        .arg("mesh")
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("blocked by prop.borrowed")
                .and(predicate::str::contains("mesh.material").not())
                .and(predicate::str::contains("conflict on material: has 1 dependent")),
        );
}

#[test]
fn verbose_logs_snapshot_io() {
    let (_dir, path) = snapshot(ASSETS);
    matters()
        .args(["-v", "remove"])
        .arg(&path)
        .args(["variant", "--write"])
        .assert()
        .success()
        .stderr(
            predicate::str::contains("read snapshot")
                .and(predicate::str::contains("wrote snapshot")),
        );
}
