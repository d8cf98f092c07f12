//! End-to-end CLI tests.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command sandboxed in a fresh directory, hermetic from any real
/// user or project config.
fn sandboxed() -> (TempDir, Command) {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("ocelint").unwrap();
    cmd.env("HOME", dir.path());
    cmd.current_dir(dir.path());
    (dir, cmd)
}

fn write_source(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path
}

#[test]
fn findings_fail_the_run() {
    let (dir, mut cmd) = sandboxed();
    let file = write_source(&dir, "bad.py", "def f(x=[]):\n    pass\n");
    cmd.arg(file)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("DEFAULT_MUTABLE_ARG"));
}

#[test]
fn clean_files_pass() {
    let (dir, mut cmd) = sandboxed();
    let file = write_source(&dir, "good.py", "def f(x=1):\n    return x\n");
    cmd.arg(file).assert().success();
}

#[test]
fn no_fail_exit_keeps_the_exit_code_clean() {
    let (dir, mut cmd) = sandboxed();
    let file = write_source(&dir, "bad.py", "def f(x=[]):\n    pass\n");
    cmd.arg(file)
        .arg("--no-fail-exit")
        .assert()
        .success()
        .stdout(predicate::str::contains("DEFAULT_MUTABLE_ARG"));
}

#[test]
fn ignored_codes_are_dropped() {
    let (dir, mut cmd) = sandboxed();
    let file = write_source(&dir, "bad.py", "def f(x=[]):\n    pass\n");
    cmd.arg(file)
        .args(["--ignore-code", "DEFAULT_MUTABLE_ARG"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DEFAULT_MUTABLE_ARG").not());
}

#[test]
fn json_output_is_grouped() {
    let (dir, mut cmd) = sandboxed();
    let file = write_source(&dir, "bad.py", "def f(x=[]):\n    pass\n");
    let assert = cmd.arg(file).args(["--format", "json"]).assert().code(1);
    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let reports = json["general"].as_array().unwrap();
    assert_eq!(reports[0]["code"], "DEFAULT_MUTABLE_ARG");
}

#[test]
fn directories_are_walked_for_python_files() {
    let (dir, mut cmd) = sandboxed();
    write_source(&dir, "bad.py", "def f(x=[]):\n    pass\n");
    write_source(&dir, "notes.txt", "def g(y=[]): pass\n");
    cmd.arg(".")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("bad.py"));
}

#[test]
fn show_plugins_lists_the_builtins() {
    let (_dir, mut cmd) = sandboxed();
    cmd.arg("--show-plugins")
        .assert()
        .success()
        .stdout(predicate::str::contains("ocelint.plugins.general"))
        .stdout(predicate::str::contains("ocelint.plugins.context"));
}

#[test]
fn unknown_plugins_abort_with_an_error() {
    let (dir, mut cmd) = sandboxed();
    let file = write_source(&dir, "ok.py", "x = 1\n");
    std::fs::write(
        dir.path().join(".ocelint.json"),
        r#"{"plugins": {"missing.ns": ["nowhere"]}}"#,
    )
    .unwrap();
    cmd.arg(file)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere"));
}
