//! End-to-end CLI tests for the `lf` binary.
//!
//! Each test writes a quantity document into its own temporary directory
//! and exercises the `lf` binary as a subprocess via `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `Command` targeting the cargo-built `lf` binary.
fn lf() -> Command {
    Command::cargo_bin("lf").unwrap()
}

/// Write a quantity document and return the holding directory.
fn write_doc(name: &str, content: &str) -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(name);
    std::fs::write(&path, content).unwrap();
    (tmp, path)
}

// ---------------------------------------------------------------------------
// eval
// ---------------------------------------------------------------------------

#[test]
fn eval_prints_values_in_dependency_order() {
    let (_tmp, path) = write_doc(
        "last.yaml",
        "heel_height: \"40\"\nwedge: \"heel_height / 2\"\n",
    );

    lf().arg("eval")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("heel_height@global = 40"))
        .stdout(predicate::str::contains("wedge@global = 20"));
}

#[test]
fn eval_splits_global_quantities_per_group() {
    let (_tmp, path) = write_doc(
        "last.yaml",
        r#"
w_left:
  formula: "100"
  name: w
  group: left
w_right:
  formula: "200"
  name: w
  group: right
v: "w * 2"
"#,
    );

    lf().arg("eval")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("v@left = 200"))
        .stdout(predicate::str::contains("v@right = 400"));
}

#[test]
fn eval_group_filter() {
    let (_tmp, path) = write_doc(
        "last.yaml",
        r#"
w_left:
  formula: "100"
  name: w
  group: left
w_right:
  formula: "200"
  name: w
  group: right
"#,
    );

    lf().args(["eval", "-g", "left"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("w@left = 100"))
        .stdout(predicate::str::contains("w@right").not());
}

#[test]
fn eval_json_output() {
    let (_tmp, path) = write_doc("last.yaml", "a: \"2\"\nb: \"a * 3\"\n");

    let output = lf()
        .args(["eval", "--json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let b = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "b")
        .unwrap();
    assert_eq!(b["value"], 6.0);
}

#[test]
fn eval_reports_cycles_and_fails() {
    let (_tmp, path) = write_doc("last.yaml", "a: \"b + 1\"\nb: \"a + 1\"\n");

    lf().arg("eval")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cyclic"))
        .stderr(predicate::str::contains("a"))
        .stderr(predicate::str::contains("b"));
}

#[test]
fn eval_missing_file_fails() {
    lf().args(["eval", "/nonexistent/quantities.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_instance_count() {
    let (_tmp, path) = write_doc(
        "last.yaml",
        r#"
w_left:
  formula: "1"
  name: w
  group: left
w_right:
  formula: "2"
  name: w
  group: right
v: "w"
"#,
    );

    // v splits into two instances: 2 + 2 = 4 evaluated instances.
    lf().arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 quantities"))
        .stdout(predicate::str::contains("4 evaluated instances"));
}

#[test]
fn check_flags_undefined_variables() {
    let (_tmp, path) = write_doc("last.yaml", "a: \"missing * 2\"\n");

    lf().arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("undefined variable 'missing'"));
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn list_prints_entries() {
    let (_tmp, path) = write_doc(
        "last.toml",
        "heel_height = \"40\"\n\n[girth]\nformula = \"220\"\ngroup = \"right\"\nid = 7\n",
    );

    lf().arg("list")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("heel_height = 40"))
        .stdout(predicate::str::contains("girth = 220"))
        .stdout(predicate::str::contains("[group: right]"))
        .stdout(predicate::str::contains("[id: 7]"));
}
