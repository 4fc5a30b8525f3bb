//! CLI tests for suseapi
//!
//! Only commands that work offline are run end to end; the network backed
//! ones are checked for argument handling and configuration errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn suseapi_cmd() -> Command {
    let mut cmd = Command::cargo_bin("suseapi").unwrap();
    cmd.env_remove("SUSEAPI_CONFIG");
    cmd
}

fn maintained_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "Distribution: sle11-sp2-x86_64
Distributionstring: SLES-11-SP2-x86_64
ProductType: maintained
MarkFinished:

Packages on CD:
kernel-default
glibc"
    )
    .unwrap();
    file
}

#[test]
fn test_version_flag() {
    suseapi_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("suseapi"));
}

#[test]
fn test_help_lists_commands() {
    suseapi_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lookup-user"))
        .stdout(predicate::str::contains("sr-status"))
        .stdout(predicate::str::contains("codestream"));
}

#[test]
fn test_no_command_fails() {
    suseapi_cmd().assert().failure();
}

#[test]
fn test_codestream() {
    suseapi_cmd()
        .args(["codestream", "sles11-sp2", "oes2-sp3-update"])
        .assert()
        .success()
        .stdout("SLE-11-SP2 (SLE-11)\nOES-2-SP3 (OES-2)\n");
}

#[test]
fn test_codestream_json() {
    let output = suseapi_cmd()
        .args(["--output", "json", "codestream", "sled10-sp4"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["name"], "SLE-10-SP4");
    assert_eq!(value[0]["base"], "SLE-10");
}

#[test]
fn test_codestream_requires_name() {
    suseapi_cmd().arg("codestream").assert().failure();
}

#[test]
fn test_maintained() {
    let file = maintained_file();
    suseapi_cmd()
        .arg("maintained")
        .arg(file.path())
        .arg("--packages")
        .assert()
        .success()
        .stdout(predicate::str::contains("ProductType: maintained"))
        .stdout(predicate::str::contains("Maintained: true"))
        .stdout(predicate::str::contains("glibc"));
}

#[test]
fn test_maintained_json() {
    let file = maintained_file();
    let output = suseapi_cmd()
        .args(["maintained", "--output", "json"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["maintained"], true);
    assert_eq!(value["data"]["Distribution"], "sle11-sp2-x86_64");
    assert_eq!(value["packages"][1], "glibc");
}

#[test]
fn test_maintained_missing_file() {
    suseapi_cmd()
        .args(["maintained", "/nonexistent/maintained"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_missing_config_file() {
    suseapi_cmd()
        .args(["-c", "/nonexistent/suseapi", "lookup-user", "jdoe"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing config file"));
}

#[test]
fn test_bug_requires_numeric_ids() {
    suseapi_cmd()
        .args(["bug", "not-a-number"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_output_format() {
    suseapi_cmd()
        .args(["--output", "yaml", "codestream", "sle12"])
        .assert()
        .failure();
}
