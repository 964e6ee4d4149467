//! CLI test cases.
//!
//! Most of these run against the `echo` engine, which exercises the whole
//! pipeline without needing network access or credentials. Tests that need
//! `poppler-utils` are ignored by default.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

/// Create a new `Command` with our binary.
fn cmd() -> Command {
    Command::cargo_bin("scantext").unwrap()
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_about_prints_both_documents() {
    cmd()
        .arg("about")
        .assert()
        .success()
        .stdout(predicate::str::contains("About this application"))
        .stdout(predicate::str::contains("Privacy guidelines"));
}

#[test]
fn test_transcribe_images_with_echo_engine() {
    cmd()
        .arg("transcribe")
        .arg("tests/fixtures/tiny.png")
        .arg("tests/fixtures/tiny.png")
        .args(["--engine", "echo"])
        .args(["-o", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- image 1 ---\ntiny.png ("))
        .stdout(predicate::str::contains("--- image 2 ---\ntiny.png ("));
}

#[test]
fn test_transcribe_skips_unsupported_files() {
    cmd()
        .arg("transcribe")
        .arg("tests/fixtures/tiny.png")
        .arg("tests/fixtures/notes.txt")
        .arg("tests/fixtures/tiny.png")
        .args(["--engine", "echo"])
        .args(["-o", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- image 1 ---"))
        .stdout(predicate::str::contains("--- image 3 ---"))
        .stdout(predicate::str::contains("--- image 2 ---").not())
        .stderr(predicate::str::contains("notes.txt"));
}

#[test]
fn test_transcribe_rejects_too_many_files() {
    let mut command = cmd();
    command.arg("transcribe");
    for _ in 0..6 {
        command.arg("tests/fixtures/tiny.png");
    }
    command
        .args(["--engine", "echo"])
        .args(["-o", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too many files"));
}

#[test]
fn test_transcribe_rejects_a_pdf_mixed_with_images() {
    cmd()
        .arg("transcribe")
        .arg("tests/fixtures/two_pages.pdf")
        .arg("tests/fixtures/tiny.png")
        .args(["--engine", "echo"])
        .args(["-o", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("by itself"));
}

#[test]
fn test_transcribe_rejects_a_batch_with_no_supported_files() {
    cmd()
        .arg("transcribe")
        .arg("tests/fixtures/notes.txt")
        .args(["--engine", "echo"])
        .args(["-o", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("supported type"));
}

#[test]
fn test_vision_engine_requires_credentials() {
    cmd()
        .env_remove("GOOGLE_APPLICATION_CREDENTIALS")
        .arg("transcribe")
        .arg("tests/fixtures/tiny.png")
        .args(["-o", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_APPLICATION_CREDENTIALS"));
}

#[test]
#[ignore = "Requires poppler-utils to be installed"]
fn test_transcribe_pdf_with_echo_engine() {
    cmd()
        .arg("transcribe")
        .arg("tests/fixtures/two_pages.pdf")
        .args(["--engine", "echo"])
        .args(["--dpi", "72"])
        .args(["-o", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- page 1 ---"))
        .stdout(predicate::str::contains("--- page 2 ---"));
}
