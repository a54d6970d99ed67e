use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn shows_help() {
    let mut cmd = Command::cargo_bin("ambigram").unwrap();
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains("submit"));
}

#[test]
fn submit_requires_text() {
    let mut cmd = Command::cargo_bin("ambigram").unwrap();
    cmd.arg("submit");
    cmd.assert().failure();
}
