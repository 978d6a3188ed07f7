use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::{PredicateBooleanExt, predicate};

#[test]
fn prints_help() {
    let mut cmd = cargo_bin_cmd!("toolchain-smoke");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage").or(predicate::str::contains("USAGE")));
}

#[test]
fn run_help_lists_options() {
    let mut cmd = cargo_bin_cmd!("toolchain-smoke");
    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--fixture").and(predicate::str::contains("--timeout")));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let mut cmd = cargo_bin_cmd!("toolchain-smoke");
    cmd.assert().failure().code(2);
}
