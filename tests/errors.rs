use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("jbf").unwrap();
    cmd.env_remove("JBF_MEMORY_SIZE").env_remove("JBF_BOUNDS");
    cmd
}

#[test]
fn test_zero_memory_error() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).args(["run", "--memory", "0", "+"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Memory size must be greater than 0"));
}

#[test]
fn test_pointer_out_of_bounds_error_has_caret() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).args(["run", "--memory", "1", "+>+"])
    .assert()
    .failure()
    .stderr(
        predicate::str::contains("pointer out of bounds (ptr=0, op=>)")
            .and(predicate::str::contains("at instruction 1"))
            .and(predicate::str::contains("  +>+\n   ^")),
    );
}

#[test]
fn test_unmatched_open_bracket_error() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).args(["run", "["])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unmatched bracket '['"));
}

#[test]
fn test_unmatched_close_bracket_error() {
    cargo_bin()
    .timeout(Duration::from_secs(2)).args(["run", "+]"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unmatched bracket ']'"));
}

#[test]
fn test_unreached_bracket_is_not_an_error() {
    // The zero cell falls straight through the stray ']'.
    cargo_bin()
    .timeout(Duration::from_secs(2)).args(["run", "]+."])
    .assert()
    .success()
    .stdout("\u{1}\n");
}
