mod support;

use std::process::{Command as Process, Output};

use clap::error::ErrorKind;
use clap::Parser;
use splitwise_cli::config::{Cli, Command};
use support::MockProvider;

/// Run the built binary with a scrubbed environment so nothing leaks in
/// from the developer's shell.
fn run_cli(args: &[&str]) -> Output {
    Process::new(env!("CARGO_BIN_EXE_splitwise-cli"))
        .args(args)
        .env_remove("SPLITWISE_CONSUMER_KEY")
        .env_remove("SPLITWISE_CONSUMER_SECRET")
        .env_remove("SPLITWISE_TOKEN_FILE")
        .env_remove("SPLITWISE_API_URL")
        .env_remove("SPLITWISE_AUTHORIZE_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("run splitwise-cli")
}

#[test]
fn binary_exits_2_without_credentials() {
    let out = run_cli(&["test"]);

    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn binary_exits_2_on_unknown_subcommand_without_calling_the_api() {
    let mock = MockProvider::start(&[]);

    let out = run_cli(&[
        "--consumer-key",
        "k",
        "--consumer-secret",
        "s",
        "--api-url",
        &mock.base_url(),
        "get",
    ]);

    assert_eq!(out.status.code(), Some(2));
    assert!(mock.requests().is_empty());
}

#[test]
fn binary_exits_2_on_malformed_api_url() {
    let out = run_cli(&["--consumer-key", "k", "--consumer-secret", "s", "--api-url", "::", "test"]);

    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn binary_exits_1_on_operational_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("keep"), "x").expect("write");
    let token_file = dir.path().to_str().expect("utf8 path");

    let out = run_cli(&[
        "--consumer-key",
        "k",
        "--consumer-secret",
        "s",
        "--token-file",
        token_file,
        "logout",
    ]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
}

#[test]
fn binary_exits_0_when_logout_has_nothing_to_remove() {
    let dir = tempfile::tempdir().expect("tempdir");
    let token_file = dir.path().join("token.json");

    let out = run_cli(&[
        "--consumer-key",
        "k",
        "--consumer-secret",
        "s",
        "--token-file",
        token_file.to_str().expect("utf8 path"),
        "logout",
    ]);

    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn empty_consumer_key_is_rejected() {
    let err = Cli::try_parse_from([
        "splitwise-cli",
        "--consumer-key",
        "",
        "--consumer-secret",
        "s",
        "test",
    ])
    .expect_err("should fail");

    assert_eq!(err.exit_code(), 2);
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let err = Cli::try_parse_from([
        "splitwise-cli",
        "--consumer-key",
        "k",
        "--consumer-secret",
        "s",
        "get",
    ])
    .expect_err("should fail");

    assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn add_accepts_expense_flags() {
    let cli = Cli::try_parse_from([
        "splitwise-cli",
        "--consumer-key",
        "k",
        "--consumer-secret",
        "s",
        "add",
        "--group-id",
        "42",
        "--cost",
        "12.50",
        "--description",
        "Lunch",
        "--payment",
    ])
    .expect("parse");

    match cli.command {
        Command::Add(args) => {
            assert_eq!(args.group_id, Some(42));
            assert_eq!(args.cost.as_deref(), Some("12.50"));
            assert_eq!(args.description.as_deref(), Some("Lunch"));
            assert!(args.payment);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn defaults_match_public_api() {
    let cli = Cli::try_parse_from([
        "splitwise-cli",
        "--consumer-key",
        "k",
        "--consumer-secret",
        "s",
        "groups",
    ])
    .expect("parse");

    assert!(matches!(cli.command, Command::Groups));
    assert_eq!(cli.callback_port, 1234);
    assert_eq!(cli.auth_timeout, 300);
}
