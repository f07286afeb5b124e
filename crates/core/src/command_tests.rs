// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_uses_default_deadline() {
    let spec = CommandSpec::new("pip");
    assert_eq!(spec.deadline, DEFAULT_COMMAND_DEADLINE);
    assert!(!spec.stream_output);
    assert!(spec.args.is_empty());
}

#[test]
fn builder_collects_args_and_env() {
    let spec = CommandSpec::new("ansible-playbook")
        .arg("site.yml")
        .args(["-i", "hosts"])
        .env("ANSIBLE_STDOUT_CALLBACK", "json")
        .stream_output(true)
        .working_dir("/tmp/run");

    assert_eq!(spec.args, vec!["site.yml", "-i", "hosts"]);
    assert_eq!(spec.env, vec![("ANSIBLE_STDOUT_CALLBACK".to_string(), "json".to_string())]);
    assert!(spec.stream_output);
    assert_eq!(spec.working_dir, Some(PathBuf::from("/tmp/run")));
}

#[test]
fn program_resolves_under_bin_dir() {
    let bare = CommandSpec::new("pip");
    assert_eq!(bare.program(), PathBuf::from("pip"));

    let venv = CommandSpec::new("pip").bin_dir("/opt/venv/bin");
    assert_eq!(venv.program(), PathBuf::from("/opt/venv/bin/pip"));
}

#[test]
fn display_line_joins_args() {
    let spec = CommandSpec::new("pip").args(["install", "-r", "requirements.txt"]);
    assert_eq!(spec.display_line(), "pip install -r requirements.txt");
}

#[test]
fn not_started_uses_sentinel_exit_code() {
    let result = CommandResult::not_started(CommandError::Start {
        binary: "nope".into(),
        message: "not found".into(),
    });
    assert_eq!(result.exit_code, NO_EXIT_CODE);
    assert!(!result.success());
    assert!(result.into_result().is_err());
}

#[test]
fn deadline_classification() {
    let err = CommandError::DeadlineExceeded {
        binary: "sleep".into(),
        deadline: Duration::from_millis(50),
    };
    assert!(err.is_deadline_exceeded());
    assert!(!CommandError::Exit { binary: "false".into(), code: 1 }.is_deadline_exceeded());
}

#[test]
fn stream_kind_display() {
    assert_eq!(StreamKind::Stdout.to_string(), "stdout");
    assert_eq!(StreamKind::Stderr.to_string(), "stderr");
}
