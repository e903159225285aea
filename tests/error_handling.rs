// tests/error_handling.rs

use std::io::Write;

use cmdrelay::config::{load_and_validate, DEFAULT_MAX_OUTPUT_CHARS};
use cmdrelay::errors::ExecError;
use cmdrelay::types::{Errno, LogLevel};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_config_uses_defaults() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert!(cfg.delivery.allowed_parent_paths.is_empty());
    assert_eq!(cfg.delivery.max_stdout_chars, DEFAULT_MAX_OUTPUT_CHARS);
    assert_eq!(cfg.delivery.max_stderr_chars, DEFAULT_MAX_OUTPUT_CHARS);
    assert!(cfg.notifications.error_notifications_enabled);
    assert!(!cfg.connection.allow_external_apps);
    assert_eq!(cfg.logging.level, None);
}

#[test]
fn full_config_is_parsed() {
    let file = config_file(
        r#"
[connection]
bin_dir = "/opt/relay/bin"
allow_external_apps = true

[delivery]
allowed_parent_paths = ["/storage/shared", "/srv/results"]
base_dir = "/storage/shared"
max_stdout_chars = 4000

[notifications]
error_notifications_enabled = false

[logging]
level = "debug"
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();

    assert!(cfg.connection.allow_external_apps);
    assert_eq!(cfg.delivery.allowed_parent_paths.len(), 2);
    assert_eq!(cfg.delivery.max_stdout_chars, 4000);
    assert!(!cfg.notifications.error_notifications_enabled);
    assert_eq!(cfg.logging.level, Some(LogLevel::Debug));
}

#[test]
fn relative_allowed_parent_is_a_config_error() {
    let file = config_file(
        r#"
[delivery]
allowed_parent_paths = ["relative/dir"]
"#,
    );
    match load_and_validate(file.path()) {
        Err(ExecError::ConfigError(msg)) => assert!(msg.contains("allowed_parent_paths")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_output_limit_is_a_config_error() {
    let file = config_file(
        r#"
[delivery]
max_stderr_chars = 0
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ExecError::ConfigError(_))
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let file = config_file(
        r#"
[delivery]
allowed_parents = ["/storage"]
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ExecError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ExecError::Other(_)));
    assert_eq!(err.errno(), Errno::Failed);
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(ExecError::InvalidInput("x".into()).errno().code(), 3);
    assert_eq!(ExecError::NotConnected.errno().code(), 6);
    assert_eq!(ExecError::NotReady.errno().code(), 7);
    assert_eq!(ExecError::ExternalAppsNotAllowed.errno().code(), 8);
    assert_eq!(ExecError::DeliveryFailed("x".into()).errno().code(), 5);
    assert_eq!(Errno::Success.code(), 0);
    assert_eq!(Errno::Cancelled.code(), 2);
}
