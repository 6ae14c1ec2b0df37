//! Config-file loading: error messages, layering, and defaults.

use std::time::Duration;

use assert_fs::prelude::*;
use ginx_core::{ConfigError, WatchSettings};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_file_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("ginx.yaml");
    let err = WatchSettings::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("ginx.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ginx.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = WatchSettings::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(
        err.to_string().contains("ginx.yaml"),
        "must contain file path, got: {err}"
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ginx.yaml");
    file.write_str("source: https://example.com/a.git\nbrnach: main\n")
        .expect("write");

    let err = WatchSettings::load(file.path()).unwrap_err();
    let msg = match &err {
        ConfigError::Parse { source, .. } => source.to_string(),
        other => panic!("expected parse error, got: {other}"),
    };
    assert!(msg.contains("brnach"), "serde_yaml should name the key: {msg}");
}

#[test]
fn empty_file_is_an_empty_layer() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ginx.yaml");
    file.write_str("\n").expect("write");

    let settings = WatchSettings::load(file.path()).expect("load");
    assert_eq!(settings, WatchSettings::default());
}

// ---------------------------------------------------------------------------
// 2. Full file → target
// ---------------------------------------------------------------------------

#[test]
fn full_file_resolves_to_target() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ginx.yaml");
    file.write_str(
        "source: git@github.com:acme/site.git\n\
         branch: production\n\
         interval: 45\n\
         once: false\n\
         fail_fast: true\n\
         command: [make, deploy, ENV=prod]\n\
         command_timeout: 600\n\
         workdir: /srv/site\n",
    )
    .expect("write");
    file.assert(predicate::str::contains("production"));

    let target = WatchSettings::load(file.path())
        .expect("load")
        .into_target()
        .expect("target");
    assert_eq!(target.source_url, "git@github.com:acme/site.git");
    assert_eq!(target.branch, "production");
    assert_eq!(target.poll_interval, Duration::from_secs(45));
    assert!(target.fail_fast);
    assert!(!target.run_once);
    assert_eq!(target.command, vec!["make", "deploy", "ENV=prod"]);
    assert_eq!(target.command_timeout, Some(Duration::from_secs(600)));
    assert_eq!(
        target.local_copy_path(),
        std::path::PathBuf::from("/srv/site")
    );
}

// ---------------------------------------------------------------------------
// 3. Layering
// ---------------------------------------------------------------------------

#[rstest]
#[case::flag_wins(Some("hotfix"), Some("release"), "hotfix")]
#[case::file_fills_gap(None, Some("release"), "release")]
#[case::default_last(None, None, "main")]
fn branch_precedence(
    #[case] flag: Option<&str>,
    #[case] file: Option<&str>,
    #[case] expected: &str,
) {
    let file_layer = WatchSettings {
        source: Some("https://example.com/a.git".to_string()),
        branch: file.map(str::to_string),
        ..WatchSettings::default()
    };
    let flag_layer = WatchSettings {
        branch: flag.map(str::to_string),
        ..WatchSettings::default()
    };
    let target = file_layer.overlay(flag_layer).into_target().expect("target");
    assert_eq!(target.branch, expected);
}
