//! Tests for config file resolution and TOML loading
//!
//! Uses serial_test to prevent environment variable races: tests that touch
//! CUELIGHT_CONFIG are marked #[serial].

use cuelight_common::config::{load_toml, resolve_config_path, CONFIG_ENV_VAR};
use cuelight_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Deserialize)]
struct Sample {
    universe_count: u16,
    #[serde(default)]
    label: Option<String>,
}

#[test]
#[serial]
fn test_env_var_used_when_no_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/cuelight-env.toml");

    let path = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(path, Some(PathBuf::from("/tmp/cuelight-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_argument_beats_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/cuelight-env.toml");

    let path = resolve_config_path(Some(Path::new("/tmp/cuelight-cli.toml")), CONFIG_ENV_VAR);
    assert_eq!(path, Some(PathBuf::from("/tmp/cuelight-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_empty_env_var_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "");

    let path = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_ne!(path, Some(PathBuf::from("")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_load_toml_parses_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "universe_count = 4").unwrap();
    writeln!(file, "label = \"main rig\"").unwrap();

    let sample: Sample = load_toml(file.path()).unwrap();
    assert_eq!(sample.universe_count, 4);
    assert_eq!(sample.label.as_deref(), Some("main rig"));
}

#[test]
fn test_load_toml_reports_parse_errors() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "universe_count = \"many\"").unwrap();

    let err = load_toml::<Sample>(file.path()).unwrap_err();
    assert!(matches!(err, Error::Toml(_)), "unexpected error: {:?}", err);
}
