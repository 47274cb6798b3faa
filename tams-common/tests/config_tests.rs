//! Tests for configuration resolution
//!
//! Covers the CLI → ENV → TOML → default priority order, graceful handling of
//! a missing default config file, and TOML write-back.
//!
//! Note: Uses serial_test to prevent ENV variable race conditions. Tests that
//! manipulate TAMS_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::io::Write;
use tams_common::config::{
    load_toml_config, write_toml_config, AuthConfig, ConfigOverrides, ConfigResolver, TomlConfig,
    ENV_ACCESS_TOKEN, ENV_BACKEND_URL, ENV_CONFIG_PATH, ENV_LOG_LEVEL, ENV_REFRESH_TOKEN,
};

fn clear_env() {
    for var in [
        ENV_CONFIG_PATH,
        ENV_BACKEND_URL,
        ENV_ACCESS_TOKEN,
        ENV_REFRESH_TOKEN,
        ENV_LOG_LEVEL,
    ] {
        env::remove_var(var);
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

const SAMPLE: &str = r#"
[backend]
base_url = "https://toml.example.edu/api/"
timeout_secs = 12

[auth]
access_token = "toml-access"
refresh_token = "toml-refresh"

[logging]
level = "debug"
"#;

#[test]
#[serial]
fn test_toml_values_are_used() {
    clear_env();
    let file = write_config(SAMPLE);

    let resolved = ConfigResolver::new(ConfigOverrides {
        config_path: Some(file.path().to_path_buf()),
        ..Default::default()
    })
    .resolve()
    .unwrap();

    assert_eq!(resolved.backend.base_url, "https://toml.example.edu/api");
    assert_eq!(resolved.backend.timeout_secs, 12);
    assert_eq!(resolved.auth.access_token.as_deref(), Some("toml-access"));
    assert_eq!(resolved.logging.level, "debug");
    assert_eq!(resolved.source_path.as_deref(), Some(file.path()));
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let file = write_config(SAMPLE);
    env::set_var(ENV_BACKEND_URL, "https://env.example.edu/api");
    env::set_var(ENV_ACCESS_TOKEN, "env-access");

    let resolved = ConfigResolver::new(ConfigOverrides {
        config_path: Some(file.path().to_path_buf()),
        ..Default::default()
    })
    .resolve()
    .unwrap();

    assert_eq!(resolved.backend.base_url, "https://env.example.edu/api");
    assert_eq!(resolved.auth.access_token.as_deref(), Some("env-access"));
    // Not overridden: still from TOML
    assert_eq!(resolved.auth.refresh_token.as_deref(), Some("toml-refresh"));

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env_and_toml() {
    clear_env();
    let file = write_config(SAMPLE);
    env::set_var(ENV_BACKEND_URL, "https://env.example.edu/api");
    env::set_var(ENV_LOG_LEVEL, "warn");

    let resolved = ConfigResolver::new(ConfigOverrides {
        config_path: Some(file.path().to_path_buf()),
        backend_url: Some("https://cli.example.edu/api".to_string()),
        log_level: Some("trace".to_string()),
        ..Default::default()
    })
    .resolve()
    .unwrap();

    assert_eq!(resolved.backend.base_url, "https://cli.example.edu/api");
    assert_eq!(resolved.logging.level, "trace");

    clear_env();
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_env();
    let file = write_config(SAMPLE);
    env::set_var(ENV_CONFIG_PATH, file.path());

    let resolved = ConfigResolver::new(ConfigOverrides::default()).resolve().unwrap();
    assert_eq!(resolved.backend.base_url, "https://toml.example.edu/api");

    clear_env();
}

#[test]
#[serial]
fn test_explicit_missing_file_is_error() {
    clear_env();
    let result = ConfigResolver::new(ConfigOverrides {
        config_path: Some("/nonexistent/tams/config.toml".into()),
        ..Default::default()
    })
    .resolve();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_invalid_base_url_is_error() {
    clear_env();
    let result = ConfigResolver::new(ConfigOverrides {
        config_path: Some(write_config(SAMPLE).path().to_path_buf()),
        backend_url: Some("tams.example.edu".to_string()),
        ..Default::default()
    })
    .resolve();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_zero_timeout_is_error() {
    clear_env();
    let file = write_config("[backend]\ntimeout_secs = 0\n");

    let result = ConfigResolver::new(ConfigOverrides {
        config_path: Some(file.path().to_path_buf()),
        ..Default::default()
    })
    .resolve();

    assert!(result.is_err());
}

#[test]
fn test_malformed_toml_is_error() {
    let file = write_config("[backend\nbase_url = ");
    assert!(load_toml_config(file.path()).is_err());
}

#[test]
fn test_write_then_load_preserves_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        auth: AuthConfig {
            access_token: Some("a2".to_string()),
            refresh_token: Some("r2".to_string()),
        },
        ..TomlConfig::default()
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.auth, config.auth);
    assert_eq!(loaded.backend, config.backend);
    assert!(!path.with_extension("toml.tmp").exists());
}
