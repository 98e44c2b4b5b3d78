// ABOUTME: Tests for configuration loading and validation
// ABOUTME: Verifies TOML parsing, env var overrides, defaults, and required field validation

use gordy::config::Config;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    for var in [
        "GORDY_CONFIG_PATH",
        "MATRIX_HOME_SERVER",
        "MATRIX_USER_ID",
        "MATRIX_PASSWORD",
        "MATRIX_DEVICE_NAME",
        "MATRIX_STORE_PATH",
        "GORDY_COMMAND_PREFIX",
        "GORDY_COMMAND_TIMEOUT_SECS",
        "GORDY_GREET_ON_STARTUP",
        "GORDY_SYNC_RETRY_SECS",
        "GORDY_METRICS_LISTEN",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

const FULL_CONFIG: &str = r#"
[matrix]
home_server = "https://test.matrix.org"
user_id = "@gordy:test.matrix.org"
password = "secret123"
device_name = "gordy-test"
store_path = "/tmp/gordy-store"

[bot]
command_prefix = "?"
command_timeout_secs = 12
greet_on_startup = false

[sync]
timeout_ms = 5000
retry_delay_secs = 3

[metrics]
listen = "127.0.0.1:9187"
"#;

#[test]
#[serial]
fn test_config_loads_from_toml_file() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    std::env::set_var("GORDY_CONFIG_PATH", &path);

    let config = Config::load().unwrap();

    assert_eq!(config.matrix.home_server, "https://test.matrix.org");
    assert_eq!(config.matrix.user_id, "@gordy:test.matrix.org");
    assert_eq!(config.matrix.password, Some("secret123".to_string()));
    assert_eq!(config.matrix.device_name, "gordy-test");
    assert_eq!(config.store_path(), PathBuf::from("/tmp/gordy-store"));
    assert_eq!(config.bot.command_prefix, '?');
    assert!(!config.bot.greet_on_startup);
    assert_eq!(config.sync_timeout(), Duration::from_millis(5000));
    assert_eq!(config.sync_retry_delay(), Duration::from_secs(3));
    assert_eq!(
        config.metrics_listen(),
        Some("127.0.0.1:9187".parse().unwrap())
    );

    let settings = config.bot_settings();
    assert_eq!(settings.command_prefix, '?');
    assert_eq!(settings.command_timeout, Duration::from_secs(12));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_defaults_for_optional_sections() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[matrix]
home_server = "https://test.matrix.org"
user_id = "@gordy:test.matrix.org"
"#,
    );

    let config = Config::load_from(Some(&path)).unwrap();
    config.validate().unwrap();

    assert_eq!(config.matrix.device_name, "gordy");
    assert_eq!(config.matrix.password, None);
    assert_eq!(config.bot.command_prefix, '!');
    assert_eq!(config.bot.command_timeout_secs, 30);
    assert!(config.bot.greet_on_startup);
    assert_eq!(config.sync.timeout_ms, 30_000);
    assert_eq!(config.sync.retry_delay_secs, 15);
    assert_eq!(config.metrics_listen(), None);

    // Default store path is per user and device
    let store = config.store_path();
    let leaf = store.file_name().unwrap().to_string_lossy().to_string();
    assert!(leaf.contains("gordy"), "unexpected store leaf {}", leaf);
}

#[test]
#[serial]
fn test_config_env_var_overrides() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    std::env::set_var("GORDY_CONFIG_PATH", &path);
    std::env::set_var("MATRIX_HOME_SERVER", "https://override.matrix.org");
    std::env::set_var("MATRIX_PASSWORD", "override-password");
    std::env::set_var("GORDY_COMMAND_PREFIX", "$");
    std::env::set_var("GORDY_COMMAND_TIMEOUT_SECS", "45");
    std::env::set_var("GORDY_GREET_ON_STARTUP", "true");
    std::env::set_var("GORDY_SYNC_RETRY_SECS", "7");

    let config = Config::load().unwrap();

    // Env vars should override TOML values
    assert_eq!(config.matrix.home_server, "https://override.matrix.org");
    assert_eq!(config.matrix.password, Some("override-password".to_string()));
    assert_eq!(config.bot.command_prefix, '$');
    assert_eq!(config.bot.command_timeout_secs, 45);
    assert!(config.bot.greet_on_startup);
    assert_eq!(config.sync.retry_delay_secs, 7);
    // Untouched values survive
    assert_eq!(config.matrix.user_id, "@gordy:test.matrix.org");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_env_only() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");
    std::env::set_var("MATRIX_HOME_SERVER", "https://env.matrix.org");
    std::env::set_var("MATRIX_USER_ID", "gordy");

    let config = Config::load_from(Some(&path)).unwrap();
    config.validate().unwrap();
    assert_eq!(config.matrix.home_server, "https://env.matrix.org");
    assert_eq!(config.matrix.user_id, "gordy");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_rejects_multi_char_prefix_env() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    std::env::set_var("GORDY_COMMAND_PREFIX", "!!");

    let err = Config::load_from(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("single character"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_rejects_non_numeric_timeout_env() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, FULL_CONFIG);
    std::env::set_var("GORDY_COMMAND_TIMEOUT_SECS", "soon");

    assert!(Config::load_from(Some(&path)).is_err());

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_validate_requires_homeserver_and_user() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[bot]\ncommand_prefix = \"!\"\n");

    let config = Config::load_from(Some(&path)).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("home_server"));

    let mut config = config;
    config.matrix.home_server = "https://test.matrix.org".into();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("user_id"));
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = Config::default();
    config.matrix.home_server = "https://test.matrix.org".into();
    config.matrix.user_id = "@gordy:test.matrix.org".into();
    config.validate().unwrap();

    let mut bad_user = config.clone();
    bad_user.matrix.user_id = "@gordy".into();
    assert!(bad_user.validate().is_err());

    let mut bad_prefix = config.clone();
    bad_prefix.bot.command_prefix = ' ';
    assert!(bad_prefix.validate().is_err());

    let mut bad_timeout = config.clone();
    bad_timeout.bot.command_timeout_secs = 0;
    assert!(bad_timeout.validate().is_err());

    let mut bad_listen = config;
    bad_listen.metrics.listen = Some("not-an-address".into());
    assert!(bad_listen.validate().is_err());
}

#[test]
#[serial]
fn test_config_malformed_toml_is_error() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[matrix\nhome_server = ");

    let err = Config::load_from(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}

#[test]
fn test_debug_redacts_password() {
    let mut config = Config::default();
    config.matrix.password = Some("hunter2".into());
    let debug = format!("{:?}", config);
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("[REDACTED]"));
}
