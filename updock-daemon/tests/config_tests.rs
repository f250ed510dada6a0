//! Configuration loading and validation tests.
//!
//! Covers TOML parsing, file loading, environment variable overrides,
//! partial configs, and validation.

use std::io::Write;

use serial_test::serial;
use updock_core::config::UpdockConfig;

#[test]
fn parse_full_config() {
    let toml_str = r#"
[general]
log_level = "debug"
log_format = "json"
pid_file = "/var/run/updock.pid"

[updater]
enabled = true
docker_socket = "/var/run/docker.sock"
check_interval_secs = 600
skip_containers = ["db", "cache"]
dry_run = true
run_once = false
prune_after_pass = true
compose_bin = "docker-compose"
tool_timeout_secs = 120

[notify]
enabled = true
webhook_url = "https://hooks.example.com/T000/B000"
timeout_secs = 5

[metrics]
enabled = true
listen_addr = "127.0.0.1"
port = 9464
endpoint = "/metrics"
"#;

    let config = UpdockConfig::parse(toml_str).expect("full config should parse");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.pid_file, "/var/run/updock.pid");

    assert!(config.updater.enabled);
    assert_eq!(config.updater.check_interval_secs, 600);
    assert_eq!(config.updater.skip_containers, vec!["db", "cache"]);
    assert!(config.updater.dry_run);
    assert_eq!(config.updater.tool_timeout_secs, 120);

    assert!(config.notify.enabled);
    assert_eq!(config.notify.webhook_url, "https://hooks.example.com/T000/B000");

    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9464);

    assert!(config.validate().is_ok());
}

#[test]
fn parse_partial_config_uses_defaults() {
    let toml_str = r#"
[general]
log_level = "warn"
"#;

    let config = UpdockConfig::parse(toml_str).expect("partial config should parse");

    assert_eq!(config.general.log_level, "warn");
    assert_eq!(config.general.log_format, "json");
    assert!(config.updater.enabled, "updater should be enabled by default");
    assert_eq!(config.updater.check_interval_secs, 300);
    assert!(!config.updater.dry_run);
    assert!(!config.notify.enabled, "notify should be disabled by default");
    assert!(!config.metrics.enabled, "metrics should be disabled by default");
}

#[test]
fn parse_empty_config_is_all_defaults() {
    let config = UpdockConfig::parse("").expect("empty config should parse");
    assert_eq!(config.updater.compose_bin, "docker-compose");
    assert!(config.validate().is_ok());
}

#[test]
fn parse_malformed_toml_fails() {
    let toml_str = r#"
[updater
check_interval_secs = 600
"#;
    assert!(UpdockConfig::parse(toml_str).is_err());
}

#[tokio::test]
async fn load_reads_config_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    writeln!(
        file,
        r#"
[updater]
check_interval_secs = 900
skip_containers = ["vault"]
"#
    )
    .expect("should write temp config");

    let config = UpdockConfig::load(file.path())
        .await
        .expect("should load config from file");

    assert_eq!(config.updater.check_interval_secs, 900);
    assert_eq!(config.updater.skip_containers, vec!["vault"]);
}

#[tokio::test]
async fn load_missing_file_fails() {
    let result = UpdockConfig::load("/nonexistent/updock.toml").await;
    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn env_overrides_take_precedence_over_file() {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    writeln!(
        file,
        r#"
[updater]
check_interval_secs = 300
dry_run = false
"#
    )
    .expect("should write temp config");

    unsafe {
        std::env::set_var("UPDOCK_UPDATER_CHECK_INTERVAL_SECS", "1200");
        std::env::set_var("UPDOCK_UPDATER_DRY_RUN", "true");
    }

    let config = UpdockConfig::load(file.path())
        .await
        .expect("should load config with env overrides");

    unsafe {
        std::env::remove_var("UPDOCK_UPDATER_CHECK_INTERVAL_SECS");
        std::env::remove_var("UPDOCK_UPDATER_DRY_RUN");
    }

    assert_eq!(config.updater.check_interval_secs, 1200);
    assert!(config.updater.dry_run);
}

#[test]
fn validation_rejects_bad_log_level() {
    let mut config = UpdockConfig::default();
    config.general.log_level = "verbose".to_owned();
    assert!(config.validate().is_err());
}

#[test]
fn validation_rejects_out_of_range_interval() {
    let mut config = UpdockConfig::default();
    config.updater.check_interval_secs = 0;
    assert!(config.validate().is_err());

    config.updater.check_interval_secs = 100_000;
    assert!(config.validate().is_err());
}

#[test]
fn validation_rejects_notify_without_webhook() {
    let mut config = UpdockConfig::default();
    config.notify.enabled = true;
    config.notify.webhook_url = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn validation_skips_updater_fields_when_disabled() {
    let mut config = UpdockConfig::default();
    config.updater.enabled = false;
    config.updater.docker_socket = String::new();
    assert!(
        config.validate().is_ok(),
        "disabled updater section should not be range-checked"
    );
}
