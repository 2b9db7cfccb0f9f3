//! Integration tests for `ironpost config` command.
//!
//! Tests config validation and display functionality with real TOML files.

use std::fs;
use tempfile::TempDir;

use ironpost_core::config::IronpostConfig;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironpost.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "json"

[vuln]
db_path = "/tmp/ironpost/vuln.db"
pool_size = 2
matchers = ["distribution_did"]

[indexer]
enabled = true
scanners = ["rhel"]
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let result = IronpostConfig::load(&config_path).await;

    // Then: Should succeed
    let config = result.expect("valid config should load successfully");
    assert_eq!(config.vuln.pool_size, 2);
    assert_eq!(config.vuln.matchers, vec!["distribution_did"]);
    assert!(config.indexer.enabled);
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write bad config");

    let result = IronpostConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let config_path = std::path::PathBuf::from("/nonexistent/ironpost.toml");

    let result = IronpostConfig::load(&config_path).await;
    assert!(result.is_err(), "missing file should fail to load");
}

#[tokio::test]
async fn test_config_validate_empty_file() {
    // Given: An empty config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");

    fs::write(&config_path, "").expect("should write empty file");

    // When: Loading the config
    let config = IronpostConfig::load(&config_path)
        .await
        .expect("empty config should fall back to defaults");

    // Then: Defaults apply
    assert_eq!(config.vuln.batch_timeout_secs, 30);
    assert_eq!(config.indexer.layer_scan_concurrency, 10);
}

#[tokio::test]
async fn test_config_rejects_unknown_matcher() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironpost.toml");

    fs::write(
        &config_path,
        "[vuln]\nmatchers = [\"distribution_did\", \"distribution_flavor\"]\n",
    )
    .expect("should write config");

    // 매칭 어휘는 저장소 설정 변환 시점에 검증된다
    let config = IronpostConfig::load(&config_path)
        .await
        .expect("core config does not know the matcher vocabulary");
    let err = ironpost_vulnstore::VulnStoreConfig::from_core(&config.vuln)
        .expect_err("unknown matcher should fail conversion");
    assert!(err.to_string().contains("distribution_flavor"));
}

#[tokio::test]
async fn test_config_boundary_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironpost.toml");

    fs::write(
        &config_path,
        r#"
[vuln]
pool_size = 1
batch_timeout_secs = 1
matchers = []

[indexer]
layer_scan_concurrency = 1
"#,
    )
    .expect("should write config");

    let config = IronpostConfig::load(&config_path)
        .await
        .expect("boundary values should be accepted");
    assert_eq!(config.vuln.pool_size, 1);
    assert!(config.vuln.matchers.is_empty());
    assert_eq!(config.indexer.layer_scan_concurrency, 1);
}

#[tokio::test]
async fn test_config_special_characters_in_paths() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("ironpost.toml");

    fs::write(
        &config_path,
        "[vuln]\ndb_path = \"/var/lib/ironpost data/취약점 db.sqlite\"\n",
    )
    .expect("should write config");

    let config = IronpostConfig::load(&config_path)
        .await
        .expect("paths with spaces and unicode should load");
    assert_eq!(config.vuln.db_path, "/var/lib/ironpost data/취약점 db.sqlite");
}
