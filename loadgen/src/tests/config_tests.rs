//! Tests for configuration loading and CLI override precedence

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use shared::{ScheduleMode, TransportKind};
use tempfile::NamedTempFile;

use crate::config::{apply_overrides, ConfigManager, ConfigOverrides};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn address_only() -> ConfigOverrides {
    ConfigOverrides {
        address: Some("example.com:443".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_defaults_without_file() {
    let mut manager = ConfigManager::new(None).unwrap();
    let config = manager.load_config(&address_only()).await.unwrap();

    assert_eq!(config.address, "example.com:443");
    assert_eq!(config.transport, TransportKind::Tls);
    assert_eq!(config.max_connections, 100);
    assert_eq!(config.rate, 0);
    assert_eq!(config.hold, Duration::from_secs(300));
    assert_eq!(config.mode, ScheduleMode::Sequential);
    assert!(manager.config.is_some());
}

#[tokio::test]
async fn test_missing_address_is_rejected() {
    let mut manager = ConfigManager::new(None).unwrap();
    let err = manager
        .load_config(&ConfigOverrides::default())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("address is required"));
    assert!(manager.config.is_none());
}

#[tokio::test]
async fn test_file_values_are_used() {
    let file = write_config(
        r#"
address = "10.0.0.5:8443"
transport = "tcp"
connections = 250
rate = 40
wait = "45s"
mode = "concurrent"
"#,
    );

    let mut manager = ConfigManager::new(Some(file.path().to_path_buf())).unwrap();
    let config = manager
        .load_config(&ConfigOverrides::default())
        .await
        .unwrap();

    assert_eq!(config.address, "10.0.0.5:8443");
    assert_eq!(config.transport, TransportKind::Tcp);
    assert_eq!(config.max_connections, 250);
    assert_eq!(config.rate, 40);
    assert_eq!(config.hold, Duration::from_secs(45));
    assert_eq!(config.mode, ScheduleMode::Concurrent);
}

#[tokio::test]
async fn test_cli_overrides_file() {
    let file = write_config(
        r#"
address = "10.0.0.5:8443"
transport = "tcp"
max_connections = 250
rate = 40
hold = "45s"
"#,
    );

    let overrides = ConfigOverrides {
        address: Some("[::1]:9000".to_string()),
        rate: Some(0),
        hold: Some(Duration::from_millis(500)),
        ..Default::default()
    };

    let mut manager = ConfigManager::new(Some(file.path().to_path_buf())).unwrap();
    let config = manager.load_config(&overrides).await.unwrap();

    assert_eq!(config.address, "[::1]:9000");
    assert_eq!(config.rate, 0);
    assert_eq!(config.hold, Duration::from_millis(500));
    // Untouched by the command line
    assert_eq!(config.transport, TransportKind::Tcp);
    assert_eq!(config.max_connections, 250);
}

#[test]
fn test_missing_file_is_rejected() {
    let result = ConfigManager::new(Some(PathBuf::from("/nonexistent/loadgen.toml")));
    let err = result.err().unwrap();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigManager::new(Some(dir.path().to_path_buf())).err().unwrap();
    assert!(err.to_string().contains("not a file"));
}

#[tokio::test]
async fn test_syntax_error_reports_file() {
    let file = write_config("address = \"example.com:443\"\nrate = \"fast\"\n");
    let mut manager = ConfigManager::new(Some(file.path().to_path_buf())).unwrap();
    let err = manager
        .load_config(&ConfigOverrides::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}

#[tokio::test]
async fn test_invalid_values_fail_validation() {
    let file = write_config("address = \"example.com:443\"\nmax_connections = 0\n");
    let mut manager = ConfigManager::new(Some(file.path().to_path_buf())).unwrap();
    let err = manager
        .load_config(&ConfigOverrides::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Validation failed"));
    assert!(format!("{:#}", err).contains("max_connections"));
}

#[tokio::test]
async fn test_cli_can_fix_invalid_file_value() {
    let file = write_config("address = \"example.com\"\n");
    let mut manager = ConfigManager::new(Some(file.path().to_path_buf())).unwrap();
    let config = manager.load_config(&address_only()).await.unwrap();
    assert_eq!(config.address, "example.com:443");
}

#[test]
fn test_apply_overrides_keeps_unset_fields() {
    let mut config = shared::LoadConfig::default();
    apply_overrides(
        &mut config,
        &ConfigOverrides {
            transport: Some(TransportKind::Ws),
            max_connections: Some(7),
            mode: Some(ScheduleMode::Concurrent),
            channel_buffer_size: Some(32),
            ..Default::default()
        },
    );

    assert_eq!(config.transport, TransportKind::Ws);
    assert_eq!(config.max_connections, 7);
    assert_eq!(config.mode, ScheduleMode::Concurrent);
    assert_eq!(config.channel_buffer_size, 32);
    assert_eq!(config.rate, 0);
    assert_eq!(config.hold, Duration::from_secs(300));
}
