//! Configuration tests

use crate::Error;
use crate::config::{API_BASE_URL_ENV, Config, Directories};
use mobupps_types::RefreshInterval;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.api_base_url, "http://localhost:8000");
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.top_k().get(), 20);
    assert_eq!(config.refresh_interval, RefreshInterval::Manual);
    assert_eq!(config.health_poll(), Duration::from_secs(30));
    assert_eq!(config.export_dir, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_yields_defaults() {
    let config = Config::load(&PathBuf::from("/nonexistent/mobupps/config.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_config_fills_defaults() {
    let file = write_config(
        r#"{
            "apiBaseUrl": "https://api.mobupps.example",
            "defaultTopK": 35,
            "refreshInterval": "10s"
        }"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.api_base_url, "https://api.mobupps.example");
    assert_eq!(config.top_k().get(), 35);
    assert_eq!(config.refresh_interval, RefreshInterval::TenSeconds);
    assert_eq!(config.request_timeout_secs, 30);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let file = write_config(r#"{"typoField": true, "healthPollSecs": 5}"#);
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.health_poll_secs, 5);
}

#[test]
fn test_invalid_values_are_rejected() {
    for content in [
        r#"{"defaultTopK": 12}"#,
        r#"{"defaultTopK": 60}"#,
        r#"{"requestTimeoutSecs": 0}"#,
        r#"{"apiBaseUrl": "localhost:8000"}"#,
    ] {
        let file = write_config(content);
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{content}: {err}");
    }
}

#[test]
fn test_invalid_interval_is_json_error() {
    let file = write_config(r#"{"refreshInterval": "1m"}"#);
    assert!(matches!(
        Config::load(file.path()).unwrap_err(),
        Error::Json(_)
    ));
}

#[test]
fn test_env_overrides_base_url() {
    let mut config = Config::default();
    config.apply_env(|key| (key == API_BASE_URL_ENV).then(|| "http://staging:9000".to_string()));
    assert_eq!(config.api_base_url, "http://staging:9000");

    config.apply_env(|_| Some("   ".to_string()));
    assert_eq!(config.api_base_url, "http://staging:9000");

    config.apply_env(|_| None);
    assert_eq!(config.api_base_url, "http://staging:9000");
}

#[test]
fn test_save_and_reload() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dirs = Directories::with_base(temp_dir.path().join("mobupps"));

    let config = Config {
        default_top_k: 50,
        refresh_interval: RefreshInterval::FiveSeconds,
        export_dir: Some(temp_dir.path().join("out")),
        ..Config::default()
    };
    config.save(&dirs.config_file).unwrap();

    let content = std::fs::read_to_string(&dirs.config_file).unwrap();
    assert!(content.contains("\"refreshInterval\": \"5s\""));
    assert!(content.contains("\"defaultTopK\": 50"));

    let reloaded = Config::load(&dirs.config_file).unwrap();
    assert_eq!(reloaded, config);
    assert_eq!(reloaded.export_dir(&dirs), temp_dir.path().join("out"));
}

#[test]
fn test_export_dir_defaults_to_data_exports() {
    let dirs = Directories::with_base(PathBuf::from("/tmp/mobupps-test"));
    assert_eq!(
        Config::default().export_dir(&dirs),
        PathBuf::from("/tmp/mobupps-test/exports")
    );
}
