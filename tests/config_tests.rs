// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use label_capture::Config;
use label_capture::backends::camera::CameraBackendType;

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.aspect_ratio, 1.0, "Square labels by default");
    assert_eq!(config.camera.backend, CameraBackendType::V4l2);
    assert!(
        config.comparison.endpoint.is_none(),
        "No comparison backend should be configured by default"
    );
}

#[test]
fn test_config_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sub").join("config.json");

    let mut config = Config::default();
    config.aspect_ratio = 2.5;
    config.stability.min_stable_run = 30;
    config.comparison.endpoint = Some("http://localhost:8000/compare".into());
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_malformed_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load(Some(&path)), Config::default());
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_eq!(Config::load(Some(&path)), Config::default());
}

#[test]
fn test_config_backend_names() {
    let config: Config = serde_json::from_str(r#"{"camera": {"backend": "File"}}"#).unwrap();
    assert_eq!(config.camera.backend, CameraBackendType::File);
}
