//! Tests for config file discovery and merging.

use quiver_config::{AdapterKind, ConfigError, ConfigLoader, HttpSetting};
use std::fs;
use tempfile::TempDir;

#[test]
fn loads_defaults_without_config_file() {
    let temp = TempDir::new().unwrap();

    let loader = ConfigLoader::new(temp.path()).without_env();
    assert!(loader.discover().is_none());

    let config = loader.load().unwrap();
    assert_eq!(config.paths.tools.to_str(), Some("src/tools"));
    assert!(!config.http_enabled());
}

#[test]
fn loads_json_config_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("quiver.config.json"),
        r#"{
            "http": { "port": 4100 },
            "paths": { "tools": "handlers" },
            "template": { "name": "Weather server" }
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::new(temp.path()).without_env().load().unwrap();

    assert_eq!(config.paths.tools.to_str(), Some("handlers"));
    let http = config.http.resolve().unwrap();
    assert_eq!(http.port, 4100);
    assert_eq!(http.endpoint, "/mcp");
    assert_eq!(config.template.name, "Weather server");
    // Unset template fields keep their defaults.
    assert!(!config.template.description.is_empty());
}

#[test]
fn loads_toml_config_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("quiver.config.toml"),
        r#"
http = true
stdio = true

[experimental]
adapter = "nextjs"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(temp.path()).without_env().load().unwrap();

    assert_eq!(config.http, HttpSetting::Enabled(true));
    assert!(config.stdio);
    assert_eq!(config.experimental.adapter, Some(AdapterKind::Nextjs));
}

#[test]
fn json_file_wins_over_toml_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("quiver.config.json"), r#"{ "stdio": true }"#).unwrap();
    fs::write(temp.path().join("quiver.config.toml"), "stdio = false\n").unwrap();

    let loader = ConfigLoader::new(temp.path()).without_env();
    assert!(loader.discover().unwrap().ends_with("quiver.config.json"));
    assert!(loader.load().unwrap().stdio);
}

#[test]
fn explicit_file_is_used() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("custom.json"), r#"{ "stdio": true }"#).unwrap();

    let config = ConfigLoader::new(temp.path())
        .with_file("custom.json")
        .without_env()
        .load()
        .unwrap();
    assert!(config.stdio);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let temp = TempDir::new().unwrap();

    let err = ConfigLoader::new(temp.path())
        .with_file("nope.json")
        .without_env()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn unsupported_extension_is_an_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("quiver.yaml"), "stdio: true\n").unwrap();

    let err = ConfigLoader::new(temp.path())
        .with_file("quiver.yaml")
        .without_env()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
}

#[test]
fn unknown_field_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("quiver.config.json"), r#"{ "webpack": {} }"#).unwrap();

    let err = ConfigLoader::new(temp.path()).without_env().load().unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
