//! Tests for config file location and loading
//!
//! Tests that manipulate NAHUEL_CONFIG are marked with #[serial] so they run
//! sequentially, not in parallel.

use nahuel_common::config::{
    locate_config_file, ConfigOverrides, ConfigSource, ServiceConfig, TomlConfig,
    CONFIG_PATH_ENV,
};
use nahuel_common::CodeResolution;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        database = "/srv/nahuel/catalog.db"
        host = "127.0.0.1"
        port = 9090
        code_resolution = "strict"
        log_level = "debug"
        "#,
    );

    let config = TomlConfig::load(file.path()).expect("should parse");
    assert_eq!(config.database, Some(PathBuf::from("/srv/nahuel/catalog.db")));
    assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(config.port, Some(9090));
    assert_eq!(config.code_resolution, Some(CodeResolution::Strict));
    assert_eq!(config.log_level.as_deref(), Some("debug"));
}

#[test]
fn test_partial_config_file_keeps_defaults() {
    let file = write_config("port = 7000\n");

    let config = ServiceConfig::resolve(
        ConfigOverrides::default(),
        TomlConfig::load(file.path()).unwrap(),
    );
    assert_eq!(config.port, 7000);
    assert_eq!(config.code_resolution, CodeResolution::Permissive);
}

#[test]
fn test_invalid_config_file_is_an_error() {
    let file = write_config("code_resolution = \"sometimes\"\n");
    assert!(TomlConfig::load(file.path()).is_err());

    let file = write_config("unknown_key = 1\n");
    assert!(TomlConfig::load(file.path()).is_err());
}

#[test]
fn test_unreadable_config_falls_back_to_defaults() {
    // Missing file must not stop startup
    let missing = PathBuf::from("/nonexistent/nahuel/config.toml");
    let (config, source) = TomlConfig::discover(Some(&missing));
    assert!(matches!(source, ConfigSource::Ignored(path, _) if path == missing));
    assert!(config.port.is_none());
    assert!(config.database.is_none());
}

#[test]
#[serial]
fn test_env_var_names_config_file() {
    let file = write_config("port = 7100\n");
    env::set_var(CONFIG_PATH_ENV, file.path());

    let located = locate_config_file(None);
    assert_eq!(located.as_deref(), Some(file.path()));

    let (config, source) = TomlConfig::discover(None);
    assert_eq!(config.port, Some(7100));
    assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));

    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let from_env = write_config("port = 7200\n");
    let explicit = write_config("port = 7300\n");
    env::set_var(CONFIG_PATH_ENV, from_env.path());

    let (config, _) = TomlConfig::discover(Some(explicit.path()));
    assert_eq!(config.port, Some(7300));

    env::remove_var(CONFIG_PATH_ENV);
}
