use std::time::Duration;

use runpad::config::{Config, ConfigError};

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{}/configs/valid_full.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.http.user_agent, "runpad-tests/1.0");
    assert_eq!(config.tio.run_url, "http://127.0.0.1:9000/run");
    assert_eq!(config.tio.catalog_ttl(), Some(Duration::from_secs(300)));
    assert_eq!(config.tio.aliases["golang"], "go");
    assert_eq!(config.piston.compile_memory_limit, 268_435_456);
    assert_eq!(config.mystbin.timeout(), Duration::from_secs(5));
    assert_eq!(config.output.max_chars, 1000);
    assert_eq!(
        config.settings.path,
        std::path::Path::new("/tmp/runpad-test-settings.json")
    );
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{}/configs/valid_minimal.toml", FIXTURES_PATH);
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.output.max_lines, 10);
    assert_eq!(config.output.max_chars, 1986);
    assert_eq!(config.tio.run_url, "https://tio.run/cgi-bin/run/api/");
}

#[test]
fn test_load_invalid_url() {
    let path = format!("{}/configs/invalid_url.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_empty_alias() {
    let path = format!("{}/configs/invalid_empty_alias.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_timeout() {
    let path = format!("{}/configs/invalid_timeout.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_missing_file() {
    let path = format!("{}/configs/does_not_exist.toml", FIXTURES_PATH);
    let result = Config::from_file(&path);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_example_config_round_trips() {
    let config = Config::parse_toml(runpad::EXAMPLE_CONFIG).unwrap();
    assert_eq!(config.mystbin.paste_url, "https://mystb.in/");
}
