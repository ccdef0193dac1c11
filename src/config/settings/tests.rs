use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.server.name, "toolbox-mcp");
    assert_eq!(config.server.log_level, "info");
    assert!(!config.server.debug);
    assert!(config.expense_tracker.enabled);
    assert_eq!(config.expense_tracker.base_url, None);
    assert_eq!(config.expense_tracker.timeout_seconds, 10);
    assert_eq!(
        config.expense_tracker.ssm_parameter.as_deref(),
        Some("/exptrac.backend.url")
    );
    assert_eq!(config.expense_tracker.ssm_region, "ap-southeast-2");
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.server.name = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.server.log_level = "verbose".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.expense_tracker.base_url = Some("not a url".to_string());
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.expense_tracker.base_url = Some("ftp://files.example.com".to_string());
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidScheme(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.expense_tracker.timeout_seconds = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.expense_tracker.timeout_seconds = 301;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn log_level_aliases() {
    let mut server = ServerConfig::default();
    assert!(server.set_log_level("WARNING".to_string()).is_ok());
    assert_eq!(server.log_level, "warn");
    assert!(server.set_log_level("CRITICAL".to_string()).is_ok());
    assert_eq!(server.log_level, "error");
    assert!(server.set_log_level("loud".to_string()).is_err());
    assert_eq!(server.log_level, "error");
}

#[test]
fn filter_directive_honours_debug_flag() {
    let mut server = ServerConfig {
        log_level: "INFO".to_string(),
        ..ServerConfig::default()
    };
    assert_eq!(server.filter_directive(), "info");

    server.debug = true;
    assert_eq!(server.filter_directive(), "debug");
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.expense_tracker.base_url = Some("https://expenses.example.com".to_string());

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_fills_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [expense_tracker]
        base_url = "http://localhost:8080"
        "#,
    )
    .expect("should parse partial toml");

    assert_eq!(parsed.server, ServerConfig::default());
    assert_eq!(
        parsed.expense_tracker.base_url.as_deref(),
        Some("http://localhost:8080")
    );
    assert_eq!(parsed.expense_tracker.timeout_seconds, 10);
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load_with_env(temp_dir.path(), env_from(&[]))
        .expect("missing file loads defaults");

    assert_eq!(config.server, ServerConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.config_file_path(), temp_dir.path().join("config.toml"));
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = Config {
        base_dir: temp_dir.path().join("nested"),
        ..Config::default()
    };
    config
        .server
        .set_name("expenses-server".to_string())
        .expect("valid name");
    config
        .expense_tracker
        .set_base_url(Some("https://expenses.example.com/api".to_string()))
        .expect("valid url");
    config.save().expect("config saves");

    let reloaded = Config::load_with_env(temp_dir.path().join("nested"), env_from(&[]))
        .expect("config reloads");
    assert_eq!(reloaded, config);
}

#[test]
fn invalid_file_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[expense_tracker]\ntimeout_seconds = 0\n",
    )
    .expect("write config");

    assert!(Config::load_with_env(temp_dir.path(), env_from(&[])).is_err());
}

#[test]
fn environment_overrides() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load_with_env(
        temp_dir.path(),
        env_from(&[
            ("SERVER_NAME", "calculator-server"),
            ("LOG_LEVEL", "DEBUG"),
            ("DEBUG", "true"),
            ("BASE_URL", "http://localhost:9000"),
        ]),
    )
    .expect("overrides apply");

    assert_eq!(config.server.name, "calculator-server");
    assert_eq!(config.server.log_level, "DEBUG");
    assert!(config.server.debug);
    assert_eq!(
        config
            .expense_tracker
            .parsed_base_url()
            .map(|u| u.to_string()),
        Some("http://localhost:9000/".to_string())
    );
}

#[test]
fn invalid_environment_override_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    assert!(Config::load_with_env(temp_dir.path(), env_from(&[("DEBUG", "maybe")])).is_err());
    assert!(Config::load_with_env(temp_dir.path(), env_from(&[("BASE_URL", "nope")])).is_err());
}

#[test]
fn blank_base_url_override_clears_setting() {
    let mut config = Config::default();
    config.expense_tracker.base_url = Some("http://localhost:1".to_string());
    config
        .apply_env_overrides(env_from(&[("BASE_URL", "  ")]))
        .expect("blank is allowed");
    assert_eq!(config.expense_tracker.base_url, None);
}

#[test]
fn setter_validation() {
    let mut expense = ExpenseTrackerConfig::default();

    assert!(expense.set_timeout_seconds(30).is_ok());
    assert!(expense.set_timeout_seconds(0).is_err());
    assert_eq!(expense.timeout(), Duration::from_secs(30));

    assert!(expense.set_base_url(Some("https://ok.example.com".to_string())).is_ok());
    assert!(expense.set_base_url(Some("mailto:me@example.com".to_string())).is_err());
    assert_eq!(
        expense.base_url.as_deref(),
        Some("https://ok.example.com")
    );
    assert!(expense.set_base_url(None).is_ok());
    assert_eq!(expense.base_url, None);

    let mut server = ServerConfig::default();
    assert!(server.set_name(String::new()).is_err());
    assert!(server.set_name("my-mcp-server".to_string()).is_ok());
}
