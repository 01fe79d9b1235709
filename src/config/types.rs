use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;

/// Default message broadcast when the session cannot be recovered.
pub const DEFAULT_SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: backend location, refresh behaviour, token store and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    /// Backend base URL, e.g. "https://api.example.com". No trailing slash needed.
    pub base_url: String,
    pub user_agent: Option<String>,
    /// Timeout applied by the transport to every ordinary request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load config from a YAML file, then apply `AUTHCLIENT_*` environment overrides
/// (nested keys separated by `__`, e.g. `AUTHCLIENT_REFRESH__TIMEOUT_IN_MS`).
pub fn load_config(path: &str) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("AUTHCLIENT_").split("__"));
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// How (and whether) expired credentials are refreshed.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RefreshConfig {
    /// When false every 401 is terminal.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_path")]
    pub path: String,
    /// Upper bound for the whole refresh round trip.
    #[serde(default = "default_refresh_timeout")]
    pub timeout_in_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            enabled: true,
            path: default_refresh_path(),
            timeout_in_ms: default_refresh_timeout(),
        }
    }
}

/// Session-expired broadcast settings.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SessionConfig {
    #[serde(default = "default_expired_message")]
    pub expired_message: String,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            expired_message: default_expired_message(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_refresh_path() -> String {
    "/api/auth/refresh".to_string()
}

fn default_refresh_timeout() -> u64 {
    3_000
}

fn default_expired_message() -> String {
    DEFAULT_SESSION_EXPIRED_MESSAGE.to_string()
}

fn default_channel_capacity() -> usize {
    16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn parse(yaml: &str) -> ConfigV1 {
        let config: Config = Figment::new()
            .merge(Yaml::string(yaml))
            .extract()
            .expect("Failed to parse test config YAML");
        match config {
            Config::ConfigV1(cfg) => cfg,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
version: "1.0.0"
base_url: "http://localhost:8080"
"#,
        );

        assert_eq!(config.base_url, "http://localhost:8080");
        assert!(config.refresh.enabled);
        assert_eq!(config.refresh.path, "/api/auth/refresh");
        assert_eq!(config.refresh.timeout_in_ms, 3000);
        assert_eq!(config.session.expired_message, DEFAULT_SESSION_EXPIRED_MESSAGE);
        assert!(matches!(config.store, StoreConfig::Memory));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
version: "1.0.0"
base_url: "https://api.example.com"
user_agent: "fitness-app/2.1"
request_timeout_in_ms: 5000
refresh:
  enabled: false
  path: "/v2/auth/refresh"
  timeout_in_ms: 1500
session:
  expired_message: "Please sign in again"
  channel_capacity: 4
store:
  type: file
  path: "/tmp/tokens.json"
logging:
  level: "debug"
  format: "json"
"#,
        );

        assert_eq!(config.user_agent.as_deref(), Some("fitness-app/2.1"));
        assert_eq!(config.request_timeout_in_ms, 5000);
        assert!(!config.refresh.enabled);
        assert_eq!(config.refresh.path, "/v2/auth/refresh");
        assert_eq!(config.refresh.timeout_in_ms, 1500);
        assert_eq!(config.session.channel_capacity, 4);
        match config.store {
            StoreConfig::File(file) => assert_eq!(file.path, "/tmp/tokens.json"),
            other => panic!("unexpected store config: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let result = Figment::new()
            .merge(Yaml::string(
                r#"
version: "9.9.9"
base_url: "http://localhost"
"#,
            ))
            .extract::<Config>();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_applies_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "client.yaml",
                r#"
version: "1.0.0"
base_url: "http://localhost:8080"
"#,
            )?;
            jail.set_env("AUTHCLIENT_REFRESH__TIMEOUT_IN_MS", "250");

            let config = load_config("client.yaml")?;
            assert_eq!(config.refresh.timeout_in_ms, 250);
            Ok(())
        });
    }
}
