//! Runtime settings

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Staging and production refuse placeholder practice profiles
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Practice this deployment serves
    #[serde(default)]
    pub practice: PracticeProfile,

    /// Growth engine YAML; defaults apply when the file is absent
    #[serde(default = "default_growth_config_path")]
    pub growth_config_path: String,
}

fn default_growth_config_path() -> String {
    "config/growth.yaml".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            practice: PracticeProfile::default(),
            growth_config_path: default_growth_config_path(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_practice()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_practice(&self) -> Result<(), ConfigError> {
        let practice = &self.practice;

        if practice.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "practice.name".to_string(),
                message: "Practice name is required for message templates".to_string(),
            });
        }

        if practice.id.is_nil() {
            if self.environment.is_strict() {
                return Err(ConfigError::InvalidValue {
                    field: "practice.id".to_string(),
                    message: "A practice id must be configured outside development".to_string(),
                });
            }
            tracing::warn!("practice.id not configured, using the nil development practice");
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Serve Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Practice identity used for tenancy and message placeholders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeProfile {
    #[serde(default)]
    pub id: Uuid,

    #[serde(default = "default_practice_name")]
    pub name: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub booking_link: String,

    /// Label shown next to scheduled times; send slots are computed in UTC
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,
}

fn default_practice_name() -> String {
    "Our Practice".to_string()
}
fn default_timezone_label() -> String {
    "UTC".to_string()
}

impl Default for PracticeProfile {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: default_practice_name(),
            phone: String::new(),
            booking_link: String::new(),
            timezone_label: default_timezone_label(),
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and the environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("PRACTICE_GROWTH")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.growth_config_path, "config/growth.yaml");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_empty_document_matches_defaults() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        let defaults = Settings::default();
        assert_eq!(settings.growth_config_path, defaults.growth_config_path);
        assert_eq!(settings.server.port, defaults.server.port);
        assert_eq!(settings.practice.name, defaults.practice.name);
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_production_requires_practice_id() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        assert!(settings.validate().is_err());

        settings.practice.id = Uuid::new_v4();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_blank_practice_name_rejected() {
        let mut settings = Settings::default();
        settings.practice.name = "  ".to_string();
        assert!(settings.validate().is_err());
    }
}
