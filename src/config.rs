//! Configuration loader and logging initialization (SPEC_FULL §4.7, §4.8).
//! Grounded on the teacher's `config.rs` (`Config::load` reading a TOML file
//! into a `#[derive(Deserialize)]` struct, `validate()` before returning) and
//! `infrastructure/config/logging.rs` (`LoggingConfig::init` switching on a
//! `pretty`/`json` format string and respecting `RUST_LOG`).

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::credentials::Credentials;
use crate::domain::exchange::PollingBounds;
use crate::error::{ConfigError, Error};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(rename = "credentials", default)]
    pub credentials: Vec<CredentialsEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub shared_secret: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PollingConfig {
    #[serde(default = "default_min_polling")]
    pub min_polling_delay_secs: u64,
    #[serde(default = "default_max_polling")]
    pub max_polling_delay_secs: u64,
}

fn default_min_polling() -> u64 {
    1
}

fn default_max_polling() -> u64 {
    30
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            min_polling_delay_secs: default_min_polling(),
            max_polling_delay_secs: default_max_polling(),
        }
    }
}

impl From<PollingConfig> for PollingBounds {
    fn from(c: PollingConfig) -> Self {
        PollingBounds {
            min: c.min_polling_delay_secs,
            max: c.max_polling_delay_secs,
        }
    }
}

/// Logging configuration (SPEC_FULL §4.8). `level` falls back to `RUST_LOG`
/// when set, exactly as the teacher's `LoggingConfig::init` does.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Initialize the global `tracing` subscriber. Safe to call more than
    /// once per process (e.g. from multiple test entry points) — repeat
    /// calls are swallowed rather than panicking.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let result = match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).try_init(),
            _ => fmt().with_env_filter(filter).try_init(),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "tracing subscriber already initialized");
        }
    }
}

/// Outbound notifier configuration: an optional webhook URL. Absent →
/// notifications are logged instead of dispatched (§1 Non-goals: concrete
/// notification sinks are out of scope for the core, but the daemon needs
/// some default).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
}

/// One credentials record as it appears in the TOML file, before
/// environment-variable overrides are applied (§4.7).
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsEntry {
    pub name: String,
    pub exchange: String,
    pub key: String,
    pub secret: String,
    pub passphrase: Option<String>,
    pub endpoint: Option<String>,
}

impl CredentialsEntry {
    /// Apply `<NAME>_KEY` / `<NAME>_SECRET` / `<NAME>_PASSPHRASE` environment
    /// overrides, `name` uppercased (§4.7).
    fn with_env_overrides(mut self) -> Self {
        let prefix = self.name.to_uppercase();
        if let Ok(key) = std::env::var(format!("{prefix}_KEY")) {
            self.key = key;
        }
        if let Ok(secret) = std::env::var(format!("{prefix}_SECRET")) {
            self.secret = secret;
        }
        if let Ok(passphrase) = std::env::var(format!("{prefix}_PASSPHRASE")) {
            self.passphrase = Some(passphrase);
        }
        self
    }

    pub fn into_credentials(self) -> Credentials {
        let entry = self.with_env_overrides();
        Credentials {
            name: entry.name,
            exchange: entry.exchange,
            key: entry.key,
            secret: entry.secret,
            passphrase: entry.passphrase,
            endpoint: entry.endpoint,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.shared_secret.is_empty() {
            return Err(ConfigError::MissingField {
                field: "webhook.shared_secret",
            });
        }
        if self.polling.min_polling_delay_secs > self.polling.max_polling_delay_secs {
            return Err(ConfigError::InvalidValue {
                field: "polling",
                reason: "min_polling_delay_secs must be <= max_polling_delay_secs".to_string(),
            });
        }
        Ok(())
    }

    /// Resolved credentials list, each entry's secrets overridden from the
    /// environment where present (§4.7).
    pub fn credentials(&self) -> Vec<Credentials> {
        self.credentials.iter().cloned().map(CredentialsEntry::into_credentials).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            [webhook]
            shared_secret = "s3cret"
            "#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.webhook.bind_address, "0.0.0.0:8080");
        assert_eq!(config.polling.min_polling_delay_secs, 1);
        assert_eq!(config.polling.max_polling_delay_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.credentials.is_empty());
    }

    #[test]
    fn rejects_empty_shared_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            [webhook]
            shared_secret = ""
            "#,
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn init_is_safe_to_call_more_than_once() {
        let logging = LoggingConfig::default();
        logging.init();
        logging.init();
    }

    #[test]
    fn environment_variable_overrides_credentials_key() {
        let entry = CredentialsEntry {
            name: "deribit".into(),
            exchange: "deribit".into(),
            key: "from-toml".into(),
            secret: "s".into(),
            passphrase: None,
            endpoint: None,
        };
        std::env::set_var("DERIBIT_KEY", "from-env");
        let creds = entry.into_credentials();
        std::env::remove_var("DERIBIT_KEY");
        assert_eq!(creds.key, "from-env");
    }
}
