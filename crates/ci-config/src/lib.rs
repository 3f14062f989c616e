// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ci-config: the environment-driven configuration shared by every binary
//! in the workspace (§6 of the distilled spec's "Configuration" table).
//!
//! Precedence, lowest to highest: built-in defaults, an optional TOML file,
//! then environment variables. [`Config::load`] applies all three and
//! validates the result eagerly — a configuration error is always fatal
//! (§7: "Configuration error at startup — fail fast, process exits").

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for every override this crate recognizes.
const ENV_PREFIX: &str = "CI_ARBITER_";

/// The full, validated configuration for one process in the pipeline.
///
/// Every binary (`ci-gateway`, `ci-orchestrator`, `ci-arbiter`'s service,
/// each analyzer worker) loads one of these at startup and reads out only
/// the fields it needs; there is no per-binary config type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection string for ST (§6: `database_url`).
    pub database_url: String,

    /// Connection string for the message bus (§6: `redis_url` or
    /// analogous). Named `bus_url` here since [`ci_bus::MemoryBus`] is the
    /// only implementation today; a Redis Streams-backed `MessageBus`
    /// would read this the same way the prototype's `redis_url` is read.
    #[serde(alias = "redis_url")]
    pub bus_url: String,

    /// Shared key for HMAC request-signature verification (§4.3).
    pub hmac_secret_key: String,

    /// Per-analyzer call deadline in seconds (§4.4, default 300).
    pub agent_timeout_seconds: u64,

    /// Arbiter fan-in deadline after the first result, in seconds (§4.5,
    /// default 600).
    pub arbiter_wait_timeout_seconds: u64,

    /// Retry budget before an analyzer worker forces a `skip` verdict
    /// (§4.4, default 3).
    pub max_retries: u32,

    /// Acceptable clock skew for the gateway's request-signature
    /// timestamp, in seconds (§4.3, default 300).
    pub request_signature_window_seconds: u64,

    /// Whether the gateway deduplicates by `(repo_name, commit_hash)`
    /// rather than always minting a new job (§9's second Open Question;
    /// resolved in SPEC_FULL.md §3 as an opt-in flag, default `false`).
    pub dedupe_by_commit: bool,

    pub gateway_host: String,
    pub gateway_port: u16,

    pub orchestrator_host: String,
    pub orchestrator_port: u16,

    pub arbiter_host: String,
    pub arbiter_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://ci_arbiter.db".to_string(),
            bus_url: "memory://local".to_string(),
            hmac_secret_key: "change-me-in-production".to_string(),
            agent_timeout_seconds: 300,
            arbiter_wait_timeout_seconds: 600,
            max_retries: 3,
            request_signature_window_seconds: 300,
            dedupe_by_commit: false,
            gateway_host: "0.0.0.0".to_string(),
            gateway_port: 8000,
            orchestrator_host: "0.0.0.0".to_string(),
            orchestrator_port: 8001,
            arbiter_host: "0.0.0.0".to_string(),
            arbiter_port: 8105,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file, and
    /// environment variables, in that order, then validate.
    ///
    /// The file path is read from `CI_ARBITER_CONFIG_FILE` if set,
    /// otherwise `./ci-arbiter.toml` is used if it exists; a missing
    /// default file is not an error, but a file named explicitly via the
    /// environment variable must exist.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit_path = std::env::var(format!("{ENV_PREFIX}CONFIG_FILE")).ok();
        let default_path = Path::new("ci-arbiter.toml");

        let config = match explicit_path {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if default_path.exists() => Self::from_file(default_path)?,
            None => Self::default(),
        };

        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overlaid by a TOML file at `path`. Every field is
    /// optional in the file; omitted fields keep their default.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.display().to_string(), source })?;
        toml::from_str(&raw)
            .map_err(|source| ConfigError::ParseToml { path: path.display().to_string(), source })
    }

    /// Overlay recognized `CI_ARBITER_*` environment variables onto `self`.
    fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(value) = env_var("DATABASE_URL") {
            self.database_url = value;
        }
        if let Some(value) = env_var("BUS_URL").or_else(|| env_var("REDIS_URL")) {
            self.bus_url = value;
        }
        if let Some(value) = env_var("HMAC_SECRET_KEY") {
            self.hmac_secret_key = value;
        }
        if let Some(value) = env_u64("AGENT_TIMEOUT_SECONDS")? {
            self.agent_timeout_seconds = value;
        }
        if let Some(value) = env_u64("ARBITER_WAIT_TIMEOUT_SECONDS")? {
            self.arbiter_wait_timeout_seconds = value;
        }
        if let Some(value) = env_u64("MAX_RETRIES")? {
            self.max_retries = value as u32;
        }
        if let Some(value) = env_u64("REQUEST_SIGNATURE_WINDOW_SECONDS")? {
            self.request_signature_window_seconds = value;
        }
        if let Some(value) = env_bool("DEDUPE_BY_COMMIT")? {
            self.dedupe_by_commit = value;
        }
        if let Some(value) = env_var("GATEWAY_HOST") {
            self.gateway_host = value;
        }
        if let Some(value) = env_u16("GATEWAY_PORT")? {
            self.gateway_port = value;
        }
        if let Some(value) = env_var("ORCHESTRATOR_HOST") {
            self.orchestrator_host = value;
        }
        if let Some(value) = env_u16("ORCHESTRATOR_PORT")? {
            self.orchestrator_port = value;
        }
        if let Some(value) = env_var("ARBITER_HOST") {
            self.arbiter_host = value;
        }
        if let Some(value) = env_u16("ARBITER_PORT")? {
            self.arbiter_port = value;
        }
        Ok(self)
    }

    /// Eager validation: every invariant a process relies on at startup,
    /// checked once rather than defensively re-checked on every use.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hmac_secret_key.is_empty() {
            return Err(ConfigError::Invalid("hmac_secret_key must not be empty".to_string()));
        }
        if self.agent_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("agent_timeout_seconds must be > 0".to_string()));
        }
        if self.arbiter_wait_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("arbiter_wait_timeout_seconds must be > 0".to_string()));
        }
        if self.request_signature_window_seconds == 0 {
            return Err(ConfigError::Invalid("request_signature_window_seconds must be > 0".to_string()));
        }
        if self.database_url.is_empty() {
            return Err(ConfigError::Invalid("database_url must not be empty".to_string()));
        }
        if self.bus_url.is_empty() {
            return Err(ConfigError::Invalid("bus_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_seconds)
    }

    pub fn arbiter_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.arbiter_wait_timeout_seconds)
    }

    pub fn request_signature_window(&self) -> Duration {
        Duration::from_secs(self.request_signature_window_seconds)
    }

    pub fn gateway_bind_addr(&self) -> String {
        format!("{}:{}", self.gateway_host, self.gateway_port)
    }

    pub fn orchestrator_bind_addr(&self) -> String {
        format!("{}:{}", self.orchestrator_host, self.orchestrator_port)
    }

    pub fn arbiter_bind_addr(&self) -> String {
        format!("{}:{}", self.arbiter_host, self.arbiter_port)
    }
}

fn env_var(suffix: &'static str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok().filter(|v| !v.is_empty())
}

fn env_u64(suffix: &'static str) -> Result<Option<u64>, ConfigError> {
    match env_var(suffix) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|err| env_err(suffix, value, err.to_string())),
        None => Ok(None),
    }
}

fn env_u16(suffix: &'static str) -> Result<Option<u16>, ConfigError> {
    match env_var(suffix) {
        Some(value) => value
            .parse::<u16>()
            .map(Some)
            .map_err(|err| env_err(suffix, value, err.to_string())),
        None => Ok(None),
    }
}

fn env_bool(suffix: &'static str) -> Result<Option<bool>, ConfigError> {
    match env_var(suffix) {
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(env_err(suffix, value, "expected a boolean".to_string())),
        },
        None => Ok(None),
    }
}

fn env_err(suffix: &'static str, value: String, reason: String) -> ConfigError {
    ConfigError::InvalidEnvVar { key: format!("{ENV_PREFIX}{suffix}"), value, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use yare::parameterized;

    fn clear_env() {
        for suffix in [
            "CONFIG_FILE",
            "DATABASE_URL",
            "BUS_URL",
            "REDIS_URL",
            "HMAC_SECRET_KEY",
            "AGENT_TIMEOUT_SECONDS",
            "ARBITER_WAIT_TIMEOUT_SECONDS",
            "MAX_RETRIES",
            "REQUEST_SIGNATURE_WINDOW_SECONDS",
            "DEDUPE_BY_COMMIT",
            "GATEWAY_HOST",
            "GATEWAY_PORT",
            "ORCHESTRATOR_HOST",
            "ORCHESTRATOR_PORT",
            "ARBITER_HOST",
            "ARBITER_PORT",
        ] {
            std::env::remove_var(format!("{ENV_PREFIX}{suffix}"));
        }
    }

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    #[serial]
    fn load_with_no_file_and_no_env_uses_defaults() {
        clear_env();
        let config = Config::load().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn env_var_overrides_default() {
        clear_env();
        std::env::set_var("CI_ARBITER_HMAC_SECRET_KEY", "s3cr3t");
        std::env::set_var("CI_ARBITER_MAX_RETRIES", "7");
        let config = Config::load().unwrap();
        assert_eq!(config.hmac_secret_key, "s3cr3t");
        assert_eq!(config.max_retries, 7);
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_numeric_env_var_is_an_error() {
        clear_env();
        std::env::set_var("CI_ARBITER_MAX_RETRIES", "not-a-number");
        let err = Config::load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
        clear_env();
    }

    #[test]
    fn empty_hmac_key_fails_validation() {
        let mut config = Config::default();
        config.hmac_secret_key.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[parameterized(
        zero_agent_timeout = { |c: &mut Config| c.agent_timeout_seconds = 0 },
        zero_arbiter_timeout = { |c: &mut Config| c.arbiter_wait_timeout_seconds = 0 },
        zero_signature_window = { |c: &mut Config| c.request_signature_window_seconds = 0 },
        empty_database_url = { |c: &mut Config| c.database_url.clear() },
        empty_bus_url = { |c: &mut Config| c.bus_url.clear() },
    )]
    fn invalid_fields_fail_validation(mutate: fn(&mut Config)) {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_file_overrides_defaults_and_env_overrides_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"max_retries = 9
gateway_port = 9000"#)
            .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.max_retries, 9);
        assert_eq!(config.gateway_port, 9000);
        // Untouched fields keep their default.
        assert_eq!(config.hmac_secret_key, Config::default().hmac_secret_key);
    }

    #[test]
    fn duration_helpers_convert_seconds() {
        let config = Config::default();
        assert_eq!(config.agent_timeout(), Duration::from_secs(300));
        assert_eq!(config.arbiter_wait_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn bind_addr_helpers_join_host_and_port() {
        let config = Config::default();
        assert_eq!(config.gateway_bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.orchestrator_bind_addr(), "0.0.0.0:8001");
    }
}
