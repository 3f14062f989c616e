// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! Configuration error types.
//!
//! A configuration error is always fatal: every binary calls
//! [`crate::Config::load`] once at startup and exits immediately on `Err`
//! (§7 of the distilled spec: "Configuration error at startup — fail fast,
//! process exits").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    ReadFile { path: String, source: std::io::Error },

    #[error("failed to parse config file {path:?}: {source}")]
    ParseToml { path: String, source: toml::de::Error },

    #[error("invalid environment variable {key}={value:?}: {reason}")]
    InvalidEnvVar { key: String, value: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
