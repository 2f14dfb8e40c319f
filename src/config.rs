//! Configuration management for Marginalia Server

use std::env;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::anchoring::{MarkerConfig, DEFAULT_CONTEXT_CHARS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Annotations allowed across all pages; unlimited when unset
    pub max_annotations: Option<usize>,
}

/// Tuning of the anchoring engine
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Chars of context stored on each side of a segment
    pub context_chars: usize,
    /// Load attempts before restoring gives up
    pub restore_max_attempts: u32,
    /// Linear backoff step between load attempts
    pub restore_backoff_ms: u64,
    pub marker_class_prefix: String,
}

impl EngineConfig {
    pub fn marker_config(&self) -> MarkerConfig {
        MarkerConfig {
            class_prefix: self.marker_class_prefix.clone(),
            ..MarkerConfig::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            context_chars: DEFAULT_CONTEXT_CHARS,
            restore_max_attempts: 3,
            restore_backoff_ms: 200,
            marker_class_prefix: MarkerConfig::default().class_prefix,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./marginalia.db".to_string(),
                max_annotations: None,
            },
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let max_annotations = match lookup("MAX_ANNOTATIONS").filter(|v| !v.trim().is_empty()) {
            Some(value) => Some(parse("MAX_ANNOTATIONS", value)?),
            None => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or("SERVER_PORT", lookup("SERVER_PORT"), defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or(defaults.database.url),
                max_annotations,
            },
            engine: EngineConfig {
                context_chars: parse_or(
                    "ANCHOR_CONTEXT_CHARS",
                    lookup("ANCHOR_CONTEXT_CHARS"),
                    defaults.engine.context_chars,
                )?,
                restore_max_attempts: parse_or(
                    "RESTORE_MAX_ATTEMPTS",
                    lookup("RESTORE_MAX_ATTEMPTS"),
                    defaults.engine.restore_max_attempts,
                )?
                .max(1),
                restore_backoff_ms: parse_or(
                    "RESTORE_BACKOFF_MS",
                    lookup("RESTORE_BACKOFF_MS"),
                    defaults.engine.restore_backoff_ms,
                )?,
                marker_class_prefix: lookup("MARKER_CLASS_PREFIX")
                    .unwrap_or(defaults.engine.marker_class_prefix),
            },
        })
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

fn parse_or<T: FromStr>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => parse(var, value),
        None => Ok(default),
    }
}
