/// Configuration management for the workflow-pilot service
///
/// Handles server configuration, the workflow database location, generation
/// backend credentials and network timeouts. Everything is read from the
/// process environment once at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model used when an execute request does not name one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Text-generation backend configuration
    pub generation: GenerationConfig,
    /// Remote content retrieval configuration
    pub fetch: FetchConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
    /// Browser origin allowed by CORS (the visual client)
    pub cors_origin: String,
}

/// Workflow database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the workflows table (created on first run)
    pub path: String,
}

/// Credentials and endpoints for the generation backends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    /// Anthropic is optional; `claude-*` models fail without it
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    /// Model used when an execute request omits `model`
    pub default_model: String,
    pub timeout_ms: u64,
}

/// Content fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_ms: u64,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from ENV_VARs, failing when the OpenAI credential is missing
    pub fn from_env() -> Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .context("OPENAI_API_KEY must be set to reach the generation backend")?;

        Ok(Self {
            server: ServerConfig {
                host: env_or("WORKFLOW_PILOT_HOST", "0.0.0.0"),
                port: parse_env_or("WORKFLOW_PILOT_PORT", 3000)?,
                cors_origin: env_or("WORKFLOW_PILOT_CORS_ORIGIN", "http://localhost:5173"),
            },
            database: DatabaseConfig {
                path: env_or("WORKFLOW_PILOT_DB_PATH", "workflow.db"),
            },
            generation: GenerationConfig {
                openai_api_key,
                openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com"),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                anthropic_base_url: env_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
                default_model: env_or("WORKFLOW_PILOT_DEFAULT_MODEL", DEFAULT_MODEL),
                timeout_ms: parse_env_or("WORKFLOW_PILOT_GENERATION_TIMEOUT_MS", 120_000)?,
            },
            fetch: FetchConfig {
                timeout_ms: parse_env_or("WORKFLOW_PILOT_FETCH_TIMEOUT_MS", 15_000)?,
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_or_falls_back_when_unset() {
        let port: u16 = parse_env_or("WORKFLOW_PILOT_TEST_UNSET_PORT", 3000).unwrap();
        assert_eq!(port, 3000);
    }

    #[test]
    fn parse_env_or_rejects_garbage() {
        std::env::set_var("WORKFLOW_PILOT_TEST_BAD_TIMEOUT", "soon");
        let parsed: Result<u64> = parse_env_or("WORKFLOW_PILOT_TEST_BAD_TIMEOUT", 10);
        assert!(parsed.is_err());
    }

    #[test]
    fn timeouts_convert_from_millis() {
        let fetch = FetchConfig { timeout_ms: 1500 };
        assert_eq!(fetch.timeout(), Duration::from_millis(1500));
    }
}
