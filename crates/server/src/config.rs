use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Options for the strategy summarization service.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Base URL; requests go to `{endpoint}/analyze-strategy`.
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Largest batch of positions accepted in one summary request.
    pub max_batch_size: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8001".to_string(),
            timeout_secs: 120,
            max_batch_size: 30,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Upper bound for the `limit` of a similarity search.
    pub search_max_limit: i64,
    pub llm: LlmConfig,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = LlmConfig::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 20),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 8000),
            search_max_limit: parsed("SEARCH_MAX_LIMIT", 50),
            llm: LlmConfig {
                endpoint: env::var("LLM_SERVICE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.endpoint),
                timeout_secs: parsed("LLM_TIMEOUT_SECS", defaults.timeout_secs),
                max_batch_size: parsed("LLM_MAX_BATCH_SIZE", defaults.max_batch_size),
            },
        })
    }
}
