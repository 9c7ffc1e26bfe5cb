use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backends for the generative chat model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    /// Append endpoint of the evaluation ledger. Absent means evaluation
    /// rows are skipped, which is a normal deployment mode, not an error.
    pub ledger_url: Option<String>,
    pub ledger_token: Option<String>,
    /// Length of the chat phase countdown.
    pub chat_duration: Duration,
    /// Matchmaking wait ceiling before `match_not_found`.
    pub queue_wait: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("CHAT_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let ledger_url = std::env::var("LEDGER_URL").ok();
        let ledger_token = std::env::var("LEDGER_TOKEN").ok();

        let chat_duration = Duration::from_secs(parse_secs("CHAT_DURATION_SECS", 180)?);
        let queue_wait = Duration::from_secs(parse_secs("QUEUE_WAIT_SECS", 30)?);

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            ledger_url,
            ledger_token,
            chat_duration,
            queue_wait,
        })
    }
}

/// Reads a duration-in-seconds variable, falling back to `default`.
fn parse_secs(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
