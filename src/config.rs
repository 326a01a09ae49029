//! Runtime configuration for prompt-relay.
//!
//! Non-secret knobs (listen address, upstream endpoint, token lifetime) come
//! from an optional JSON file. The two secrets, the upstream API key and the
//! token-signing key, come only from the command line or the environment and
//! are required at startup.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "prompt-relay", about = "Authenticated LLM completion relay")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Deployment mode; selects log format and verbosity.
    #[arg(long = "env", env = "APP_ENV", default_value = "development")]
    pub environment: Environment,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// API key for the upstream completion provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Secret used to sign access tokens.
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
}

/// Errors that prevent the service from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; refusing to start")]
    MissingSecret(&'static str),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown environment '{0}' (expected 'development' or 'production')")]
    UnknownEnvironment(String),
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Default tracing filter for this mode.
    pub fn log_filter(&self, verbose: bool) -> &'static str {
        match (self, verbose) {
            (Environment::Development, _) | (Environment::Production, true) => {
                "prompt_relay=debug,tower_http=debug"
            }
            (Environment::Production, false) => "prompt_relay=info,tower_http=info",
        }
    }

    /// Production emits machine-readable JSON logs.
    pub fn json_logs(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream completion provider.
    pub upstream: UpstreamConfig,

    /// Access token settings.
    pub auth: AuthConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API, without trailing slash.
    pub base_url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Timeout for single-shot calls and for connecting on streaming calls.
    pub timeout_secs: u64,

    /// Pause inserted between relayed chunks (0 = none).
    pub stream_throttle_ms: u64,

    /// Chunks buffered between the upstream reader and the caller.
    pub stream_buffer: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            timeout_secs: 60,
            stream_throttle_ms: 0,
            stream_buffer: 16,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stream_throttle(&self) -> Option<Duration> {
        (self.stream_throttle_ms > 0).then(|| Duration::from_millis(self.stream_throttle_ms))
    }
}

/// Access token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued access tokens, in minutes.
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 30,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the file is absent.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }
}

/// Secrets required to run. Never serialized or logged.
pub struct Secrets {
    pub openai_api_key: SecretString,
    pub signing_key: SecretString,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl Secrets {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: require(cli.openai_api_key.as_deref(), "OPENAI_API_KEY")?,
            signing_key: require(cli.secret_key.as_deref(), "SECRET_KEY")?,
        })
    }
}

fn require(value: Option<&str>, name: &'static str) -> Result<SecretString, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(SecretString::from(v.to_string())),
        _ => Err(ConfigError::MissingSecret(name)),
    }
}
