use std::time::Duration;

use meli_core::{DeploymentMode, RecordStoreConfig};
use secrecy::SecretString;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_RETELL_BASE_URL: &str = "https://api.retellai.com";
pub const DEFAULT_VOICE_ID: &str = "11labs-Adrian";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mode: DeploymentMode,
    pub records: RecordStoreConfig,
    pub openai: OpenAiConfig,
    pub voice: VoiceConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub organization: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct VoiceConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub voice_id: String,
    pub cal_api_key: SecretString,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable `{0}` is not set")]
    Missing(&'static str),
    #[error("invalid value for `{key}`: `{value}`")]
    Invalid { key: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mode = get("MELI_ENV")
            .or_else(|| get("NODE_ENV"))
            .map(|raw| DeploymentMode::parse(&raw))
            .unwrap_or_default();
        let mut records = RecordStoreConfig::new(mode, require("BUBBLE_API_KEY")?);
        if let Some(url) = get("RECORD_STORE_URL") {
            records = records.with_base_url(&url);
        }

        let openai = OpenAiConfig {
            api_key: SecretString::from(require("OPENAI_API_KEY")?),
            organization: get("OPENAI_ORG_ID"),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: trim_url(get("OPENAI_BASE_URL"), DEFAULT_OPENAI_BASE_URL),
        };

        let voice = VoiceConfig {
            api_key: SecretString::from(require("RETELL_API_KEY")?),
            base_url: trim_url(get("RETELL_BASE_URL"), DEFAULT_RETELL_BASE_URL),
            voice_id: get("VOICE_ID").unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            cal_api_key: SecretString::from(require("CAL_API_KEY")?),
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => 3000,
        };
        let server = ServerConfig {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
        };

        let format = match get("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw)
                .ok_or(ConfigError::Invalid { key: "LOG_FORMAT", value: raw })?,
            None => LogFormat::Compact,
        };
        let logging = LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format,
        };

        let timeout_secs: u64 = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "HTTP_TIMEOUT_SECS", value: raw })?,
            None => 30,
        };

        Ok(Self {
            mode,
            records,
            openai,
            voice,
            server,
            logging,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn trim_url(value: Option<String>, default: &str) -> String {
    value
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}
