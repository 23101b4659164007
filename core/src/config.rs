//! Record store endpoint selection.

use std::fmt;

use secrecy::SecretString;

pub const PRODUCTION_BASE_URL: &str = "https://usemeli.com/api/1.1/obj";
pub const DEVELOPMENT_BASE_URL: &str = "https://usemeli.com/version-test/api/1.1/obj";

/// Which of the record store's two databases the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    Production,
    #[default]
    Development,
}

impl DeploymentMode {
    /// `production` (any case) selects the live database; anything else the
    /// test one.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_BASE_URL,
            Self::Development => DEVELOPMENT_BASE_URL,
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
        }
    }
}

/// Connection settings for the record store, fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct RecordStoreConfig {
    pub base_url: String,
    pub api_token: SecretString,
}

impl RecordStoreConfig {
    pub fn new(mode: DeploymentMode, api_token: impl Into<String>) -> Self {
        Self {
            base_url: mode.base_url().to_string(),
            api_token: SecretString::from(api_token.into()),
        }
    }

    /// Point at a different endpoint, e.g. a local mock store.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}
