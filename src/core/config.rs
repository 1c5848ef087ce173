use secrecy::{ExposeSecret, Secret};
use serde::{Serialize, Serializer};
use std::env;

use crate::ws::session::SessionClass;

const MAINNET_PUBLIC_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";
const MAINNET_PRIVATE_URL: &str = "wss://ws.okx.com:8443/ws/v5/private";
const TESTNET_PUBLIC_URL: &str = "wss://wspap.okx.com:8443/ws/v5/public?brokerId=9999";
const TESTNET_PRIVATE_URL: &str = "wss://wspap.okx.com:8443/ws/v5/private?brokerId=9999";

/// Client configuration: API credentials and streaming endpoints.
///
/// Credentials are wrapped in [`Secret`] and are never logged or serialized.
#[derive(Debug, Clone)]
pub struct OkxConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub passphrase: Secret<String>,
    pub testnet: bool,
    pub public_url: Option<String>,
    pub private_url: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for OkxConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("OkxConfig", 6)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("passphrase", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("public_url", &self.public_url)?;
        state.serialize_field("private_url", &self.private_url)?;
        state.end()
    }
}

impl OkxConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            passphrase: Secret::new(passphrase),
            testnet: false,
            public_url: None,
            private_url: None,
        }
    }

    /// Create configuration for public streams only; no credentials required
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `OKX_API_KEY`
    /// - `OKX_SECRET_KEY`
    /// - `OKX_PASSPHRASE`
    /// - `OKX_TESTNET` (optional, defaults to false)
    /// - `OKX_WS_PUBLIC_URL` / `OKX_WS_PRIVATE_URL` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OKX_API_KEY")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("OKX_API_KEY".to_string()))?;
        let secret_key = env::var("OKX_SECRET_KEY")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("OKX_SECRET_KEY".to_string()))?;
        let passphrase = env::var("OKX_PASSPHRASE")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("OKX_PASSPHRASE".to_string()))?;

        let testnet = env::var("OKX_TESTNET")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            passphrase: Secret::new(passphrase),
            testnet,
            public_url: env::var("OKX_WS_PUBLIC_URL").ok(),
            private_url: env::var("OKX_WS_PRIVATE_URL").ok(),
        })
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// Loads the file at `env_file_path` first (missing file is fine), then
    /// reads the standard `OKX_*` variables.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // fall back to system environment variables
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }
        Self::from_env()
    }

    /// Check if this configuration has valid credentials for the private session
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Set testnet mode
    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// Override the public streaming endpoint
    #[must_use]
    pub fn public_url(mut self, url: String) -> Self {
        self.public_url = Some(url);
        self
    }

    /// Override the private streaming endpoint
    #[must_use]
    pub fn private_url(mut self, url: String) -> Self {
        self.private_url = Some(url);
        self
    }

    /// Resolve the endpoint for a session class
    pub fn ws_url(&self, class: SessionClass) -> String {
        match class {
            SessionClass::Public => self.public_url.clone().unwrap_or_else(|| {
                if self.testnet {
                    TESTNET_PUBLIC_URL.to_string()
                } else {
                    MAINNET_PUBLIC_URL.to_string()
                }
            }),
            SessionClass::Private => self.private_url.clone().unwrap_or_else(|| {
                if self.testnet {
                    TESTNET_PRIVATE_URL.to_string()
                } else {
                    MAINNET_PRIVATE_URL.to_string()
                }
            }),
        }
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }

    /// Get passphrase (use carefully - exposes secret)
    pub fn passphrase(&self) -> &str {
        self.passphrase.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
