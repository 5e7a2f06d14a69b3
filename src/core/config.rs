use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Credential pair and environment selection for a Deribit session.
///
/// The client id/secret are held behind [`Secret`] so they never leak through
/// `Debug` or `Serialize` output. Supplied once at startup, immutable after.
#[derive(Debug, Clone)]
pub struct DeribitConfig {
    pub client_id: Secret<String>,
    pub client_secret: Secret<String>,
    pub testnet: bool,
    pub base_url: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for DeribitConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DeribitConfig", 4)?;
        state.serialize_field("client_id", "[REDACTED]")?;
        state.serialize_field("client_secret", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for DeribitConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct DeribitConfigHelper {
            client_id: String,
            client_secret: String,
            testnet: bool,
            base_url: Option<String>,
        }

        let helper = DeribitConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            client_id: Secret::new(helper.client_id),
            client_secret: Secret::new(helper.client_secret),
            testnet: helper.testnet,
            base_url: helper.base_url,
        })
    }
}

impl DeribitConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id: Secret::new(client_id),
            client_secret: Secret::new(client_secret),
            testnet: false,
            base_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DERIBIT_CLIENT_ID`
    /// - `DERIBIT_CLIENT_SECRET`
    /// - `DERIBIT_TESTNET` (optional, defaults to false)
    /// - `DERIBIT_BASE_URL` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = env::var("DERIBIT_CLIENT_ID")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("DERIBIT_CLIENT_ID".into()))?;

        let client_secret = env::var("DERIBIT_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("DERIBIT_CLIENT_SECRET".into()))?;

        let testnet = env::var("DERIBIT_TESTNET")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let base_url = env::var("DERIBIT_BASE_URL").ok();

        Ok(Self {
            client_id: Secret::new(client_id),
            client_secret: Secret::new(client_secret),
            testnet,
            base_url,
        })
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// Loads `.env` from the working directory when present, then reads the
    /// standard `DERIBIT_*` variables.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // No .env file, fall through to system env vars
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file: {}",
                    e
                )));
            }
        }

        Self::from_env()
    }

    /// Check if this configuration has a usable credential pair
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.client_id.expose_secret().is_empty() && !self.client_secret.expose_secret().is_empty()
    }

    /// Set testnet mode
    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// REST base address, honoring the override then the testnet flag
    pub fn rest_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            if self.testnet {
                "https://test.deribit.com".to_string()
            } else {
                "https://www.deribit.com".to_string()
            }
        })
    }

    /// Host for the streaming connection (same environment as REST)
    pub fn ws_host(&self) -> String {
        if self.testnet {
            "test.deribit.com".to_string()
        } else {
            "www.deribit.com".to_string()
        }
    }

    /// Get client id (use carefully - exposes secret)
    pub fn client_id(&self) -> &str {
        self.client_id.expose_secret()
    }

    /// Get client secret (use carefully - exposes secret)
    pub fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
