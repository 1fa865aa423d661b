use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Client configuration, fixed at construction.
///
/// The active REST and stream hosts are derived from `testnet` and the
/// optional overrides once, when the clients are built; nothing here is
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub testnet: bool,
    /// Overrides the production spot REST host.
    pub base_url: Option<String>,
    /// Overrides the production futures REST host.
    pub futures_base_url: Option<String>,
    /// Overrides the production spot stream host.
    pub stream_url: Option<String>,
    /// Overrides the production futures stream host.
    pub futures_stream_url: Option<String>,
    /// `recvWindow` sent with every signed request, in milliseconds.
    pub recv_window: Option<u64>,
    pub timeout_seconds: u64,
}

// Never expose secrets in serialization
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientConfig", 9)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("futures_base_url", &self.futures_base_url)?;
        state.serialize_field("stream_url", &self.stream_url)?;
        state.serialize_field("futures_stream_url", &self.futures_stream_url)?;
        state.serialize_field("recv_window", &self.recv_window)?;
        state.serialize_field("timeout_seconds", &self.timeout_seconds)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ClientConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ClientConfigHelper {
            #[serde(default)]
            api_key: String,
            #[serde(default)]
            secret_key: String,
            #[serde(default)]
            testnet: bool,
            base_url: Option<String>,
            futures_base_url: Option<String>,
            stream_url: Option<String>,
            futures_stream_url: Option<String>,
            recv_window: Option<u64>,
            timeout_seconds: Option<u64>,
        }

        let helper = ClientConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            testnet: helper.testnet,
            base_url: helper.base_url,
            futures_base_url: helper.futures_base_url,
            stream_url: helper.stream_url,
            futures_stream_url: helper.futures_stream_url,
            recv_window: helper.recv_window,
            timeout_seconds: helper.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

impl ClientConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            testnet: false,
            base_url: None,
            futures_base_url: None,
            stream_url: None,
            futures_stream_url: None,
            recv_window: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Configuration for public market data only. Private calls made with it
    /// fail with a configuration error.
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY`
    /// - `{PREFIX}_SECRET_KEY`
    /// - `{PREFIX}_TESTNET` (optional, defaults to false)
    /// - `{PREFIX}_BASE_URL` / `{PREFIX}_FUTURES_BASE_URL` (optional)
    /// - `{PREFIX}_STREAM_URL` / `{PREFIX}_FUTURES_STREAM_URL` (optional)
    /// - `{PREFIX}_RECV_WINDOW` (optional, milliseconds)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_SECRET_KEY", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;
        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let testnet = env::var(format!("{}_TESTNET", prefix))
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let recv_window = match env::var(format!("{}_RECV_WINDOW", prefix)) {
            Ok(raw) => Some(raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!("{}_RECV_WINDOW: {}", prefix, e))
            })?),
            Err(_) => None,
        };

        let mut config = Self::new(api_key, secret_key).testnet(testnet);
        config.base_url = env::var(format!("{}_BASE_URL", prefix)).ok();
        config.futures_base_url = env::var(format!("{}_FUTURES_BASE_URL", prefix)).ok();
        config.stream_url = env::var(format!("{}_STREAM_URL", prefix)).ok();
        config.futures_stream_url = env::var(format!("{}_FUTURES_STREAM_URL", prefix)).ok();
        config.recv_window = recv_window;
        Ok(config)
    }

    /// Load a `.env` file (if present) and then read [`Self::from_env`].
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Same as [`Self::from_env_file`] with an explicit file path.
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no file, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Check if this configuration has credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn futures_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.futures_base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn futures_stream_url(mut self, url: impl Into<String>) -> Self {
        self.futures_stream_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window = Some(recv_window_ms);
        self
    }

    #[must_use]
    pub const fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Pick the host for a product line: testnet wins, then an explicit
    /// override, then the production default.
    pub(crate) fn resolve_url(
        &self,
        override_url: Option<&String>,
        production: &str,
        testnet: &str,
    ) -> String {
        if self.testnet {
            testnet.to_string()
        } else {
            override_url.map_or_else(|| production.to_string(), Clone::clone)
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
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_has_no_credentials() {
        assert!(!ClientConfig::read_only().has_credentials());
        assert!(ClientConfig::new("k".into(), "s".into()).has_credentials());
        assert!(!ClientConfig::new("k".into(), String::new()).has_credentials());
    }

    #[test]
    fn serialization_redacts_secrets() {
        let config = ClientConfig::new("visible_key".into(), "super_secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("visible_key"));
        assert!(!json.contains("super_secret"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn testnet_takes_precedence_over_override() {
        let config = ClientConfig::read_only()
            .base_url("https://proxy.local")
            .testnet(true);
        assert_eq!(
            config.resolve_url(config.base_url.as_ref(), "https://prod", "https://test"),
            "https://test"
        );

        let config = config.testnet(false);
        assert_eq!(
            config.resolve_url(config.base_url.as_ref(), "https://prod", "https://test"),
            "https://proxy.local"
        );
    }

    #[test]
    fn from_env_reads_prefixed_variables() {
        env::set_var("CFGTEST_A_API_KEY", "key");
        env::set_var("CFGTEST_A_SECRET_KEY", "secret");
        env::set_var("CFGTEST_A_TESTNET", "true");
        env::set_var("CFGTEST_A_RECV_WINDOW", "5000");

        let config = ClientConfig::from_env("cfgtest_a").unwrap();
        assert_eq!(config.api_key(), "key");
        assert_eq!(config.secret_key(), "secret");
        assert!(config.testnet);
        assert_eq!(config.recv_window, Some(5000));
    }

    #[test]
    fn from_env_reports_missing_variable() {
        let err = ClientConfig::from_env("cfgtest_missing").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingEnvironmentVariable(ref name) if name == "CFGTEST_MISSING_API_KEY"
        ));
    }
}
