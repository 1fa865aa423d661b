use thiserror::Error;

/// Every failure surfaced by the client, normalized to one shape.
///
/// Validation and configuration errors are raised before any network I/O.
/// Request errors carry the exchange message when the response had one.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Missing required parameter(s): {}", fields.join(", "))]
    Validation { fields: Vec<String> },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request failed: {message}")]
    Request {
        /// HTTP status, absent when the transport itself failed.
        status: Option<u16>,
        /// Exchange error code (e.g. `-1121`), when the body carried one.
        code: Option<i64>,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ExchangeError {
    #[cold]
    #[inline(never)]
    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn missing_credentials() -> Self {
        Self::Configuration("API key and secret are required for this request".to_string())
    }

    #[cold]
    #[inline(never)]
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Request {
            status: err.status().map(|s| s.as_u16()),
            code: None,
            message: err.to_string(),
            source: Some(err),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn api(status: u16, code: Option<i64>, message: impl Into<String>) -> Self {
        Self::Request {
            status: Some(status),
            code,
            message: message.into(),
            source: None,
        }
    }

    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Exchange-provided error code, if any.
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Request { code, .. } => *code,
            _ => None,
        }
    }

    /// HTTP status of a failed request, if a response was received.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<crate::core::config::ConfigError> for ExchangeError {
    fn from(err: crate::core::config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
