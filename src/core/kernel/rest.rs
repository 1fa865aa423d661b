use crate::core::errors::ExchangeError;
use crate::core::kernel::params::Params;
use crate::core::kernel::signer::Signer;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{instrument, trace};

/// How a request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// No credentials.
    Public,
    /// API key header only (listen-key management).
    ApiKey,
    /// API key header plus `timestamp` and HMAC `signature`.
    Signed,
}

/// A fully described REST call: everything needed to build the HTTP request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: &'static str,
    pub params: Params,
    pub security: Security,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: &'static str, params: Params, security: Security) -> Self {
        Self {
            method,
            path,
            params,
            security,
        }
    }

    pub fn public(path: &'static str, params: Params) -> Self {
        Self::new(Method::GET, path, params, Security::Public)
    }

    pub fn signed(method: Method, path: &'static str, params: Params) -> Self {
        Self::new(method, path, params, Security::Signed)
    }

    pub fn keyed(method: Method, path: &'static str, params: Params) -> Self {
        Self::new(method, path, params, Security::ApiKey)
    }

    /// GET and DELETE carry their parameters in the query string; every
    /// other method sends them as a form body.
    pub fn params_in_query(&self) -> bool {
        self.method == Method::GET || self.method == Method::DELETE
    }
}

/// REST client trait for making HTTP requests
///
/// One implementation serves one product line (one base URL). Method sets
/// describe calls as [`RequestDescriptor`]s and hand them to `execute`.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Execute a request and return the decoded JSON body.
    ///
    /// An empty success body decodes to `Value::Null`.
    async fn execute(&self, request: RequestDescriptor) -> Result<Value, ExchangeError>;

    /// Whether keyed and signed requests can be made at all.
    fn has_credentials(&self) -> bool;

    /// Unauthenticated call.
    async fn public_request(
        &self,
        method: Method,
        path: &'static str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        self.execute(RequestDescriptor::new(method, path, params, Security::Public))
            .await
    }

    /// Call carrying only the API key header.
    async fn keyed_request(
        &self,
        method: Method,
        path: &'static str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        self.execute(RequestDescriptor::keyed(method, path, params))
            .await
    }

    /// Timestamped and signed call.
    async fn private_request(
        &self,
        method: Method,
        path: &'static str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        self.execute(RequestDescriptor::signed(method, path, params))
            .await
    }
}

/// Convert a JSON body into a typed response.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ExchangeError> {
    serde_json::from_value(value).map_err(|e| {
        ExchangeError::Serialization(format!("Failed to deserialize response: {}", e))
    })
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: concat!("binance-connect/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for keyed and signed requests
    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

/// Error body returned by the exchange on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
    #[serde(alias = "message")]
    msg: Option<String>,
}

impl ReqwestRest {
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn get_timestamp() -> Result<u64, ExchangeError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| ExchangeError::Configuration(format!("System clock error: {}", e)))
    }

    fn signer(&self) -> Result<&Arc<dyn Signer>, ExchangeError> {
        self.signer
            .as_ref()
            .ok_or_else(ExchangeError::missing_credentials)
    }

    /// Normalize a response into a JSON value or an `ExchangeError::Request`.
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(ExchangeError::transport)?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            if response_text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&response_text).map_err(|e| {
                ExchangeError::Serialization(format!("Failed to parse JSON response: {}", e))
            });
        }

        let parsed = serde_json::from_str::<ApiErrorBody>(&response_text).ok();
        let code = parsed.as_ref().and_then(|body| body.code);
        let message = parsed
            .and_then(|body| body.msg)
            .filter(|msg| !msg.is_empty())
            .or_else(|| Some(response_text.trim().to_string()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "Unknown error".to_string());

        Err(ExchangeError::api(status.as_u16(), code, message))
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, request), fields(exchange = %self.config.exchange_name, method = %request.method, endpoint = %request.path))]
    async fn execute(&self, request: RequestDescriptor) -> Result<Value, ExchangeError> {
        let mut headers = Vec::new();

        // serialized once: this string is what gets signed and what gets sent
        let payload = match request.security {
            Security::Public => request.params.to_query_string(),
            Security::ApiKey => {
                headers.extend(self.signer()?.api_key_headers());
                request.params.to_query_string()
            }
            Security::Signed => {
                let signer = self.signer()?;
                let query = request.params.to_query_string();
                let (signed_headers, signed_payload) =
                    signer.sign_request(&query, Self::get_timestamp()?)?;
                headers.extend(signed_headers);
                signed_payload
            }
        };

        let mut url = format!("{}{}", self.config.base_url, request.path);
        let in_query = request.params_in_query();
        if in_query && !payload.is_empty() {
            url.push('?');
            url.push_str(&payload);
        }

        let mut builder = self.client.request(request.method.clone(), &url);
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        if !in_query && !payload.is_empty() {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(payload);
        }

        let response = builder.send().await.map_err(ExchangeError::transport)?;
        self.handle_response(response).await
    }

    fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }
}
