use crate::core::errors::ExchangeError;
use crate::core::kernel::{decode, Params, RestClient};
use crate::exchanges::binance::types::ListenKey;
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::instrument;

/// Listen-key lifecycle as needed by user-data streams.
#[async_trait]
pub trait ListenKeySource: Send + Sync + 'static {
    /// Create a key, or extend and return the active one.
    async fn create(&self) -> Result<String, ExchangeError>;

    async fn keep_alive(&self, listen_key: &str) -> Result<(), ExchangeError>;

    async fn close(&self, listen_key: &str) -> Result<(), ExchangeError>;
}

/// Spot user-data stream keys (`/api/v3/userDataStream`, API key only).
pub struct SpotDataStreamApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> SpotDataStreamApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn create_listen_key(&self) -> Result<ListenKey, ExchangeError> {
        let response = self
            .rest
            .keyed_request(Method::POST, "/api/v3/userDataStream", Params::new())
            .await?;
        decode(response)
    }

    /// Extend the key's validity by 60 minutes.
    #[instrument(skip(self, listen_key), fields(exchange = "binance"))]
    pub async fn keep_alive_listen_key(&self, listen_key: &str) -> Result<(), ExchangeError> {
        let params = Params::validated(&KeyParam { listen_key }, &["listenKey"])?;
        self.rest
            .keyed_request(Method::PUT, "/api/v3/userDataStream", params)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, listen_key), fields(exchange = "binance"))]
    pub async fn close_listen_key(&self, listen_key: &str) -> Result<(), ExchangeError> {
        let params = Params::validated(&KeyParam { listen_key }, &["listenKey"])?;
        self.rest
            .keyed_request(Method::DELETE, "/api/v3/userDataStream", params)
            .await?;
        Ok(())
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyParam<'a> {
    listen_key: &'a str,
}

#[async_trait]
impl<R: RestClient + 'static> ListenKeySource for SpotDataStreamApi<R> {
    async fn create(&self) -> Result<String, ExchangeError> {
        Ok(self.create_listen_key().await?.listen_key)
    }

    async fn keep_alive(&self, listen_key: &str) -> Result<(), ExchangeError> {
        self.keep_alive_listen_key(listen_key).await
    }

    async fn close(&self, listen_key: &str) -> Result<(), ExchangeError> {
        self.close_listen_key(listen_key).await
    }
}
