use crate::core::errors::ExchangeError;
use crate::core::kernel::{decode, Params, RestClient};
use crate::exchanges::binance::data_stream::ListenKeySource;
use crate::exchanges::binance::types::ListenKey;
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::instrument;

/// Futures user-data stream keys (`/fapi/v1/listenKey`, API key only).
///
/// An account has one key at a time, so keep-alive and close take no
/// key parameter.
pub struct FuturesDataStreamApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> FuturesDataStreamApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn create_listen_key(&self) -> Result<ListenKey, ExchangeError> {
        let response = self
            .rest
            .keyed_request(Method::POST, "/fapi/v1/listenKey", Params::new())
            .await?;
        decode(response)
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn keep_alive_listen_key(&self) -> Result<(), ExchangeError> {
        self.rest
            .keyed_request(Method::PUT, "/fapi/v1/listenKey", Params::new())
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn close_listen_key(&self) -> Result<(), ExchangeError> {
        self.rest
            .keyed_request(Method::DELETE, "/fapi/v1/listenKey", Params::new())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<R: RestClient + 'static> ListenKeySource for FuturesDataStreamApi<R> {
    async fn create(&self) -> Result<String, ExchangeError> {
        Ok(self.create_listen_key().await?.listen_key)
    }

    async fn keep_alive(&self, _listen_key: &str) -> Result<(), ExchangeError> {
        self.keep_alive_listen_key().await
    }

    async fn close(&self, _listen_key: &str) -> Result<(), ExchangeError> {
        self.close_listen_key().await
    }
}
