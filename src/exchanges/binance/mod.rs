//! Binance spot: REST method sets, stream codecs and realtime managers.
//!
//! The stream codecs and the listen-key plumbing here are shared with the
//! USD-M futures line in [`crate::exchanges::binance_perp`].

pub mod codec;
pub mod data_stream;
pub mod events;
pub mod market;
pub mod realtime;
pub mod trade;
pub mod types;
pub mod wallet;

use crate::core::config::ClientConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig};
use std::sync::Arc;

pub use codec::{streams, MarketStreamCodec, UserDataCodec};
pub use data_stream::{ListenKeySource, SpotDataStreamApi};
pub use events::{MarketEvent, UserDataEvent};
pub use market::SpotMarketApi;
pub use realtime::{BinanceRealtime, ListenKeyEndpoint};
pub use trade::SpotTradeApi;
pub use wallet::SpotWalletApi;

pub const REST_URL: &str = "https://api.binance.com";
pub const TESTNET_REST_URL: &str = "https://testnet.binance.vision";
pub const STREAM_URL: &str = "wss://stream.binance.com:443";
pub const TESTNET_STREAM_URL: &str = "wss://testnet.binance.vision";

/// Build the spot REST client for `config`.
pub fn build_rest_client(config: &ClientConfig) -> Result<ReqwestRest, ExchangeError> {
    let base_url = config.resolve_url(config.base_url.as_ref(), REST_URL, TESTNET_REST_URL);
    rest_client(config, base_url, "binance")
}

/// Spot stream host, without the `/ws` or `/stream` suffix.
pub fn stream_url(config: &ClientConfig) -> String {
    config.resolve_url(config.stream_url.as_ref(), STREAM_URL, TESTNET_STREAM_URL)
}

/// A REST client for `base_url`, signing when `config` carries credentials.
pub(crate) fn rest_client(
    config: &ClientConfig,
    base_url: String,
    exchange_name: &str,
) -> Result<ReqwestRest, ExchangeError> {
    let rest_config = RestClientConfig::new(base_url, exchange_name.to_string())
        .with_timeout(config.timeout_seconds);
    let mut builder = RestClientBuilder::new(rest_config);

    if config.has_credentials() {
        let signer = HmacSigner::new(
            config.api_key().to_string(),
            config.secret_key().to_string(),
        )
        .with_recv_window(config.recv_window);
        builder = builder.with_signer(Arc::new(signer));
    }

    builder.build()
}
