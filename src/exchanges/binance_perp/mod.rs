//! Binance USD-M perpetual futures REST method sets.

pub mod data_stream;
pub mod market;
pub mod trade;
pub mod types;

use crate::core::config::ClientConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::ReqwestRest;

pub use data_stream::FuturesDataStreamApi;
pub use market::FuturesMarketApi;
pub use trade::{FuturesTradeApi, MAX_BATCH_ORDERS};

pub const REST_URL: &str = "https://fapi.binance.com";
pub const TESTNET_REST_URL: &str = "https://testnet.binancefuture.com";
pub const STREAM_URL: &str = "wss://fstream.binance.com";
pub const TESTNET_STREAM_URL: &str = "wss://stream.binancefuture.com";

pub fn build_rest_client(config: &ClientConfig) -> Result<ReqwestRest, ExchangeError> {
    let base_url = config.resolve_url(
        config.futures_base_url.as_ref(),
        REST_URL,
        TESTNET_REST_URL,
    );
    crate::exchanges::binance::rest_client(config, base_url, "binance_perp")
}

pub fn stream_url(config: &ClientConfig) -> String {
    config.resolve_url(
        config.futures_stream_url.as_ref(),
        STREAM_URL,
        TESTNET_STREAM_URL,
    )
}
