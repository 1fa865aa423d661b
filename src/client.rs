use crate::core::config::ClientConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, WsConfig};
use crate::exchanges::binance::{
    self, BinanceRealtime, SpotDataStreamApi, SpotMarketApi, SpotTradeApi, SpotWalletApi,
};
use crate::exchanges::binance_perp::{
    self, FuturesDataStreamApi, FuturesMarketApi, FuturesTradeApi,
};
use std::sync::Arc;

/// Spot method sets, sharing one REST client.
pub struct SpotApi {
    pub market: SpotMarketApi<ReqwestRest>,
    pub trade: SpotTradeApi<ReqwestRest>,
    pub wallet: SpotWalletApi<ReqwestRest>,
    pub data_stream: Arc<SpotDataStreamApi<ReqwestRest>>,
}

impl SpotApi {
    pub fn new(rest: ReqwestRest) -> Self {
        let rest = Arc::new(rest);
        Self {
            market: SpotMarketApi::new(Arc::clone(&rest)),
            trade: SpotTradeApi::new(Arc::clone(&rest)),
            wallet: SpotWalletApi::new(Arc::clone(&rest)),
            data_stream: Arc::new(SpotDataStreamApi::new(rest)),
        }
    }
}

/// USD-M futures method sets, sharing one REST client.
pub struct FuturesApi {
    pub market: FuturesMarketApi<ReqwestRest>,
    pub trade: FuturesTradeApi<ReqwestRest>,
    pub data_stream: Arc<FuturesDataStreamApi<ReqwestRest>>,
}

impl FuturesApi {
    pub fn new(rest: ReqwestRest) -> Self {
        let rest = Arc::new(rest);
        Self {
            market: FuturesMarketApi::new(Arc::clone(&rest)),
            trade: FuturesTradeApi::new(Arc::clone(&rest)),
            data_stream: Arc::new(FuturesDataStreamApi::new(rest)),
        }
    }
}

/// Everything a caller needs, built once from a [`ClientConfig`].
///
/// ```rust,no_run
/// use binance_connect::{BinanceApi, ClientConfig};
/// use binance_connect::exchanges::binance::types::OrderBookRequest;
///
/// # async fn example() -> Result<(), binance_connect::ExchangeError> {
/// let api = BinanceApi::new(ClientConfig::read_only())?;
/// let book = api
///     .futures
///     .market
///     .get_order_book(&OrderBookRequest::new("BTCUSDT"))
///     .await?;
/// println!("best bid: {:?}", book.bids.first());
/// # Ok(())
/// # }
/// ```
pub struct BinanceApi {
    pub spot: SpotApi,
    pub futures: FuturesApi,
    pub realtime: BinanceRealtime,
}

impl BinanceApi {
    pub fn new(config: ClientConfig) -> Result<Self, ExchangeError> {
        Self::with_ws_config(config, WsConfig::default())
    }

    pub fn with_ws_config(config: ClientConfig, ws_config: WsConfig) -> Result<Self, ExchangeError> {
        let spot = SpotApi::new(binance::build_rest_client(&config)?);
        let futures = FuturesApi::new(binance_perp::build_rest_client(&config)?);
        let realtime = BinanceRealtime::new(
            &binance::stream_url(&config),
            &binance_perp::stream_url(&config),
            Arc::clone(&spot.data_stream),
            Arc::clone(&futures.data_stream),
            &ws_config,
        );

        Ok(Self {
            spot,
            futures,
            realtime,
        })
    }
}

impl std::fmt::Debug for BinanceApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceApi")
            .field("spot_market_stream", self.realtime.spot_market())
            .field("futures_market_stream", self.realtime.futures_market())
            .finish_non_exhaustive()
    }
}
