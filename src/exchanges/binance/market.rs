use crate::core::errors::ExchangeError;
use crate::core::kernel::{decode, Params, RestClient};
use crate::exchanges::binance::types::{
    AggTradesRequest, KlineRequest, OrderBook, OrderBookRequest, ServerTime, SymbolRequest,
    TickerRequest, TradesRequest,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Spot market data (`/api/v3`). Everything here is public except the
/// historical trade lookup, which needs the API key header.
pub struct SpotMarketApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> SpotMarketApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    async fn get(&self, path: &'static str, params: Params) -> Result<Value, ExchangeError> {
        self.rest.public_request(Method::GET, path, params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn test_connectivity(&self) -> Result<Value, ExchangeError> {
        self.get("/api/v3/ping", Params::new()).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn check_server_time(&self) -> Result<ServerTime, ExchangeError> {
        decode(self.get("/api/v3/time", Params::new()).await?)
    }

    /// Exchange rules and symbol information. Narrow it with `symbol` or a
    /// JSON-encoded `symbols` list.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_exchange_info(&self, request: &TickerRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/api/v3/exchangeInfo", params).await
    }

    /// Order book depth. Without `limit` the server default applies.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_order_book(&self, request: &OrderBookRequest) -> Result<OrderBook, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        decode(self.get("/api/v3/depth", params).await?)
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_recent_trades_list(&self, request: &TradesRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/api/v3/trades", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_older_trades_lookup(&self, request: &TradesRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.rest
            .keyed_request(Method::GET, "/api/v3/historicalTrades", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_aggregate_trades_list(
        &self,
        request: &AggTradesRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/api/v3/aggTrades", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_kline_candlestick_data(
        &self,
        request: &KlineRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol", "interval"])?;
        self.get("/api/v3/klines", params).await
    }

    /// Klines tuned for chart presentation.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_ui_klines(&self, request: &KlineRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol", "interval"])?;
        self.get("/api/v3/uiKlines", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_current_average_price(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/api/v3/avgPrice", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_24hr_ticker_price_change_statistics(
        &self,
        request: &TickerRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/api/v3/ticker/24hr", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_symbol_price_ticker(&self, request: &TickerRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/api/v3/ticker/price", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_symbol_order_book_ticker(
        &self,
        request: &TickerRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/api/v3/ticker/bookTicker", params).await
    }
}
