use crate::core::errors::ExchangeError;
use crate::core::kernel::{decode, Params, RestClient};
use crate::exchanges::binance::types::{
    AggTradesRequest, OrderBook, OrderBookRequest, ServerTime, SymbolRequest, TradesRequest,
};
use crate::exchanges::binance_perp::types::{
    FundingRateHistoryRequest, KlineRequest, PairRequest, StatisticsRequest,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

const STATISTICS_REQUIRED: &[&str] = &["symbol", "period"];

/// USD-M futures market data (`/fapi` and `/futures/data`).
pub struct FuturesMarketApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> FuturesMarketApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    async fn get(&self, path: &'static str, params: Params) -> Result<Value, ExchangeError> {
        self.rest.public_request(Method::GET, path, params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn test_connectivity(&self) -> Result<Value, ExchangeError> {
        self.get("/fapi/v1/ping", Params::new()).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn check_server_time(&self) -> Result<ServerTime, ExchangeError> {
        decode(self.get("/fapi/v1/time", Params::new()).await?)
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_exchange_info(&self) -> Result<Value, ExchangeError> {
        self.get("/fapi/v1/exchangeInfo", Params::new()).await
    }

    /// Depth snapshot. `limit` is only sent when set.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_order_book(&self, request: &OrderBookRequest) -> Result<OrderBook, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        decode(self.get("/fapi/v1/depth", params).await?)
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_recent_trades_list(&self, request: &TradesRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/fapi/v1/trades", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_older_trades_lookup(&self, request: &TradesRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.rest
            .keyed_request(Method::GET, "/fapi/v1/historicalTrades", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_aggregate_trades_list(
        &self,
        request: &AggTradesRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/fapi/v1/aggTrades", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_kline_candlestick_data(
        &self,
        request: &KlineRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol", "interval"])?;
        self.get("/fapi/v1/klines", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_continuous_contract_kline_candlestick_data(
        &self,
        request: &KlineRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["pair", "contractType", "interval"])?;
        self.get("/fapi/v1/continuousKlines", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_index_price_kline_candlestick_data(
        &self,
        request: &KlineRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["pair", "interval"])?;
        self.get("/fapi/v1/indexPriceKlines", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_mark_price_kline_candlestick_data(
        &self,
        request: &KlineRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol", "interval"])?;
        self.get("/fapi/v1/markPriceKlines", params).await
    }

    /// Premium index klines, distinct from the mark price series.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_premium_index_kline_data(
        &self,
        request: &KlineRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol", "interval"])?;
        self.get("/fapi/v1/premiumIndexKlines", params).await
    }

    /// Mark price and funding rate, for one symbol or all of them.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_mark_price(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/premiumIndex", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_funding_rate_history(
        &self,
        request: &FundingRateHistoryRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/fundingRate", params).await
    }

    /// Symbols whose funding parameters were adjusted.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_funding_rate_info(&self) -> Result<Value, ExchangeError> {
        self.get("/fapi/v1/fundingInfo", Params::new()).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_24hr_ticker_price_change_statistics(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/ticker/24hr", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_symbol_price_ticker(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/ticker/price", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_symbol_price_ticker_v2(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v2/ticker/price", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_symbol_order_book_ticker(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/ticker/bookTicker", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_open_interest(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/fapi/v1/openInterest", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_quarterly_contract_settlement_price(
        &self,
        request: &PairRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["pair"])?;
        self.get("/futures/data/delivery-price", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_top_trader_long_short_ratio_accounts(
        &self,
        request: &StatisticsRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, STATISTICS_REQUIRED)?;
        self.get("/futures/data/topLongShortAccountRatio", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_top_trader_long_short_ratio_positions(
        &self,
        request: &StatisticsRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, STATISTICS_REQUIRED)?;
        self.get("/futures/data/topLongShortPositionRatio", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_long_short_ratio(
        &self,
        request: &StatisticsRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, STATISTICS_REQUIRED)?;
        self.get("/futures/data/globalLongShortAccountRatio", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_taker_buy_sell_volume(
        &self,
        request: &StatisticsRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, STATISTICS_REQUIRED)?;
        self.get("/futures/data/takerlongshortRatio", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_basis(&self, request: &StatisticsRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["pair", "contractType", "period"])?;
        self.get("/futures/data/basis", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_composite_index_symbol_information(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/indexInfo", params).await
    }

    /// Asset index used by multi-assets margin mode.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_multi_assets_mode_asset_index(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.get("/fapi/v1/assetIndex", params).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn query_index_price_constituents(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.get("/fapi/v1/constituents", params).await
    }
}
