use crate::core::errors::ExchangeError;
use crate::core::kernel::{require_one_of, Params, RestClient};
use crate::core::types::OrderType;
use crate::exchanges::binance::types::{
    AccountInformationRequest, AccountTradeListRequest, AllOrdersRequest, NewOrderRequest,
    OrderIdRequest, SymbolRequest,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

const ORDER_REQUIRED: &[&str] = &["symbol", "side", "type"];

/// Spot trading and account endpoints. Every call is signed.
pub struct SpotTradeApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> SpotTradeApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    /// Validate an order; `extra` lists fields its type demands.
    fn order_params(request: &NewOrderRequest, extra: &[&str]) -> Result<Params, ExchangeError> {
        Params::validated(request, &[ORDER_REQUIRED, extra].concat())
    }

    fn with_type(request: &NewOrderRequest, order_type: OrderType) -> NewOrderRequest {
        NewOrderRequest {
            order_type: Some(order_type),
            ..request.clone()
        }
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn new_order(&self, request: &NewOrderRequest) -> Result<Value, ExchangeError> {
        let params = Self::order_params(request, &[])?;
        self.rest
            .private_request(Method::POST, "/api/v3/order", params)
            .await
    }

    /// `LIMIT` order; `type` is set here.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn new_limit_order(&self, request: &NewOrderRequest) -> Result<Value, ExchangeError> {
        let request = Self::with_type(request, OrderType::Limit);
        let params = Self::order_params(&request, &["timeInForce", "quantity", "price"])?;
        self.rest
            .private_request(Method::POST, "/api/v3/order", params)
            .await
    }

    /// `MARKET` order sized by `quantity` or by `quoteOrderQty`.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn new_market_order(&self, request: &NewOrderRequest) -> Result<Value, ExchangeError> {
        let request = Self::with_type(request, OrderType::Market);
        let params = Self::order_params(&request, &[])?;
        require_one_of(&params, &["quantity", "quoteOrderQty"])?;
        self.rest
            .private_request(Method::POST, "/api/v3/order", params)
            .await
    }

    /// Validated by the matching engine but never placed.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn test_new_order(&self, request: &NewOrderRequest) -> Result<Value, ExchangeError> {
        let params = Self::order_params(request, &[])?;
        self.rest
            .private_request(Method::POST, "/api/v3/order/test", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn query_order(&self, request: &OrderIdRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        require_one_of(&params, &["orderId", "origClientOrderId"])?;
        self.rest
            .private_request(Method::GET, "/api/v3/order", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn cancel_order(&self, request: &OrderIdRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        require_one_of(&params, &["orderId", "origClientOrderId"])?;
        self.rest
            .private_request(Method::DELETE, "/api/v3/order", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn cancel_all_open_orders(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.rest
            .private_request(Method::DELETE, "/api/v3/openOrders", params)
            .await
    }

    /// Open orders for one symbol, or for all symbols when `symbol` is absent.
    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_current_open_orders(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.rest
            .private_request(Method::GET, "/api/v3/openOrders", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_all_orders(&self, request: &AllOrdersRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.rest
            .private_request(Method::GET, "/api/v3/allOrders", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_account_information(
        &self,
        request: &AccountInformationRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.rest
            .private_request(Method::GET, "/api/v3/account", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance"))]
    pub async fn get_account_trade_list(
        &self,
        request: &AccountTradeListRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.rest
            .private_request(Method::GET, "/api/v3/myTrades", params)
            .await
    }
}
