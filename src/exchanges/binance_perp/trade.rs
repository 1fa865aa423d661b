use crate::core::errors::ExchangeError;
use crate::core::kernel::{decode, require_one_of, validate_required, Params, RestClient};
use crate::core::types::OrderType;
use crate::exchanges::binance::types::{OrderIdRequest, SymbolRequest};
use crate::exchanges::binance_perp::types::{
    LeverageRequest, ModifyOrderRequest, NewOrderRequest, OrderModifyHistoryRequest,
    OrderResponse,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

const ORDER_REQUIRED: &[&str] = &["symbol", "side", "type"];
const BATCH_ORDER_REQUIRED: &[&str] = &["symbol", "side", "type", "quantity"];
const MODIFY_REQUIRED: &[&str] = &["symbol", "side", "quantity", "price"];
const ORDER_ID: &[&str] = &["orderId", "origClientOrderId"];

/// Batch endpoints accept at most this many entries.
pub const MAX_BATCH_ORDERS: usize = 5;

/// USD-M futures trading and account endpoints. Every call is signed.
pub struct FuturesTradeApi<R: RestClient> {
    rest: Arc<R>,
}

impl<R: RestClient> FuturesTradeApi<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self { rest }
    }

    async fn signed(
        &self,
        method: Method,
        path: &'static str,
        params: Params,
    ) -> Result<Value, ExchangeError> {
        self.rest.private_request(method, path, params).await
    }

    /// Switch between hedge mode (`true`) and one-way mode.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn change_position_mode(&self, dual_side_position: bool) -> Result<Value, ExchangeError> {
        let params = Params::new().with("dualSidePosition", dual_side_position);
        self.signed(Method::POST, "/fapi/v1/positionSide/dual", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_current_position_mode(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/fapi/v1/positionSide/dual", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn change_multi_assets_mode(&self, multi_assets_margin: bool) -> Result<Value, ExchangeError> {
        let params = Params::new().with("multiAssetsMargin", multi_assets_margin);
        self.signed(Method::POST, "/fapi/v1/multiAssetsMargin", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_current_multi_assets_mode(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/fapi/v1/multiAssetsMargin", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_order(&self, request: &NewOrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.place(request, None, &[]).await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_limit_order(&self, request: &NewOrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.place(request, Some(OrderType::Limit), &["timeInForce", "quantity", "price"])
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_market_order(&self, request: &NewOrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.place(request, Some(OrderType::Market), &["quantity"])
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_stop_order(&self, request: &NewOrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.place(request, Some(OrderType::Stop), &["stopPrice", "quantity", "price"])
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_take_profit_order(
        &self,
        request: &NewOrderRequest,
    ) -> Result<OrderResponse, ExchangeError> {
        self.place(request, Some(OrderType::TakeProfit), &["stopPrice", "quantity", "price"])
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_stop_market_order(
        &self,
        request: &NewOrderRequest,
    ) -> Result<OrderResponse, ExchangeError> {
        self.place(request, Some(OrderType::StopMarket), &["stopPrice"])
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_take_profit_market_order(
        &self,
        request: &NewOrderRequest,
    ) -> Result<OrderResponse, ExchangeError> {
        self.place(request, Some(OrderType::TakeProfitMarket), &["stopPrice"])
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn new_trailing_stop_market_order(
        &self,
        request: &NewOrderRequest,
    ) -> Result<OrderResponse, ExchangeError> {
        self.place(
            request,
            Some(OrderType::TrailingStopMarket),
            &["quantity", "callbackRate"],
        )
        .await
    }

    async fn place(
        &self,
        request: &NewOrderRequest,
        order_type: Option<OrderType>,
        extra: &[&str],
    ) -> Result<OrderResponse, ExchangeError> {
        let params = match order_type {
            Some(order_type) => Params::from_serializable(&NewOrderRequest {
                order_type: Some(order_type),
                ..request.clone()
            })?,
            None => Params::from_serializable(request)?,
        };
        validate_required(&params, &[ORDER_REQUIRED, extra].concat())?;
        decode(self.signed(Method::POST, "/fapi/v1/order", params).await?)
    }

    /// Place up to five orders in one call. Results come back per entry, so
    /// a rejected order shows up as an error object inside the array.
    #[instrument(skip(self, orders), fields(exchange = "binance_perp", count = orders.len()))]
    pub async fn place_multiple_orders(&self, orders: &[NewOrderRequest]) -> Result<Value, ExchangeError> {
        let params = batch_params(orders, BATCH_ORDER_REQUIRED, &[])?;
        self.signed(Method::POST, "/fapi/v1/batchOrders", params)
            .await
    }

    /// Amend price or quantity of an open limit order.
    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn modify_order(&self, request: &ModifyOrderRequest) -> Result<OrderResponse, ExchangeError> {
        let params = Params::validated(request, MODIFY_REQUIRED)?;
        require_one_of(&params, ORDER_ID)?;
        decode(self.signed(Method::PUT, "/fapi/v1/order", params).await?)
    }

    #[instrument(skip(self, orders), fields(exchange = "binance_perp", count = orders.len()))]
    pub async fn modify_multiple_orders(
        &self,
        orders: &[ModifyOrderRequest],
    ) -> Result<Value, ExchangeError> {
        let params = batch_params(orders, MODIFY_REQUIRED, ORDER_ID)?;
        self.signed(Method::PUT, "/fapi/v1/batchOrders", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_order_modify_history(
        &self,
        request: &OrderModifyHistoryRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.signed(Method::GET, "/fapi/v1/orderAmendment", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn query_order(&self, request: &OrderIdRequest) -> Result<OrderResponse, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        require_one_of(&params, ORDER_ID)?;
        decode(self.signed(Method::GET, "/fapi/v1/order", params).await?)
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn cancel_order(&self, request: &OrderIdRequest) -> Result<OrderResponse, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        require_one_of(&params, ORDER_ID)?;
        decode(self.signed(Method::DELETE, "/fapi/v1/order", params).await?)
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn cancel_all_open_orders(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.signed(Method::DELETE, "/fapi/v1/allOpenOrders", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_current_all_open_orders(
        &self,
        request: &SymbolRequest,
    ) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol"])?;
        self.signed(Method::GET, "/fapi/v1/openOrders", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_account_balance(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/fapi/v2/balance", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_account_information(&self) -> Result<Value, ExchangeError> {
        self.signed(Method::GET, "/fapi/v2/account", Params::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn get_position_information(&self, request: &SymbolRequest) -> Result<Value, ExchangeError> {
        let params = Params::from_serializable(request)?;
        self.signed(Method::GET, "/fapi/v2/positionRisk", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "binance_perp"))]
    pub async fn change_initial_leverage(&self, request: &LeverageRequest) -> Result<Value, ExchangeError> {
        let params = Params::validated(request, &["symbol", "leverage"])?;
        self.signed(Method::POST, "/fapi/v1/leverage", params)
            .await
    }
}

/// Validate every entry and pack them into a single `batchOrders` parameter.
///
/// Missing fields are reported as `batchOrders[i].field`.
fn batch_params<T: Serialize>(
    entries: &[T],
    required: &[&str],
    one_of: &[&str],
) -> Result<Params, ExchangeError> {
    if entries.is_empty() || entries.len() > MAX_BATCH_ORDERS {
        return Err(ExchangeError::InvalidParameters(format!(
            "batchOrders must hold 1 to {MAX_BATCH_ORDERS} entries, got {}",
            entries.len()
        )));
    }

    let mut missing = Vec::new();
    let mut batch = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let params = Params::from_serializable(entry)?;
        missing.extend(
            required
                .iter()
                .filter(|name| !params.contains(name))
                .map(|name| format!("batchOrders[{i}].{name}")),
        );
        if !one_of.is_empty() && !one_of.iter().any(|name| params.contains(name)) {
            missing.push(format!("batchOrders[{i}].{}", one_of.join("/")));
        }
        batch.push(params.to_json_object());
    }

    if !missing.is_empty() {
        return Err(ExchangeError::missing_fields(missing));
    }
    Ok(Params::new().with("batchOrders", serde_json::to_string(&batch)?))
}
