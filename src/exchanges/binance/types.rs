//! Spot request parameters and the response shapes shared with futures.
//!
//! Request structs are all-`Option` so a missing required field is reported
//! as a validation error naming it, rather than being impossible to express.
//! `None` fields are never sent.

use crate::core::types::{
    KlineInterval, NewOrderRespType, OrderSide, OrderType, SelfTradePreventionMode, TimeInForce,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `[price, quantity]` as sent by the exchange.
pub type PriceLevel = (Decimal, Decimal);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    pub server_time: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderBook {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    /// Message time (futures only)
    #[serde(rename = "E", default)]
    pub event_time: Option<u64>,
    /// Transaction time (futures only)
    #[serde(rename = "T", default)]
    pub transaction_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenKey {
    pub listen_key: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolRequest {
    pub symbol: Option<String>,
}

impl SymbolRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderBookRequest {
    pub symbol: Option<String>,
    /// Server default applies when absent.
    pub limit: Option<u32>,
}

impl OrderBookRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesRequest {
    pub symbol: Option<String>,
    pub limit: Option<u32>,
    /// Only used by the historical lookup.
    pub from_id: Option<u64>,
}

impl TradesRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggTradesRequest {
    pub symbol: Option<String>,
    pub from_id: Option<u64>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub limit: Option<u32>,
}

impl AggTradesRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineRequest {
    pub symbol: Option<String>,
    pub interval: Option<KlineInterval>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub time_zone: Option<String>,
    pub limit: Option<u32>,
}

impl KlineRequest {
    pub fn new(symbol: impl Into<String>, interval: KlineInterval) -> Self {
        Self {
            symbol: Some(symbol.into()),
            interval: Some(interval),
            ..Self::default()
        }
    }
}

/// Ticker filters. Either one `symbol` or a list of `symbols`; neither means all.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickerRequest {
    pub symbol: Option<String>,
    pub symbols: Option<Vec<String>>,
    /// `FULL` or `MINI` (24hr statistics only)
    #[serde(rename = "type")]
    pub ticker_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub symbol: Option<String>,
    pub side: Option<OrderSide>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub time_in_force: Option<TimeInForce>,
    pub quantity: Option<Decimal>,
    pub quote_order_qty: Option<Decimal>,
    pub price: Option<Decimal>,
    pub new_client_order_id: Option<String>,
    pub strategy_id: Option<u64>,
    pub strategy_type: Option<u32>,
    pub stop_price: Option<Decimal>,
    pub trailing_delta: Option<u64>,
    pub iceberg_qty: Option<Decimal>,
    pub new_order_resp_type: Option<NewOrderRespType>,
    pub self_trade_prevention_mode: Option<SelfTradePreventionMode>,
}

impl NewOrderRequest {
    pub fn new(symbol: impl Into<String>, side: OrderSide, order_type: OrderType) -> Self {
        Self {
            symbol: Some(symbol.into()),
            side: Some(side),
            order_type: Some(order_type),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    #[must_use]
    pub fn price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }
}

/// Identifies an order by `orderId` or `origClientOrderId`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdRequest {
    pub symbol: Option<String>,
    pub order_id: Option<u64>,
    pub orig_client_order_id: Option<String>,
}

impl OrderIdRequest {
    pub fn by_id(symbol: impl Into<String>, order_id: u64) -> Self {
        Self {
            symbol: Some(symbol.into()),
            order_id: Some(order_id),
            orig_client_order_id: None,
        }
    }

    pub fn by_client_id(symbol: impl Into<String>, client_order_id: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            order_id: None,
            orig_client_order_id: Some(client_order_id.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllOrdersRequest {
    pub symbol: Option<String>,
    pub order_id: Option<u64>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformationRequest {
    pub omit_zero_balances: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTradeListRequest {
    pub symbol: Option<String>,
    pub order_id: Option<u64>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub from_id: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositHistoryRequest {
    pub coin: Option<String>,
    pub status: Option<u32>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub tx_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawHistoryRequest {
    pub coin: Option<String>,
    pub withdraw_order_id: Option<String>,
    pub status: Option<u32>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub coin: Option<String>,
    pub withdraw_order_id: Option<String>,
    pub network: Option<String>,
    pub address: Option<String>,
    pub address_tag: Option<String>,
    pub amount: Option<Decimal>,
    pub transaction_fee_flag: Option<bool>,
    pub name: Option<String>,
    /// 0 spot wallet, 1 funding wallet
    pub wallet_type: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DepositAddressRequest {
    pub coin: Option<String>,
    pub network: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssetRequest {
    pub asset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetValuationRequest {
    pub asset: Option<String>,
    pub need_btc_valuation: Option<bool>,
}
