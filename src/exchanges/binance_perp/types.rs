use crate::core::types::{
    ContractType, KlineInterval, NewOrderRespType, OrderSide, OrderType, PositionSide,
    PriceMatch, SelfTradePreventionMode, StatisticsPeriod, TimeInForce, WorkingType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

/// `priceProtect` is the one flag the futures API wants upper-cased.
fn upper_bool<S: Serializer>(value: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(true) => serializer.serialize_str("TRUE"),
        Some(false) => serializer.serialize_str("FALSE"),
        None => serializer.serialize_none(),
    }
}

/// Kline query shared by the plain, continuous, index, mark and premium
/// variants. Which of `symbol` / `pair` / `contractType` is required depends
/// on the endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineRequest {
    pub symbol: Option<String>,
    pub pair: Option<String>,
    pub contract_type: Option<ContractType>,
    pub interval: Option<KlineInterval>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub limit: Option<u32>,
}

impl KlineRequest {
    pub fn symbol(symbol: impl Into<String>, interval: KlineInterval) -> Self {
        Self {
            symbol: Some(symbol.into()),
            interval: Some(interval),
            ..Self::default()
        }
    }

    pub fn pair(pair: impl Into<String>, interval: KlineInterval) -> Self {
        Self {
            pair: Some(pair.into()),
            interval: Some(interval),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn contract_type(mut self, contract_type: ContractType) -> Self {
        self.contract_type = Some(contract_type);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRateHistoryRequest {
    pub symbol: Option<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PairRequest {
    pub pair: Option<String>,
}

/// Query for the `/futures/data` trading statistics (ratios, taker volume,
/// basis).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRequest {
    pub symbol: Option<String>,
    pub pair: Option<String>,
    pub contract_type: Option<ContractType>,
    pub period: Option<StatisticsPeriod>,
    pub limit: Option<u32>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

impl StatisticsRequest {
    pub fn new(symbol: impl Into<String>, period: StatisticsPeriod) -> Self {
        Self {
            symbol: Some(symbol.into()),
            period: Some(period),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub symbol: Option<String>,
    pub side: Option<OrderSide>,
    pub position_side: Option<PositionSide>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub time_in_force: Option<TimeInForce>,
    /// Cannot be sent with `closePosition=true`.
    pub quantity: Option<Decimal>,
    pub reduce_only: Option<bool>,
    pub price: Option<Decimal>,
    pub new_client_order_id: Option<String>,
    pub stop_price: Option<Decimal>,
    pub close_position: Option<bool>,
    pub activation_price: Option<Decimal>,
    /// Trailing percentage, 0.1 to 10.
    pub callback_rate: Option<Decimal>,
    pub working_type: Option<WorkingType>,
    #[serde(serialize_with = "upper_bool")]
    pub price_protect: Option<bool>,
    pub new_order_resp_type: Option<NewOrderRespType>,
    pub price_match: Option<PriceMatch>,
    pub self_trade_prevention_mode: Option<SelfTradePreventionMode>,
    /// Required with `timeInForce=GTD`; second precision.
    pub good_till_date: Option<u64>,
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
    pub fn stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    #[must_use]
    pub fn time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    #[must_use]
    pub fn reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = Some(reduce_only);
        self
    }

    #[must_use]
    pub fn position_side(mut self, position_side: PositionSide) -> Self {
        self.position_side = Some(position_side);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyOrderRequest {
    pub order_id: Option<u64>,
    pub orig_client_order_id: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<OrderSide>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub price_match: Option<PriceMatch>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderModifyHistoryRequest {
    pub symbol: Option<String>,
    pub order_id: Option<u64>,
    pub orig_client_order_id: Option<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LeverageRequest {
    pub symbol: Option<String>,
    /// Target initial leverage, 1 to 125.
    pub leverage: Option<u32>,
}

impl LeverageRequest {
    pub fn new(symbol: impl Into<String>, leverage: u32) -> Self {
        Self {
            symbol: Some(symbol.into()),
            leverage: Some(leverage),
        }
    }
}

/// Order acknowledgement returned by place, modify, query and cancel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub side: OrderSide,
    #[serde(default)]
    pub position_side: Option<PositionSide>,
    #[serde(rename = "type")]
    pub order_type: String,
    pub status: String,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    #[serde(default)]
    pub avg_price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub reduce_only: Option<bool>,
    #[serde(default)]
    pub update_time: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::Params;
    use std::str::FromStr;

    #[test]
    fn price_protect_is_upper_case() {
        let mut request = NewOrderRequest::new("BTCUSDT", OrderSide::Sell, OrderType::StopMarket);
        request.price_protect = Some(true);
        request.reduce_only = Some(false);
        let params = Params::from_serializable(&request).unwrap();

        assert_eq!(params.get("priceProtect"), Some("TRUE"));
        assert_eq!(params.get("reduceOnly"), Some("false"));
        assert!(params.get("closePosition").is_none());
    }

    #[test]
    fn order_response_parses_exchange_payload() {
        let response: OrderResponse = serde_json::from_str(
            r#"{
                "clientOrderId": "testOrder",
                "cumQty": "0",
                "cumQuote": "0",
                "executedQty": "0",
                "orderId": 22542179,
                "avgPrice": "0.00000",
                "origQty": "10",
                "price": "0",
                "reduceOnly": false,
                "side": "BUY",
                "positionSide": "SHORT",
                "status": "NEW",
                "stopPrice": "9300",
                "closePosition": false,
                "symbol": "BTCUSDT",
                "timeInForce": "GTD",
                "type": "TRAILING_STOP_MARKET",
                "origType": "TRAILING_STOP_MARKET",
                "updateTime": 1566818724722,
                "workingType": "CONTRACT_PRICE",
                "priceProtect": false
            }"#,
        )
        .unwrap();

        assert_eq!(response.order_id, 22_542_179);
        assert_eq!(response.position_side, Some(PositionSide::Short));
        assert_eq!(response.orig_qty, Decimal::from(10));
        assert_eq!(response.stop_price, Some(Decimal::from_str("9300").unwrap()));
        assert_eq!(response.time_in_force, Some(TimeInForce::Gtd));
    }
}
