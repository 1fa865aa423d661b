use crate::core::errors::ExchangeError;
use crate::core::kernel::{Frame, WsCodec};
use crate::core::types::KlineInterval;
use crate::exchanges::binance::events::{MarketEvent, UserDataEvent};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_tungstenite::tungstenite::Message;

/// Market streams over the combined endpoint (`/stream`).
///
/// Channels are stream names such as `btcusdt@trade`; payloads arrive in a
/// `{"stream": .., "data": ..}` envelope and are routed by that name.
#[derive(Debug, Default)]
pub struct MarketStreamCodec {
    next_id: AtomicU64,
}

impl MarketStreamCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(&self, method: &str, streams: &[impl AsRef<str>]) -> Message {
        let params: Vec<&str> = streams.iter().map(AsRef::as_ref).collect();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Message::Text(
            json!({
                "method": method,
                "params": params,
                "id": id,
            })
            .to_string(),
        )
    }
}

impl WsCodec for MarketStreamCodec {
    type Message = MarketEvent;

    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Option<Message>, ExchangeError> {
        Ok(Some(self.request("SUBSCRIBE", streams)))
    }

    fn encode_unsubscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Option<Message>, ExchangeError> {
        Ok(Some(self.request("UNSUBSCRIBE", streams)))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Frame<MarketEvent>>, ExchangeError> {
        let Some(mut value) = parse_json(message)? else {
            return Ok(None);
        };

        // {"result": null, "id": 1} acknowledges a (un)subscribe
        if value.get("id").is_some() {
            if let Some(error) = value.get("error") {
                return Err(ExchangeError::Stream(format!("request rejected: {error}")));
            }
            return Ok(None);
        }

        let stream = value
            .get("stream")
            .and_then(Value::as_str)
            .map(str::to_string);
        let data = if stream.is_some() && value.get("data").is_some() {
            value["data"].take()
        } else {
            value
        };

        Ok(Some(Frame::Data {
            stream,
            message: decode_market_event(data)?,
        }))
    }
}

fn decode_market_event(data: Value) -> Result<MarketEvent, ExchangeError> {
    let event_type = data.get("e").and_then(Value::as_str).map(str::to_string);
    let event = match event_type.as_deref() {
        Some("trade") => MarketEvent::Trade(typed(data)?),
        Some("aggTrade") => MarketEvent::AggTrade(typed(data)?),
        Some("kline") => MarketEvent::Kline(typed(data)?),
        Some("24hrTicker") => MarketEvent::Ticker(typed(data)?),
        Some("bookTicker") => MarketEvent::BookTicker(typed(data)?),
        Some("depthUpdate") => MarketEvent::DepthUpdate(typed(data)?),
        Some("markPriceUpdate") => MarketEvent::MarkPrice(typed(data)?),
        Some(_) => MarketEvent::Raw(data),
        // spot pushes partial depth and book tickers without an event type
        None if data.get("lastUpdateId").is_some() => MarketEvent::PartialDepth(typed(data)?),
        None if data.get("u").is_some() && data.get("b").is_some() => {
            MarketEvent::BookTicker(typed(data)?)
        }
        None => MarketEvent::Raw(data),
    };
    Ok(event)
}

/// User-data streams over `/ws/<listenKey>`. The URL selects the account,
/// so there is nothing to subscribe and every payload goes to every
/// subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserDataCodec;

impl WsCodec for UserDataCodec {
    type Message = UserDataEvent;

    fn encode_subscription(
        &self,
        _streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Option<Message>, ExchangeError> {
        Ok(None)
    }

    fn encode_unsubscription(
        &self,
        _streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Option<Message>, ExchangeError> {
        Ok(None)
    }

    fn decode_message(
        &self,
        message: Message,
    ) -> Result<Option<Frame<UserDataEvent>>, ExchangeError> {
        let Some(data) = parse_json(message)? else {
            return Ok(None);
        };

        let event_type = data.get("e").and_then(Value::as_str).map(str::to_string);
        let event = match event_type.as_deref() {
            Some("listenKeyExpired") => {
                return Ok(Some(Frame::Reconnect("listen key expired".to_string())));
            }
            Some("executionReport") => UserDataEvent::ExecutionReport(typed(data)?),
            Some("outboundAccountPosition") => UserDataEvent::AccountPosition(typed(data)?),
            Some("balanceUpdate") => UserDataEvent::BalanceUpdate(typed(data)?),
            Some("ORDER_TRADE_UPDATE") => UserDataEvent::OrderTradeUpdate(typed(data)?),
            Some("ACCOUNT_UPDATE") => UserDataEvent::AccountUpdate(typed(data)?),
            Some("MARGIN_CALL") => UserDataEvent::MarginCall(typed(data)?),
            _ => UserDataEvent::Raw(data),
        };

        Ok(Some(Frame::Data {
            stream: None,
            message: event,
        }))
    }
}

fn parse_json(message: Message) -> Result<Option<Value>, ExchangeError> {
    let text = match message {
        Message::Text(text) => text,
        Message::Binary(data) => String::from_utf8(data).map_err(|e| {
            ExchangeError::Serialization(format!("Invalid UTF-8 in binary message: {}", e))
        })?,
        _ => return Ok(None),
    };
    Ok(Some(serde_json::from_str(&text)?))
}

fn typed<T: DeserializeOwned>(data: Value) -> Result<T, ExchangeError> {
    Ok(serde_json::from_value(data)?)
}

/// Stream names, lower-casing the symbol as the exchange requires.
pub mod streams {
    use super::KlineInterval;

    pub fn trade(symbol: &str) -> String {
        format!("{}@trade", symbol.to_lowercase())
    }

    pub fn agg_trade(symbol: &str) -> String {
        format!("{}@aggTrade", symbol.to_lowercase())
    }

    pub fn kline(symbol: &str, interval: KlineInterval) -> String {
        format!("{}@kline_{}", symbol.to_lowercase(), interval)
    }

    pub fn ticker(symbol: &str) -> String {
        format!("{}@ticker", symbol.to_lowercase())
    }

    pub fn book_ticker(symbol: &str) -> String {
        format!("{}@bookTicker", symbol.to_lowercase())
    }

    /// Diff depth; `update_speed_ms` is 100 or the default when `None`.
    pub fn depth(symbol: &str, update_speed_ms: Option<u32>) -> String {
        match update_speed_ms {
            Some(ms) => format!("{}@depth@{}ms", symbol.to_lowercase(), ms),
            None => format!("{}@depth", symbol.to_lowercase()),
        }
    }

    /// Top `levels` (5, 10 or 20) of the book.
    pub fn partial_depth(symbol: &str, levels: u32) -> String {
        format!("{}@depth{}", symbol.to_lowercase(), levels)
    }

    /// Futures only.
    pub fn mark_price(symbol: &str) -> String {
        format!("{}@markPrice", symbol.to_lowercase())
    }
}
