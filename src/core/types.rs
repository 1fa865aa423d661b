//! Wire enums shared by the spot and futures method sets.
//!
//! Each serializes to the exact string the exchange expects, which is also
//! the string that ends up in the signed payload.

use crate::core::kernel::params::ToParam;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl ToParam for $name {
            fn to_param(&self) -> String {
                self.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    pub enum OrderSide {
        Buy => "BUY",
        Sell => "SELL",
    }
}

wire_enum! {
    /// Futures position side. `Both` is the one-way mode default.
    pub enum PositionSide {
        Both => "BOTH",
        Long => "LONG",
        Short => "SHORT",
    }
}

wire_enum! {
    /// Order types across spot and futures. Not every type is accepted by
    /// both product lines; the exchange rejects mismatches.
    pub enum OrderType {
        Limit => "LIMIT",
        Market => "MARKET",
        Stop => "STOP",
        TakeProfit => "TAKE_PROFIT",
        StopMarket => "STOP_MARKET",
        TakeProfitMarket => "TAKE_PROFIT_MARKET",
        TrailingStopMarket => "TRAILING_STOP_MARKET",
        StopLoss => "STOP_LOSS",
        StopLossLimit => "STOP_LOSS_LIMIT",
        TakeProfitLimit => "TAKE_PROFIT_LIMIT",
        LimitMaker => "LIMIT_MAKER",
    }
}

wire_enum! {
    pub enum TimeInForce {
        Gtc => "GTC",
        Ioc => "IOC",
        Fok => "FOK",
        Gtx => "GTX",
        Gtd => "GTD",
    }
}

wire_enum! {
    pub enum WorkingType {
        MarkPrice => "MARK_PRICE",
        ContractPrice => "CONTRACT_PRICE",
    }
}

wire_enum! {
    pub enum NewOrderRespType {
        Ack => "ACK",
        Result => "RESULT",
        Full => "FULL",
    }
}

wire_enum! {
    pub enum SelfTradePreventionMode {
        None => "NONE",
        ExpireTaker => "EXPIRE_TAKER",
        ExpireMaker => "EXPIRE_MAKER",
        ExpireBoth => "EXPIRE_BOTH",
    }
}

wire_enum! {
    pub enum PriceMatch {
        Opponent => "OPPONENT",
        Opponent5 => "OPPONENT_5",
        Opponent10 => "OPPONENT_10",
        Opponent20 => "OPPONENT_20",
        Queue => "QUEUE",
        Queue5 => "QUEUE_5",
        Queue10 => "QUEUE_10",
        Queue20 => "QUEUE_20",
    }
}

wire_enum! {
    pub enum ContractType {
        Perpetual => "PERPETUAL",
        CurrentQuarter => "CURRENT_QUARTER",
        NextQuarter => "NEXT_QUARTER",
    }
}

wire_enum! {
    pub enum KlineInterval {
        Seconds1 => "1s",
        Minutes1 => "1m",
        Minutes3 => "3m",
        Minutes5 => "5m",
        Minutes15 => "15m",
        Minutes30 => "30m",
        Hours1 => "1h",
        Hours2 => "2h",
        Hours4 => "4h",
        Hours6 => "6h",
        Hours8 => "8h",
        Hours12 => "12h",
        Days1 => "1d",
        Days3 => "3d",
        Weeks1 => "1w",
        Months1 => "1M",
    }
}

wire_enum! {
    /// Aggregation period of the futures trading statistics endpoints.
    pub enum StatisticsPeriod {
        Minutes5 => "5m",
        Minutes15 => "15m",
        Minutes30 => "30m",
        Hours1 => "1h",
        Hours2 => "2h",
        Hours4 => "4h",
        Hours6 => "6h",
        Hours12 => "12h",
        Days1 => "1d",
    }
}
