pub mod client;
pub mod core;
pub mod exchanges;

pub use crate::client::{BinanceApi, FuturesApi, SpotApi};
pub use crate::core::{config::ClientConfig, errors::ExchangeError, types::*};
