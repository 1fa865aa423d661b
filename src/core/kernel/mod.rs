//! Transport kernel: request signing and execution, WebSocket sessions and
//! the streaming connection manager.
//!
//! Nothing in here knows about specific endpoints. Method sets build
//! [`RequestDescriptor`]s and hand them to a [`RestClient`]; stream codecs
//! plug into a [`StreamManager`] through [`WsCodec`].
//!
//! ```rust,no_run
//! use binance_connect::core::kernel::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), binance_connect::ExchangeError> {
//! let signer = Arc::new(HmacSigner::new("api_key".into(), "secret".into()));
//! let rest = RestClientBuilder::new(RestClientConfig::new(
//!     "https://fapi.binance.com".to_string(),
//!     "binance_perp".to_string(),
//! ))
//! .with_signer(signer)
//! .build()?;
//!
//! let depth = rest
//!     .execute(RequestDescriptor::public(
//!         "/fapi/v1/depth",
//!         Params::new().with("symbol", "BTCUSDT"),
//!     ))
//!     .await?;
//! # let _ = depth;
//! # Ok(())
//! # }
//! ```
pub mod backoff;
pub mod codec;
pub mod params;
pub mod rest;
pub mod signer;
pub mod stream;
pub mod ws;

pub use backoff::Backoff;
pub use codec::{Frame, WsCodec};
pub use params::{require_one_of, validate_required, Params, ToParam};
pub use rest::{
    decode, ReqwestRest, RequestDescriptor, RestClient, RestClientBuilder, RestClientConfig,
    Security,
};
pub use signer::{HmacSigner, SignatureResult, Signer, API_KEY_HEADER};
pub use stream::{
    FixedEndpoint, Handler, StreamEndpoint, StreamManager, StreamState, SubscriptionHandle,
};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
