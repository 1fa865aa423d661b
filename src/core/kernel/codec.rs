use crate::core::errors::ExchangeError;
use tokio_tungstenite::tungstenite::Message;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<M> {
    /// Payload for subscribers. `stream` names the channel it belongs to;
    /// `None` means the connection carries a single logical channel and the
    /// payload goes to every subscriber.
    Data { stream: Option<String>, message: M },
    /// The server asked for a new connection (e.g. an expired listen key).
    Reconnect(String),
}

/// Codec trait for handling exchange-specific WebSocket message encoding/decoding
///
/// Control frames (ping, pong, close) never reach the codec; they are handled
/// by the transport.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this exchange
    type Message: Clone + Send + 'static;

    /// Encode a subscription request.
    ///
    /// Returns `Ok(None)` when the connection URL alone selects the channel
    /// and no frame needs to be sent.
    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Option<Message>, ExchangeError>;

    /// Encode an unsubscription request. `Ok(None)` as above.
    fn encode_unsubscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
    ) -> Result<Option<Message>, ExchangeError>;

    /// Decode a raw data frame.
    ///
    /// # Returns
    /// - `Ok(Some(frame))` - a payload or a reconnect request
    /// - `Ok(None)` - the frame is an acknowledgement or otherwise ignorable
    /// - `Err(error)` - the frame could not be parsed
    fn decode_message(&self, message: Message) -> Result<Option<Frame<Self::Message>>, ExchangeError>;
}
