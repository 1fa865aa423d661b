use crate::core::errors::ExchangeError;
use crate::core::kernel::backoff::Backoff;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, instrument, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection and reconnection settings
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Max reconnection attempts before the connection is declared failed
    pub max_reconnect_attempts: u32,
    /// First reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
    /// Upper bound of the reconnection delay in milliseconds
    pub max_reconnect_delay_ms: u64,
    /// Random spread applied to each delay, as a fraction of it
    pub reconnect_jitter: f64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 60_000,
            reconnect_jitter: 0.1,
        }
    }
}

impl WsConfig {
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration, max_delay: Duration) -> Self {
        self.reconnect_delay_ms = delay.as_millis() as u64;
        self.max_reconnect_delay_ms = max_delay.as_millis() as u64;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_delay_ms),
            Duration::from_millis(self.max_reconnect_delay_ms),
            self.reconnect_jitter,
        )
    }
}

/// WebSocket session trait - pure transport layer
#[async_trait]
pub trait WsSession: Send {
    /// Open the connection
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next data or close frame. Pings are answered here and
    /// never returned. `None` means the stream ended.
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;

    fn is_connected(&self) -> bool;
}

/// Tungstenite-based WebSocket session
pub struct TungsteniteWs {
    url: String,
    exchange_name: String,
    config: WsConfig,
    write: Option<SplitSink<Socket, Message>>,
    read: Option<SplitStream<Socket>>,
    connected: bool,
}

impl TungsteniteWs {
    pub fn new(url: String, exchange_name: String) -> Self {
        Self {
            url,
            exchange_name,
            config: WsConfig::default(),
            write: None,
            read: None,
            connected: false,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WsSession for TungsteniteWs {
    #[instrument(skip(self), fields(exchange = %self.exchange_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let (socket, _) = tokio::time::timeout(connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| ExchangeError::Stream("WebSocket connection timeout".to_string()))?
            .map_err(|e| ExchangeError::Stream(format!("WebSocket connection failed: {}", e)))?;

        let (write, read) = socket.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        debug!("WebSocket connected");
        Ok(())
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        let write = match self.write.as_mut() {
            Some(write) if self.connected => write,
            _ => return Err(ExchangeError::Stream("WebSocket not connected".to_string())),
        };

        if let Err(e) = write.send(msg).await {
            self.connected = false;
            return Err(ExchangeError::Stream(format!(
                "Failed to send WebSocket message: {}",
                e
            )));
        }
        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            let read = self.read.as_mut()?;
            match read.next().await {
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        warn!(exchange = %self.exchange_name, "Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(message @ Message::Close(_))) => {
                    self.connected = false;
                    return Some(Ok(message));
                }
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ExchangeError::Stream(format!("WebSocket error: {}", e))));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
            let _ = write.close().await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
