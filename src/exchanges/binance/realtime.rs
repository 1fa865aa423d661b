use crate::core::errors::ExchangeError;
use crate::core::kernel::{FixedEndpoint, StreamEndpoint, StreamManager, WsConfig};
use crate::exchanges::binance::codec::{MarketStreamCodec, UserDataCodec};
use crate::exchanges::binance::data_stream::ListenKeySource;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Listen keys expire after 60 minutes without a keep-alive.
pub const LISTEN_KEY_REFRESH: Duration = Duration::from_secs(30 * 60);

/// User-data endpoint: every (re)connect issues a listen key over REST and
/// connects to `<stream_url>/ws/<key>`.
pub struct ListenKeyEndpoint<S: ListenKeySource> {
    source: Arc<S>,
    stream_url: String,
    listen_key: Mutex<Option<String>>,
}

impl<S: ListenKeySource> ListenKeyEndpoint<S> {
    pub fn new(source: Arc<S>, stream_url: impl Into<String>) -> Self {
        Self {
            source,
            stream_url: stream_url.into(),
            listen_key: Mutex::new(None),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.listen_key.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<S: ListenKeySource> StreamEndpoint for ListenKeyEndpoint<S> {
    async fn resolve(&self) -> Result<String, ExchangeError> {
        let listen_key = self.source.create().await?;
        debug!("Listen key issued");
        let url = format!(
            "{}/ws/{}",
            self.stream_url.trim_end_matches('/'),
            listen_key
        );
        *self.slot() = Some(listen_key);
        Ok(url)
    }

    fn keep_alive_interval(&self) -> Option<Duration> {
        Some(LISTEN_KEY_REFRESH)
    }

    async fn keep_alive(&self) -> Result<(), ExchangeError> {
        let listen_key = self.slot().clone();
        match listen_key {
            Some(listen_key) => self.source.keep_alive(&listen_key).await,
            None => Err(ExchangeError::Stream("no listen key issued".to_string())),
        }
    }

    async fn release(&self) {
        let listen_key = self.slot().take();
        if let Some(listen_key) = listen_key {
            if let Err(e) = self.source.close(&listen_key).await {
                warn!(error = %e, "Failed to close listen key");
            }
        }
    }
}

/// Market stream manager over the combined-stream endpoint of `stream_url`.
pub fn market_stream(
    name: &str,
    stream_url: &str,
    config: WsConfig,
) -> StreamManager<MarketStreamCodec> {
    let endpoint = FixedEndpoint(format!("{}/stream", stream_url.trim_end_matches('/')));
    StreamManager::new(name, MarketStreamCodec::new(), Arc::new(endpoint), config)
}

/// User-data stream manager whose listen keys come from `source`.
pub fn user_data_stream<S: ListenKeySource>(
    name: &str,
    source: Arc<S>,
    stream_url: &str,
    config: WsConfig,
) -> StreamManager<UserDataCodec> {
    let endpoint = ListenKeyEndpoint::new(source, stream_url);
    StreamManager::new(name, UserDataCodec, Arc::new(endpoint), config)
}

/// The four stream managers of a client. Each connects lazily on its first
/// subscription.
///
/// User-data streams have a single logical channel; any channel name works
/// and every subscriber receives every event.
pub struct BinanceRealtime {
    spot_market: StreamManager<MarketStreamCodec>,
    futures_market: StreamManager<MarketStreamCodec>,
    spot_user_data: StreamManager<UserDataCodec>,
    futures_user_data: StreamManager<UserDataCodec>,
}

impl BinanceRealtime {
    pub fn new<S, F>(
        spot_stream_url: &str,
        futures_stream_url: &str,
        spot_keys: Arc<S>,
        futures_keys: Arc<F>,
        config: &WsConfig,
    ) -> Self
    where
        S: ListenKeySource,
        F: ListenKeySource,
    {
        Self {
            spot_market: market_stream("binance", spot_stream_url, config.clone()),
            futures_market: market_stream("binance_perp", futures_stream_url, config.clone()),
            spot_user_data: user_data_stream(
                "binance_user",
                spot_keys,
                spot_stream_url,
                config.clone(),
            ),
            futures_user_data: user_data_stream(
                "binance_perp_user",
                futures_keys,
                futures_stream_url,
                config.clone(),
            ),
        }
    }

    pub fn spot_market(&self) -> &StreamManager<MarketStreamCodec> {
        &self.spot_market
    }

    pub fn futures_market(&self) -> &StreamManager<MarketStreamCodec> {
        &self.futures_market
    }

    pub fn spot_user_data(&self) -> &StreamManager<UserDataCodec> {
        &self.spot_user_data
    }

    pub fn futures_user_data(&self) -> &StreamManager<UserDataCodec> {
        &self.futures_user_data
    }

    /// Close every manager. Listen keys in use are released.
    pub async fn close(&self) {
        tokio::join!(
            self.spot_market.close(),
            self.futures_market.close(),
            self.spot_user_data.close(),
            self.futures_user_data.close(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingKeys {
        created: AtomicU32,
        refreshed: AtomicU32,
        closed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ListenKeySource for CountingKeys {
        async fn create(&self) -> Result<String, ExchangeError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("key{n}"))
        }

        async fn keep_alive(&self, _listen_key: &str) -> Result<(), ExchangeError> {
            self.refreshed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self, listen_key: &str) -> Result<(), ExchangeError> {
            self.closed.lock().unwrap().push(listen_key.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_resolve_issues_a_fresh_key() {
        let keys = Arc::new(CountingKeys::default());
        let endpoint = ListenKeyEndpoint::new(Arc::clone(&keys), "wss://fstream.binance.com/");

        assert_eq!(endpoint.resolve().await.unwrap(), "wss://fstream.binance.com/ws/key1");
        assert_eq!(endpoint.resolve().await.unwrap(), "wss://fstream.binance.com/ws/key2");
        assert_eq!(endpoint.keep_alive_interval(), Some(LISTEN_KEY_REFRESH));
    }

    #[tokio::test]
    async fn keep_alive_needs_an_issued_key() {
        let keys = Arc::new(CountingKeys::default());
        let endpoint = ListenKeyEndpoint::new(Arc::clone(&keys), "wss://example");

        assert!(endpoint.keep_alive().await.is_err());
        endpoint.resolve().await.unwrap();
        endpoint.keep_alive().await.unwrap();
        assert_eq!(keys.refreshed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_closes_the_current_key_once() {
        let keys = Arc::new(CountingKeys::default());
        let endpoint = ListenKeyEndpoint::new(Arc::clone(&keys), "wss://example");

        endpoint.resolve().await.unwrap();
        endpoint.release().await;
        endpoint.release().await;
        assert_eq!(*keys.closed.lock().unwrap(), vec!["key1".to_string()]);
    }
}
