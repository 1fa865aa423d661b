use async_trait::async_trait;
use binance_connect::core::kernel::{
    StreamEndpoint, StreamManager, StreamState, WsCodec, WsConfig,
};
use binance_connect::exchanges::binance::realtime::{market_stream, user_data_stream};
use binance_connect::exchanges::binance::{
    streams, ListenKeySource, MarketEvent, MarketStreamCodec, UserDataEvent,
};
use binance_connect::ExchangeError;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

const WAIT: Duration = Duration::from_secs(5);

struct Peer {
    path: String,
    ws: WebSocketStream<TcpStream>,
}

impl Peer {
    async fn next_json(&mut self) -> Value {
        loop {
            match timeout(WAIT, self.ws.next()).await.expect("client frame") {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(Message::Close(_))) | None => panic!("client went away"),
                Some(Ok(_)) => {}
                Some(Err(e)) => panic!("server read failed: {e}"),
            }
        }
    }

    async fn push(&mut self, value: Value) {
        self.ws.send(Message::Text(value.to_string())).await.unwrap();
    }
}

struct TestServer {
    url: String,
    peers: mpsc::UnboundedReceiver<Peer>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (tx, peers) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut path = String::new();
                let accepted = tokio_tungstenite::accept_hdr_async(
                    stream,
                    |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                        path = request.uri().path().to_string();
                        Ok(response)
                    },
                )
                .await;
                if let Ok(ws) = accepted {
                    if tx.send(Peer { path, ws }).is_err() {
                        break;
                    }
                }
            }
        });

        Self { url, peers, task }
    }

    async fn accept(&mut self) -> Peer {
        timeout(WAIT, self.peers.recv())
            .await
            .expect("client connection")
            .expect("server running")
    }

    /// Stop listening; later connection attempts are refused.
    async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

fn fast_config(attempts: u32) -> WsConfig {
    WsConfig::default()
        .with_max_reconnect_attempts(attempts)
        .with_reconnect_delay(Duration::from_millis(10), Duration::from_millis(50))
        .with_connect_timeout(Duration::from_secs(2))
}

fn trade(stream: &str, symbol: &str, id: u64) -> Value {
    json!({
        "stream": stream,
        "data": {
            "e": "trade", "E": 1_700_000_000_000_u64, "s": symbol, "t": id,
            "p": "42000.10", "q": "0.5", "T": 1_700_000_000_000_u64, "m": false, "M": true
        }
    })
}

async fn wait_for_state<C: WsCodec>(manager: &StreamManager<C>, state: StreamState) {
    let mut states = manager.watch_state();
    timeout(WAIT, states.wait_for(|current| *current == state))
        .await
        .expect("state change")
        .unwrap();
}

fn trade_id(event: Result<MarketEvent, ExchangeError>) -> u64 {
    match event {
        Ok(MarketEvent::Trade(trade)) => trade.trade_id,
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn delivers_only_subscribed_streams() {
    let mut server = TestServer::start().await;
    let manager = market_stream("test", &server.url, fast_config(3));
    let channel = streams::trade("BTCUSDT");

    let (_handle, mut events) = manager.subscribe_channel(channel.clone()).unwrap();

    let mut peer = server.accept().await;
    assert_eq!(peer.path, "/stream");
    let request = peer.next_json().await;
    assert_eq!(request["method"], "SUBSCRIBE");
    assert_eq!(request["params"], json!([channel]));
    wait_for_state(&manager, StreamState::Open).await;

    peer.push(trade("ethusdt@trade", "ETHUSDT", 1)).await;
    peer.push(trade("btcusdt@trade", "BTCUSDT", 2)).await;

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(trade_id(event), 2);

    manager.close().await;
    assert_eq!(manager.state(), StreamState::Closed);
}

#[tokio::test]
async fn resubscribes_after_server_drop() {
    let mut server = TestServer::start().await;
    let manager = market_stream("test", &server.url, fast_config(3));
    let (_handle, mut events) = manager.subscribe_channel("btcusdt@trade").unwrap();

    let mut first = server.accept().await;
    first.next_json().await;
    first.ws.close(None).await.unwrap();
    drop(first);

    let mut second = server.accept().await;
    let request = second.next_json().await;
    assert_eq!(request["method"], "SUBSCRIBE");
    assert_eq!(request["params"], json!(["btcusdt@trade"]));

    second.push(trade("btcusdt@trade", "BTCUSDT", 7)).await;
    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(trade_id(event), 7);
}

#[tokio::test]
async fn gives_up_after_reconnect_budget() {
    let mut server = TestServer::start().await;
    let manager = market_stream("test", &server.url, fast_config(2));
    let (_handle, mut events) = manager.subscribe_channel("btcusdt@trade").unwrap();

    let mut peer = server.accept().await;
    peer.next_json().await;
    server.stop().await;
    drop(peer);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(event, Err(ExchangeError::Stream(_))));
    // the handler is gone after the terminal error
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_none());
    assert_eq!(manager.state(), StreamState::Failed);
}

#[tokio::test]
async fn no_delivery_after_unsubscribe() {
    let mut server = TestServer::start().await;
    let manager = market_stream("test", &server.url, fast_config(3));
    let (first_handle, mut first) = manager.subscribe_channel("btcusdt@trade").unwrap();
    let (_second_handle, mut second) = manager.subscribe_channel("ethusdt@trade").unwrap();

    let mut peer = server.accept().await;
    let request = peer.next_json().await;
    assert_eq!(request["params"], json!(["btcusdt@trade", "ethusdt@trade"]));
    wait_for_state(&manager, StreamState::Open).await;

    manager.unsubscribe(&first_handle).await;
    let request = peer.next_json().await;
    assert_eq!(request["method"], "UNSUBSCRIBE");
    assert_eq!(request["params"], json!(["btcusdt@trade"]));

    peer.push(trade("btcusdt@trade", "BTCUSDT", 1)).await;
    peer.push(trade("ethusdt@trade", "ETHUSDT", 2)).await;

    let event = timeout(WAIT, second.recv()).await.unwrap().unwrap();
    assert_eq!(trade_id(event), 2);
    assert!(first.recv().await.is_none());

    // unsubscribing twice is harmless
    manager.unsubscribe(&first_handle).await;
}

#[tokio::test]
async fn last_unsubscribe_returns_to_idle() {
    let mut server = TestServer::start().await;
    let manager = market_stream("test", &server.url, fast_config(3));
    let handle = manager.subscribe("btcusdt@trade", |_| {}).unwrap();

    let mut peer = server.accept().await;
    peer.next_json().await;
    wait_for_state(&manager, StreamState::Open).await;

    manager.unsubscribe(&handle).await;
    wait_for_state(&manager, StreamState::Idle).await;

    // a new subscription opens a new connection
    let _handle = manager.subscribe("ethusdt@trade", |_| {}).unwrap();
    let mut peer = server.accept().await;
    let request = peer.next_json().await;
    assert_eq!(request["params"], json!(["ethusdt@trade"]));
}

#[derive(Default)]
struct FakeKeys {
    issued: Mutex<u32>,
    closed: Mutex<Vec<String>>,
}

#[async_trait]
impl ListenKeySource for FakeKeys {
    async fn create(&self) -> Result<String, ExchangeError> {
        let mut issued = self.issued.lock().unwrap();
        *issued += 1;
        Ok(format!("key{issued}"))
    }

    async fn keep_alive(&self, _listen_key: &str) -> Result<(), ExchangeError> {
        Ok(())
    }

    async fn close(&self, listen_key: &str) -> Result<(), ExchangeError> {
        self.closed.lock().unwrap().push(listen_key.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn user_data_renews_expired_listen_key() {
    let mut server = TestServer::start().await;
    let keys = Arc::new(FakeKeys::default());
    let manager = user_data_stream("user", Arc::clone(&keys), &server.url, fast_config(3));
    let (_handle, mut events) = manager.subscribe_channel("account").unwrap();

    let mut peer = server.accept().await;
    assert_eq!(peer.path, "/ws/key1");
    wait_for_state(&manager, StreamState::Open).await;

    peer.push(json!({"e": "balanceUpdate", "E": 1, "a": "USDT", "d": "100.00", "T": 2}))
        .await;
    match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
        Ok(UserDataEvent::BalanceUpdate(update)) => assert_eq!(update.asset, "USDT"),
        other => panic!("unexpected event: {other:?}"),
    }

    peer.push(json!({"e": "listenKeyExpired", "E": 3})).await;
    let peer = server.accept().await;
    assert_eq!(peer.path, "/ws/key2");

    manager.close().await;
    assert_eq!(*keys.closed.lock().unwrap(), vec!["key2".to_string()]);
}

#[tokio::test]
async fn user_data_renew_loop_exhausts_reconnect_budget() {
    let mut server = TestServer::start().await;
    let keys = Arc::new(FakeKeys::default());
    let manager = user_data_stream("user", Arc::clone(&keys), &server.url, fast_config(1));
    let (_handle, mut events) = manager.subscribe_channel("account").unwrap();

    // every fresh key expires before any event arrives
    let mut first = server.accept().await;
    first.push(json!({"e": "listenKeyExpired", "E": 1})).await;
    let mut second = server.accept().await;
    assert_eq!(second.path, "/ws/key2");
    second.push(json!({"e": "listenKeyExpired", "E": 2})).await;

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(event, Err(ExchangeError::Stream(_))));
    assert_eq!(manager.state(), StreamState::Failed);
    assert_eq!(*keys.issued.lock().unwrap(), 2);
}

/// Combined-stream endpoint whose keep-alive fails on its second call.
struct FlakyEndpoint {
    url: String,
    resolves: AtomicU32,
    keep_alives: AtomicU32,
}

#[async_trait]
impl StreamEndpoint for FlakyEndpoint {
    async fn resolve(&self) -> Result<String, ExchangeError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}/stream", self.url))
    }

    fn keep_alive_interval(&self) -> Option<Duration> {
        Some(Duration::from_millis(100))
    }

    async fn keep_alive(&self) -> Result<(), ExchangeError> {
        if self.keep_alives.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(ExchangeError::Stream("listen key not found".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn failed_keep_alive_reconnects_and_keeps_delivering() {
    let mut server = TestServer::start().await;
    let endpoint = Arc::new(FlakyEndpoint {
        url: server.url.clone(),
        resolves: AtomicU32::new(0),
        keep_alives: AtomicU32::new(0),
    });
    let manager = StreamManager::new(
        "keep-alive",
        MarketStreamCodec::new(),
        Arc::clone(&endpoint) as Arc<dyn StreamEndpoint>,
        fast_config(3),
    );
    let (_handle, mut events) = manager.subscribe_channel("btcusdt@trade").unwrap();

    let mut first = server.accept().await;
    first.next_json().await;

    // the second keep-alive fails and forces a fresh resolve
    let mut second = server.accept().await;
    let request = second.next_json().await;
    assert_eq!(request["params"], json!(["btcusdt@trade"]));
    assert_eq!(endpoint.resolves.load(Ordering::SeqCst), 2);
    assert!(endpoint.keep_alives.load(Ordering::SeqCst) >= 2);

    second.push(trade("btcusdt@trade", "BTCUSDT", 9)).await;
    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(trade_id(event), 9);

    // refreshes keep running on the new connection
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(endpoint.keep_alives.load(Ordering::SeqCst) >= 4);
    assert_eq!(endpoint.resolves.load(Ordering::SeqCst), 2);

    manager.close().await;
    drop(first);
}
