//! Streaming connection manager.
//!
//! A [`StreamManager`] multiplexes any number of channels over one physical
//! WebSocket connection. The socket is owned by a background task; callers
//! talk to it over a command channel, so every write and every handler call
//! happens on that one task, in order.
//!
//! Lifecycle: `Idle -> Connecting -> Open`, `Open -> Reconnecting -> Open`
//! on unexpected drops, `Reconnecting -> Failed` once the retry budget is
//! spent, and `Closed` after an explicit [`StreamManager::close`]. Removing
//! the last subscription closes the socket and returns to `Idle`.

use crate::core::errors::ExchangeError;
use crate::core::kernel::backoff::Backoff;
use crate::core::kernel::codec::{Frame, WsCodec};
use crate::core::kernel::ws::{TungsteniteWs, WsConfig, WsSession};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

/// Callback receiving parsed messages, or the terminal stream error.
pub type Handler<M> = Box<dyn FnMut(Result<M, ExchangeError>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Failed,
    Closed,
}

/// Where to connect, and how to keep the connection authorized.
#[async_trait]
pub trait StreamEndpoint: Send + Sync + 'static {
    /// URL for the next connection attempt. Called before every (re)connect.
    async fn resolve(&self) -> Result<String, ExchangeError>;

    /// How often [`StreamEndpoint::keep_alive`] must run while connected.
    fn keep_alive_interval(&self) -> Option<Duration> {
        None
    }

    /// Refresh whatever authorizes the connection. A failure forces a
    /// reconnect through [`StreamEndpoint::resolve`].
    async fn keep_alive(&self) -> Result<(), ExchangeError> {
        Ok(())
    }

    /// Release server-side resources once the connection is no longer wanted.
    async fn release(&self) {}
}

/// A URL that never changes.
#[derive(Debug, Clone)]
pub struct FixedEndpoint(pub String);

#[async_trait]
impl StreamEndpoint for FixedEndpoint {
    async fn resolve(&self) -> Result<String, ExchangeError> {
        Ok(self.0.clone())
    }
}

/// Identifies one subscription. Cheap to clone; unsubscribing twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    channel: String,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

enum Command<M> {
    Subscribe {
        id: u64,
        channel: String,
        handler: Handler<M>,
    },
    Unsubscribe {
        id: u64,
        ack: oneshot::Sender<()>,
    },
    Close {
        ack: Option<oneshot::Sender<()>>,
    },
}

struct Shared<M> {
    commands: Option<mpsc::UnboundedSender<Command<M>>>,
    closed: bool,
}

fn lock<M>(shared: &Mutex<Shared<M>>) -> MutexGuard<'_, Shared<M>> {
    // a panicking handler cannot leave `Shared` half-updated
    shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// One multiplexed stream connection.
pub struct StreamManager<C: WsCodec> {
    name: String,
    codec: Arc<C>,
    endpoint: Arc<dyn StreamEndpoint>,
    config: WsConfig,
    shared: Arc<Mutex<Shared<C::Message>>>,
    state: Arc<watch::Sender<StreamState>>,
    next_id: AtomicU64,
}

impl<C: WsCodec> StreamManager<C> {
    pub fn new(
        name: impl Into<String>,
        codec: C,
        endpoint: Arc<dyn StreamEndpoint>,
        config: WsConfig,
    ) -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            name: name.into(),
            codec: Arc::new(codec),
            endpoint,
            config,
            shared: Arc::new(Mutex::new(Shared {
                commands: None,
                closed: false,
            })),
            state: Arc::new(state),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Subscribe `handler` to `channel`, connecting first if needed.
    ///
    /// The handler runs on the connection task, one message at a time. It
    /// receives `Err` at most once, when reconnection has been given up, and
    /// is never called again afterwards.
    pub fn subscribe<F>(
        &self,
        channel: impl Into<String>,
        handler: F,
    ) -> Result<SubscriptionHandle, ExchangeError>
    where
        F: FnMut(Result<C::Message, ExchangeError>) + Send + 'static,
    {
        let channel = channel.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut command = Command::Subscribe {
            id,
            channel: channel.clone(),
            handler: Box::new(handler),
        };

        let mut shared = lock(&self.shared);
        if shared.closed {
            return Err(ExchangeError::Stream(format!(
                "{} stream manager is closed",
                self.name
            )));
        }

        if let Some(commands) = shared.commands.as_ref() {
            match commands.send(command) {
                Ok(()) => return Ok(SubscriptionHandle { id, channel }),
                Err(mpsc::error::SendError(returned)) => command = returned,
            }
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ExchangeError::Stream("subscribing requires a running tokio runtime".to_string())
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        // queued before the task starts, so it is part of the first connect
        let _ = tx.send(command);
        shared.commands = Some(tx);
        drop(shared);

        let actor = Connection {
            name: self.name.clone(),
            codec: Arc::clone(&self.codec),
            endpoint: Arc::clone(&self.endpoint),
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            state: Arc::clone(&self.state),
            commands: rx,
            subscriptions: Vec::new(),
            healthy: false,
        };
        runtime.spawn(actor.run());

        Ok(SubscriptionHandle { id, channel })
    }

    /// Subscribe and receive messages through a channel instead of a callback.
    pub fn subscribe_channel(
        &self,
        channel: impl Into<String>,
    ) -> Result<
        (
            SubscriptionHandle,
            mpsc::UnboundedReceiver<Result<C::Message, ExchangeError>>,
        ),
        ExchangeError,
    > {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(channel, move |event| {
            let _ = tx.send(event);
        })?;
        Ok((handle, rx))
    }

    /// Stop delivery for `handle`. Once this returns the handler will not be
    /// called again. The socket is closed when no subscription remains.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let (ack, done) = oneshot::channel();
        let sent = {
            let shared = lock(&self.shared);
            shared.commands.as_ref().is_some_and(|commands| {
                commands
                    .send(Command::Unsubscribe { id: handle.id, ack })
                    .is_ok()
            })
        };
        if sent {
            let _ = done.await;
        }
    }

    /// Close the connection and refuse further subscriptions.
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        let sent = {
            let mut shared = lock(&self.shared);
            shared.closed = true;
            shared
                .commands
                .take()
                .is_some_and(|commands| commands.send(Command::Close { ack: Some(ack) }).is_ok())
        };
        if sent {
            let _ = done.await;
        }
        self.state.send_replace(StreamState::Closed);
    }
}

impl<C: WsCodec> Drop for StreamManager<C> {
    fn drop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.closed = true;
        if let Some(commands) = shared.commands.take() {
            let _ = commands.send(Command::Close { ack: None });
        }
    }
}

impl<C: WsCodec> std::fmt::Debug for StreamManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamManager")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Subscription<M> {
    id: u64,
    channel: String,
    handler: Handler<M>,
}

/// What a processed command asks the connection to do.
enum Effect {
    None,
    /// First subscriber for a channel: send a subscribe frame.
    Subscribe(String),
    /// Last subscriber left a channel: send an unsubscribe frame.
    Unsubscribe(String),
    Close(Option<oneshot::Sender<()>>),
}

/// Why the connection task stops.
enum Exit {
    Idle,
    Failed,
    Closed(Option<oneshot::Sender<()>>),
}

enum SessionEnd {
    Exit(Exit),
    /// Unexpected drop; retried with backoff.
    Dropped(String),
    /// Server or keep-alive asked for a fresh connection. Retried at once
    /// after a healthy session, otherwise with backoff.
    Renew(String),
}

struct Connection<C: WsCodec> {
    name: String,
    codec: Arc<C>,
    endpoint: Arc<dyn StreamEndpoint>,
    config: WsConfig,
    shared: Arc<Mutex<Shared<C::Message>>>,
    state: Arc<watch::Sender<StreamState>>,
    commands: mpsc::UnboundedReceiver<Command<C::Message>>,
    subscriptions: Vec<Subscription<C::Message>>,
    /// Set once the current session delivered data or kept itself alive.
    healthy: bool,
}

impl<C: WsCodec> Connection<C> {
    #[instrument(skip(self), fields(stream = %self.name))]
    async fn run(mut self) {
        let mut backoff = self.config.backoff();
        // reset only after a healthy session
        let mut renew_backoff = self.config.backoff();
        let mut reconnecting = false;

        let exit = loop {
            self.set_state(if reconnecting {
                StreamState::Reconnecting
            } else {
                StreamState::Connecting
            });

            let reason = match self.connect().await {
                Ok(mut ws) => {
                    backoff.reset();
                    let end = self.session(&mut ws).await;
                    let _ = ws.close().await;
                    match end {
                        SessionEnd::Exit(exit) => break exit,
                        SessionEnd::Renew(reason) => {
                            info!(reason = %reason, "Renewing stream connection");
                            reconnecting = true;
                            if self.healthy {
                                renew_backoff.reset();
                                continue;
                            }
                            if let Some(exit) =
                                self.retry_or_fail(&mut renew_backoff, &reason).await
                            {
                                break exit;
                            }
                            continue;
                        }
                        SessionEnd::Dropped(reason) => reason,
                    }
                }
                Err(Ok(exit)) => break exit,
                Err(Err(e)) => e.to_string(),
            };

            reconnecting = true;
            if let Some(exit) = self.retry_or_fail(&mut backoff, &reason).await {
                break exit;
            }
        };

        match exit {
            // endpoint resources stay claimed until close()
            Exit::Idle => info!("No subscriptions left, stream connection idle"),
            Exit::Failed => {}
            Exit::Closed(ack) => {
                self.endpoint.release().await;
                self.set_state(StreamState::Closed);
                info!("Stream connection closed");
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        }
    }

    fn set_state(&self, state: StreamState) {
        self.state.send_replace(state);
    }

    /// Sleep out the next backoff delay, or give up when the budget is spent.
    /// `Some` means the task must stop.
    async fn retry_or_fail(&mut self, backoff: &mut Backoff, reason: &str) -> Option<Exit> {
        if backoff.attempt() >= self.config.max_reconnect_attempts {
            error!(
                attempts = backoff.attempt(),
                reason = %reason,
                "Reconnect attempts exhausted"
            );
            self.fail(reason);
            return Some(Exit::Failed);
        }

        let delay = backoff.next_delay();
        warn!(
            attempt = backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "Stream connection lost, reconnecting"
        );
        self.set_state(StreamState::Reconnecting);

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return None,
                command = self.commands.recv() => {
                    if let Some(exit) = self.apply_offline(command) {
                        return Some(exit);
                    }
                }
            }
        }
    }

    /// Resolve the endpoint and open the socket while still serving commands.
    ///
    /// `Err(Ok(exit))` means the task must stop, `Err(Err(e))` a failed attempt.
    async fn connect(&mut self) -> Result<TungsteniteWs, Result<Exit, ExchangeError>> {
        let endpoint = Arc::clone(&self.endpoint);
        let name = self.name.clone();
        let config = self.config.clone();
        let connecting = async move {
            let url = endpoint.resolve().await?;
            debug!(url = %url, "Connecting stream");
            let mut ws = TungsteniteWs::new(url, name).with_config(config);
            ws.connect().await?;
            Ok::<_, ExchangeError>(ws)
        };
        tokio::pin!(connecting);

        loop {
            tokio::select! {
                result = &mut connecting => return result.map_err(Err),
                command = self.commands.recv() => {
                    if let Some(exit) = self.apply_offline(command) {
                        return Err(Ok(exit));
                    }
                }
            }
        }
    }

    /// Serve an open socket until it drops or the task must stop.
    async fn session(&mut self, ws: &mut TungsteniteWs) -> SessionEnd {
        self.healthy = false;
        let channels = self.channels();
        if !channels.is_empty() {
            if let Err(e) = send_frame(&self.codec, ws, true, &channels).await {
                return SessionEnd::Dropped(e.to_string());
            }
        }

        self.set_state(StreamState::Open);
        info!(channels = channels.len(), "Stream connection open");

        let mut keep_alive = self
            .endpoint
            .keep_alive_interval()
            .map(|period| tokio::time::interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                message = ws.next_raw() => match message {
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map_or_else(
                            || "closed by server".to_string(),
                            |f| format!("closed by server: {}", f.reason),
                        );
                        return SessionEnd::Dropped(reason);
                    }
                    Some(Ok(message)) => {
                        if let Some(end) = self.dispatch(message) {
                            return end;
                        }
                    }
                    Some(Err(e)) => return SessionEnd::Dropped(e.to_string()),
                    None => return SessionEnd::Dropped("stream ended".to_string()),
                },
                command = self.commands.recv() => {
                    let effect = match command {
                        Some(command) => self.apply(command),
                        None => Effect::Close(None),
                    };
                    match effect {
                        Effect::None => {}
                        Effect::Subscribe(channel) => {
                            if let Err(e) = send_frame(&self.codec, ws, true, &[channel]).await {
                                return SessionEnd::Dropped(e.to_string());
                            }
                        }
                        Effect::Unsubscribe(channel) => {
                            if let Err(e) = send_frame(&self.codec, ws, false, &[channel]).await {
                                return SessionEnd::Dropped(e.to_string());
                            }
                            if self.subscriptions.is_empty() {
                                if let Some(exit) = self.retire() {
                                    return SessionEnd::Exit(exit);
                                }
                                // subscribers queued while retiring
                                let channels = self.channels();
                                if let Err(e) = send_frame(&self.codec, ws, true, &channels).await {
                                    return SessionEnd::Dropped(e.to_string());
                                }
                            }
                        }
                        Effect::Close(ack) => return SessionEnd::Exit(Exit::Closed(ack)),
                    }
                },
                () = tick(&mut keep_alive) => {
                    if let Err(e) = self.endpoint.keep_alive().await {
                        warn!(error = %e, "Stream keep-alive failed");
                        return SessionEnd::Renew(format!("keep-alive failed: {}", e));
                    }
                    self.healthy = true;
                    debug!("Stream keep-alive sent");
                }
            }
        }
    }

    fn dispatch(&mut self, message: Message) -> Option<SessionEnd> {
        match self.codec.decode_message(message) {
            Ok(Some(Frame::Data { stream, message })) => {
                self.healthy = true;
                for subscription in &mut self.subscriptions {
                    let wanted = stream
                        .as_deref()
                        .map_or(true, |stream| stream == subscription.channel);
                    if wanted {
                        (subscription.handler)(Ok(message.clone()));
                    }
                }
                None
            }
            Ok(Some(Frame::Reconnect(reason))) => Some(SessionEnd::Renew(reason)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable stream message");
                None
            }
        }
    }

    /// Distinct channels with at least one subscriber, in subscription order.
    fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = Vec::new();
        for subscription in &self.subscriptions {
            if !channels.contains(&subscription.channel) {
                channels.push(subscription.channel.clone());
            }
        }
        channels
    }

    fn apply(&mut self, command: Command<C::Message>) -> Effect {
        match command {
            Command::Subscribe {
                id,
                channel,
                handler,
            } => {
                let first = !self.subscriptions.iter().any(|s| s.channel == channel);
                debug!(id, channel = %channel, "Subscribed");
                self.subscriptions.push(Subscription {
                    id,
                    channel: channel.clone(),
                    handler,
                });
                if first {
                    Effect::Subscribe(channel)
                } else {
                    Effect::None
                }
            }
            Command::Unsubscribe { id, ack } => {
                let effect = match self.subscriptions.iter().position(|s| s.id == id) {
                    Some(index) => {
                        let removed = self.subscriptions.remove(index);
                        debug!(id, channel = %removed.channel, "Unsubscribed");
                        if self.subscriptions.iter().any(|s| s.channel == removed.channel) {
                            Effect::None
                        } else {
                            Effect::Unsubscribe(removed.channel)
                        }
                    }
                    None => Effect::None,
                };
                let _ = ack.send(());
                effect
            }
            Command::Close { ack } => Effect::Close(ack),
        }
    }

    /// Apply a command while no socket is open. Frames are not needed: the
    /// channel list is flushed on the next open.
    fn apply_offline(&mut self, command: Option<Command<C::Message>>) -> Option<Exit> {
        let Some(command) = command else {
            return Some(Exit::Closed(None));
        };
        match self.apply(command) {
            Effect::Close(ack) => Some(Exit::Closed(ack)),
            Effect::Unsubscribe(_) if self.subscriptions.is_empty() => self.retire(),
            _ => None,
        }
    }

    /// Try to go idle after the last unsubscribe.
    ///
    /// Runs under the manager lock so no subscribe can slip between the
    /// emptiness check and dropping the command sender. Returns `None` when
    /// queued commands added subscribers back.
    fn retire(&mut self) -> Option<Exit> {
        let shared = Arc::clone(&self.shared);
        let mut guard = lock(&shared);
        while let Ok(command) = self.commands.try_recv() {
            if let Effect::Close(ack) = self.apply(command) {
                return Some(Exit::Closed(ack));
            }
        }
        if !self.subscriptions.is_empty() {
            return None;
        }
        guard.commands = None;
        self.set_state(StreamState::Idle);
        Some(Exit::Idle)
    }

    /// Deliver the terminal error to every subscriber, including ones still
    /// queued, and detach from the manager.
    fn fail(&mut self, reason: &str) {
        let shared = Arc::clone(&self.shared);
        let mut guard = lock(&shared);
        guard.commands = None;
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Subscribe {
                    id,
                    channel,
                    handler,
                } => self.subscriptions.push(Subscription {
                    id,
                    channel,
                    handler,
                }),
                Command::Unsubscribe { id, ack } => {
                    self.subscriptions.retain(|s| s.id != id);
                    let _ = ack.send(());
                }
                Command::Close { ack } => {
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
            }
        }
        self.set_state(StreamState::Failed);
        drop(guard);

        let message = format!("{} stream failed: {}", self.name, reason);
        for mut subscription in self.subscriptions.drain(..) {
            (subscription.handler)(Err(ExchangeError::Stream(message.clone())));
        }
    }
}

async fn send_frame<C: WsCodec>(
    codec: &Arc<C>,
    ws: &mut TungsteniteWs,
    subscribe: bool,
    channels: &[String],
) -> Result<(), ExchangeError> {
    let frame = if subscribe {
        codec.encode_subscription(channels)?
    } else {
        codec.encode_unsubscription(channels)?
    };
    match frame {
        Some(frame) => ws.send_raw(frame).await,
        None => Ok(()),
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct EchoCodec;

    impl WsCodec for EchoCodec {
        type Message = Value;

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

        fn decode_message(&self, message: Message) -> Result<Option<Frame<Value>>, ExchangeError> {
            match message {
                Message::Text(text) => Ok(Some(Frame::Data {
                    stream: None,
                    message: serde_json::from_str(&text)?,
                })),
                _ => Ok(None),
            }
        }
    }

    fn manager() -> StreamManager<EchoCodec> {
        StreamManager::new(
            "test",
            EchoCodec,
            Arc::new(FixedEndpoint("ws://127.0.0.1:9/ws".to_string())),
            WsConfig::default()
                .with_max_reconnect_attempts(0)
                .with_connect_timeout(Duration::from_millis(200)),
        )
    }

    #[tokio::test]
    async fn starts_idle_and_closes() {
        let manager = manager();
        assert_eq!(manager.state(), StreamState::Idle);

        manager.close().await;
        assert_eq!(manager.state(), StreamState::Closed);
        assert!(manager.subscribe("a", |_| {}).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_subscribers() {
        let manager = manager();
        let (_handle, mut events) = manager.subscribe_channel("a").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, Err(ExchangeError::Stream(_))));
        assert!(events.recv().await.is_none());
        assert_eq!(manager.state(), StreamState::Failed);
    }

    #[tokio::test]
    async fn unsubscribe_without_connection_is_noop() {
        let manager = manager();
        let handle = SubscriptionHandle {
            id: 42,
            channel: "a".to_string(),
        };
        manager.unsubscribe(&handle).await;
        manager.unsubscribe(&handle).await;
        assert_eq!(manager.state(), StreamState::Idle);
    }

    #[test]
    fn subscribe_outside_runtime_is_an_error() {
        let manager = manager();
        assert!(manager.subscribe("a", |_| {}).is_err());
    }
}
