use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::core::config::OkxConfig;
use crate::core::errors::OkxWsError;
use crate::core::types::{ChannelArgs, Operation};
use crate::ws::events::{
    Envelope, ErrorEvent, LoginAck, StreamEvent, SubscribeAck, SuccessAck, TopicEvent,
    UnsubscribeAck,
};
use crate::ws::private::{PrivateChannels, PrivateRouter};
use crate::ws::public::{PublicChannels, PublicRouter};
use crate::ws::session::{
    SessionClass, Sessions, WsSink, WsStream, KEEPALIVE_INTERVAL, POLL_TICK, READ_TIMEOUT,
    REDIAL_INTERVAL, WRITE_TIMEOUT,
};
use crate::ws::signer::{WsSigner, LOGIN_SIGN_METHOD, LOGIN_SIGN_PATH};

/// A pending login request may not be reissued while it is younger than this.
pub(crate) const AUTH_REQUEST_WINDOW: Duration = Duration::from_secs(30);

/// Authentication lifecycle of the private session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Requested(Instant),
    Authorized,
}

/// Delivery channels for control events. Set-and-clear semantics, last
/// writer wins; swapped only through the facade setters.
#[derive(Default)]
pub(crate) struct ControlSinks {
    pub error: Option<mpsc::UnboundedSender<ErrorEvent>>,
    pub subscribe: Option<mpsc::UnboundedSender<SubscribeAck>>,
    pub unsubscribe: Option<mpsc::UnboundedSender<UnsubscribeAck>>,
    pub login: Option<mpsc::UnboundedSender<LoginAck>>,
    pub success: Option<mpsc::UnboundedSender<SuccessAck>>,
    pub structured: Option<mpsc::UnboundedSender<StreamEvent>>,
    pub raw: Option<mpsc::UnboundedSender<Envelope>>,
}

/// An ordered classifier over decoded envelopes. Routers are consulted in a
/// fixed priority order until one claims the frame.
#[async_trait]
pub(crate) trait FrameRouter: Send + Sync {
    async fn route(&self, client: &OkxWsClient, raw: &str, envelope: &Envelope) -> bool;
}

pub(crate) struct Inner {
    pub config: OkxConfig,
    pub signer: WsSigner,
    pub sessions: Sessions,
    pub auth: RwLock<AuthState>,
    pub sinks: RwLock<ControlSinks>,
    pub public_channels: RwLock<PublicChannels>,
    pub private_channels: RwLock<PrivateChannels>,
    routers: Vec<Box<dyn FrameRouter>>,
    pub cancel: CancellationToken,
    done_tx: mpsc::UnboundedSender<&'static str>,
    done_rx: Mutex<Option<mpsc::UnboundedReceiver<&'static str>>>,
}

/// The websocket streaming client.
///
/// Maintains one public and one private connection, each dialed lazily on
/// first use and redialed lazily after a failure. Cheap to clone; clones
/// share the same sessions, sinks and authentication state.
///
/// https://www.okx.com/docs-v5/en/#websocket-api
#[derive(Clone)]
pub struct OkxWsClient {
    pub(crate) inner: Arc<Inner>,
}

impl OkxWsClient {
    /// Create a client. No connection is dialed until first use.
    pub fn new(config: OkxConfig) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let signer = WsSigner::new(config.secret_key.clone());
        Self {
            inner: Arc::new(Inner {
                config,
                signer,
                sessions: Sessions::new(),
                auth: RwLock::new(AuthState::Unauthenticated),
                sinks: RwLock::new(ControlSinks::default()),
                public_channels: RwLock::new(PublicChannels::default()),
                private_channels: RwLock::new(PrivateChannels::default()),
                routers: vec![Box::new(PrivateRouter), Box::new(PublicRouter)],
                cancel: CancellationToken::new(),
                done_tx,
                done_rx: Mutex::new(Some(done_rx)),
            }),
        }
    }

    /// Request cooperative shutdown of both session classes.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    /// Take the done notification channel. Each worker loop emits one label
    /// on it when it exits due to cancellation. Yields the receiver once.
    pub async fn take_done_receiver(&self) -> Option<mpsc::UnboundedReceiver<&'static str>> {
        self.inner.done_rx.lock().await.take()
    }

    /// Whether the private session has completed its login flow.
    pub async fn is_authorized(&self) -> bool {
        matches!(*self.inner.auth.read().await, AuthState::Authorized)
    }

    /// Whether the physical connection for `class` is currently up.
    pub async fn is_connected(&self, class: SessionClass) -> bool {
        self.inner.sessions.get(class).state.read().await.connected
    }

    /// Route control events to dedicated channels. Last writer wins; `None`
    /// clears a previously set channel.
    pub async fn set_control_channels(
        &self,
        error: Option<mpsc::UnboundedSender<ErrorEvent>>,
        subscribe: Option<mpsc::UnboundedSender<SubscribeAck>>,
        unsubscribe: Option<mpsc::UnboundedSender<UnsubscribeAck>>,
        login: Option<mpsc::UnboundedSender<LoginAck>>,
        success: Option<mpsc::UnboundedSender<SuccessAck>>,
    ) {
        let mut sinks = self.inner.sinks.write().await;
        sinks.error = error;
        sinks.subscribe = subscribe;
        sinks.unsubscribe = unsubscribe;
        sinks.login = login;
        sinks.success = success;
    }

    /// Route every decoded event to `structured` and every unclassified
    /// envelope to `raw`.
    pub async fn set_event_channels(
        &self,
        structured: Option<mpsc::UnboundedSender<StreamEvent>>,
        raw: Option<mpsc::UnboundedSender<Envelope>>,
    ) {
        let mut sinks = self.inner.sinks.write().await;
        sinks.structured = structured;
        sinks.raw = raw;
    }

    /// Establish the physical connection for a session class.
    ///
    /// Idempotent when already connected. On dial failure, retries on a
    /// fixed 2s interval until success or cancellation.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-connect
    #[instrument(skip(self), fields(class = %class))]
    pub async fn connect(&self, class: SessionClass) -> Result<(), OkxWsError> {
        if self.is_connected(class).await {
            return Ok(());
        }
        let retry = Retry::spawn(FixedInterval::new(REDIAL_INTERVAL), || self.dial(class));
        tokio::select! {
            result = retry => result,
            () = self.inner.cancel.cancelled() => Err(self.notify_cancelled("connect")),
        }
    }

    // Returns a boxed `dyn Future + Send` rather than an `async fn` so its
    // concrete type breaks the Send/sizedness recursion cycle that runs
    // dial -> spawn(run_dispatcher) -> process -> login -> send -> connect ->
    // dial. Without the indirection the compiler cannot resolve `Send` for the
    // task spawned below.
    fn dial(
        &self,
        class: SessionClass,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), OkxWsError>> + Send + '_>>
    {
        Box::pin(async move {
            let session = self.inner.sessions.get(class);
            let mut state = session.state.write().await;
            if state.connected {
                return Ok(());
            }

            let url = self.inner.config.ws_url(class);
            let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
                warn!(class = %class, error = %e, "dial failed");
                OkxWsError::Transport(format!("dial {} failed: {}", url, e))
            })?;
            let (sink, read) = stream.split();

            state.epoch += 1;
            state.connected = true;
            state.last_transmit = None;
            let epoch = state.epoch;
            drop(state);
            debug!(class = %class, epoch, "connected");

            let client = self.clone();
            tokio::spawn(async move {
                if let Err(e) = client.run_pump(class, sink, epoch).await {
                    if !e.is_cancelled() {
                        warn!(class = %class, error = %e, "outbound pump stopped");
                    }
                }
            });
            let client = self.clone();
            tokio::spawn(async move {
                if let Err(e) = client.run_dispatcher(class, read, epoch).await {
                    if !e.is_cancelled() {
                        error!(class = %class, error = %e, "dispatcher stopped");
                    }
                }
            });

            Ok(())
        })
    }

    /// Outbound pump: drains the class queue in order and keeps the
    /// connection alive when idle.
    async fn run_pump(
        &self,
        class: SessionClass,
        mut sink: WsSink,
        epoch: u64,
    ) -> Result<(), OkxWsError> {
        let session = self.inner.sessions.get(class);
        // Park the queue for the lifetime of this connection; a successor
        // pump blocks here until this one exits.
        let mut queue = session.send_rx.lock().await;
        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + POLL_TICK, POLL_TICK);
        loop {
            tokio::select! {
                frame = queue.recv() => {
                    let Some(frame) = frame else { return Ok(()) };
                    match tokio::time::timeout(WRITE_TIMEOUT, sink.send(frame)).await {
                        Ok(Ok(())) => {
                            session.state.write().await.last_transmit = Some(Instant::now());
                        }
                        Ok(Err(e)) => {
                            self.teardown(class, epoch).await;
                            return Err(OkxWsError::Transport(format!("write failed: {}", e)));
                        }
                        Err(_) => {
                            self.teardown(class, epoch).await;
                            return Err(OkxWsError::Timeout("write"));
                        }
                    }
                }
                _ = tick.tick() => {
                    let state = session.state.read().await;
                    if !state.connected || state.epoch != epoch {
                        return Ok(());
                    }
                    let idle = state
                        .last_transmit
                        .map_or(true, |t| t.elapsed() > KEEPALIVE_INTERVAL);
                    drop(state);
                    if idle {
                        // Enqueue rather than write directly: pings take the
                        // same ordered path as application frames.
                        let tx = session.send_tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(Message::Text("ping".to_string())).await;
                        });
                    }
                }
                () = self.inner.cancel.cancelled() => {
                    return Err(self.notify_cancelled("sender"));
                }
            }
        }
    }

    /// Inbound dispatcher: reads frames off one connection, classifies them
    /// and routes to the configured sinks.
    async fn run_dispatcher(
        &self,
        class: SessionClass,
        mut read: WsStream,
        epoch: u64,
    ) -> Result<(), OkxWsError> {
        let session = self.inner.sessions.get(class);
        let result = loop {
            let next = tokio::select! {
                () = self.inner.cancel.cancelled() => break Err(self.notify_cancelled("receiver")),
                next = tokio::time::timeout(READ_TIMEOUT, read.next()) => next,
            };
            let frame = match next {
                Err(_) => break Err(OkxWsError::Timeout("read")),
                Ok(None) => break Ok(()),
                Ok(Some(Err(e))) => {
                    break Err(OkxWsError::Transport(format!("read failed: {}", e)))
                }
                Ok(Some(Ok(frame))) => frame,
            };
            session.state.write().await.last_transmit = Some(Instant::now());
            match frame {
                Message::Text(text) => {
                    if text == "pong" {
                        // heartbeat reply; timestamp refreshed above
                        continue;
                    }
                    let envelope: Envelope = match serde_json::from_str(&text) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            break Err(OkxWsError::Protocol(format!(
                                "undecodable frame: {}",
                                e
                            )))
                        }
                    };
                    self.process(&text, envelope).await;
                }
                Message::Ping(payload) => {
                    let tx = session.send_tx.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(Message::Pong(payload)).await;
                    });
                }
                Message::Close(_) => break Ok(()),
                _ => {}
            }
        };
        self.teardown(class, epoch).await;
        result
    }

    /// Mark a connection closed. A no-op when a newer connection has already
    /// replaced this epoch.
    async fn teardown(&self, class: SessionClass, epoch: u64) {
        let mut state = self.inner.sessions.get(class).state.write().await;
        if state.epoch != epoch || !state.connected {
            return;
        }
        state.connected = false;
        state.last_transmit = None;
        drop(state);
        if class == SessionClass::Private {
            // a redial must run the login flow again
            *self.inner.auth.write().await = AuthState::Unauthenticated;
        }
        debug!(class = %class, epoch, "connection torn down");
    }

    fn notify_cancelled(&self, label: &'static str) -> OkxWsError {
        let _ = self.inner.done_tx.send(label);
        OkxWsError::Cancelled(label)
    }

    /// Send the login control frame for the private session.
    ///
    /// A no-op when already authorized or when a login request is pending
    /// and younger than 30 seconds.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-login
    pub async fn login(&self) -> Result<(), OkxWsError> {
        {
            let auth = self.inner.auth.read().await;
            match *auth {
                AuthState::Authorized => return Ok(()),
                AuthState::Requested(at) if at.elapsed() < AUTH_REQUEST_WINDOW => return Ok(()),
                _ => {}
            }
        }
        if !self.inner.config.has_credentials() {
            return Err(OkxWsError::Auth(
                "API credentials are required for the private session".to_string(),
            ));
        }
        *self.inner.auth.write().await = AuthState::Requested(Instant::now());

        let (timestamp, sign) = self.inner.signer.sign(LOGIN_SIGN_METHOD, LOGIN_SIGN_PATH)?;
        let mut args = ChannelArgs::new();
        args.insert("apiKey".to_string(), self.inner.config.api_key().to_string());
        args.insert(
            "passphrase".to_string(),
            self.inner.config.passphrase().to_string(),
        );
        args.insert("timestamp".to_string(), timestamp);
        args.insert("sign".to_string(), sign);
        self.send(SessionClass::Private, Operation::Login, vec![args], None)
            .await
    }

    /// Block until the private session is authorized, logging in first when
    /// needed. Polls at a short interval; resolves only to a fully
    /// authorized or cancelled state.
    pub async fn wait_for_authorization(&self) -> Result<(), OkxWsError> {
        if self.is_authorized().await {
            return Ok(());
        }
        // Box the recursive call: login -> send -> wait_for_authorization forms
        // a cycle whose future would otherwise be infinitely sized (E0733).
        Box::pin(self.login()).await?;
        let mut tick = tokio::time::interval(POLL_TICK);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if self.is_authorized().await {
                        return Ok(());
                    }
                }
                () = self.inner.cancel.cancelled() => {
                    return Err(self.notify_cancelled("authorization"));
                }
            }
        }
    }

    /// Subscribe to the Cartesian product of `channels` x `arg_sets` in one
    /// control frame. An empty channel list means each arg set carries its
    /// own "channel" key (templated channels such as candle bars).
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-subscribe
    pub async fn subscribe(
        &self,
        class: SessionClass,
        channels: &[&str],
        arg_sets: &[ChannelArgs],
    ) -> Result<(), OkxWsError> {
        let args = build_subscription_args(channels, arg_sets);
        self.send(class, Operation::Subscribe, args, None).await
    }

    /// Unsubscribe one arg set from every listed channel.
    ///
    /// https://www.okx.com/docs-v5/en/#websocket-api-unsubscribe
    pub async fn unsubscribe(
        &self,
        class: SessionClass,
        channels: &[&str],
        args: ChannelArgs,
    ) -> Result<(), OkxWsError> {
        let args = build_unsubscription_args(channels, &args);
        self.send(class, Operation::Unsubscribe, args, None).await
    }

    /// Enqueue one control frame on a session class.
    ///
    /// Any non-login operation first ensures the connection is dialed and,
    /// on the private class, blocks until authorization completes. The
    /// outbound queue is small; a burst of sends blocks briefly.
    pub async fn send(
        &self,
        class: SessionClass,
        op: Operation,
        args: Vec<ChannelArgs>,
        extras: Option<ChannelArgs>,
    ) -> Result<(), OkxWsError> {
        if op != Operation::Login {
            self.connect(class).await?;
            if class == SessionClass::Private {
                self.wait_for_authorization().await?;
            }
        }
        let frame = OpFrame {
            op,
            args: &args,
            extras: extras.as_ref(),
        };
        let payload = serde_json::to_string(&frame)?;
        debug!(class = %class, op = %op, "enqueue control frame");
        let tx = self.inner.sessions.get(class).send_tx.clone();
        tokio::select! {
            sent = tx.send(Message::Text(payload)) => sent.map_err(|_| OkxWsError::NotConnected),
            () = self.inner.cancel.cancelled() => Err(self.notify_cancelled("send")),
        }
    }

    /// Classify one decoded frame and forward it. Returns whether any
    /// consumer claimed it.
    pub(crate) async fn process(&self, raw: &str, envelope: Envelope) -> bool {
        match envelope.event.as_deref() {
            Some("error") => {
                match serde_json::from_str::<ErrorEvent>(raw) {
                    Ok(event) => {
                        let sinks = self.inner.sinks.read().await;
                        if let Some(tx) = &sinks.error {
                            let _ = tx.send(event);
                        }
                    }
                    Err(e) => warn!(error = %e, "error event decode failed"),
                }
                return true;
            }
            Some("subscribe") => {
                match serde_json::from_str::<SubscribeAck>(raw) {
                    Ok(event) => {
                        let sinks = self.inner.sinks.read().await;
                        if let Some(tx) = &sinks.subscribe {
                            let _ = tx.send(event.clone());
                        }
                        if let Some(tx) = &sinks.structured {
                            let _ = tx.send(StreamEvent::Subscribe(event));
                        }
                    }
                    Err(e) => warn!(error = %e, "subscribe ack decode failed"),
                }
                return true;
            }
            Some("unsubscribe") => {
                match serde_json::from_str::<UnsubscribeAck>(raw) {
                    Ok(event) => {
                        let sinks = self.inner.sinks.read().await;
                        if let Some(tx) = &sinks.unsubscribe {
                            let _ = tx.send(event.clone());
                        }
                        if let Some(tx) = &sinks.structured {
                            let _ = tx.send(StreamEvent::Unsubscribe(event));
                        }
                    }
                    Err(e) => warn!(error = %e, "unsubscribe ack decode failed"),
                }
                return true;
            }
            Some("login") => {
                let stale = matches!(
                    *self.inner.auth.read().await,
                    AuthState::Requested(at) if at.elapsed() > AUTH_REQUEST_WINDOW
                );
                if stale {
                    // the acknowledged request is no longer trustworthy
                    *self.inner.auth.write().await = AuthState::Unauthenticated;
                    if let Err(e) = self.login().await {
                        warn!(error = %e, "stale login retry failed");
                    }
                    return true;
                }
                *self.inner.auth.write().await = AuthState::Authorized;
                match serde_json::from_str::<LoginAck>(raw) {
                    Ok(event) => {
                        let sinks = self.inner.sinks.read().await;
                        if let Some(tx) = &sinks.login {
                            let _ = tx.send(event.clone());
                        }
                        if let Some(tx) = &sinks.structured {
                            let _ = tx.send(StreamEvent::Login(event));
                        }
                    }
                    Err(e) => warn!(error = %e, "login ack decode failed"),
                }
                return true;
            }
            _ => {}
        }

        for router in &self.inner.routers {
            if router.route(self, raw, &envelope).await {
                return true;
            }
        }

        if envelope.id.as_deref().map_or(false, |id| !id.is_empty()) {
            if envelope.code_or_zero() != 0 {
                // venue-reported failure of an id-correlated request
                match serde_json::from_str::<ErrorEvent>(raw) {
                    Ok(event) => {
                        let sinks = self.inner.sinks.read().await;
                        if let Some(tx) = &sinks.error {
                            let _ = tx.send(event);
                        }
                    }
                    Err(e) => warn!(error = %e, "error ack decode failed"),
                }
                return true;
            }
            match serde_json::from_str::<SuccessAck>(raw) {
                Ok(event) => {
                    let sinks = self.inner.sinks.read().await;
                    if let Some(tx) = &sinks.success {
                        let _ = tx.send(event.clone());
                    }
                    if let Some(tx) = &sinks.structured {
                        let _ = tx.send(StreamEvent::Success(event));
                    }
                }
                Err(e) => warn!(error = %e, "success ack decode failed"),
            }
            return true;
        }

        let sinks = self.inner.sinks.read().await;
        if let Some(tx) = &sinks.raw {
            let _ = tx.send(envelope);
        }
        false
    }

    /// Decode a recognized topic frame and deliver it to its typed channel
    /// and the structured sink. A malformed payload for a recognized topic
    /// is logged and dropped; the frame stays claimed.
    pub(crate) async fn dispatch_topic<T>(
        &self,
        raw: &str,
        channel: &str,
        sender: Option<mpsc::UnboundedSender<TopicEvent<T>>>,
        wrap: fn(TopicEvent<T>) -> StreamEvent,
    ) -> bool
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let event: TopicEvent<T> = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(channel, error = %e, "topic payload decode failed, frame dropped");
                return true;
            }
        };
        if let Some(tx) = sender {
            let _ = tx.send(event.clone());
        }
        let sinks = self.inner.sinks.read().await;
        if let Some(tx) = &sinks.structured {
            let _ = tx.send(wrap(event));
        }
        true
    }
}

/// Outbound control frame: `{"op": ..., "args": [...]}` plus any extra
/// top-level fields (the request id of trade operations).
#[derive(Serialize)]
struct OpFrame<'a> {
    op: Operation,
    args: &'a [ChannelArgs],
    #[serde(flatten)]
    extras: Option<&'a ChannelArgs>,
}

/// Cartesian product of channel names x parameter sets. Every entry is a
/// deep copy of its parameter set merged with its channel tag.
pub(crate) fn build_subscription_args(
    channels: &[&str],
    arg_sets: &[ChannelArgs],
) -> Vec<ChannelArgs> {
    if channels.is_empty() {
        return arg_sets.to_vec();
    }
    let mut out = Vec::with_capacity(channels.len() * arg_sets.len());
    for channel in channels {
        for arg_set in arg_sets {
            let mut merged = arg_set.clone();
            merged.insert("channel".to_string(), (*channel).to_string());
            out.push(merged);
        }
    }
    out
}

/// One entry per channel name, each a copy of the single parameter set. With
/// no channel names the set is sent as-is and must carry its own channel key.
pub(crate) fn build_unsubscription_args(
    channels: &[&str],
    args: &ChannelArgs,
) -> Vec<ChannelArgs> {
    if channels.is_empty() {
        return vec![args.clone()];
    }
    channels
        .iter()
        .map(|channel| {
            let mut merged = args.clone();
            merged.insert("channel".to_string(), (*channel).to_string());
            merged
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    fn test_client() -> OkxWsClient {
        OkxWsClient::new(OkxConfig::new(
            "test-key".to_string(),
            "test-secret".to_string(),
            "test-pass".to_string(),
        ))
    }

    fn args(pairs: &[(&str, &str)]) -> ChannelArgs {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn subscription_args_form_cartesian_product() {
        let set_a = args(&[("instId", "BTC-USDT")]);
        let set_b = args(&[("instId", "ETH-USDT")]);
        let built = build_subscription_args(&["tickers", "trades"], &[set_a.clone(), set_b]);

        assert_eq!(built.len(), 4);
        assert_eq!(built[0].get("channel").map(String::as_str), Some("tickers"));
        assert_eq!(built[0].get("instId").map(String::as_str), Some("BTC-USDT"));
        assert_eq!(built[3].get("channel").map(String::as_str), Some("trades"));
        assert_eq!(built[3].get("instId").map(String::as_str), Some("ETH-USDT"));
        // deep copies: the source set is untouched
        assert!(!set_a.contains_key("channel"));
    }

    #[test]
    fn subscription_args_with_implicit_channel() {
        let set = args(&[("channel", "candle1m"), ("instId", "BTC-USDT")]);
        let built = build_subscription_args(&[], &[set]);
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].get("channel").map(String::as_str), Some("candle1m"));
    }

    #[test]
    fn unsubscription_args_one_entry_per_channel() {
        let set = args(&[("instId", "BTC-USDT")]);
        let built = build_unsubscription_args(&["tickers", "trades"], &set);
        assert_eq!(built.len(), 2);
        assert_eq!(built[1].get("channel").map(String::as_str), Some("trades"));

        let implicit = args(&[("channel", "candle1m"), ("instId", "BTC-USDT")]);
        let built = build_unsubscription_args(&[], &implicit);
        assert_eq!(built.len(), 1);
    }

    #[test]
    fn op_frame_merges_extras_at_top_level() {
        let arg_sets = vec![args(&[("instId", "BTC-USDT")])];
        let extras = args(&[("id", "abc123")]);
        let frame = OpFrame {
            op: Operation::Order,
            args: &arg_sets,
            extras: Some(&extras),
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(value["op"], "order");
        assert_eq!(value["id"], "abc123");
        assert_eq!(value["args"][0]["instId"], "BTC-USDT");
    }

    #[tokio::test]
    async fn login_is_idempotent_within_window() {
        let client = test_client();
        client.login().await.unwrap();
        client.login().await.unwrap();

        let mut queue = client.inner.sessions.private.send_rx.lock().await;
        let frame = queue.try_recv().unwrap();
        let text = match frame {
            Message::Text(text) => text,
            other => panic!("unexpected frame: {:?}", other),
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["op"], "login");
        assert!(value["args"][0]["sign"].is_string());
        assert!(matches!(queue.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn login_requires_credentials() {
        let client = OkxWsClient::new(OkxConfig::read_only());
        assert!(matches!(
            client.login().await,
            Err(OkxWsError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn login_ack_authorizes_session() {
        let client = test_client();
        *client.inner.auth.write().await = AuthState::Requested(Instant::now());

        let raw = r#"{"event":"login","code":"0","msg":""}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(client.process(raw, envelope).await);
        assert!(client.is_authorized().await);

        // sticky: a duplicate ack leaves it authorized
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        client.process(raw, envelope).await;
        assert!(client.is_authorized().await);
    }

    #[tokio::test]
    async fn stale_login_ack_triggers_relogin() {
        let client = test_client();
        let stale = Instant::now()
            .checked_sub(AUTH_REQUEST_WINDOW + Duration::from_secs(1))
            .unwrap();
        *client.inner.auth.write().await = AuthState::Requested(stale);

        let raw = r#"{"event":"login","code":"0","msg":""}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(client.process(raw, envelope).await);

        // not authorized: a fresh login request went out instead
        assert!(!client.is_authorized().await);
        assert!(matches!(
            *client.inner.auth.read().await,
            AuthState::Requested(at) if at.elapsed() < Duration::from_secs(5)
        ));
        let mut queue = client.inner.sessions.private.send_rx.lock().await;
        assert!(queue.try_recv().is_ok());
    }

    #[tokio::test]
    async fn teardown_resets_private_authorization() {
        let client = test_client();
        *client.inner.auth.write().await = AuthState::Authorized;
        {
            let mut state = client.inner.sessions.private.state.write().await;
            state.connected = true;
            state.epoch = 1;
        }
        client.teardown(SessionClass::Private, 1).await;
        assert!(!client.is_authorized().await);
        assert!(!client.is_connected(SessionClass::Private).await);
    }

    #[tokio::test]
    async fn teardown_ignores_stale_epochs() {
        let client = test_client();
        {
            let mut state = client.inner.sessions.public.state.write().await;
            state.connected = true;
            state.epoch = 2;
        }
        client.teardown(SessionClass::Public, 1).await;
        assert!(client.is_connected(SessionClass::Public).await);
    }

    #[tokio::test]
    async fn error_events_reach_only_the_error_sink() {
        let client = test_client();
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let (sub_tx, mut sub_rx) = mpsc::unbounded_channel();
        let (structured_tx, mut structured_rx) = mpsc::unbounded_channel();
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
        client
            .set_control_channels(Some(err_tx), Some(sub_tx), None, None, None)
            .await;
        client
            .set_event_channels(Some(structured_tx), Some(raw_tx))
            .await;

        let raw = r#"{"event":"error","code":"60012","msg":"Invalid request"}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(client.process(raw, envelope).await);

        let event = err_rx.try_recv().unwrap();
        assert_eq!(event.code, Some(60012));
        assert!(sub_rx.try_recv().is_err());
        assert!(structured_rx.try_recv().is_err());
        assert!(raw_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn id_with_nonzero_code_is_redispatched_as_error() {
        let client = test_client();
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let (success_tx, mut success_rx) = mpsc::unbounded_channel();
        client
            .set_control_channels(Some(err_tx), None, None, None, Some(success_tx))
            .await;

        let raw = r#"{"id":"req-1","op":"order","code":"60013","msg":"rejected"}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(client.process(raw, envelope).await);
        assert_eq!(err_rx.try_recv().unwrap().id.as_deref(), Some("req-1"));
        assert!(success_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn id_with_zero_code_is_a_success_ack() {
        let client = test_client();
        let (success_tx, mut success_rx) = mpsc::unbounded_channel();
        client
            .set_control_channels(None, None, None, None, Some(success_tx))
            .await;

        let raw = r#"{"id":"req-2","op":"order","code":"0","msg":"","data":[{"ordId":"1"}]}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(client.process(raw, envelope).await);
        let ack = success_rx.try_recv().unwrap();
        assert_eq!(ack.id.as_deref(), Some("req-2"));
        assert_eq!(ack.op.as_deref(), Some("order"));
    }

    #[tokio::test]
    async fn unmatched_frames_fall_through_to_raw() {
        let client = test_client();
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
        client.set_event_channels(None, Some(raw_tx)).await;

        let raw = r#"{"something":"else"}"#;
        let envelope: Envelope = serde_json::from_str(raw).unwrap();
        assert!(!client.process(raw, envelope).await);
        assert!(raw_rx.try_recv().is_ok());
    }
}
