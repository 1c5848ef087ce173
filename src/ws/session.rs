use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Fixed interval between dial attempts while a connection is down.
pub(crate) const REDIAL_INTERVAL: Duration = Duration::from_secs(2);
/// A stalled peer must accept a frame within this window.
pub(crate) const WRITE_TIMEOUT: Duration = Duration::from_secs(3);
/// The venue disconnects idle clients after 30 seconds of silence.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Keepalive fires at 80% of the read window.
pub(crate) const KEEPALIVE_INTERVAL: Duration =
    Duration::from_secs(READ_TIMEOUT.as_secs() * 8 / 10);
/// Polling tick shared by the outbound pump and the authorization wait.
pub(crate) const POLL_TICK: Duration = Duration::from_millis(300);
/// Outbound queue depth per session class; a full queue blocks the caller.
pub(crate) const SEND_QUEUE_CAPACITY: usize = 3;

pub(crate) type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub(crate) type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// One of the two independent streaming lanes.
///
/// Each class owns exactly one physical connection; the private class
/// additionally requires a completed login before application frames may be
/// sent on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClass {
    Public,
    Private,
}

impl SessionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for SessionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable per-class connection state, guarded by a reader/writer lock:
/// readers (keepalive checks) proceed concurrently, writers (dial, teardown,
/// transmit-timestamp updates) are exclusive.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub connected: bool,
    /// Incremented on every successful dial; lets a worker from a replaced
    /// connection recognize that its teardown no longer applies.
    pub epoch: u64,
    pub last_transmit: Option<Instant>,
}

/// Everything one session class owns: its outbound queue and its connection
/// state. The queue receiver is parked under a mutex so it survives redials -
/// each new pump locks it for the lifetime of its connection and frames
/// enqueued while disconnected are delivered once the class is redialed.
pub(crate) struct Session {
    pub send_tx: mpsc::Sender<Message>,
    pub send_rx: Mutex<mpsc::Receiver<Message>>,
    pub state: RwLock<SessionState>,
}

impl Session {
    pub(crate) fn new() -> Self {
        let (send_tx, send_rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        Self {
            send_tx,
            send_rx: Mutex::new(send_rx),
            state: RwLock::new(SessionState::default()),
        }
    }
}

/// The two session slots, addressed by [`SessionClass`]. An explicit
/// two-field struct: there are exactly two lanes and they are named.
pub(crate) struct Sessions {
    pub public: Session,
    pub private: Session,
}

impl Sessions {
    pub(crate) fn new() -> Self {
        Self {
            public: Session::new(),
            private: Session::new(),
        }
    }

    pub(crate) fn get(&self, class: SessionClass) -> &Session {
        match class {
            SessionClass::Public => &self.public,
            SessionClass::Private => &self.private,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_is_80_percent_of_read_window() {
        assert_eq!(KEEPALIVE_INTERVAL, Duration::from_secs(24));
    }

    #[tokio::test]
    async fn sessions_are_independent_slots() {
        let sessions = Sessions::new();
        sessions
            .get(SessionClass::Public)
            .state
            .write()
            .await
            .connected = true;
        assert!(sessions.public.state.read().await.connected);
        assert!(!sessions.private.state.read().await.connected);
    }

    #[tokio::test]
    async fn send_queue_applies_backpressure_at_capacity() {
        let session = Session::new();
        for _ in 0..SEND_QUEUE_CAPACITY {
            session
                .send_tx
                .try_send(Message::Text("x".to_string()))
                .unwrap();
        }
        assert!(session
            .send_tx
            .try_send(Message::Text("overflow".to_string()))
            .is_err());
    }
}
