//! Remote control port.
//!
//! Features:
//! - Request/response correlation with generated ids over any [`Transport`]
//! - Readiness gate: calls can wait until the peer announced its handlers
//! - Handler registry dispatching each incoming request on its own task
//! - Symmetric close that promptly rejects every in-flight call, bounded
//!   even against a peer that stopped reading
//!
//! A [`MessagePort`] is one endpoint of the pipe. The player side registers
//! handlers and announces readiness; the controller side waits for
//! [`MessagePort::ready`] and then issues calls. Both sides may do both;
//! the port itself is symmetric.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot, watch, Mutex, RwLock};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub mod message;
pub mod transport;

pub use message::{
    Envelope, Message, Reply, PORT_CLOSE_EVENT, PORT_READY_EVENT, TITLE_CHANGE_EVENT,
};
pub use transport::{channel_pair, ChannelTransport, Transport, TransportError};

/// How long [`MessagePort::ready`] waits before giving up.
pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on the courtesy close notification. A peer that stopped reading
/// must not wedge [`MessagePort::close`].
const CLOSE_NOTIFY_TIMEOUT: Duration = Duration::from_millis(250);

/// Port lifecycle. Transitions are one-way: `Opening` → `Ready` → `Closed`
/// (with `Ready` skipped when the port closes first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Open, peer has not announced readiness yet.
    Opening,
    /// Peer announced readiness; calls will be handled.
    Ready,
    /// Closed; every call fails immediately.
    Closed,
}

/// Port-level failure.
#[derive(Debug, Error)]
pub enum PortError {
    /// The port is closed; in-flight calls are rejected with this.
    #[error("port closed")]
    Closed,
    /// The peer did not announce readiness in time.
    #[error("timed out waiting for port to become ready")]
    ReadyTimeout,
    /// The peer's handler answered with an error.
    #[error("remote error: {0}")]
    Remote(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Error type a handler may return; its `Display` crosses the wire.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// One incoming request as seen by a handler.
#[derive(Debug)]
pub struct Invocation {
    pub method: String,
    pub args: Vec<Value>,
    pub payloads: Vec<Bytes>,
}

impl Invocation {
    /// Positional argument, `Null` when absent.
    #[must_use]
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Null)
    }
}

/// A notification received from the peer.
#[derive(Debug, Clone)]
pub struct Notification {
    pub event: String,
    pub data: Option<Value>,
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, HandlerError>> + Send>>;
type Handler = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

struct PortInner {
    transport: Arc<dyn Transport>,
    pending: Mutex<HashMap<String, oneshot::Sender<Result<Reply, PortError>>>>,
    handlers: RwLock<HashMap<String, Handler>>,
    state: watch::Sender<PortState>,
    notifications: broadcast::Sender<Notification>,
}

/// One endpoint of a control port.
///
/// Cloning yields another handle to the same endpoint.
#[derive(Clone)]
pub struct MessagePort {
    inner: Arc<PortInner>,
}

impl MessagePort {
    /// Open a port over a transport and start reading from it.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn open(transport: impl Transport + 'static) -> Self {
        Self::open_shared(Arc::new(transport))
    }

    /// Open a port over an already-shared transport.
    #[must_use]
    pub fn open_shared(transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(PortState::Opening);
        let (notifications, _) = broadcast::channel(32);
        let inner = Arc::new(PortInner {
            transport,
            pending: Mutex::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            state,
            notifications,
        });
        tokio::spawn(run(Arc::clone(&inner)));
        Self { inner }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PortState {
        *self.inner.state.borrow()
    }

    /// Register a handler for a verb. A later registration for the same
    /// verb replaces the earlier one.
    pub async fn handle<F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |invocation| Box::pin(handler(invocation)));
        self.inner
            .handlers
            .write()
            .await
            .insert(method.into(), handler);
    }

    /// Verbs currently registered, unordered.
    pub async fn methods(&self) -> Vec<String> {
        self.inner.handlers.read().await.keys().cloned().collect()
    }

    /// Wait until the peer announced readiness, up to [`READY_TIMEOUT`].
    pub async fn ready(&self) -> Result<(), PortError> {
        self.ready_within(READY_TIMEOUT).await
    }

    /// Wait until the peer announced readiness, up to `timeout`.
    pub async fn ready_within(&self, timeout: Duration) -> Result<(), PortError> {
        let mut state = self.inner.state.subscribe();
        let settled = state.wait_for(|s| *s != PortState::Opening);
        // Copy out of the watch guard before `state` drops.
        let settled = match tokio::time::timeout(timeout, settled).await {
            Err(_) => return Err(PortError::ReadyTimeout),
            Ok(Err(_)) => return Err(PortError::Closed),
            Ok(Ok(snapshot)) => *snapshot,
        };
        match settled {
            PortState::Ready => Ok(()),
            _ => Err(PortError::Closed),
        }
    }

    /// Resolves once the port reaches `Closed`.
    pub async fn closed(&self) {
        let mut state = self.inner.state.subscribe();
        let _ = state.wait_for(|s| *s == PortState::Closed).await;
    }

    /// Call a verb on the peer and wait for its reply.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Reply, PortError> {
        self.call_with_payloads(method, args, Vec::new()).await
    }

    /// Call a verb, shipping binary payloads alongside the request.
    pub async fn call_with_payloads(
        &self,
        method: &str,
        args: Vec<Value>,
        payloads: Vec<Bytes>,
    ) -> Result<Reply, PortError> {
        if self.state() == PortState::Closed {
            return Err(PortError::Closed);
        }
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id.clone(), tx);
        // Lost race with close(): the drain already ran, so fail like the
        // rest of the pending set instead of waiting forever.
        if self.state() == PortState::Closed {
            self.inner.pending.lock().await.remove(&id);
            return Err(PortError::Closed);
        }
        let envelope = Envelope::with_payloads(Message::request(&id, method, args), payloads);
        // A full transport with a stalled reader would park the send forever;
        // racing it against the close signal keeps callers releasable.
        let mut state = self.inner.state.subscribe();
        tokio::select! {
            sent = self.inner.transport.send(envelope) => {
                if let Err(e) = sent {
                    self.inner.pending.lock().await.remove(&id);
                    return Err(e.into());
                }
            }
            () = async { let _ = state.wait_for(|s| *s == PortState::Closed).await; } => {
                self.inner.pending.lock().await.remove(&id);
                return Err(PortError::Closed);
            }
        }
        rx.await.map_err(|_| PortError::Closed)?
    }

    /// Send a fire-and-forget notification to the peer.
    pub async fn notify(&self, event: &str, data: Option<Value>) -> Result<(), PortError> {
        self.inner
            .transport
            .send(Envelope::plain(Message::notify(event, data)))
            .await
            .map_err(Into::into)
    }

    /// Announce to the peer that this side's handlers are bound.
    pub async fn announce_ready(&self) -> Result<(), PortError> {
        self.notify(PORT_READY_EVENT, None).await
    }

    /// Subscribe to notifications from the peer.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    /// Close the port. Idempotent; every pending call is rejected with
    /// [`PortError::Closed`] and later calls fail immediately. Returns
    /// promptly even when the peer stopped reading its transport.
    pub async fn close(&self) {
        self.inner.shutdown().await;
    }
}

impl PortInner {
    async fn shutdown(&self) {
        let prev = self.state.send_replace(PortState::Closed);
        if prev != PortState::Closed {
            // Best effort, bounded: a live peer tears down promptly instead
            // of waiting for transport EOF, while a peer that stopped
            // reading a full transport cannot stall the close.
            let goodbye = self
                .transport
                .send(Envelope::plain(Message::notify(PORT_CLOSE_EVENT, None)));
            if tokio::time::timeout(CLOSE_NOTIFY_TIMEOUT, goodbye).await.is_err() {
                debug!("peer not reading, close notify dropped");
            }
        }
        let drained: Vec<_> = {
            let mut pending = self.pending.lock().await;
            pending.drain().collect()
        };
        for (id, tx) in drained {
            debug!(%id, "rejecting pending call on close");
            let _ = tx.send(Err(PortError::Closed));
        }
        if prev != PortState::Closed {
            debug!("port closed");
        }
    }
}

/// Reader loop: one per port, exits on transport EOF or local close.
async fn run(inner: Arc<PortInner>) {
    let mut state = inner.state.subscribe();
    loop {
        tokio::select! {
            envelope = inner.transport.recv() => match envelope {
                Some(envelope) => dispatch(&inner, envelope).await,
                None => {
                    debug!("transport ended");
                    break;
                }
            },
            // The watch guard must not leak into the select output; the
            // loop future has to stay `Send` for the spawn in `open_shared`.
            () = async { let _ = state.wait_for(|s| *s == PortState::Closed).await; } => break,
        }
    }
    inner.shutdown().await;
}

async fn dispatch(inner: &Arc<PortInner>, envelope: Envelope) {
    let Envelope { message, payloads } = envelope;
    match message {
        Message::Request { id, method, args } => {
            let handler = inner.handlers.read().await.get(&method).cloned();
            match handler {
                Some(handler) => {
                    let inner = Arc::clone(inner);
                    let invocation = Invocation {
                        method: method.clone(),
                        args,
                        payloads,
                    };
                    tokio::spawn(async move {
                        let response = match handler(invocation).await {
                            Ok(reply) => {
                                Envelope::with_payloads(Message::ok(&id, reply.value), reply.payloads)
                            }
                            Err(e) => {
                                error!(%method, error = %e, "handler failed");
                                Envelope::plain(Message::err(&id, e.to_string()))
                            }
                        };
                        if let Err(e) = inner.transport.send(response).await {
                            debug!(error = %e, "response dropped, transport closed");
                        }
                    });
                }
                None => {
                    error!(%method, "no handler registered");
                    let response = Envelope::plain(Message::err(&id, format!("unknown method: {method}")));
                    if let Err(e) = inner.transport.send(response).await {
                        debug!(error = %e, "error response dropped, transport closed");
                    }
                }
            }
        }
        Message::Response { id, value, error } => {
            let waiter = inner.pending.lock().await.remove(&id);
            match waiter {
                Some(tx) => {
                    let result = match error {
                        Some(remote) => Err(PortError::Remote(remote)),
                        None => Ok(Reply { value, payloads }),
                    };
                    let _ = tx.send(result);
                }
                None => warn!(%id, "response for unknown or already-settled call"),
            }
        }
        Message::Notify { event, data } => {
            if event == PORT_READY_EVENT {
                inner.state.send_if_modified(|state| {
                    if *state == PortState::Opening {
                        *state = PortState::Ready;
                        true
                    } else {
                        false
                    }
                });
            }
            let peer_closed = event == PORT_CLOSE_EVENT;
            let _ = inner.notifications.send(Notification { event, data });
            if peer_closed {
                debug!("peer closed the port");
                inner.shutdown().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn port_pair() -> (MessagePort, MessagePort) {
        let (a, b) = channel_pair(8);
        (MessagePort::open(a), MessagePort::open(b))
    }

    #[tokio::test]
    async fn call_round_trips_value() {
        let (controller, player) = port_pair();
        player
            .handle("getCurrentTime", |_inv| async {
                Ok(Reply::value(json!(42.5)))
            })
            .await;
        let reply = controller.call("getCurrentTime", vec![]).await.unwrap();
        assert_eq!(reply.value, Some(json!(42.5)));
    }

    #[tokio::test]
    async fn handler_sees_args_and_missing_args_read_as_null() {
        let (controller, player) = port_pair();
        player
            .handle("setCurrentTime", |inv: Invocation| async move {
                assert_eq!(inv.arg(0), json!(42.5));
                assert_eq!(inv.arg(1), Value::Null);
                Ok(Reply::none())
            })
            .await;
        let reply = controller
            .call("setCurrentTime", vec![json!(42.5)])
            .await
            .unwrap();
        assert_eq!(reply.value, None);
    }

    #[tokio::test]
    async fn unknown_method_surfaces_remote_error() {
        let (controller, _player) = port_pair();
        let err = controller.call("danceForMe", vec![]).await.unwrap_err();
        match err {
            PortError::Remote(message) => assert!(message.contains("unknown method")),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_error_crosses_as_remote_error() {
        let (controller, player) = port_pair();
        player
            .handle("screenshot", |_inv| async {
                Err::<Reply, HandlerError>("target is not a video".into())
            })
            .await;
        let err = controller.call("screenshot", vec![]).await.unwrap_err();
        assert!(matches!(err, PortError::Remote(m) if m == "target is not a video"));
    }

    #[tokio::test]
    async fn payloads_travel_both_ways() {
        let (controller, player) = port_pair();
        player
            .handle("frame", |inv: Invocation| async move {
                assert_eq!(inv.payloads.len(), 1);
                Ok(Reply::with_payloads(
                    json!({"mime": "image/png"}),
                    vec![Bytes::from_static(b"\x89PNG")],
                ))
            })
            .await;
        let reply = controller
            .call_with_payloads("frame", vec![], vec![Bytes::from_static(b"seed")])
            .await
            .unwrap();
        assert_eq!(reply.payloads, vec![Bytes::from_static(b"\x89PNG")]);
    }

    #[tokio::test]
    async fn ready_gate_opens_on_peer_announcement() {
        let (controller, player) = port_pair();
        assert_eq!(controller.state(), PortState::Opening);
        player.announce_ready().await.unwrap();
        controller
            .ready_within(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(controller.state(), PortState::Ready);
    }

    #[tokio::test]
    async fn ready_times_out_without_announcement() {
        let (controller, _player) = port_pair();
        let err = controller
            .ready_within(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::ReadyTimeout));
    }

    #[tokio::test]
    async fn close_rejects_pending_calls_promptly() {
        let (controller, player) = port_pair();
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::channel::<()>(8);
        player
            .handle("hang", move |_inv| {
                let seen = seen_tx.clone();
                async move {
                    let _ = seen.send(()).await;
                    std::future::pending::<()>().await;
                    Ok(Reply::none())
                }
            })
            .await;

        let calls: Vec<_> = (0..5)
            .map(|_| {
                let controller = controller.clone();
                tokio::spawn(async move { controller.call("hang", vec![]).await })
            })
            .collect();
        // Make sure every request is in flight before closing.
        for _ in 0..5 {
            seen_rx.recv().await.unwrap();
        }
        controller.close().await;

        for call in calls {
            let result = tokio::time::timeout(Duration::from_millis(200), call)
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(result, Err(PortError::Closed)));
        }
        assert!(matches!(
            controller.call("hang", vec![]).await,
            Err(PortError::Closed)
        ));
    }

    #[tokio::test]
    async fn close_returns_promptly_when_peer_stops_reading() {
        // Tiny buffer and a far end that stays alive but never reads: the
        // in-flight request fills the only slot, so nothing else fits.
        let (near, _far) = channel_pair(1);
        let port = MessagePort::open(near);

        let stuck = {
            let port = port.clone();
            tokio::spawn(async move { port.call("play", vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(1), port.close())
            .await
            .expect("close must not wait on a stalled peer");

        let result = tokio::time::timeout(Duration::from_millis(200), stuck)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(PortError::Closed)));
    }

    #[tokio::test]
    async fn close_releases_callers_parked_in_a_full_send() {
        let (near, _far) = channel_pair(1);
        let port = MessagePort::open(near);

        // The first call occupies the only buffer slot; the second parks
        // inside its transport send.
        let first = {
            let port = port.clone();
            tokio::spawn(async move { port.call("play", vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = {
            let port = port.clone();
            tokio::spawn(async move { port.call("pause", vec![]).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(1), port.close())
            .await
            .expect("close must not wait on a stalled peer");

        for call in [first, second] {
            let result = tokio::time::timeout(Duration::from_millis(500), call)
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(result, Err(PortError::Closed)));
        }
    }

    #[tokio::test]
    async fn peer_teardown_closes_this_side() {
        let (controller, player) = port_pair();
        player.close().await;
        controller.closed().await;
        assert_eq!(controller.state(), PortState::Closed);
    }

    #[tokio::test]
    async fn transport_eof_closes_the_port() {
        let (a, b) = channel_pair(8);
        let port = MessagePort::open(a);
        drop(b);
        port.closed().await;
        assert!(matches!(port.call("play", vec![]).await, Err(PortError::Closed)));
    }

    #[tokio::test]
    async fn stray_response_is_ignored() {
        let (a, b) = channel_pair(8);
        let controller = MessagePort::open(a);
        b.send(Envelope::plain(Message::ok("no-such-id", Some(json!(1)))))
            .await
            .unwrap();
        // Port keeps working afterwards.
        b.send(Envelope::plain(Message::notify(PORT_READY_EVENT, None)))
            .await
            .unwrap();
        controller
            .ready_within(Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn notifications_reach_subscribers() {
        let (controller, player) = port_pair();
        let mut events = controller.notifications();
        player
            .notify(TITLE_CHANGE_EVENT, Some(json!("Big Buck Bunny")))
            .await
            .unwrap();
        let note = events.recv().await.unwrap();
        assert_eq!(note.event, TITLE_CHANGE_EVENT);
        assert_eq!(note.data, Some(json!("Big Buck Bunny")));
    }

    #[tokio::test]
    async fn requests_are_handled_concurrently() {
        let (controller, player) = port_pair();
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let gate_tx = StdMutex::new(Some(gate_tx));
        player
            .handle("first", move |_inv| {
                let tx = gate_tx.lock().unwrap().take();
                async move {
                    // Replies only after "second" has been answered.
                    if let Some(tx) = tx {
                        let _ = tx.send(());
                    }
                    std::future::pending::<()>().await;
                    Ok(Reply::none())
                }
            })
            .await;
        player
            .handle("second", |_inv| async { Ok(Reply::value(json!(2))) })
            .await;

        let slow = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.call("first", vec![]).await })
        };
        gate_rx.await.unwrap();
        // A blocked handler must not wedge the dispatch loop.
        let reply = tokio::time::timeout(
            Duration::from_millis(500),
            controller.call("second", vec![]),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(reply.value, Some(json!(2)));
        slow.abort();
    }
}
