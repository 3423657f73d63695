//! Transport abstraction under the control port.
//!
//! A [`Transport`] is an untyped duplex pipe for [`Envelope`]s. The port
//! layer owns correlation, lifecycle, and dispatch; a transport only moves
//! envelopes and reports end-of-stream. [`channel_pair`] builds the
//! in-process implementation used by player sessions and tests.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use super::message::Envelope;

/// Transport-level failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer is gone; the envelope was not delivered.
    #[error("transport closed")]
    Closed,
}

/// An ordered, bidirectional envelope pipe.
///
/// `recv` returning `None` means the peer hung up; the port treats that
/// as a close. Delivery order is preserved per direction, but no ordering
/// holds across directions.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
    async fn recv(&self) -> Option<Envelope>;
}

/// In-process transport over a pair of bounded channels.
pub struct ChannelTransport {
    tx: mpsc::Sender<Envelope>,
    rx: Mutex<mpsc::Receiver<Envelope>>,
}

/// Build two connected endpoints; what one sends, the other receives.
#[must_use]
pub fn channel_pair(capacity: usize) -> (ChannelTransport, ChannelTransport) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);
    (
        ChannelTransport {
            tx: a_tx,
            rx: Mutex::new(b_rx),
        },
        ChannelTransport {
            tx: b_tx,
            rx: Mutex::new(a_rx),
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&self) -> Option<Envelope> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::message::Message;

    #[tokio::test]
    async fn pair_delivers_in_order_both_ways() {
        let (a, b) = channel_pair(8);
        a.send(Message::notify("first", None).into()).await.unwrap();
        a.send(Message::notify("second", None).into()).await.unwrap();
        b.send(Message::notify("reply", None).into()).await.unwrap();

        let got = b.recv().await.unwrap();
        assert!(matches!(got.message, Message::Notify { event, .. } if event == "first"));
        let got = b.recv().await.unwrap();
        assert!(matches!(got.message, Message::Notify { event, .. } if event == "second"));
        let got = a.recv().await.unwrap();
        assert!(matches!(got.message, Message::Notify { event, .. } if event == "reply"));
    }

    #[tokio::test]
    async fn dropped_peer_surfaces_as_eof_and_send_error() {
        let (a, b) = channel_pair(1);
        drop(b);
        assert!(a.recv().await.is_none());
        let err = a.send(Message::notify("x", None).into()).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }
}
