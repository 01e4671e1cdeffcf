//! Request Correlation
//!
//! Single responsibility: own the send half of the transport, hand out request
//! IDs, and route each reply to the caller that is waiting for it.
//!
//! # The Pending Table
//!
//! ```text
//!  request()                                   dispatch()
//!     │                                            │
//!     ├─ id = next_id++          ┌──────────┐      ├─ decode
//!     ├─ pending[id] = tx  ────► │ pending  │ ◄────┼─ tx = pending.remove(id)
//!     └─ sink.send_text()        └──────────┘      └─ tx.send(outcome)
//! ```
//!
//! An entry leaves the table exactly once, when a reply with its ID arrives.
//! There is no timeout: a request the server never answers stays in the table
//! for as long as the connection lives.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use super::events::EventEmitter;
use super::protocol::{decode_inbound, encode_request, Inbound, Reply, ReplyStatus};
use super::transport::TransportSink;
use crate::error::ObsError;

type ReplySender = oneshot::Sender<Result<Value, ObsError>>;

/// The single logical session to the server.
pub struct Connection {
    /// Send half of the transport
    sink: Mutex<Box<dyn TransportSink>>,
    /// Request ID counter
    next_id: AtomicU64,
    /// Pending reply channels, keyed by request ID
    pending: Mutex<HashMap<String, ReplySender>>,
}

impl Connection {
    pub fn new(sink: Box<dyn TransportSink>) -> Self {
        Self {
            sink: Mutex::new(sink),
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Register and transmit one request.
    ///
    /// Returns once the request is on the wire; await the returned
    /// [`PendingReply`] for the server's answer. The sink stays locked from ID
    /// allocation through the write, so IDs reach the wire in order.
    pub async fn request(
        &self,
        request_type: &str,
        params: Map<String, Value>,
    ) -> Result<PendingReply, ObsError> {
        let mut sink = self.sink.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let text = encode_request(&id, request_type, params)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), reply_tx);

        debug!(id = %id, request_type = %request_type, "Sending request");

        if let Err(e) = sink.send_text(text).await {
            // Never reached the wire, so nothing can answer it
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        Ok(PendingReply { id, rx: reply_rx })
    }

    /// Route one inbound message.
    ///
    /// Replies complete their pending request; notifications go to the
    /// listeners for their `update-type`. Anything else is dropped.
    pub async fn dispatch(&self, events: &EventEmitter, text: &str) {
        match decode_inbound(text) {
            Some(Inbound::Reply(reply)) => self.complete(reply).await,
            Some(Inbound::Notification(notification)) => {
                events.emit_update(&notification.update_type, &notification.payload);
            }
            None => {}
        }
    }

    async fn complete(&self, reply: Reply) {
        let reply_tx = self.pending.lock().await.remove(&reply.message_id);
        if let Some(reply_tx) = reply_tx {
            let outcome = match reply.status {
                ReplyStatus::Ok => Ok(reply.payload),
                ReplyStatus::Error(text) => Err(ObsError::Request(text)),
                ReplyStatus::Unrecognized(status) => {
                    debug!(id = %reply.message_id, status = %status, "Reply with unrecognized status");
                    Err(ObsError::UnrecognizedStatus(status))
                }
            };
            // Caller may have stopped waiting
            let _ = reply_tx.send(outcome);
        }
    }

    /// Close the send half. Pending requests are left as they are.
    pub async fn close(&self) -> Result<(), ObsError> {
        self.sink.lock().await.close().await
    }

    /// Number of requests still waiting for a reply.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// A request on the wire, waiting for its reply.
///
/// Resolves to the full reply payload on `status: "ok"`, or to
/// [`ObsError::Request`] carrying the server's error text.
/// Resolves to [`ObsError::ConnectionClosed`] only if the client that owns
/// the pending table has been dropped.
#[derive(Debug)]
pub struct PendingReply {
    id: String,
    rx: oneshot::Receiver<Result<Value, ObsError>>,
}

impl PendingReply {
    /// The request ID assigned to this call.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingReply {
    type Output = Result<Value, ObsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(ObsError::ConnectionClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::transport::{channel_transport, Transport};
    use serde_json::json;

    fn connection() -> (Connection, crate::obs::transport::TransportPeer) {
        let (transport, peer) = channel_transport();
        let (sink, _stream) = transport.split();
        (Connection::new(sink), peer)
    }

    #[tokio::test]
    async fn test_ids_start_at_zero_and_increase() {
        let (conn, mut peer) = connection();

        for expected in ["0", "1", "2"] {
            let pending = conn.request("GetVersion", Map::new()).await.unwrap();
            assert_eq!(pending.id(), expected);

            let sent: Value = serde_json::from_str(&peer.next_outgoing().await.unwrap()).unwrap();
            assert_eq!(sent["message-id"], expected);
            assert_eq!(sent["request-type"], "GetVersion");
        }
        assert_eq!(conn.pending_count().await, 3);
    }

    #[tokio::test]
    async fn test_reply_removes_entry_and_resolves() {
        let (conn, _peer) = connection();
        let events = EventEmitter::new();

        let pending = conn.request("GetVersion", Map::new()).await.unwrap();
        conn.dispatch(
            &events,
            &json!({"message-id": "0", "status": "ok", "version": 1.1}).to_string(),
        )
        .await;

        assert_eq!(conn.pending_count().await, 0);
        let reply = pending.await.unwrap();
        assert_eq!(reply["version"], 1.1);
    }

    #[tokio::test]
    async fn test_error_reply_rejects_with_server_text() {
        let (conn, _peer) = connection();
        let events = EventEmitter::new();

        let pending = conn.request("SetMute", Map::new()).await.unwrap();
        conn.dispatch(
            &events,
            &json!({"message-id": "0", "status": "error", "error": "specified source doesn't exist"})
                .to_string(),
        )
        .await;

        match pending.await {
            Err(ObsError::Request(text)) => assert_eq!(text, "specified source doesn't exist"),
            other => panic!("expected request error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unrecognized_status_fails_instead_of_succeeding() {
        let (conn, _peer) = connection();
        let events = EventEmitter::new();

        let pending = conn.request("GetVersion", Map::new()).await.unwrap();
        conn.dispatch(&events, r#"{"message-id":"0","status":"maybe"}"#).await;

        assert_eq!(conn.pending_count().await, 0);
        assert!(matches!(pending.await, Err(ObsError::UnrecognizedStatus(s)) if s == "maybe"));
    }

    #[tokio::test]
    async fn test_failed_write_unregisters_request() {
        let (conn, peer) = connection();
        drop(peer);

        let result = conn.request("GetVersion", Map::new()).await;
        assert!(matches!(result, Err(ObsError::Transport(_))));
        assert_eq!(conn.pending_count().await, 0);
    }
}
