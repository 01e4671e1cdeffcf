//! Transport Layer
//!
//! Single responsibility: move serialized text messages to and from the server
//! and report when the channel opens and closes.
//! No knowledge of request correlation, authentication, or notifications.
//!
//! Two implementations ship with the crate:
//!
//! - [`WebSocketTransport`] talks to a real obs-websocket server.
//! - [`ChannelTransport`] is an in-process pair driven by a [`TransportPeer`],
//!   used by the integration tests and by embedders that already own a socket.

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::error::ObsError;

/// Type alias for the WebSocket send half
pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;

/// Type alias for the WebSocket receive half
pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Something that happened on the physical connection, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is open and ready to carry messages.
    Opened,
    /// One complete text message from the server.
    Message(String),
    /// The channel is gone. Emitted at most once; the stream ends after it.
    Closed,
}

/// Send half of a transport.
#[async_trait]
pub trait TransportSink: Send + 'static {
    /// Transmit one already-serialized message.
    async fn send_text(&mut self, text: String) -> Result<(), ObsError>;

    /// Start closing the connection. The stream half yields
    /// [`TransportEvent::Closed`] once the close completes.
    async fn close(&mut self) -> Result<(), ObsError>;
}

/// Receive half of a transport.
#[async_trait]
pub trait TransportStream: Send + 'static {
    /// Next lifecycle event or message. `None` once the stream is exhausted.
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

/// A connection that can be split into independently owned halves.
pub trait Transport: Send + 'static {
    fn split(self) -> (Box<dyn TransportSink>, Box<dyn TransportStream>);
}

// ============================================================================
// WebSocket
// ============================================================================

/// A connected WebSocket transport.
///
/// Can only be constructed via [`WebSocketTransport::connect`], so holding one
/// means the WebSocket handshake already succeeded. The first event its stream
/// half produces is [`TransportEvent::Opened`].
pub struct WebSocketTransport {
    sink: WsSink,
    stream: WsStream,
}

impl WebSocketTransport {
    /// Connect to a WebSocket endpoint such as `ws://localhost:4444`.
    pub async fn connect(url: &str) -> Result<Self, ObsError> {
        debug!(url = %url, "Connecting to WebSocket");

        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| ObsError::Connection(format!("WebSocket connect failed: {}", e)))?;

        let (sink, stream) = ws.split();

        info!(url = %url, "WebSocket connected");
        Ok(Self { sink, stream })
    }
}

impl Transport for WebSocketTransport {
    fn split(self) -> (Box<dyn TransportSink>, Box<dyn TransportStream>) {
        (
            Box::new(WebSocketSink { sink: self.sink }),
            Box::new(WebSocketEvents {
                stream: self.stream,
                phase: Phase::Connected,
            }),
        )
    }
}

struct WebSocketSink {
    sink: WsSink,
}

#[async_trait]
impl TransportSink for WebSocketSink {
    async fn send_text(&mut self, text: String) -> Result<(), ObsError> {
        self.sink
            .send(Message::Text(text))
            .await
            .map_err(|e| ObsError::Transport(format!("Failed to send: {}", e)))
    }

    async fn close(&mut self) -> Result<(), ObsError> {
        self.sink
            .close()
            .await
            .map_err(|e| ObsError::Transport(format!("Failed to close: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Connected, `Opened` not yet reported
    Connected,
    Open,
    Done,
}

struct WebSocketEvents {
    stream: WsStream,
    phase: Phase,
}

#[async_trait]
impl TransportStream for WebSocketEvents {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.phase {
            Phase::Connected => {
                self.phase = Phase::Open;
                return Some(TransportEvent::Opened);
            }
            Phase::Done => return None,
            Phase::Open => {}
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(TransportEvent::Message(text)),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return Some(TransportEvent::Message(text)),
                    Err(_) => continue,
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "Server closed connection");
                    break;
                }
                // Ping/pong handled by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                None => break,
            }
        }

        self.phase = Phase::Done;
        Some(TransportEvent::Closed)
    }
}

// ============================================================================
// In-process channel
// ============================================================================

/// Create an in-process transport and the peer that drives it.
///
/// Nothing happens until the peer calls [`TransportPeer::open`]; this lets a
/// caller register listeners before the authentication handshake starts.
pub fn channel_transport() -> (ChannelTransport, TransportPeer) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

    let transport = ChannelTransport {
        events_tx: events_tx.downgrade(),
        events_rx,
        outgoing_tx,
    };
    let peer = TransportPeer {
        events_tx,
        outgoing_rx,
    };
    (transport, peer)
}

/// Client side of an in-process transport.
pub struct ChannelTransport {
    events_tx: mpsc::WeakUnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    outgoing_tx: mpsc::UnboundedSender<String>,
}

impl Transport for ChannelTransport {
    fn split(self) -> (Box<dyn TransportSink>, Box<dyn TransportStream>) {
        (
            Box::new(ChannelSink {
                events_tx: self.events_tx,
                outgoing_tx: self.outgoing_tx,
                closed: false,
            }),
            Box::new(ChannelEvents {
                events_rx: self.events_rx,
                closed: false,
            }),
        )
    }
}

struct ChannelSink {
    events_tx: mpsc::WeakUnboundedSender<TransportEvent>,
    outgoing_tx: mpsc::UnboundedSender<String>,
    closed: bool,
}

#[async_trait]
impl TransportSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> Result<(), ObsError> {
        if self.closed {
            return Err(ObsError::Transport("Channel closed".into()));
        }
        self.outgoing_tx
            .send(text)
            .map_err(|_| ObsError::Transport("Peer dropped".into()))
    }

    async fn close(&mut self) -> Result<(), ObsError> {
        if !self.closed {
            self.closed = true;
            if let Some(tx) = self.events_tx.upgrade() {
                let _ = tx.send(TransportEvent::Closed);
            }
        }
        Ok(())
    }
}

struct ChannelEvents {
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    closed: bool,
}

#[async_trait]
impl TransportStream for ChannelEvents {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        match self.events_rx.recv().await {
            Some(TransportEvent::Closed) | None => {
                self.closed = true;
                Some(TransportEvent::Closed)
            }
            Some(event) => Some(event),
        }
    }
}

/// Server side of an in-process transport.
///
/// Dropping the peer closes the channel.
pub struct TransportPeer {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    outgoing_rx: mpsc::UnboundedReceiver<String>,
}

impl TransportPeer {
    /// Report the channel as open. Returns false if the client side is gone.
    pub fn open(&self) -> bool {
        self.events_tx.send(TransportEvent::Opened).is_ok()
    }

    /// Deliver one raw text message to the client.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.events_tx
            .send(TransportEvent::Message(text.into()))
            .is_ok()
    }

    /// Deliver one JSON value to the client.
    pub fn push_json(&self, value: &serde_json::Value) -> bool {
        self.push(value.to_string())
    }

    /// Close the channel from the server side.
    pub fn close(&self) -> bool {
        self.events_tx.send(TransportEvent::Closed).is_ok()
    }

    /// Wait for the next message written by the client.
    pub async fn next_outgoing(&mut self) -> Option<String> {
        self.outgoing_rx.recv().await
    }

    /// Next message written by the client, if one is already queued.
    pub fn try_next_outgoing(&mut self) -> Option<String> {
        self.outgoing_rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_carries_both_directions() {
        let (transport, mut peer) = channel_transport();
        let (mut sink, mut stream) = transport.split();

        assert!(peer.open());
        assert!(peer.push("{\"a\":1}"));
        assert_eq!(stream.next_event().await, Some(TransportEvent::Opened));
        assert_eq!(
            stream.next_event().await,
            Some(TransportEvent::Message("{\"a\":1}".into()))
        );

        sink.send_text("hello".into()).await.unwrap();
        assert_eq!(peer.next_outgoing().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_sink_close_ends_stream_once() {
        let (transport, mut peer) = channel_transport();
        let (mut sink, mut stream) = transport.split();

        sink.close().await.unwrap();
        assert_eq!(stream.next_event().await, Some(TransportEvent::Closed));
        assert_eq!(stream.next_event().await, None);

        assert!(sink.send_text("late".into()).await.is_err());
        assert!(peer.try_next_outgoing().is_none());
    }

    #[tokio::test]
    async fn test_dropping_peer_closes_stream() {
        let (transport, peer) = channel_transport();
        let (_sink, mut stream) = transport.split();

        drop(peer);
        assert_eq!(stream.next_event().await, Some(TransportEvent::Closed));
        assert_eq!(stream.next_event().await, None);
    }
}
