//! obs-websocket Client
//!
//! Single responsibility: drive a transport through its lifecycle and expose
//! the request/notification API to callers.
//!
//! # Lifecycle
//!
//! ```text
//!  Connecting ──Opened──► Authenticating ──ok──► Open ──Closed──► Closed
//!                               │
//!                               └──failed──► AuthFailed
//! ```
//!
//! The client raises [`Lifecycle::Open`] only after the authentication
//! handshake succeeded. When the transport closes it raises
//! [`Lifecycle::Close`]; requests still waiting at that point are neither
//! resolved nor rejected, so callers should treat `Close` as cancellation.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::auth::{AuthChallenge, Password, AUTHENTICATE, GET_AUTH_REQUIRED};
use super::events::{EventEmitter, Lifecycle};
use super::protocol::to_params;
use super::session::{Connection, PendingReply};
use super::transport::{Transport, TransportEvent, TransportStream, WebSocketTransport};
use crate::error::ObsError;

/// Where the client is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the transport to open
    Connecting,
    /// Handshake in progress
    Authenticating,
    /// Authenticated and usable
    Open,
    /// Handshake failed; the transport may still be open but is unusable
    AuthFailed(String),
    Closed,
}

struct Inner {
    connection: Connection,
    events: EventEmitter,
    state: watch::Sender<ConnectionState>,
}

/// A client for one obs-websocket connection.
///
/// # Guarantees
///
/// - Replies are matched to callers strictly by request ID
/// - Notifications reach listeners in the order the server sent them
/// - `Open` fires at most once, and only after authentication
///
/// # Non-Guarantees
///
/// - No reconnection; a closed client stays closed
/// - No timeouts; wrap calls in `tokio::time::timeout` if needed
///
/// Dropping the client stops its dispatch task. To share it between tasks,
/// wrap it in an `Arc`.
pub struct ObsClient {
    inner: Arc<Inner>,
    /// Handle to the dispatch task
    dispatch_task: tokio::task::JoinHandle<()>,
}

impl ObsClient {
    /// Connect to an obs-websocket server and wait for authentication.
    ///
    /// Only returns a client that has reached [`ConnectionState::Open`].
    pub async fn connect(url: &str, password: impl Into<Password>) -> Result<Self, ObsError> {
        info!(url = %url, "Connecting to obs-websocket");

        let transport = WebSocketTransport::connect(url).await?;
        let client = Self::new(transport, password);
        client.ready().await?;

        info!(url = %url, "obs-websocket client ready");
        Ok(client)
    }

    /// Take ownership of a transport and start dispatching its events.
    ///
    /// Must be called from within a tokio runtime. The handshake starts as
    /// soon as the transport reports `Opened`; use [`ObsClient::with_events`]
    /// to have listeners in place before that can happen.
    pub fn new<T: Transport>(transport: T, password: impl Into<Password>) -> Self {
        Self::with_events(transport, password, EventEmitter::new())
    }

    /// Like [`ObsClient::new`], with listeners registered up front.
    pub fn with_events<T: Transport>(
        transport: T,
        password: impl Into<Password>,
        events: EventEmitter,
    ) -> Self {
        let (sink, stream) = transport.split();
        let (state, _) = watch::channel(ConnectionState::Connecting);

        let inner = Arc::new(Inner {
            connection: Connection::new(sink),
            events,
            state,
        });

        let dispatch_task = tokio::spawn(dispatch_loop(stream, Arc::clone(&inner), password.into()));

        Self {
            inner,
            dispatch_task,
        }
    }

    /// Wait until the handshake has settled.
    ///
    /// # Errors
    /// - [`ObsError::Auth`] if authentication failed
    /// - [`ObsError::ConnectionClosed`] if the transport closed first
    pub async fn ready(&self) -> Result<(), ObsError> {
        let mut state_rx = self.inner.state.subscribe();
        let state = state_rx
            .wait_for(|s| !matches!(s, ConnectionState::Connecting | ConnectionState::Authenticating))
            .await
            .map_err(|_| ObsError::ConnectionClosed)?
            .clone();

        match state {
            ConnectionState::Open => Ok(()),
            ConnectionState::AuthFailed(reason) => Err(ObsError::Auth(reason)),
            ConnectionState::Connecting
            | ConnectionState::Authenticating
            | ConnectionState::Closed => Err(ObsError::ConnectionClosed),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Register a listener for one of the client's lifecycle events.
    pub fn on_lifecycle<F>(&self, event: Lifecycle, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.events.on_lifecycle(event, listener);
    }

    /// Register a listener for server notifications with this `update-type`.
    /// The listener receives the full decoded message.
    pub fn on_update<F>(&self, update_type: impl Into<String>, listener: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.events.on_update(update_type, listener);
    }

    /// Stream notifications with this `update-type` through a channel.
    pub fn subscribe(&self, update_type: impl Into<String>) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_update(update_type, move |payload| {
            let _ = tx.send(payload.clone());
        });
        rx
    }

    /// Send a request and wait for its reply.
    ///
    /// `params` must not rely on the reserved `request-type` and `message-id`
    /// keys; they are overwritten.
    pub async fn send(
        &self,
        request_type: &str,
        params: Map<String, Value>,
    ) -> Result<Value, ObsError> {
        self.request(request_type, params).await?.await
    }

    /// Send a request whose parameters serialize to a JSON object.
    pub async fn send_with<P: Serialize>(
        &self,
        request_type: &str,
        params: &P,
    ) -> Result<Value, ObsError> {
        self.send(request_type, to_params(params)?).await
    }

    /// Put a request on the wire without waiting for the reply.
    pub async fn request(
        &self,
        request_type: &str,
        params: Map<String, Value>,
    ) -> Result<PendingReply, ObsError> {
        self.inner.connection.request(request_type, params).await
    }

    /// Close the transport. Requests still pending stay unresolved.
    pub async fn close(&self) -> Result<(), ObsError> {
        debug!("Closing client");
        self.inner.connection.close().await
    }

    /// Number of requests still waiting for a reply.
    pub async fn pending_requests(&self) -> usize {
        self.inner.connection.pending_count().await
    }
}

impl Drop for ObsClient {
    fn drop(&mut self) {
        self.dispatch_task.abort();
        debug!("Client dropped, dispatch task aborted");
    }
}

/// Dispatch loop - runs in a spawned task.
///
/// Every transport event is handled here, one at a time.
async fn dispatch_loop(mut stream: Box<dyn TransportStream>, inner: Arc<Inner>, password: Password) {
    debug!("Dispatch loop started");

    let mut handshake_started = false;
    while let Some(event) = stream.next_event().await {
        match event {
            TransportEvent::Opened => {
                if handshake_started {
                    continue;
                }
                handshake_started = true;
                inner.state.send_replace(ConnectionState::Authenticating);
                // Runs beside the loop, which must keep routing its replies
                tokio::spawn(handshake(Arc::downgrade(&inner), password.clone()));
            }
            TransportEvent::Message(text) => {
                inner.connection.dispatch(&inner.events, &text).await;
            }
            TransportEvent::Closed => break,
        }
    }

    info!("Connection closed");
    inner.state.send_replace(ConnectionState::Closed);
    inner.events.emit_lifecycle(Lifecycle::Close);
}

/// Run the handshake and publish its outcome.
///
/// Holds the client only weakly, so a dropped client is not kept alive by a
/// handshake the server never answers.
async fn handshake(inner: Weak<Inner>, password: Password) {
    let outcome = authenticate(&inner, &password).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };

    match outcome {
        Ok(()) => {
            if settle(&inner, ConnectionState::Open) {
                info!("Authenticated");
                inner.events.emit_lifecycle(Lifecycle::Open);
            }
        }
        Err(e) => {
            warn!(error = %e, "Authentication failed");
            if settle(&inner, ConnectionState::AuthFailed(e.to_string())) {
                inner.events.emit_lifecycle(Lifecycle::AuthFailed);
            }
        }
    }
}

/// Leave `Authenticating` for `next`, unless the connection closed meanwhile.
fn settle(inner: &Inner, next: ConnectionState) -> bool {
    inner.state.send_if_modified(|state| {
        if *state == ConnectionState::Authenticating {
            *state = next;
            true
        } else {
            false
        }
    })
}

async fn authenticate(inner: &Weak<Inner>, password: &Password) -> Result<(), ObsError> {
    let reply = handshake_request(inner, GET_AUTH_REQUIRED, Map::new()).await?.await?;
    let challenge = AuthChallenge::from_reply(&reply)?;

    let auth = match challenge.respond(password)? {
        Some(auth) => auth,
        None => {
            debug!("Server does not require authentication");
            return Ok(());
        }
    };

    let mut params = Map::new();
    params.insert("auth".to_string(), Value::String(auth));
    handshake_request(inner, AUTHENTICATE, params).await?.await?;
    Ok(())
}

async fn handshake_request(
    inner: &Weak<Inner>,
    request_type: &str,
    params: Map<String, Value>,
) -> Result<PendingReply, ObsError> {
    let inner = inner.upgrade().ok_or(ObsError::ConnectionClosed)?;
    inner.connection.request(request_type, params).await
}
