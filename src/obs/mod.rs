//! obs-websocket Connection Module
//!
//! An asynchronous request/response client over one persistent WebSocket,
//! for remote-controlling OBS Studio.
//!
//! # Architecture
//!
//! | Module      | Responsibility                                       |
//! |-------------|------------------------------------------------------|
//! | `transport` | Move text messages, report open/close                |
//! | `protocol`  | JSON wire format, reply/notification classification |
//! | `auth`      | Challenge-response token derivation                  |
//! | `events`    | Lifecycle and notification listeners                 |
//! | `session`   | Request IDs and the pending-reply table              |
//! | `client`    | Lifecycle, handshake, public API                     |
//! | `requests`  | Convenience wrappers over `send`                     |
//!
//! # Usage
//!
//! ```ignore
//! use obs_remote::obs::ObsClient;
//!
//! // Returns only once authenticated
//! let client = ObsClient::connect("ws://localhost:4444", "secret").await?;
//!
//! client.on_update("SwitchScenes", |msg| println!("now on {}", msg["scene-name"]));
//!
//! let scene = client.get_current_scene().await?;
//! client.toggle_mute("Mic/Aux").await?;
//! ```
//!
//! Many requests may be in flight at once; each reply is matched to its
//! caller by `message-id`, not by arrival order.

mod auth;
mod protocol;
mod session;

pub mod client;
pub mod events;
pub mod requests;
pub mod transport;

pub use auth::{auth_response, AuthChallenge, Password};
pub use client::{ConnectionState, ObsClient};
pub use events::{EventEmitter, Lifecycle};
pub use protocol::{MESSAGE_ID_FIELD, REQUEST_TYPE_FIELD, UPDATE_TYPE_FIELD};
pub use requests::{CurrentScene, SceneItem, Screenshot, ScreenshotRequest};
pub use session::PendingReply;
pub use transport::{
    channel_transport, ChannelTransport, Transport, TransportEvent, TransportPeer,
    TransportSink, TransportStream, WebSocketTransport,
};
