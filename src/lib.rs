//! obs-remote - Remote control for OBS Studio over obs-websocket
//!
//! Drives a running OBS instance from an overlay or the command line.
//!
//! ## Architecture
//!
//! - **obs**: request/response client over one WebSocket, with
//!   challenge-response authentication and server notifications
//! - **units**: metric-prefix formatting for readouts shown in the overlay
//! - **config**: TOML configuration shared by the CLI
//!
//! ## Protocol
//!
//! | Direction | Shape                                                 |
//! |-----------|-------------------------------------------------------|
//! | request   | `{"request-type", "message-id", ...params}`           |
//! | reply     | `{"message-id", "status": "ok"\|"error", ...}`        |
//! | event     | `{"update-type", ...payload}`                         |

pub mod config;
pub mod error;
pub mod obs;
pub mod units;

// Re-exports
pub use config::Config;
pub use error::ObsError;
pub use obs::{ConnectionState, Lifecycle, ObsClient, Password, ScreenshotRequest};
pub use units::{Metric, Quantity};
