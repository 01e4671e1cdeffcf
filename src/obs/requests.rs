//! Convenience requests
//!
//! Thin wrappers that shape parameters for common obs-websocket requests and
//! decode their replies. They add no protocol behaviour beyond `send`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::client::ObsClient;
use crate::error::ObsError;

pub const DEFAULT_SCREENSHOT_FORMAT: &str = "png";
pub const DEFAULT_SCREENSHOT_WIDTH: u32 = 480;
pub const DEFAULT_SCREENSHOT_HEIGHT: u32 = 270;

/// Reply to `GetCurrentScene`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentScene {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SceneItem>,
}

/// One source placed in a scene.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneItem {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub render: Option<bool>,
    #[serde(default)]
    pub muted: Option<bool>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub volume: Option<f64>,
}

#[derive(Serialize)]
struct MuteParams<'a> {
    source: &'a str,
    mute: bool,
}

#[derive(Serialize)]
struct SourceParams<'a> {
    source: &'a str,
}

/// Parameters for `TakeSourceScreenshot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRequest {
    pub source_name: String,
    pub embed_picture_format: String,
    pub width: u32,
    pub height: u32,
}

impl ScreenshotRequest {
    /// A 480x270 PNG of the named source.
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            embed_picture_format: DEFAULT_SCREENSHOT_FORMAT.to_string(),
            width: DEFAULT_SCREENSHOT_WIDTH,
            height: DEFAULT_SCREENSHOT_HEIGHT,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.embed_picture_format = format.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Reply to `TakeSourceScreenshot`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub source_name: String,
    /// Data URI, e.g. `data:image/png;base64,iVBOR...`
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub image_file: Option<String>,
}

impl Screenshot {
    /// Decode the embedded image.
    pub fn image_bytes(&self) -> Result<Vec<u8>, ObsError> {
        let img = self
            .img
            .as_deref()
            .ok_or_else(|| ObsError::Protocol("Screenshot reply has no embedded image".into()))?;
        let (_, data) = img
            .split_once(";base64,")
            .ok_or_else(|| ObsError::Protocol("Embedded image is not a base64 data URI".into()))?;
        STANDARD
            .decode(data)
            .map_err(|e| ObsError::Protocol(format!("Invalid embedded image: {}", e)))
    }
}

impl ObsClient {
    /// `GetCurrentScene`
    pub async fn get_current_scene(&self) -> Result<CurrentScene, ObsError> {
        let reply = self.send("GetCurrentScene", Map::new()).await?;
        Ok(CurrentScene::deserialize(&reply)?)
    }

    /// `SetMute`
    pub async fn set_mute(&self, source: &str, mute: bool) -> Result<(), ObsError> {
        self.send_with("SetMute", &MuteParams { source, mute })
            .await
            .map(|_| ())
    }

    /// `ToggleMute`
    pub async fn toggle_mute(&self, source: &str) -> Result<(), ObsError> {
        self.send_with("ToggleMute", &SourceParams { source })
            .await
            .map(|_| ())
    }

    /// `TakeSourceScreenshot` with the image embedded in the reply.
    pub async fn take_source_screenshot(
        &self,
        request: &ScreenshotRequest,
    ) -> Result<Screenshot, ObsError> {
        let reply = self.send_with("TakeSourceScreenshot", request).await?;
        Ok(Screenshot::deserialize(&reply)?)
    }
}
