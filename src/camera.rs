use crate::config::{CameraConfig, CameraFacing};
use crate::error::CameraError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters passed to the camera for a single shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub quality: f32,
    pub include_base64: bool,
    pub include_exif: bool,
    pub facing: CameraFacing,
}

impl From<&CameraConfig> for CaptureOptions {
    fn from(config: &CameraConfig) -> Self {
        Self {
            quality: config.quality,
            include_base64: config.include_base64,
            include_exif: config.include_exif,
            facing: config.facing,
        }
    }
}

/// In-memory handle to a freshly captured image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub uri: String,
    pub base64: Option<String>,
}

impl CapturedImage {
    pub fn is_empty(&self) -> bool {
        self.uri.trim().is_empty()
    }

    /// Inline data URI for previewing the image before it is committed
    pub fn preview_data_uri(&self) -> Option<String> {
        self.base64
            .as_ref()
            .map(|data| format!("data:image/jpg;base64,{}", data))
    }
}

/// Camera collaborator
#[async_trait]
pub trait Camera: Send + Sync {
    async fn take_picture(&self, options: CaptureOptions) -> Result<CapturedImage, CameraError>;
}
