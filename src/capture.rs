use crate::camera::{Camera, CaptureOptions, CapturedImage};
use crate::config::{CameraConfig, CameraFacing};
use crate::error::{GalleryError, Result};
use crate::events::{EventBus, GalleryEvent};
use crate::gallery::GalleryProjection;
use crate::location::{LocationTracker, PermissionState};
use crate::record::{format_timestamp, generate_image_name, Coordinates, NewRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A captured image the user has not accepted yet
#[derive(Debug, Clone, PartialEq)]
pub struct PendingImage {
    pub capture_id: Uuid,
    pub image: CapturedImage,
    pub captured_at: DateTime<Utc>,
}

/// Turns a camera trigger into a persisted record in two phases: `capture`
/// holds the image, `commit` writes it once the user accepts it.
pub struct CapturePipeline {
    camera: Arc<dyn Camera>,
    location: Arc<LocationTracker>,
    projection: Arc<GalleryProjection>,
    event_bus: EventBus,
    options: parking_lot::Mutex<CaptureOptions>,
    pending: Mutex<Option<PendingImage>>,
}

impl CapturePipeline {
    pub fn new(
        config: &CameraConfig,
        camera: Arc<dyn Camera>,
        location: Arc<LocationTracker>,
        projection: Arc<GalleryProjection>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            camera,
            location,
            projection,
            event_bus,
            options: parking_lot::Mutex::new(CaptureOptions::from(config)),
            pending: Mutex::new(None),
        }
    }

    /// Take a picture and hold it as the pending image, replacing any
    /// earlier one. Also refreshes the location fix.
    pub async fn capture(&self) -> Result<PendingImage> {
        let options = self.options.lock().clone();
        debug!("Capturing image ({} camera)", options.facing.as_str());

        let image = self.camera.take_picture(options).await.map_err(|e| {
            error!("Image capture failed: {}", e);
            GalleryError::from(e)
        })?;

        if let Err(e) = self.location.request_fix().await {
            warn!("Captured without a fresh location fix: {}", e);
        }

        let pending = PendingImage {
            capture_id: Uuid::new_v4(),
            image,
            captured_at: Utc::now(),
        };

        let mut slot = self.pending.lock().await;
        if let Some(previous) = slot.replace(pending.clone()) {
            debug!("Retake replaced pending capture {}", previous.capture_id);
        }

        info!("Captured image {} ({})", pending.capture_id, pending.image.uri);
        self.event_bus.publish(GalleryEvent::ImageCaptured {
            uri: pending.image.uri.clone(),
        });

        Ok(pending)
    }

    /// Persist the pending image with the last known fix.
    ///
    /// Fails with a validation error and writes nothing unless both a fix and
    /// a non-empty image are present. On a store failure the pending image is
    /// kept so the commit can be retried.
    pub async fn commit(&self) -> Result<i64> {
        let mut slot = self.pending.lock().await;

        let fix = self.usable_fix().await;
        let (pending, fix) = match (slot.as_ref(), fix) {
            (Some(pending), Some(fix)) if !pending.image.is_empty() => (pending, fix),
            (pending, fix) => {
                warn!(
                    "Commit rejected: image present = {}, location present = {}",
                    pending.is_some_and(|p| !p.image.is_empty()),
                    fix.is_some()
                );
                return Err(GalleryError::validation("missing required data"));
            }
        };

        let now = Utc::now();
        let record = NewRecord::new(
            pending.image.uri.clone(),
            format_timestamp(now),
            fix,
            generate_image_name(now),
        );
        let capture_id = pending.capture_id;

        match self.projection.add(record).await {
            Ok(id) => {
                *slot = None;
                info!("Committed capture {} as record {}", capture_id, id);
                self.event_bus.publish(GalleryEvent::ImageCommitted { id });
                Ok(id)
            }
            Err(e) => {
                error!("Commit of capture {} failed, keeping it for retry: {}", capture_id, e);
                Err(e)
            }
        }
    }

    /// Drop the pending image without saving it
    pub async fn discard(&self) -> bool {
        let discarded = self.pending.lock().await.take();

        match discarded {
            Some(pending) => {
                debug!("Discarded capture {}", pending.capture_id);
                self.event_bus.publish(GalleryEvent::ImageDiscarded);
                true
            }
            None => false,
        }
    }

    pub async fn pending(&self) -> Option<PendingImage> {
        self.pending.lock().await.clone()
    }

    /// Switch between the back and front camera for later captures
    pub fn toggle_facing(&self) -> CameraFacing {
        let mut options = self.options.lock();
        options.facing = options.facing.flipped();
        debug!("Camera facing set to {}", options.facing.as_str());
        options.facing
    }

    pub fn facing(&self) -> CameraFacing {
        self.options.lock().facing
    }

    async fn usable_fix(&self) -> Option<Coordinates> {
        if self.location.state().await == PermissionState::Denied {
            return None;
        }
        self.location.last_fix().await
    }
}
