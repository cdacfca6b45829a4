use crate::camera::Camera;
use crate::capture::{CapturePipeline, PendingImage};
use crate::config::{CameraFacing, GalleryConfig};
use crate::error::{GalleryError, Result};
use crate::events::{EventBus, GalleryEvent};
use crate::gallery::GalleryProjection;
use crate::location::{LocationProvider, LocationTracker};
use crate::notify::{Notification, Notifier};
use crate::record::{Coordinates, MapRegion, MediaRecord};
use crate::share::{FileSystem, SharePipeline, ShareReport, ShareStrategy};
use crate::store::{RecordStore, SqliteRecordStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Device services the gallery core consumes
pub struct Collaborators {
    pub camera: Arc<dyn Camera>,
    pub location: Arc<dyn LocationProvider>,
    pub filesystem: Arc<dyn FileSystem>,
    /// Primary share mechanism first, fallback second
    pub sharers: Vec<Arc<dyn ShareStrategy>>,
    pub notifier: Arc<dyn Notifier>,
}

/// Entry points for every user action.
///
/// Action methods never return errors: a failure is logged and reported to
/// the notifier exactly once, and the method returns `None`/`false`.
pub struct GalleryApp {
    config: GalleryConfig,
    store: Arc<dyn RecordStore>,
    projection: Arc<GalleryProjection>,
    location: Arc<LocationTracker>,
    capture: CapturePipeline,
    share: SharePipeline,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
}

impl GalleryApp {
    /// Open the record database named in the configuration
    pub fn open(config: GalleryConfig, collaborators: Collaborators) -> Result<Self> {
        let store = SqliteRecordStore::open(
            &config.storage.database_path,
            Duration::from_millis(config.storage.busy_timeout_ms),
        )?;
        Ok(Self::new(config, Arc::new(store), collaborators))
    }

    pub fn new(
        config: GalleryConfig,
        store: Arc<dyn RecordStore>,
        collaborators: Collaborators,
    ) -> Self {
        let event_bus = EventBus::new(config.events.bus_capacity);
        let projection = Arc::new(GalleryProjection::new(
            Arc::clone(&store),
            event_bus.clone(),
        ));
        let location = Arc::new(LocationTracker::new(collaborators.location));

        let capture = CapturePipeline::new(
            &config.camera,
            collaborators.camera,
            Arc::clone(&location),
            Arc::clone(&projection),
            event_bus.clone(),
        );
        let share = SharePipeline::new(
            Arc::clone(&store),
            collaborators.filesystem,
            collaborators.sharers,
            config.share.clone(),
        );

        Self {
            config,
            store,
            projection,
            location,
            capture,
            share,
            notifier: collaborators.notifier,
            event_bus,
        }
    }

    /// Prepare the store and load the first working set. Safe on every start.
    pub async fn start(&self) -> Result<()> {
        info!("Starting gallery");

        let started: Result<Arc<Vec<MediaRecord>>> = async {
            self.store.initialize().await?;
            self.projection.reload().await
        }
        .await;

        match started {
            Ok(records) => {
                info!("Gallery started with {} records", records.len());
                Ok(())
            }
            Err(e) => {
                error!("Gallery failed to start: {}", e);
                self.notifier.notify(Notification::from_error(&e));
                Err(e)
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.event_bus.subscribe()
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    /// Current working set
    pub fn records(&self) -> Arc<Vec<MediaRecord>> {
        self.projection.snapshot()
    }

    /// Update the search query and return the matching records
    pub fn search(&self, query: &str) -> Vec<MediaRecord> {
        self.projection.set_query(query);
        self.projection.filtered()
    }

    /// Records matching the current search query
    pub fn visible_records(&self) -> Vec<MediaRecord> {
        self.projection.filtered()
    }

    pub async fn refresh(&self) -> bool {
        let result = self.projection.reload().await.map(|_| ());
        self.report("refresh", result).is_some()
    }

    pub async fn request_location(&self) -> Option<Coordinates> {
        let result = self.location.request_fix().await.map_err(GalleryError::from);
        self.report("request location", result)
    }

    pub async fn capture_photo(&self) -> Option<PendingImage> {
        let result = self.capture.capture().await;
        self.report("capture", result)
    }

    /// Save the pending image after the user accepted it
    pub async fn confirm_capture(&self) -> Option<i64> {
        let result = self.capture.commit().await;
        let id = self.report("commit", result)?;
        self.notifier
            .notify(Notification::success("Saved", "Image saved to gallery"));
        Some(id)
    }

    pub async fn retake(&self) -> bool {
        self.capture.discard().await
    }

    pub fn flip_camera(&self) -> CameraFacing {
        self.capture.toggle_facing()
    }

    pub async fn pending_capture(&self) -> Option<PendingImage> {
        self.capture.pending().await
    }

    /// Detail lookup straight from the store
    pub async fn record(&self, id: i64) -> Option<MediaRecord> {
        let result = match self.store.get_by_id(id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(GalleryError::NotFound { id }),
            Err(e) => Err(e),
        };
        self.report("lookup", result)
    }

    pub async fn rename(&self, id: i64, name: &str) -> bool {
        let result = self.projection.rename(id, name).await;
        match self.report("rename", result) {
            Some(0) => {
                self.notifier.notify(Notification::warning(
                    "Nothing changed",
                    format!("Image {} no longer exists", id),
                ));
                false
            }
            Some(_) => {
                self.notifier.notify(Notification::success(
                    "Renamed",
                    format!("Image renamed to {}", name.trim()),
                ));
                true
            }
            None => false,
        }
    }

    /// Permanently delete a record. Call only after the user confirmed.
    pub async fn delete(&self, id: i64) -> bool {
        let result = self.projection.delete(id).await;
        match self.report("delete", result) {
            Some(0) => {
                self.notifier.notify(Notification::warning(
                    "Nothing deleted",
                    format!("Image {} was already removed", id),
                ));
                false
            }
            Some(_) => {
                self.notifier
                    .notify(Notification::success("Deleted", "Image removed from gallery"));
                true
            }
            None => false,
        }
    }

    /// Remove every record. Call only after the user confirmed.
    pub async fn clear_all(&self) -> Option<usize> {
        let result = self.projection.clear().await;
        let removed = self.report("clear", result)?;
        self.notifier.notify(Notification::success(
            "Gallery cleared",
            format!("{} images removed", removed),
        ));
        Some(removed)
    }

    pub async fn share(&self, id: i64) -> Option<ShareReport> {
        let result = self.share.share(id).await;
        let report = self.report("share", result)?;
        if report.used_fallback {
            warn!("Record {} shared through fallback {}", id, report.mechanism);
        }
        Some(report)
    }

    /// Map region for a record in the working set
    pub fn map_region(&self, id: i64) -> Option<MapRegion> {
        let result = self
            .projection
            .get(id)
            .map(|record| record.map_region(self.config.map.region_delta))
            .ok_or(GalleryError::NotFound { id });
        self.report("map", result)
    }

    /// Convert a failed action into one user notification
    fn report<T>(&self, action: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                if e.is_recoverable() {
                    warn!("{} failed: {}", action, e);
                } else {
                    error!("{} failed: {}", action, e);
                }
                self.notifier.notify(Notification::from_error(&e));
                None
            }
        }
    }
}
