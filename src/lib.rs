pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod location;
pub mod mock;
pub mod notify;
pub mod record;
pub mod share;
pub mod store;

pub use app::{Collaborators, GalleryApp};
pub use camera::{Camera, CaptureOptions, CapturedImage};
pub use capture::{CapturePipeline, PendingImage};
pub use config::{CameraFacing, GalleryConfig, Platform};
pub use error::{CameraError, GalleryError, LocationError, Result, ShareError};
pub use events::{EventBus, GalleryEvent};
pub use gallery::{filter_records, GalleryProjection};
pub use location::{LocationProvider, LocationTracker, PermissionState, PermissionStatus};
pub use notify::{LogNotifier, Notification, NotificationKind, Notifier};
pub use record::{Coordinates, MapRegion, MediaRecord, NewRecord};
pub use share::{
    FileInfo, FileSystem, LocalFileSystem, ShareAction, ShareParams, SharePipeline, ShareReport,
    ShareStrategy,
};
pub use store::{RecordStore, SqliteRecordStore};
