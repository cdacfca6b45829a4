//! In-process stand-ins for the device collaborators, for tests and for
//! running the core without camera, GPS or share hardware.

use crate::camera::{Camera, CaptureOptions, CapturedImage};
use crate::error::{CameraError, LocationError, ShareError};
use crate::location::{LocationProvider, PermissionStatus};
use crate::notify::{Notification, Notifier};
use crate::record::Coordinates;
use crate::share::{FileInfo, FileSystem, ShareAction, ShareParams, ShareStrategy};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Camera that hands out numbered `file:///mock/` URIs
#[derive(Default)]
pub struct MockCamera {
    shots: AtomicUsize,
    empty_uri: AtomicBool,
    failure: Mutex<Option<CameraError>>,
    last_options: Mutex<Option<CaptureOptions>>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following capture fail (or succeed again with `None`)
    pub fn fail_with(&self, failure: Option<CameraError>) {
        *self.failure.lock() = failure;
    }

    pub fn return_empty_uri(&self, empty: bool) {
        self.empty_uri.store(empty, Ordering::Relaxed);
    }

    pub fn shots(&self) -> usize {
        self.shots.load(Ordering::Relaxed)
    }

    pub fn last_options(&self) -> Option<CaptureOptions> {
        self.last_options.lock().clone()
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn take_picture(&self, options: CaptureOptions) -> Result<CapturedImage, CameraError> {
        *self.last_options.lock() = Some(options.clone());

        if let Some(failure) = self.failure.lock().clone() {
            return Err(failure);
        }

        let shot = self.shots.fetch_add(1, Ordering::Relaxed) + 1;
        let uri = if self.empty_uri.load(Ordering::Relaxed) {
            String::new()
        } else {
            format!("file:///mock/capture_{}.jpg", shot)
        };
        debug!("Mock camera shot {} -> {:?}", shot, uri);

        Ok(CapturedImage {
            uri,
            base64: options.include_base64.then(|| "/9j/4AAQSkZJRg==".to_string()),
        })
    }
}

/// Location provider with a fixed permission answer
pub struct MockLocationProvider {
    permission: PermissionStatus,
    position: Mutex<Result<Coordinates, LocationError>>,
    prompt_delay: Mutex<Option<Duration>>,
    permission_requests: AtomicUsize,
    position_requests: AtomicUsize,
}

impl MockLocationProvider {
    pub fn granted(fix: Coordinates) -> Self {
        Self::with(PermissionStatus::Granted, Ok(fix))
    }

    pub fn denied() -> Self {
        Self::with(
            PermissionStatus::Denied,
            Err(LocationError::PermissionDenied),
        )
    }

    fn with(permission: PermissionStatus, position: Result<Coordinates, LocationError>) -> Self {
        Self {
            permission,
            position: Mutex::new(position),
            prompt_delay: Mutex::new(None),
            permission_requests: AtomicUsize::new(0),
            position_requests: AtomicUsize::new(0),
        }
    }

    pub fn set_position(&self, fix: Coordinates) {
        *self.position.lock() = Ok(fix);
    }

    pub fn fail_with(&self, error: LocationError) {
        *self.position.lock() = Err(error);
    }

    /// Keep the permission prompt open for `delay` before answering
    pub fn delay_prompt(&self, delay: Duration) {
        *self.prompt_delay.lock() = Some(delay);
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::Relaxed)
    }

    pub fn position_requests(&self) -> usize {
        self.position_requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LocationProvider for MockLocationProvider {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission_requests.fetch_add(1, Ordering::Relaxed);
        let delay = *self.prompt_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.permission
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        self.position_requests.fetch_add(1, Ordering::Relaxed);
        self.position.lock().clone()
    }
}

/// Filesystem backed by a path -> size table
#[derive(Default)]
pub struct MockFileSystem {
    files: Mutex<HashMap<String, u64>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, size: u64) {
        self.files.lock().insert(path.to_string(), size);
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().remove(path);
    }

    /// Make every metadata query fail
    pub fn fail_with(&self, details: &str) {
        *self.failure.lock() = Some(details.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FileSystem for MockFileSystem {
    async fn get_info(&self, path: &str) -> io::Result<FileInfo> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(details) = self.failure.lock().clone() {
            return Err(io::Error::other(details));
        }

        Ok(match self.files.lock().get(path) {
            Some(size) => FileInfo {
                exists: true,
                size: *size,
            },
            None => FileInfo {
                exists: false,
                size: 0,
            },
        })
    }
}

/// Share strategy that either always succeeds or always fails
pub struct MockShareStrategy {
    name: String,
    failure: Option<String>,
    shared: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockShareStrategy {
    pub fn succeeding(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failure: None,
            shared: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str, details: &str) -> Self {
        Self {
            failure: Some(details.to_string()),
            ..Self::succeeding(name)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn shared_paths(&self) -> Vec<String> {
        self.shared.lock().clone()
    }
}

#[async_trait]
impl ShareStrategy for MockShareStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn share(&self, path: &str, _params: &ShareParams) -> Result<ShareAction, ShareError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(details) = &self.failure {
            return Err(ShareError::MechanismFailed {
                mechanism: self.name.clone(),
                details: details.clone(),
            });
        }

        self.shared.lock().push(path.to_string());
        Ok(ShareAction::Shared)
    }
}

/// Notifier that remembers everything it was asked to show
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications.lock().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}
