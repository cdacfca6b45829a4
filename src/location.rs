use crate::error::LocationError;
use crate::record::Coordinates;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Answer to a location permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Where the tracker is in the permission flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Unrequested,
    PermissionRequested,
    Granted,
    Denied,
}

/// Location collaborator
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    /// One-shot fix
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

#[derive(Debug)]
struct TrackerState {
    permission: PermissionState,
    last_fix: Option<Coordinates>,
}

/// Permission-gated access to the last known fix.
///
/// `state` is never held across a provider call, so readers see
/// `PermissionRequested` while a prompt is open. `request_lock` keeps
/// concurrent requests from prompting twice.
pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    state: Mutex<TrackerState>,
    request_lock: Mutex<()>,
}

impl LocationTracker {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(TrackerState {
                permission: PermissionState::Unrequested,
                last_fix: None,
            }),
            request_lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> PermissionState {
        self.state.lock().await.permission
    }

    pub async fn last_fix(&self) -> Option<Coordinates> {
        self.state.lock().await.last_fix
    }

    /// Ask for permission if needed, then request a fresh fix.
    ///
    /// A denial is terminal: later calls fail without asking again. A failed
    /// fix keeps whatever fix was cached before.
    pub async fn request_fix(&self) -> Result<Coordinates, LocationError> {
        let _requesting = self.request_lock.lock().await;

        let permission = {
            let mut state = self.state.lock().await;
            if state.permission != PermissionState::Granted
                && state.permission != PermissionState::Denied
            {
                state.permission = PermissionState::PermissionRequested;
            }
            state.permission
        };

        match permission {
            PermissionState::Denied => return Err(LocationError::PermissionDenied),
            PermissionState::Granted => {}
            PermissionState::Unrequested | PermissionState::PermissionRequested => {
                debug!("Requesting location permission");

                let answer = match self.provider.request_permission().await {
                    PermissionStatus::Granted => {
                        info!("Location permission granted");
                        PermissionState::Granted
                    }
                    PermissionStatus::Denied => {
                        warn!("Location permission denied");
                        PermissionState::Denied
                    }
                };
                self.state.lock().await.permission = answer;

                if answer == PermissionState::Denied {
                    return Err(LocationError::PermissionDenied);
                }
            }
        }

        match self.provider.current_position().await {
            Ok(fix) => {
                debug!("Location fix: {:.5}, {:.5}", fix.latitude, fix.longitude);
                self.state.lock().await.last_fix = Some(fix);
                Ok(fix)
            }
            Err(e) => {
                warn!("Location fix failed: {}", e);
                Err(e)
            }
        }
    }
}
