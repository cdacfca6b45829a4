use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Record {id} not found")]
    NotFound { id: i64 },

    #[error("Cannot access file {path}: {details}")]
    FileAccess { path: String, details: String },

    #[error("File {path} is unavailable: {reason}")]
    FileUnavailable { path: String, reason: String },

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Share error: {0}")]
    Share(#[from] ShareError),
}

/// Location-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location fix unavailable: {details}")]
    Unavailable { details: String },

    #[error("Location request timed out")]
    Timeout,
}

/// Camera-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera is not ready")]
    NotReady,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Capture failed: {details}")]
    CaptureFailed { details: String },
}

/// Share-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShareError {
    #[error("Sharing is not available on this device")]
    Unavailable,

    #[error("{mechanism} failed: {details}")]
    MechanismFailed { mechanism: String, details: String },

    #[error("All share mechanisms failed: {}", .attempts.join("; "))]
    Exhausted { attempts: Vec<String> },
}

impl GalleryError {
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn file_access<S: Into<String>>(path: S, details: S) -> Self {
        Self::FileAccess {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn file_unavailable<S: Into<String>>(path: S, reason: S) -> Self {
        Self::FileUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the user can retry the action that produced this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            GalleryError::Config(_) => false,
            GalleryError::Storage { .. } => true,
            GalleryError::Validation { .. } => true,
            GalleryError::NotFound { .. } => false,
            GalleryError::FileAccess { .. } => true,
            GalleryError::FileUnavailable { .. } => false,
            GalleryError::Location(LocationError::PermissionDenied) => false,
            GalleryError::Location(_) => true,
            GalleryError::Camera(CameraError::PermissionDenied) => false,
            GalleryError::Camera(_) => true,
            GalleryError::Share(_) => true,
        }
    }

    /// Short title used when the error is shown to the user
    pub fn title(&self) -> &'static str {
        match self {
            GalleryError::Config(_) => "Configuration problem",
            GalleryError::Storage { .. } => "Could not save",
            GalleryError::Validation { .. } => "Missing information",
            GalleryError::NotFound { .. } => "Image not found",
            GalleryError::FileAccess { .. } => "File check failed",
            GalleryError::FileUnavailable { .. } => "File unavailable",
            GalleryError::Location(_) => "Location unavailable",
            GalleryError::Camera(_) => "Camera problem",
            GalleryError::Share(_) => "Sharing failed",
        }
    }
}

impl From<rusqlite::Error> for GalleryError {
    fn from(e: rusqlite::Error) -> Self {
        GalleryError::storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GalleryError::NotFound { id: 7 };
        assert_eq!(err.to_string(), "Record 7 not found");

        let err = GalleryError::validation("missing required data");
        assert_eq!(err.to_string(), "Validation error: missing required data");
    }

    #[test]
    fn test_exhausted_share_lists_attempts() {
        let err = ShareError::Exhausted {
            attempts: vec!["system: boom".to_string(), "intent: nope".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "All share mechanisms failed: system: boom; intent: nope"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(GalleryError::storage("disk full").is_recoverable());
        assert!(!GalleryError::NotFound { id: 1 }.is_recoverable());
        assert!(!GalleryError::Location(LocationError::PermissionDenied).is_recoverable());
        assert!(GalleryError::Location(LocationError::Timeout).is_recoverable());
    }

    #[test]
    fn test_rusqlite_error_maps_to_storage() {
        let err: GalleryError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, GalleryError::Storage { .. }));
    }
}
