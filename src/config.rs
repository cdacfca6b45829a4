use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GalleryConfig {
    pub storage: StorageConfig,
    pub camera: CameraConfig,
    pub share: ShareConfig,
    pub map: MapConfig,
    pub events: EventsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Path to the SQLite record database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How long SQLite waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Encoding quality in (0, 1]
    #[serde(default = "default_quality")]
    pub quality: f32,

    /// Ask the camera for an inline base64 payload
    #[serde(default = "default_include_base64")]
    pub include_base64: bool,

    /// Ask the camera to keep EXIF data
    #[serde(default = "default_include_exif")]
    pub include_exif: bool,

    /// Which camera captures start on
    #[serde(default)]
    pub facing: CameraFacing,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShareConfig {
    /// Title shown on the share dialog
    #[serde(default = "default_dialog_title")]
    pub dialog_title: String,

    /// Platform family used to build share parameters
    #[serde(default)]
    pub platform: Platform,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MapConfig {
    /// Latitude/longitude span of the region centered on a record
    #[serde(default = "default_region_delta")]
    pub region_delta: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventsConfig {
    /// Gallery event bus capacity
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    #[default]
    Back,
    Front,
}

impl CameraFacing {
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraFacing::Back => "back",
            CameraFacing::Front => "front",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Other,
}

impl Default for Platform {
    fn default() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Other
        }
    }
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Other => "other",
        }
    }
}

impl GalleryConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("geogallery.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("storage.database_path", default_database_path())?
            .set_default("storage.busy_timeout_ms", default_busy_timeout_ms() as i64)?
            .set_default("camera.quality", default_quality() as f64)?
            .set_default("camera.include_base64", default_include_base64())?
            .set_default("camera.include_exif", default_include_exif())?
            .set_default("camera.facing", CameraFacing::default().as_str())?
            .set_default("share.dialog_title", default_dialog_title())?
            .set_default("share.platform", Platform::default().as_str())?
            .set_default("map.region_delta", default_region_delta())?
            .set_default("events.bus_capacity", default_bus_capacity() as i64)?
            .add_source(File::with_name(&path_str).required(false))
            // GEOGALLERY_STORAGE__DATABASE_PATH=/data/gallery.db
            .add_source(
                Environment::with_prefix("GEOGALLERY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: GalleryConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database_path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Storage database_path must not be empty".to_string(),
            ));
        }

        if !(self.camera.quality > 0.0 && self.camera.quality <= 1.0) {
            return Err(ConfigError::Message(
                "Camera quality must be in (0, 1]".to_string(),
            ));
        }

        if !(self.map.region_delta > 0.0) {
            return Err(ConfigError::Message(
                "Map region_delta must be greater than 0".to_string(),
            ));
        }

        if self.events.bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                database_path: default_database_path(),
                busy_timeout_ms: default_busy_timeout_ms(),
            },
            camera: CameraConfig {
                quality: default_quality(),
                include_base64: default_include_base64(),
                include_exif: default_include_exif(),
                facing: CameraFacing::default(),
            },
            share: ShareConfig {
                dialog_title: default_dialog_title(),
                platform: Platform::default(),
            },
            map: MapConfig {
                region_delta: default_region_delta(),
            },
            events: EventsConfig {
                bus_capacity: default_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    "./gallery.db".to_string()
}
fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_quality() -> f32 {
    1.0
}
fn default_include_base64() -> bool {
    true
}
fn default_include_exif() -> bool {
    true
}

fn default_dialog_title() -> String {
    "Share image".to_string()
}

fn default_region_delta() -> f64 {
    0.05
}

fn default_bus_capacity() -> usize {
    64
}
