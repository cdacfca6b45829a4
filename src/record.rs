use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One persisted media metadata row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub file_path: String,
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// Caller-supplied fields of a record that does not exist yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub file_path: String,
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// A single resolved GPS fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Map region centered on a record's fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl MediaRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Region a map view uses to place this record's marker
    pub fn map_region(&self, delta: f64) -> MapRegion {
        MapRegion {
            latitude: self.latitude,
            longitude: self.longitude,
            latitude_delta: delta,
            longitude_delta: delta,
        }
    }
}

impl NewRecord {
    pub fn new(
        file_path: impl Into<String>,
        timestamp: impl Into<String>,
        coordinates: Coordinates,
        name: impl Into<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            timestamp: timestamp.into(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            name: name.into(),
        }
    }

    /// Attach the store-assigned id
    pub fn into_record(self, id: i64) -> MediaRecord {
        MediaRecord {
            id,
            file_path: self.file_path,
            timestamp: self.timestamp,
            latitude: self.latitude,
            longitude: self.longitude,
            name: self.name,
        }
    }
}

/// Capture time as stored: RFC 3339, UTC, millisecond precision
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Default image name, `image_<epoch-ms>_<random>.jpg`
pub fn generate_image_name(time: DateTime<Utc>) -> String {
    let suffix: u32 = rand::random::<u32>() % 1_000_000;
    format!("image_{}_{}.jpg", time.timestamp_millis(), suffix)
}
