use super::RecordStore;
use crate::error::{GalleryError, Result};
use crate::record::{MediaRecord, NewRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS media_records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path   TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL,
    name        TEXT NOT NULL
)";

const SELECT_COLUMNS: &str =
    "SELECT id, file_path, timestamp, latitude, longitude, name FROM media_records";

/// SQLite-backed record store.
///
/// A single connection is shared behind a mutex and every statement runs on
/// the blocking thread pool, so async callers are never blocked on disk I/O.
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteRecordStore {
    /// Open (or create) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create database directory {}: {}", parent.display(), e);
                    GalleryError::storage(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open record database {}: {}", path.display(), e);
            GalleryError::storage(format!("Failed to open {}: {}", path.display(), e))
        })?;

        conn.busy_timeout(busy_timeout)?;
        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!("Record database journal mode: {}", journal_mode);

        info!("Record database opened at: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("Opened in-memory record database");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    /// Location of the database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        let outcome = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
        .map_err(|e| {
            error!("Record store task for {} did not complete: {}", op, e);
            GalleryError::storage(format!("{} task failed: {}", op, e))
        })?;

        outcome.map_err(|e| {
            error!("Record store {} failed: {}", op, e);
            GalleryError::storage(format!("{} failed: {}", op, e))
        })
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        timestamp: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        name: row.get(5)?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn initialize(&self) -> Result<bool> {
        self.with_conn("initialize", |conn| conn.execute_batch(SCHEMA))
            .await?;

        info!("Record schema initialized");
        Ok(true)
    }

    async fn add(&self, record: NewRecord) -> Result<i64> {
        let name = record.name.clone();

        let id = self
            .with_conn("add", move |conn| {
                conn.execute(
                    "INSERT INTO media_records (file_path, timestamp, latitude, longitude, name)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.file_path,
                        record.timestamp,
                        record.latitude,
                        record.longitude,
                        record.name
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        info!("Added record {} ({})", id, name);
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>> {
        let record = self
            .with_conn("get_by_id", move |conn| {
                conn.query_row(
                    &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                    [id],
                    record_from_row,
                )
                .optional()
            })
            .await?;

        if record.is_none() {
            debug!("Record {} not found", id);
        }
        Ok(record)
    }

    async fn update(&self, id: i64, name: &str) -> Result<usize> {
        let name = name.to_string();

        let rows = self
            .with_conn("update", move |conn| {
                conn.execute(
                    "UPDATE media_records SET name = ?1 WHERE id = ?2",
                    params![name, id],
                )
            })
            .await?;

        if rows == 0 {
            warn!("Rename of record {} affected no rows", id);
        } else {
            info!("Renamed record {}", id);
        }
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<usize> {
        let rows = self
            .with_conn("delete", move |conn| {
                conn.execute("DELETE FROM media_records WHERE id = ?1", [id])
            })
            .await?;

        if rows == 0 {
            warn!("Delete of record {} affected no rows", id);
        } else {
            info!("Deleted record {}", id);
        }
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<MediaRecord>> {
        let records = self
            .with_conn("list_all", |conn| {
                let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC", SELECT_COLUMNS))?;
                let rows = stmt.query_map([], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        debug!("Listed {} records", records.len());
        Ok(records)
    }

    async fn clear(&self) -> Result<usize> {
        let rows = self
            .with_conn("clear", |conn| conn.execute("DELETE FROM media_records", []))
            .await?;

        info!("Cleared {} records", rows);
        Ok(rows)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = self
            .with_conn("count", |conn| {
                conn.query_row("SELECT COUNT(*) FROM media_records", [], |row| row.get(0))
            })
            .await?;

        Ok(count as usize)
    }
}
