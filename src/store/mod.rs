mod sqlite;

pub use sqlite::SqliteRecordStore;

use crate::error::Result;
use crate::record::{MediaRecord, NewRecord};
use async_trait::async_trait;

/// Durable table of media records.
///
/// The store never pushes change notifications. Callers refresh with
/// [`RecordStore::list_all`] after every write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ensure the backing table exists. Safe to call on every start.
    async fn initialize(&self) -> Result<bool>;

    /// Insert a record and return the id the store assigned to it
    async fn add(&self, record: NewRecord) -> Result<i64>;

    /// Point lookup; `None` when the id does not exist
    async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>>;

    /// Rename a record, returning the number of rows affected (0 if absent)
    async fn update(&self, id: i64, name: &str) -> Result<usize>;

    /// Remove a record permanently, returning the number of rows affected
    async fn delete(&self, id: i64) -> Result<usize>;

    /// Every record, in insertion order
    async fn list_all(&self) -> Result<Vec<MediaRecord>>;

    /// Remove every record, returning how many were removed
    async fn clear(&self) -> Result<usize>;

    async fn count(&self) -> Result<usize>;
}
