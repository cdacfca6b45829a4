use crate::error::{GalleryError, Result};
use crate::events::{EventBus, GalleryEvent};
use crate::record::{MediaRecord, NewRecord};
use crate::store::RecordStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock as AsyncRwLock};
use tracing::{debug, info};

/// Records whose name contains `query`, ignoring case. An empty query
/// matches everything.
pub fn filter_records(records: &[MediaRecord], query: &str) -> Vec<MediaRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| record.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// In-memory view of the record store.
///
/// The working set is an immutable snapshot that is replaced wholesale by a
/// fresh `list_all()` after every mutation; it is never patched in place.
/// Reloads run one at a time so an older read never replaces a newer one.
pub struct GalleryProjection {
    store: Arc<dyn RecordStore>,
    event_bus: EventBus,
    snapshot: RwLock<Arc<Vec<MediaRecord>>>,
    query: RwLock<String>,
    reload_lock: Mutex<()>,
    /// Shared by record mutations, exclusive for `clear`
    mutation_gate: AsyncRwLock<()>,
    record_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl GalleryProjection {
    pub fn new(store: Arc<dyn RecordStore>, event_bus: EventBus) -> Self {
        Self {
            store,
            event_bus,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            query: RwLock::new(String::new()),
            reload_lock: Mutex::new(()),
            mutation_gate: AsyncRwLock::new(()),
            record_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the working set with the store's current contents
    pub async fn reload(&self) -> Result<Arc<Vec<MediaRecord>>> {
        let _reloading = self.reload_lock.lock().await;

        let records = Arc::new(self.store.list_all().await?);
        *self.snapshot.write() = Arc::clone(&records);

        debug!("Projection reloaded with {} records", records.len());
        self.event_bus.publish(GalleryEvent::ProjectionReloaded {
            count: records.len(),
        });

        Ok(records)
    }

    pub fn snapshot(&self) -> Arc<Vec<MediaRecord>> {
        Arc::clone(&*self.snapshot.read())
    }

    /// Lookup in the current working set
    pub fn get(&self, id: i64) -> Option<MediaRecord> {
        self.snapshot.read().iter().find(|r| r.id == id).cloned()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        *self.query.write() = query.into();
    }

    pub fn query(&self) -> String {
        self.query.read().clone()
    }

    /// Working set filtered by the current search query
    pub fn filtered(&self) -> Vec<MediaRecord> {
        let snapshot = self.snapshot();
        let query = self.query();
        filter_records(&snapshot, &query)
    }

    pub async fn add(&self, record: NewRecord) -> Result<i64> {
        let id = self.store.add(record).await?;
        self.reload().await?;
        Ok(id)
    }

    /// Rename a record. Returns rows affected; 0 means the record is gone.
    pub async fn rename(&self, id: i64, name: &str) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GalleryError::validation("Name must not be empty"));
        }

        self.with_record_lock(id, || async {
            let rows = self.store.update(id, name).await?;
            self.reload().await?;
            if rows > 0 {
                info!("Record {} renamed to {}", id, name);
            }
            Ok(rows)
        })
        .await
    }

    /// Delete a record. Returns rows affected; 0 means it was already gone.
    pub async fn delete(&self, id: i64) -> Result<usize> {
        self.with_record_lock(id, || async {
            let rows = self.store.delete(id).await?;
            self.reload().await?;
            Ok(rows)
        })
        .await
    }

    /// Remove every record. Waits for in-flight record mutations to finish.
    pub async fn clear(&self) -> Result<usize> {
        let _exclusive = self.mutation_gate.write().await;

        let rows = self.store.clear().await?;
        self.reload().await?;
        Ok(rows)
    }

    /// Whether a mutation on `id` currently holds its lock
    pub async fn is_busy(&self, id: i64) -> bool {
        let locks = self.record_locks.lock().await;
        locks.get(&id).is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Run `op` while holding the per-record mutation lock for `id`
    async fn with_record_lock<T, F, Fut>(&self, id: i64, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let _shared = self.mutation_gate.read().await;

        let lock = {
            let mut locks = self.record_locks.lock().await;
            Arc::clone(locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))))
        };

        let result = {
            let _guard = lock.lock().await;
            op().await
        };

        let mut locks = self.record_locks.lock().await;
        drop(lock);
        if locks
            .get(&id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(&id);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Coordinates;
    use crate::store::SqliteRecordStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Store whose next `list_all` stalls after reading its rows
    struct StallingStore {
        inner: SqliteRecordStore,
        stall_next_list: AtomicBool,
    }

    #[async_trait]
    impl RecordStore for StallingStore {
        async fn initialize(&self) -> Result<bool> {
            self.inner.initialize().await
        }

        async fn add(&self, record: NewRecord) -> Result<i64> {
            self.inner.add(record).await
        }

        async fn get_by_id(&self, id: i64) -> Result<Option<MediaRecord>> {
            self.inner.get_by_id(id).await
        }

        async fn update(&self, id: i64, name: &str) -> Result<usize> {
            self.inner.update(id, name).await
        }

        async fn delete(&self, id: i64) -> Result<usize> {
            self.inner.delete(id).await
        }

        async fn list_all(&self) -> Result<Vec<MediaRecord>> {
            let records = self.inner.list_all().await?;
            if self.stall_next_list.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(records)
        }

        async fn clear(&self) -> Result<usize> {
            self.inner.clear().await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
    }

    fn record(id: i64, name: &str) -> MediaRecord {
        MediaRecord {
            id,
            file_path: format!("/photos/{}", name),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            name: name.to_string(),
        }
    }

    fn new_record(name: &str) -> NewRecord {
        NewRecord::new(
            format!("/photos/{}", name),
            "2024-01-01T00:00:00.000Z",
            Coordinates {
                latitude: 10.0,
                longitude: 20.0,
            },
            name,
        )
    }

    async fn projection() -> (Arc<SqliteRecordStore>, GalleryProjection, EventBus) {
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        store.initialize().await.unwrap();
        let bus = EventBus::new(16);
        let projection = GalleryProjection::new(store.clone(), bus.clone());
        (store, projection, bus)
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let records = vec![
            record(1, "Vacation.jpg"),
            record(2, "image_1_2.jpg"),
            record(3, "VACATION_2.JPG"),
        ];

        let ids: Vec<_> = filter_records(&records, "vacation")
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        assert_eq!(filter_records(&records, "").len(), 3);
        assert_eq!(filter_records(&records, "   ").len(), 3);
        assert!(filter_records(&records, "beach").is_empty());

        // pure: same inputs, same outputs
        assert_eq!(
            filter_records(&records, "IMAGE"),
            filter_records(&records, "image")
        );
    }

    #[tokio::test]
    async fn test_mutations_reload_from_store() {
        let (store, projection, _bus) = projection().await;

        let a = projection.add(new_record("a.jpg")).await.unwrap();
        let b = projection.add(new_record("b.jpg")).await.unwrap();
        assert_eq!(projection.snapshot().len(), 2);

        assert_eq!(projection.rename(a, "beach.jpg").await.unwrap(), 1);
        assert_eq!(projection.get(a).unwrap().name, "beach.jpg");

        assert_eq!(projection.delete(b).await.unwrap(), 1);
        assert!(projection.get(b).is_none());

        assert_eq!(
            projection.snapshot().as_ref(),
            &store.list_all().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_writes() {
        let (store, projection, _bus) = projection().await;
        projection.add(new_record("a.jpg")).await.unwrap();

        // a write that bypassed the projection shows up on the next mutation
        store.add(new_record("external.jpg")).await.unwrap();
        assert_eq!(projection.snapshot().len(), 1);

        projection.rename(1, "renamed.jpg").await.unwrap();
        let names: Vec<_> = projection.snapshot().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["renamed.jpg", "external.jpg"]);
    }

    #[tokio::test]
    async fn test_missing_id_leaves_working_set_unchanged() {
        let (_store, projection, _bus) = projection().await;
        projection.add(new_record("a.jpg")).await.unwrap();
        let before = projection.snapshot();

        assert_eq!(projection.rename(99, "x.jpg").await.unwrap(), 0);
        assert_eq!(projection.delete(99).await.unwrap(), 0);
        assert_eq!(projection.snapshot(), before);
    }

    #[tokio::test]
    async fn test_empty_rename_is_rejected() {
        let (store, projection, _bus) = projection().await;
        let id = projection.add(new_record("a.jpg")).await.unwrap();

        let result = projection.rename(id, "   ").await;
        assert!(matches!(result, Err(GalleryError::Validation { .. })));
        assert_eq!(store.get_by_id(id).await.unwrap().unwrap().name, "a.jpg");
    }

    #[tokio::test]
    async fn test_filtered_view_tracks_query_and_reload() {
        let (_store, projection, _bus) = projection().await;
        projection.add(new_record("sunset.jpg")).await.unwrap();
        projection.add(new_record("beach.jpg")).await.unwrap();

        projection.set_query("SUN");
        assert_eq!(projection.filtered().len(), 1);

        projection.add(new_record("Sunrise.jpg")).await.unwrap();
        assert_eq!(projection.filtered().len(), 2);

        projection.set_query("");
        assert_eq!(projection.filtered().len(), 3);
    }

    #[tokio::test]
    async fn test_reload_publishes_event() {
        let (_store, projection, bus) = projection().await;
        let mut rx = bus.subscribe();

        projection.add(new_record("a.jpg")).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            GalleryEvent::ProjectionReloaded { count: 1 }
        );

        projection.clear().await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            GalleryEvent::ProjectionReloaded { count: 0 }
        );
    }

    #[tokio::test]
    async fn test_record_mutations_are_serialized() {
        let (_store, projection, _bus) = projection().await;
        let projection = Arc::new(projection);
        let id = projection.add(new_record("a.jpg")).await.unwrap();

        let first = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move {
                projection
                    .with_record_lock(id, || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(projection.is_busy(id).await);

        // waits for the first holder, then deletes
        assert_eq!(projection.delete(id).await.unwrap(), 1);
        first.await.unwrap().unwrap();

        assert!(!projection.is_busy(id).await);
        assert!(projection.record_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_reload_never_overwrites_newer_snapshot() {
        let store = Arc::new(StallingStore {
            inner: SqliteRecordStore::open_in_memory().unwrap(),
            stall_next_list: AtomicBool::new(false),
        });
        store.initialize().await.unwrap();
        let projection = Arc::new(GalleryProjection::new(store.clone(), EventBus::new(16)));
        let a = projection.add(new_record("a.jpg")).await.unwrap();
        let b = projection.add(new_record("b.jpg")).await.unwrap();

        store.stall_next_list.store(true, Ordering::SeqCst);
        let rename = {
            let projection = Arc::clone(&projection);
            tokio::spawn(async move { projection.rename(a, "beach.jpg").await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(projection.delete(b).await.unwrap(), 1);
        assert_eq!(rename.await.unwrap().unwrap(), 1);

        let stored = store.list_all().await.unwrap();
        assert_eq!(stored.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a]);
        assert_eq!(projection.snapshot().as_ref(), &stored);
    }

    #[tokio::test]
    async fn test_clear_waits_for_record_mutation() {
        let (store, projection, _bus) = projection().await;
        let projection = Arc::new(projection);
        let id = projection.add(new_record("a.jpg")).await.unwrap();
        let finished = Arc::new(AtomicBool::new(false));

        let held = {
            let projection = Arc::clone(&projection);
            let finished = Arc::clone(&finished);
            tokio::spawn(async move {
                projection
                    .with_record_lock(id, || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        finished.store(true, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(projection.is_busy(id).await);

        assert_eq!(projection.clear().await.unwrap(), 1);
        assert!(finished.load(Ordering::SeqCst));
        held.await.unwrap().unwrap();

        assert!(projection.snapshot().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
