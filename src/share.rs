use crate::config::{Platform, ShareConfig};
use crate::error::{GalleryError, Result, ShareError};
use crate::record::MediaRecord;
use crate::store::RecordStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Primary plus exactly one fallback
const MAX_SHARE_ATTEMPTS: usize = 2;

/// Result of a filesystem metadata query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub exists: bool,
    pub size: u64,
}

/// Filesystem collaborator
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn get_info(&self, path: &str) -> io::Result<FileInfo>;
}

/// Platform-specific share descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShareParams {
    /// Rich metadata, used on iOS
    Rich {
        uti: String,
        dialog_title: String,
        subject: String,
        message: String,
    },
    /// MIME type and dialog title, used everywhere else
    Generic {
        mime_type: String,
        dialog_title: String,
    },
}

impl ShareParams {
    pub fn for_record(record: &MediaRecord, platform: Platform, dialog_title: &str) -> Self {
        match platform {
            Platform::Ios => ShareParams::Rich {
                uti: "public.jpeg".to_string(),
                dialog_title: dialog_title.to_string(),
                subject: record.name.clone(),
                message: format!("Captured {}", record.timestamp),
            },
            Platform::Android | Platform::Other => ShareParams::Generic {
                mime_type: "image/jpeg".to_string(),
                dialog_title: dialog_title.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareAction {
    Shared,
    Dismissed,
}

/// One way of handing a file to the platform's share surface
#[async_trait]
pub trait ShareStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn share(
        &self,
        path: &str,
        params: &ShareParams,
    ) -> std::result::Result<ShareAction, ShareError>;
}

/// What a successful share went through
#[derive(Debug, Clone, PartialEq)]
pub struct ShareReport {
    pub record_id: i64,
    pub mechanism: String,
    pub action: ShareAction,
    pub used_fallback: bool,
}

/// `FileSystem` over the local disk
#[derive(Debug, Default, Clone)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn get_info(&self, path: &str) -> io::Result<FileInfo> {
        let local = path.strip_prefix("file://").unwrap_or(path);

        match tokio::fs::metadata(local).await {
            Ok(metadata) => Ok(FileInfo {
                exists: metadata.is_file(),
                size: metadata.len(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileInfo {
                exists: false,
                size: 0,
            }),
            Err(e) => Err(e),
        }
    }
}

/// Verifies a record's backing file, then shares it through the configured strategies
pub struct SharePipeline {
    store: Arc<dyn RecordStore>,
    filesystem: Arc<dyn FileSystem>,
    strategies: Vec<Arc<dyn ShareStrategy>>,
    config: ShareConfig,
}

impl SharePipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        filesystem: Arc<dyn FileSystem>,
        mut strategies: Vec<Arc<dyn ShareStrategy>>,
        config: ShareConfig,
    ) -> Self {
        if strategies.len() > MAX_SHARE_ATTEMPTS {
            warn!(
                "{} share strategies configured, only the first {} are used",
                strategies.len(),
                MAX_SHARE_ATTEMPTS
            );
            strategies.truncate(MAX_SHARE_ATTEMPTS);
        }

        Self {
            store,
            filesystem,
            strategies,
            config,
        }
    }

    pub async fn share(&self, id: i64) -> Result<ShareReport> {
        let record = match self.store.get_by_id(id).await? {
            Some(record) => record,
            None => return Err(GalleryError::NotFound { id }),
        };

        self.verify_file(&record).await?;

        let params =
            ShareParams::for_record(&record, self.config.platform, &self.config.dialog_title);
        debug!(
            "Sharing record {} on {} with {:?}",
            id,
            self.config.platform.as_str(),
            params
        );

        let mut attempts = Vec::new();

        for (index, strategy) in self.strategies.iter().enumerate() {
            match strategy.share(&record.file_path, &params).await {
                Ok(action) => {
                    info!(
                        "Record {} shared via {} ({:?})",
                        id,
                        strategy.name(),
                        action
                    );
                    return Ok(ShareReport {
                        record_id: id,
                        mechanism: strategy.name().to_string(),
                        action,
                        used_fallback: index > 0,
                    });
                }
                Err(e) => {
                    warn!("Share via {} failed for record {}: {}", strategy.name(), id, e);
                    attempts.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        if attempts.is_empty() {
            error!("No share mechanism available for record {}", id);
            return Err(ShareError::Unavailable.into());
        }

        error!("All share mechanisms failed for record {}", id);
        Err(ShareError::Exhausted { attempts }.into())
    }

    /// The store has no referential integrity with the filesystem, so the
    /// file may have been removed or truncated since the record was written.
    async fn verify_file(&self, record: &MediaRecord) -> Result<()> {
        if record.file_path.trim().is_empty() {
            return Err(GalleryError::validation(format!(
                "Record {} has no file path",
                record.id
            )));
        }

        let info = self
            .filesystem
            .get_info(&record.file_path)
            .await
            .map_err(|e| {
                error!("File check failed for {}: {}", record.file_path, e);
                GalleryError::file_access(record.file_path.clone(), e.to_string())
            })?;

        if !info.exists {
            warn!("Backing file for record {} is missing: {}", record.id, record.file_path);
            return Err(GalleryError::file_unavailable(
                record.file_path.as_str(),
                "file does not exist",
            ));
        }

        if info.size == 0 {
            warn!("Backing file for record {} is empty: {}", record.id, record.file_path);
            return Err(GalleryError::file_unavailable(
                record.file_path.as_str(),
                "file is empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryConfig;
    use crate::mock::{MockFileSystem, MockShareStrategy};
    use crate::record::{Coordinates, NewRecord};
    use crate::store::SqliteRecordStore;
    use tempfile::TempDir;

    async fn store_with(path: &str) -> (Arc<SqliteRecordStore>, i64) {
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        store.initialize().await.unwrap();
        let id = store
            .add(NewRecord::new(
                path,
                "2024-01-01T00:00:00.000Z",
                Coordinates {
                    latitude: 37.0,
                    longitude: -122.0,
                },
                "image_1.jpg",
            ))
            .await
            .unwrap();
        (store, id)
    }

    fn share_config(platform: Platform) -> ShareConfig {
        let mut config = GalleryConfig::default().share;
        config.platform = platform;
        config
    }

    fn pipeline(
        store: Arc<SqliteRecordStore>,
        fs: Arc<MockFileSystem>,
        strategies: Vec<Arc<MockShareStrategy>>,
    ) -> SharePipeline {
        SharePipeline::new(
            store,
            fs,
            strategies
                .into_iter()
                .map(|s| s as Arc<dyn ShareStrategy>)
                .collect(),
            share_config(Platform::Android),
        )
    }

    #[tokio::test]
    async fn test_share_uses_primary() {
        let (store, id) = store_with("/photos/a.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        fs.insert("/photos/a.jpg", 2048);
        let primary = Arc::new(MockShareStrategy::succeeding("system"));
        let fallback = Arc::new(MockShareStrategy::succeeding("intent"));

        let report = pipeline(store, fs, vec![primary.clone(), fallback.clone()])
            .share(id)
            .await
            .unwrap();

        assert_eq!(report.mechanism, "system");
        assert!(!report.used_fallback);
        assert_eq!(report.action, ShareAction::Shared);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_share_falls_back_once() {
        let (store, id) = store_with("/photos/a.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        fs.insert("/photos/a.jpg", 2048);
        let primary = Arc::new(MockShareStrategy::failing("system", "no activity"));
        let fallback = Arc::new(MockShareStrategy::succeeding("intent"));

        let report = pipeline(store, fs, vec![primary.clone(), fallback.clone()])
            .share(id)
            .await
            .unwrap();

        assert_eq!(report.mechanism, "intent");
        assert!(report.used_fallback);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
        assert_eq!(fallback.shared_paths(), vec!["/photos/a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_share_exhausted_is_single_error() {
        let (store, id) = store_with("/photos/a.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        fs.insert("/photos/a.jpg", 2048);
        let primary = Arc::new(MockShareStrategy::failing("system", "boom"));
        let fallback = Arc::new(MockShareStrategy::failing("intent", "nope"));
        let extra = Arc::new(MockShareStrategy::succeeding("never"));

        let result = pipeline(store, fs, vec![primary.clone(), fallback.clone(), extra.clone()])
            .share(id)
            .await;

        match result {
            Err(GalleryError::Share(ShareError::Exhausted { attempts })) => {
                assert_eq!(attempts.len(), 2);
            }
            other => panic!("Expected exhausted share error, got {:?}", other),
        }
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
        assert_eq!(extra.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_never_reaches_strategies() {
        let (store, id) = store_with("/photos/gone.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        let primary = Arc::new(MockShareStrategy::succeeding("system"));

        let result = pipeline(store, fs, vec![primary.clone()]).share(id).await;

        assert!(matches!(result, Err(GalleryError::FileUnavailable { .. })));
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_is_unavailable() {
        let (store, id) = store_with("/photos/empty.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        fs.insert("/photos/empty.jpg", 0);
        let primary = Arc::new(MockShareStrategy::succeeding("system"));

        let result = pipeline(store, fs, vec![primary.clone()]).share(id).await;

        assert!(matches!(result, Err(GalleryError::FileUnavailable { .. })));
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_file_query_failure_is_access_error() {
        let (store, id) = store_with("/photos/a.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        fs.fail_with("permission denied");
        let primary = Arc::new(MockShareStrategy::succeeding("system"));

        let result = pipeline(store, fs, vec![primary.clone()]).share(id).await;

        assert!(matches!(result, Err(GalleryError::FileAccess { .. })));
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_record_and_empty_path() {
        let (store, id) = store_with("").await;
        let fs = Arc::new(MockFileSystem::new());
        let primary = Arc::new(MockShareStrategy::succeeding("system"));
        let pipeline = pipeline(store, fs.clone(), vec![primary.clone()]);

        assert!(matches!(
            pipeline.share(id + 100).await,
            Err(GalleryError::NotFound { .. })
        ));
        assert!(matches!(
            pipeline.share(id).await,
            Err(GalleryError::Validation { .. })
        ));
        assert_eq!(fs.calls(), 0);
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_strategies_is_unavailable() {
        let (store, id) = store_with("/photos/a.jpg").await;
        let fs = Arc::new(MockFileSystem::new());
        fs.insert("/photos/a.jpg", 10);

        let result = pipeline(store, fs, vec![]).share(id).await;
        assert!(matches!(
            result,
            Err(GalleryError::Share(ShareError::Unavailable))
        ));
    }

    #[test]
    fn test_platform_params() {
        let record = MediaRecord {
            id: 1,
            file_path: "/photos/a.jpg".to_string(),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            name: "beach.jpg".to_string(),
        };

        match ShareParams::for_record(&record, Platform::Ios, "Share image") {
            ShareParams::Rich { uti, subject, .. } => {
                assert_eq!(uti, "public.jpeg");
                assert_eq!(subject, "beach.jpg");
            }
            other => panic!("Expected rich params, got {:?}", other),
        }

        assert_eq!(
            ShareParams::for_record(&record, Platform::Android, "Share image"),
            ShareParams::Generic {
                mime_type: "image/jpeg".to_string(),
                dialog_title: "Share image".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_local_file_system() {
        let temp_dir = TempDir::new().unwrap();
        let full = temp_dir.path().join("full.jpg");
        let empty = temp_dir.path().join("empty.jpg");
        std::fs::write(&full, b"jpeg bytes").unwrap();
        std::fs::write(&empty, b"").unwrap();

        let fs = LocalFileSystem;

        let info = fs.get_info(full.to_str().unwrap()).await.unwrap();
        assert_eq!(info, FileInfo { exists: true, size: 10 });

        let uri = format!("file://{}", full.display());
        assert!(fs.get_info(&uri).await.unwrap().exists);

        let info = fs.get_info(empty.to_str().unwrap()).await.unwrap();
        assert_eq!(info, FileInfo { exists: true, size: 0 });

        let missing = temp_dir.path().join("missing.jpg");
        let info = fs.get_info(missing.to_str().unwrap()).await.unwrap();
        assert!(!info.exists);
    }
}
