// File-based Record Store
// One pretty-printed JSON file per record, named by its identity, under
// `<root>/records/`. All records are loaded into an in-memory index on open;
// upserts write through to disk before the index is updated.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::contracts::{scan, RecordStore};
use crate::types::{BuildRange, MeasurementRecord, RecordId, SeriesKey};
use crate::validation;
use crate::wrappers::{create_wrapped_store, TracedStore};

pub struct FileStore {
    /// Root directory for the store
    root: PathBuf,
    /// In-memory copy of every record, keyed by identity
    records: RwLock<HashMap<RecordId, MeasurementRecord>>,
}

impl FileStore {
    /// Open (or create) a store rooted at `path`
    pub async fn open(path: &str) -> Result<Self> {
        validation::path::validate_storage_directory_path(path)
            .with_context(|| format!("Invalid store directory: {path}"))?;

        let store = Self {
            root: PathBuf::from(path),
            records: RwLock::new(HashMap::new()),
        };

        store.ensure_directories().await?;
        let loaded = store.load_existing_records().await?;
        info!("Opened file store at {} with {} records", path, loaded);

        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn records_dir(&self) -> PathBuf {
        self.root.join("records")
    }

    fn record_file_path(&self, id: &RecordId) -> PathBuf {
        self.records_dir().join(format!("{id}.json"))
    }

    async fn ensure_directories(&self) -> Result<()> {
        let dir = self.records_dir();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create directory: {}", dir.display()))
    }

    /// Load existing records from disk into memory, returning how many were loaded
    async fn load_existing_records(&self) -> Result<usize> {
        let dir = self.records_dir();
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read records directory: {}", dir.display()))?;

        let mut loaded = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read record file: {}", path.display()))?;
            let record: MeasurementRecord = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse record file: {}", path.display()))?;
            loaded.push(record);
        }

        let count = loaded.len();
        let mut records = self.records.write().await;
        for record in loaded {
            records.insert(record.id(), record);
        }
        Ok(count)
    }

    /// Write via a temp file and rename so readers never see a torn record
    async fn write_record(&self, id: &RecordId, record: &MeasurementRecord) -> Result<()> {
        let target = self.record_file_path(id);
        let tmp = self
            .records_dir()
            .join(format!("{id}.json.tmp-{}", Uuid::new_v4()));
        let content =
            serde_json::to_string_pretty(record).context("Failed to serialize record")?;

        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write record file: {}", tmp.display()))?;
        fs::rename(&tmp, &target)
            .await
            .with_context(|| format!("Failed to move record into place: {}", target.display()))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn upsert(&self, id: &RecordId, record: MeasurementRecord) -> Result<()> {
        // Hold the write lock across the disk write so disk and memory agree on the last writer
        let mut records = self.records.write().await;
        self.write_record(id, &record).await?;
        records.insert(id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<MeasurementRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn distinct_builds(&self) -> Result<Vec<String>> {
        Ok(scan::distinct_builds(self.records.read().await.values()))
    }

    async fn build_range(&self, test_case: &str) -> Result<Option<BuildRange>> {
        Ok(scan::build_range(
            self.records.read().await.values(),
            test_case,
        ))
    }

    async fn previous_build(&self, build: &str) -> Result<Option<String>> {
        Ok(scan::previous_build(self.records.read().await.values(), build))
    }

    async fn records_for_builds(&self, builds: &[&str]) -> Result<Vec<MeasurementRecord>> {
        Ok(scan::records_for_builds(
            self.records.read().await.values(),
            builds,
        ))
    }

    async fn series(
        &self,
        component: &str,
        test_case: &str,
        metric: &str,
    ) -> Result<Vec<MeasurementRecord>> {
        Ok(scan::series(
            self.records.read().await.values(),
            component,
            test_case,
            metric,
        ))
    }

    async fn recent_before(
        &self,
        series: &SeriesKey,
        before: &str,
        limit: usize,
    ) -> Result<Vec<MeasurementRecord>> {
        Ok(scan::recent_before(
            self.records.read().await.values(),
            series,
            before,
            limit,
        ))
    }
}

/// Open a FileStore wrapped with operation tracing.
///
/// This is the recommended way to create a store for the server and CLI.
pub async fn create_file_store(path: &str) -> Result<TracedStore<FileStore>> {
    let base = FileStore::open(path).await?;
    Ok(create_wrapped_store(base))
}
