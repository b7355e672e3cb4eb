// In-memory record store
// Used by tests and by `--store memory`; contents are lost on exit.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::contracts::{scan, RecordStore};
use crate::types::{BuildRange, MeasurementRecord, RecordId, SeriesKey};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordId, MeasurementRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, id: &RecordId, record: MeasurementRecord) -> Result<()> {
        self.records.write().await.insert(id.clone(), record);
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
