// IngestService - Keyed upsert of benchmark measurements
//
// The record identity is derived from (component, testCase, metric, build);
// re-submitting the same identity replaces the stored record wholesale.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::contracts::RecordStore;
use crate::error::{EngineError, EngineResult};
use crate::observability::with_trace_id;
use crate::types::{MeasurementRecord, RecordId};
use crate::validation;

pub struct IngestService {
    store: Arc<dyn RecordStore>,
}

impl IngestService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validate and store one measurement, returning its identity.
    ///
    /// A record without a timestamp is stamped with the ingest time.
    pub async fn ingest(&self, mut record: MeasurementRecord) -> EngineResult<RecordId> {
        validation::record::validate_for_ingest(&record)?;
        if record.date_time.trim().is_empty() {
            record.date_time = Utc::now().to_rfc3339();
        }

        with_trace_id("ingest", async move {
            let id = record.id();
            debug!(
                record_id = %id,
                component = %record.component,
                test_case = %record.test_case,
                build = %record.build,
                "Ingesting measurement"
            );
            self.store.upsert(&id, record).await?;
            Ok::<_, EngineError>(id)
        })
        .await
    }

    /// Ingest a batch in order; stops at the first failure.
    pub async fn ingest_all(
        &self,
        records: impl IntoIterator<Item = MeasurementRecord>,
    ) -> EngineResult<usize> {
        let mut stored = 0;
        for record in records {
            self.ingest(record).await?;
            stored += 1;
        }
        Ok(stored)
    }
}
