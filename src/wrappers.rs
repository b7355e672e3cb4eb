// Wrapper Components
// Decorators that add cross-cutting behavior to any RecordStore.
// No wrapper here retries: a failing store call fails the operation.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::contracts::RecordStore;
use crate::observability::*;
use crate::types::{BuildRange, MeasurementRecord, RecordId, SeriesKey};

/// Store wrapper that adds automatic tracing to all operations
pub struct TracedStore<S: RecordStore> {
    inner: S,
    trace_id: Uuid,
    operation_count: AtomicU64,
}

impl<S: RecordStore> TracedStore<S> {
    /// Wrap a store implementation with tracing
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            trace_id: Uuid::new_v4(),
            operation_count: AtomicU64::new(0),
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Number of store calls made through this wrapper
    pub fn operation_count(&self) -> u64 {
        self.operation_count.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn context(&self, name: &str) -> OperationContext {
        self.operation_count.fetch_add(1, Ordering::Relaxed);
        let mut ctx = OperationContext::new(name);
        ctx.add_attribute("store_trace_id", self.trace_id.to_string());
        ctx
    }

    fn log_lookup<T>(&self, ctx: &OperationContext, kind: &str, result: &Result<Option<T>>) {
        let found = matches!(result, Ok(Some(_)));
        log_operation(
            ctx,
            &Operation::RangeLookup {
                kind: kind.to_string(),
                found,
            },
            &result.as_ref().map(|_| ()),
        );
    }

    fn log_scan(&self, ctx: &OperationContext, start: Instant, result: &Result<Vec<MeasurementRecord>>) {
        if let Ok(rows) = result {
            debug!(
                "[{}] {} returned {} rows",
                self.trace_id,
                ctx.operation,
                rows.len()
            );
        }
        record_metric(MetricType::Histogram {
            name: "store.scan.duration",
            value: start.elapsed().as_millis() as f64,
            unit: "ms",
        });
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for TracedStore<S> {
    async fn upsert(&self, id: &RecordId, record: MeasurementRecord) -> Result<()> {
        let mut ctx = self.context("store.upsert");
        ctx.add_attribute("record_id", id.to_string());
        let op = Operation::Ingest {
            record_id: id.to_string(),
            build: record.build.clone(),
        };

        let result = self.inner.upsert(id, record).await;
        log_operation(&ctx, &op, &result);
        result
    }

    async fn get(&self, id: &RecordId) -> Result<Option<MeasurementRecord>> {
        let ctx = self.context("store.get");
        let result = self.inner.get(id).await;
        self.log_lookup(&ctx, "record", &result);
        result
    }

    async fn count(&self) -> Result<usize> {
        self.context("store.count");
        self.inner.count().await
    }

    async fn distinct_builds(&self) -> Result<Vec<String>> {
        let ctx = self.context("store.distinct_builds");
        let result = self.inner.distinct_builds().await;
        if let Ok(builds) = &result {
            debug!("[{}] {} builds", self.trace_id, builds.len());
        }
        log_operation(
            &ctx,
            &Operation::RangeLookup {
                kind: "distinct_builds".to_string(),
                found: result.as_ref().map(|b| !b.is_empty()).unwrap_or(false),
            },
            &result.as_ref().map(|_| ()),
        );
        result
    }

    async fn build_range(&self, test_case: &str) -> Result<Option<BuildRange>> {
        let mut ctx = self.context("store.build_range");
        ctx.add_attribute("test_case", test_case);
        let result = self.inner.build_range(test_case).await;
        self.log_lookup(&ctx, "build_range", &result);
        result
    }

    async fn previous_build(&self, build: &str) -> Result<Option<String>> {
        let mut ctx = self.context("store.previous_build");
        ctx.add_attribute("build", build);
        let result = self.inner.previous_build(build).await;
        self.log_lookup(&ctx, "previous_build", &result);
        result
    }

    async fn records_for_builds(&self, builds: &[&str]) -> Result<Vec<MeasurementRecord>> {
        let ctx = self.context("store.records_for_builds");
        let start = Instant::now();
        let result = self.inner.records_for_builds(builds).await;
        self.log_scan(&ctx, start, &result);
        result
    }

    async fn series(
        &self,
        component: &str,
        test_case: &str,
        metric: &str,
    ) -> Result<Vec<MeasurementRecord>> {
        let ctx = self.context("store.series");
        let start = Instant::now();
        let result = self.inner.series(component, test_case, metric).await;
        self.log_scan(&ctx, start, &result);
        result
    }

    async fn recent_before(
        &self,
        series: &SeriesKey,
        before: &str,
        limit: usize,
    ) -> Result<Vec<MeasurementRecord>> {
        let ctx = self.context("store.recent_before");
        let start = Instant::now();
        let result = self.inner.recent_before(series, before, limit).await;
        self.log_scan(&ctx, start, &result);
        result
    }
}

/// Wrap a store with the standard decorator stack
pub fn create_wrapped_store<S: RecordStore>(inner: S) -> TracedStore<S> {
    TracedStore::new(inner)
}
