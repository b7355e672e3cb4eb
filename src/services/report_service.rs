// ReportService - Single-build trend report
//
// Each record of the build is compared to the moving average of the same
// series over the builds preceding it. Identities measured in the previous
// build but absent from this one are listed as Missing.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::contracts::RecordStore;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_operation, with_trace_id, Operation, OperationContext};
use crate::pure::{group_for_report, render_report, trend_entry, MOVING_AVERAGE_WINDOW};
use crate::types::{BuildReport, MeasurementRecord, ReportRow, SeriesKey, Status};
use crate::validation;

pub struct ReportService {
    store: Arc<dyn RecordStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Build the typed report for `build`.
    ///
    /// Rows are Missing first, then the classified trend entries ordered by
    /// component, test case and metric. Records without usable history are omitted.
    pub async fn report(&self, build: &str) -> EngineResult<BuildReport> {
        validation::query::validate_build(build)?;

        with_trace_id("report", async {
            let ctx = OperationContext::new("report");
            let current = self.store.records_for_builds(&[build]).await?;
            let present: BTreeSet<SeriesKey> = current.iter().map(|r| r.series_key()).collect();

            let previous_build = self.store.previous_build(build).await?;
            let mut rows = match &previous_build {
                Some(previous) => self.missing_rows(previous, &present).await?,
                None => Vec::new(),
            };

            let mut history: HashMap<SeriesKey, Vec<MeasurementRecord>> = HashMap::new();
            for record in group_for_report(current, build) {
                let key = record.series_key();
                if !history.contains_key(&key) {
                    let prior = self
                        .store
                        .recent_before(&key, build, MOVING_AVERAGE_WINDOW)
                        .await?;
                    history.insert(key.clone(), prior);
                }
                let prior = history.get(&key).map(Vec::as_slice).unwrap_or_default();
                if let Some(entry) = trend_entry(&record, prior) {
                    rows.push(ReportRow::from(entry));
                }
            }

            log_operation::<EngineError>(
                &ctx,
                &Operation::Report {
                    build: build.to_string(),
                    row_count: rows.len(),
                },
                &Ok(()),
            );
            Ok::<_, EngineError>(BuildReport {
                build: build.to_string(),
                previous_build,
                rows,
            })
        })
        .await
    }

    /// The report rendered as a text table
    pub async fn render(&self, build: &str) -> EngineResult<String> {
        let report = self.report(build).await?;
        Ok(render_report(&report))
    }

    async fn missing_rows(
        &self,
        previous: &str,
        present: &BTreeSet<SeriesKey>,
    ) -> EngineResult<Vec<ReportRow>> {
        let earlier = self.store.records_for_builds(&[previous]).await?;
        let missing: BTreeSet<SeriesKey> = earlier
            .iter()
            .map(|r| r.series_key())
            .filter(|key| !present.contains(key))
            .collect();

        Ok(missing
            .into_iter()
            .map(|key| ReportRow {
                component: key.component,
                test_case: key.test_case,
                metric: key.metric,
                value: None,
                moving_average: None,
                delta: None,
                status: Status::Missing,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn record(test_case: &str, metric: &str, build: &str, value: f64) -> MeasurementRecord {
        MeasurementRecord {
            build: build.to_string(),
            build_url: String::new(),
            component: "kv".to_string(),
            test_case: test_case.to_string(),
            metric: metric.to_string(),
            threshold: -5.0,
            value,
            date_time: String::new(),
            snapshots: vec![],
            annotation: None,
            annotation_text: None,
        }
    }

    async fn service(records: Vec<MeasurementRecord>) -> anyhow::Result<ReportService> {
        let store = MemoryStore::new();
        for r in records {
            store.upsert(&r.id(), r).await?;
        }
        Ok(ReportService::new(Arc::new(store)))
    }

    fn summary(report: &BuildReport) -> Vec<(String, String, Status)> {
        report
            .rows
            .iter()
            .map(|r| (r.test_case.clone(), r.metric.clone(), r.status))
            .collect()
    }

    #[tokio::test]
    async fn test_trend_against_three_previous_builds() -> anyhow::Result<()> {
        let service = service(vec![
            record("get", "ops", "build-001", 1000.0),
            record("get", "ops", "build-002", 100.0),
            record("get", "ops", "build-003", 90.0),
            record("get", "ops", "build-004", 110.0),
            record("get", "ops", "build-005", 92.0),
        ])
        .await?;

        let report = service.report("build-005").await?;
        assert_eq!(report.previous_build.as_deref(), Some("build-004"));
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.moving_average, Some(100.0));
        assert_eq!(row.status, Status::Failed);
        Ok(())
    }

    #[tokio::test]
    async fn test_moving_average_is_per_metric() -> anyhow::Result<()> {
        let mut records = Vec::new();
        for build in ["build-001", "build-002", "build-003", "build-004"] {
            let mut mem = record("get", "mem_bytes", build, 100_000.0);
            mem.threshold = 10.0;
            records.push(mem);
            records.push(record("get", "p99", build, 50.0));
        }
        let service = service(records).await?;

        let report = service.report("build-004").await?;
        let averages: Vec<_> = report
            .rows
            .iter()
            .map(|r| (r.metric.as_str(), r.moving_average, r.status))
            .collect();
        assert_eq!(
            averages,
            vec![
                ("mem_bytes", Some(100_000.0), Status::Passed),
                ("p99", Some(50.0), Status::Passed),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_sparse_and_empty_history() -> anyhow::Result<()> {
        let service = service(vec![
            record("get", "ops", "build-001", 10.0),
            record("get", "ops", "build-002", 20.0),
            record("get", "ops", "build-003", 15.0),
            record("fresh", "ops", "build-003", 5.0),
        ])
        .await?;

        let report = service.report("build-003").await?;
        // "fresh" has no history and is left out
        assert_eq!(
            summary(&report),
            vec![("get".to_string(), "ops".to_string(), Status::Passed)]
        );
        assert_eq!(report.rows[0].moving_average, Some(15.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_positive_average_is_omitted() -> anyhow::Result<()> {
        let service = service(vec![
            record("get", "ops", "build-001", 0.0),
            record("get", "ops", "build-002", 7.0),
        ])
        .await?;
        assert!(service.report("build-002").await?.rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_rows_come_first() -> anyhow::Result<()> {
        let service = service(vec![
            record("get", "ops", "build-001", 100.0),
            record("get", "latency", "build-001", 5.0),
            record("get", "ops", "build-002", 100.0),
        ])
        .await?;

        let report = service.report("build-002").await?;
        assert_eq!(
            summary(&report),
            vec![
                ("get".to_string(), "latency".to_string(), Status::Missing),
                ("get".to_string(), "ops".to_string(), Status::Passed),
            ]
        );
        assert_eq!(report.rows[0].value, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_render_lists_missing_before_failed() -> anyhow::Result<()> {
        let service = service(vec![
            record("get", "ops", "build-001", 100.0),
            record("set", "ops", "build-001", 100.0),
            record("get", "ops", "build-002", 50.0),
        ])
        .await?;

        let table = service.render("build-002").await?;
        let missing_at = table.find("Missing").expect("missing row");
        let failed_at = table.find("Failed").expect("failed row");
        assert!(missing_at < failed_at);
        assert!(table.contains("-50.0"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_build_is_empty_report() -> anyhow::Result<()> {
        let service = service(vec![]).await?;
        let report = service.report("build-001").await?;
        assert!(report.rows.is_empty());
        assert_eq!(report.previous_build, None);
        Ok(())
    }
}
