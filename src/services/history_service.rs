// HistoryService - Read projections of one (component, testCase, metric) series
//
// History is most recent first for tables, the timeline is oldest first for charts.
// Neither classifies anything.

use std::sync::Arc;

use crate::contracts::RecordStore;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_operation, with_trace_id, Operation, OperationContext};
use crate::types::{HistoryEntry, MeasurementRecord, TimelineEntry};
use crate::validation;

/// Series coordinate accepted by history and timeline queries
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub test_case: String,
    #[serde(default)]
    pub metric: String,
}

impl SeriesQuery {
    pub fn new(
        component: impl Into<String>,
        test_case: impl Into<String>,
        metric: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            test_case: test_case.into(),
            metric: metric.into(),
        }
    }
}

pub struct HistoryService {
    store: Arc<dyn RecordStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Values of the series ordered by build descending
    pub async fn history(&self, query: &SeriesQuery) -> EngineResult<Vec<HistoryEntry>> {
        let records = self.load("history", query).await?;
        let entries: Vec<HistoryEntry> = records
            .into_iter()
            .rev()
            .map(|r| HistoryEntry {
                build: r.build,
                value: r.value,
                build_url: Some(r.build_url).filter(|url| !url.is_empty()),
            })
            .collect();

        log_operation::<EngineError>(
            &OperationContext::new("history"),
            &Operation::History {
                test_case: query.test_case.clone(),
                point_count: entries.len(),
            },
            &Ok(()),
        );
        Ok(entries)
    }

    /// Values and annotations of the series ordered by build ascending
    pub async fn timeline(&self, query: &SeriesQuery) -> EngineResult<Vec<TimelineEntry>> {
        let records = self.load("timeline", query).await?;
        let entries: Vec<TimelineEntry> = records
            .into_iter()
            .map(|r| TimelineEntry {
                build: r.build,
                value: r.value,
                annotation: r.annotation,
                annotation_text: r.annotation_text,
            })
            .collect();

        log_operation::<EngineError>(
            &OperationContext::new("timeline"),
            &Operation::Timeline {
                test_case: query.test_case.clone(),
                point_count: entries.len(),
            },
            &Ok(()),
        );
        Ok(entries)
    }

    async fn load(
        &self,
        operation: &str,
        query: &SeriesQuery,
    ) -> EngineResult<Vec<MeasurementRecord>> {
        validation::query::validate_series(&query.component, &query.test_case, &query.metric)?;
        with_trace_id(operation, async {
            let records = self
                .store
                .series(&query.component, &query.test_case, &query.metric)
                .await?;
            Ok::<_, EngineError>(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn record(build: &str, value: f64) -> MeasurementRecord {
        MeasurementRecord {
            build: build.to_string(),
            build_url: format!("http://ci/{build}"),
            component: "kv".to_string(),
            test_case: "get".to_string(),
            metric: "ops".to_string(),
            threshold: -5.0,
            value,
            date_time: String::new(),
            snapshots: vec![],
            annotation: None,
            annotation_text: None,
        }
    }

    async fn service() -> anyhow::Result<HistoryService> {
        let store = MemoryStore::new();
        let mut annotated = record("build-002", 20.0);
        annotated.annotation = Some("A".to_string());
        annotated.annotation_text = Some("new allocator".to_string());
        let mut other_metric = record("build-002", 99.0);
        other_metric.metric = "latency".to_string();
        let mut no_url = record("build-003", 30.0);
        no_url.build_url = String::new();

        for r in [record("build-001", 10.0), annotated, other_metric, no_url] {
            store.upsert(&r.id(), r).await?;
        }
        Ok(HistoryService::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_history_most_recent_first() -> anyhow::Result<()> {
        let service = service().await?;
        let history = service
            .history(&SeriesQuery::new("kv", "get", "ops"))
            .await?;
        let builds: Vec<_> = history.iter().map(|h| h.build.as_str()).collect();
        assert_eq!(builds, vec!["build-003", "build-002", "build-001"]);
        assert_eq!(history[0].build_url, None);
        assert_eq!(history[2].build_url.as_deref(), Some("http://ci/build-001"));
        Ok(())
    }

    #[tokio::test]
    async fn test_timeline_passes_annotations_through() -> anyhow::Result<()> {
        let service = service().await?;
        let timeline = service
            .timeline(&SeriesQuery::new("kv", "get", "ops"))
            .await?;
        let json = serde_json::to_value(&timeline)?;
        assert_eq!(
            json,
            serde_json::json!([
                ["build-001", 10.0, null, null],
                ["build-002", 20.0, "A", "new allocator"],
                ["build-003", 30.0, null, null],
            ])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_history_reversed_matches_timeline() -> anyhow::Result<()> {
        let service = service().await?;
        let query = SeriesQuery::new("kv", "get", "ops");
        let mut history: Vec<(String, f64)> = service
            .history(&query)
            .await?
            .into_iter()
            .map(|h| (h.build, h.value))
            .collect();
        history.reverse();
        let timeline: Vec<(String, f64)> = service
            .timeline(&query)
            .await?
            .into_iter()
            .map(|t| (t.build, t.value))
            .collect();
        assert_eq!(history, timeline);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_coordinate_is_rejected() -> anyhow::Result<()> {
        let service = service().await?;
        let err = service
            .history(&SeriesQuery::new("kv", "", "ops"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("testCase"));
        Ok(())
    }
}
