// File Store Integration Tests
// Services running against the traced file store, including concurrent ingest

use anyhow::Result;
use perfdaily::{
    create_file_store, HistoryService, IngestService, MeasurementRecord, RecordStore,
    ReportService, SeriesQuery, Status,
};
use std::sync::Arc;
use tempfile::TempDir;

fn record(build: &str, value: f64) -> MeasurementRecord {
    MeasurementRecord {
        build: build.to_string(),
        build_url: String::new(),
        component: "index".to_string(),
        test_case: "scan_throughput".to_string(),
        metric: "items_per_sec".to_string(),
        threshold: -10.0,
        value,
        date_time: "2015-06-01T00:00:00Z".to_string(),
        snapshots: vec![],
        annotation: None,
        annotation_text: None,
    }
}

async fn open(temp_dir: &TempDir) -> Result<Arc<dyn RecordStore>> {
    Ok(Arc::new(
        create_file_store(&temp_dir.path().to_string_lossy()).await?,
    ))
}

#[tokio::test]
async fn test_concurrent_duplicate_ingest_keeps_one_record() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = open(&temp_dir).await?;
    let ingest = Arc::new(IngestService::new(store.clone()));

    let mut handles = Vec::new();
    for i in 0..16 {
        let ingest = ingest.clone();
        handles.push(tokio::spawn(async move {
            ingest.ingest(record("build-001", f64::from(i))).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(store.count().await?, 1);
    assert_eq!(store.distinct_builds().await?, vec!["build-001"]);

    // Whatever write landed last is what a reopened store sees
    let in_memory = store.get(&record("build-001", 0.0).id()).await?;
    let reopened = open(&temp_dir).await?;
    assert_eq!(reopened.get(&record("build-001", 0.0).id()).await?, in_memory);
    Ok(())
}

#[tokio::test]
async fn test_report_and_history_after_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    {
        let ingest = IngestService::new(open(&temp_dir).await?);
        let stored = ingest
            .ingest_all(vec![
                record("build-001", 1000.0),
                record("build-002", 1100.0),
                record("build-003", 900.0),
                record("build-004", 950.0),
            ])
            .await?;
        assert_eq!(stored, 4);
    }

    let store = open(&temp_dir).await?;
    let report = ReportService::new(store.clone()).report("build-004").await?;
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].moving_average, Some(1000.0));
    assert_eq!(report.rows[0].status, Status::Passed);

    let history = HistoryService::new(store)
        .history(&SeriesQuery::new("index", "scan_throughput", "items_per_sec"))
        .await?;
    let values: Vec<f64> = history.iter().map(|h| h.value).collect();
    assert_eq!(values, vec![950.0, 900.0, 1100.0, 1000.0]);
    Ok(())
}
