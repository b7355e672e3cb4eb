// ComparisonService - Two-build comparison with per-bucket status
//
// Records of both builds are pulled in one store call and grouped in-process.
// Buckets with data for only one build need the test case's build range, which
// is looked up at most once per test case.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::contracts::RecordStore;
use crate::error::{EngineError, EngineResult};
use crate::observability::{log_operation, with_trace_id, Operation, OperationContext};
use crate::pure::{classify_pair, classify_single, group_for_comparison, MetricGroup};
use crate::types::{BuildRange, BuildResult, ComparisonResult, MetricBucket, Status};
use crate::validation;

pub const DEFAULT_SNAPSHOT_BASE_URL: &str = "http://cbmonitor.sc.couchbase.com/reports/html/";

pub struct ComparisonService {
    store: Arc<dyn RecordStore>,
    snapshot_base_url: Option<String>,
}

impl ComparisonService {
    /// `snapshot_base_url` enables report links on buckets; `None` disables them
    pub fn new(store: Arc<dyn RecordStore>, snapshot_base_url: Option<String>) -> Self {
        Self {
            store,
            snapshot_base_url,
        }
    }

    pub async fn compare(&self, build1: &str, build2: &str) -> EngineResult<Vec<ComparisonResult>> {
        validation::query::validate_build_pair(build1, build2)?;

        with_trace_id("compare", async {
            let ctx = OperationContext::new("compare");
            let records = self.store.records_for_builds(&[build1, build2]).await?;
            let groups = group_for_comparison(records, build1, build2);

            let mut ranges: HashMap<String, Option<BuildRange>> = HashMap::new();
            let mut out = Vec::with_capacity(groups.len());
            let mut bucket_count = 0;

            for group in groups {
                let mut metrics = Vec::with_capacity(group.metrics.len());
                for metric in group.metrics {
                    let status = self.classify(&metric, build1, build2, &mut ranges).await;
                    metrics.push(self.bucket(metric, status));
                }
                bucket_count += metrics.len();
                out.push(ComparisonResult {
                    component: group.component,
                    metrics,
                });
            }

            log_operation::<EngineError>(
                &ctx,
                &Operation::Compare {
                    build1: build1.to_string(),
                    build2: build2.to_string(),
                    bucket_count,
                },
                &Ok(()),
            );
            Ok::<_, EngineError>(out)
        })
        .await
    }

    async fn classify(
        &self,
        group: &MetricGroup,
        build1: &str,
        build2: &str,
        ranges: &mut HashMap<String, Option<BuildRange>>,
    ) -> Status {
        match group.results.as_slice() {
            [baseline, current] => classify_pair(baseline, current, group.threshold),
            [present] => {
                if !ranges.contains_key(&group.test_case) {
                    let range = self.lookup_range(&group.test_case).await;
                    ranges.insert(group.test_case.clone(), range);
                }
                let range = ranges.get(&group.test_case).and_then(Option::as_ref);
                classify_single(&present.build, build1, build2, range)
            }
            // Groups are never emitted empty and hold at most one result per build
            _ => Status::Incomplete,
        }
    }

    /// A failed lookup classifies the bucket as Incomplete instead of failing the comparison
    async fn lookup_range(&self, test_case: &str) -> Option<BuildRange> {
        match self.store.build_range(test_case).await {
            Ok(range) => range,
            Err(e) => {
                warn!(test_case = %test_case, error = ?e, "Build range lookup failed");
                None
            }
        }
    }

    fn bucket(&self, group: MetricGroup, status: Status) -> MetricBucket {
        let reports = match &self.snapshot_base_url {
            Some(base) => snapshot_reports(base, &group.results),
            None => Vec::new(),
        };
        MetricBucket {
            metric: group.metric,
            test_case: group.test_case,
            threshold: group.threshold,
            results: group.results,
            status,
            reports,
        }
    }
}

/// Links to the snapshot reports of both builds, in build order.
///
/// Only produced when both builds have data and the same number of snapshots.
pub fn snapshot_reports(base: &str, results: &[BuildResult]) -> Vec<String> {
    match results {
        [first, second] if first.snapshots.len() == second.snapshots.len() => results
            .iter()
            .flat_map(|r| r.snapshots.iter())
            .map(|snapshot| format!("{base}?snapshot={snapshot}"))
            .collect(),
        _ => Vec::new(),
    }
}
