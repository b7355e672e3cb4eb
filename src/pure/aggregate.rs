// Aggregation Pure Functions
// In-process group-by over raw measurement rows.

use std::collections::BTreeMap;

use crate::types::{BuildResult, MeasurementRecord, ReportRecord, ThresholdKey};

/// Records of one (component, test case, metric, threshold) across the compared builds
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroup {
    pub test_case: String,
    pub metric: String,
    pub threshold: f64,
    /// One entry per build with data, ascending by build
    pub results: Vec<BuildResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentGroup {
    pub component: String,
    pub metrics: Vec<MetricGroup>,
}

type GroupKey = (String, String, ThresholdKey);

/// Group every record of `build_a` or `build_b` by (component, test case, metric, threshold).
///
/// Argument order does not matter: results inside a group are ascending by build.
/// Components are ordered by name, groups by test case then metric then threshold.
/// Groups only exist when at least one record matched.
pub fn group_for_comparison(
    records: impl IntoIterator<Item = MeasurementRecord>,
    build_a: &str,
    build_b: &str,
) -> Vec<ComponentGroup> {
    let mut components: BTreeMap<String, BTreeMap<GroupKey, BTreeMap<String, BuildResult>>> =
        BTreeMap::new();

    for record in records {
        if record.build != build_a && record.build != build_b {
            continue;
        }
        let key = (
            record.test_case,
            record.metric,
            ThresholdKey(record.threshold),
        );
        components
            .entry(record.component)
            .or_default()
            .entry(key)
            .or_default()
            .insert(
                record.build.clone(),
                BuildResult {
                    build: record.build,
                    snapshots: record.snapshots,
                    value: record.value,
                },
            );
    }

    components
        .into_iter()
        .map(|(component, groups)| ComponentGroup {
            component,
            metrics: groups
                .into_iter()
                .map(|((test_case, metric, threshold), by_build)| MetricGroup {
                    test_case,
                    metric,
                    threshold: threshold.0,
                    results: by_build.into_values().collect(),
                })
                .collect(),
        })
        .collect()
}

/// Flatten all records of exactly `build`, ordered by component then test case (then metric)
pub fn group_for_report(
    records: impl IntoIterator<Item = MeasurementRecord>,
    build: &str,
) -> Vec<ReportRecord> {
    let mut rows: Vec<ReportRecord> = records
        .into_iter()
        .filter(|r| r.build == build)
        .map(|r| ReportRecord {
            component: r.component,
            test_case: r.test_case,
            metric: r.metric,
            threshold: r.threshold,
            value: r.value,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.component
            .cmp(&b.component)
            .then_with(|| a.test_case.cmp(&b.test_case))
            .then_with(|| a.metric.cmp(&b.metric))
    });
    rows
}
