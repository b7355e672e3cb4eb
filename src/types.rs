// Domain Types
// Measurement records, their identity, and the derived comparison/report shapes.
// Derived types (comparisons, trend entries, history rows) are computed on demand
// and never persisted.

use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// One benchmark measurement for a (component, test case, metric, build).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub build: String,
    #[serde(rename = "buildURL", default)]
    pub build_url: String,
    pub component: String,
    pub test_case: String,
    pub metric: String,
    /// Signed percentage bound. Negative: a drop below it regresses.
    /// Positive: a rise above it regresses.
    #[serde(default)]
    pub threshold: f64,
    pub value: f64,
    #[serde(default, alias = "timestamp")]
    pub date_time: String,
    #[serde(default)]
    pub snapshots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_text: Option<String>,
}

impl MeasurementRecord {
    /// Identity key of this record in the store.
    pub fn id(&self) -> RecordId {
        RecordId::new(&self.component, &self.test_case, &self.metric, &self.build)
    }

    /// The (component, test case, metric) coordinate, without the build.
    pub fn series_key(&self) -> SeriesKey {
        SeriesKey {
            component: self.component.clone(),
            test_case: self.test_case.clone(),
            metric: self.metric.clone(),
        }
    }
}

/// Deterministic store key: MD5 hex digest over (component, test case, metric, build).
///
/// Fields are NUL-separated so that `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(component: &str, test_case: &str, metric: &str, build: &str) -> Self {
        let mut ctx = md5::Context::new();
        for (i, part) in [component, test_case, metric, build].iter().enumerate() {
            if i > 0 {
                ctx.consume([0u8]);
            }
            ctx.consume(part.as_bytes());
        }
        Self(format!("{:x}", ctx.compute()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A measurement series: everything in the identity except the build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesKey {
    pub component: String,
    pub test_case: String,
    pub metric: String,
}

impl SeriesKey {
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

/// Lowest and highest build recorded for a test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRange {
    pub min: String,
    pub max: String,
}

/// Outcome of classifying one metric bucket or report row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Passed,
    Failed,
    /// Data exists historically but one of the compared builds has none,
    /// or the baseline cannot produce a meaningful delta.
    Incomplete,
    /// No data before the earliest recorded build of the test case.
    #[serde(rename = "New Feature")]
    NewFeature,
    /// Present in the previous build, absent from the reported one.
    /// Only produced by the build report.
    Missing,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "Passed",
            Status::Failed => "Failed",
            Status::Incomplete => "Incomplete",
            Status::NewFeature => "New Feature",
            Status::Missing => "Missing",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold wrapper with a total order, so it can be part of a grouping key.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdKey(pub f64);

impl ThresholdKey {
    fn normalized(&self) -> f64 {
        // -0.0 and 0.0 are the same threshold
        if self.0 == 0.0 {
            0.0
        } else {
            self.0
        }
    }
}

impl PartialEq for ThresholdKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ThresholdKey {}

impl PartialOrd for ThresholdKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ThresholdKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().total_cmp(&other.normalized())
    }
}

/// One build's value inside a metric bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResult {
    pub build: String,
    pub snapshots: Vec<String>,
    pub value: f64,
}

/// A (test case, metric, threshold) group within a component, across the compared builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBucket {
    pub metric: String,
    pub test_case: String,
    pub threshold: f64,
    /// One entry per build that has data, ascending by build.
    pub results: Vec<BuildResult>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub component: String,
    pub metrics: Vec<MetricBucket>,
}

/// Flat per-build row, the input of the trend report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub component: String,
    pub test_case: String,
    pub metric: String,
    pub threshold: f64,
    pub value: f64,
}

impl ReportRecord {
    /// The (component, test case, metric) coordinate.
    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(&self.component, &self.test_case, &self.metric)
    }
}

/// A report record classified against its trailing moving average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    pub component: String,
    pub test_case: String,
    pub metric: String,
    pub threshold: f64,
    pub value: f64,
    pub moving_average: f64,
    pub delta: f64,
    pub status: Status,
}

/// One line of the rendered build report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub component: String,
    pub test_case: String,
    pub metric: String,
    pub value: Option<f64>,
    pub moving_average: Option<f64>,
    pub delta: Option<f64>,
    pub status: Status,
}

impl From<TrendEntry> for ReportRow {
    fn from(entry: TrendEntry) -> Self {
        Self {
            component: entry.component,
            test_case: entry.test_case,
            metric: entry.metric,
            value: Some(entry.value),
            moving_average: Some(entry.moving_average),
            delta: Some(entry.delta),
            status: entry.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub build: String,
    pub previous_build: Option<String>,
    pub rows: Vec<ReportRow>,
}

/// A point in a series history, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub build: String,
    pub value: f64,
    #[serde(rename = "buildURL", skip_serializing_if = "Option::is_none", default)]
    pub build_url: Option<String>,
}

/// A point in a series timeline, oldest first.
///
/// Serialized positionally as `[build, value, annotation, annotationText]`
/// so chart libraries can consume rows directly.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub build: String,
    pub value: f64,
    pub annotation: Option<String>,
    pub annotation_text: Option<String>,
}

impl Serialize for TimelineEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.build)?;
        tuple.serialize_element(&self.value)?;
        tuple.serialize_element(&self.annotation)?;
        tuple.serialize_element(&self.annotation_text)?;
        tuple.end()
    }
}
