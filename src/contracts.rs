// Store Contract
// Capabilities the engine needs from its record store. Every engine operation
// receives the store as an explicit `Arc<dyn RecordStore>`; there is no global handle.
//
// Consistency: each call observes the store independently. A comparison that
// reads while a build is being ingested may see only part of that build; there
// is no cross-record transaction.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{BuildRange, MeasurementRecord, RecordId, SeriesKey};

/// Durable keyed storage of measurement records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record stored under `id`
    ///
    /// # Postconditions
    /// - A later `get(id)` returns exactly `record`
    /// - No fields of a previous record under `id` survive (no merge, no append)
    async fn upsert(&self, id: &RecordId, record: MeasurementRecord) -> Result<()>;

    /// Fetch a record by identity
    async fn get(&self, id: &RecordId) -> Result<Option<MeasurementRecord>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;

    /// All distinct builds, ascending
    async fn distinct_builds(&self) -> Result<Vec<String>>;

    /// Min and max build having any record for `test_case`.
    /// `None` when the test case is unknown.
    async fn build_range(&self, test_case: &str) -> Result<Option<BuildRange>>;

    /// Nearest build strictly less than `build` across the whole dataset.
    /// `None` when `build` is at or before the earliest build.
    async fn previous_build(&self, build: &str) -> Result<Option<String>>;

    /// Raw records whose build is one of `builds`, in no particular order
    async fn records_for_builds(&self, builds: &[&str]) -> Result<Vec<MeasurementRecord>>;

    /// All records of one series, ascending by build
    async fn series(
        &self,
        component: &str,
        test_case: &str,
        metric: &str,
    ) -> Result<Vec<MeasurementRecord>>;

    /// Up to `limit` records of one series with build strictly less than
    /// `before`, ordered by build descending. One record per build.
    async fn recent_before(
        &self,
        series: &SeriesKey,
        before: &str,
        limit: usize,
    ) -> Result<Vec<MeasurementRecord>>;
}

/// In-process implementations of the store capabilities over a slice of rows.
///
/// Stores that keep records in memory delegate here so they all agree on
/// ordering and tie-breaking.
pub mod scan {
    use super::*;
    use std::collections::BTreeSet;

    pub fn distinct_builds<'a>(rows: impl Iterator<Item = &'a MeasurementRecord>) -> Vec<String> {
        rows.map(|r| r.build.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn build_range<'a>(
        rows: impl Iterator<Item = &'a MeasurementRecord>,
        test_case: &str,
    ) -> Option<BuildRange> {
        let builds: BTreeSet<&str> = rows
            .filter(|r| r.test_case == test_case)
            .map(|r| r.build.as_str())
            .collect();
        let min = builds.first()?;
        let max = builds.last()?;
        Some(BuildRange {
            min: min.to_string(),
            max: max.to_string(),
        })
    }

    pub fn previous_build<'a>(
        rows: impl Iterator<Item = &'a MeasurementRecord>,
        build: &str,
    ) -> Option<String> {
        rows.filter(|r| r.build.as_str() < build)
            .map(|r| r.build.as_str())
            .max()
            .map(str::to_string)
    }

    pub fn records_for_builds<'a>(
        rows: impl Iterator<Item = &'a MeasurementRecord>,
        builds: &[&str],
    ) -> Vec<MeasurementRecord> {
        rows.filter(|r| builds.contains(&r.build.as_str()))
            .cloned()
            .collect()
    }

    pub fn series<'a>(
        rows: impl Iterator<Item = &'a MeasurementRecord>,
        component: &str,
        test_case: &str,
        metric: &str,
    ) -> Vec<MeasurementRecord> {
        let mut out: Vec<MeasurementRecord> = rows
            .filter(|r| r.component == component && r.test_case == test_case && r.metric == metric)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.build.cmp(&b.build));
        out
    }

    pub fn recent_before<'a>(
        rows: impl Iterator<Item = &'a MeasurementRecord>,
        series: &SeriesKey,
        before: &str,
        limit: usize,
    ) -> Vec<MeasurementRecord> {
        let mut out: Vec<MeasurementRecord> = rows
            .filter(|r| {
                r.component == series.component
                    && r.test_case == series.test_case
                    && r.metric == series.metric
                    && r.build.as_str() < before
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.build.cmp(&a.build));
        out.truncate(limit);
        out
    }
}
