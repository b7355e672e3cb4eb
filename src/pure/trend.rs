// Trend Pure Functions
// Trailing moving average used as the regression baseline of a single build.

use crate::pure::classify::classify_trend;
use crate::types::{MeasurementRecord, ReportRecord, TrendEntry};

/// How many preceding records feed the moving average
pub const MOVING_AVERAGE_WINDOW: usize = 3;

/// Mean value of the preceding records.
///
/// `None` when there is no history, or when the mean is not strictly positive.
/// Such entries are dropped from the trend report rather than flagged.
pub fn moving_average(prior: &[MeasurementRecord]) -> Option<f64> {
    if prior.is_empty() {
        return None;
    }
    let window = &prior[..prior.len().min(MOVING_AVERAGE_WINDOW)];
    let avg = window.iter().map(|r| r.value).sum::<f64>() / window.len() as f64;
    (avg > 0.0 && avg.is_finite()).then_some(avg)
}

/// Classify one build record against the records preceding it.
///
/// `prior` must already be ordered most recent first.
pub fn trend_entry(record: &ReportRecord, prior: &[MeasurementRecord]) -> Option<TrendEntry> {
    let moving_average = moving_average(prior)?;
    let (delta, status) = classify_trend(record.value, moving_average, record.threshold)?;
    Some(TrendEntry {
        component: record.component.clone(),
        test_case: record.test_case.clone(),
        metric: record.metric.clone(),
        threshold: record.threshold,
        value: record.value,
        moving_average,
        delta,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    fn prior(values: &[f64]) -> Vec<MeasurementRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MeasurementRecord {
                build: format!("build-{:03}", 100 - i),
                build_url: String::new(),
                component: "kv".to_string(),
                test_case: "get".to_string(),
                metric: "ops".to_string(),
                threshold: -5.0,
                value: *v,
                date_time: String::new(),
                snapshots: vec![],
                annotation: None,
                annotation_text: None,
            })
            .collect()
    }

    fn report_record(value: f64, threshold: f64) -> ReportRecord {
        ReportRecord {
            component: "kv".to_string(),
            test_case: "get".to_string(),
            metric: "ops".to_string(),
            threshold,
            value,
        }
    }

    #[test]
    fn test_average_uses_at_most_three() {
        assert_eq!(moving_average(&prior(&[10.0, 20.0, 30.0, 1000.0])), Some(20.0));
    }

    #[test]
    fn test_short_history_still_averages() {
        assert_eq!(moving_average(&prior(&[10.0, 20.0])), Some(15.0));
    }

    #[test]
    fn test_no_history_is_dropped() {
        assert_eq!(moving_average(&[]), None);
        assert_eq!(trend_entry(&report_record(1.0, -5.0), &[]), None);
    }

    #[test]
    fn test_non_positive_average_is_dropped() {
        assert_eq!(moving_average(&prior(&[0.0, 0.0])), None);
        assert_eq!(moving_average(&prior(&[-4.0, 2.0])), None);
    }

    #[test]
    fn test_trend_entry_classifies_against_average() {
        let entry = trend_entry(&report_record(92.0, -5.0), &prior(&[100.0, 90.0, 110.0]))
            .expect("entry");
        assert_eq!(entry.moving_average, 100.0);
        assert!((entry.delta - -8.0).abs() < 1e-9);
        assert_eq!(entry.status, Status::Failed);

        let entry = trend_entry(&report_record(99.0, -5.0), &prior(&[100.0])).expect("entry");
        assert_eq!(entry.status, Status::Passed);
    }
}
