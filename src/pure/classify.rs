// Classification Pure Functions
// Threshold-sign regression rule shared by build comparisons and the trend report.

use crate::types::{BuildRange, BuildResult, Status};

/// Percentage change of `current` relative to `baseline`.
///
/// Returns `None` when the baseline is not strictly positive or the result is
/// not finite; callers decide what that means for the status.
pub fn delta_percent(baseline: f64, current: f64) -> Option<f64> {
    if baseline.is_nan() || baseline <= 0.0 {
        return None;
    }
    let delta = 100.0 * (current / baseline - 1.0);
    delta.is_finite().then_some(delta)
}

/// Apply the threshold-sign rule to a delta.
///
/// A negative threshold fails when the value dropped further than it,
/// a positive threshold fails when the value rose further than it.
/// A zero threshold never fails.
pub fn eval_status(delta: f64, threshold: f64) -> Status {
    if threshold < 0.0 && delta < threshold {
        return Status::Failed;
    }
    if threshold > 0.0 && delta > threshold {
        return Status::Failed;
    }
    Status::Passed
}

/// Classify a two-build bucket whose results are ascending by build.
///
/// A baseline that cannot produce a delta is `Incomplete`.
pub fn classify_pair(baseline: &BuildResult, current: &BuildResult, threshold: f64) -> Status {
    match delta_percent(baseline.value, current.value) {
        Some(delta) => eval_status(delta, threshold),
        None => Status::Incomplete,
    }
}

/// Classify a bucket where only `present_build` has data.
///
/// `range` is the test case's recorded build range, `None` when it could not be
/// looked up. The build with no data is `New Feature` territory only if it
/// predates the earliest build of the test case.
pub fn classify_single(
    present_build: &str,
    build_a: &str,
    build_b: &str,
    range: Option<&BuildRange>,
) -> Status {
    let missing_build = if present_build == build_a {
        build_b
    } else {
        build_a
    };

    // Comparing a build with itself: nothing is missing
    if missing_build == present_build {
        return Status::Passed;
    }

    match range {
        Some(range) if missing_build < range.min.as_str() => Status::NewFeature,
        _ => Status::Incomplete,
    }
}

/// Delta of a value against its trailing moving average, and its status.
pub fn classify_trend(value: f64, moving_average: f64, threshold: f64) -> Option<(f64, Status)> {
    let delta = delta_percent(moving_average, value)?;
    Some((delta, eval_status(delta, threshold)))
}
