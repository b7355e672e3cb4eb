// Pure Functions
// Grouping, classification and rendering with no I/O. Services feed these with
// rows read from the store and wrap the results in logging.

pub mod aggregate;
pub mod classify;
pub mod table;
pub mod trend;

pub use aggregate::{group_for_comparison, group_for_report, ComponentGroup, MetricGroup};
pub use classify::{classify_pair, classify_single, classify_trend, delta_percent, eval_status};
pub use table::{format_delta, format_with_commas, render_report};
pub use trend::{moving_average, trend_entry, MOVING_AVERAGE_WINDOW};
