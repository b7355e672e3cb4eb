// Centralized Observability Infrastructure for perfdaily
// Structured logging, lightweight counters, and trace-scoped operation logging.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

// Global atomic counters for metrics
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(0);
static ERROR_COUNTER: AtomicU64 = AtomicU64::new(0);
static INGEST_COUNTER: AtomicU64 = AtomicU64::new(0);
static QUERY_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const DEFAULT_LEVEL: &str = "warn";
const VERBOSE_FILTER: &str = "perfdaily=debug,info";
const QUIET_FILTER: &str = "error";

/// Initialize the logging and tracing infrastructure.
/// This should be called once at application startup
pub fn init_logging() -> Result<()> {
    init_logging_with_level(false, false, DEFAULT_LEVEL)
}

/// Initialize logging with configurable verbosity.
///
/// `level` is the configured crate log level (`[logging] level`); `--verbose`
/// raises it to debug, `--quiet` and `RUST_LOG` replace it.
pub fn init_logging_with_level(verbose: bool, quiet: bool, level: &str) -> Result<()> {
    let env_filter = if quiet {
        // --quiet wins over RUST_LOG
        EnvFilter::new(QUIET_FILTER)
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose, level))
    } else {
        default_filter(verbose, level)
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!quiet)
        .with_thread_ids(!quiet)
        .with_line_number(!quiet)
        .with_file(!quiet)
        .with_ansi(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => {
            if !quiet {
                info!("perfdaily observability initialized");
            }
            Ok(())
        }
        // Already initialized, which is fine in test environments
        Err(_) => Ok(()),
    }
}

/// Filter used when neither --quiet nor RUST_LOG decide
pub fn default_filter(verbose: bool, level: &str) -> EnvFilter {
    EnvFilter::try_new(filter_directives(verbose, level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(false, DEFAULT_LEVEL)))
}

fn filter_directives(verbose: bool, level: &str) -> String {
    if verbose {
        VERBOSE_FILTER.to_string()
    } else {
        format!("perfdaily={},error", level.trim().to_ascii_lowercase())
    }
}

/// Represents different types of operations for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    Ingest {
        record_id: String,
        build: String,
    },
    RangeLookup {
        kind: String,
        found: bool,
    },
    Compare {
        build1: String,
        build2: String,
        bucket_count: usize,
    },
    Report {
        build: String,
        row_count: usize,
    },
    History {
        test_case: String,
        point_count: usize,
    },
    Timeline {
        test_case: String,
        point_count: usize,
    },
    Startup {
        version: String,
    },
    Shutdown {
        reason: String,
    },
}

/// Metric types for performance monitoring
#[derive(Debug, Clone)]
pub enum MetricType {
    Counter {
        name: &'static str,
        value: u64,
    },
    Gauge {
        name: &'static str,
        value: f64,
    },
    Histogram {
        name: &'static str,
        value: f64,
        unit: &'static str,
    },
    Timer {
        name: &'static str,
        duration: Duration,
    },
}

/// Operation context for tracing through the system
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub parent_span_id: Option<Uuid>,
    pub operation: String,
    pub start_time: Instant,
    pub attributes: Vec<(String, String)>,
}

impl OperationContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            operation: operation.into(),
            start_time: Instant::now(),
            attributes: Vec::new(),
        }
    }

    pub fn child(&self, operation: impl Into<String>) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(self.span_id),
            operation: operation.into(),
            start_time: Instant::now(),
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Log an operation with full context
#[instrument(skip(ctx, result))]
pub fn log_operation<E: Display>(
    ctx: &OperationContext,
    op: &Operation,
    result: &std::result::Result<(), E>,
) {
    let elapsed = ctx.elapsed();
    let attrs = ctx
        .attributes
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ");

    match result {
        Ok(()) => {
            debug!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                parent_span_id = ?ctx.parent_span_id,
                operation = %ctx.operation,
                elapsed_ms = elapsed.as_millis(),
                attributes = %attrs,
                "Operation completed: {:?}", op
            );
            OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            error!(
                trace_id = %ctx.trace_id,
                span_id = %ctx.span_id,
                parent_span_id = ?ctx.parent_span_id,
                operation = %ctx.operation,
                elapsed_ms = elapsed.as_millis(),
                attributes = %attrs,
                error = %e,
                "Operation failed: {:?}", op
            );
            ERROR_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
    }

    match op {
        Operation::Ingest { .. } => {
            INGEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
        Operation::RangeLookup { .. }
        | Operation::Compare { .. }
        | Operation::Report { .. }
        | Operation::History { .. }
        | Operation::Timeline { .. } => {
            QUERY_COUNTER.fetch_add(1, Ordering::Relaxed);
        }
        _ => {}
    }
}

/// Record a metric
pub fn record_metric(metric: MetricType) {
    match metric {
        MetricType::Counter { name, value } => debug!("metric.counter {} = {}", name, value),
        MetricType::Gauge { name, value } => debug!("metric.gauge {} = {}", name, value),
        MetricType::Histogram { name, value, unit } => {
            debug!("metric.histogram {} = {} {}", name, value, unit)
        }
        MetricType::Timer { name, duration } => debug!("metric.timer {} = {:?}", name, duration),
    }
}

/// Execute a future with a trace context
pub async fn with_trace_id<F, T, E>(operation: &str, f: F) -> std::result::Result<T, E>
where
    F: std::future::Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let ctx = OperationContext::new(operation);
    let trace_id = ctx.trace_id;
    let span_id = ctx.span_id;

    debug!(
        trace_id = %trace_id,
        span_id = %span_id,
        "Starting operation: {}", operation
    );

    let start = Instant::now();
    let result = f.await;
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => {
            info!(
                trace_id = %trace_id,
                span_id = %span_id,
                elapsed_ms = elapsed.as_millis(),
                "Operation completed successfully: {}", operation
            );
            record_metric(MetricType::Timer {
                name: "operation.duration",
                duration: elapsed,
            });
        }
        Err(e) => {
            error!(
                trace_id = %trace_id,
                span_id = %span_id,
                elapsed_ms = elapsed.as_millis(),
                error = %e,
                "Operation failed: {}", operation
            );
            record_metric(MetricType::Counter {
                name: "operation.errors",
                value: 1,
            });
        }
    }

    result
}

/// Get current metrics snapshot
pub fn get_metrics() -> serde_json::Value {
    serde_json::json!({
        "operations": {
            "total": OPERATION_COUNTER.load(Ordering::Relaxed),
            "errors": ERROR_COUNTER.load(Ordering::Relaxed),
            "ingests": INGEST_COUNTER.load(Ordering::Relaxed),
            "queries": QUERY_COUNTER.load(Ordering::Relaxed),
        },
        "timestamp": Utc::now().to_rfc3339(),
    })
}
