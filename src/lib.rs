// perfdaily - Daily benchmark regression tracking
// Root library module

pub mod config;
pub mod contracts;
pub mod error;
pub mod factory;
pub mod file_storage;
pub mod http_server;
pub mod http_types;
pub mod memory_store;
pub mod observability;
pub mod postgres_store;
pub mod pure;
pub mod services;
pub mod types;
pub mod validation;
pub mod wrappers;

// Re-export key types
pub use observability::{
    get_metrics, init_logging, init_logging_with_level, log_operation, record_metric,
    with_trace_id, MetricType, Operation,
};

pub use contracts::RecordStore;
pub use error::{EngineError, EngineResult};

pub use types::{
    BuildRange, BuildReport, BuildResult, ComparisonResult, HistoryEntry, MeasurementRecord,
    MetricBucket, RecordId, ReportRow, SeriesKey, Status, TimelineEntry, TrendEntry,
};

// Stores and their wrappers
pub use factory::create_record_store;
pub use file_storage::{create_file_store, FileStore};
pub use memory_store::MemoryStore;
pub use postgres_store::PostgresStore;
pub use wrappers::{create_wrapped_store, TracedStore};

pub use config::{ServerConfig, StorageBackend};
pub use http_server::{create_server, start_server};
pub use services::{
    BuildService, ComparisonService, HistoryService, IngestService, ReportService, SeriesQuery,
};
pub use validation::ValidationError;
