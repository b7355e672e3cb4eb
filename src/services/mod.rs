// Services Layer - Engine operations shared by the HTTP API and the CLI
//
// Each service owns a handle to the record store and validates its own inputs,
// so both interfaces behave identically.

pub mod build_service;
pub mod comparison_service;
pub mod history_service;
pub mod ingest_service;
pub mod report_service;

pub use build_service::BuildService;
pub use comparison_service::{snapshot_reports, ComparisonService, DEFAULT_SNAPSHOT_BASE_URL};
pub use history_service::{HistoryService, SeriesQuery};
pub use ingest_service::IngestService;
pub use report_service::ReportService;
