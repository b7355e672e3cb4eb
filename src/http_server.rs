// HTTP REST API Server Implementation
// JSON API for ingesting measurements and querying comparisons, reports and history

use anyhow::Result;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query as AxumQuery, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    config::ServerConfig,
    contracts::RecordStore,
    http_types::{api_error, bad_request, ApiError},
    observability::get_metrics,
    services::{
        BuildService, ComparisonService, HistoryService, IngestService, ReportService,
        SeriesQuery,
    },
    types::{BuildReport, ComparisonResult, HistoryEntry, MeasurementRecord, TimelineEntry},
};

// Global server start time for uptime tracking
static SERVER_START_TIME: once_cell::sync::Lazy<Instant> = once_cell::sync::Lazy::new(Instant::now);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    ingest: Arc<IngestService>,
    builds: Arc<BuildService>,
    comparison: Arc<ComparisonService>,
    report: Arc<ReportService>,
    history: Arc<HistoryService>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, snapshot_base_url: Option<String>) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(store.clone())),
            builds: Arc::new(BuildService::new(store.clone())),
            comparison: Arc::new(ComparisonService::new(store.clone(), snapshot_base_url)),
            report: Arc::new(ReportService::new(store.clone())),
            history: Arc::new(HistoryService::new(store)),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub format: Option<String>,
}

/// Create HTTP server with all routes configured
pub fn create_server(store: Arc<dyn RecordStore>, config: &ServerConfig) -> Router {
    let state = AppState::new(store, config.report.snapshot_base_url());

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/benchmarks", post(add_benchmark))
        .route("/api/v1/builds", get(get_builds))
        .route("/api/v1/comparison/:build1/:build2", get(get_comparison))
        .route("/api/v1/report/:build", get(get_report))
        .route("/api/v1/history", get(get_history).post(post_history))
        .route("/api/v1/timeline", get(get_timeline))
        .route("/api/v1/metrics", get(get_metrics_endpoint))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if config.server.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Start the HTTP server on the configured address
pub async fn start_server(store: Arc<dyn RecordStore>, config: &ServerConfig) -> Result<()> {
    let app = create_server(store, config);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("perfdaily HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: SERVER_START_TIME.elapsed().as_secs(),
    })
}

/// Store one measurement
async fn add_benchmark(
    State(state): State<AppState>,
    payload: Result<Json<MeasurementRecord>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(record) = payload.map_err(|rejection| {
        warn!("Rejected benchmark payload: {}", rejection.body_text());
        bad_request(rejection.body_text())
    })?;

    state.ingest.ingest(record).await.map_err(api_error)?;
    Ok(StatusCode::OK)
}

async fn get_builds(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    state.builds.builds().await.map(Json).map_err(api_error)
}

async fn get_comparison(
    State(state): State<AppState>,
    Path((build1, build2)): Path<(String, String)>,
) -> Result<Json<Vec<ComparisonResult>>, ApiError> {
    state
        .comparison
        .compare(&build1, &build2)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Text table by default, typed rows with `?format=json`
async fn get_report(
    State(state): State<AppState>,
    Path(build): Path<String>,
    params: Result<AxumQuery<ReportParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let AxumQuery(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;

    match params.format.as_deref() {
        Some("json") => {
            let report: BuildReport = state.report.report(&build).await.map_err(api_error)?;
            Ok(Json(report).into_response())
        }
        None | Some("text") => {
            let table = state.report.render(&build).await.map_err(api_error)?;
            Ok((
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                table,
            )
                .into_response())
        }
        Some(other) => Err(bad_request(format!(
            "unsupported report format '{other}' (expected text or json)"
        ))),
    }
}

async fn get_history(
    State(state): State<AppState>,
    query: Result<AxumQuery<SeriesQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let AxumQuery(query) = query.map_err(|rejection| bad_request(rejection.body_text()))?;
    state.history.history(&query).await.map(Json).map_err(api_error)
}

async fn post_history(
    State(state): State<AppState>,
    payload: Result<Json<SeriesQuery>, JsonRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Json(query) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    state.history.history(&query).await.map(Json).map_err(api_error)
}

async fn get_timeline(
    State(state): State<AppState>,
    query: Result<AxumQuery<SeriesQuery>, QueryRejection>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let AxumQuery(query) = query.map_err(|rejection| bad_request(rejection.body_text()))?;
    state.history.timeline(&query).await.map(Json).map_err(api_error)
}

async fn get_metrics_endpoint() -> Json<serde_json::Value> {
    Json(get_metrics())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::failing::FailingStore;
    use crate::memory_store::MemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        create_server(store, &ServerConfig::default())
    }

    fn benchmark(build: &str, value: f64) -> Value {
        json!({
            "build": build,
            "buildURL": format!("http://ci/{build}"),
            "component": "kv",
            "testCase": "get_latency",
            "metric": "p99",
            "threshold": -5,
            "value": value,
            "snapshots": [format!("snap_{build}")],
        })
    }

    async fn post_json(app: &Router, uri: &str, body: &Value) -> Result<Response> {
        Ok(app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))?,
            )
            .await?)
    }

    async fn get_uri(app: &Router, uri: &str) -> Result<Response> {
        Ok(app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty())?)
            .await?)
    }

    async fn body_json(response: Response) -> Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn test_health_check() -> Result<()> {
        let app = create_test_app();
        let response = get_uri(&app, "/health").await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body["status"], "healthy");
        Ok(())
    }

    #[tokio::test]
    async fn test_ingest_and_list_builds() -> Result<()> {
        let app = create_test_app();
        for (build, value) in [("build-002", 92.0), ("build-001", 100.0)] {
            let response = post_json(&app, "/api/v1/benchmarks", &benchmark(build, value)).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = get_uri(&app, "/api/v1/builds").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await?, json!(["build-001", "build-002"]));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_benchmark_is_bad_request() -> Result<()> {
        let app = create_test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/benchmarks")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut missing = benchmark("build-001", 1.0);
        missing["component"] = json!("");
        let response = post_json(&app, "/api/v1/benchmarks", &missing).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["error"], "bad_request");
        Ok(())
    }

    #[tokio::test]
    async fn test_comparison_endpoint() -> Result<()> {
        let app = create_test_app();
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-001", 100.0)).await?;
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-002", 92.0)).await?;

        let response = get_uri(&app, "/api/v1/comparison/build-002/build-001").await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        let bucket = &body[0]["metrics"][0];
        assert_eq!(body[0]["component"], "kv");
        assert_eq!(bucket["testCase"], "get_latency");
        assert_eq!(bucket["status"], "Failed");
        assert_eq!(bucket["results"][0]["build"], "build-001");
        assert_eq!(bucket["reports"].as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_report_text_and_json() -> Result<()> {
        let app = create_test_app();
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-001", 100.0)).await?;
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-002", 100.0)).await?;

        let response = get_uri(&app, "/api/v1/report/build-002").await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()?
            .starts_with("text/plain"));
        let text = to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(text.to_vec())?;
        assert!(text.contains("TEST CASE"));
        assert!(text.contains("Passed"));

        let response = get_uri(&app, "/api/v1/report/build-002?format=json").await?;
        let body = body_json(response).await?;
        assert_eq!(body["previousBuild"], "build-001");
        assert_eq!(body["rows"][0]["status"], "Passed");

        let response = get_uri(&app, "/api/v1/report/build-002?format=xml").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_history_get_and_post() -> Result<()> {
        let app = create_test_app();
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-001", 1.0)).await?;
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-002", 2.0)).await?;

        let response = get_uri(
            &app,
            "/api/v1/history?component=kv&testCase=get_latency&metric=p99",
        )
        .await?;
        let from_get = body_json(response).await?;
        assert_eq!(from_get[0]["build"], "build-002");
        assert_eq!(from_get[0]["buildURL"], "http://ci/build-002");

        let response = post_json(
            &app,
            "/api/v1/history",
            &json!({"component": "kv", "testCase": "get_latency", "metric": "p99"}),
        )
        .await?;
        assert_eq!(body_json(response).await?, from_get);

        let response = get_uri(&app, "/api/v1/history?component=kv&metric=p99").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeline_rows_are_positional() -> Result<()> {
        let app = create_test_app();
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-002", 2.0)).await?;
        post_json(&app, "/api/v1/benchmarks", &benchmark("build-001", 1.0)).await?;

        let response = get_uri(
            &app,
            "/api/v1/timeline?component=kv&testCase=get_latency&metric=p99",
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await?,
            json!([["build-001", 1.0, null, null], ["build-002", 2.0, null, null]])
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() -> Result<()> {
        let app = create_test_app();
        let response = get_uri(&app, "/api/v1/metrics").await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert!(body["operations"]["total"].is_u64());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() -> Result<()> {
        let store: Arc<dyn RecordStore> = Arc::new(FailingStore::new(
            MemoryStore::new(),
            &["distinct_builds", "upsert"],
        ));
        let app = create_server(store, &ServerConfig::default());

        let response = get_uri(&app, "/api/v1/builds").await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await?;
        assert_eq!(body["error"], "internal_server_error");
        assert!(body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("store unavailable"));

        let response = post_json(&app, "/api/v1/benchmarks", &benchmark("build-001", 1.0)).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
