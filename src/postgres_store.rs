// PostgreSQL record store
// Pushes distinct/range/top-N queries into SQL; grouping for comparisons
// still happens in-process over the rows returned by `records_for_builds`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, instrument};

use crate::contracts::RecordStore;
use crate::types::{BuildRange, MeasurementRecord, RecordId, SeriesKey};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS benchmarks (
    id              TEXT PRIMARY KEY,
    build           TEXT NOT NULL,
    build_url       TEXT NOT NULL DEFAULT '',
    component       TEXT NOT NULL,
    test_case       TEXT NOT NULL,
    metric          TEXT NOT NULL,
    threshold       DOUBLE PRECISION NOT NULL,
    value           DOUBLE PRECISION NOT NULL,
    date_time       TEXT NOT NULL DEFAULT '',
    snapshots       TEXT[] NOT NULL DEFAULT '{}',
    annotation      TEXT,
    annotation_text TEXT
);
CREATE INDEX IF NOT EXISTS benchmarks_build_idx ON benchmarks (build);
CREATE INDEX IF NOT EXISTS benchmarks_test_case_build_idx ON benchmarks (test_case, build);
"#;

const SELECT_COLUMNS: &str = "build, build_url, component, test_case, metric, threshold, \
     value, date_time, snapshots, annotation, annotation_text";

/// Row as stored in the `benchmarks` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BenchmarkRow {
    pub build: String,
    pub build_url: String,
    pub component: String,
    pub test_case: String,
    pub metric: String,
    pub threshold: f64,
    pub value: f64,
    pub date_time: String,
    pub snapshots: Vec<String>,
    pub annotation: Option<String>,
    pub annotation_text: Option<String>,
}

impl From<BenchmarkRow> for MeasurementRecord {
    fn from(row: BenchmarkRow) -> Self {
        Self {
            build: row.build,
            build_url: row.build_url,
            component: row.component,
            test_case: row.test_case,
            metric: row.metric,
            threshold: row.threshold,
            value: row.value,
            date_time: row.date_time,
            snapshots: row.snapshots,
            annotation: row.annotation,
            annotation_text: row.annotation_text,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RangeRow {
    min_build: Option<String>,
    max_build: Option<String>,
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and make sure the schema exists
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL")?;

        let store = Self::new(pool);
        store.migrate().await?;
        info!("Connected PostgreSQL record store");
        Ok(store)
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Create the table and indexes if missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("failed to create benchmarks schema")?;
        Ok(())
    }

    async fn fetch_records(
        &self,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, BenchmarkRow, sqlx::postgres::PgArguments>,
        what: &str,
    ) -> Result<Vec<MeasurementRecord>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to fetch {what}"))?;
        Ok(rows.into_iter().map(MeasurementRecord::from).collect())
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    #[instrument(skip(self, record))]
    async fn upsert(&self, id: &RecordId, record: MeasurementRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO benchmarks (
                id, build, build_url, component, test_case, metric,
                threshold, value, date_time, snapshots, annotation, annotation_text
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id)
            DO UPDATE SET
                build = EXCLUDED.build,
                build_url = EXCLUDED.build_url,
                component = EXCLUDED.component,
                test_case = EXCLUDED.test_case,
                metric = EXCLUDED.metric,
                threshold = EXCLUDED.threshold,
                value = EXCLUDED.value,
                date_time = EXCLUDED.date_time,
                snapshots = EXCLUDED.snapshots,
                annotation = EXCLUDED.annotation,
                annotation_text = EXCLUDED.annotation_text
            "#,
        )
        .bind(id.as_str())
        .bind(&record.build)
        .bind(&record.build_url)
        .bind(&record.component)
        .bind(&record.test_case)
        .bind(&record.metric)
        .bind(record.threshold)
        .bind(record.value)
        .bind(&record.date_time)
        .bind(&record.snapshots)
        .bind(&record.annotation)
        .bind(&record.annotation_text)
        .execute(&self.pool)
        .await
        .context("failed to upsert benchmark record")?;
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<MeasurementRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM benchmarks WHERE id = $1");
        let row = sqlx::query_as::<_, BenchmarkRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch benchmark record")?;
        Ok(row.map(MeasurementRecord::from))
    }

    async fn count(&self) -> Result<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM benchmarks")
            .fetch_one(&self.pool)
            .await
            .context("failed to count benchmark records")?;
        Ok(count.max(0) as usize)
    }

    async fn distinct_builds(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT build COLLATE \"C\" AS build FROM benchmarks ORDER BY build",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list builds")
    }

    async fn build_range(&self, test_case: &str) -> Result<Option<BuildRange>> {
        let row = sqlx::query_as::<_, RangeRow>(
            r#"
            SELECT MIN(build COLLATE "C") AS min_build, MAX(build COLLATE "C") AS max_build
            FROM benchmarks
            WHERE test_case = $1
            "#,
        )
        .bind(test_case)
        .fetch_one(&self.pool)
        .await
        .context("failed to look up build range")?;

        // Aggregates over zero rows yield NULLs, which is "no data", not an error
        Ok(match (row.min_build, row.max_build) {
            (Some(min), Some(max)) => Some(BuildRange { min, max }),
            _ => None,
        })
    }

    async fn previous_build(&self, build: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT build FROM benchmarks
            WHERE build COLLATE "C" < $1
            ORDER BY build COLLATE "C" DESC
            LIMIT 1
            "#,
        )
        .bind(build)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up previous build")
    }

    async fn records_for_builds(&self, builds: &[&str]) -> Result<Vec<MeasurementRecord>> {
        let builds: Vec<String> = builds.iter().map(|b| b.to_string()).collect();
        let sql = format!("SELECT {SELECT_COLUMNS} FROM benchmarks WHERE build = ANY($1)");
        self.fetch_records(
            sqlx::query_as::<_, BenchmarkRow>(&sql).bind(builds),
            "records for builds",
        )
        .await
    }

    async fn series(
        &self,
        component: &str,
        test_case: &str,
        metric: &str,
    ) -> Result<Vec<MeasurementRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM benchmarks \
             WHERE component = $1 AND test_case = $2 AND metric = $3 \
             ORDER BY build COLLATE \"C\""
        );
        self.fetch_records(
            sqlx::query_as::<_, BenchmarkRow>(&sql)
                .bind(component)
                .bind(test_case)
                .bind(metric),
            "series",
        )
        .await
    }

    async fn recent_before(
        &self,
        series: &SeriesKey,
        before: &str,
        limit: usize,
    ) -> Result<Vec<MeasurementRecord>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM benchmarks \
             WHERE component = $1 AND test_case = $2 AND metric = $3 \
             AND build COLLATE \"C\" < $4 \
             ORDER BY build COLLATE \"C\" DESC \
             LIMIT $5"
        );
        self.fetch_records(
            sqlx::query_as::<_, BenchmarkRow>(&sql)
                .bind(&series.component)
                .bind(&series.test_case)
                .bind(&series.metric)
                .bind(before)
                .bind(i64::try_from(limit).unwrap_or(i64::MAX)),
            "recent records",
        )
        .await
    }
}
