// BuildService - Range queries over the build dimension
//
// "Nothing found" is returned as `None`; only store failures are errors.
// Lookups are logged by the traced store, not here.

use std::sync::Arc;

use crate::contracts::RecordStore;
use crate::error::{EngineError, EngineResult};
use crate::observability::with_trace_id;
use crate::types::BuildRange;
use crate::validation;

pub struct BuildService {
    store: Arc<dyn RecordStore>,
}

impl BuildService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Every build with at least one record, ascending
    pub async fn builds(&self) -> EngineResult<Vec<String>> {
        with_trace_id("builds", async {
            Ok::<_, EngineError>(self.store.distinct_builds().await?)
        })
        .await
    }

    /// Earliest and latest build recorded for `test_case`
    pub async fn build_range(&self, test_case: &str) -> EngineResult<Option<BuildRange>> {
        validation::query::validate_test_case(test_case)?;
        Ok(self.store.build_range(test_case).await?)
    }

    /// Nearest build strictly before `build`, across all test cases
    pub async fn previous_build(&self, build: &str) -> EngineResult<Option<String>> {
        validation::query::validate_build(build)?;
        Ok(self.store.previous_build(build).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::types::MeasurementRecord;

    async fn seeded() -> anyhow::Result<BuildService> {
        let store = MemoryStore::new();
        for (test_case, build) in [
            ("get", "build-050"),
            ("get", "build-060"),
            ("set", "build-010"),
            ("get", "build-055"),
        ] {
            let record = MeasurementRecord {
                build: build.to_string(),
                build_url: String::new(),
                component: "kv".to_string(),
                test_case: test_case.to_string(),
                metric: "ops".to_string(),
                threshold: -5.0,
                value: 1.0,
                date_time: String::new(),
                snapshots: vec![],
                annotation: None,
                annotation_text: None,
            };
            store.upsert(&record.id(), record).await?;
        }
        Ok(BuildService::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_builds_ascending() -> anyhow::Result<()> {
        let service = seeded().await?;
        assert_eq!(
            service.builds().await?,
            vec!["build-010", "build-050", "build-055", "build-060"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_range_scoped_to_test_case() -> anyhow::Result<()> {
        let service = seeded().await?;
        let range = service.build_range("get").await?.expect("range");
        assert_eq!(range.min, "build-050");
        assert_eq!(range.max, "build-060");
        assert!(service.build_range("unknown").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_previous_build_is_global() -> anyhow::Result<()> {
        let service = seeded().await?;
        assert_eq!(
            service.previous_build("build-050").await?,
            Some("build-010".to_string())
        );
        assert_eq!(service.previous_build("build-010").await?, None);
        assert!(service.previous_build("").await.unwrap_err().is_validation());
        Ok(())
    }
}
