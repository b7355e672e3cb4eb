// Validation Layer
// Boundary checks for inbound measurements and query coordinates.
// Anything that fails here is a caller error and is never retried.

use std::collections::HashMap;
use std::path::Path;

use crate::types::MeasurementRecord;

/// Validation errors with detailed context
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },
}

/// Validation context for better log messages
#[derive(Clone)]
pub struct ValidationContext {
    operation: String,
    attributes: HashMap<String, String>,
}

impl ValidationContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Require a non-blank string field
    pub fn require(&self, field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            tracing::debug!(
                operation = %self.operation,
                attributes = ?self.attributes,
                "Rejected blank field: {}", field
            );
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            });
        }
        Ok(())
    }

    pub fn check(&self, condition: bool, field: &str, reason: &str) -> Result<(), ValidationError> {
        if !condition {
            tracing::debug!(
                operation = %self.operation,
                attributes = ?self.attributes,
                "Rejected field {}: {}", field, reason
            );
            return Err(ValidationError::InvalidInput {
                field: field.to_string(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }
}

/// Measurement validation
pub mod record {
    use super::*;

    /// Validate a measurement before it is upserted.
    ///
    /// Only the identity fields are required. Value ranges are not checked,
    /// but the value must be a finite number so it stays representable in JSON.
    pub fn validate_for_ingest(rec: &MeasurementRecord) -> Result<(), ValidationError> {
        let ctx = ValidationContext::new("record_ingest")
            .with_attribute("build", rec.build.as_str())
            .with_attribute("test_case", rec.test_case.as_str());

        ctx.require("component", &rec.component)?;
        ctx.require("testCase", &rec.test_case)?;
        ctx.require("metric", &rec.metric)?;
        ctx.require("build", &rec.build)?;
        ctx.check(rec.value.is_finite(), "value", "must be a finite number")?;
        ctx.check(
            rec.threshold.is_finite(),
            "threshold",
            "must be a finite number",
        )?;

        Ok(())
    }
}

/// Query coordinate validation
pub mod query {
    use super::*;

    /// Validate a (component, test case, metric) series coordinate
    pub fn validate_series(
        component: &str,
        test_case: &str,
        metric: &str,
    ) -> Result<(), ValidationError> {
        let ctx = ValidationContext::new("series_query");
        ctx.require("component", component)?;
        ctx.require("testCase", test_case)?;
        ctx.require("metric", metric)?;
        Ok(())
    }

    /// Validate a pair of builds for comparison
    pub fn validate_build_pair(build1: &str, build2: &str) -> Result<(), ValidationError> {
        let ctx = ValidationContext::new("build_pair");
        ctx.require("build1", build1)?;
        ctx.require("build2", build2)?;
        Ok(())
    }

    pub fn validate_build(build: &str) -> Result<(), ValidationError> {
        ValidationContext::new("build").require("build", build)
    }

    pub fn validate_test_case(test_case: &str) -> Result<(), ValidationError> {
        ValidationContext::new("test_case").require("testCase", test_case)
    }
}

/// Path validation for on-disk stores
pub mod path {
    use super::*;

    /// Maximum path length across platforms
    const MAX_PATH_LENGTH: usize = 4096;

    /// Validate a directory used as a store root. Absolute paths are allowed.
    pub fn validate_storage_directory_path(path: &str) -> Result<(), ValidationError> {
        let ctx = ValidationContext::new("validate_storage_directory_path")
            .with_attribute("path", path);

        ctx.require("path", path)?;
        ctx.check(
            path.len() < MAX_PATH_LENGTH,
            "path",
            "exceeds maximum path length",
        )?;
        ctx.check(!path.contains('\0'), "path", "contains null bytes")?;

        let has_parent_ref = Path::new(path)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        ctx.check(
            !has_parent_ref,
            "path",
            "parent directory references (..) not allowed",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MeasurementRecord {
        MeasurementRecord {
            build: "build-001".to_string(),
            build_url: String::new(),
            component: "kv".to_string(),
            test_case: "get_latency".to_string(),
            metric: "p99".to_string(),
            threshold: 10.0,
            value: 12.0,
            date_time: String::new(),
            snapshots: vec![],
            annotation: None,
            annotation_text: None,
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(record::validate_for_ingest(&sample()).is_ok());
    }

    #[test]
    fn test_blank_identity_fields_rejected() {
        let mut rec = sample();
        rec.test_case = "   ".to_string();
        assert_eq!(
            record::validate_for_ingest(&rec),
            Err(ValidationError::MissingField {
                field: "testCase".to_string()
            })
        );

        let mut rec = sample();
        rec.build = String::new();
        assert!(record::validate_for_ingest(&rec).is_err());
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let mut rec = sample();
        rec.value = f64::NAN;
        assert!(matches!(
            record::validate_for_ingest(&rec),
            Err(ValidationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_series_validation() {
        assert!(query::validate_series("kv", "get", "p99").is_ok());
        assert!(query::validate_series("kv", "", "p99").is_err());
        assert!(query::validate_build_pair("a", "").is_err());
    }

    #[test]
    fn test_storage_path_validation() {
        assert!(path::validate_storage_directory_path("/tmp/perfdaily").is_ok());
        assert!(path::validate_storage_directory_path("").is_err());
        assert!(path::validate_storage_directory_path("data/../../etc").is_err());
        assert!(path::validate_storage_directory_path("bad\0path").is_err());
    }
}
