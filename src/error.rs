//! Error types for configuration loading and the processing pipeline.
//!
//! Configuration problems are fatal and surface at startup. Everything in
//! [`PipelineError`] except I/O on the output side is recoverable: per-item
//! problems are recorded as issues and the batch carries on.

use crate::models::SourceType;
use std::time::Duration;
use thiserror::Error;

/// Errors that reject a configuration at load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::config::AppConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A threshold or fraction outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// `source_weights` has no entry for a source type.
    #[error("source_weights is missing an entry for `{0}`")]
    MissingSourceWeight(SourceType),

    /// Any other invalid setting.
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Errors raised while turning raw records into links and summaries.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An item is missing or carries unusable fields. The item is kept with
    /// empty or default values.
    #[error("malformed input in item {item_id}: {reason}")]
    MalformedInput { item_id: String, reason: String },

    /// The similarity comparisons of a batch ran past their time budget.
    #[error("similarity comparisons exceeded {budget:?} after {compared} comparisons")]
    ComparisonTimeout { budget: Duration, compared: usize },

    /// A collector could not fetch its source.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A batch worker panicked or was aborted.
    #[error("batch worker for partition `{partition}` failed: {reason}")]
    Worker { partition: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn malformed(item_id: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            item_id: item_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether the batch can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedInput { .. }
                | PipelineError::ComparisonTimeout { .. }
                | PipelineError::Fetch { .. }
                | PipelineError::Worker { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let e = ConfigError::OutOfRange {
            field: "dedup.similarity_threshold",
            value: 1.5,
        };
        assert_eq!(
            e.to_string(),
            "dedup.similarity_threshold must be within [0, 1], got 1.5"
        );
        let e = ConfigError::MissingSourceWeight(SourceType::Social);
        assert_eq!(e.to_string(), "source_weights is missing an entry for `social`");
    }

    #[test]
    fn test_recoverability() {
        assert!(PipelineError::malformed("rss-1", "empty title and content").is_recoverable());
        assert!(
            PipelineError::ComparisonTimeout {
                budget: Duration::from_millis(5),
                compared: 10
            }
            .is_recoverable()
        );
        let fatal: PipelineError = ConfigError::MissingSourceWeight(SourceType::Rss).into();
        assert!(!fatal.is_recoverable());
    }
}
