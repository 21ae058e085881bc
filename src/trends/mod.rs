//! Trend summaries over a window of the deduplicated corpus.

pub mod aggregator;
pub mod queries;

pub use aggregator::{AggregationParams, aggregate, sentiment_percentages};
