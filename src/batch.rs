//! Partitioned duplicate resolution.
//!
//! A window's items are split by a [`PartitionKey`], each partition is
//! resolved on a blocking worker, and the links of all partitions are merged.
//! Workers own a copy of their partition; the only state they share is the
//! resolver's cancellation flag.

use crate::dedup::{Resolution, Resolver};
use crate::error::PipelineError;
use crate::models::{DuplicateLink, NormalizedItem};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::task;
use tracing::{error, info, instrument};

/// How items are grouped before pairwise comparison. Items in different
/// partitions are never compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKey {
    SourceCategory,
    SourceType,
    /// Publication day in UTC; undated items share one partition.
    Day,
    /// One partition for the whole window.
    #[default]
    None,
}

impl PartitionKey {
    pub fn key_of(&self, item: &NormalizedItem) -> String {
        match self {
            PartitionKey::SourceCategory => item
                .source_category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string()),
            PartitionKey::SourceType => item.source_type.to_string(),
            PartitionKey::Day => item
                .published_at
                .map(|ts| ts.date_naive().to_string())
                .unwrap_or_else(|| "undated".to_string()),
            PartitionKey::None => "all".to_string(),
        }
    }
}

/// Merged outcome of every partition.
#[derive(Debug, Default)]
pub struct BatchResolution {
    /// Sorted by related id, then canonical id.
    pub links: Vec<DuplicateLink>,
    pub partitions: usize,
    pub compared: usize,
    pub title_only_fallback: bool,
    pub cancelled: bool,
    /// Budget overruns and failed workers, by partition name.
    pub errors: Vec<PipelineError>,
}

impl BatchResolution {
    /// Some partition finished early or on titles only.
    pub fn is_partial(&self) -> bool {
        self.cancelled || self.title_only_fallback || !self.errors.is_empty()
    }

    fn absorb(&mut self, resolution: Resolution) {
        self.links.extend(resolution.links);
        self.compared += resolution.compared;
        self.title_only_fallback |= resolution.title_only_fallback;
        self.cancelled |= resolution.cancelled;
        self.errors.extend(resolution.degraded);
    }
}

fn partition(items: &[NormalizedItem], key: PartitionKey) -> BTreeMap<String, Vec<NormalizedItem>> {
    let mut partitions: BTreeMap<String, Vec<NormalizedItem>> = BTreeMap::new();
    for item in items {
        partitions.entry(key.key_of(item)).or_default().push(item.clone());
    }
    partitions
}

/// Resolve `items` partition by partition, at most `max_parallel` partitions
/// at a time.
#[instrument(level = "info", skip_all, fields(items = items.len(), key = ?key, threshold = threshold))]
pub async fn resolve_partitioned(
    items: &[NormalizedItem],
    resolver: &Resolver,
    threshold: f64,
    key: PartitionKey,
    max_parallel: usize,
) -> BatchResolution {
    let partitions = partition(items, key);
    let mut outcome = BatchResolution {
        partitions: partitions.len(),
        ..BatchResolution::default()
    };

    let mut results: Vec<(String, Result<Resolution, task::JoinError>)> =
        stream::iter(partitions)
            .map(|(name, slice)| {
                let resolver = resolver.clone();
                async move {
                    let handle = task::spawn_blocking(move || resolver.resolve(&slice, threshold));
                    (name, handle.await)
                }
            })
            .buffer_unordered(max_parallel.max(1))
            .collect()
            .await;
    results.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, result) in results {
        match result {
            Ok(resolution) => outcome.absorb(resolution),
            Err(e) => {
                error!(partition = %name, error = %e, "Partition worker failed");
                outcome.errors.push(PipelineError::Worker {
                    partition: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    outcome.links.sort_by(|a, b| {
        a.related_id
            .cmp(&b.related_id)
            .then_with(|| a.canonical_id.cmp(&b.canonical_id))
    });

    info!(
        partitions = outcome.partitions,
        links = outcome.links.len(),
        compared = outcome.compared,
        partial = outcome.is_partial(),
        "Merged partition links"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::resolve;
    use crate::models::SourceType;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    const BODY: &str = "The president unveiled a new economic blueprint on Tuesday.";

    fn item(id: &str, order: u64, source_type: SourceType, day: u32, title: &str) -> NormalizedItem {
        let mut item = NormalizedItem::new(id, order, source_type, "test");
        item.title = title.to_string();
        item.content = BODY.to_string();
        item.published_at = Some(Utc.with_ymd_and_hms(2025, 5, day, 9, order as u32, 0).unwrap());
        item
    }

    fn corpus() -> Vec<NormalizedItem> {
        let mut items = vec![
            item("rss-1", 1, SourceType::Rss, 6, "President announces new economic policy"),
            item("social-1", 2, SourceType::Social, 6, "President announces new economic policy"),
            item("rss-2", 3, SourceType::Rss, 7, "President announces new economic policy"),
            item("scraped-1", 4, SourceType::Scraped, 7, "Floods hit Chimanimani district"),
        ];
        items[3].content = "Heavy rains destroyed bridges and homes in the eastern highlands.".to_string();
        items[0].source_category = Some("zimbabwe_local".to_string());
        items
    }

    #[test]
    fn test_partition_keys() {
        let items = corpus();
        assert_eq!(PartitionKey::SourceType.key_of(&items[1]), "social");
        assert_eq!(PartitionKey::Day.key_of(&items[2]), "2025-05-07");
        assert_eq!(PartitionKey::SourceCategory.key_of(&items[0]), "zimbabwe_local");
        assert_eq!(PartitionKey::SourceCategory.key_of(&items[1]), "uncategorized");
        assert_eq!(partition(&items, PartitionKey::None).len(), 1);
    }

    #[tokio::test]
    async fn test_single_partition_matches_direct_resolution() {
        let items = corpus();
        let outcome =
            resolve_partitioned(&items, &Resolver::default(), 0.65, PartitionKey::None, 4).await;
        let mut direct = resolve(&items, 0.65);
        direct.sort_by(|a, b| a.related_id.cmp(&b.related_id));
        assert_eq!(outcome.links, direct);
        assert_eq!(outcome.partitions, 1);
        assert!(!outcome.is_partial());
    }

    #[tokio::test]
    async fn test_partitions_are_not_compared_with_each_other() {
        let items = corpus();
        let outcome =
            resolve_partitioned(&items, &Resolver::default(), 0.65, PartitionKey::SourceType, 2)
                .await;
        assert_eq!(outcome.partitions, 3);
        // only the two rss items share a partition
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].canonical_id, "rss-1");
        assert_eq!(outcome.links[0].related_id, "rss-2");
    }

    #[tokio::test]
    async fn test_links_are_sorted() {
        let items = corpus();
        let outcome =
            resolve_partitioned(&items, &Resolver::default(), 0.65, PartitionKey::Day, 1).await;
        let keys: Vec<(&str, &str)> = outcome
            .links
            .iter()
            .map(|l| (l.related_id.as_str(), l.canonical_id.as_str()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let resolver = Resolver::default().with_cancellation(flag);
        let outcome =
            resolve_partitioned(&corpus(), &resolver, 0.65, PartitionKey::SourceType, 2).await;
        assert!(outcome.cancelled);
        assert!(outcome.links.is_empty());
        assert!(outcome.is_partial());
    }
}
