//! Turning collector output into [`NormalizedItem`]s.
//!
//! Collectors ([`rss`], [`sites`], [`social`], or JSON files on disk) produce
//! [`RawRecord`]s. The [`Ingestor`] assigns each one an id and an ingestion
//! position and cleans its fields. Bad fields never reject a record: they are
//! replaced by empty or default values and reported as
//! [`PipelineError::MalformedInput`].

pub mod dates;
pub mod fetch;
pub mod rss;
pub mod sites;
pub mod social;

use crate::error::PipelineError;
use crate::models::{NormalizedItem, RawRecord, SourceType};
use crate::utils::normalize_whitespace;
use social::SocialPost;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Assigns ids and ingestion order across every record it sees.
#[derive(Debug, Default)]
pub struct Ingestor {
    next_order: u64,
    seen_ids: HashSet<String>,
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position the next record will get.
    pub fn next_order(&self) -> u64 {
        self.next_order
    }

    /// Normalize one record. Problems with its fields come back next to the
    /// item, which is always produced.
    pub fn normalize(&mut self, record: RawRecord) -> (NormalizedItem, Vec<PipelineError>) {
        let order = self.next_order;
        self.next_order += 1;

        let mut issues = Vec::new();

        let id = match record.id.map(|id| id.trim().to_string()) {
            Some(id) if !id.is_empty() && !self.seen_ids.contains(&id) => id,
            Some(id) if !id.is_empty() => {
                let generated = self.generate_id(record.source_type, order);
                issues.push(PipelineError::malformed(
                    &generated,
                    format!("duplicate id `{id}` replaced"),
                ));
                generated
            }
            _ => self.generate_id(record.source_type, order),
        };
        self.seen_ids.insert(id.clone());

        let source_name = normalize_whitespace(&record.source_name);
        let source_name = if source_name.is_empty() {
            issues.push(PipelineError::malformed(&id, "missing source name"));
            "unknown".to_string()
        } else {
            source_name
        };

        let mut item = NormalizedItem::new(id, order, record.source_type, source_name);
        item.source_category = record
            .source_category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        item.title = record.title.as_deref().map(normalize_whitespace).unwrap_or_default();
        item.title_synthesized = record.title_synthesized && !item.title.is_empty();
        item.content = record.content.map(|c| c.trim().to_string()).unwrap_or_default();
        item.url = record.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        item.author = record
            .author
            .map(|a| normalize_whitespace(&a))
            .filter(|a| !a.is_empty());

        if item.is_empty() {
            issues.push(PipelineError::malformed(&item.id, "empty title and content"));
        }

        if let Some(raw) = record.published_at.filter(|d| !d.trim().is_empty()) {
            item.published_at = dates::parse_timestamp(&raw);
            if item.published_at.is_none() {
                issues.push(PipelineError::malformed(
                    &item.id,
                    format!("unparsable published_at `{raw}`"),
                ));
            }
        }

        if let Some(engagement) = record.engagement {
            let total = engagement.total();
            if total.is_finite() && total >= 0.0 {
                item.engagement = total;
            } else {
                issues.push(PipelineError::malformed(
                    &item.id,
                    format!("invalid engagement {total}"),
                ));
            }
        }

        for issue in &issues {
            warn!(error = %issue, "Normalized with defaults");
        }
        (item, issues)
    }

    /// `{source_type}-{order}`, suffixed until no earlier item holds it.
    fn generate_id(&self, source_type: SourceType, order: u64) -> String {
        let base = format!("{source_type}-{order:06}");
        let mut id = base.clone();
        let mut suffix = 1;
        while self.seen_ids.contains(&id) {
            id = format!("{base}-{suffix}");
            suffix += 1;
        }
        id
    }

    /// Normalize a batch in order.
    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub fn normalize_all(
        &mut self,
        records: Vec<RawRecord>,
    ) -> (Vec<NormalizedItem>, Vec<PipelineError>) {
        let mut items = Vec::with_capacity(records.len());
        let mut issues = Vec::new();
        for record in records {
            let (item, mut problems) = self.normalize(record);
            items.push(item);
            issues.append(&mut problems);
        }
        info!(items = items.len(), issues = issues.len(), "Normalized records");
        (items, issues)
    }
}

/// Raw records from a JSON array file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawRecord>, PipelineError> {
    let body = fs::read_to_string(path.as_ref()).await?;
    let records: Vec<RawRecord> = serde_json::from_str(&body)?;
    info!(count = records.len(), "Loaded records");
    Ok(records)
}

/// Social posts from a capture-tool JSON export, as raw records.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_social_posts(path: impl AsRef<Path>) -> Result<Vec<RawRecord>, PipelineError> {
    let body = fs::read_to_string(path.as_ref()).await?;
    let posts: Vec<SocialPost> = serde_json::from_str(&body)?;
    info!(count = posts.len(), "Loaded social posts");
    Ok(posts.into_iter().map(SocialPost::into_record).collect())
}
