//! RSS feed collector.
//!
//! Each feed entry becomes one [`RawRecord`] of type `rss`. Descriptions and
//! `content:encoded` bodies arrive as HTML and are reduced to plain text.

use crate::error::PipelineError;
use crate::ingest::fetch::Fetch;
use crate::models::{RawRecord, SourceType};
use crate::utils::html_to_text;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// One feed to poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    /// Partition label shared with sites of the same kind, e.g. `zimbabwe_local`.
    #[serde(default)]
    pub category: Option<String>,
}

impl FeedConfig {
    pub fn new(name: &str, url: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category: Some(category.to_string()),
        }
    }
}

pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new("The Herald", "https://www.herald.co.zw/feed/", "zimbabwe_local"),
        FeedConfig::new("NewsDay", "https://www.newsday.co.zw/feed/", "zimbabwe_local"),
        FeedConfig::new("ZimLive", "https://www.zimlive.com/feed/", "zimbabwe_local"),
        FeedConfig::new("H-Metro", "https://www.heraldonline.co.zw/hmetro/feed/", "zimbabwe_local"),
        FeedConfig::new("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml", "international"),
    ]
}

/// Parse one feed document. Entries without a title are skipped.
pub fn parse_feed(xml: &str, feed: &FeedConfig) -> Result<Vec<RawRecord>, PipelineError> {
    let channel = rss::Channel::read_from(xml.as_bytes()).map_err(|e| PipelineError::Fetch {
        url: feed.url.clone(),
        reason: format!("invalid RSS: {e}"),
    })?;

    let records: Vec<RawRecord> = channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = html_to_text(item.title()?);
            if title.is_empty() {
                return None;
            }

            // Full body when the feed carries one, the teaser otherwise.
            let content = item
                .content()
                .map(html_to_text)
                .filter(|c| !c.is_empty())
                .or_else(|| item.description().map(html_to_text))
                .unwrap_or_default();

            let author = item
                .author()
                .map(str::to_string)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.creators().first().cloned())
                })
                .filter(|a| !a.trim().is_empty());

            let mut record = RawRecord::new(SourceType::Rss, feed.name.clone());
            record.source_category = feed.category.clone();
            record.title = Some(title);
            record.content = Some(content).filter(|c| !c.is_empty());
            record.url = item.link().map(str::to_string);
            record.author = author;
            record.published_at = item.pub_date().map(str::to_string);
            Some(record)
        })
        .collect();

    debug!(feed = %feed.name, entries = channel.items().len(), kept = records.len(), "Parsed feed");
    Ok(records)
}

/// Poll every feed, at most `max_parallel` at a time. Records come back in
/// feed order; failed feeds are reported and skipped.
#[instrument(level = "info", skip_all, fields(feeds = feeds.len()))]
pub async fn fetch_feeds<F: Fetch>(
    fetcher: &F,
    feeds: &[FeedConfig],
    max_parallel: usize,
) -> (Vec<RawRecord>, Vec<PipelineError>) {
    let results: Vec<Result<Vec<RawRecord>, PipelineError>> = stream::iter(feeds)
        .map(|feed| async move {
            let xml = fetcher.fetch(&feed.url).await?;
            parse_feed(&xml, feed)
        })
        .buffered(max_parallel.max(1))
        .collect()
        .await;

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (feed, result) in feeds.iter().zip(results) {
        match result {
            Ok(mut items) => {
                info!(feed = %feed.name, count = items.len(), "Fetched feed");
                records.append(&mut items);
            }
            Err(e) => {
                warn!(feed = %feed.name, error = %e, "Feed failed; skipping");
                failures.push(e);
            }
        }
    }
    (records, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fetch::test_support::StaticFetch;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>The Herald</title>
    <link>https://www.herald.co.zw</link>
    <description>News</description>
    <item>
      <title>Government to ease import restrictions</title>
      <link>https://www.herald.co.zw/import-restrictions/</link>
      <description><![CDATA[<p>The finance ministry said on Monday that import restrictions will be relaxed.</p>]]></description>
      <dc:creator>Herald Reporter</dc:creator>
      <pubDate>Tue, 06 May 2025 09:30:00 +0000</pubDate>
    </item>
    <item>
      <title></title>
      <description>Untitled entry</description>
    </item>
    <item>
      <title>Fuel price review</title>
      <description>Short teaser</description>
      <content:encoded><![CDATA[<p>The energy regulator has reviewed fuel prices upward for the second time this month.</p>]]></content:encoded>
    </item>
  </channel>
</rss>"#;

    fn herald() -> FeedConfig {
        FeedConfig::new("The Herald", "https://www.herald.co.zw/feed/", "zimbabwe_local")
    }

    #[test]
    fn test_parse_feed() {
        let records = parse_feed(FEED, &herald()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.source_type, SourceType::Rss);
        assert_eq!(first.source_name, "The Herald");
        assert_eq!(first.source_category.as_deref(), Some("zimbabwe_local"));
        assert_eq!(
            first.content.as_deref(),
            Some("The finance ministry said on Monday that import restrictions will be relaxed.")
        );
        assert_eq!(first.author.as_deref(), Some("Herald Reporter"));
        assert_eq!(first.published_at.as_deref(), Some("Tue, 06 May 2025 09:30:00 +0000"));

        assert!(records[1].content.as_deref().unwrap().starts_with("The energy regulator"));
        assert!(records[1].url.is_none());
    }

    #[test]
    fn test_invalid_feed_is_an_error() {
        let err = parse_feed("<html>not a feed</html>", &herald()).unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_feeds_skips_failures() {
        let fetcher = StaticFetch::new(&[("https://www.herald.co.zw/feed/", FEED)]);
        let feeds = vec![
            herald(),
            FeedConfig::new("Gone", "https://gone.example/feed", "international"),
        ];
        let (records, failures) = fetch_feeds(&fetcher, &feeds, 2).await;
        assert_eq!(records.len(), 2);
        assert_eq!(failures.len(), 1);
    }
}
