//! News site listing scraper.
//!
//! Sites are described by CSS selectors rather than one module per outlet.
//! A listing page is fetched once and every element matching
//! `article_selector` becomes one record: the first `a[href]` inside it (or the
//! element itself, when it is a link) is the article URL, resolved against the
//! site URL.

use crate::error::PipelineError;
use crate::ingest::fetch::Fetch;
use crate::models::{RawRecord, SourceType};
use crate::utils::normalize_whitespace;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Selectors of one news site. Every selector may be a comma-separated list;
/// the first element matching any of them wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    pub article_selector: String,
    pub title_selector: String,
    #[serde(default)]
    pub content_selector: Option<String>,
    #[serde(default)]
    pub author_selector: Option<String>,
    #[serde(default)]
    pub date_selector: Option<String>,
}

/// Compiled selectors of a [`SiteConfig`].
struct SiteSelectors {
    article: Selector,
    title: Selector,
    content: Option<Selector>,
    author: Option<Selector>,
    date: Option<Selector>,
    link: Selector,
}

fn selector(site: &str, field: &str, css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("{site}: bad {field} selector `{css}`: {e}"))
}

impl SiteConfig {
    fn selectors(&self) -> Result<SiteSelectors, String> {
        let optional = |field: &str, css: &Option<String>| {
            css.as_deref()
                .map(|css| selector(&self.name, field, css))
                .transpose()
        };
        Ok(SiteSelectors {
            article: selector(&self.name, "article", &self.article_selector)?,
            title: selector(&self.name, "title", &self.title_selector)?,
            content: optional("content", &self.content_selector)?,
            author: optional("author", &self.author_selector)?,
            date: optional("date", &self.date_selector)?,
            link: selector(&self.name, "link", "a[href]")?,
        })
    }

    /// Check that the URL and every selector parse.
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.url).map_err(|e| format!("{}: bad url `{}`: {e}", self.name, self.url))?;
        self.selectors().map(|_| ())
    }
}

#[allow(clippy::too_many_arguments)]
fn site(
    name: &str,
    url: &str,
    category: &str,
    article: &str,
    title: &str,
    content: &str,
    author: &str,
    date: &str,
) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        url: url.to_string(),
        category: Some(category.to_string()),
        article_selector: article.to_string(),
        title_selector: title.to_string(),
        content_selector: Some(content.to_string()),
        author_selector: Some(author.to_string()),
        date_selector: Some(date.to_string()),
    }
}

pub fn default_sites() -> Vec<SiteConfig> {
    vec![
        site(
            "The Herald Zimbabwe",
            "https://www.herald.co.zw",
            "zimbabwe_local",
            "article.post, div.post-item, article.entry",
            "h2.post-title, h2.entry-title, a.post-link",
            "div.post-content, div.entry-content, p.post-excerpt",
            "span.author, span.post-author",
            "time.post-date, span.published, time.entry-date",
        ),
        site(
            "NewsDay Zimbabwe",
            "https://www.newsday.co.zw",
            "zimbabwe_local",
            "article, div.news-item",
            "h2, h3.news-title",
            "div.news-content, p.summary",
            "span.author",
            "time, span.date",
        ),
        site(
            "Bulawayo24",
            "https://bulawayo24.com",
            "zimbabwe_local",
            "div.article, article.post",
            "h2.article-title, h2.post-title",
            "div.article-body, div.post-content",
            "span.author",
            "time.article-date, span.published",
        ),
        site(
            "AllAfrica Zimbabwe",
            "https://allafrica.com/zimbabwe",
            "regional_african",
            "div.story-item, article.story",
            "h2.story-title, a.story-link",
            "p.story-excerpt, div.story-summary",
            "span.source",
            "span.story-date, time",
        ),
    ]
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(element: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    let found = element.select(selector?).next()?;
    Some(text_of(found)).filter(|t| !t.is_empty())
}

fn link_of(element: ElementRef<'_>, link: &Selector, base: &Url) -> Option<String> {
    let href = match element.value().attr("href") {
        Some(href) if element.value().name() == "a" => href,
        _ => element.select(link).next()?.value().attr("href")?,
    };
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Records of one listing page, at most `max_articles`. Entries without a
/// title or a link are skipped; repeated links are kept once.
pub fn parse_listing(
    html: &str,
    site: &SiteConfig,
    max_articles: usize,
) -> Result<Vec<RawRecord>, PipelineError> {
    let invalid = |reason: String| PipelineError::Fetch {
        url: site.url.clone(),
        reason,
    };
    let base = Url::parse(&site.url).map_err(|e| invalid(e.to_string()))?;
    let selectors = site.selectors().map_err(invalid)?;
    let document = Html::parse_document(html);

    let records: Vec<RawRecord> = document
        .select(&selectors.article)
        .filter_map(|element| {
            let title = first_text(element, Some(&selectors.title))?;
            let url = link_of(element, &selectors.link, &base)?;

            let published_at = selectors.date.as_ref().and_then(|date| {
                let found = element.select(date).next()?;
                found
                    .value()
                    .attr("datetime")
                    .map(str::to_string)
                    .or_else(|| Some(text_of(found)))
                    .filter(|d| !d.trim().is_empty())
            });

            let mut record = RawRecord::new(SourceType::Scraped, site.name.clone());
            record.source_category = site.category.clone();
            record.title = Some(title);
            record.content = first_text(element, selectors.content.as_ref());
            record.author = first_text(element, selectors.author.as_ref());
            record.url = Some(url);
            record.published_at = published_at;
            Some(record)
        })
        .unique_by(|r| r.url.clone())
        .take(max_articles)
        .collect();

    debug!(site = %site.name, count = records.len(), "Parsed listing");
    Ok(records)
}

/// Scrape every site's listing page, at most `max_parallel` at a time.
/// Records come back in site order; failed sites are reported and skipped.
#[instrument(level = "info", skip_all, fields(sites = sites.len()))]
pub async fn scrape_sites<F: Fetch>(
    fetcher: &F,
    sites: &[SiteConfig],
    max_articles: usize,
    max_parallel: usize,
) -> (Vec<RawRecord>, Vec<PipelineError>) {
    let results: Vec<Result<Vec<RawRecord>, PipelineError>> = stream::iter(sites)
        .map(|site| async move {
            let html = fetcher.fetch(&site.url).await?;
            parse_listing(&html, site, max_articles)
        })
        .buffered(max_parallel.max(1))
        .collect()
        .await;

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (site, result) in sites.iter().zip(results) {
        match result {
            Ok(mut items) => {
                info!(site = %site.name, count = items.len(), "Scraped site");
                records.append(&mut items);
            }
            Err(e) => {
                warn!(site = %site.name, error = %e, "Site scrape failed; skipping");
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

    const LISTING: &str = r#"<html><body>
        <article class="post">
          <h2 class="post-title"><a href="/news/fuel-prices-up">Fuel prices go up again</a></h2>
          <div class="post-content"><p>ZERA has announced   new fuel prices.</p></div>
          <span class="author">Staff Reporter</span>
          <time class="post-date" datetime="2025-05-06T08:00:00+02:00">6 May 2025</time>
        </article>
        <article class="post">
          <h2 class="post-title"><a href="https://www.herald.co.zw/news/fuel-prices-up">Fuel prices go up again</a></h2>
        </article>
        <article class="post">
          <p>No headline here</p>
          <a href="/news/orphan">orphan</a>
        </article>
        <div class="post-item">
          <h2 class="entry-title">Council clears vendors</h2>
          <a href="news/vendors">Read more</a>
          <span class="published">May 5, 2025</span>
        </div>
    </body></html>"#;

    fn herald() -> SiteConfig {
        default_sites().remove(0)
    }

    #[test]
    fn test_default_sites_are_valid() {
        for site in default_sites() {
            site.validate().unwrap();
        }
    }

    #[test]
    fn test_bad_selector_is_rejected() {
        let mut site = herald();
        site.article_selector = "article[".to_string();
        assert!(site.validate().is_err());
        assert!(parse_listing(LISTING, &site, 10).is_err());
    }

    #[test]
    fn test_parse_listing() {
        let records = parse_listing(LISTING, &herald(), 10).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.source_type, SourceType::Scraped);
        assert_eq!(first.title.as_deref(), Some("Fuel prices go up again"));
        assert_eq!(first.url.as_deref(), Some("https://www.herald.co.zw/news/fuel-prices-up"));
        assert_eq!(first.content.as_deref(), Some("ZERA has announced new fuel prices."));
        assert_eq!(first.author.as_deref(), Some("Staff Reporter"));
        assert_eq!(first.published_at.as_deref(), Some("2025-05-06T08:00:00+02:00"));
        assert_eq!(first.source_category.as_deref(), Some("zimbabwe_local"));

        let second = &records[1];
        assert_eq!(second.url.as_deref(), Some("https://www.herald.co.zw/news/vendors"));
        assert_eq!(second.published_at.as_deref(), Some("May 5, 2025"));
        assert!(second.content.is_none());
    }

    #[test]
    fn test_parse_listing_respects_max() {
        let records = parse_listing(LISTING, &herald(), 1).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_scrape_sites_skips_failures() {
        let fetcher = StaticFetch::new(&[("https://www.herald.co.zw", LISTING)]);
        let sites = default_sites();
        let (records, failures) = scrape_sites(&fetcher, &sites, 50, 4).await;
        assert_eq!(records.len(), 2);
        assert_eq!(failures.len(), sites.len() - 1);
    }
}
