//! Markdown trend report.
//!
//! Sections: overview, sources, top keywords, sentiment, top politicians,
//! duplicate clusters and time period. Written next to the JSON files as
//! `report.md`.

use crate::error::PipelineError;
use crate::models::{EntityCategory, NormalizedItem, SourceType};
use crate::pipeline::PipelineRun;
use crate::trends::sentiment_percentages;
use crate::utils::{slugify_title, upcase};
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

fn item_label(item: &NormalizedItem) -> String {
    let title = if item.title.is_empty() {
        "(untitled)"
    } else {
        item.title.as_str()
    };
    match item.source_tag() {
        Some(tag) => format!("{title} <small>`{tag}`</small>"),
        None => format!("{title} <small>`{}`</small>", item.source_name),
    }
}

fn write_report(md: &mut String, run: &PipelineRun) -> fmt::Result {
    let summary = &run.summary;
    let by_id: HashMap<&str, &NormalizedItem> =
        run.items.iter().map(|i| (i.id.as_str(), i)).collect();

    writeln!(md, "# News Trend Report\n")?;

    writeln!(md, "## Overview\n")?;
    writeln!(
        md,
        "- Window: {} to {}",
        summary.window.start.format(DATE_FORMAT),
        summary.window.end.format(DATE_FORMAT)
    )?;
    writeln!(md, "- Items in window: {}", summary.total_items)?;
    writeln!(md, "- Relevant items: {}", summary.items_considered)?;
    writeln!(md, "- Below relevance: {}", summary.items_below_relevance)?;
    writeln!(md, "- Counted as duplicates: {}", summary.duplicates_discounted)?;
    writeln!(md, "- Duplicate links: {}", run.links.len())?;
    if run.partial {
        writeln!(
            md,
            "\n> Partial run: duplicate resolution stopped early or compared titles only."
        )?;
    }

    writeln!(md, "\n## Sources\n")?;
    writeln!(md, "| Source | Items | Share |")?;
    writeln!(md, "|--------|------:|------:|")?;
    for source_type in SourceType::ALL {
        let count = summary.source_distribution.get(&source_type).copied().unwrap_or(0);
        let share = if summary.items_considered == 0 {
            0.0
        } else {
            count as f64 * 100.0 / summary.items_considered as f64
        };
        writeln!(md, "| {} | {count} | {share:.1}% |", upcase(source_type.as_str()))?;
    }

    writeln!(md, "\n## Top Keywords\n")?;
    if summary.top_keywords.is_empty() {
        writeln!(md, "_None_")?;
    }
    for (rank, term) in summary.top_keywords.iter().enumerate() {
        writeln!(
            md,
            "{}. **{}** ({:.2}, {} mentions)",
            rank + 1,
            term.term,
            term.weighted_count,
            term.mentions
        )?;
    }

    writeln!(md, "\n## Sentiment\n")?;
    writeln!(md, "| Sentiment | Items | Share |")?;
    writeln!(md, "|-----------|------:|------:|")?;
    for (sentiment, pct) in sentiment_percentages(summary) {
        let count = summary.sentiment_distribution.get(&sentiment).copied().unwrap_or(0);
        writeln!(md, "| {} | {count} | {pct:.1}% |", upcase(sentiment.as_str()))?;
    }

    writeln!(md, "\n## Top Politicians\n")?;
    let politicians = summary
        .top_entities
        .get(&EntityCategory::Politicians)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if politicians.is_empty() {
        writeln!(md, "_None_")?;
    }
    for term in politicians {
        writeln!(md, "- {} ({} mentions)", term.term, term.mentions)?;
    }

    writeln!(md, "\n## Duplicate Clusters\n")?;
    if run.clusters.is_empty() {
        writeln!(md, "_None_")?;
    }
    for cluster in &run.clusters {
        let Some(canonical) = by_id.get(cluster.canonical_id.as_str()) else {
            continue;
        };
        writeln!(
            md,
            "### {}\n\n<a id=\"{}\"></a>{} items, strongest link `{}`\n",
            item_label(canonical),
            slugify_title(&canonical.title),
            cluster.len(),
            cluster.strongest
        )?;
        let members = cluster
            .member_ids
            .iter()
            .skip(1)
            .filter_map(|id| by_id.get(id.as_str()))
            .map(|item| format!("- {}", item_label(item)))
            .join("\n");
        writeln!(md, "{members}\n")?;
    }

    writeln!(md, "## Time Period\n")?;
    match summary.date_range {
        Some(range) => writeln!(
            md,
            "{} to {}",
            range.earliest.format(DATE_FORMAT),
            range.latest.format(DATE_FORMAT)
        )?,
        None => writeln!(md, "_No dated items_")?,
    }
    Ok(())
}

/// Render the report of a run.
pub fn render_report(run: &PipelineRun) -> String {
    let mut md = String::new();
    // writing into a String does not fail
    let _ = write_report(&mut md, run);
    md
}

/// Write `report.md` into `dir`.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_report_file(run: &PipelineRun, dir: &Path) -> Result<PathBuf, PipelineError> {
    let path = dir.join("report.md");
    fs::write(&path, render_report(run)).await?;
    info!(path = %path.display(), "Wrote report");
    Ok(path)
}
