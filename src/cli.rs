//! Command-line interface definitions.
//!
//! Every option can also come from the environment where it makes sense
//! (`NEWS_DEDUP_CONFIG`, `NEWS_DEDUP_OUTPUT_DIR`).

use crate::ingest::dates::parse_timestamp;
use crate::models::TimeRange;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(s).ok_or_else(|| format!("`{s}` is not a recognized date or timestamp"))
}

/// Normalize collected news, link duplicates across sources and summarize trends.
///
/// # Examples
///
/// ```sh
/// # Process exported records for the last day
/// awful_news_dedup -i records.json -o ./out
///
/// # Poll the configured feeds and sites as well, over an explicit window
/// awful_news_dedup --fetch -o ./out --window-start 2025-05-06 --window-end 2025-05-07
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON file of raw records (repeatable)
    #[arg(short, long)]
    pub input: Vec<PathBuf>,

    /// JSON export of captured social posts (repeatable)
    #[arg(long)]
    pub social: Vec<PathBuf>,

    /// Output directory for JSON files and the Markdown report
    #[arg(short, long, env = "NEWS_DEDUP_OUTPUT_DIR")]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_DEDUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Window start (inclusive); defaults to `days_back` days before the end
    #[arg(long, value_parser = parse_datetime)]
    pub window_start: Option<DateTime<Utc>>,

    /// Window end (exclusive); defaults to now
    #[arg(long, value_parser = parse_datetime)]
    pub window_end: Option<DateTime<Utc>>,

    /// Window length in days when no start is given
    #[arg(long, default_value_t = 1)]
    pub days_back: u32,

    /// Poll the configured RSS feeds and news sites
    #[arg(long)]
    pub fetch: bool,

    /// Count items without a publication date as part of the window
    #[arg(long)]
    pub include_undated: bool,

    /// Upper bound on articles taken from one site listing
    #[arg(long, default_value_t = 50)]
    pub max_articles_per_site: usize,
}

impl Cli {
    /// The window to process, with `now` standing in for a missing end.
    pub fn window(&self, now: DateTime<Utc>) -> Result<TimeRange, String> {
        let end = self.window_end.unwrap_or(now);
        match self.window_start {
            Some(start) => TimeRange::new(start, end)
                .ok_or_else(|| format!("window end {end} is before window start {start}")),
            None => TimeRange::last_days(end, self.days_back)
                .ok_or_else(|| format!("--days-back {} reaches before the earliest date", self.days_back)),
        }
    }
}
