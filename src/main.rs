//! # Awful News Dedup
//!
//! Reads raw news records (exported JSON, captured social posts and,
//! with `--fetch`, the configured RSS feeds and news sites), links duplicate
//! coverage across sources and writes a weighted trend summary.
//!
//! ## Usage
//!
//! ```sh
//! awful_news_dedup -i records.json --social posts.json -o ./out
//! ```
//!
//! ## Architecture
//!
//! 1. **Collection**: load record files, optionally poll feeds and sites
//! 2. **Processing**: normalize, annotate, resolve duplicates, aggregate
//! 3. **Output**: JSON files and a Markdown report under `<out>/<date>/`
//!
//! Ctrl-C stops duplicate resolution between items; the partial run is still
//! written.

use awful_news_dedup::cli::Cli;
use awful_news_dedup::config::AppConfig;
use awful_news_dedup::ingest::{load_records, load_social_posts};
use awful_news_dedup::outputs::{json, report};
use awful_news_dedup::pipeline::{Issue, Pipeline};
use awful_news_dedup::utils::{ensure_writable_dir, truncate_for_log};
use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_news_dedup starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).inspect_err(|e| error!(error = %e, "Invalid config"))?,
        None => {
            info!("No config file given; using defaults");
            AppConfig::default()
        }
    };
    if args.include_undated {
        config.aggregation.include_undated = true;
    }

    let window = args.window(Utc::now())?;
    info!(start = %window.start, end = %window.end, "Processing window");

    ensure_writable_dir(&args.output_dir).await?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing with partial results");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let pipeline = Pipeline::new(config)?.with_cancellation(cancel);

    // --- Collection ---
    let mut records = Vec::new();
    let mut source_issues: Vec<Issue> = Vec::new();
    for path in &args.input {
        match load_records(path).await {
            Ok(mut loaded) => records.append(&mut loaded),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load records; skipping file");
                source_issues.push(Issue::from(&e));
            }
        }
    }
    for path in &args.social {
        match load_social_posts(path).await {
            Ok(mut loaded) => records.append(&mut loaded),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load social posts; skipping file");
                source_issues.push(Issue::from(&e));
            }
        }
    }
    if args.fetch {
        let (mut collected, failures) = pipeline.collect(args.max_articles_per_site).await;
        records.append(&mut collected);
        source_issues.extend(failures.iter().map(Issue::from));
    }
    info!(records = records.len(), source_issues = source_issues.len(), "Collected records");

    // --- Processing ---
    let mut run = pipeline.run(records, window).await;
    source_issues.append(&mut run.issues);
    run.issues = source_issues;

    for issue in run.issues.iter().take(20) {
        debug!(
            item = issue.item_id.as_deref().unwrap_or("-"),
            kind = ?issue.kind,
            message = %truncate_for_log(&issue.message, 200),
            "Issue"
        );
    }

    // --- Output ---
    let dir = json::write_run(&run, &args.output_dir)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to write JSON output"))?;
    if let Err(e) = report::write_report_file(&run, &dir).await {
        error!(error = %e, "Failed to write Markdown report");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        items = run.items.len(),
        links = run.links.len(),
        clusters = run.clusters.len(),
        issues = run.issues.len(),
        partial = run.partial,
        "Execution complete"
    );

    Ok(())
}
