//! JSON output of a pipeline run.
//!
//! Files are grouped by the date the window ends on:
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── items.json
//!     ├── links.json
//!     ├── clusters.json
//!     ├── summary.json
//!     └── issues.json
//! ```
//!
//! A window that ends exactly at midnight covers the day before, so it is
//! filed under that day rather than the next one.

use crate::error::PipelineError;
use crate::models::TimeRange;
use crate::pipeline::PipelineRun;
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Directory name for a window's output.
pub fn window_date(window: &TimeRange) -> NaiveDate {
    let end = window.end;
    if end.time() == NaiveTime::MIN && end > window.start {
        (end - Duration::days(1)).date_naive()
    } else {
        end.date_naive()
    }
}

async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<(), PipelineError> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON file");
    Ok(())
}

/// Write items, links, clusters, summary and issues of `run`. Returns the
/// directory written to.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_run(run: &PipelineRun, output_dir: &str) -> Result<PathBuf, PipelineError> {
    let dir = Path::new(output_dir).join(window_date(&run.summary.window).to_string());

    info!(dir = %dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    write_json(&dir, "items.json", &run.items).await?;
    write_json(&dir, "links.json", &run.links).await?;
    write_json(&dir, "clusters.json", &run.clusters).await?;
    write_json(&dir, "summary.json", &run.summary).await?;
    write_json(&dir, "issues.json", &run.issues).await?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendSummary;
    use chrono::{TimeZone, Utc};

    fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2025, 5, start.0, start.1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 5, end.0, end.1, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_window_date() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        assert_eq!(window_date(&TimeRange::day(day)), day);
        assert_eq!(window_date(&range((6, 8), (6, 20))), day);
        assert_eq!(window_date(&range((5, 12), (7, 9))), day.succ_opt().unwrap());
    }

    #[tokio::test]
    async fn test_write_run() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().to_str().unwrap();
        let window = TimeRange::day(NaiveDate::from_ymd_opt(2025, 5, 6).unwrap());
        let run = PipelineRun {
            items: Vec::new(),
            links: Vec::new(),
            clusters: Vec::new(),
            summary: TrendSummary::empty(window),
            issues: Vec::new(),
            partial: false,
        };

        let dir = write_run(&run, out).await.unwrap();
        assert!(dir.ends_with("2025-05-06"));
        for name in ["items.json", "links.json", "clusters.json", "summary.json", "issues.json"] {
            assert!(dir.join(name).is_file(), "{name} missing");
        }
        let summary: TrendSummary =
            serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary, run.summary);
    }
}
