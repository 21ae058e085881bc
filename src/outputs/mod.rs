//! Writing pipeline runs to disk.
//!
//! - [`json`]: items, links, clusters, summary and issues as JSON for API consumers
//! - [`report`]: a Markdown trend report for readers
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── items.json
//!     ├── links.json
//!     ├── clusters.json
//!     ├── summary.json
//!     ├── issues.json
//!     └── report.md
//! ```

pub mod json;
pub mod report;
