//! # Awful News Dedup
//!
//! Cross-source duplicate detection and trend aggregation for news collected
//! from RSS feeds, scraped news sites and social-media captures.
//!
//! ## Pipeline
//!
//! 1. **Ingestion** ([`ingest`]): collectors hand over raw records; the
//!    [`ingest::Ingestor`] turns them into [`models::NormalizedItem`]s
//! 2. **Annotation** ([`analysis`]): entities, keywords, sentiment and a
//!    keyword-weighted relevance score
//! 3. **Resolution** ([`dedup`], [`batch`]): every item is linked to at most
//!    one earlier item covering the same story, partition by partition
//! 4. **Aggregation** ([`trends`]): weighted keyword, entity, sentiment and
//!    source tallies over an explicit [`models::TimeRange`]
//! 5. **Output** ([`outputs`]): JSON files and a Markdown report
//!
//! [`pipeline::Pipeline`] runs steps 1 to 4.

pub mod analysis;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod trends;
pub mod utils;
