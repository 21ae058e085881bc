//! Lexicon-driven annotation of normalized items.
//!
//! - [`text`]: tokenization and whole-word phrase matching
//! - [`lexicon`]: the curated dictionaries, overridable from config
//! - [`extractor`]: entities, keywords and sentiment
//! - [`scorer`]: keyword-weighted relevance

pub mod extractor;
pub mod lexicon;
pub mod scorer;
pub mod text;

pub use extractor::{Extraction, Extractor, extract};
pub use lexicon::Lexicon;
pub use scorer::{RelevanceScorer, partition_relevant};
pub use text::tokenize;
