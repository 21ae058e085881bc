//! Duplicate detection: pairwise similarity, link resolution and clustering.

pub mod clusters;
pub mod resolver;
pub mod similarity;

pub use clusters::{DuplicateCluster, clusters};
pub use resolver::{Resolution, Resolver, ResolverOptions, classify, resolve};
pub use similarity::{SimilarityEngine, similarity};
