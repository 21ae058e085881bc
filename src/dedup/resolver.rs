//! Links each item to at most one earlier item that covers the same story.
//!
//! Items are walked in canonical order (publication time ascending, undated
//! items last, ties by ingestion order). Every item is compared with all the
//! items before it and linked to the one with the highest combined score at or
//! above the threshold. Nothing is removed: an item with no match simply has
//! no link.

use crate::dedup::similarity::{DEFAULT_CONTENT_COMPARE_CHARS, normalize, ratio_chars};
use crate::error::PipelineError;
use crate::models::{DuplicateLink, DuplicateType, NormalizedItem};
use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const TITLE_WEIGHT: f64 = 0.6;
pub const CONTENT_WEIGHT: f64 = 0.4;

pub const EXACT_MIN: f64 = 0.95;
pub const NEAR_DUPLICATE_MIN: f64 = 0.75;
pub const DIFFERENT_ANGLE_MIN: f64 = 0.65;

/// Lowest combined score that links two items unless configured otherwise.
pub const DEFAULT_THRESHOLD_FLOOR: f64 = 0.65;

/// Band of a combined score, strongest first.
pub fn classify(combined: f64) -> DuplicateType {
    if combined >= EXACT_MIN {
        DuplicateType::Exact
    } else if combined >= NEAR_DUPLICATE_MIN {
        DuplicateType::NearDuplicate
    } else if combined >= DIFFERENT_ANGLE_MIN {
        DuplicateType::SameStoryDifferentAngle
    } else {
        DuplicateType::SameTopic
    }
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub content_compare_chars: usize,
    /// Keyword Jaccard index at which two items below the threshold still
    /// count as the same topic.
    pub same_topic_keyword_overlap: f64,
    pub same_topic_min_shared: usize,
    /// Once spent, the rest of the batch is compared on titles only.
    pub comparison_budget: Option<Duration>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            content_compare_chars: DEFAULT_CONTENT_COMPARE_CHARS,
            same_topic_keyword_overlap: 0.6,
            same_topic_min_shared: 2,
            comparison_budget: None,
        }
    }
}

/// Outcome of one resolution pass.
#[derive(Debug, Default)]
pub struct Resolution {
    pub links: Vec<DuplicateLink>,
    /// Pairwise comparisons performed.
    pub compared: usize,
    /// The time budget ran out and later comparisons skipped content.
    pub title_only_fallback: bool,
    /// The pass stopped early on request. `links` holds what was found so far.
    pub cancelled: bool,
    pub degraded: Option<PipelineError>,
}

#[derive(Debug, Clone, Copy)]
struct PairScores {
    title: f64,
    content: f64,
    combined: f64,
    title_only: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    scores: PairScores,
}

/// Normalized text of one item, computed once per pass.
struct Prepared {
    title: Vec<char>,
    content: Vec<char>,
    title_synthesized: bool,
}

impl Prepared {
    fn new(item: &NormalizedItem, content_chars: usize) -> Self {
        Self {
            title: normalize(&item.title).chars().collect(),
            content: normalize(&item.content).chars().take(content_chars).collect(),
            title_synthesized: item.title_synthesized,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolverOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Stop between items once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
    }

    #[instrument(level = "info", skip_all, fields(items = items.len(), threshold = threshold))]
    pub fn resolve(&self, items: &[NormalizedItem], threshold: f64) -> Resolution {
        let started = Instant::now();
        let order = canonical_order(items);
        let prepared: Vec<Prepared> = items
            .iter()
            .map(|item| Prepared::new(item, self.options.content_compare_chars))
            .collect();

        let mut resolution = Resolution::default();

        for (pos, &idx) in order.iter().enumerate() {
            if self.is_cancelled() {
                warn!(
                    resolved = pos,
                    remaining = order.len() - pos,
                    "Resolution cancelled; returning partial links"
                );
                resolution.cancelled = true;
                break;
            }

            let item = &items[idx];
            let mut best: Option<Candidate> = None;
            let mut best_topic: Option<Candidate> = None;

            for &earlier_idx in &order[..pos] {
                let earlier = &items[earlier_idx];
                if earlier.id == item.id {
                    continue;
                }

                if !resolution.title_only_fallback {
                    if let Some(budget) = self.options.comparison_budget {
                        if started.elapsed() >= budget {
                            warn!(
                                ?budget,
                                compared = resolution.compared,
                                "Comparison budget spent; continuing on titles only"
                            );
                            resolution.title_only_fallback = true;
                            resolution.degraded = Some(PipelineError::ComparisonTimeout {
                                budget,
                                compared: resolution.compared,
                            });
                        }
                    }
                }

                let scores = compare(
                    &prepared[earlier_idx],
                    &prepared[idx],
                    resolution.title_only_fallback,
                );
                resolution.compared += 1;

                let candidate = Candidate {
                    index: earlier_idx,
                    scores,
                };
                // Nothing in common never links, whatever the threshold.
                if scores.combined > 0.0 && scores.combined >= threshold {
                    if best.is_none_or(|b| scores.combined > b.scores.combined) {
                        best = Some(candidate);
                    }
                } else if self.same_topic(earlier, item)
                    && best_topic.is_none_or(|b| scores.combined > b.scores.combined)
                {
                    best_topic = Some(candidate);
                }
            }

            let chosen = match (best, best_topic) {
                (Some(c), _) => Some((c, classify(c.scores.combined))),
                (None, Some(c)) => Some((c, DuplicateType::SameTopic)),
                (None, None) => None,
            };

            if let Some((candidate, duplicate_type)) = chosen {
                let canonical = &items[candidate.index];
                debug!(
                    canonical = %canonical.id,
                    related = %item.id,
                    combined = candidate.scores.combined,
                    %duplicate_type,
                    "Linked item"
                );
                resolution.links.push(DuplicateLink {
                    canonical_id: canonical.id.clone(),
                    related_id: item.id.clone(),
                    title_similarity: candidate.scores.title,
                    content_similarity: candidate.scores.content,
                    combined_similarity: candidate.scores.combined,
                    duplicate_type,
                    title_only: candidate.scores.title_only,
                    is_verified: false,
                    manual_review: false,
                });
            }
        }

        info!(
            links = resolution.links.len(),
            compared = resolution.compared,
            title_only = resolution.title_only_fallback,
            cancelled = resolution.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolved duplicates"
        );
        resolution
    }

    /// High keyword overlap, used only below the threshold.
    fn same_topic(&self, a: &NormalizedItem, b: &NormalizedItem) -> bool {
        let shared = a.keywords.intersection(&b.keywords).count();
        if shared == 0 || shared < self.options.same_topic_min_shared {
            return false;
        }
        let union = a.keywords.union(&b.keywords).count();
        shared as f64 / union as f64 >= self.options.same_topic_keyword_overlap
    }
}

fn compare(a: &Prepared, b: &Prepared, title_only: bool) -> PairScores {
    let title = ratio_chars(&a.title, &b.title);
    // A made-up title says nothing about the story: content decides alone,
    // even once the budget has forced titles-only elsewhere.
    if a.title_synthesized || b.title_synthesized {
        let content = ratio_chars(&a.content, &b.content);
        return PairScores {
            title,
            content,
            combined: content,
            title_only: false,
        };
    }
    if title_only || (a.content.is_empty() && b.content.is_empty()) {
        return PairScores {
            title,
            content: 0.0,
            combined: title,
            title_only,
        };
    }
    let content = ratio_chars(&a.content, &b.content);
    PairScores {
        title,
        content,
        combined: TITLE_WEIGHT * title + CONTENT_WEIGHT * content,
        title_only: false,
    }
}

/// Indices of `items` by publication time (undated last), then ingestion order.
pub fn canonical_order(items: &[NormalizedItem]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| compare_canonical(&items[a], &items[b]).then(a.cmp(&b)));
    order
}

/// `Less` when `a` would be the canonical item of the pair.
pub fn compare_canonical(a: &NormalizedItem, b: &NormalizedItem) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.ingestion_order.cmp(&b.ingestion_order))
}

/// Resolve with default options.
pub fn resolve(items: &[NormalizedItem], threshold: f64) -> Vec<DuplicateLink> {
    Resolver::default().resolve(items, threshold).links
}
