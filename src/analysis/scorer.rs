//! Keyword-weighted relevance scoring.

use crate::analysis::text::{PhraseMatcher, tokenize};
use crate::models::NormalizedItem;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Raw score at which an item counts as fully relevant.
pub const DEFAULT_SATURATION: f64 = 3.0;

/// Scores items against a table of weighted keywords.
///
/// A keyword found in the title contributes twice its weight; one found only
/// in the content contributes its weight once. Keywords are whole-word,
/// case-insensitive phrases. Negative weights act as penalties.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    keywords: PhraseMatcher<usize>,
    weights: Vec<f64>,
    saturation: f64,
}

impl RelevanceScorer {
    pub fn new(keyword_weights: &BTreeMap<String, f64>, saturation: f64) -> Self {
        let weights: Vec<f64> = keyword_weights.values().copied().collect();
        let keywords =
            PhraseMatcher::new(keyword_weights.keys().enumerate().map(|(idx, k)| (k, idx)));
        Self {
            keywords,
            weights,
            saturation: if saturation > 0.0 {
                saturation
            } else {
                DEFAULT_SATURATION
            },
        }
    }

    /// Relevance in `[0, 1]`. Items without text score 0.
    pub fn score(&self, item: &NormalizedItem) -> f64 {
        if item.is_empty() {
            return 0.0;
        }

        let mut found = vec![0u8; self.weights.len()];
        // 2 = title, 1 = content only
        for idx in self.keywords.find(&tokenize(&item.content)) {
            found[*idx] = 1;
        }
        for idx in self.keywords.find(&tokenize(&item.title)) {
            found[*idx] = 2;
        }

        let raw: f64 = found
            .iter()
            .zip(&self.weights)
            .map(|(mult, weight)| f64::from(*mult) * weight)
            .sum();

        let score = (raw / self.saturation).clamp(0.0, 1.0);
        debug!(id = %item.id, raw, score, "Scored item");
        score
    }

    pub fn annotate(&self, item: &mut NormalizedItem) {
        item.relevance_score = self.score(item);
    }
}

/// Score with an ad-hoc weight table and the default saturation.
pub fn score(item: &NormalizedItem, keyword_weights: &BTreeMap<String, f64>) -> f64 {
    RelevanceScorer::new(keyword_weights, DEFAULT_SATURATION).score(item)
}

/// Split items into those at or above `min_score` and those below it.
/// Nothing is dropped: the second list is kept for audit.
#[instrument(level = "info", skip_all, fields(min_score = min_score))]
pub fn partition_relevant<'a>(
    items: &'a [NormalizedItem],
    min_score: f64,
) -> (Vec<&'a NormalizedItem>, Vec<&'a NormalizedItem>) {
    let (kept, filtered): (Vec<_>, Vec<_>) = items
        .iter()
        .partition(|item| item.relevance_score >= min_score);
    info!(
        kept = kept.len(),
        filtered = filtered.len(),
        "Partitioned items by relevance"
    );
    (kept, filtered)
}

/// Weights for Zimbabwe-focused coverage, with a few neighbouring countries
/// as penalty terms.
pub fn default_keyword_weights() -> BTreeMap<String, f64> {
    [
        ("zimbabwe", 1.0),
        ("harare", 1.0),
        ("bulawayo", 1.0),
        ("gweru", 1.0),
        ("mutare", 1.0),
        ("victoria falls", 0.9),
        ("zim", 0.8),
        ("mnangagwa", 1.0),
        ("chamisa", 1.0),
        ("mthuli ncube", 0.9),
        ("chiwenga", 0.9),
        ("zanu-pf", 1.0),
        ("zanu pf", 1.0),
        ("ccc", 1.0),
        ("mdca", 0.9),
        ("parliament", 0.7),
        ("government", 0.5),
        ("rtgs", 1.0),
        ("zimbabwean dollar", 0.9),
        ("zwd", 0.8),
        ("zig", 0.8),
        ("bond notes", 0.9),
        ("foreign currency", 0.7),
        ("inflation", 0.6),
        ("economy", 0.5),
        ("econet", 0.8),
        ("masiyiwa", 0.8),
        ("reserve bank", 0.7),
        ("cbz", 0.7),
        ("fbc", 0.7),
        ("election", 0.7),
        ("protests", 0.7),
        ("crisis", 0.6),
        ("reform", 0.6),
        ("sanctions", 0.7),
        ("africa", 0.3),
        ("nigeria", -0.3),
        ("egypt", -0.3),
        ("south africa", -0.2),
        ("kenya", -0.2),
        ("uganda", -0.2),
    ]
    .into_iter()
    .map(|(k, w)| (k.to_string(), w))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    fn item(title: &str, content: &str) -> NormalizedItem {
        let mut item = NormalizedItem::new("rss-1", 1, SourceType::Rss, "Herald");
        item.title = title.to_string();
        item.content = content.to_string();
        item
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, w)| (k.to_string(), *w)).collect()
    }

    #[test]
    fn test_title_counts_double() {
        let w = weights(&[("harare", 0.6)]);
        let in_title = score(&item("Harare water cuts", "Residents queue."), &w);
        let in_body = score(&item("Water cuts", "Residents of Harare queue."), &w);
        assert!((in_title - 0.4).abs() < 1e-9);
        assert!((in_body - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_counted_once_per_item() {
        let w = weights(&[("harare", 1.0)]);
        let s = score(&item("Harare, Harare", "Harare again and Harare"), &w);
        assert!((s - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounds() {
        let w = default_keyword_weights();
        let high = score(
            &item(
                "Mnangagwa and Chamisa clash in Harare over Zimbabwe election",
                "ZANU-PF and CCC supporters in Bulawayo",
            ),
            &w,
        );
        assert_eq!(high, 1.0);

        let penalised = score(&item("Nigeria and Kenya sign trade deal", ""), &w);
        assert_eq!(penalised, 0.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(score(&item("", ""), &default_keyword_weights()), 0.0);
        assert_eq!(score(&item("Harare", ""), &BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_phrases_match_on_word_boundaries() {
        let w = weights(&[("zim", 1.5)]);
        assert_eq!(score(&item("Zimbabwe news", ""), &w), 0.0);
        assert_eq!(score(&item("Zim news", ""), &w), 1.0);
    }

    #[test]
    fn test_non_positive_saturation_falls_back_to_default() {
        let w = weights(&[("harare", 1.5)]);
        let scorer = RelevanceScorer::new(&w, 0.0);
        assert_eq!(scorer.score(&item("", "Harare")), 0.5);
    }

    #[test]
    fn test_partition_relevant_keeps_everything() {
        let mut a = item("a", "");
        a.relevance_score = 0.9;
        let mut b = item("b", "");
        b.relevance_score = 0.1;
        let items = vec![a, b];
        let (kept, filtered) = partition_relevant(&items, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "b");
    }
}
