//! Title and content similarity between two items.
//!
//! The score is the Ratcliff/Obershelp ratio `2 * M / T`, where `M` is the
//! number of characters in the matching blocks found by recursively taking
//! the longest common substring, and `T` is the total length of both strings.
//! Ties between equally long blocks go to the earliest block in the first
//! string, then in the second.
//!
//! The recursion is order-sensitive (`"tide"` vs `"diet"` finds a different
//! first block than `"diet"` vs `"tide"`), so the two inputs are always put in
//! lexicographic order before matching. That makes every score symmetric.

use crate::models::NormalizedItem;
use std::collections::HashMap;

/// Characters of normalized content that take part in a comparison.
pub const DEFAULT_CONTENT_COMPARE_CHARS: usize = 200;

/// Lowercase and collapse every run of whitespace to a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity ratio in `[0, 1]` of two already normalized strings.
/// Either side empty gives 0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

pub fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let matched = matched_chars(first, second);
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Total size of the matching blocks of `a` against `b`.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &positions, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
///
/// `run_len[j]` holds the length of the common run ending at `a[i - 1]` and
/// `b[j]`; only runs that grow are carried into the next row.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let mut run_len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run_len = HashMap::new();
        if let Some(js) = positions.get(c) {
            for &j in js {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let prev = if j == 0 {
                    0
                } else {
                    run_len.get(&(j - 1)).copied().unwrap_or(0)
                };
                let k = prev + 1;
                next_run_len.insert(j, k);
                if k > best_len {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_len = k;
                }
            }
        }
        run_len = next_run_len;
    }

    (best_i, best_j, best_len)
}

/// Compares items field by field.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine {
    /// Content is cut to this many characters after normalization.
    pub content_compare_chars: usize,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self {
            content_compare_chars: DEFAULT_CONTENT_COMPARE_CHARS,
        }
    }
}

impl SimilarityEngine {
    pub fn new(content_compare_chars: usize) -> Self {
        Self {
            content_compare_chars,
        }
    }

    pub fn title_similarity(&self, a: &NormalizedItem, b: &NormalizedItem) -> f64 {
        ratio(&normalize(&a.title), &normalize(&b.title))
    }

    pub fn content_similarity(&self, a: &NormalizedItem, b: &NormalizedItem) -> f64 {
        let cap = |text: &str| -> Vec<char> {
            normalize(text)
                .chars()
                .take(self.content_compare_chars)
                .collect()
        };
        ratio_chars(&cap(&a.content), &cap(&b.content))
    }

    /// `(title_similarity, content_similarity)`.
    pub fn similarity(&self, a: &NormalizedItem, b: &NormalizedItem) -> (f64, f64) {
        (self.title_similarity(a, b), self.content_similarity(a, b))
    }
}

/// [`SimilarityEngine::similarity`] with the default content cap.
pub fn similarity(a: &NormalizedItem, b: &NormalizedItem) -> (f64, f64) {
    SimilarityEngine::default().similarity(a, b)
}
