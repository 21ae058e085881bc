//! Dictionary-based entity, keyword and sentiment extraction.
//!
//! Everything here is a lexicon lookup over whole tokens. There is no
//! statistical model: the same text and lexicon always give the same
//! [`Extraction`].

use crate::analysis::lexicon::Lexicon;
use crate::analysis::text::{PhraseMatcher, tokenize};
use crate::models::{Entities, EntityCategory, NormalizedItem, Sentiment};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// What the extractor found in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Only categories with at least one match are present.
    pub entities: Entities,
    pub keywords: BTreeSet<String>,
    pub sentiment: Sentiment,
}

/// Compiled form of a [`Lexicon`].
#[derive(Debug, Clone)]
pub struct Extractor {
    entities: PhraseMatcher<(EntityCategory, String)>,
    domain_keywords: PhraseMatcher<String>,
    stopwords: HashSet<String>,
    positive: HashSet<String>,
    negative: HashSet<String>,
    min_keyword_len: usize,
    sentiment_margin: usize,
}

static DEFAULT_EXTRACTOR: Lazy<Extractor> = Lazy::new(|| Extractor::new(&Lexicon::default()));

impl Extractor {
    pub fn new(lexicon: &Lexicon) -> Self {
        let mut entries = Vec::new();
        for category in EntityCategory::ALL {
            for (canonical, aliases) in lexicon.aliases(category) {
                entries.push((canonical.clone(), (category, canonical.clone())));
                for alias in aliases {
                    entries.push((alias.clone(), (category, canonical.clone())));
                }
            }
        }

        let lower = |set: &BTreeSet<String>| -> HashSet<String> {
            set.iter().map(|w| w.to_lowercase()).collect()
        };

        Self {
            entities: PhraseMatcher::new(entries),
            domain_keywords: PhraseMatcher::new(
                lexicon
                    .domain_keywords
                    .iter()
                    .map(|k| (k.clone(), k.to_lowercase())),
            ),
            stopwords: lower(&lexicon.stopwords),
            positive: lower(&lexicon.positive_terms),
            negative: lower(&lexicon.negative_terms),
            min_keyword_len: lexicon.min_keyword_len,
            sentiment_margin: lexicon.sentiment_margin.max(1),
        }
    }

    pub fn extract(&self, text: &str) -> Extraction {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Extraction::default();
        }

        let mut entities = Entities::new();
        for (category, canonical) in self.entities.find(&tokens) {
            entities
                .entry(*category)
                .or_default()
                .insert(canonical.clone());
        }

        let mut keywords: BTreeSet<String> =
            self.domain_keywords.find(&tokens).into_iter().cloned().collect();
        keywords.extend(
            tokens
                .iter()
                .filter(|t| self.is_keyword_token(t))
                .cloned(),
        );

        let sentiment = self.sentiment(&tokens);

        debug!(
            tokens = tokens.len(),
            entities = entities.values().map(|s| s.len()).sum::<usize>(),
            keywords = keywords.len(),
            %sentiment,
            "Extracted text features"
        );

        Extraction {
            entities,
            keywords,
            sentiment,
        }
    }

    /// Fill `entities`, `keywords` and `sentiment` of an item from its title and content.
    pub fn annotate(&self, item: &mut NormalizedItem) {
        let Extraction {
            entities,
            keywords,
            sentiment,
        } = self.extract(&item.text());
        item.entities = entities;
        item.keywords = keywords;
        item.sentiment = sentiment;
    }

    fn is_keyword_token(&self, token: &str) -> bool {
        !self.stopwords.contains(token)
            && token.chars().count() > self.min_keyword_len
            && !token.chars().all(|c| c.is_ascii_digit())
    }

    fn sentiment(&self, tokens: &[String]) -> Sentiment {
        let pos = tokens.iter().filter(|t| self.positive.contains(*t)).count();
        let neg = tokens.iter().filter(|t| self.negative.contains(*t)).count();

        if pos >= neg + self.sentiment_margin {
            Sentiment::Positive
        } else if neg >= pos + self.sentiment_margin {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Extract with the compiled-in default lexicon.
pub fn extract(text: &str) -> Extraction {
    DEFAULT_EXTRACTOR.extract(text)
}
