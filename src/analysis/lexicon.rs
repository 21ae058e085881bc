//! Curated dictionaries for entity, keyword and sentiment extraction.
//!
//! A [`Lexicon`] is a plain value: it is built once (compiled-in defaults,
//! optionally overridden from the `lexicon` section of the config file) and
//! then handed by reference to [`crate::analysis::Extractor::new`].

use crate::error::ConfigError;
use crate::models::EntityCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical name -> extra aliases. The canonical name itself always matches.
pub type AliasTable = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub politicians: AliasTable,
    pub organizations: AliasTable,
    pub locations: AliasTable,
    /// Topic terms that always count as keywords, whatever their length.
    pub domain_keywords: BTreeSet<String>,
    pub stopwords: BTreeSet<String>,
    /// Tokens longer than this many characters are kept as keywords.
    pub min_keyword_len: usize,
    pub positive_terms: BTreeSet<String>,
    pub negative_terms: BTreeSet<String>,
    /// How many more hits one polarity needs over the other.
    pub sentiment_margin: usize,
}

/// Builds an alias table from `(canonical, "alias|alias")` pairs.
fn table(entries: &[(&str, &str)]) -> AliasTable {
    entries
        .iter()
        .map(|(name, aliases)| {
            (
                name.to_string(),
                aliases
                    .split('|')
                    .filter(|a| !a.is_empty())
                    .map(|a| a.to_string())
                    .collect(),
            )
        })
        .collect()
}

fn set(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            politicians: table(&[
                ("Emmerson Mnangagwa", "mnangagwa|ed mnangagwa"),
                ("Nelson Chamisa", "chamisa"),
                ("Mthuli Ncube", "mthuli"),
                ("Constantino Chiwenga", "chiwenga"),
                ("Strive Masiyiwa", "masiyiwa"),
                ("Hopewell Chin'ono", "chin'ono"),
                ("Douglas Mwonzora", "mwonzora"),
            ]),
            organizations: table(&[
                ("ZANU-PF", "zanu pf"),
                ("CCC", "citizens coalition for change"),
                ("MDC Alliance", "mdca|mdc-a"),
                ("Econet", "econet wireless"),
                ("Reserve Bank of Zimbabwe", "reserve bank|rbz"),
                ("ZIMRA", "zimbabwe revenue authority"),
                ("ZESA", ""),
                ("CBZ", ""),
                ("FBC", ""),
                ("The Herald", "herald"),
                ("NewsDay", ""),
                ("ZimFact", ""),
            ]),
            locations: table(&[
                ("Zimbabwe", ""),
                ("Harare", ""),
                ("Bulawayo", ""),
                ("Gweru", ""),
                ("Mutare", ""),
                ("Masvingo", ""),
                ("Kwekwe", ""),
                ("Chitungwiza", ""),
                ("Victoria Falls", ""),
            ]),
            domain_keywords: set(&[
                "parliament", "minister", "government", "election", "opposition",
                "legislation", "inflation", "economy", "currency", "dollar", "rtgs",
                "bond notes", "foreign currency", "business", "market", "trade",
                "investment", "import", "imports", "export", "exports", "farming",
                "agriculture", "crops", "harvest", "drought", "land", "farmer",
                "tobacco", "mining", "gold", "fuel", "health", "disease", "hospital",
                "doctor", "covid", "education", "school", "university", "student",
                "exam", "teacher", "sanctions", "corruption", "protest", "protests",
                "reform",
            ]),
            stopwords: set(&[
                "a", "about", "after", "again", "against", "all", "also", "an", "and",
                "any", "are", "as", "at", "be", "because", "been", "before", "being",
                "between", "both", "but", "by", "can", "could", "did", "do", "does",
                "during", "each", "few", "for", "from", "further", "had", "has", "have",
                "having", "he", "her", "here", "him", "his", "how", "however", "i", "if",
                "in", "into", "is", "it", "its", "itself", "just", "more", "most", "much",
                "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other",
                "our", "out", "over", "own", "said", "same", "says", "she", "should",
                "so", "some", "such", "than", "that", "the", "their", "them", "then",
                "there", "these", "they", "this", "those", "through", "to", "too",
                "under", "until", "up", "very", "was", "we", "were", "what", "when",
                "where", "which", "while", "who", "whom", "why", "will", "with",
                "within", "without", "would", "you", "your", "according", "announced",
                "reportedly", "yesterday", "therefore", "including", "following",
            ]),
            min_keyword_len: 7,
            positive_terms: set(&[
                "good", "great", "excellent", "better", "best", "growth", "grow",
                "success", "successful", "positive", "improve", "improved",
                "improvement", "gain", "gains", "boost", "recovery", "progress",
                "win", "wins",
            ]),
            negative_terms: set(&[
                "bad", "worse", "worst", "decline", "declines", "fail", "failed",
                "failure", "negative", "crisis", "loss", "losses", "problem",
                "problems", "shortage", "shortages", "collapse", "struggle",
                "struggles", "slump",
            ]),
            sentiment_margin: 1,
        }
    }
}

impl Lexicon {
    /// The alias table of one entity category.
    pub fn aliases(&self, category: EntityCategory) -> &AliasTable {
        match category {
            EntityCategory::Politicians => &self.politicians,
            EntityCategory::Organizations => &self.organizations,
            EntityCategory::Locations => &self.locations,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sentiment_margin == 0 {
            return Err(ConfigError::Invalid {
                field: "lexicon.sentiment_margin".to_string(),
                reason: "must be at least 1 so that ties stay neutral".to_string(),
            });
        }
        let overlap: Vec<&String> = self
            .positive_terms
            .intersection(&self.negative_terms)
            .collect();
        if !overlap.is_empty() {
            return Err(ConfigError::Invalid {
                field: "lexicon.positive_terms".to_string(),
                reason: format!("terms listed with both polarities: {overlap:?}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lexicon_is_valid() {
        let lexicon = Lexicon::default();
        assert!(lexicon.validate().is_ok());
        assert!(lexicon.politicians.contains_key("Emmerson Mnangagwa"));
        assert!(lexicon.aliases(EntityCategory::Locations).contains_key("Harare"));
    }

    #[test]
    fn test_zero_margin_rejected() {
        let lexicon = Lexicon {
            sentiment_margin: 0,
            ..Lexicon::default()
        };
        assert!(matches!(lexicon.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let lexicon: Lexicon = serde_yaml::from_str("min_keyword_len: 5\n").unwrap();
        assert_eq!(lexicon.min_keyword_len, 5);
        assert_eq!(lexicon.sentiment_margin, 1);
        assert!(!lexicon.stopwords.is_empty());
    }
}
