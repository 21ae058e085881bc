//! Tokenization and whole-word phrase matching shared by the extractor and the scorer.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Letters and digits, keeping inner hyphens and apostrophes so that
/// `zanu-pf` and `chin'ono` stay single tokens.
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['\-][\p{L}\p{N}]+)*").unwrap());

/// Split text into lowercase word tokens.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(tokenize("ZANU-PF wins, says Chin’ono"), vec!["zanu-pf", "wins", "says", "chin'ono"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Matches multi-token phrases against a token stream on word boundaries.
///
/// Each phrase is tokenized with [`tokenize`] when the matcher is built, so
/// `"Victoria Falls"` matches the tokens `["victoria", "falls"]` but never
/// `"falls"` alone or `"victoriafalls"`.
#[derive(Debug, Clone)]
pub struct PhraseMatcher<V> {
    by_head: HashMap<String, Vec<(Vec<String>, V)>>,
}

impl<V> PhraseMatcher<V> {
    pub fn new<P: AsRef<str>>(entries: impl IntoIterator<Item = (P, V)>) -> Self {
        let mut by_head: HashMap<String, Vec<(Vec<String>, V)>> = HashMap::new();
        for (phrase, value) in entries {
            let tokens = tokenize(phrase.as_ref());
            if let Some(head) = tokens.first().cloned() {
                by_head.entry(head).or_default().push((tokens, value));
            }
        }
        Self { by_head }
    }

    pub fn is_empty(&self) -> bool {
        self.by_head.is_empty()
    }

    /// Every occurrence of every phrase, in token order. A value appears once
    /// per occurrence.
    pub fn find<'a>(&'a self, tokens: &[String]) -> Vec<&'a V> {
        let mut out = Vec::new();
        for (pos, token) in tokens.iter().enumerate() {
            if let Some(candidates) = self.by_head.get(token) {
                for (phrase, value) in candidates {
                    if tokens[pos..].starts_with(phrase) {
                        out.push(value);
                    }
                }
            }
        }
        out
    }
}
