//! Read-only slices of an annotated corpus, used by the report layer.

use crate::models::{NormalizedItem, SourceType};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub fn by_source_type(items: &[NormalizedItem], source_type: SourceType) -> Vec<&NormalizedItem> {
    items
        .iter()
        .filter(|i| i.source_type == source_type)
        .collect()
}

/// Items with at least `min` engagement, most engaged first.
pub fn high_engagement(items: &[NormalizedItem], min: f64) -> Vec<&NormalizedItem> {
    let mut out: Vec<&NormalizedItem> = items.iter().filter(|i| i.engagement >= min).collect();
    out.sort_by(|a, b| {
        b.engagement
            .total_cmp(&a.engagement)
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}

/// Items naming `name` as any entity, compared case-insensitively.
pub fn mentioning<'a>(items: &'a [NormalizedItem], name: &str) -> Vec<&'a NormalizedItem> {
    let wanted = name.to_lowercase();
    items
        .iter()
        .filter(|item| {
            item.entities
                .values()
                .flatten()
                .any(|e| e.to_lowercase() == wanted)
        })
        .collect()
}

/// Items keyed by UTC publication date. Undated items are left out.
pub fn group_by_date(items: &[NormalizedItem]) -> BTreeMap<NaiveDate, Vec<&NormalizedItem>> {
    let mut out: BTreeMap<NaiveDate, Vec<&NormalizedItem>> = BTreeMap::new();
    for item in items {
        if let Some(ts) = item.published_at {
            out.entry(ts.date_naive()).or_default().push(item);
        }
    }
    out
}
