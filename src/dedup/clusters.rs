//! Groups linked items into story clusters for reporting.
//!
//! Resolution keeps at most one canonical per item, so chains (`c -> b -> a`)
//! are possible. Clustering follows links transitively and roots every group
//! at its earliest member.

use crate::dedup::resolver::compare_canonical;
use crate::models::{DuplicateLink, DuplicateType, NormalizedItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Earliest member of the group.
    pub canonical_id: String,
    /// Every member, canonical first, then in canonical order.
    pub member_ids: Vec<String>,
    /// Strongest link type inside the group.
    pub strongest: DuplicateType,
}

impl DuplicateCluster {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Clusters of two or more items, largest first, then by canonical id.
/// Links naming unknown ids are ignored.
pub fn clusters(items: &[NormalizedItem], links: &[DuplicateLink]) -> Vec<DuplicateCluster> {
    let index: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.as_str(), i))
        .collect();

    let mut set = DisjointSet::new(items.len());
    let mut strongest: HashMap<usize, DuplicateType> = HashMap::new();
    let mut linked = Vec::new();

    for link in links {
        let (Some(&a), Some(&b)) = (
            index.get(link.canonical_id.as_str()),
            index.get(link.related_id.as_str()),
        ) else {
            continue;
        };
        set.union(a, b);
        linked.push((a, link.duplicate_type));
    }

    for (member, duplicate_type) in linked {
        let root = set.find(member);
        strongest
            .entry(root)
            .and_modify(|t| *t = (*t).min(duplicate_type))
            .or_insert(duplicate_type);
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..items.len() {
        let root = set.find(i);
        groups.entry(root).or_default().push(i);
    }

    let mut out: Vec<DuplicateCluster> = groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .filter_map(|(root, mut members)| {
            members.sort_by(|&a, &b| compare_canonical(&items[a], &items[b]).then(a.cmp(&b)));
            let strongest = *strongest.get(&root)?;
            Some(DuplicateCluster {
                canonical_id: items[members[0]].id.clone(),
                member_ids: members.iter().map(|&m| items[m].id.clone()).collect(),
                strongest,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.canonical_id.cmp(&b.canonical_id))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, hour: u32) -> NormalizedItem {
        let mut item = NormalizedItem::new(id, u64::from(hour), SourceType::Rss, "test");
        item.published_at = Some(Utc.with_ymd_and_hms(2025, 5, 6, hour, 0, 0).unwrap());
        item
    }

    fn link(canonical: &str, related: &str, duplicate_type: DuplicateType) -> DuplicateLink {
        DuplicateLink {
            canonical_id: canonical.to_string(),
            related_id: related.to_string(),
            title_similarity: 0.0,
            content_similarity: 0.0,
            combined_similarity: 0.0,
            duplicate_type,
            title_only: false,
            is_verified: false,
            manual_review: false,
        }
    }

    #[test]
    fn test_chains_merge_into_one_cluster() {
        let items = vec![item("c", 3), item("a", 1), item("b", 2), item("solo", 4)];
        let links = vec![
            link("a", "b", DuplicateType::NearDuplicate),
            link("b", "c", DuplicateType::Exact),
        ];
        let found = clusters(&items, &links);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_id, "a");
        assert_eq!(found[0].member_ids, vec!["a", "b", "c"]);
        assert_eq!(found[0].strongest, DuplicateType::Exact);
    }

    #[test]
    fn test_unknown_ids_and_no_links() {
        let items = vec![item("a", 1), item("b", 2)];
        assert!(clusters(&items, &[]).is_empty());
        let stray = vec![link("a", "missing", DuplicateType::Exact)];
        assert!(clusters(&items, &stray).is_empty());
    }

    #[test]
    fn test_largest_cluster_first() {
        let items = vec![item("a", 1), item("b", 2), item("c", 3), item("x", 4), item("y", 5)];
        let links = vec![
            link("x", "y", DuplicateType::SameTopic),
            link("a", "b", DuplicateType::SameStoryDifferentAngle),
            link("a", "c", DuplicateType::SameStoryDifferentAngle),
        ];
        let found = clusters(&items, &links);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].canonical_id, "a");
        assert_eq!(found[1].member_ids, vec!["x", "y"]);
        assert_eq!(found[1].strongest, DuplicateType::SameTopic);
    }
}
