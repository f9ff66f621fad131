/// Medicine matcher.
///
/// Maps a free-text query to catalog records in two tiers:
/// - exact: the normalized query is a substring of the normalized brand or generic name
/// - fuzzy: the Levenshtein distance between query and a name is at most
///   `FUZZY_TOLERANCE` of that name's length
///
/// Exact hits come first; inside each tier catalog order is preserved.
use std::sync::Arc;

use crate::catalog::{normalize, Catalog};
use crate::locality::LocalityTable;
use crate::model::{MatchKind, MedicineMatch};

/// Largest edit distance accepted, as a fraction of the candidate name's length.
pub const FUZZY_TOLERANCE: f64 = 0.20;

pub struct Matcher {
    catalog: Arc<Catalog>,
    localities: Arc<LocalityTable>,
}

impl Matcher {
    pub fn new(catalog: Arc<Catalog>, localities: Arc<LocalityTable>) -> Self {
        Self {
            catalog,
            localities,
        }
    }

    /// Rank catalog records against `query`.
    ///
    /// The caller validates the query (trimmed, at least two characters). A query with
    /// no letters or digits matches nothing.
    pub fn search(&self, query: &str, locality: Option<&str>) -> Vec<MedicineMatch<'_>> {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut exact = Vec::new();
        let mut fuzzy = Vec::new();

        for entry in self.catalog.entries() {
            let kind = if entry.brand_key.contains(&query) || entry.generic_key.contains(&query) {
                MatchKind::Exact
            } else if within_tolerance(&query, &entry.brand_key)
                || within_tolerance(&query, &entry.generic_key)
            {
                MatchKind::Fuzzy
            } else {
                continue;
            };

            let record = &entry.record;
            let hit = MedicineMatch {
                record,
                kind,
                savings: self.localities.adjust(record.average_brand_price, locality)
                    - self.localities.adjust(record.average_generic_price, locality),
            };
            match kind {
                MatchKind::Exact => exact.push(hit),
                MatchKind::Fuzzy => fuzzy.push(hit),
            }
        }

        exact.append(&mut fuzzy);
        exact
    }
}

fn within_tolerance(query: &str, name: &str) -> bool {
    let name_len = name.chars().count();
    if name_len == 0 {
        return false;
    }
    let distance = levenshtein(query, name);
    distance as f64 / name_len as f64 <= FUZZY_TOLERANCE
}

/// Classic two-row Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
