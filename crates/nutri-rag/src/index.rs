//! Fast lookup index
//!
//! Exact-key and inverted-keyword maps over one corpus, plus
//! similarity-based fuzzy lookup. Built once after ingestion; rebuilding
//! from the same records yields the same index.
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;
use std::sync::Arc;

use nutri_core::{normalize_key, Record};

/// Minimum word length (exclusive) for keyword index entries
const MIN_KEYWORD_LEN: usize = 2;

/// A fuzzy match with its similarity score
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub record: Arc<Record>,
    /// Normalized similarity in [0, 1]
    pub score: f64,
}

/// Exact and keyword index over one corpus
#[derive(Debug, Default, Clone)]
pub struct FastIndex {
    /// name -> record (last write wins)
    exact: HashMap<String, Arc<Record>>,

    /// Distinct names in first-insertion order
    keys: Vec<String>,

    /// word -> records whose name contains the word
    keywords: HashMap<String, Vec<Arc<Record>>>,
}

impl FastIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over a set of records
    pub fn build<'a>(records: impl IntoIterator<Item = &'a Arc<Record>>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(Arc::clone(record));
        }
        index
    }

    /// Add one record
    pub fn insert(&mut self, record: Arc<Record>) {
        let name = record.name.clone();
        if name.is_empty() {
            return;
        }

        let mut seen: Vec<&str> = Vec::new();
        for word in name.split_whitespace() {
            if word.chars().count() > MIN_KEYWORD_LEN && !seen.contains(&word) {
                seen.push(word);
                self.keywords
                    .entry(word.to_string())
                    .or_default()
                    .push(Arc::clone(&record));
            }
        }

        if self.exact.insert(name.clone(), record).is_none() {
            self.keys.push(name);
        }
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Indexed names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// O(1) lookup by normalized name
    pub fn exact_lookup(&self, query: &str) -> Option<Arc<Record>> {
        self.exact.get(&normalize_key(query)).cloned()
    }

    /// Records whose name contains `word`, in insertion order
    pub fn keyword_lookup(&self, word: &str) -> Vec<Arc<Record>> {
        self.keywords
            .get(&normalize_key(word))
            .cloned()
            .unwrap_or_default()
    }

    /// Similarity-ranked lookup
    ///
    /// An exact hit is returned alone with score 1.0. Otherwise every key
    /// scoring at least `threshold` is returned, best first, ties in
    /// insertion order, truncated to `limit`.
    pub fn fuzzy_lookup(&self, query: &str, threshold: f64, limit: usize) -> Vec<FuzzyMatch> {
        let query = normalize_key(query);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        if let Some(record) = self.exact.get(&query) {
            return vec![FuzzyMatch {
                record: Arc::clone(record),
                score: 1.0,
            }];
        }

        let mut matches: Vec<(usize, f64)> = self
            .keys
            .iter()
            .enumerate()
            .filter_map(|(position, key)| {
                let score = similarity(&query, key);
                (score >= threshold).then_some((position, score))
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        matches.sort_by(|a, b| b.1.total_cmp(&a.1));
        matches.truncate(limit);

        matches
            .into_iter()
            .filter_map(|(position, score)| {
                self.exact.get(&self.keys[position]).map(|record| FuzzyMatch {
                    record: Arc::clone(record),
                    score,
                })
            })
            .collect()
    }
}

// ============================================================================
// Similarity
// ============================================================================

/// Normalized Levenshtein similarity: `1 - distance / max_len`
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Two-row Levenshtein edit distance over chars
fn levenshtein(a: &[char], b: &[char]) -> usize {
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
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_core::{Attribute, Polarity};

    fn records(names: &[&str]) -> Vec<Arc<Record>> {
        names.iter().map(|n| Arc::new(Record::meal(*n))).collect()
    }

    #[test]
    fn test_similarity_values() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("milk", "milk"), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
        assert!((similarity("papaya", "papya") - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_exact_lookup_normalizes() {
        let index = FastIndex::build(&records(&["Palak Paneer", "Idli"]));
        let hit = index.exact_lookup("  PALAK paneer ").unwrap();
        assert_eq!(hit.display_name, "Palak Paneer");
        assert!(index.exact_lookup("dosa").is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let first = Arc::new(Record::meal("Dal").with_attribute(Attribute::Notes, "first"));
        let second = Arc::new(Record::meal("dal").with_attribute(Attribute::Notes, "second"));
        let index = FastIndex::build(&[first, second]);

        assert_eq!(index.len(), 1);
        let hit = index.exact_lookup("dal").unwrap();
        assert_eq!(hit.attribute(Attribute::Notes), Some("second"));
    }

    #[test]
    fn test_keyword_index_skips_short_words() {
        let index = FastIndex::build(&records(&["Egg curry", "Boiled egg", "Tea of ginger"]));

        assert_eq!(index.keyword_lookup("egg").len(), 2);
        assert_eq!(index.keyword_lookup("curry").len(), 1);
        assert!(index.keyword_lookup("of").is_empty());
    }

    #[test]
    fn test_keyword_unique_per_record() {
        let index = FastIndex::build(&records(&["rice rice pudding"]));
        assert_eq!(index.keyword_lookup("rice").len(), 1);
    }

    #[test]
    fn test_fuzzy_prefers_exact() {
        let index = FastIndex::build(&records(&["papaya", "papayas"]));
        let matches = index.fuzzy_lookup("Papaya", 0.5, 10);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].score, 1.0);
    }

    #[test]
    fn test_fuzzy_order_and_limit() {
        let index = FastIndex::build(&records(&["papaya", "papad", "pasta", "banana"]));
        let matches = index.fuzzy_lookup("papya", 0.5, 10);

        assert_eq!(matches[0].record.name, "papaya");
        assert!(matches.iter().all(|m| m.score >= 0.5));
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));

        let limited = index.fuzzy_lookup("papya", 0.0, 2);
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_fuzzy_ties_keep_insertion_order() {
        let index = FastIndex::build(&records(&["abd", "abe", "abf"]));
        let matches = index.fuzzy_lookup("abc", 0.6, 10);
        let names: Vec<_> = matches.iter().map(|m| m.record.name.as_str()).collect();
        assert_eq!(names, vec!["abd", "abe", "abf"]);
    }

    #[test]
    fn test_empty_index_degrades() {
        let index = FastIndex::new();
        assert!(index.is_empty());
        assert!(index.exact_lookup("milk").is_none());
        assert!(index.fuzzy_lookup("milk", 0.7, 10).is_empty());
        assert!(index.keyword_lookup("milk").is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let input = vec![
            Arc::new(Record::guidance("Raw papaya", Polarity::Dont)),
            Arc::new(Record::guidance("Milk", Polarity::Do)),
        ];
        let a = FastIndex::build(&input);
        let b = FastIndex::build(&input);

        assert_eq!(a.names().collect::<Vec<_>>(), b.names().collect::<Vec<_>>());
        assert_eq!(a.keyword_lookup("papaya").len(), b.keyword_lookup("papaya").len());
    }
}
