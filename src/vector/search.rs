//! Nearest-Neighbor Search
//!
//! Linear-scan top-K retrieval by cosine similarity.
//!
//! [`search`] keeps a bounded min-heap of the best `k` candidates seen so
//! far; [`search_exhaustive`] scores and sorts the whole vocabulary. Both use
//! the same ordering (similarity descending, then word ascending) and must
//! return identical lists.

use hashbrown::HashSet;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::embedding_store::EmbeddingStore;
use super::similarity::{cosine_with_norms, magnitude};

/// One ranked search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub word: String,
    pub similarity: f32,
}

/// Scored row borrowed from the store. `Greater` means ranked higher.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    similarity: f32,
    word: &'a str,
}

impl<'a> Candidate<'a> {
    fn new(word: &'a str, similarity: f32) -> Self {
        // Fold -0.0 into 0.0 so total_cmp treats them as a tie
        Self {
            similarity: similarity + 0.0,
            word,
        }
    }

    fn into_neighbor(self) -> Neighbor {
        Neighbor {
            word: self.word.to_string(),
            similarity: self.similarity,
        }
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.word.cmp(self.word))
    }
}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

/// Score every row accepted by `keep` against `query`
fn candidates<'a, F>(
    query: &'a [f32],
    store: &'a EmbeddingStore,
    keep: F,
) -> impl Iterator<Item = Candidate<'a>> + 'a
where
    F: Fn(&str) -> bool + 'a,
{
    debug_assert_eq!(query.len(), store.dimension(), "Vector dimensions must match");
    let query_norm = magnitude(query);

    store
        .rows()
        .filter(move |(word, _, _)| keep(*word))
        .map(move |(word, vector, norm)| {
            Candidate::new(word, cosine_with_norms(query, query_norm, vector, norm))
        })
}

/// Top-`k` most similar words to `query`, skipping `excluded`
pub fn search(
    query: &[f32],
    excluded: &HashSet<String>,
    store: &EmbeddingStore,
    k: usize,
) -> Vec<Neighbor> {
    search_where(query, store, k, |word| !excluded.contains(word))
}

/// Top-`k` most similar words among those accepted by `keep`
pub fn search_where<F>(query: &[f32], store: &EmbeddingStore, k: usize, keep: F) -> Vec<Neighbor>
where
    F: Fn(&str) -> bool,
{
    if k == 0 {
        return Vec::new();
    }

    // Never more than the vocabulary, whatever the caller asked for
    let capacity = k.min(store.len()).saturating_add(1);
    let mut heap: BinaryHeap<Reverse<Candidate<'_>>> = BinaryHeap::with_capacity(capacity);
    for candidate in candidates(query, store, keep) {
        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if let Some(mut worst) = heap.peek_mut() {
            if candidate > worst.0 {
                *worst = Reverse(candidate);
            }
        }
    }

    // Ascending order of Reverse is best-first
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(c)| c.into_neighbor())
        .collect()
}

/// Reference implementation: score everything, sort, truncate
pub fn search_exhaustive(
    query: &[f32],
    excluded: &HashSet<String>,
    store: &EmbeddingStore,
    k: usize,
) -> Vec<Neighbor> {
    let mut all: Vec<Candidate<'_>> =
        candidates(query, store, |word| !excluded.contains(word)).collect();
    all.sort_unstable_by(|a, b| b.cmp(a));
    all.truncate(k);
    all.into_iter().map(Candidate::into_neighbor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(entries: &[(&str, [f32; 3])]) -> EmbeddingStore {
        EmbeddingStore::from_entries(entries.iter().map(|(w, v)| (*w, v.to_vec())), true).unwrap()
    }

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_find_nearest() {
        let store = store(&[
            ("a", [1.0, 0.0, 0.0]),
            ("b", [0.9, 0.1, 0.0]),
            ("c", [0.0, 1.0, 0.0]),
        ]);

        let results = search(&[1.0, 0.0, 0.0], &none(), &store, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].word, "a");
        assert_eq!(results[1].word, "b");
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_excluded_words_skipped() {
        let store = store(&[("a", [1.0, 0.0, 0.0]), ("b", [0.9, 0.1, 0.0])]);
        let excluded: HashSet<String> = ["a".to_string()].into_iter().collect();

        let results = search(&[1.0, 0.0, 0.0], &excluded, &store, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].word, "b");
    }

    #[test]
    fn test_ties_break_lexically() {
        let store = store(&[
            ("pear", [0.0, 1.0, 0.0]),
            ("apple", [0.0, 2.0, 0.0]),
            ("fig", [0.0, 3.0, 0.0]),
            ("zzz", [1.0, 0.0, 0.0]),
        ]);

        let results = search(&[0.0, 1.0, 0.0], &none(), &store, 3);
        let words: Vec<&str> = results.iter().map(|n| n.word.as_str()).collect();
        assert_eq!(words, vec!["apple", "fig", "pear"]);
    }

    #[test]
    fn test_zero_query_scores_zero() {
        let store = store(&[("b", [1.0, 0.0, 0.0]), ("a", [0.0, 1.0, 0.0])]);
        let results = search(&[0.0, 0.0, 0.0], &none(), &store, 5);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|n| n.similarity == 0.0));
        assert_eq!(results[0].word, "a");
    }

    #[test]
    fn test_zero_k_and_oversized_k() {
        let store = store(&[("a", [1.0, 0.0, 0.0]), ("b", [0.0, 1.0, 0.0])]);
        assert!(search(&[1.0, 0.0, 0.0], &none(), &store, 0).is_empty());
        assert_eq!(search(&[1.0, 0.0, 0.0], &none(), &store, 100).len(), 2);
    }

    #[test]
    fn test_unbounded_k_returns_whole_vocabulary() {
        let store = store(&[("a", [1.0, 0.0, 0.0]), ("b", [0.0, 1.0, 0.0])]);
        let results = search(&[1.0, 0.0, 0.0], &none(), &store, usize::MAX);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].word, "a");
        assert_eq!(search(&[1.0, 0.0, 0.0], &none(), &store, 1 << 40).len(), 2);
        assert_eq!(search_exhaustive(&[1.0, 0.0, 0.0], &none(), &store, usize::MAX).len(), 2);
    }

    #[test]
    fn test_search_where_predicate() {
        let store = store(&[("a", [1.0, 0.0, 0.0]), ("a.", [1.0, 0.0, 0.0]), ("b", [0.0, 1.0, 0.0])]);
        let results = search_where(&[1.0, 0.0, 0.0], &store, 5, |w| !w.ends_with('.'));
        let words: Vec<&str> = results.iter().map(|n| n.word.as_str()).collect();
        assert_eq!(words, vec!["a", "b"]);
    }

    #[test]
    fn test_negative_similarity_ranked_last() {
        let store = store(&[("up", [0.0, 1.0, 0.0]), ("down", [0.0, -1.0, 0.0])]);
        let results = search(&[0.0, 1.0, 0.0], &none(), &store, 2);
        assert_eq!(results[1].word, "down");
        assert!((results[1].similarity + 1.0).abs() < 1e-6);
    }

    fn arb_store() -> impl Strategy<Value = EmbeddingStore> {
        // Small integer components make exact ties common
        prop::collection::vec(prop::collection::vec(-3i8..=3, 4), 1..40).prop_map(|rows| {
            EmbeddingStore::from_entries(
                rows.into_iter().enumerate().map(|(i, row)| {
                    (
                        format!("w{:02}", (i * 7) % 40),
                        row.into_iter().map(f32::from).collect::<Vec<f32>>(),
                    )
                }),
                true,
            )
            .unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_heap_matches_exhaustive(
            store in arb_store(),
            query in prop::collection::vec(-3i8..=3, 4),
            k in 0usize..50,
        ) {
            let query: Vec<f32> = query.into_iter().map(f32::from).collect();
            let heap = search(&query, &none(), &store, k);
            let full = search_exhaustive(&query, &none(), &store, k);
            prop_assert_eq!(heap, full);
        }

        #[test]
        fn prop_results_ranked_bounded_and_filtered(
            store in arb_store(),
            query in prop::collection::vec(-3i8..=3, 4),
            skip in 0usize..40,
            k in 1usize..20,
        ) {
            let query: Vec<f32> = query.into_iter().map(f32::from).collect();
            let excluded: HashSet<String> =
                store.word(skip % store.len()).map(str::to_string).into_iter().collect();

            let results = search(&query, &excluded, &store, k);
            prop_assert!(results.len() <= k);
            for n in &results {
                prop_assert!(!excluded.contains(&n.word));
                prop_assert!((-1.0..=1.0).contains(&n.similarity));
            }
            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].similarity > pair[1].similarity
                        || (pair[0].similarity == pair[1].similarity && pair[0].word < pair[1].word)
                );
            }
        }
    }
}
