//! Vector Evaluation
//!
//! Sums the signed term vectors into one query vector.

use hashbrown::HashSet;

use super::parser::SignedTerm;
use crate::error::EvaluationError;
use crate::vector::{EmbeddingStore, VectorOps};

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// `Σ sign × vector`, not normalized
    pub vector: Vec<f32>,
    /// Distinct words of the expression, as stored; excluded from search
    pub used_words: HashSet<String>,
}

/// Evaluate `terms` against `store`.
///
/// Fails on the first term, in expression order, whose word is not in the
/// vocabulary. Unknown words are never skipped.
pub fn evaluate(terms: &[SignedTerm], store: &EmbeddingStore) -> Result<Evaluation, EvaluationError> {
    if terms.is_empty() {
        return Err(EvaluationError::NoTerms);
    }

    let mut vector = vec![0.0f32; store.dimension()];
    let mut used_words = HashSet::with_capacity(terms.len());

    for term in terms {
        let embedding = store
            .lookup(&term.word)
            .ok_or_else(|| EvaluationError::UnknownWord(term.word.clone()))?;
        vector.as_mut_slice().add_scaled(embedding, term.sign.factor());
        used_words.insert(store.normalize(&term.word).into_owned());
    }

    debug_assert_eq!(vector.len(), store.dimension());
    Ok(Evaluation { vector, used_words })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parse;

    fn store() -> EmbeddingStore {
        EmbeddingStore::from_entries(
            [
                ("king", vec![1.0, 1.0, 0.0]),
                ("man", vec![0.0, 1.0, 0.0]),
                ("woman", vec![0.0, 0.0, 1.0]),
            ],
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_signed_sum() {
        let terms = parse("king - man + woman").unwrap();
        let eval = evaluate(&terms, &store()).unwrap();
        assert_eq!(eval.vector, vec![1.0, 0.0, 1.0]);
        assert_eq!(eval.used_words.len(), 3);
        assert!(eval.used_words.contains("man"));
    }

    #[test]
    fn test_repeated_word_counted_once_for_exclusion() {
        let terms = parse("king + king - king").unwrap();
        let eval = evaluate(&terms, &store()).unwrap();
        assert_eq!(eval.vector, vec![1.0, 1.0, 0.0]);
        assert_eq!(eval.used_words.len(), 1);
    }

    #[test]
    fn test_first_unknown_word_reported() {
        let terms = parse("king - banana + cherry").unwrap();
        assert_eq!(
            evaluate(&terms, &store()).unwrap_err(),
            EvaluationError::UnknownWord("banana".to_string())
        );
    }

    #[test]
    fn test_no_terms() {
        assert_eq!(evaluate(&[], &store()).unwrap_err(), EvaluationError::NoTerms);
    }

    #[test]
    fn test_cancelling_terms_give_zero_vector() {
        let terms = parse("man - man").unwrap();
        let eval = evaluate(&terms, &store()).unwrap();
        assert!(eval.vector.iter().all(|x| *x == 0.0));
    }
}
