//! Query Engine
//!
//! Runs parse -> evaluate -> search for one request against the shared,
//! immutable store. Holds no per-request state, so one engine serves every
//! handler concurrently.

use hashbrown::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{EvaluationError, ProjectionError, QueryError};
use crate::expression::{evaluate, Evaluation, MissingSignPolicy, Parser};
use crate::vector::{
    project_pca, project_tsne, search, search_where, EmbeddingStore, Neighbor, ProjectionMethod,
    SourceKind,
};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Results returned by arithmetic queries when the caller gives no `n`
    pub default_arithmetic_k: usize,
    /// Results returned by similar-word queries when the caller gives no `n`
    pub default_similar_k: usize,
    /// Upper bound on any caller-supplied `n`
    pub max_k: usize,
    /// Handling of two words with no operator between them
    pub missing_sign: MissingSignPolicy,
    /// Treat `king.` as `king` in arithmetic results. `None` enables it for
    /// text sources, whose tokenizers leave sentence periods attached.
    pub strip_trailing_periods: Option<bool>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_arithmetic_k: 5,
            default_similar_k: 10,
            max_k: 1000,
            missing_sign: MissingSignPolicy::ImplicitPlus,
            strip_trailing_periods: None,
        }
    }
}

impl EngineOptions {
    pub fn with_default_arithmetic_k(mut self, k: usize) -> Self {
        self.default_arithmetic_k = k;
        self
    }

    pub fn with_max_k(mut self, max_k: usize) -> Self {
        self.max_k = max_k;
        self
    }

    pub fn with_missing_sign(mut self, policy: MissingSignPolicy) -> Self {
        self.missing_sign = policy;
        self
    }

    pub fn with_strip_trailing_periods(mut self, strip: bool) -> Self {
        self.strip_trailing_periods = Some(strip);
        self
    }

    /// Whether arithmetic results over a `source` store fold trailing periods
    pub fn strips_trailing_periods(&self, source: SourceKind) -> bool {
        self.strip_trailing_periods.unwrap_or(source == SourceKind::Text)
    }
}

/// Model metadata reported by `/api/info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub model_type: SourceKind,
    pub dimensions: usize,
    pub vocab_size: usize,
}

/// 2D/3D coordinates for a list of words
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub words: Vec<String>,
    pub method: ProjectionMethod,
    pub dimensions: usize,
    pub coordinates: Vec<Vec<f32>>,
}

/// Word-embedding query engine
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<EmbeddingStore>,
    parser: Parser,
    options: EngineOptions,
}

impl QueryEngine {
    pub fn new(store: Arc<EmbeddingStore>, options: EngineOptions) -> Self {
        let parser = Parser::for_store(&store).with_missing_sign(options.missing_sign);
        Self {
            store,
            parser,
            options,
        }
    }

    pub fn store(&self) -> &Arc<EmbeddingStore> {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.store.source(),
            dimensions: self.store.dimension(),
            vocab_size: self.store.len(),
        }
    }

    fn clamp_k(&self, requested: Option<usize>, default: usize) -> usize {
        requested.unwrap_or(default).min(self.options.max_k)
    }

    /// Evaluate a signed word expression and return its nearest words,
    /// excluding the words of the expression itself
    pub fn arithmetic(&self, expression: &str, n: Option<usize>) -> Result<Vec<Neighbor>, QueryError> {
        let k = self.clamp_k(n, self.options.default_arithmetic_k);
        let terms = self.parser.parse(expression)?;
        let evaluation = evaluate(&terms, &self.store)?;
        let results = if self.options.strips_trailing_periods(self.store.source()) {
            self.search_period_folded(&evaluation, k)
        } else {
            search(&evaluation.vector, &evaluation.used_words, &self.store, k)
        };
        debug!(terms = terms.len(), k, hits = results.len(), "Arithmetic query evaluated");
        Ok(results)
    }

    /// Arithmetic search where `queen.` is reported as `queen`, words equal to
    /// an expression term once periods are stripped are excluded, and each
    /// stripped word appears once, at its best rank
    fn search_period_folded(&self, evaluation: &Evaluation, k: usize) -> Vec<Neighbor> {
        let stems: HashSet<&str> = evaluation
            .used_words
            .iter()
            .map(|w| strip_periods(w))
            .collect();
        let keep = |word: &str| {
            let stem = strip_periods(word);
            !stem.is_empty() && !stems.contains(stem)
        };

        // Merging can drop hits, so widen the window until k distinct words
        // survive or the vocabulary runs out
        let mut window = k;
        loop {
            let hits = search_where(&evaluation.vector, &self.store, window, keep);
            let exhausted = hits.len() < window;

            let mut seen: HashSet<String> = HashSet::with_capacity(hits.len());
            let results: Vec<Neighbor> = hits
                .into_iter()
                .filter_map(|hit| {
                    let stem = strip_periods(&hit.word).to_string();
                    seen.insert(stem.clone()).then(|| Neighbor {
                        word: stem,
                        similarity: hit.similarity,
                    })
                })
                .take(k)
                .collect();

            if results.len() >= k || exhausted {
                return results;
            }
            window = window.saturating_mul(2);
        }
    }

    /// Nearest words to a single word, excluding the word itself
    pub fn similar(&self, word: &str, n: Option<usize>) -> Result<Vec<Neighbor>, QueryError> {
        let k = self.clamp_k(n, self.options.default_similar_k);
        let vector = self.vector(word)?;
        let excluded: HashSet<String> = [self.store.normalize(word).into_owned()].into_iter().collect();
        Ok(search(vector, &excluded, &self.store, k))
    }

    /// Raw embedding of a word
    pub fn vector(&self, word: &str) -> Result<&[f32], QueryError> {
        self.store
            .lookup(word)
            .ok_or_else(|| EvaluationError::UnknownWord(word.to_string()).into())
    }

    /// Vocabulary words in load order, optionally filtered by prefix
    pub fn vocabulary(&self, limit: usize, starts_with: Option<&str>) -> Vec<String> {
        let prefix = starts_with
            .filter(|p| !p.is_empty())
            .map(|p| self.store.normalize(p).into_owned());
        self.store
            .words()
            .iter()
            .filter(|w| prefix.as_deref().map_or(true, |p| w.starts_with(p)))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Project words onto their principal components
    pub fn project(
        &self,
        words: &[String],
        method: ProjectionMethod,
        dimensions: usize,
    ) -> Result<Projection, QueryError> {
        if words.is_empty() {
            return Err(ProjectionError::NoWords.into());
        }
        let unknown: Vec<String> = words
            .iter()
            .filter(|w| !self.store.contains(w))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ProjectionError::UnknownWords(unknown).into());
        }

        let rows: Vec<&[f32]> = words.iter().filter_map(|w| self.store.lookup(w)).collect();
        let coordinates = match method {
            ProjectionMethod::Pca => project_pca(&rows, dimensions)?,
            ProjectionMethod::Tsne => project_tsne(&rows, dimensions)?,
        };

        Ok(Projection {
            words: words.to_vec(),
            method,
            dimensions,
            coordinates,
        })
    }
}

fn strip_periods(word: &str) -> &str {
    word.trim_end_matches('.')
}
