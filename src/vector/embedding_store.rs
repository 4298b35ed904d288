//! Embedding Store
//!
//! Immutable word -> vector table, built once at startup and shared
//! read-only between request handlers.

use hashbrown::HashMap;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use super::loader::{self, EmbeddingFormat};
use super::similarity::magnitude;
use crate::error::LoadError;

/// Where the vectors of a store came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// word2vec / fastText text format
    Text,
    /// word2vec binary format
    Binary,
    /// Built from in-memory pairs
    InMemory,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Text => write!(f, "word2vec-text"),
            SourceKind::Binary => write!(f, "word2vec-binary"),
            SourceKind::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Options controlling how an embedding source is read
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// On-disk format of the source
    pub format: EmbeddingFormat,
    /// Keep words as written instead of lowercasing them
    pub case_sensitive: bool,
    /// Stop after this many entries
    pub max_words: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: EmbeddingFormat::Text,
            case_sensitive: false,
            max_words: None,
        }
    }
}

impl LoadOptions {
    pub fn with_format(mut self, format: EmbeddingFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = Some(max_words);
        self
    }
}

/// Read-only embedding table
///
/// Vectors live in one contiguous row-major buffer; `index` maps a word to
/// its row. Nothing is mutated after [`StoreBuilder::finish`].
pub struct EmbeddingStore {
    words: Vec<String>,
    data: Vec<f32>,
    norms: Vec<f32>,
    index: HashMap<String, usize>,
    dimension: usize,
    case_sensitive: bool,
    source: SourceKind,
}

impl fmt::Debug for EmbeddingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingStore")
            .field("len", &self.words.len())
            .field("dimension", &self.dimension)
            .field("case_sensitive", &self.case_sensitive)
            .field("source", &self.source)
            .finish()
    }
}

impl EmbeddingStore {
    /// Load a store from a file on disk
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let format = options.format.resolve(path);
        info!(path = %path.display(), ?format, "Loading word embeddings");

        let store = match format {
            EmbeddingFormat::Binary => loader::load_binary(path, options)?,
            _ => loader::load_text(path, options)?,
        };

        info!(
            "Loaded model with {} words and {} dimensions",
            store.len(),
            store.dimension()
        );
        Ok(store)
    }

    /// Load at most `max_words` entries from the head of a file
    pub fn load_limited(
        path: impl AsRef<Path>,
        options: &LoadOptions,
        max_words: usize,
    ) -> Result<Self, LoadError> {
        Self::load(path, &options.clone().with_max_words(max_words))
    }

    /// Build a store from in-memory `(word, vector)` pairs, applying the same
    /// validation as [`EmbeddingStore::load`]
    pub fn from_entries<W, V, I>(entries: I, case_sensitive: bool) -> Result<Self, LoadError>
    where
        W: AsRef<str>,
        V: AsRef<[f32]>,
        I: IntoIterator<Item = (W, V)>,
    {
        let mut builder = StoreBuilder::new(case_sensitive);
        for (line, (word, vector)) in entries.into_iter().enumerate() {
            builder.push(word.as_ref(), vector.as_ref(), line + 1)?;
        }
        builder.finish(SourceKind::InMemory)
    }

    /// Get embedding dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of words in the vocabulary
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a successfully loaded store
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Apply the store's case policy to a word
    pub fn normalize<'a>(&self, word: &'a str) -> Cow<'a, str> {
        fold_case(word, self.case_sensitive)
    }

    /// Get the vector for a word
    pub fn lookup(&self, word: &str) -> Option<&[f32]> {
        self.position(word).map(|idx| self.row(idx))
    }

    /// Check if a word is in the vocabulary
    pub fn contains(&self, word: &str) -> bool {
        self.position(word).is_some()
    }

    /// Row index of a word
    pub fn position(&self, word: &str) -> Option<usize> {
        self.index.get(&*self.normalize(word)).copied()
    }

    /// Word at a row index
    pub fn word(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    /// Pre-computed L2 norm of a row
    pub fn norm(&self, idx: usize) -> f32 {
        self.norms[idx]
    }

    /// All words in load order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Iterate `(word, vector)` pairs in load order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.words
            .iter()
            .map(String::as_str)
            .zip(self.data.chunks_exact(self.dimension))
    }

    /// Iterate rows together with their norms, for the search loop
    pub(crate) fn rows(&self) -> impl Iterator<Item = (&str, &[f32], f32)> + '_ {
        self.iter()
            .zip(self.norms.iter().copied())
            .map(|((word, vector), norm)| (word, vector, norm))
    }

    fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.dimension;
        &self.data[start..start + self.dimension]
    }
}

/// The one case rule shared by loading, lookup and expression parsing
pub(crate) fn fold_case(word: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive || (word.is_ascii() && !word.bytes().any(|b| b.is_ascii_uppercase())) {
        return Cow::Borrowed(word);
    }
    // Titlecase letters such as 'ǅ' are not `is_uppercase` but still fold
    let lower = word.to_lowercase();
    if lower == word {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(lower)
    }
}

/// Accumulates validated entries while a source is being read
pub(crate) struct StoreBuilder {
    words: Vec<String>,
    data: Vec<f32>,
    index: HashMap<String, usize>,
    dimension: Option<usize>,
    case_sensitive: bool,
    duplicates: usize,
}

impl StoreBuilder {
    pub(crate) fn new(case_sensitive: bool) -> Self {
        Self {
            words: Vec::new(),
            data: Vec::new(),
            index: HashMap::new(),
            dimension: None,
            case_sensitive,
            duplicates: 0,
        }
    }

    /// Fix the dimension up front (from a file header)
    pub(crate) fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.words.len()
    }

    /// Add one entry. The first occurrence of a word wins.
    pub(crate) fn push(&mut self, word: &str, vector: &[f32], line: usize) -> Result<(), LoadError> {
        let expected = *self.dimension.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(LoadError::DimensionMismatch {
                word: word.to_string(),
                line,
                expected,
                found: vector.len(),
            });
        }
        if expected == 0 {
            return Err(LoadError::malformed(line, format!("'{}' has no vector components", word)));
        }
        if let Some(bad) = vector.iter().find(|x| !x.is_finite()) {
            return Err(LoadError::malformed(
                line,
                format!("non-finite component {} for '{}'", bad, word),
            ));
        }

        let key = fold_case(word, self.case_sensitive).into_owned();
        if self.index.contains_key(&key) {
            self.duplicates += 1;
            return Ok(());
        }
        self.index.insert(key.clone(), self.words.len());
        self.words.push(key);
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub(crate) fn finish(self, source: SourceKind) -> Result<EmbeddingStore, LoadError> {
        if self.words.is_empty() {
            return Err(LoadError::EmptyVocabulary);
        }
        if self.duplicates > 0 {
            warn!(
                duplicates = self.duplicates,
                "Skipped duplicate words, keeping first occurrence"
            );
        }
        let dimension = self.dimension.unwrap_or_default();
        let norms = self.data.chunks_exact(dimension).map(magnitude).collect();

        Ok(EmbeddingStore {
            words: self.words,
            data: self.data,
            norms,
            index: self.index,
            dimension,
            case_sensitive: self.case_sensitive,
            source,
        })
    }
}
