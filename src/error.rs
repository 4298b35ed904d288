//! Error Types
//!
//! One enum per pipeline stage, unified under [`QueryError`] for callers that
//! drive the whole pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to build an [`EmbeddingStore`](crate::vector::EmbeddingStore).
///
/// Always fatal: the server refuses to start with a partial vocabulary.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read embedding source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding source contains no vectors")]
    EmptyVocabulary,

    #[error("Dimension mismatch for '{word}' at line {line}: expected {expected}, got {found}")]
    DimensionMismatch {
        word: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Malformed embedding source at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl LoadError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        LoadError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Malformed user expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expression is empty")]
    Empty,

    /// A sign with no word after it, either at the end of the expression or
    /// directly followed by another sign. `position` is the 1-based token index.
    #[error("Dangling sign '{sign}' at token {position}: every '+' or '-' must be followed by a word")]
    DanglingSign { sign: char, position: usize },

    #[error("Missing '+' or '-' before '{word}' at token {position}")]
    MissingSign { word: String, position: usize },
}

/// Failure to combine the parsed terms into a result vector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Word '{0}' not in vocabulary")]
    UnknownWord(String),

    #[error("Expression has no terms to evaluate")]
    NoTerms,
}

/// Invalid 2D/3D projection request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Dimensions must be 2 or 3")]
    InvalidDimensions(usize),

    #[error("Method must be 'pca' or 'tsne'")]
    UnsupportedMethod(String),

    #[error("No words to project")]
    NoWords,

    #[error("Words not found in vocabulary: {}", .0.join(", "))]
    UnknownWords(Vec<String>),
}

/// Any per-request failure of the query engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}
