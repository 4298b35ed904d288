//! semshapes - Word Embedding Arithmetic Service
//!
//! Loads a fixed vocabulary of word vectors, evaluates signed word sums such
//! as `king - man + woman`, and ranks the vocabulary by cosine similarity to
//! the result.

pub mod args;
pub mod engine;
pub mod error;
pub mod expression;
pub mod metrics;
pub mod server;
pub mod vector;

pub use engine::{EngineOptions, QueryEngine};
pub use error::{EvaluationError, LoadError, ParseError, ProjectionError, QueryError};
pub use expression::{evaluate, parse, MissingSignPolicy, Parser, SignedTerm};
pub use metrics::Metrics;
pub use server::{AppState, Config, Server};
pub use vector::{search, EmbeddingFormat, EmbeddingStore, LoadOptions, Neighbor};
