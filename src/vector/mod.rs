//! Vector Module
//!
//! Embedding storage, file loading, similarity and nearest-neighbor search.

mod demo;
mod embedding_store;
mod loader;
mod projection;
mod search;
mod similarity;
mod tsne;

pub use demo::demo_store;
pub use embedding_store::{EmbeddingStore, LoadOptions, SourceKind};
pub(crate) use embedding_store::fold_case;
pub use loader::EmbeddingFormat;
pub use projection::{project_pca, ProjectionMethod};
pub use search::{search, search_exhaustive, search_where, Neighbor};
pub use tsne::project_tsne;
pub use similarity::{cosine_similarity, dot_product, magnitude, VectorOps};
