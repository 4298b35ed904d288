//! Command-line options shared by the server and CLI binaries

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::EngineOptions;
use crate::error::LoadError;
use crate::expression::MissingSignPolicy;
use crate::vector::{demo_store, EmbeddingFormat, EmbeddingStore, LoadOptions};

/// Where to get the vocabulary from and how to query it
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to the embedding file
    #[arg(short, long, env = "MODEL_PATH", default_value = "model/model.bin")]
    pub model: PathBuf,

    /// Embedding file format: text, binary or auto (by extension)
    #[arg(long, default_value = "text")]
    pub format: EmbeddingFormat,

    /// Treat words differing only in case as distinct
    #[arg(long, default_value_t = false)]
    pub case_sensitive: bool,

    /// Load only the first N words of the file
    #[arg(long)]
    pub max_words: Option<usize>,

    /// Serve the small built-in vocabulary instead of loading a file
    #[arg(long, default_value_t = false)]
    pub demo: bool,

    /// Results per arithmetic query when the request has no `n`
    #[arg(long, default_value_t = 5)]
    pub default_n: usize,

    /// Upper bound on any requested `n`
    #[arg(long, default_value_t = 1000)]
    pub max_n: usize,

    /// Two words without an operator: implicit-plus or reject
    #[arg(long, default_value = "implicit-plus")]
    pub missing_sign: MissingSignPolicy,

    /// Report `king.` as `king` in arithmetic results (default: on for text files)
    #[arg(long)]
    pub strip_trailing_periods: Option<bool>,
}

impl ModelArgs {
    pub fn load_options(&self) -> LoadOptions {
        let options = LoadOptions::default()
            .with_format(self.format)
            .with_case_sensitive(self.case_sensitive);
        match self.max_words {
            Some(max) => options.with_max_words(max),
            None => options,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        let options = EngineOptions::default()
            .with_default_arithmetic_k(self.default_n)
            .with_max_k(self.max_n)
            .with_missing_sign(self.missing_sign);
        match self.strip_trailing_periods {
            Some(strip) => options.with_strip_trailing_periods(strip),
            None => options,
        }
    }

    /// Build the store, either from `--model` or the demo vocabulary
    pub fn load_store(&self) -> Result<Arc<EmbeddingStore>, LoadError> {
        let store = if self.demo {
            warn!("Serving the built-in demo vocabulary");
            demo_store()?
        } else {
            EmbeddingStore::load(&self.model, &self.load_options())?
        };
        info!(
            words = store.len(),
            dimension = store.dimension(),
            source = %store.source(),
            "Embedding store ready"
        );
        Ok(Arc::new(store))
    }
}
