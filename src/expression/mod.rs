//! Expression Module
//!
//! Parsing and evaluation of signed word sums such as `king - man + woman`.

mod evaluator;
mod parser;

pub use evaluator::{evaluate, Evaluation};
pub use parser::{parse, MissingSignPolicy, Parser, Sign, SignedTerm};
