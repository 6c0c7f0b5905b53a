//! N-gram language model and constrained text generation library.
//!
//! This crate provides a token-level Markov model including:
//! - A frequency trie over windows of `n` tokens
//! - Training from raw texts or pre-split sentences
//! - Sentence generation by weighted random walk with backtracking,
//!   bounded by length, originality and duplicate constraints
//! - Probability and completion queries
//! - JSON and compact binary persistence
//!
//! ```no_run
//! use rs_markov_core::model::markov::MarkovModel;
//! use rs_markov_core::model::options::GenerateOptions;
//!
//! let mut model = MarkovModel::new(3)?;
//! model.add_text("The dog ate the boy. The boy saw the dog.", 1);
//! println!("{}", model.generate(&GenerateOptions::default())?);
//! # Ok::<(), rs_markov_core::errors::MarkovError>(())
//! ```

/// Core model, generation, queries and persistence.
pub mod model;

/// Error type shared by the whole crate.
pub mod errors;

/// Sentence splitting and tokenization.
pub mod tokenizer;

/// I/O utilities (corpus loading, path helpers).
pub mod io;

pub use errors::{MarkovError, Result};
pub use model::markov::MarkovModel;
pub use model::options::{GenerateOptions, MarkovOptions, Seed};
pub use tokenizer::{DefaultTokenizer, Tokenizer};
