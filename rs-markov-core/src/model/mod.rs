//! Top-level module of the Markov model.
//!
//! - The model tree (`Trie`) and its nodes
//! - The model itself and its builder (`MarkovModel`)
//! - Constrained generation (`generator`)
//! - Probability and completion queries (`query`)
//! - Persistence (`serialize`)
//! - Construction and generation options (`options`)
//! - Indexed training input (`input`)

/// Arena-backed prefix tree of token windows.
pub mod trie;

/// The model and its training entry points.
pub mod markov;

/// Sentence generation by backtracking random walk.
pub mod generator;

/// Probabilities and completions.
pub mod query;

/// JSON and binary (de)serialization.
pub mod serialize;

/// Typed options, validated when a call starts.
pub mod options;

/// Training tokens kept for originality checks.
pub mod input;
