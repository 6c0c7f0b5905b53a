//! Error types of the Markov model.
//!
//! Configuration errors are raised immediately when a call is malformed.
//! Exhaustion errors are raised by the generator once its retry budget is
//! spent. Soft rejections (too short, duplicated, copied from the input...)
//! never leave the generator and therefore have no variant here.

/// Result type used across the crate, defaulting to [`MarkovError`].
pub type Result<T, E = MarkovError> = std::result::Result<T, E>;

/// Every error the model can surface to a caller.
#[derive(Debug, thiserror::Error)]
pub enum MarkovError {
	/// The order of the model is below the minimum.
	#[error("n must be >= 2, got {0}")]
	InvalidOrder(usize),

	/// `max_length_match` is shorter than the model order.
	#[error("max_length_match must be >= n ({n}), got {mlm}")]
	InvalidMaxLengthMatch { mlm: usize, n: usize },

	/// A temperature that is not strictly positive.
	#[error("temperature must be greater than 0, got {0}")]
	InvalidTemperature(f64),

	/// A malformed probability or completion query.
	#[error("invalid query: {0}")]
	InvalidQuery(String),

	/// Inconsistent generation options (count, lengths).
	#[error("invalid options: {0}")]
	InvalidOptions(String),

	/// The seed does not exist as a path in the model.
	#[error("seed not found in model: '{0}'")]
	UnknownSeed(String),

	/// Every sentence start was tried and failed.
	#[error("no valid sentence start remaining after {tries} tries and {successes} successes")]
	NoSentenceStart { tries: usize, successes: usize },

	/// The retry budget (or the safety loop bound) was exceeded.
	#[error("failed after {tries} tries and {successes} successes")]
	Exhausted { tries: usize, successes: usize },

	/// The backtracking state became inconsistent.
	#[error("unable to resolve backtracking state: {0}")]
	Backtrack(String),

	/// JSON (de)serialization failure.
	#[error(transparent)]
	Json(#[from] serde_json::Error),

	/// Binary (de)serialization failure.
	#[error(transparent)]
	Postcard(#[from] postcard::Error),

	/// I/O failure while reading a corpus or a cached model.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl MarkovError {
	/// Returns `true` for errors raised after the retry budget was spent.
	pub fn is_exhaustion(&self) -> bool {
		matches!(
			self,
			MarkovError::NoSentenceStart { .. } | MarkovError::Exhausted { .. } | MarkovError::Backtrack(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_exhaustion_classification() {
		assert!(MarkovError::Exhausted { tries: 3, successes: 1 }.is_exhaustion());
		assert!(MarkovError::NoSentenceStart { tries: 0, successes: 0 }.is_exhaustion());
		assert!(!MarkovError::InvalidOrder(1).is_exhaustion());
		assert!(!MarkovError::InvalidTemperature(0.0).is_exhaustion());
	}

	#[test]
	fn test_messages_carry_counts() {
		let msg = MarkovError::Exhausted { tries: 999, successes: 2 }.to_string();
		assert!(msg.contains("999"));
		assert!(msg.contains('2'));
	}
}
