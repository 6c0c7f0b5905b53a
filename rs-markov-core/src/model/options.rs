use serde::{Deserialize, Serialize};

use crate::errors::{MarkovError, Result};

/// Default retry budget of a generation call.
pub const DEFAULT_MAX_ATTEMPTS: usize = 999;

/// Default minimum sentence length, in tokens.
pub const DEFAULT_MIN_LENGTH: usize = 5;

/// Default maximum sentence length, in tokens.
pub const DEFAULT_MAX_LENGTH: usize = 35;

/// Construction options of a [`MarkovModel`](super::markov::MarkovModel).
///
/// # Invariants
/// - `max_length_match`, when set, is >= the model order
/// - `max_attempts` is > 0
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MarkovOptions {
	/// Longest run of tokens a generated text may share verbatim with the input.
	pub max_length_match: Option<usize>,

	/// Number of failures tolerated by one generation call.
	pub max_attempts: usize,

	/// Logs every rejection of the generator at `info` level.
	pub trace: bool,

	/// Skips the "sentence copied from the input" check.
	pub disable_input_checks: bool,
}

impl Default for MarkovOptions {
	fn default() -> Self {
		Self {
			max_length_match: None,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
			trace: false,
			disable_input_checks: false,
		}
	}
}

impl MarkovOptions {
	/// Checks the options against the model order `n`.
	pub(crate) fn validate(&self, n: usize) -> Result<()> {
		if let Some(mlm) = self.max_length_match {
			if mlm < n {
				return Err(MarkovError::InvalidMaxLengthMatch { mlm, n });
			}
		}
		if self.max_attempts == 0 {
			return Err(MarkovError::InvalidOptions("max_attempts must be > 0".to_owned()));
		}
		Ok(())
	}

	/// Whether the flattened input has to be kept for originality checks.
	pub(crate) fn keeps_input(&self) -> bool {
		!self.disable_input_checks || self.max_length_match.is_some()
	}
}

/// Strategy used to start the first generated sentence.
///
/// # Variants
/// - `Text(String)`: tokenized with the model's tokenizer first
/// - `Tokens(Vec<String>)`: used as-is
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Seed {
	Text(String),
	Tokens(Vec<String>),
}

impl From<&str> for Seed {
	fn from(value: &str) -> Self {
		Seed::Text(value.to_owned())
	}
}

impl From<Vec<String>> for Seed {
	fn from(value: Vec<String>) -> Self {
		Seed::Tokens(value)
	}
}

/// Parameters of a generation call.
///
/// Validated once, when the call starts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerateOptions {
	/// Minimum number of tokens per sentence.
	pub min_length: usize,

	/// Maximum number of tokens per sentence.
	pub max_length: usize,

	/// Softmax temperature. `None` samples proportionally to counts.
	pub temperature: Option<f64>,

	/// Allows the same sentence twice in one call.
	pub allow_duplicates: bool,

	/// Prefix of the first sentence.
	pub seed: Option<Seed>,

	/// Seed of the random generator, for reproducible output.
	pub rng_seed: Option<u64>,
}

impl Default for GenerateOptions {
	fn default() -> Self {
		Self {
			min_length: DEFAULT_MIN_LENGTH,
			max_length: DEFAULT_MAX_LENGTH,
			temperature: None,
			allow_duplicates: false,
			seed: None,
			rng_seed: None,
		}
	}
}

impl GenerateOptions {
	pub fn with_seed<S: Into<Seed>>(mut self, seed: S) -> Self {
		self.seed = Some(seed.into());
		self
	}

	pub fn with_lengths(mut self, min_length: usize, max_length: usize) -> Self {
		self.min_length = min_length;
		self.max_length = max_length;
		self
	}

	pub fn with_temperature(mut self, temperature: f64) -> Self {
		self.temperature = Some(temperature);
		self
	}

	pub fn with_rng_seed(mut self, rng_seed: u64) -> Self {
		self.rng_seed = Some(rng_seed);
		self
	}

	/// # Errors
	/// Returns an error if the temperature is not strictly positive or if the
	/// length bounds are inconsistent.
	pub(crate) fn validate(&self) -> Result<()> {
		if let Some(temperature) = self.temperature {
			if !(temperature > 0.0) {
				return Err(MarkovError::InvalidTemperature(temperature));
			}
		}
		if self.max_length == 0 {
			return Err(MarkovError::InvalidOptions("max_length must be > 0".to_owned()));
		}
		if self.min_length > self.max_length {
			return Err(MarkovError::InvalidOptions(format!(
				"min_length ({}) must be <= max_length ({})",
				self.min_length, self.max_length
			)));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let options = GenerateOptions::default();
		assert_eq!(options.min_length, 5);
		assert_eq!(options.max_length, 35);
		assert!(options.validate().is_ok());
		assert_eq!(MarkovOptions::default().max_attempts, 999);
	}

	#[test]
	fn test_rejects_bad_temperature() {
		for temperature in [0.0, -1.0, f64::NAN] {
			let options = GenerateOptions::default().with_temperature(temperature);
			assert!(matches!(options.validate(), Err(MarkovError::InvalidTemperature(_))));
		}
	}

	#[test]
	fn test_rejects_inverted_lengths() {
		let options = GenerateOptions::default().with_lengths(10, 4);
		assert!(matches!(options.validate(), Err(MarkovError::InvalidOptions(_))));
	}

	#[test]
	fn test_mlm_below_n() {
		let options = MarkovOptions { max_length_match: Some(2), ..Default::default() };
		assert!(matches!(options.validate(3), Err(MarkovError::InvalidMaxLengthMatch { mlm: 2, n: 3 })));
		assert!(options.validate(2).is_ok());
		assert!(options.keeps_input());
	}

	#[test]
	fn test_seed_from_json() {
		let options: GenerateOptions = serde_json::from_str(r#"{"seed": "the dog", "min_length": 2}"#).unwrap();
		assert_eq!(options.seed, Some(Seed::Text("the dog".to_owned())));
		assert_eq!(options.min_length, 2);
		assert_eq!(options.max_length, 35);

		let options: GenerateOptions = serde_json::from_str(r#"{"seed": ["the", "dog"]}"#).unwrap();
		assert_eq!(options.seed, Some(Seed::Tokens(vec!["the".to_owned(), "dog".to_owned()])));
	}
}
