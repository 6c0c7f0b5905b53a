use std::collections::HashMap;

use crate::errors::{MarkovError, Result};

use super::markov::MarkovModel;
use super::trie::{NodeId, ROOT};

/// Lowest temperature used by the softmax, avoids overflowing `exp`.
pub const MIN_TEMPERATURE: f64 = 0.001;

impl MarkovModel {
	/// Resolves the node of the last `n-1` tokens of `path`.
	pub(crate) fn context_node<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
		let start = path.len().saturating_sub(self.n - 1);
		self.trie.path_to(&path[start..])
	}

	/// Resolves `path` from the root through visible nodes only.
	fn visible_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
		let node = self.trie.path_to(path)?;
		let mut current = node;
		while current != ROOT {
			let vertex = self.trie.node(current);
			if vertex.is_hidden() {
				return None;
			}
			current = vertex.parent()?;
		}
		Some(node)
	}

	/// Normalized sampling weights of `candidates`.
	///
	/// - `None` (or 0): count / total
	/// - `Some(t)`: softmax of `count / t`, `t` clamped to [`MIN_TEMPERATURE`]
	pub(crate) fn distribution(&self, candidates: &[NodeId], temperature: Option<f64>) -> Vec<f64> {
		let counts: Vec<f64> = candidates
			.iter()
			.map(|id| self.trie.node(*id).count() as f64)
			.collect();

		let weights: Vec<f64> = match temperature {
			Some(t) if t > 0.0 => {
				let t = t.max(MIN_TEMPERATURE);
				let max = counts.iter().cloned().fold(f64::MIN, f64::max);
				counts.iter().map(|count| ((count - max) / t).exp()).collect()
			}
			_ => counts,
		};

		let total: f64 = weights.iter().sum();
		if total <= 0.0 {
			return vec![0.0; weights.len()];
		}
		weights.into_iter().map(|w| w / total).collect()
	}

	/// Probability of every possible next token after `path`.
	///
	/// Only the last `n-1` tokens of `path` are used. An unknown path
	/// yields an empty map.
	///
	/// # Errors
	/// Returns an error for a negative (or NaN) temperature.
	pub fn probabilities<S: AsRef<str>>(&self, path: &[S], temperature: Option<f64>) -> Result<HashMap<String, f64>> {
		if let Some(t) = temperature {
			if !(t >= 0.0) {
				return Err(MarkovError::InvalidTemperature(t));
			}
		}

		let Some(node) = self.context_node(path) else {
			return Ok(HashMap::new());
		};

		let children = self.trie.visible_children(node);
		let probabilities = self.distribution(&children, temperature);
		Ok(children
			.into_iter()
			.zip(probabilities)
			.map(|(child, p)| (self.trie.token(child).to_owned(), p))
			.collect())
	}

	/// Raw frequency of a single token, 0 if unknown.
	pub fn probability(&self, token: &str) -> f64 {
		let total = self.trie.child_count(ROOT);
		match self.trie.child(ROOT, token) {
			Some(id) if total > 0 && !self.trie.node(id).is_hidden() => {
				self.trie.node(id).count() as f64 / total as f64
			}
			_ => 0.0,
		}
	}

	/// Probability of the last token of `path` given the tokens before it.
	///
	/// # Errors
	/// Returns an error if `path` is empty or longer than `n`.
	pub fn sequence_probability<S: AsRef<str>>(&self, path: &[S]) -> Result<f64> {
		if path.is_empty() || path.len() > self.n {
			return Err(MarkovError::InvalidQuery(format!(
				"path length must be between 1 and {}, got {}",
				self.n,
				path.len()
			)));
		}

		let Some(node) = self.visible_path(path) else {
			return Ok(0.0);
		};
		let parent = self.trie.node(node).parent().unwrap_or(ROOT);
		let total = self.trie.child_count(parent);
		if total == 0 {
			return Ok(0.0);
		}
		Ok(self.trie.node(node).count() as f64 / total as f64)
	}

	/// Possible tokens after `pre`, or between `pre` and `post`.
	///
	/// - Without `post`: next tokens of `pre`, most probable first
	/// - With `post`: every `w` such that `pre + [w] + post` was observed
	///
	/// # Errors
	/// Returns an error if `pre.len() + post.len() > n`.
	pub fn completions<S: AsRef<str>>(&self, pre: &[S], post: Option<&[S]>) -> Result<Vec<String>> {
		let Some(post) = post else {
			let probabilities = self.probabilities(pre, None)?;
			let mut tokens: Vec<(String, f64)> = probabilities.into_iter().collect();
			tokens.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
			return Ok(tokens.into_iter().map(|(token, _)| token).collect());
		};

		if pre.len() + post.len() > self.n {
			return Err(MarkovError::InvalidQuery(format!(
				"pre.len() + post.len() must be <= {}, got {}",
				self.n,
				pre.len() + post.len()
			)));
		}

		let Some(node) = self.context_node(pre) else {
			log::debug!("unable to find a node for pre: {:?}", pre.iter().map(|t| t.as_ref()).collect::<Vec<_>>());
			return Ok(Vec::new());
		};

		let mut result = Vec::new();
		for child in self.trie.visible_children(node) {
			let token = self.trie.token(child);
			let sequence: Vec<&str> = pre
				.iter()
				.map(|t| t.as_ref())
				.chain(std::iter::once(token))
				.chain(post.iter().map(|t| t.as_ref()))
				.collect();
			if self.is_observed(&sequence) {
				result.push(token.to_owned());
			}
		}
		Ok(result)
	}

	/// Whether every window of `n` tokens of `sequence` is a visible path.
	fn is_observed(&self, sequence: &[&str]) -> bool {
		if sequence.len() <= self.n {
			return self.visible_path(sequence).is_some();
		}
		sequence.windows(self.n).all(|window| self.visible_path(window).is_some())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn model(n: usize, text: &str) -> MarkovModel {
		let mut model = MarkovModel::new(n).unwrap();
		model.add_text(text, 1);
		model
	}

	fn assert_close(a: f64, b: f64) {
		assert!((a - b).abs() < 1e-9, "{a} != {b}");
	}

	#[test]
	fn test_probability() {
		let m = model(3, "the dog ate the boy the");
		assert_close(m.probability("the"), 0.5);
		assert_close(m.probability("dog"), 1.0 / 6.0);
		assert_eq!(m.probability("cat"), 0.0);

		let m = model(3, "the dog ate the boy that the dog found.");
		assert_close(m.probability("the"), 0.3);
		assert_close(m.probability("dog"), 0.2);
		assert_eq!(m.probability("cat"), 0.0);
	}

	#[test]
	fn test_sequence_probability() {
		let m = model(3, "the dog ate the boy the");
		assert_close(m.sequence_probability(&["the"]).unwrap(), 0.5);
		// "the" is followed by "dog" and "boy" (plus hidden padding)
		assert_close(m.sequence_probability(&["the", "dog"]).unwrap(), 0.5);
		assert_close(m.sequence_probability(&["the", "dog", "ate"]).unwrap(), 1.0);
		assert_eq!(m.sequence_probability(&["the", "cat"]).unwrap(), 0.0);
		assert!(m.sequence_probability(&["the", "dog", "ate", "the"]).is_err());
		assert!(m.sequence_probability::<&str>(&[]).is_err());
	}

	#[test]
	fn test_probabilities_sum_to_one() {
		let m = model(3, "the dog ate the boy. the dog found the cat. the cat ate.");
		for temperature in [None, Some(0.0), Some(0.5), Some(1.0), Some(10.0), Some(1e-9)] {
			let probabilities = m.probabilities(&["the"], temperature).unwrap();
			assert_eq!(probabilities.len(), 3);
			assert_close(probabilities.values().sum(), 1.0);
		}
	}

	#[test]
	fn test_temperature_shapes_distribution() {
		let m = model(2, "a b. a b. a b. a c.");
		let raw = m.probabilities(&["a"], None).unwrap();
		assert_close(raw["b"], 0.75);

		let cold = m.probabilities(&["a"], Some(0.1)).unwrap();
		let hot = m.probabilities(&["a"], Some(100.0)).unwrap();
		assert!(cold["b"] > 0.99);
		assert!(hot["b"] < 0.51);
		assert!(hot["b"] > hot["c"]);

		assert!(matches!(m.probabilities(&["a"], Some(-1.0)), Err(MarkovError::InvalidTemperature(_))));
	}

	#[test]
	fn test_probabilities_use_last_tokens() {
		let m = model(3, "the dog ate the boy the");
		let short = m.probabilities(&["ate", "the"], None).unwrap();
		let long = m.probabilities(&["unknown", "words", "ate", "the"], None).unwrap();
		assert_eq!(short, long);
		assert_close(short["boy"], 1.0);
		assert!(m.probabilities(&["cat"], None).unwrap().is_empty());
	}

	#[test]
	fn test_completions() {
		let m = model(3, "the dog ate the boy that the dog found.");
		assert_eq!(m.completions(&["the"], None).unwrap(), vec!["dog", "boy"]);
		assert_eq!(m.completions(&["the", "dog"], None).unwrap(), vec!["ate", "found"]);
		assert!(m.completions(&["cat"], None).unwrap().is_empty());
	}

	#[test]
	fn test_completions_fill_middle() {
		let m = model(4, "the dog ate the boy that the dog found.");
		let pre: &[&str] = &["the"];
		let post: &[&str] = &["ate"];
		assert_eq!(m.completions(pre, Some(post)).unwrap(), vec!["dog"]);

		let post: &[&str] = &["that"];
		assert_eq!(m.completions(pre, Some(post)).unwrap(), vec!["boy"]);

		let pre: &[&str] = &["the", "dog"];
		let post: &[&str] = &["the", "boy", "that"];
		assert!(matches!(m.completions(pre, Some(post)), Err(MarkovError::InvalidQuery(_))));
	}

	#[test]
	fn test_size_excludes_padding() {
		let m = model(3, "the dog ate the boy the");
		assert_eq!(m.size(), 6);
	}
}
