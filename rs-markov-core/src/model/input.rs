use std::collections::HashMap;

/// Flattened training tokens with an index of where each token occurs.
///
/// Lookups of a run only visit the positions of its first token instead of
/// scanning the whole input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputText {
	tokens: Vec<String>,
	positions: HashMap<String, Vec<usize>>,
}

impl InputText {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Appends tokens at the end of the input.
	pub fn extend<I: IntoIterator<Item = String>>(&mut self, tokens: I) {
		for token in tokens {
			self.positions.entry(token.clone()).or_default().push(self.tokens.len());
			self.tokens.push(token);
		}
	}

	/// Whether `run` occurs contiguously in the input.
	pub fn contains<S: AsRef<str>>(&self, run: &[S]) -> bool {
		let Some(first) = run.first() else {
			return false;
		};
		let Some(positions) = self.positions.get(first.as_ref()) else {
			return false;
		};

		positions.iter().any(|&start| {
			self.tokens
				.get(start..start + run.len())
				.is_some_and(|window| window.iter().zip(run).all(|(a, b)| a == b.as_ref()))
		})
	}
}

impl From<Vec<String>> for InputText {
	fn from(tokens: Vec<String>) -> Self {
		let mut input = Self::new();
		input.extend(tokens);
		input
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input(text: &str) -> InputText {
		InputText::from(text.split(' ').map(str::to_owned).collect::<Vec<_>>())
	}

	#[test]
	fn test_contains_runs() {
		let input = input("the dog ate the boy .");
		assert!(input.contains(&["the", "boy", "."]));
		assert!(input.contains(&["dog"]));
		assert!(input.contains(&["the", "dog", "ate", "the", "boy", "."]));
		assert!(!input.contains(&["the", "cat"]));
		assert!(!input.contains(&["boy", ".", "the"]));
		assert!(!input.contains::<&str>(&[]));
	}

	#[test]
	fn test_extend_keeps_positions() {
		let mut input = input("a b");
		input.extend(vec!["a".to_owned(), "c".to_owned()]);
		assert_eq!(input.len(), 4);
		assert!(input.contains(&["b", "a", "c"]));
		assert!(!input.contains(&["a", "b", "a", "c", "d"]));
		assert_eq!(input, InputText::from(input.tokens().to_vec()));
	}
}
