use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::errors::{MarkovError, Result};
use crate::tokenizer::{DefaultTokenizer, Tokenizer};

use super::input::InputText;
use super::options::MarkovOptions;
use super::trie::{ROOT, Trie};

/// Represents an n-gram language model over tokens.
///
/// The `MarkovModel` stores every observed window of `n` tokens in a
/// [`Trie`] and generates new sentences by walking it.
///
/// # Responsibilities
/// - Build the trie from raw texts or pre-split sentences
/// - Remember which tokens start and end sentences
/// - Keep the flattened input for originality checks
///
/// # Invariants
/// - `n` is always >= 2
/// - Every root-to-node path of the trie has a length <= `n`
/// - `input` is present whenever input checks or `max_length_match` need it
#[derive(Clone)]
pub struct MarkovModel {
	/// The order of the model (number of tokens in a window)
	pub(crate) n: usize,

	/// Observed windows
	pub(crate) trie: Trie,

	/// First token of every sentence, duplicates kept to preserve frequencies
	pub(crate) sentence_starts: Vec<String>,

	/// Last token of every sentence
	pub(crate) sentence_ends: HashSet<String>,

	/// Every token added so far, in order
	pub(crate) input: Option<InputText>,

	pub(crate) options: MarkovOptions,

	pub(crate) tokenizer: Arc<dyn Tokenizer>,
}

impl MarkovModel {
	/// Creates an empty model of order `n` with default options.
	///
	/// # Errors
	/// Returns an error if `n < 2`.
	pub fn new(n: usize) -> Result<Self> {
		Self::with_options(n, MarkovOptions::default())
	}

	/// Creates an empty model of order `n`.
	///
	/// # Errors
	/// Returns an error if `n < 2` or if `max_length_match < n`.
	pub fn with_options(n: usize, options: MarkovOptions) -> Result<Self> {
		if n < 2 {
			return Err(MarkovError::InvalidOrder(n));
		}
		options.validate(n)?;

		let input = if options.keeps_input() { Some(InputText::new()) } else { None };
		Ok(Self {
			n,
			trie: Trie::new(),
			sentence_starts: Vec::new(),
			sentence_ends: HashSet::new(),
			input,
			options,
			tokenizer: Arc::new(DefaultTokenizer::new()),
		})
	}

	/// Replaces the tokenizer used to split and join texts.
	pub fn with_tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
		self.tokenizer = Arc::new(tokenizer);
		self
	}

	pub fn n(&self) -> usize {
		self.n
	}

	pub fn options(&self) -> &MarkovOptions {
		&self.options
	}

	pub fn trie(&self) -> &Trie {
		&self.trie
	}

	pub fn tokenizer(&self) -> &dyn Tokenizer {
		self.tokenizer.as_ref()
	}

	pub fn sentence_starts(&self) -> &[String] {
		&self.sentence_starts
	}

	pub fn sentence_ends(&self) -> &HashSet<String> {
		&self.sentence_ends
	}

	/// Flattened training tokens, `None` when originality checks are off.
	pub fn input(&self) -> Option<&[String]> {
		self.input.as_ref().map(InputText::tokens)
	}

	pub fn is_sentence_end(&self, token: &str) -> bool {
		self.sentence_ends.contains(token)
	}

	/// Number of live training tokens (padding artifacts excluded).
	pub fn size(&self) -> usize {
		self.trie.child_count(ROOT)
	}

	/// Splits `text` into sentences and adds them to the model.
	///
	/// See [`add_sentences`](Self::add_sentences).
	pub fn add_text(&mut self, text: &str, multiplier: usize) -> &mut Self {
		let sentences = self.tokenizer.sentences(text);
		self.add_sentences(&sentences, multiplier)
	}

	/// Adds pre-split sentences to the model.
	///
	/// # Behavior
	/// - Tokenizes every sentence, sentences without tokens are ignored
	/// - Records the first token as a sentence start and the last as an end
	/// - Inserts every window of `n` tokens of the batch into the trie
	/// - Repeats the whole pass `multiplier` times
	pub fn add_sentences<S: AsRef<str>>(&mut self, sentences: &[S], multiplier: usize) -> &mut Self {
		let tokenized: Vec<Vec<String>> = sentences
			.iter()
			.map(|sentence| self.tokenizer.tokenize(sentence.as_ref()))
			.filter(|tokens| !tokens.is_empty())
			.collect();

		for _ in 0..multiplier {
			let mut tokens = Vec::new();
			for words in &tokenized {
				// Non empty, checked above
				self.sentence_starts.push(words[0].clone());
				self.sentence_ends.insert(words[words.len() - 1].clone());
				tokens.extend(words.iter().cloned());
			}

			self.treeify(&tokens);

			if let Some(input) = self.input.as_mut() {
				input.extend(tokens);
			}
		}

		log::debug!(
			"added {} sentences (x{}), model size is now {} tokens ({} nodes)",
			tokenized.len(),
			multiplier,
			self.size(),
			self.trie.len()
		);
		self
	}

	/// Inserts one window of `n` tokens per position of `tokens`.
	///
	/// Windows running past the end are padded with tokens taken from the
	/// start of the same batch; nodes created by padding are hidden.
	fn treeify(&mut self, tokens: &[String]) {
		for i in 0..tokens.len() {
			let mut node = ROOT;
			let mut wrap = 0;
			for j in 0..self.n {
				let (token, hidden) = match tokens.get(i + j) {
					Some(token) => (token, false),
					None => {
						let token = &tokens[wrap % tokens.len()];
						wrap += 1;
						(token, true)
					}
				};
				node = self.trie.add_child(node, token, hidden);
			}
		}
	}
}

impl fmt::Debug for MarkovModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MarkovModel")
			.field("n", &self.n)
			.field("nodes", &self.trie.len())
			.field("size", &self.size())
			.field("sentence_starts", &self.sentence_starts.len())
			.field("sentence_ends", &self.sentence_ends.len())
			.field("options", &self.options)
			.finish()
	}
}

impl fmt::Display for MarkovModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.trie)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rejects_small_order() {
		assert!(matches!(MarkovModel::new(1), Err(MarkovError::InvalidOrder(1))));
		assert!(MarkovModel::new(2).is_ok());
	}

	#[test]
	fn test_starts_and_ends() {
		let mut model = MarkovModel::new(3).unwrap();
		model.add_text("The dog ate. The cat slept! A bird sang.", 1);

		assert_eq!(model.sentence_starts(), &["The", "The", "A"]);
		assert_eq!(model.sentence_ends().len(), 2);
		assert!(model.is_sentence_end("."));
		assert!(model.is_sentence_end("!"));
		assert_eq!(model.size(), 12);
	}

	#[test]
	fn test_window_depth_is_bounded() {
		let mut model = MarkovModel::new(3).unwrap();
		model.add_text("the dog ate the boy the", 1);

		for id in 0..model.trie().len() {
			assert!(model.trie().depth(id) <= 3);
		}
	}

	#[test]
	fn test_wrap_around_nodes_are_hidden() {
		let mut model = MarkovModel::new(3).unwrap();
		model.add_sentences(&["a b c"], 1);

		// Last window is [c, a*, b*]
		let trie = model.trie();
		let c = trie.path_to(&["c"]).unwrap();
		let ca = trie.path_to(&["c", "a"]).unwrap();
		let cab = trie.path_to(&["c", "a", "b"]).unwrap();
		assert!(!trie.node(c).is_hidden());
		assert!(trie.node(ca).is_hidden());
		assert!(trie.node(cab).is_hidden());

		// [b, c, a*]
		let bca = trie.path_to(&["b", "c", "a"]).unwrap();
		assert!(trie.node(bca).is_hidden());
		assert!(!trie.node(trie.path_to(&["b", "c"]).unwrap()).is_hidden());
		assert_eq!(model.size(), 3);
	}

	#[test]
	fn test_multiplier_repeats_pass() {
		let mut once = MarkovModel::new(2).unwrap();
		once.add_text("a b c.", 1);
		let mut thrice = MarkovModel::new(2).unwrap();
		thrice.add_text("a b c.", 3);

		assert_eq!(thrice.size(), once.size() * 3);
		assert_eq!(thrice.sentence_starts().len(), 3);
		assert_eq!(thrice.input().unwrap().len(), 12);

		let mut none = MarkovModel::new(2).unwrap();
		none.add_text("a b c.", 0);
		assert_eq!(none.size(), 0);
	}

	#[test]
	fn test_input_not_kept_when_checks_disabled() {
		let options = MarkovOptions { disable_input_checks: true, ..Default::default() };
		let mut model = MarkovModel::with_options(2, options).unwrap();
		model.add_text("a b c.", 1);
		assert!(model.input().is_none());

		let options = MarkovOptions { disable_input_checks: true, max_length_match: Some(3), ..Default::default() };
		let mut model = MarkovModel::with_options(2, options).unwrap();
		model.add_text("a b c.", 1);
		assert_eq!(model.input().unwrap().len(), 4);
	}

	#[test]
	fn test_custom_tokenizer() {
		#[derive(Debug)]
		struct Chars;
		impl Tokenizer for Chars {
			fn tokenize(&self, sentence: &str) -> Vec<String> {
				sentence.chars().map(|c| c.to_string()).collect()
			}
			fn untokenize(&self, tokens: &[String]) -> String {
				tokens.concat()
			}
			fn sentences(&self, text: &str) -> Vec<String> {
				text.split('\n').map(str::to_owned).collect()
			}
		}

		let mut model = MarkovModel::new(2).unwrap().with_tokenizer(Chars);
		model.add_text("abc\nabd", 1);
		assert_eq!(model.size(), 6);
		assert_eq!(model.sentence_starts(), &["a", "a"]);
	}
}
