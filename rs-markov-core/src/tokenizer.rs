/// Text segmentation used by the model.
///
/// The model never looks inside tokens: it only needs a way to split a text
/// into sentences, a sentence into tokens, and to join tokens back into text.
/// Both directions must be deterministic for a given input.
pub trait Tokenizer: Send + Sync {
	/// Splits a sentence into tokens.
	fn tokenize(&self, sentence: &str) -> Vec<String>;

	/// Joins tokens back into text. Inverse of `tokenize`.
	fn untokenize(&self, tokens: &[String]) -> String;

	/// Splits a text into sentences.
	fn sentences(&self, text: &str) -> Vec<String>;
}

/// Punctuation emitted as standalone tokens.
const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '"', '…'];

/// Characters closing a sentence.
const TERMINATORS: &[char] = &['.', '!', '?', '…'];

/// Rule-based tokenizer for whitespace separated languages.
///
/// - Words keep inner apostrophes and hyphens (`don't`, `well-known`)
/// - Punctuation marks become their own tokens
/// - `untokenize` glues closing punctuation to the previous token
#[derive(Debug, Clone, Default)]
pub struct DefaultTokenizer;

impl DefaultTokenizer {
	pub fn new() -> Self {
		Self
	}

	fn is_closing(token: &str) -> bool {
		matches!(token, "." | "," | "!" | "?" | ";" | ":" | ")" | "]" | "…")
	}

	fn is_opening(token: &str) -> bool {
		matches!(token, "(" | "[")
	}
}

impl Tokenizer for DefaultTokenizer {
	fn tokenize(&self, sentence: &str) -> Vec<String> {
		let mut tokens = Vec::new();
		let mut current = String::new();

		for c in sentence.chars() {
			if c.is_whitespace() {
				if !current.is_empty() {
					tokens.push(std::mem::take(&mut current));
				}
			} else if PUNCTUATION.contains(&c) {
				if !current.is_empty() {
					tokens.push(std::mem::take(&mut current));
				}
				tokens.push(c.to_string());
			} else {
				current.push(c);
			}
		}

		if !current.is_empty() {
			tokens.push(current);
		}

		tokens
	}

	fn untokenize(&self, tokens: &[String]) -> String {
		let mut text = String::new();
		let mut glue_next = true;
		let mut in_quote = false;

		for token in tokens {
			let token = token.as_str();
			let glue = if token == "\"" {
				// An opening quote takes a space, a closing one does not
				let closing = in_quote;
				in_quote = !in_quote;
				closing
			} else {
				Self::is_closing(token)
			};

			if !glue && !glue_next {
				text.push(' ');
			}
			text.push_str(token);

			glue_next = Self::is_opening(token) || (token == "\"" && in_quote);
		}

		text
	}

	fn sentences(&self, text: &str) -> Vec<String> {
		let mut sentences = Vec::new();
		let mut current = String::new();
		let mut chars = text.chars().peekable();

		while let Some(c) = chars.next() {
			current.push(c);
			if !TERMINATORS.contains(&c) {
				continue;
			}

			// Absorb runs like "?!" or "..." and a closing quote
			while let Some(&next) = chars.peek() {
				if TERMINATORS.contains(&next) || next == '"' || next == ')' {
					current.push(next);
					chars.next();
				} else {
					break;
				}
			}

			let at_boundary = chars.peek().map_or(true, |next| next.is_whitespace());
			if at_boundary {
				let sentence = current.trim();
				if !sentence.is_empty() {
					sentences.push(sentence.to_owned());
				}
				current.clear();
			}
		}

		let rest = current.trim();
		if !rest.is_empty() {
			sentences.push(rest.to_owned());
		}

		sentences
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn strings(tokens: &[&str]) -> Vec<String> {
		tokens.iter().map(|t| t.to_string()).collect()
	}

	#[test]
	fn test_tokenize_splits_punctuation() {
		let tokenizer = DefaultTokenizer::new();
		assert_eq!(
			tokenizer.tokenize("The dog, I think, don't bark."),
			strings(&["The", "dog", ",", "I", "think", ",", "don't", "bark", "."])
		);
		assert!(tokenizer.tokenize("   ").is_empty());
	}

	#[test]
	fn test_untokenize_inverts_tokenize() {
		let tokenizer = DefaultTokenizer::new();
		for sentence in ["A B C.", "Is it here, or there?", "He said \"hello\" (twice)."] {
			let tokens = tokenizer.tokenize(sentence);
			assert_eq!(tokenizer.untokenize(&tokens), sentence);
		}
	}

	#[test]
	fn test_sentences() {
		let tokenizer = DefaultTokenizer::new();
		let sentences = tokenizer.sentences("The dog ate. Did it?! Yes... it did 3.5 times");
		assert_eq!(
			sentences,
			strings(&["The dog ate.", "Did it?!", "Yes...", "it did 3.5 times"])
		);
	}
}
