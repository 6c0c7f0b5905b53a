use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{MarkovError, Result};

use super::markov::MarkovModel;
use super::options::{GenerateOptions, Seed};
use super::trie::{NodeId, ROOT};

impl MarkovModel {
	/// Generates a single sentence.
	///
	/// # Errors
	/// - Configuration errors for invalid options or an unknown seed
	/// - Exhaustion errors when no sentence satisfies the constraints within
	///   the retry budget
	pub fn generate(&self, options: &GenerateOptions) -> Result<String> {
		let mut rng = Self::make_rng(options);
		let mut sentences = self.generate_with_rng(1, options, &mut rng)?;
		sentences
			.pop()
			.ok_or_else(|| MarkovError::Backtrack("generation returned no sentence".to_owned()))
	}

	/// Generates `count` sentences.
	///
	/// # Errors
	/// Same as [`generate`](Self::generate). A `count` of 1 is rejected,
	/// use [`generate`](Self::generate) for a single result.
	pub fn generate_many(&self, count: usize, options: &GenerateOptions) -> Result<Vec<String>> {
		if count == 1 {
			return Err(MarkovError::InvalidOptions(
				"for one result, use generate() instead of generate_many()".to_owned(),
			));
		}
		let mut rng = Self::make_rng(options);
		self.generate_with_rng(count, options, &mut rng)
	}

	/// Generates `count` sentences drawing randomness from `rng`.
	///
	/// `options.rng_seed` is ignored, the caller owns the generator.
	pub fn generate_with_rng<R: Rng + ?Sized>(
		&self,
		count: usize,
		options: &GenerateOptions,
		rng: &mut R,
	) -> Result<Vec<String>> {
		if count == 0 {
			return Err(MarkovError::InvalidOptions("count must be > 0".to_owned()));
		}
		options.validate()?;

		let seed = match &options.seed {
			Some(Seed::Text(text)) => self.tokenizer.tokenize(text),
			Some(Seed::Tokens(tokens)) => tokens.clone(),
			None => Vec::new(),
		};

		let mut generation = Generation::new(self, options, count, rng);
		generation.place_seed(&seed)?;
		generation.run()
	}

	fn make_rng(options: &GenerateOptions) -> StdRng {
		match options.rng_seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		}
	}
}

/// Selects an index with a probability proportional to `weights`.
///
/// Returns `None` if `weights` is empty or sums to zero.
fn select_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
	let total: f64 = weights.iter().sum();
	if weights.is_empty() || total <= 0.0 {
		return None;
	}

	let mut r = rng.random::<f64>() * total;

	let mut fallback = None;
	for (index, weight) in weights.iter().enumerate() {
		if r < *weight {
			return Some(index);
		}
		r -= weight;
		if *weight > 0.0 {
			fallback = Some(index);
		}
	}

	// Rounding left `r` slightly above the last bucket
	fallback
}

/// Upper bound on the steps of one generation call.
///
/// Each try may walk at most `count` sentences of `max_length` tokens past
/// the seed. Saturates instead of overflowing for huge options.
fn iteration_limit(max_attempts: usize, count: usize, max_length: usize, seed_len: usize) -> usize {
	let walk = count
		.saturating_mul(max_length.saturating_add(1))
		.saturating_add(seed_len)
		.saturating_add(1);
	max_attempts.saturating_add(1).saturating_mul(walk)
}

/// Why a candidate or a sentence was turned down.
#[derive(Debug, Clone, Copy)]
enum Rejection {
	TooShort,
	TooLong,
	InInput,
	DuplicateOutput,
	DeadEnd,
	NoStart,
}

impl Rejection {
	fn as_str(&self) -> &'static str {
		match self {
			Rejection::TooShort => "too-short",
			Rejection::TooLong => "too-long",
			Rejection::InInput => "in-input",
			Rejection::DuplicateOutput => "duplicate-output",
			Rejection::DeadEnd => "dead-end",
			Rejection::NoStart => "no-start",
		}
	}
}

/// State of a single generation call.
///
/// # Invariants
/// - `exhausted.len() == tokens.len() + 1`: `exhausted[p]` holds the nodes
///   that already failed as the token at position `p`, given `tokens[..p]`
/// - `sentence_idxs` and `results` have the same length, `results[i]` is the
///   sentence ending right before `sentence_idxs[i]`
/// - Positions below `min_idx` (the seed) are never popped
struct Generation<'a, R: Rng + ?Sized> {
	model: &'a MarkovModel,
	options: &'a GenerateOptions,
	rng: &'a mut R,
	count: usize,
	tokens: Vec<NodeId>,
	sentence_idxs: Vec<usize>,
	results: Vec<String>,
	exhausted: Vec<HashSet<NodeId>>,
	min_idx: usize,
	tries: usize,
}

impl<'a, R: Rng + ?Sized> Generation<'a, R> {
	fn new(model: &'a MarkovModel, options: &'a GenerateOptions, count: usize, rng: &'a mut R) -> Self {
		Self {
			model,
			options,
			rng,
			count,
			tokens: Vec::new(),
			sentence_idxs: Vec::new(),
			results: Vec::new(),
			exhausted: vec![HashSet::new()],
			min_idx: 0,
			tries: 0,
		}
	}

	/// Resolves every seed token and makes the seed a barrier.
	///
	/// # Errors
	/// Returns an error if a seed token cannot be reached from its context.
	fn place_seed(&mut self, seed: &[String]) -> Result<()> {
		let n = self.model.n;
		for j in 0..seed.len() {
			let start = (j + 1).saturating_sub(n);
			let node = self
				.model
				.trie
				.path_to(&seed[start..=j])
				.filter(|id| !self.model.trie.node(*id).is_hidden())
				.ok_or_else(|| MarkovError::UnknownSeed(seed.join(" ")))?;
			self.push(node);
		}
		self.min_idx = self.tokens.len();
		Ok(())
	}

	/// Runs the walk until `count` sentences are accepted.
	fn run(mut self) -> Result<Vec<String>> {
		let limit = iteration_limit(
			self.model.options.max_attempts,
			self.count,
			self.options.max_length,
			self.min_idx,
		);
		let mut iterations = 0usize;

		while self.results.len() < self.count {
			iterations += 1;
			if iterations > limit {
				return Err(self.exhausted_error());
			}

			if self.sentence_len() == 0 {
				self.select_start()?;
				continue;
			}

			if self.sentence_len() >= self.options.max_length {
				self.fail(Rejection::TooLong)?;
				continue;
			}

			match self.sample()? {
				Some(next) => self.accept(next)?,
				None => self.fail(Rejection::DeadEnd)?,
			}
		}

		log::debug!(
			"generated {} sentence(s) in {} tries",
			self.results.len(),
			self.tries
		);
		Ok(self.results)
	}

	/// Index where the in-progress sentence starts.
	fn sentence_idx(&self) -> usize {
		self.sentence_idxs.last().copied().unwrap_or(0)
	}

	fn sentence_len(&self) -> usize {
		self.tokens.len() - self.sentence_idx()
	}

	fn token(&self, id: NodeId) -> &'a str {
		self.model.trie.token(id)
	}

	fn push(&mut self, node: NodeId) {
		self.tokens.push(node);
		self.exhausted.push(HashSet::new());
	}

	/// Removes the last token and marks it as exhausted at its position.
	fn pop(&mut self) -> Result<()> {
		let node = self
			.tokens
			.pop()
			.ok_or_else(|| MarkovError::Backtrack("pop on an empty walk".to_owned()))?;
		self.exhausted.pop();
		self.mark(node)?;

		if self.sentence_idxs.last() == Some(&(self.tokens.len() + 1)) {
			self.sentence_idxs.pop();
			self.results.pop();
		}
		Ok(())
	}

	/// Marks `node` as failed at the current frontier.
	fn mark(&mut self, node: NodeId) -> Result<()> {
		self.exhausted
			.last_mut()
			.ok_or_else(|| MarkovError::Backtrack("no frontier to mark".to_owned()))?
			.insert(node);
		Ok(())
	}

	/// Picks a sentence start, proportionally to its frequency.
	///
	/// When every start is exhausted, backtracks into the previous sentence.
	fn select_start(&mut self) -> Result<()> {
		let exhausted = &self.exhausted[self.tokens.len()];
		let usable: Vec<NodeId> = self
			.model
			.sentence_starts
			.iter()
			.filter_map(|start| self.model.trie.child(ROOT, start))
			.filter(|id| !exhausted.contains(id) && !self.matches_input(*id))
			.collect();

		if usable.is_empty() {
			if self.tokens.len() > self.min_idx {
				// Reopen the previous sentence
				self.note(Rejection::NoStart, None);
				self.count_try()?;
				self.pop()?;
				return self.backtrack();
			}
			return Err(MarkovError::NoSentenceStart {
				tries: self.tries,
				successes: self.results.len(),
			});
		}

		let start = usable[self.rng.random_range(0..usable.len())];
		self.accept(start)
	}

	/// Visible children of the current context that were not tried yet and
	/// do not extend a verbatim copy of the input.
	fn candidates(&self) -> Vec<NodeId> {
		let start = self.sentence_idx().max(self.tokens.len().saturating_sub(self.model.n - 1));
		let context: Vec<&str> = self.tokens[start..].iter().map(|id| self.token(*id)).collect();
		let Some(node) = self.model.trie.path_to(&context) else {
			return Vec::new();
		};

		let exhausted = &self.exhausted[self.tokens.len()];
		let mut candidates = self.model.trie.visible_children(node);
		candidates.retain(|id| !exhausted.contains(id) && !self.matches_input(*id));
		candidates
	}

	/// Whether appending `candidate` creates a run longer than
	/// `max_length_match` copied from the input.
	fn matches_input(&self, candidate: NodeId) -> bool {
		let Some(mlm) = self.model.options.max_length_match else {
			return false;
		};
		if self.tokens.len() < mlm {
			return false;
		}

		let run: Vec<&str> = self.tokens[self.tokens.len() - mlm..]
			.iter()
			.map(|id| self.token(*id))
			.chain(std::iter::once(self.token(candidate)))
			.collect();
		self.in_input(&run)
	}

	/// Whether `sequence` occurs contiguously in the training input.
	fn in_input(&self, sequence: &[&str]) -> bool {
		self.model.input.as_ref().is_some_and(|input| input.contains(sequence))
	}

	/// Draws the next token among the candidates.
	fn sample(&mut self) -> Result<Option<NodeId>> {
		let candidates = self.candidates();
		if candidates.is_empty() {
			return Ok(None);
		}

		let weights = self.model.distribution(&candidates, self.options.temperature);
		match select_weighted(&weights, &mut *self.rng) {
			Some(index) => Ok(Some(candidates[index])),
			None => Err(MarkovError::Backtrack("empty sampling distribution".to_owned())),
		}
	}

	/// Appends `next`, validating the sentence when `next` ends it.
	fn accept(&mut self, next: NodeId) -> Result<()> {
		if !self.model.is_sentence_end(self.token(next)) {
			self.push(next);
			return Ok(());
		}

		let mut sentence: Vec<String> = self.tokens[self.sentence_idx()..]
			.iter()
			.map(|id| self.token(*id).to_owned())
			.collect();
		sentence.push(self.token(next).to_owned());

		match self.validate_sentence(&sentence) {
			Ok(flat) => {
				self.push(next);
				self.sentence_idxs.push(self.tokens.len());
				self.results.push(flat);
				Ok(())
			}
			Err(rejection) => {
				self.note(rejection, Some(&sentence));
				self.reject(next)
			}
		}
	}

	/// Returns the untokenized sentence, or the reason it is rejected.
	fn validate_sentence(&self, sentence: &[String]) -> std::result::Result<String, Rejection> {
		if sentence.len() < self.options.min_length {
			return Err(Rejection::TooShort);
		}

		if !self.model.options.disable_input_checks {
			let tokens: Vec<&str> = sentence.iter().map(String::as_str).collect();
			if self.in_input(&tokens) {
				return Err(Rejection::InInput);
			}
		}

		let flat = self.model.tokenizer.untokenize(sentence);
		if !self.options.allow_duplicates && self.results.contains(&flat) {
			return Err(Rejection::DuplicateOutput);
		}
		Ok(flat)
	}

	fn count_try(&mut self) -> Result<()> {
		self.tries += 1;
		if self.tries >= self.model.options.max_attempts {
			return Err(self.exhausted_error());
		}
		Ok(())
	}

	fn exhausted_error(&self) -> MarkovError {
		MarkovError::Exhausted {
			tries: self.tries,
			successes: self.results.len(),
		}
	}

	/// A sampled candidate was refused: it is not retried from here.
	fn reject(&mut self, candidate: NodeId) -> Result<()> {
		self.count_try()?;
		self.mark(candidate)?;
		if self.sentence_len() > 0 && self.candidates().is_empty() {
			self.backtrack()?;
		}
		Ok(())
	}

	/// The frontier cannot be extended (dead end, or sentence too long).
	fn fail(&mut self, rejection: Rejection) -> Result<()> {
		self.note(rejection, None);
		self.count_try()?;
		if let Rejection::TooLong = rejection {
			if self.tokens.len() <= self.min_idx {
				return Err(self.exhausted_error());
			}
			self.pop()?;
		}
		self.backtrack()
	}

	/// Pops tokens until the frontier has an untried candidate, or until the
	/// in-progress sentence is empty.
	///
	/// # Errors
	/// Returns an error when the seed barrier is reached with nothing left.
	fn backtrack(&mut self) -> Result<()> {
		loop {
			if self.sentence_len() == 0 && self.tokens.len() >= self.min_idx {
				return Ok(());
			}
			if !self.candidates().is_empty() {
				return Ok(());
			}
			if self.tokens.len() <= self.min_idx {
				return Err(self.exhausted_error());
			}
			self.pop()?;
		}
	}

	fn note(&self, rejection: Rejection, sentence: Option<&[String]>) {
		let level = if self.model.options.trace { log::Level::Info } else { log::Level::Trace };
		if !log::log_enabled!(level) {
			return;
		}

		let text = match sentence {
			Some(sentence) => sentence.join(" "),
			None => self
				.tokens
				.iter()
				.map(|id| self.token(*id))
				.collect::<Vec<_>>()
				.join(" "),
		};
		log::log!(level, "[{}] {}: {}", self.tries, rejection.as_str(), text);
	}
}
