use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MarkovError, Result};
use crate::io::{cache_path, read_corpus};

use super::input::InputText;
use super::markov::MarkovModel;
use super::options::MarkovOptions;
use super::trie::{NodeId, ROOT, Trie};

/// Stored form of a trie node.
///
/// Parent links are implied by nesting, children are sorted by token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeRecord {
	pub token: String,
	pub count: usize,
	#[serde(default)]
	pub hidden: bool,
	#[serde(default)]
	pub children: Vec<NodeRecord>,
}

/// Stored form of a whole model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
	pub n: usize,
	pub root: NodeRecord,
	pub sentence_starts: Vec<String>,
	pub sentence_ends: Vec<String>,
	pub input: Option<Vec<String>>,
	pub mlm: Option<usize>,
	pub max_attempts: usize,
	pub trace: bool,
	pub disable_input_checks: bool,
}

impl NodeRecord {
	fn from_trie(trie: &Trie, id: NodeId) -> Self {
		let node = trie.node(id);
		Self {
			token: node.token().to_owned(),
			count: node.count(),
			hidden: node.is_hidden(),
			children: trie
				.children(id)
				.into_iter()
				.map(|child| NodeRecord::from_trie(trie, child))
				.collect(),
		}
	}

	/// Re-inserts the children of this record below `parent`, top-down.
	fn rebuild(&self, trie: &mut Trie, parent: NodeId) {
		for child in &self.children {
			let id = trie.add_child(parent, &child.token, child.hidden);
			trie.set_count(id, child.count);
			child.rebuild(trie, id);
		}
	}
}

impl MarkovModel {
	/// Captures the model in its stored form.
	pub fn to_record(&self) -> ModelRecord {
		let mut sentence_ends: Vec<String> = self.sentence_ends.iter().cloned().collect();
		sentence_ends.sort();

		ModelRecord {
			n: self.n,
			root: NodeRecord::from_trie(&self.trie, ROOT),
			sentence_starts: self.sentence_starts.clone(),
			sentence_ends,
			input: self.input.as_ref().map(|input| input.tokens().to_vec()),
			mlm: self.options.max_length_match,
			max_attempts: self.options.max_attempts,
			trace: self.options.trace,
			disable_input_checks: self.options.disable_input_checks,
		}
	}

	/// Rebuilds a model (with the default tokenizer) from its stored form.
	///
	/// # Errors
	/// Returns an error if the stored options are invalid.
	pub fn from_record(record: ModelRecord) -> Result<Self> {
		let options = MarkovOptions {
			max_length_match: record.mlm,
			max_attempts: record.max_attempts,
			trace: record.trace,
			disable_input_checks: record.disable_input_checks,
		};
		let mut model = Self::with_options(record.n, options)?;

		record.root.rebuild(&mut model.trie, ROOT);
		model.sentence_starts = record.sentence_starts;
		model.sentence_ends = record.sentence_ends.into_iter().collect::<HashSet<_>>();
		model.input = record.input.map(InputText::from);
		if model.input.is_none() && model.options.keeps_input() {
			return Err(MarkovError::InvalidOptions(
				"stored model has no input but requires input checks".to_owned(),
			));
		}
		Ok(model)
	}

	/// Serializes the model to JSON.
	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string(&self.to_record())?)
	}

	/// Rebuilds a model from [`to_json`](Self::to_json) output.
	pub fn from_json(json: &str) -> Result<Self> {
		let record: ModelRecord = serde_json::from_str(json)?;
		Self::from_record(record)
	}

	/// Serializes the model with `postcard`.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(&self.to_record())?)
	}

	/// Rebuilds a model from [`to_bytes`](Self::to_bytes) output.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let record: ModelRecord = postcard::from_bytes(bytes)?;
		Self::from_record(record)
	}

	/// Writes the binary form of the model to `path`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	/// Reads a model written by [`save`](Self::save).
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		Self::from_bytes(&bytes)
	}

	/// Loads a model trained on a text file.
	///
	/// - Checks if a binary cache (`<stem>.bin`) exists for fast loading
	/// - Otherwise reads the corpus sentences, trains on them and writes the cache
	///
	/// # Errors
	/// Returns an error if file I/O fails, or if the cached model has a
	/// different order than `n`.
	pub fn from_file<P: AsRef<Path>>(filepath: P, n: usize, options: MarkovOptions) -> Result<Self> {
		let binary_data_path = cache_path(&filepath)?;
		if binary_data_path.exists() {
			let model = Self::load(&binary_data_path)?;
			if model.n != n {
				return Err(MarkovError::InvalidOptions(format!(
					"cached model {} has n = {}, expected {}",
					binary_data_path.display(),
					model.n,
					n
				)));
			}
			log::debug!("loaded cached model from {}", binary_data_path.display());
			return Ok(model);
		}

		let mut model = Self::with_options(n, options)?;
		let sentences = read_corpus(&filepath, model.tokenizer())?;
		model.add_sentences(&sentences, 1);
		model.save(&binary_data_path)?;
		log::debug!(
			"trained model on {} and cached it to {}",
			filepath.as_ref().display(),
			binary_data_path.display()
		);
		Ok(model)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn trained() -> MarkovModel {
		let mut model = MarkovModel::new(3).unwrap();
		model.add_text("The dog ate the boy. The boy saw the dog! A cat ran.", 1);
		model
	}

	#[test]
	fn test_json_round_trip() {
		let model = trained();
		let json = model.to_json().unwrap();
		let copy = MarkovModel::from_json(&json).unwrap();

		assert_eq!(copy.trie().len(), model.trie().len());
		assert_eq!(copy.size(), model.size());
		assert_eq!(copy.to_record(), model.to_record());
		assert_eq!(copy.sentence_ends(), model.sentence_ends());
		assert_eq!(copy.input(), model.input());
	}

	#[test]
	fn test_json_field_names() {
		let json = trained().to_json().unwrap();
		let value: serde_json::Value = serde_json::from_str(&json).unwrap();
		for field in ["n", "root", "sentenceStarts", "sentenceEnds", "input", "mlm", "maxAttempts", "trace", "disableInputChecks"] {
			assert!(value.get(field).is_some(), "missing {field}");
		}
		assert_eq!(value["root"]["token"], "");
		assert_eq!(value["sentenceEnds"], serde_json::json!(["!", "."]));
	}

	#[test]
	fn test_hidden_flag_survives() {
		let mut model = MarkovModel::new(3).unwrap();
		model.add_sentences(&["a b c"], 1);
		let copy = MarkovModel::from_json(&model.to_json().unwrap()).unwrap();
		let ca = copy.trie().path_to(&["c", "a"]).unwrap();
		assert!(copy.trie().node(ca).is_hidden());
		assert_eq!(copy.trie().node(ROOT).parent(), None);
		assert_eq!(copy.trie().node(ca).parent(), copy.trie().path_to(&["c"]));
	}

	#[test]
	fn test_bytes_round_trip() {
		let options = MarkovOptions { max_length_match: Some(4), trace: true, ..Default::default() };
		let mut model = MarkovModel::with_options(3, options).unwrap();
		model.add_text("The dog ate the boy. The boy saw the dog!", 2);

		let copy = MarkovModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
		assert_eq!(copy.to_record(), model.to_record());
		assert_eq!(copy.options(), model.options());
	}

	#[test]
	fn test_from_file_writes_cache() {
		let dir = tempfile::tempdir().unwrap();
		let corpus = dir.path().join("corpus.txt");
		std::fs::write(&corpus, "The dog ate the boy.\nThe boy saw the dog!\n").unwrap();

		let model = MarkovModel::from_file(&corpus, 3, MarkovOptions::default()).unwrap();
		assert!(dir.path().join("corpus.bin").exists());

		let cached = MarkovModel::from_file(&corpus, 3, MarkovOptions::default()).unwrap();
		assert_eq!(cached.to_record(), model.to_record());

		assert!(matches!(
			MarkovModel::from_file(&corpus, 2, MarkovOptions::default()),
			Err(MarkovError::InvalidOptions(_))
		));
	}

	#[test]
	fn test_malformed_json() {
		assert!(matches!(MarkovModel::from_json("{\"n\": 3}"), Err(MarkovError::Json(_))));
		let json = trained().to_json().unwrap().replace("\"n\":3", "\"n\":1");
		assert!(matches!(MarkovModel::from_json(&json), Err(MarkovError::InvalidOrder(1))));
	}
}
