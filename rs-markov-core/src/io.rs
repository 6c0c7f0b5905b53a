//! Corpus files on disk.
//!
//! A corpus is a UTF-8 text file `<name>.txt`. Its trained model is cached
//! next to it as `<name>.bin`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::tokenizer::Tokenizer;

/// Extension of corpus files
pub const CORPUS_EXTENSION: &str = "txt";

/// Extension of cached binary models
pub const CACHE_EXTENSION: &str = "bin";

/// Reads a corpus and splits it into sentences.
///
/// - Blank lines are skipped, every line is trimmed
/// - A sentence never spans two lines
pub fn read_corpus<P: AsRef<Path>>(path: P, tokenizer: &dyn Tokenizer) -> io::Result<Vec<String>> {
	let contents = fs::read_to_string(path)?;
	Ok(contents
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.flat_map(|line| tokenizer.sentences(line))
		.collect())
}

/// Path of the binary cache of a corpus.
///
/// Example:
/// `data/poems.txt` → `data/poems.bin`
pub fn cache_path<P: AsRef<Path>>(corpus: P) -> io::Result<PathBuf> {
	let corpus = corpus.as_ref();
	let name = corpus_name(corpus)
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "corpus path has no file name"))?;

	let parent = corpus.parent().unwrap_or_else(|| Path::new("."));
	Ok(parent.join(format!("{name}.{CACHE_EXTENSION}")))
}

/// Path of the corpus called `name` inside `dir`.
pub fn corpus_path<P: AsRef<Path>>(dir: P, name: &str) -> PathBuf {
	dir.as_ref().join(format!("{name}.{CORPUS_EXTENSION}"))
}

/// Corpus name, the file name without its extension.
///
/// `"./data/poems.txt"` → `"poems"`
pub fn corpus_name<P: AsRef<Path>>(path: P) -> Option<String> {
	path.as_ref().file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

/// Resolves the data folder, `"."` and `"./"` mean the working directory.
pub fn data_dir(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Names of the corpora found in `dir`, sorted.
pub fn list_corpora<P: AsRef<Path>>(dir: P) -> io::Result<Vec<String>> {
	let mut names = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		let is_corpus = path.extension().is_some_and(|extension| extension == CORPUS_EXTENSION);
		if path.is_file() && is_corpus {
			names.extend(corpus_name(&path));
		}
	}

	names.sort();
	Ok(names)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::DefaultTokenizer;

	#[test]
	fn test_paths() {
		assert_eq!(cache_path("data/poems.txt").unwrap(), PathBuf::from("data/poems.bin"));
		assert_eq!(corpus_path("data", "poems"), PathBuf::from("data/poems.txt"));
		assert_eq!(corpus_name("./data/poems.txt").as_deref(), Some("poems"));
		assert_eq!(data_dir("corpora"), PathBuf::from("corpora"));
		assert!(cache_path("").is_err());
	}

	#[test]
	fn test_read_corpus_splits_sentences() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("b.txt");
		std::fs::write(&path, "One dog. Two cats!\r\n\n  A bird  \n").unwrap();

		let sentences = read_corpus(&path, &DefaultTokenizer::new()).unwrap();
		assert_eq!(sentences, vec!["One dog.", "Two cats!", "A bird"]);
	}

	#[test]
	fn test_list_corpora() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("b.txt"), "").unwrap();
		std::fs::write(dir.path().join("a.txt"), "").unwrap();
		std::fs::write(dir.path().join("a.bin"), [0u8]).unwrap();
		std::fs::create_dir(dir.path().join("c.txt")).unwrap();

		assert_eq!(list_corpora(dir.path()).unwrap(), vec!["a", "b"]);
	}
}
