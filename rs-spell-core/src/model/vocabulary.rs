use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};

/// Sentence-start padding token.
pub const START_TOKEN: &str = "<s>";
/// Sentence-end token, predicted like any other word.
pub const END_TOKEN: &str = "</s>";
/// Out-of-vocabulary symbol.
pub const UNKNOWN_TOKEN: &str = "<unk>";

/// Returns `true` for the boundary and out-of-vocabulary markers.
///
/// Reserved tokens can never be vocabulary words nor correction input.
pub fn is_reserved_token(token: &str) -> bool {
	token == START_TOKEN || token == END_TOKEN || token == UNKNOWN_TOKEN
}

/// The closed set of known words with their unigram frequencies.
///
/// # Responsibilities
/// - Answer membership queries (non-word detection)
/// - Provide an add-k smoothed unigram probability, never zero
/// - List its words for the candidate index
///
/// # Invariants
/// - Never empty
/// - `total` is the sum of all counts
/// - No word is empty, contains whitespace, or is a reserved token
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Vocabulary {
	/// Word to number of occurrences in the training data.
	counts: HashMap<String, u64>,
	/// Sum of all counts.
	total: u64,
	/// Add-k pseudo count used by `unigram_probability`.
	k: f64,
}

impl Vocabulary {
	/// Pseudo count used when none is given.
	pub const DEFAULT_K: f64 = 1.0;

	/// Builds a vocabulary from word frequencies with the default pseudo count.
	///
	/// # Errors
	/// Returns `InvalidInput` if `counts` is empty or holds a malformed word.
	pub fn new(counts: HashMap<String, u64>) -> Result<Self> {
		Self::with_smoothing(counts, Self::DEFAULT_K)
	}

	/// Builds a vocabulary with an explicit add-k pseudo count.
	///
	/// # Errors
	/// Returns `InvalidInput` if `counts` is empty, holds a malformed word,
	/// or `k` is not a strictly positive finite number.
	pub fn with_smoothing(counts: HashMap<String, u64>, k: f64) -> Result<Self> {
		if counts.is_empty() {
			return Err(SpellError::invalid_input("vocabulary is empty"));
		}
		if !(k.is_finite() && k > 0.0) {
			return Err(SpellError::invalid_input(format!("add-k pseudo count must be > 0, got {k}")));
		}
		for word in counts.keys() {
			validate_token(word)?;
		}

		let total = counts.values().sum();
		Ok(Self { counts, total, k })
	}

	/// Derives a vocabulary by counting every token of a tokenized corpus.
	///
	/// # Errors
	/// Returns `InvalidInput` if the corpus holds no token at all.
	pub fn from_sentences<S: AsRef<str>>(sentences: &[Vec<S>]) -> Result<Self> {
		let mut counts: HashMap<String, u64> = HashMap::new();
		for token in sentences.iter().flatten() {
			*counts.entry(token.as_ref().to_owned()).or_insert(0) += 1;
		}
		Self::new(counts)
	}

	pub fn contains(&self, word: &str) -> bool {
		self.counts.contains_key(word)
	}

	/// Raw frequency, `0` for unknown words.
	pub fn count(&self, word: &str) -> u64 {
		self.counts.get(word).copied().unwrap_or(0)
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Smoothed unigram probability `(count + k) / (total + k * (|V| + 1))`.
	///
	/// The extra slot in the denominator is the out-of-vocabulary symbol, so
	/// unknown words get `k / (total + k * (|V| + 1))` instead of zero.
	pub fn unigram_probability(&self, word: &str) -> f64 {
		let slots = (self.counts.len() + 1) as f64;
		(self.count(word) as f64 + self.k) / (self.total as f64 + self.k * slots)
	}

	/// Known words in lexicographic order.
	pub fn words(&self) -> Vec<&str> {
		let mut words: Vec<&str> = self.counts.keys().map(String::as_str).collect();
		words.sort_unstable();
		words
	}

	/// Iterates over `(word, count)` pairs in arbitrary order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.counts.iter().map(|(word, count)| (word.as_str(), *count))
	}

	/// Adds the counts of `other` to this vocabulary.
	///
	/// Used when retraining on additional data; the pseudo count of `self` is kept.
	pub fn merge(&mut self, other: &Self) {
		for (word, count) in &other.counts {
			*self.counts.entry(word.clone()).or_insert(0) += *count;
		}
		self.total += other.total;
	}
}

/// Rejects empty tokens, tokens with whitespace and reserved tokens.
pub(crate) fn validate_token(token: &str) -> Result<()> {
	if token.is_empty() {
		return Err(SpellError::invalid_input("empty token"));
	}
	if token.chars().any(char::is_whitespace) {
		return Err(SpellError::invalid_input(format!("token {token:?} contains whitespace")));
	}
	if is_reserved_token(token) {
		return Err(SpellError::invalid_input(format!("{token:?} is a reserved token")));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn vocabulary() -> Vocabulary {
		let counts = HashMap::from([
			("the".to_owned(), 6),
			("cat".to_owned(), 3),
			("hat".to_owned(), 1),
		]);
		Vocabulary::new(counts).unwrap()
	}

	#[test]
	fn test_empty_vocabulary_is_rejected() {
		let result = Vocabulary::new(HashMap::new());
		assert!(matches!(result, Err(SpellError::InvalidInput(_))));
	}

	#[test]
	fn test_reserved_and_malformed_words_are_rejected() {
		for word in [START_TOKEN, END_TOKEN, UNKNOWN_TOKEN, "", "two words"] {
			let counts = HashMap::from([(word.to_owned(), 1)]);
			assert!(Vocabulary::new(counts).is_err(), "{word:?} accepted");
		}
	}

	#[test]
	fn test_invalid_pseudo_count() {
		let counts = HashMap::from([("cat".to_owned(), 1)]);
		assert!(Vocabulary::with_smoothing(counts.clone(), 0.0).is_err());
		assert!(Vocabulary::with_smoothing(counts, f64::NAN).is_err());
	}

	#[test]
	fn test_unigram_probability_has_floor() {
		let vocabulary = vocabulary();
		// (6 + 1) / (10 + 1 * 4)
		assert!((vocabulary.unigram_probability("the") - 0.5).abs() < 1e-12);
		let unknown = vocabulary.unigram_probability("dog");
		assert!(unknown > 0.0);
		assert!((unknown - 1.0 / 14.0).abs() < 1e-12);
	}

	#[test]
	fn test_unigram_mass_sums_to_one() {
		let vocabulary = vocabulary();
		let sum: f64 = vocabulary.words().iter().map(|w| vocabulary.unigram_probability(w)).sum::<f64>()
			+ vocabulary.unigram_probability(UNKNOWN_TOKEN);
		assert!((sum - 1.0).abs() < 1e-12);
	}

	#[test]
	fn test_from_sentences_and_merge() {
		let sentences = vec![vec!["the", "cat"], vec!["the", "hat"]];
		let mut vocabulary = Vocabulary::from_sentences(&sentences).unwrap();
		assert_eq!(vocabulary.count("the"), 2);
		assert_eq!(vocabulary.total(), 4);
		assert_eq!(vocabulary.words(), vec!["cat", "hat", "the"]);

		let other = Vocabulary::from_sentences(&[vec!["sat"]]).unwrap();
		vocabulary.merge(&other);
		assert!(vocabulary.contains("sat"));
		assert_eq!(vocabulary.total(), 5);
	}

	#[test]
	fn test_from_empty_corpus_is_rejected() {
		let sentences: Vec<Vec<&str>> = vec![vec![]];
		assert!(Vocabulary::from_sentences(&sentences).is_err());
	}
}
