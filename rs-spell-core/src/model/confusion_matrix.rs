use std::collections::HashMap;
use std::iter;

use serde::{Deserialize, Serialize};

use super::edit::{Edit, EditKind, WORD_START};
use super::vocabulary::Vocabulary;

/// Occurrence counts of one kind of spelling error.
///
/// Keys are ordered character pairs following the `Edit::pair` conventions
/// (e.g. `('a', 'q')` in the substitution matrix counts "a typed as q").
///
/// # Invariants
/// - Every count is >= 1
/// - `total` is the sum of all counts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConfusionMatrix {
	kind: EditKind,
	counts: HashMap<(char, char), u64>,
	total: u64,
}

impl ConfusionMatrix {
	/// Creates an empty matrix for `kind`.
	pub fn new(kind: EditKind) -> Self {
		Self { kind, counts: HashMap::new(), total: 0 }
	}

	/// Builds a matrix from pre-tabulated counts.
	///
	/// Repeated pairs are summed and zero counts are skipped.
	pub fn from_counts<I>(kind: EditKind, counts: I) -> Self
	where
		I: IntoIterator<Item = ((char, char), u64)>,
	{
		let mut matrix = Self::new(kind);
		for (pair, count) in counts {
			matrix.add_count(pair, count);
		}
		matrix
	}

	pub fn kind(&self) -> EditKind {
		self.kind
	}

	/// Records one occurrence of `pair`.
	pub fn add(&mut self, pair: (char, char)) {
		self.add_count(pair, 1);
	}

	pub fn add_count(&mut self, pair: (char, char), count: u64) {
		if count == 0 {
			return;
		}
		*self.counts.entry(pair).or_insert(0) += count;
		self.total += count;
	}

	/// Number of recorded occurrences of `pair`.
	pub fn count(&self, pair: (char, char)) -> u64 {
		self.counts.get(&pair).copied().unwrap_or(0)
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	/// Number of distinct pairs.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Sums the counts of another matrix of the same kind into this one.
	///
	/// # Errors
	/// Returns an error if the kinds differ.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.kind != other.kind {
			return Err(format!("Kind mismatch: {:?} vs {:?}", self.kind, other.kind));
		}
		for (pair, count) in &other.counts {
			self.add_count(*pair, *count);
		}
		Ok(())
	}
}

/// Character statistics of the vocabulary, weighted by word frequency.
///
/// They are the denominators turning confusion counts into probabilities:
/// how often a character, or an adjacent pair of characters, was available
/// to be mistyped. Each word is counted with a leading `WORD_START`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CharStats {
	unigrams: HashMap<char, u64>,
	bigrams: HashMap<(char, char), u64>,
}

impl CharStats {
	/// Counts characters and adjacent pairs of every vocabulary word.
	///
	/// A word listed with a zero frequency still counts once.
	pub fn from_vocabulary(vocabulary: &Vocabulary) -> Self {
		let mut stats = Self::default();
		for (word, count) in vocabulary.iter() {
			stats.add_word(word, count.max(1));
		}
		stats
	}

	fn add_word(&mut self, word: &str, weight: u64) {
		let chars: Vec<char> = iter::once(WORD_START).chain(word.chars()).collect();
		for c in &chars {
			*self.unigrams.entry(*c).or_insert(0) += weight;
		}
		for pair in chars.windows(2) {
			*self.bigrams.entry((pair[0], pair[1])).or_insert(0) += weight;
		}
	}

	pub fn unigram(&self, c: char) -> u64 {
		self.unigrams.get(&c).copied().unwrap_or(0)
	}

	pub fn bigram(&self, first: char, second: char) -> u64 {
		self.bigrams.get(&(first, second)).copied().unwrap_or(0)
	}

	/// Number of distinct characters, the word-start marker excluded.
	pub fn alphabet_size(&self) -> usize {
		self.unigrams.keys().filter(|c| **c != WORD_START).count()
	}

	/// How many times the context of `edit` occurred in the vocabulary.
	///
	/// - deletion `[x, y]` and transposition `[x, y]`: occurrences of `xy`
	/// - insertion `[x, y]` and substitution `[x, y]`: occurrences of `x`
	pub fn denominator(&self, edit: &Edit) -> u64 {
		let (first, second) = edit.pair;
		match edit.kind {
			EditKind::Deletion | EditKind::Transposition => self.bigram(first, second),
			EditKind::Insertion | EditKind::Substitution => self.unigram(first),
		}
	}
}
