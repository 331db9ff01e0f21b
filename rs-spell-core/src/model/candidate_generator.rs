use std::collections::{HashMap, HashSet};

use super::edit::align;
use super::vocabulary::Vocabulary;

/// A vocabulary word close to an observed word.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighbor {
	/// Number of elementary edits separating it from the observed word.
	pub distance: usize,
	pub word: String,
}

/// Finds the vocabulary words within a bounded number of edits of a word.
///
/// # Behavior
/// Every vocabulary word is indexed under the strings obtained by deleting up
/// to `depth` of its characters. Two words `d` edits apart always reach a
/// common string with at most `d` deletions on each side (a substitution or a
/// transposition is undone by one deletion per side, an insertion or a
/// deletion by one deletion on a single side). Looking up the deletions of the
/// observed word therefore yields every neighbor, and each hit is then checked
/// with the same alignment the error model scores.
///
/// # Invariants
/// - A reported `distance` is the restricted Damerau-Levenshtein distance
/// - Every word the error model can align within the bound is reported, and nothing else
#[derive(Clone, Debug)]
pub struct CandidateGenerator {
	words: Vec<String>,
	/// Deletion string -> indices in `words`.
	deletes: HashMap<String, Vec<usize>>,
	depth: usize,
}

impl CandidateGenerator {
	/// Indexes `vocabulary` for searches of up to `depth` edits.
	pub fn new(vocabulary: &Vocabulary, depth: usize) -> Self {
		let words: Vec<String> = vocabulary.words().into_iter().map(str::to_owned).collect();
		let mut deletes: HashMap<String, Vec<usize>> = HashMap::new();
		for (index, word) in words.iter().enumerate() {
			for key in deletions(word, depth) {
				deletes.entry(key).or_default().push(index);
			}
		}
		Self { words, deletes, depth }
	}

	/// Largest edit distance the index answers.
	pub fn depth(&self) -> usize {
		self.depth
	}

	/// Every vocabulary word within `max_edit_distance` edits of `observed`,
	/// sorted by distance then word.
	///
	/// The observed word itself is returned at distance 0 when it is known,
	/// so that a real word can still lose against a better candidate.
	///
	/// # Notes
	/// - `max_edit_distance` is capped at `depth`.
	pub fn generate(&self, observed: &str, max_edit_distance: usize) -> Vec<Neighbor> {
		let bound = max_edit_distance.min(self.depth);
		let observed_chars: Vec<char> = observed.chars().collect();

		let mut checked: HashSet<usize> = HashSet::new();
		let mut found = Vec::new();
		for key in deletions(observed, bound) {
			let Some(indices) = self.deletes.get(&key) else {
				continue;
			};
			for &index in indices {
				if !checked.insert(index) {
					continue;
				}
				let word = &self.words[index];
				let intended: Vec<char> = word.chars().collect();
				if let Some(alignment) = align(&intended, &observed_chars, bound, |_| 0.0) {
					found.push(Neighbor { distance: alignment.distance, word: word.clone() });
				}
			}
		}

		found.sort();
		found
	}
}

/// `word` and every string obtained by deleting up to `depth` of its chars.
///
/// Breadth-first, each string is expanded at most once.
fn deletions(word: &str, depth: usize) -> HashSet<String> {
	let mut seen = HashSet::from([word.to_owned()]);
	let mut frontier = vec![word.chars().collect::<Vec<char>>()];

	for _ in 0..depth {
		let mut next = Vec::new();
		for chars in &frontier {
			for i in 0..chars.len() {
				let mut shorter = chars.clone();
				shorter.remove(i);
				if seen.insert(shorter.iter().collect()) {
					next.push(shorter);
				}
			}
		}
		if next.is_empty() {
			break;
		}
		frontier = next;
	}
	seen
}
