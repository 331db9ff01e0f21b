use std::collections::BTreeSet;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use super::confusion_matrix::{CharStats, ConfusionMatrix};
use super::edit::{align, Edit, EditKind};

/// Parameters of the error (channel) model.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ErrorModelConfig {
	/// Probability that an intended word is typed without error.
	pub keep_probability: f64,

	/// Add-k pseudo count giving unseen edits a floor probability.
	pub k: f64,

	/// Largest number of edits relating two words, beyond which the model
	/// declines to score the pair.
	pub max_distance: usize,
}

impl Default for ErrorModelConfig {
	fn default() -> Self {
		Self { keep_probability: 0.95, k: 0.5, max_distance: 2 }
	}
}

impl ErrorModelConfig {
	/// # Errors
	/// Returns `InvalidInput` if `keep_probability` is not in `(0, 1)`, `k` is
	/// not strictly positive, or `max_distance` is zero.
	pub fn validate(&self) -> Result<()> {
		if !(self.keep_probability > 0.0 && self.keep_probability < 1.0) {
			return Err(SpellError::invalid_input(format!(
				"keep probability must be in (0, 1), got {}",
				self.keep_probability
			)));
		}
		if !(self.k.is_finite() && self.k > 0.0) {
			return Err(SpellError::invalid_input(format!("pseudo count must be > 0, got {}", self.k)));
		}
		if self.max_distance == 0 {
			return Err(SpellError::invalid_input("max edit distance must be >= 1"));
		}
		Ok(())
	}
}

/// The most probable minimal sequence of edits from an intended word to an
/// observed one.
#[derive(Clone, Debug, PartialEq)]
pub struct EditPath {
	/// Edits in intended-word order, empty when both words are identical.
	pub edits: Vec<Edit>,
	/// Natural log of `P(observed | intended)` along this path.
	pub log_probability: f64,
}

impl EditPath {
	pub fn distance(&self) -> usize {
		self.edits.len()
	}

	pub fn probability(&self) -> f64 {
		self.log_probability.exp()
	}
}

/// Channel model scoring how likely an intended word is typed as an observed one.
///
/// # Responsibilities
/// - Tabulate insertion, deletion, substitution and transposition counts
///   from misspelling/correction pairs
/// - Turn counts into per-edit probabilities, normalized by how often the
///   edit context occurs in the vocabulary, with a floor for unseen edits
/// - Score a word pair along its most probable minimal edit path
///
/// # Invariants
/// - The four matrices are of the four distinct kinds
/// - Edit probabilities are in `(0, 1]`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorModel {
	insertion: ConfusionMatrix,
	deletion: ConfusionMatrix,
	substitution: ConfusionMatrix,
	transposition: ConfusionMatrix,
	char_stats: CharStats,
	config: ErrorModelConfig,
}

impl ErrorModel {
	/// Tabulates the errors of `(misspelling, correction)` pairs.
	///
	/// Each pair is aligned along a minimal edit path and every edit on it is
	/// counted once. Pairs that are identical or need more than
	/// `config.max_distance` edits teach nothing and are skipped.
	///
	/// # Errors
	/// Returns `InvalidInput` for an invalid configuration or an empty word.
	pub fn train<S: AsRef<str>>(pairs: &[(S, S)], char_stats: CharStats, config: ErrorModelConfig) -> Result<Self> {
		config.validate()?;

		let mut model = Self::empty(char_stats, config);
		let mut skipped = 0;
		for (misspelling, correction) in pairs {
			let (misspelling, correction) = (misspelling.as_ref(), correction.as_ref());
			if misspelling.is_empty() || correction.is_empty() {
				return Err(SpellError::invalid_input("empty word in error pair"));
			}

			let observed: Vec<char> = misspelling.chars().collect();
			let intended: Vec<char> = correction.chars().collect();
			match align(&intended, &observed, config.max_distance, |_| 0.0) {
				Some(alignment) if alignment.distance > 0 => {
					for edit in &alignment.edits {
						model.matrix_mut(edit.kind).add(edit.pair);
					}
				}
				_ => skipped += 1,
			}
		}

		if skipped > 0 {
			warn!("skipped {skipped} error pairs (identical or more than {} edits apart)", config.max_distance);
		}
		info!("trained error model on {} pairs", pairs.len() - skipped);
		Ok(model)
	}

	/// Builds a model from pre-tabulated confusion matrices.
	///
	/// # Errors
	/// Returns `InvalidInput` for an invalid configuration or if the matrices
	/// are not one of each kind.
	pub fn from_matrices(matrices: [ConfusionMatrix; 4], char_stats: CharStats, config: ErrorModelConfig) -> Result<Self> {
		config.validate()?;

		let kinds: BTreeSet<EditKind> = matrices.iter().map(ConfusionMatrix::kind).collect();
		if kinds.len() != EditKind::ALL.len() {
			let missing: Vec<EditKind> = EditKind::ALL.into_iter().filter(|kind| !kinds.contains(kind)).collect();
			return Err(SpellError::invalid_input(format!("expected one matrix of each kind, missing {missing:?}")));
		}

		let mut model = Self::empty(char_stats, config);
		for matrix in &matrices {
			model.matrix_mut(matrix.kind()).merge(matrix).map_err(SpellError::InvalidInput)?;
		}
		Ok(model)
	}

	fn empty(char_stats: CharStats, config: ErrorModelConfig) -> Self {
		Self {
			insertion: ConfusionMatrix::new(EditKind::Insertion),
			deletion: ConfusionMatrix::new(EditKind::Deletion),
			substitution: ConfusionMatrix::new(EditKind::Substitution),
			transposition: ConfusionMatrix::new(EditKind::Transposition),
			char_stats,
			config,
		}
	}

	pub fn config(&self) -> &ErrorModelConfig {
		&self.config
	}

	pub fn matrix(&self, kind: EditKind) -> &ConfusionMatrix {
		match kind {
			EditKind::Insertion => &self.insertion,
			EditKind::Deletion => &self.deletion,
			EditKind::Substitution => &self.substitution,
			EditKind::Transposition => &self.transposition,
		}
	}

	fn matrix_mut(&mut self, kind: EditKind) -> &mut ConfusionMatrix {
		match kind {
			EditKind::Insertion => &mut self.insertion,
			EditKind::Deletion => &mut self.deletion,
			EditKind::Substitution => &mut self.substitution,
			EditKind::Transposition => &mut self.transposition,
		}
	}

	/// Probability of a single edit: `(count + k) / (context count + k * A)`,
	/// capped at 1, where `A` is the alphabet size plus one unknown character.
	pub fn edit_probability(&self, edit: &Edit) -> f64 {
		let count = self.matrix(edit.kind).count(edit.pair) as f64;
		let denominator = self.char_stats.denominator(edit) as f64;
		let slots = (self.char_stats.alphabet_size() + 1) as f64;
		((count + self.config.k) / (denominator + self.config.k * slots)).min(1.0)
	}

	/// `P(observed | intended)`, or `None` when the words are more than
	/// `max_distance` edits apart.
	pub fn error_probability(&self, observed: &str, intended: &str) -> Option<f64> {
		self.best_edit_path(observed, intended).map(|path| path.probability())
	}

	/// Most probable minimal edit path within the configured distance.
	pub fn best_edit_path(&self, observed: &str, intended: &str) -> Option<EditPath> {
		self.best_edit_path_within(observed, intended, self.config.max_distance)
	}

	/// Most probable minimal edit path within `max_distance` edits.
	///
	/// Identical words score the keep probability. Otherwise the path
	/// maximizing the product of its edit probabilities is selected among
	/// all paths with the fewest edits.
	pub fn best_edit_path_within(&self, observed: &str, intended: &str, max_distance: usize) -> Option<EditPath> {
		if observed == intended {
			return Some(EditPath { edits: Vec::new(), log_probability: self.config.keep_probability.ln() });
		}

		let observed: Vec<char> = observed.chars().collect();
		let intended: Vec<char> = intended.chars().collect();
		let alignment = align(&intended, &observed, max_distance, |edit| self.edit_probability(edit).ln())?;
		Some(EditPath { edits: alignment.edits, log_probability: alignment.weight })
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::model::edit::WORD_START;
	use crate::model::vocabulary::Vocabulary;

	fn char_stats() -> CharStats {
		let vocabulary = Vocabulary::new(HashMap::from([
			("the".to_owned(), 10),
			("actress".to_owned(), 2),
			("sat".to_owned(), 4),
			("a".to_owned(), 1),
			("aa".to_owned(), 1),
		]))
		.unwrap();
		CharStats::from_vocabulary(&vocabulary)
	}

	fn trained() -> ErrorModel {
		let pairs = [("teh", "the"), ("teh", "the"), ("acress", "actress"), ("sqt", "sat"), ("the", "the"), ("xyzw", "a")];
		ErrorModel::train(&pairs, char_stats(), ErrorModelConfig::default()).unwrap()
	}

	#[test]
	fn test_invalid_configuration() {
		let pairs: [(&str, &str); 0] = [];
		for config in [
			ErrorModelConfig { keep_probability: 1.0, ..Default::default() },
			ErrorModelConfig { keep_probability: 0.0, ..Default::default() },
			ErrorModelConfig { k: 0.0, ..Default::default() },
			ErrorModelConfig { max_distance: 0, ..Default::default() },
		] {
			assert!(ErrorModel::train(&pairs, char_stats(), config).is_err());
		}
		assert!(ErrorModel::train(&[("", "the")], char_stats(), ErrorModelConfig::default()).is_err());
	}

	#[test]
	fn test_training_counts() {
		let model = trained();
		assert_eq!(model.matrix(EditKind::Transposition).count(('h', 'e')), 2);
		assert_eq!(model.matrix(EditKind::Deletion).count(('c', 't')), 1);
		assert_eq!(model.matrix(EditKind::Substitution).count(('a', 'q')), 1);
		assert_eq!(model.matrix(EditKind::Insertion).total(), 0);
	}

	#[test]
	fn test_identity_scores_keep_probability() {
		let model = trained();
		let p = model.error_probability("the", "the").unwrap();
		assert!((p - 0.95).abs() < 1e-12);
		assert_eq!(model.best_edit_path("the", "the").unwrap().distance(), 0);
	}

	#[test]
	fn test_single_edit_probability() {
		let model = trained();
		// sub[a, q] = 1, 'a' occurs 4 (sat) + 2 (actress) + 1 (a) + 2 (aa) times
		// alphabet {t, h, e, a, c, r, s} + unknown = 8 slots
		let expected = (1.0 + 0.5) / (9.0 + 0.5 * 8.0);
		let p = model.error_probability("sqt", "sat").unwrap();
		assert!((p - expected).abs() < 1e-12, "{p} != {expected}");
	}

	#[test]
	fn test_seen_errors_beat_unseen_ones() {
		let model = trained();
		let seen = model.error_probability("sqt", "sat").unwrap();
		let unseen = model.error_probability("swt", "sat").unwrap();
		assert!(seen > unseen);
		assert!(unseen > 0.0);
	}

	#[test]
	fn test_two_edits_multiply() {
		let model = trained();
		let path = model.best_edit_path("sqx", "sat").unwrap();
		assert_eq!(path.distance(), 2);
		let product: f64 = path.edits.iter().map(|edit| model.edit_probability(edit)).product();
		assert!((path.probability() - product).abs() < 1e-15);
	}

	#[test]
	fn test_not_applicable_beyond_bound() {
		let model = trained();
		assert!(model.error_probability("xyz", "the").is_none());
		assert!(model.best_edit_path_within("xyz", "the", 3).is_some());
	}

	#[test]
	fn test_most_probable_minimal_path() {
		let deletion = ConfusionMatrix::from_counts(EditKind::Deletion, [((WORD_START, 'a'), 50)]);
		let matrices = [
			ConfusionMatrix::new(EditKind::Insertion),
			deletion,
			ConfusionMatrix::new(EditKind::Substitution),
			ConfusionMatrix::new(EditKind::Transposition),
		];
		let model = ErrorModel::from_matrices(matrices, char_stats(), ErrorModelConfig::default()).unwrap();
		let path = model.best_edit_path("a", "aa").unwrap();
		assert_eq!(path.edits, vec![Edit { kind: EditKind::Deletion, pair: (WORD_START, 'a'), position: 0 }]);
	}

	#[test]
	fn test_duplicate_matrices_are_rejected() {
		let matrices = [
			ConfusionMatrix::from_counts(EditKind::Deletion, [(('a', 'b'), 1)]),
			ConfusionMatrix::from_counts(EditKind::Deletion, [(('a', 'c'), 1)]),
			ConfusionMatrix::new(EditKind::Substitution),
			ConfusionMatrix::new(EditKind::Transposition),
		];
		assert!(ErrorModel::from_matrices(matrices, char_stats(), ErrorModelConfig::default()).is_err());

		// An empty duplicate still leaves the insertion matrix missing
		let matrices = [
			ConfusionMatrix::new(EditKind::Deletion),
			ConfusionMatrix::from_counts(EditKind::Deletion, [(('a', 'c'), 1)]),
			ConfusionMatrix::new(EditKind::Substitution),
			ConfusionMatrix::new(EditKind::Transposition),
		];
		assert!(ErrorModel::from_matrices(matrices, char_stats(), ErrorModelConfig::default()).is_err());

		let matrices = [
			ConfusionMatrix::new(EditKind::Transposition),
			ConfusionMatrix::from_counts(EditKind::Deletion, [(('a', 'c'), 1)]),
			ConfusionMatrix::new(EditKind::Substitution),
			ConfusionMatrix::new(EditKind::Insertion),
		];
		let model = ErrorModel::from_matrices(matrices, char_stats(), ErrorModelConfig::default()).unwrap();
		assert_eq!(model.matrix(EditKind::Deletion).count(('a', 'c')), 1);
	}
}
