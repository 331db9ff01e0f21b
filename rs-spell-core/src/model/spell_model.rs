use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use crate::io::{build_output_path, get_filename, read_corpus, read_error_pairs, read_vocabulary};
use super::candidate_generator::CandidateGenerator;
use super::confusion_matrix::CharStats;
use super::corrector_config::MAX_EDIT_DISTANCE;
use super::error_model::{ErrorModel, ErrorModelConfig};
use super::language_model::LanguageModel;
use super::smoothing::Smoothing;
use super::vocabulary::Vocabulary;

/// Training parameters of a `SpellModel`.
///
/// # Invariants
/// - `order` is 2 or 3
/// - `smoothing` and `error` hold valid parameters
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
	order: usize,
	smoothing: Smoothing,
	error: ErrorModelConfig,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self { order: 3, smoothing: Smoothing::default(), error: ErrorModelConfig::default() }
	}
}

impl ModelConfig {
	pub fn order(&self) -> usize {
		self.order
	}

	pub fn smoothing(&self) -> Smoothing {
		self.smoothing
	}

	pub fn error(&self) -> &ErrorModelConfig {
		&self.error
	}

	/// Sets the n-gram order.
	///
	/// # Errors
	/// Returns an error unless `order` is 2 or 3.
	pub fn set_order(&mut self, order: usize) -> Result<()> {
		if !(2..=3).contains(&order) {
			return Err(SpellError::invalid_input(format!("n-gram order must be 2 or 3, got {order}")));
		}
		self.order = order;
		Ok(())
	}

	/// # Errors
	/// Returns an error if the smoothing parameters are invalid.
	pub fn set_smoothing(&mut self, smoothing: Smoothing) -> Result<()> {
		smoothing.validate()?;
		self.smoothing = smoothing;
		Ok(())
	}

	/// # Errors
	/// Returns an error if the error model parameters are invalid.
	pub fn set_error(&mut self, error: ErrorModelConfig) -> Result<()> {
		error.validate()?;
		self.error = error;
		Ok(())
	}

	pub fn validate(&self) -> Result<()> {
		let mut checked = Self::default();
		checked.set_order(self.order)?;
		checked.set_smoothing(self.smoothing)?;
		checked.set_error(self.error)
	}
}

/// A trained spelling model: language model plus error model.
///
/// This is the unit of persistence and of sharing. Once built it is only
/// read, so a single instance can serve any number of threads by reference.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SpellModel {
	name: String,
	language_model: LanguageModel,
	error_model: ErrorModel,
	/// Candidate indexes by edit bound, built on first use.
	#[serde(skip)]
	candidates: [OnceLock<CandidateGenerator>; MAX_EDIT_DISTANCE + 1],
}

impl SpellModel {
	/// Trains both models.
	///
	/// # Parameters
	/// - `sentences`: Tokenized training sentences.
	/// - `vocabulary`: Known words; derived from `sentences` when `None`.
	/// - `error_pairs`: `(misspelling, correction)` pairs, possibly empty.
	/// - `config`: Training parameters.
	///
	/// # Errors
	/// Returns `InvalidInput` for an empty corpus or vocabulary, malformed
	/// tokens or invalid parameters.
	pub fn train<S, E>(
		sentences: &[Vec<S>],
		vocabulary: Option<Vocabulary>,
		error_pairs: &[(E, E)],
		config: &ModelConfig,
	) -> Result<Self>
	where
		S: AsRef<str> + Sync,
		E: AsRef<str>,
	{
		config.validate()?;
		let vocabulary = match vocabulary {
			Some(vocabulary) => vocabulary,
			None => Vocabulary::from_sentences(sentences)?,
		};

		let error_model = ErrorModel::train(error_pairs, CharStats::from_vocabulary(&vocabulary), config.error)?;
		let language_model = LanguageModel::train(sentences, vocabulary, config.order, config.smoothing)?;

		Ok(Self { name: String::new(), language_model, error_model, candidates: Default::default() })
	}

	/// Loads a model from its binary cache if it exists, otherwise trains it
	/// from the corpus file and writes the cache.
	///
	/// For a corpus `data/english.dat` (one sentence per line):
	/// - `data/english.voc`, optional, holds `word count` lines
	/// - `data/english.err`, optional, holds `misspelling<TAB>correction` lines
	/// - `data/english.bin` is the cache
	///
	/// # Notes
	/// - The cache is reused as is; delete it after changing the sources or `config`.
	pub fn new<P: AsRef<Path>>(corpus_path: P, config: &ModelConfig) -> Result<Self> {
		let binary_data_path = build_output_path(&corpus_path, "bin")?;
		let mut model = if binary_data_path.exists() {
			info!("loading cached model {}", binary_data_path.display());
			Self::load(&binary_data_path)?
		} else {
			let model = Self::read_database_files(&corpus_path, config)?;
			model.save(&binary_data_path)?;
			model
		};
		model.name = get_filename(&corpus_path)?;
		Ok(model)
	}

	fn read_database_files<P: AsRef<Path>>(corpus_path: P, config: &ModelConfig) -> Result<Self> {
		let sentences = read_corpus(&corpus_path)?;

		let vocabulary_path = build_output_path(&corpus_path, "voc")?;
		let vocabulary = if vocabulary_path.exists() {
			Some(read_vocabulary(vocabulary_path)?)
		} else {
			None
		};

		let errors_path = build_output_path(&corpus_path, "err")?;
		let error_pairs = if errors_path.exists() {
			read_error_pairs(errors_path)?
		} else {
			Vec::new()
		};

		info!(
			"training model from {} ({} sentences, {} error pairs)",
			corpus_path.as_ref().display(),
			sentences.len(),
			error_pairs.len()
		);
		Self::train(&sentences, vocabulary, &error_pairs, config)
	}

	/// Name of the corpus the model was built from, empty if trained in memory.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn language_model(&self) -> &LanguageModel {
		&self.language_model
	}

	pub fn error_model(&self) -> &ErrorModel {
		&self.error_model
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		self.language_model.vocabulary()
	}

	/// Vocabulary index answering searches of up to `max_edit_distance` edits.
	///
	/// Built on the first call for each bound and shared afterwards.
	///
	/// # Notes
	/// - Bounds above `MAX_EDIT_DISTANCE` get the `MAX_EDIT_DISTANCE` index.
	pub fn candidate_generator(&self, max_edit_distance: usize) -> &CandidateGenerator {
		let depth = max_edit_distance.min(MAX_EDIT_DISTANCE);
		self.candidates[depth].get_or_init(|| {
			info!("indexing {} words for {depth} edits", self.vocabulary().len());
			CandidateGenerator::new(self.vocabulary(), depth)
		})
	}

	/// Opaque binary model state.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Restores a model from `to_bytes` output.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}

	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		Self::from_bytes(&fs::read(path)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sentences() -> Vec<Vec<&'static str>> {
		vec![vec!["the", "cat", "sat"], vec!["the", "hat", "sat"]]
	}

	#[test]
	fn test_config_setters() {
		let mut config = ModelConfig::default();
		assert_eq!(config.order(), 3);
		assert!(config.set_order(4).is_err());
		assert!(config.set_order(1).is_err());
		config.set_order(2).unwrap();
		assert_eq!(config.order(), 2);

		assert!(config.set_smoothing(Smoothing::Laplace { k: 0.0 }).is_err());
		config.set_smoothing(Smoothing::Laplace { k: 1.0 }).unwrap();
		assert_eq!(config.smoothing(), Smoothing::Laplace { k: 1.0 });

		let error = ErrorModelConfig { keep_probability: 1.0, ..ErrorModelConfig::default() };
		assert!(config.set_error(error).is_err());
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_train_derives_vocabulary() {
		let pairs: [(&str, &str); 1] = [("sqt", "sat")];
		let model = SpellModel::train(&sentences(), None, &pairs, &ModelConfig::default()).unwrap();
		assert_eq!(model.vocabulary().words(), vec!["cat", "hat", "sat", "the"]);
		assert_eq!(model.language_model().order(), 3);
		assert_eq!(model.name(), "");
	}

	#[test]
	fn test_train_rejects_empty_corpus() {
		let empty: Vec<Vec<&str>> = Vec::new();
		let pairs: [(&str, &str); 0] = [];
		assert!(SpellModel::train(&empty, None, &pairs, &ModelConfig::default()).is_err());
	}

	#[test]
	fn test_bytes_round_trip() {
		let pairs: [(&str, &str); 1] = [("teh", "the")];
		let model = SpellModel::train(&sentences(), None, &pairs, &ModelConfig::default()).unwrap();
		let restored = SpellModel::from_bytes(&model.to_bytes().unwrap()).unwrap();

		let context = ["the"];
		assert_eq!(
			restored.language_model().conditional_probability("cat", &context),
			model.language_model().conditional_probability("cat", &context)
		);
		assert_eq!(
			restored.error_model().error_probability("teh", "the"),
			model.error_model().error_probability("teh", "the")
		);
		assert!(SpellModel::from_bytes(&[0xff, 0x01]).is_err());
	}

	#[test]
	fn test_candidate_index_is_shared() {
		let pairs: [(&str, &str); 0] = [];
		let model = SpellModel::train(&sentences(), None, &pairs, &ModelConfig::default()).unwrap();

		let first = model.candidate_generator(2);
		assert_eq!(first.depth(), 2);
		assert!(std::ptr::eq(first, model.candidate_generator(2)));
		assert_eq!(model.candidate_generator(1).depth(), 1);
		assert_eq!(model.candidate_generator(9).depth(), MAX_EDIT_DISTANCE);

		let restored = SpellModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
		assert_eq!(restored.candidate_generator(2).generate("cqt", 2), first.generate("cqt", 2));
	}
}
