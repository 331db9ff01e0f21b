use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use log::debug;
use serde::Serialize;

use crate::error::Result;
use super::candidate_generator::{CandidateGenerator, Neighbor};
use super::corrector_config::CorrectorConfig;
use super::edit::Edit;
use super::spell_model::SpellModel;
use super::vocabulary::validate_token;

/// A scored correction candidate for one observed word.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Candidate {
	pub word: String,
	/// Number of edits between the candidate and the observed word.
	pub distance: usize,
	/// Most probable minimal edit path from the candidate to the observed word.
	pub edits: Vec<Edit>,
	/// `ln P(observed | candidate)`
	pub error_log_probability: f64,
	/// `ln P(candidate | finalized prefix)`
	pub lm_log_probability: f64,
	/// Sum of both log-probabilities.
	pub score: f64,
}

/// Outcome of correcting one word.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrectionStatus {
	/// The observed word is known and no candidate beats it.
	AcceptedOriginal,
	/// The observed word was replaced by the best candidate.
	Corrected,
	/// No known word within the search radius; the word is kept as is.
	Uncorrectable,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CorrectionResult {
	pub original: String,
	pub final_word: String,
	pub status: CorrectionStatus,
	/// Best candidates, highest score first.
	pub candidates: Vec<Candidate>,
}

impl CorrectionResult {
	pub fn was_corrected(&self) -> bool {
		self.status == CorrectionStatus::Corrected
	}
}

/// Candidate lists already generated, keyed by observed word.
type Memo = HashMap<String, Vec<Neighbor>>;

/// Noisy-channel spelling corrector.
///
/// For every observed word, candidates within the configured edit distance
/// are scored by `ln P(observed | candidate) + ln P(candidate | prefix)`, where
/// the prefix is made of the already corrected words of the sentence.
///
/// # Responsibilities
/// - Correct a sentence left to right, feeding each decision into the context
///   of the next word
/// - Correct independent sentences in parallel
/// - Score sentences with the language model
///
/// # Notes
/// - The corrector only borrows the model; any number of correctors may share it.
/// - The candidate index is built once per model and edit bound, then reused
///   by every corrector of that model.
/// - Ranking ties are broken by unigram count (higher first), then by word.
pub struct NoisyChannelCorrector<'m> {
	model: &'m SpellModel,
	generator: &'m CandidateGenerator,
	config: CorrectorConfig,
}

impl<'m> NoisyChannelCorrector<'m> {
	/// # Errors
	/// Returns `InvalidInput` if `config` holds invalid values.
	pub fn new(model: &'m SpellModel, config: CorrectorConfig) -> Result<Self> {
		config.validate()?;
		Ok(Self { model, generator: model.candidate_generator(config.max_edit_distance()), config })
	}

	pub fn config(&self) -> &CorrectorConfig {
		&self.config
	}

	/// Corrects one word given the words already finalized before it.
	///
	/// # Errors
	/// Returns `InvalidInput` for a malformed word.
	pub fn correct_word<S: AsRef<str>>(&self, word: &str, prefix: &[S]) -> Result<CorrectionResult> {
		validate_token(word)?;
		let prefix: Vec<String> = prefix.iter().map(|token| token.as_ref().to_owned()).collect();
		Ok(self.correct_token(word, &prefix, &mut Memo::new()))
	}

	/// Corrects a tokenized sentence.
	///
	/// Words are decided left to right and the context of each word is the
	/// finalized (possibly corrected) prefix, so earlier corrections inform
	/// later ones. An uncorrectable word is reported and kept.
	///
	/// # Errors
	/// Returns `InvalidInput` if any token is empty, contains whitespace or
	/// is a boundary marker.
	pub fn correct_sentence<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<CorrectionResult>> {
		for token in tokens {
			validate_token(token.as_ref())?;
		}
		Ok(self.correct_validated(tokens, &mut Memo::new()))
	}

	/// Corrects independent sentences in parallel, results in input order.
	///
	/// # Behavior
	/// - Splits sentences into one chunk per CPU.
	/// - Each worker corrects its chunk sequentially, memoizing candidates.
	/// - Results are sent back over a channel and reordered by index.
	///
	/// # Errors
	/// Returns `InvalidInput` if any token of any sentence is malformed.
	pub fn correct_sentences<S>(&self, sentences: &[Vec<S>]) -> Result<Vec<Vec<CorrectionResult>>>
	where
		S: AsRef<str> + Sync,
	{
		for token in sentences.iter().flatten() {
			validate_token(token.as_ref())?;
		}

		let chunk_size = sentences.len().div_ceil(num_cpus::get()).max(1);
		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for (chunk_index, chunk) in sentences.chunks(chunk_size).enumerate() {
				let tx = tx.clone();
				scope.spawn(move || {
					let mut memo = Memo::new();
					for (offset, sentence) in chunk.iter().enumerate() {
						let results = self.correct_validated(sentence, &mut memo);
						// The receiver is alive until every worker has finished
						let _ = tx.send((chunk_index * chunk_size + offset, results));
					}
				});
			}
		});
		drop(tx);

		let mut corrected = vec![Vec::new(); sentences.len()];
		for (index, results) in rx.iter() {
			corrected[index] = results;
		}
		Ok(corrected)
	}

	/// Natural-log likelihood of a sentence under the language model,
	/// end of sentence included.
	///
	/// # Errors
	/// Returns `InvalidInput` for malformed tokens.
	pub fn score_sentence<S: AsRef<str>>(&self, tokens: &[S]) -> Result<f64> {
		for token in tokens {
			validate_token(token.as_ref())?;
		}
		Ok(self.model.language_model().sequence_log_probability(tokens))
	}

	fn correct_validated<S: AsRef<str>>(&self, tokens: &[S], memo: &mut Memo) -> Vec<CorrectionResult> {
		let (_, results) = tokens.iter().fold(
			(Vec::with_capacity(tokens.len()), Vec::with_capacity(tokens.len())),
			|(mut prefix, mut results): (Vec<String>, Vec<CorrectionResult>), token| {
				let result = self.correct_token(token.as_ref(), &prefix, memo);
				prefix.push(result.final_word.clone());
				results.push(result);
				(prefix, results)
			},
		);
		results
	}

	fn correct_token(&self, word: &str, prefix: &[String], memo: &mut Memo) -> CorrectionResult {
		let vocabulary = self.model.vocabulary();

		let mut candidates: Vec<Candidate> = if !self.config.check_real_words && vocabulary.contains(word) {
			self.score(word, &Neighbor { distance: 0, word: word.to_owned() }, prefix).into_iter().collect()
		} else {
			let neighbors = memo
				.entry(word.to_owned())
				.or_insert_with(|| self.generator.generate(word, self.config.max_edit_distance()));
			neighbors.iter().filter_map(|neighbor| self.score(word, neighbor, prefix)).collect()
		};

		if candidates.is_empty() {
			debug!("no candidate within {} edits of {word:?}", self.config.max_edit_distance());
			return CorrectionResult {
				original: word.to_owned(),
				final_word: word.to_owned(),
				status: CorrectionStatus::Uncorrectable,
				candidates,
			};
		}

		candidates.sort_by(|a, b| {
			b.score
				.total_cmp(&a.score)
				.then_with(|| vocabulary.count(&b.word).cmp(&vocabulary.count(&a.word)))
				.then_with(|| a.word.cmp(&b.word))
		});

		let best = candidates[0].score;
		let keep_original = candidates
			.iter()
			.any(|candidate| candidate.word == word && candidate.score >= best - self.config.tolerance());

		let (final_word, status) = if keep_original {
			(word.to_owned(), CorrectionStatus::AcceptedOriginal)
		} else {
			(candidates[0].word.clone(), CorrectionStatus::Corrected)
		};
		debug!("{word:?} -> {final_word:?} ({status:?}, {} candidates)", candidates.len());

		candidates.truncate(self.config.top_k());
		CorrectionResult { original: word.to_owned(), final_word, status, candidates }
	}

	/// Scores one neighbor, `None` when the error model cannot relate it to the word.
	fn score(&self, word: &str, neighbor: &Neighbor, prefix: &[String]) -> Option<Candidate> {
		let Some(path) = self.model.error_model().best_edit_path_within(
			word,
			&neighbor.word,
			self.config.max_edit_distance(),
		) else {
			debug!("{:?} is not within {} aligned edits of {word:?}", neighbor.word, self.config.max_edit_distance());
			return None;
		};

		let lm_log_probability = self.model.language_model().log_conditional_probability(&neighbor.word, prefix);
		Some(Candidate {
			word: neighbor.word.clone(),
			distance: path.distance(),
			score: path.log_probability + lm_log_probability,
			error_log_probability: path.log_probability,
			lm_log_probability,
			edits: path.edits,
		})
	}
}
