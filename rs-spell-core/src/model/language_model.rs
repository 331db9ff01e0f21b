use std::sync::mpsc;
use std::thread;

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};
use crate::io::{join_chars, Tokenizer};
use super::ngram_model::NGramModel;
use super::smoothing::Smoothing;
use super::state::State;
use super::vocabulary::{validate_token, Vocabulary, END_TOKEN, START_TOKEN, UNKNOWN_TOKEN};

/// Number of training chunks per CPU.
const CHUNK_FACTOR: usize = 8;

/// A smoothed conditional probability.
///
/// `sparse` is set when the highest-order count of the queried n-gram is zero,
/// i.e. the value comes from the smoothing fallback rather than from data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Estimate {
	pub probability: f64,
	pub sparse: bool,
}

/// What one language-model token stands for.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenUnit {
	#[default]
	Word,
	/// A single character, spaces between words included.
	Char,
}

impl TokenUnit {
	/// Splits raw text into tokens of this unit.
	pub fn split(self, tokenizer: &Tokenizer, text: &str) -> Vec<String> {
		match self {
			Self::Word => tokenizer.tokenize(text),
			Self::Char => tokenizer.tokenize_chars(text),
		}
	}

	/// Turns tokens of this unit back into text.
	pub fn join<S: AsRef<str>>(self, tokens: &[S]) -> String {
		match self {
			Self::Word => tokens.iter().map(|token| token.as_ref()).collect::<Vec<&str>>().join(" "),
			Self::Char => join_chars(tokens),
		}
	}
}

/// N-gram language model of order 2 or 3 over words or characters.
///
/// Holds count tables for every order from 1 up to `order` and combines them
/// with the configured `Smoothing`.
///
/// # Responsibilities
/// - Train count tables from tokenized sentences (in parallel)
/// - Answer `P(word | context)` and sentence log-likelihood queries
/// - Generate text by weighted random walk
///
/// # Invariants
/// - `order` is 2 or 3 and `ngrams[i]` has order `i + 1`
/// - `unit` only affects the raw-text helpers; token queries are unit agnostic
/// - Tokens outside the vocabulary are counted as `<unk>`
/// - The outcome space of every context is the vocabulary, `</s>` and `<unk>`,
///   and the smoothed probabilities over it sum to 1
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LanguageModel {
	order: usize,
	smoothing: Smoothing,
	unit: TokenUnit,
	vocabulary: Vocabulary,
	ngrams: Vec<NGramModel>,
}

impl LanguageModel {
	/// Trains a model from tokenized sentences.
	///
	/// # Parameters
	/// - `sentences`: Tokenized training sentences.
	/// - `vocabulary`: Closed vocabulary; other tokens are counted as `<unk>`.
	/// - `order`: 2 (bigram) or 3 (trigram).
	/// - `smoothing`: Estimator for sparse counts.
	///
	/// # Errors
	/// Returns `InvalidInput` for an unsupported order, invalid smoothing
	/// parameters, a corpus without tokens, or a malformed token.
	///
	/// # Behavior
	/// - Splits sentences into chunks (based on CPU cores * factor).
	/// - Builds partial count tables for each chunk on scoped threads.
	/// - Merges all partial tables as they arrive over a channel.
	pub fn train<S>(sentences: &[Vec<S>], vocabulary: Vocabulary, order: usize, smoothing: Smoothing) -> Result<Self>
	where
		S: AsRef<str> + Sync,
	{
		if !(2..=3).contains(&order) {
			return Err(SpellError::invalid_input(format!("n-gram order must be 2 or 3, got {order}")));
		}
		smoothing.validate()?;
		if sentences.iter().all(Vec::is_empty) {
			return Err(SpellError::invalid_input("training corpus is empty"));
		}
		for token in sentences.iter().flatten() {
			validate_token(token.as_ref())?;
		}

		let ngrams = Self::count_parallel(sentences, &vocabulary, order)?;
		info!(
			"trained {}-gram model on {} sentences ({} contexts)",
			order,
			sentences.len(),
			ngrams.iter().map(NGramModel::len).sum::<usize>()
		);

		Ok(Self { order, smoothing, unit: TokenUnit::Word, vocabulary, ngrams })
	}

	/// Trains a model from raw text, one sentence per line, split into
	/// `unit` tokens. Every token seen is part of the vocabulary.
	///
	/// # Errors
	/// Same as `train`; lines without any token are skipped.
	pub fn train_text<S: AsRef<str>>(lines: &[S], unit: TokenUnit, order: usize, smoothing: Smoothing) -> Result<Self> {
		let tokenizer = Tokenizer::new()?;
		let sentences: Vec<Vec<String>> = lines
			.iter()
			.map(|line| unit.split(&tokenizer, line.as_ref()))
			.filter(|sentence| !sentence.is_empty())
			.collect();
		if sentences.is_empty() {
			return Err(SpellError::invalid_input("training corpus is empty"));
		}

		let vocabulary = Vocabulary::from_sentences(&sentences)?;
		let mut model = Self::train(&sentences, vocabulary, order, smoothing)?;
		model.unit = unit;
		Ok(model)
	}

	fn count_parallel<S>(sentences: &[Vec<S>], vocabulary: &Vocabulary, order: usize) -> Result<Vec<NGramModel>>
	where
		S: AsRef<str> + Sync,
	{
		let template = (1..=order)
			.map(NGramModel::new)
			.collect::<Result<Vec<_>, String>>()
			.map_err(SpellError::InvalidInput)?;

		let chunks = num_cpus::get() * CHUNK_FACTOR;
		let chunk_size = sentences.len().div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for chunk in sentences.chunks(chunk_size) {
				let tx = tx.clone();
				let mut partial = template.clone();
				scope.spawn(move || {
					for sentence in chunk {
						let tokens: Vec<String> = sentence
							.iter()
							.map(|token| in_vocabulary(vocabulary, token.as_ref()))
							.collect();
						for table in partial.iter_mut() {
							table.add_sentence(&tokens);
						}
					}
					// The receiver is alive until every worker has finished
					let _ = tx.send(partial);
				});
			}
		});
		drop(tx);

		let mut tables = template;
		for partial in rx.iter() {
			for (table, part) in tables.iter_mut().zip(&partial) {
				table.merge(part).map_err(SpellError::InvalidInput)?;
			}
		}
		Ok(tables)
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn smoothing(&self) -> Smoothing {
		self.smoothing
	}

	pub fn unit(&self) -> TokenUnit {
		self.unit
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	/// Every token a context can predict: the vocabulary in lexicographic
	/// order, then `</s>` and `<unk>`.
	pub fn outcomes(&self) -> Vec<&str> {
		let mut outcomes = self.vocabulary.words();
		outcomes.push(END_TOKEN);
		outcomes.push(UNKNOWN_TOKEN);
		outcomes
	}

	/// Smoothed `P(word | context)`.
	///
	/// `context` holds the preceding words of the sentence, oldest first;
	/// only the last `order - 1` are used and missing ones are sentence-start
	/// padding. Unknown words are scored as `<unk>`.
	pub fn conditional_probability<S: AsRef<str>>(&self, word: &str, context: &[S]) -> f64 {
		self.conditional_estimate(word, context).probability
	}

	pub fn log_conditional_probability<S: AsRef<str>>(&self, word: &str, context: &[S]) -> f64 {
		self.conditional_probability(word, context).ln()
	}

	/// Same as `conditional_probability`, also reporting whether smoothing
	/// had to fill in for a missing count.
	pub fn conditional_estimate<S: AsRef<str>>(&self, word: &str, context: &[S]) -> Estimate {
		let word = self.outcome_token(word);
		let history = self.history(context);
		let top_count = self.level_state(self.order, &history).map_or(0, |state| state.count(word));

		let probability = match self.smoothing {
			Smoothing::Laplace { k } => self.laplace(word, &history, k),
			Smoothing::Interpolated { weights, k } => self.interpolated(word, &history, &weights, k),
			Smoothing::AbsoluteDiscount { discount, k } => self.discounted(word, &history, self.order, discount, k),
		};

		Estimate { probability, sparse: top_count == 0 }
	}

	/// Natural-log likelihood of a whole sentence, closing `</s>` included.
	///
	/// Each word is conditioned on up to `order - 1` preceding words.
	pub fn sequence_log_probability<S: AsRef<str>>(&self, words: &[S]) -> f64 {
		let mut history: Vec<&str> = Vec::with_capacity(words.len());
		let mut log_probability = 0.0;
		for word in words {
			log_probability += self.log_conditional_probability(word.as_ref(), &history);
			history.push(word.as_ref());
		}
		log_probability + self.log_conditional_probability(END_TOKEN, &history)
	}

	/// Likelihood of a whole sentence, see `sequence_log_probability`.
	pub fn sequence_probability<S: AsRef<str>>(&self, words: &[S]) -> f64 {
		self.sequence_log_probability(words).exp()
	}

	/// Generates up to `length` words following `seed`.
	///
	/// # Behavior
	/// - A seed of `length` words or more is truncated to `length`.
	/// - The next word is sampled from the highest-order context observed,
	///   falling back to shorter contexts down to bigrams.
	/// - Generation stops at `</s>` or when no context has a continuation.
	pub fn generate<S, R>(&self, seed: &[S], length: usize, rng: &mut R) -> Vec<String>
	where
		S: AsRef<str>,
		R: Rng + ?Sized,
	{
		let mut generated: Vec<String> = seed.iter().map(|token| token.as_ref().to_owned()).collect();
		if generated.len() >= length {
			generated.truncate(length);
			return generated;
		}

		while generated.len() < length {
			let history = self.history(&generated);
			let next = (2..=self.order)
				.rev()
				.filter_map(|n| self.level_state(n, &history))
				.find_map(|state| state.sample(rng));

			match next {
				Some(token) if token != END_TOKEN => generated.push(token.to_owned()),
				_ => break,
			}
		}
		generated
	}

	/// Natural-log likelihood of raw text, split with the model's unit.
	///
	/// Text without any token scores the probability of an empty sentence.
	pub fn evaluate_text(&self, text: &str) -> Result<f64> {
		let tokens = self.unit.split(&Tokenizer::new()?, text);
		Ok(self.sequence_log_probability(&tokens))
	}

	/// Generates text of up to `length` tokens continuing `seed`, see `generate`.
	pub fn generate_text<R: Rng + ?Sized>(&self, seed: &str, length: usize, rng: &mut R) -> Result<String> {
		let seed = self.unit.split(&Tokenizer::new()?, seed);
		Ok(self.unit.join(&self.generate(&seed, length, rng)))
	}

	/// Last `order - 1` context tokens, left-padded with `<s>`.
	fn history<S: AsRef<str>>(&self, context: &[S]) -> Vec<String> {
		let width = self.order - 1;
		let tail = &context[context.len().saturating_sub(width)..];

		let mut history = vec![START_TOKEN.to_owned(); width - tail.len()];
		history.extend(tail.iter().map(|token| match token.as_ref() {
			START_TOKEN => START_TOKEN.to_owned(),
			token => in_vocabulary(&self.vocabulary, token),
		}));
		history
	}

	fn outcome_token<'a>(&self, word: &'a str) -> &'a str {
		if word == END_TOKEN || self.vocabulary.contains(word) {
			word
		} else {
			UNKNOWN_TOKEN
		}
	}

	/// State of the order-`n` table for the matching suffix of `history`.
	fn level_state(&self, n: usize, history: &[String]) -> Option<&State> {
		self.ngrams[n - 1].state(&history[history.len() + 1 - n..])
	}

	fn outcome_count(&self) -> f64 {
		(self.vocabulary.len() + 2) as f64
	}

	/// Add-k unigram over the outcome space.
	fn unigram(&self, word: &str, k: f64) -> f64 {
		let (count, total) = self.level_state(1, &[])
			.map_or((0, 0), |state| (state.count(word), state.total()));
		(count as f64 + k) / (total as f64 + k * self.outcome_count())
	}

	fn laplace(&self, word: &str, history: &[String], k: f64) -> f64 {
		let (count, total) = self.level_state(self.order, history)
			.map_or((0, 0), |state| (state.count(word), state.total()));
		(count as f64 + k) / (total as f64 + k * self.outcome_count())
	}

	fn interpolated(&self, word: &str, history: &[String], weights: &[f64; 3], k: f64) -> f64 {
		let mut mass = weights[0] * self.unigram(word, k);
		let mut norm = weights[0];

		for n in 2..=self.order {
			if let Some(state) = self.level_state(n, history).filter(|state| state.total() > 0) {
				mass += weights[n - 1] * state.count(word) as f64 / state.total() as f64;
				norm += weights[n - 1];
			}
		}
		mass / norm
	}

	fn discounted(&self, word: &str, history: &[String], n: usize, discount: f64, k: f64) -> f64 {
		if n == 1 {
			return self.unigram(word, k);
		}

		let lower = self.discounted(word, history, n - 1, discount, k);
		match self.level_state(n, history).filter(|state| state.total() > 0) {
			Some(state) => {
				let total = state.total() as f64;
				let kept = (state.count(word) as f64 - discount).max(0.0) / total;
				let freed = discount * state.distinct() as f64 / total;
				kept + freed * lower
			}
			None => lower,
		}
	}
}

fn in_vocabulary(vocabulary: &Vocabulary, token: &str) -> String {
	if vocabulary.contains(token) {
		token.to_owned()
	} else {
		UNKNOWN_TOKEN.to_owned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::SPACE_TOKEN;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn corpus() -> Vec<Vec<&'static str>> {
		vec![
			vec!["the", "cat", "sat"],
			vec!["the", "cat", "sat", "on", "the", "mat"],
			vec!["a", "hat", "sat", "on", "the", "cat"],
			vec!["the", "dog", "ran"],
		]
	}

	fn train(order: usize, smoothing: Smoothing) -> LanguageModel {
		let corpus = corpus();
		let vocabulary = Vocabulary::from_sentences(&corpus).unwrap();
		LanguageModel::train(&corpus, vocabulary, order, smoothing).unwrap()
	}

	fn strategies() -> Vec<Smoothing> {
		vec![
			Smoothing::Laplace { k: 1.0 },
			Smoothing::Laplace { k: 0.01 },
			Smoothing::default(),
			Smoothing::Interpolated { weights: [1.0, 0.0, 0.0], k: 0.5 },
			Smoothing::AbsoluteDiscount { discount: 0.75, k: 0.5 },
			Smoothing::AbsoluteDiscount { discount: 1.0, k: 1.0 },
		]
	}

	fn contexts() -> Vec<Vec<&'static str>> {
		vec![
			vec![],
			vec!["the"],
			vec!["the", "cat"],
			vec!["cat", "sat"],
			vec!["sat", "the"],
			vec!["zebra", "qqq"],
			vec!["on", "the", "mat", "a"],
		]
	}

	#[test]
	fn test_invalid_training_input() {
		let corpus = corpus();
		let vocabulary = Vocabulary::from_sentences(&corpus).unwrap();
		assert!(LanguageModel::train(&corpus, vocabulary.clone(), 1, Smoothing::default()).is_err());
		assert!(LanguageModel::train(&corpus, vocabulary.clone(), 4, Smoothing::default()).is_err());
		assert!(LanguageModel::train(&corpus, vocabulary.clone(), 3, Smoothing::Laplace { k: -1.0 }).is_err());

		let empty: Vec<Vec<&str>> = vec![vec![], vec![]];
		assert!(LanguageModel::train(&empty, vocabulary.clone(), 3, Smoothing::default()).is_err());

		let malformed = vec![vec!["the", "</s>"]];
		assert!(LanguageModel::train(&malformed, vocabulary, 3, Smoothing::default()).is_err());
	}

	#[test]
	fn test_probabilities_are_strictly_positive() {
		for order in [2, 3] {
			for smoothing in strategies() {
				let model = train(order, smoothing);
				for context in contexts() {
					for word in model.outcomes() {
						let p = model.conditional_probability(word, &context);
						assert!(p > 0.0 && p <= 1.0, "{smoothing:?} {context:?} {word} -> {p}");
					}
				}
			}
		}
	}

	#[test]
	fn test_probability_mass_is_conserved() {
		for order in [2, 3] {
			for smoothing in strategies() {
				let model = train(order, smoothing);
				for context in contexts() {
					let sum: f64 = model.outcomes()
						.iter()
						.map(|word| model.conditional_probability(word, &context))
						.sum();
					assert!((sum - 1.0).abs() < 1e-9, "order {order} {smoothing:?} {context:?} sums to {sum}");
				}
			}
		}
	}

	#[test]
	fn test_unknown_words_share_the_unknown_slot() {
		let model = train(3, Smoothing::default());
		let context = ["the"];
		assert_eq!(
			model.conditional_probability("zebra", &context),
			model.conditional_probability(UNKNOWN_TOKEN, &context)
		);
	}

	#[test]
	fn test_sentence_start_is_part_of_the_context() {
		let model = train(3, Smoothing::default());
		let empty: [&str; 0] = [];
		assert_eq!(
			model.conditional_probability("the", &empty),
			model.conditional_probability("the", &[START_TOKEN, START_TOKEN])
		);
		// "the" opens three of the four sentences
		assert!(model.conditional_probability("the", &empty) > model.conditional_probability("cat", &empty));
	}

	#[test]
	fn test_laplace_values() {
		let model = train(2, Smoothing::Laplace { k: 1.0 });
		// vocabulary of 9 words + </s> + <unk>, "the" seen 5 times with "cat" following 3 times
		let expected = (3.0 + 1.0) / (5.0 + 11.0);
		assert!((model.conditional_probability("cat", &["the"]) - expected).abs() < 1e-12);
	}

	#[test]
	fn test_sparse_estimates_are_flagged() {
		let model = train(3, Smoothing::default());
		let seen = model.conditional_estimate("sat", &["the", "cat"]);
		assert!(!seen.sparse);
		let unseen = model.conditional_estimate("dog", &["the", "cat"]);
		assert!(unseen.sparse);
		assert!(unseen.probability > 0.0);
		assert!(seen.probability > unseen.probability);
	}

	#[test]
	fn test_sequence_probability() {
		let model = train(3, Smoothing::default());
		let fluent = model.sequence_log_probability(&["the", "cat", "sat"]);
		let scrambled = model.sequence_log_probability(&["sat", "the", "cat"]);
		assert!(fluent > scrambled);

		let manual = model.log_conditional_probability("the", &[] as &[&str])
			+ model.log_conditional_probability("cat", &["the"])
			+ model.log_conditional_probability("sat", &["the", "cat"])
			+ model.log_conditional_probability(END_TOKEN, &["cat", "sat"]);
		assert!((fluent - manual).abs() < 1e-12);
		assert!((model.sequence_probability(&["the", "cat", "sat"]) - fluent.exp()).abs() < 1e-15);
	}

	#[test]
	fn test_out_of_vocabulary_training_tokens() {
		let corpus = corpus();
		let counts = std::collections::HashMap::from([("the".to_owned(), 1), ("cat".to_owned(), 1)]);
		let vocabulary = Vocabulary::new(counts).unwrap();
		let model = LanguageModel::train(&corpus, vocabulary, 2, Smoothing::Laplace { k: 1.0 }).unwrap();
		assert_eq!(model.outcomes(), vec!["cat", "the", END_TOKEN, UNKNOWN_TOKEN]);
		assert!(model.conditional_probability("sat", &["cat"]) > model.conditional_probability("the", &["cat"]));
	}

	#[test]
	fn test_generate() {
		let corpus = vec![vec!["the", "cat", "sat"]];
		let vocabulary = Vocabulary::from_sentences(&corpus).unwrap();
		let model = LanguageModel::train(&corpus, vocabulary, 3, Smoothing::default()).unwrap();
		let mut rng = StdRng::seed_from_u64(42);

		let empty: [&str; 0] = [];
		assert_eq!(model.generate(&empty, 10, &mut rng), vec!["the", "cat", "sat"]);
		assert_eq!(model.generate(&["the"], 2, &mut rng), vec!["the", "cat"]);
		assert_eq!(model.generate(&["a", "b", "c"], 2, &mut rng), vec!["a", "b"]);
		// Unknown history backs off to the bigram "cat" -> "sat"
		assert_eq!(model.generate(&["dog", "cat"], 5, &mut rng), vec!["dog", "cat", "sat"]);
	}

	#[test]
	fn test_character_model() {
		let lines = ["the cat sat", "the hat sat", "a cat"];
		let model = LanguageModel::train_text(&lines, TokenUnit::Char, 3, Smoothing::default()).unwrap();
		assert_eq!(model.unit(), TokenUnit::Char);
		assert!(model.vocabulary().contains("c"));
		assert!(model.vocabulary().contains(SPACE_TOKEN));
		assert!(!model.vocabulary().contains("cat"));

		assert!(model.conditional_probability("t", &["c", "a"]) > model.conditional_probability("h", &["c", "a"]));
		assert!(model.evaluate_text("the cat").unwrap() > model.evaluate_text("eht tac").unwrap());

		let mut rng = StdRng::seed_from_u64(3);
		assert_eq!(model.generate_text("the cat sat", 7, &mut rng).unwrap(), "the cat");
		let generated = model.generate_text("th", 40, &mut rng).unwrap();
		assert!(generated.starts_with("th"));
		assert!(generated.chars().count() <= 40);
		assert!(generated.chars().all(|c| c == ' ' || "thecasa".contains(c)));
	}

	#[test]
	fn test_word_text_helpers() {
		let lines = ["The cat sat.", "", "The hat sat!"];
		let model = LanguageModel::train_text(&lines, TokenUnit::Word, 2, Smoothing::default()).unwrap();
		assert_eq!(model.unit(), TokenUnit::Word);
		assert_eq!(model.vocabulary().words(), vec!["cat", "hat", "sat", "the"]);
		assert_eq!(model.evaluate_text("The cat sat").unwrap(), model.sequence_log_probability(&["the", "cat", "sat"]));

		let mut rng = StdRng::seed_from_u64(5);
		assert_eq!(model.generate_text("the cat sat", 2, &mut rng).unwrap(), "the cat");
		assert!(LanguageModel::train_text(&["", "42"], TokenUnit::Char, 2, Smoothing::default()).is_err());
	}

	#[test]
	fn test_generate_is_reproducible() {
		let model = train(3, Smoothing::default());
		let empty: [&str; 0] = [];
		let a = model.generate(&empty, 20, &mut StdRng::seed_from_u64(1));
		let b = model.generate(&empty, 20, &mut StdRng::seed_from_u64(1));
		assert_eq!(a, b);
	}
}
