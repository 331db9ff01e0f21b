use super::state::State;
use super::vocabulary::{END_TOKEN, START_TOKEN};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Count tables of a fixed-order word n-gram model.
///
/// The `NGramModel` stores one state per observed context of length `n-1`
/// and the number of times each token followed it.
///
/// # Responsibilities
/// - Break padded sentences into n-grams and accumulate counts
/// - Look up the state of a context
/// - Merge with another n-gram model of the same order `n`
///
/// # Invariants
/// - `n` is always >= 1 (order 1 has a single, empty context)
/// - Each state in `states` corresponds to a unique context of length `n-1`
/// - All state transitions have counts >= 1
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NGramModel {
	/// The order of the model (number of tokens in the n-gram)
	n: usize, // must be >= 1

	/// Mapping from a context (length n-1) to its corresponding state
	states: HashMap<Vec<String>, State>,
}

impl NGramModel {
	/// Creates a new n-gram model of order `n`.
	///
	/// # Errors
	/// Returns an error if `n < 1`.
	pub fn new(n: usize) -> Result<Self, String> {
		if n < 1 {
			return Err("n must be >= 1".to_owned());
		}
		Ok(Self { n, states: HashMap::new() })
	}

	pub fn order(&self) -> usize {
		self.n
	}

	/// Number of distinct contexts.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Adds a tokenized sentence to the model.
	///
	/// The sentence is padded with `n-1` start tokens and closed with the end
	/// token, so every real token and the end of the sentence are counted once.
	///
	/// # Notes
	/// - Tokens are expected to be already mapped onto the vocabulary.
	/// - Empty sentences are ignored.
	pub fn add_sentence(&mut self, tokens: &[String]) {
		if tokens.is_empty() {
			return;
		}

		let padded = pad(tokens, self.n);
		for window in padded.windows(self.n) {
			let (context, next) = window.split_at(self.n - 1);
			let state = self.states.entry(context.to_vec()).or_insert_with(|| State::new(context));
			state.add_transition(&next[0]);
		}
	}

	/// Returns the state of `context`, `None` if it was never observed.
	///
	/// `context` must hold exactly `n-1` tokens.
	pub fn state(&self, context: &[String]) -> Option<&State> {
		debug_assert_eq!(context.len(), self.n - 1);
		self.states.get(context)
	}

	/// Merges another n-gram model into this one.
	///
	/// # Notes
	/// - Both models must have the same order `n`.
	/// - Counts for matching states and transitions are summed.
	///
	/// # Errors
	/// Returns an error if the model orders do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.n != other.n {
			return Err("N mismatch".to_owned());
		}

		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state)?;
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}

		Ok(())
	}
}

/// Prefixes `n-1` start tokens and appends the end token.
fn pad(tokens: &[String], n: usize) -> Vec<String> {
	let mut padded = Vec::with_capacity(tokens.len() + n);
	padded.extend(std::iter::repeat_n(START_TOKEN.to_owned(), n - 1));
	padded.extend_from_slice(tokens);
	padded.push(END_TOKEN.to_owned());
	padded
}
