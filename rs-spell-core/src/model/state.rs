use std::collections::BTreeMap;

use rand::Rng;

use serde::{Deserialize, Serialize};


/// Represents a context in an n-gram model.
///
/// A `State` corresponds to a fixed (n-1)-token context (`key`) and stores
/// every observed continuation of this context with its count.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate continuation counts during training
/// - Expose the counts needed by the smoothing estimators
/// - Sample the next token using weighted random sampling
/// - Merge with another state having the same key (parallel training support)
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - Each transition count is strictly positive
/// - `total` is the sum of all transition counts
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct State {
	/// Context of the state (n-1 tokens, empty for unigrams).
	key: Vec<String>,
	/// Continuations indexed by the next token.
	/// Ordered so that sampling with a seeded generator is reproducible.
	/// Example: { "cat" => 42, "hat" => 3 }
	transitions: BTreeMap<String, u64>,
	/// Number of times the context was observed.
	total: u64,
}

impl State {
	/// Creates a new empty state for the given context.
	pub fn new(key: &[String]) -> Self {
		Self {
			key: key.to_vec(),
			transitions: BTreeMap::new(),
			total: 0,
		}
	}

	/// Records an occurrence of `next` after this context.
	pub fn add_transition(&mut self, next: &str) {
		*self.transitions.entry(next.to_owned()).or_insert(0) += 1;
		self.total += 1;
	}

	pub fn key(&self) -> &[String] {
		&self.key
	}

	/// Number of times `next` followed this context.
	pub fn count(&self, next: &str) -> u64 {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Number of times this context was observed.
	pub fn total(&self) -> u64 {
		self.total
	}

	/// Number of distinct continuations.
	pub fn distinct(&self) -> usize {
		self.transitions.len()
	}

	/// Iterates over `(next, count)` in token order.
	pub fn transitions(&self) -> impl Iterator<Item = (&str, u64)> {
		self.transitions.iter().map(|(next, count)| (next.as_str(), *count))
	}

	/// Samples the next token using weighted random sampling.
	///
	/// The probability of selecting a token is proportional to its count.
	/// Returns `None` if the state has no transitions.
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
		if self.total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..self.total);
		for (next, count) in &self.transitions {
			if r < *count {
				return Some(next);
			}
			r -= count;
		}

		// Unreachable while `total` matches the transitions
		self.transitions.keys().next_back().map(String::as_str)
	}

	/// Merges another state into this one.
	///
	/// Both states must represent the same context (`key`).
	/// Transition counts are summed.
	///
	/// # Errors
	/// Returns an error if the state keys do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), String> {
		if self.key != other.key {
			return Err(format!("Key mismatch: {:?} vs {:?}", self.key, other.key));
		}

		for (next, count) in &other.transitions {
			*self.transitions.entry(next.clone()).or_insert(0) += *count;
		}
		self.total += other.total;

		Ok(())
	}
}
