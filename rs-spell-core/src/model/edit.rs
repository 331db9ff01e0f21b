use serde::{Deserialize, Serialize};

/// Marker used as the preceding character at the start of a word.
pub const WORD_START: char = '#';

/// The four elementary spelling operations.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditKind {
	Insertion,
	Deletion,
	Substitution,
	Transposition,
}

impl EditKind {
	pub const ALL: [EditKind; 4] = [Self::Insertion, Self::Deletion, Self::Substitution, Self::Transposition];
}

/// One elementary edit turning the intended word into the observed one.
///
/// `pair` follows the confusion-matrix conventions:
/// - `Insertion`: (preceding intended char, inserted char), "x typed as xy"
/// - `Deletion`: (preceding intended char, deleted char), "xy typed as x"
/// - `Substitution`: (intended char, observed char), "x typed as y"
/// - `Transposition`: (first, second intended char), "xy typed as yx"
///
/// The preceding char is `WORD_START` at the beginning of the word.
/// `position` is the char index in the intended word where the edit applies.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edit {
	pub kind: EditKind,
	pub pair: (char, char),
	pub position: usize,
}

/// A minimal edit path between two words.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
	/// Number of edits (restricted Damerau-Levenshtein distance).
	pub distance: usize,
	/// Sum of the edit weights along the path.
	pub weight: f64,
	/// Edits in intended-word order.
	pub edits: Vec<Edit>,
}

#[derive(Clone, Copy)]
enum Move {
	Start,
	Delete,
	Insert,
	Diagonal,
	Transpose,
}

/// Aligns `intended` with `observed` using the fewest elementary edits.
///
/// Among all minimal paths, the one with the highest total `weight` is kept
/// (weights are typically log-probabilities). Remaining ties go to the first
/// move in the order deletion, insertion, match/substitution, transposition.
///
/// Returns `None` when more than `max_distance` edits are needed.
pub fn align<F>(intended: &[char], observed: &[char], max_distance: usize, weight: F) -> Option<Alignment>
where
	F: Fn(&Edit) -> f64,
{
	let (n, m) = (intended.len(), observed.len());
	if n.abs_diff(m) > max_distance {
		return None;
	}

	let mut cost = vec![vec![usize::MAX; m + 1]; n + 1];
	let mut best = vec![vec![f64::NEG_INFINITY; m + 1]; n + 1];
	let mut moves = vec![vec![Move::Start; m + 1]; n + 1];
	cost[0][0] = 0;
	best[0][0] = 0.0;

	for i in 0..=n {
		let mut row_min = if i == 0 { 0 } else { usize::MAX };
		for j in 0..=m {
			if i == 0 && j == 0 {
				continue;
			}

			// (move, predecessor, edit)
			let mut options: Vec<(Move, (usize, usize), Option<Edit>)> = Vec::with_capacity(4);
			if i > 0 {
				options.push((Move::Delete, (i - 1, j), Some(Edit {
					kind: EditKind::Deletion,
					pair: (preceding(intended, i - 1), intended[i - 1]),
					position: i - 1,
				})));
			}
			if j > 0 {
				options.push((Move::Insert, (i, j - 1), Some(Edit {
					kind: EditKind::Insertion,
					pair: (preceding(intended, i), observed[j - 1]),
					position: i,
				})));
			}
			if i > 0 && j > 0 {
				let edit = (intended[i - 1] != observed[j - 1]).then_some(Edit {
					kind: EditKind::Substitution,
					pair: (intended[i - 1], observed[j - 1]),
					position: i - 1,
				});
				options.push((Move::Diagonal, (i - 1, j - 1), edit));
			}
			if i > 1 && j > 1
				&& intended[i - 1] != intended[i - 2]
				&& intended[i - 1] == observed[j - 2]
				&& intended[i - 2] == observed[j - 1]
			{
				options.push((Move::Transpose, (i - 2, j - 2), Some(Edit {
					kind: EditKind::Transposition,
					pair: (intended[i - 2], intended[i - 1]),
					position: i - 2,
				})));
			}

			let step = |edit: &Option<Edit>| usize::from(edit.is_some());
			let minimum = options
				.iter()
				.filter(|(_, (pi, pj), _)| cost[*pi][*pj] != usize::MAX)
				.map(|(_, (pi, pj), edit)| cost[*pi][*pj] + step(edit))
				.min()
				.unwrap_or(usize::MAX);
			if minimum == usize::MAX {
				continue;
			}

			for (mv, (pi, pj), edit) in &options {
				if cost[*pi][*pj] == usize::MAX || cost[*pi][*pj] + step(edit) != minimum {
					continue;
				}
				let candidate = best[*pi][*pj] + edit.as_ref().map_or(0.0, &weight);
				if candidate > best[i][j] {
					best[i][j] = candidate;
					moves[i][j] = *mv;
				}
			}
			cost[i][j] = minimum;
			row_min = row_min.min(minimum);
		}

		// Costs never decrease along a path: once a whole row is over the bound, so is the result
		if row_min > max_distance {
			return None;
		}
	}

	let distance = cost[n][m];
	if distance > max_distance {
		return None;
	}

	Some(Alignment { distance, weight: best[n][m], edits: backtrack(intended, observed, &moves) })
}

/// Restricted Damerau-Levenshtein distance between two words.
pub fn distance(intended: &str, observed: &str) -> usize {
	let intended: Vec<char> = intended.chars().collect();
	let observed: Vec<char> = observed.chars().collect();
	align(&intended, &observed, usize::MAX, |_| 0.0).map_or(usize::MAX, |alignment| alignment.distance)
}

fn preceding(word: &[char], index: usize) -> char {
	if index == 0 { WORD_START } else { word[index - 1] }
}

fn backtrack(intended: &[char], observed: &[char], moves: &[Vec<Move>]) -> Vec<Edit> {
	let (mut i, mut j) = (intended.len(), observed.len());
	let mut edits = Vec::new();

	loop {
		match moves[i][j] {
			Move::Start => break,
			Move::Delete => {
				edits.push(Edit {
					kind: EditKind::Deletion,
					pair: (preceding(intended, i - 1), intended[i - 1]),
					position: i - 1,
				});
				i -= 1;
			}
			Move::Insert => {
				edits.push(Edit {
					kind: EditKind::Insertion,
					pair: (preceding(intended, i), observed[j - 1]),
					position: i,
				});
				j -= 1;
			}
			Move::Diagonal => {
				if intended[i - 1] != observed[j - 1] {
					edits.push(Edit {
						kind: EditKind::Substitution,
						pair: (intended[i - 1], observed[j - 1]),
						position: i - 1,
					});
				}
				i -= 1;
				j -= 1;
			}
			Move::Transpose => {
				edits.push(Edit {
					kind: EditKind::Transposition,
					pair: (intended[i - 2], intended[i - 1]),
					position: i - 2,
				});
				i -= 2;
				j -= 2;
			}
		}
	}

	edits.reverse();
	edits
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chars(s: &str) -> Vec<char> {
		s.chars().collect()
	}

	fn edits(intended: &str, observed: &str) -> Vec<Edit> {
		align(&chars(intended), &chars(observed), 2, |_| 0.0).unwrap().edits
	}

	#[test]
	fn test_distance() {
		assert_eq!(distance("sat", "sat"), 0);
		assert_eq!(distance("sat", "sqt"), 1);
		assert_eq!(distance("the", "teh"), 1);
		assert_eq!(distance("cat", "at"), 1);
		assert_eq!(distance("cat", "cart"), 1);
		assert_eq!(distance("cat", "sqt"), 2);
		assert_eq!(distance("the", "sqt"), 3);
		assert_eq!(distance("", "abc"), 3);
		assert_eq!(distance("héllo", "hello"), 1);
	}

	#[test]
	fn test_bound() {
		assert!(align(&chars("the"), &chars("sqt"), 2, |_| 0.0).is_none());
		assert!(align(&chars("a"), &chars("abcd"), 2, |_| 0.0).is_none());
		assert!(align(&chars("the"), &chars("sqt"), 3, |_| 0.0).is_some());
	}

	#[test]
	fn test_single_edits() {
		assert_eq!(edits("sat", "sqt"), vec![Edit { kind: EditKind::Substitution, pair: ('a', 'q'), position: 1 }]);
		assert_eq!(edits("the", "teh"), vec![Edit { kind: EditKind::Transposition, pair: ('h', 'e'), position: 1 }]);
		assert_eq!(edits("cat", "at"), vec![Edit { kind: EditKind::Deletion, pair: (WORD_START, 'c'), position: 0 }]);
		assert_eq!(edits("cat", "cart"), vec![Edit { kind: EditKind::Insertion, pair: ('a', 'r'), position: 2 }]);
		assert!(edits("cat", "cat").is_empty());
	}

	#[test]
	fn test_best_minimal_path_wins() {
		// "aa" -> "a": deleting either 'a' costs one edit
		let intended = chars("aa");
		let observed = chars("a");
		let first = align(&intended, &observed, 1, |_| 0.0).unwrap();
		assert_eq!(first.distance, 1);

		let prefer_word_start = |edit: &Edit| if edit.pair.0 == WORD_START { -1.0 } else { -5.0 };
		let path = align(&intended, &observed, 1, prefer_word_start).unwrap();
		assert_eq!(path.edits, vec![Edit { kind: EditKind::Deletion, pair: (WORD_START, 'a'), position: 0 }]);
		assert_eq!(path.weight, -1.0);

		let prefer_inner = |edit: &Edit| if edit.pair.0 == WORD_START { -5.0 } else { -1.0 };
		let path = align(&intended, &observed, 1, prefer_inner).unwrap();
		assert_eq!(path.edits, vec![Edit { kind: EditKind::Deletion, pair: ('a', 'a'), position: 1 }]);
	}

	#[test]
	fn test_non_minimal_paths_are_ignored() {
		// Two substitutions would be cheaper by weight but cost more than one transposition
		let weight = |edit: &Edit| match edit.kind {
			EditKind::Transposition => -100.0,
			_ => -0.1,
		};
		let path = align(&chars("ab"), &chars("ba"), 2, weight).unwrap();
		assert_eq!(path.distance, 1);
		assert_eq!(path.edits.len(), 1);
		assert_eq!(path.edits[0].kind, EditKind::Transposition);
	}
}
