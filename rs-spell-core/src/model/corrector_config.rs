use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};

/// Largest supported candidate search radius.
pub const MAX_EDIT_DISTANCE: usize = 3;

/// Parameters of a correction request.
///
/// # Responsibilities
/// - Bound the candidate search (`max_edit_distance`)
/// - Decide how close the original word must score to be kept (`tolerance`)
/// - Limit the candidates reported per word (`top_k`)
/// - Toggle real-word checking of in-vocabulary words (`check_real_words`)
///
/// # Invariants
/// - `max_edit_distance <= MAX_EDIT_DISTANCE`
/// - `tolerance` is finite and non-negative
/// - `top_k >= 1`
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct CorrectorConfig {
	max_edit_distance: usize,

	/// Log-score margin within which the original word is kept.
	tolerance: f64,

	top_k: usize,

	/// When false, known words are accepted without looking for competitors.
	pub check_real_words: bool,
}

impl Default for CorrectorConfig {
	fn default() -> Self {
		Self { max_edit_distance: 2, tolerance: 1e-9, top_k: 5, check_real_words: true }
	}
}

impl CorrectorConfig {
	pub fn max_edit_distance(&self) -> usize {
		self.max_edit_distance
	}

	pub fn tolerance(&self) -> f64 {
		self.tolerance
	}

	pub fn top_k(&self) -> usize {
		self.top_k
	}

	/// Sets the candidate search radius (0..=MAX_EDIT_DISTANCE).
	///
	/// # Errors
	/// Returns an error if the value is above `MAX_EDIT_DISTANCE`.
	pub fn set_max_edit_distance(&mut self, max_edit_distance: usize) -> Result<()> {
		if max_edit_distance > MAX_EDIT_DISTANCE {
			return Err(SpellError::invalid_input(format!(
				"max edit distance must be at most {MAX_EDIT_DISTANCE}, got {max_edit_distance}"
			)));
		}
		self.max_edit_distance = max_edit_distance;
		Ok(())
	}

	/// Sets the keep-original margin, in natural-log units.
	///
	/// # Errors
	/// Returns an error if the value is negative or not finite.
	pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
		if !tolerance.is_finite() || tolerance < 0.0 {
			return Err(SpellError::invalid_input(format!("tolerance must be finite and >= 0, got {tolerance}")));
		}
		self.tolerance = tolerance;
		Ok(())
	}

	/// Sets how many ranked candidates are reported per word.
	///
	/// # Errors
	/// Returns an error if the value is zero.
	pub fn set_top_k(&mut self, top_k: usize) -> Result<()> {
		if top_k == 0 {
			return Err(SpellError::invalid_input("top_k must be at least 1"));
		}
		self.top_k = top_k;
		Ok(())
	}

	/// Checks a configuration built without the setters (e.g. deserialized).
	pub fn validate(&self) -> Result<()> {
		let mut checked = Self::default();
		checked.set_max_edit_distance(self.max_edit_distance)?;
		checked.set_tolerance(self.tolerance)?;
		checked.set_top_k(self.top_k)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = CorrectorConfig::default();
		assert_eq!(config.max_edit_distance(), 2);
		assert_eq!(config.top_k(), 5);
		assert!(config.check_real_words);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_setters_reject_invalid_values() {
		let mut config = CorrectorConfig::default();
		assert!(config.set_max_edit_distance(MAX_EDIT_DISTANCE + 1).is_err());
		assert!(config.set_tolerance(-0.5).is_err());
		assert!(config.set_tolerance(f64::NAN).is_err());
		assert!(config.set_top_k(0).is_err());
		assert_eq!(config, CorrectorConfig::default());

		config.set_max_edit_distance(1).unwrap();
		config.set_tolerance(0.25).unwrap();
		config.set_top_k(3).unwrap();
		assert_eq!(config.max_edit_distance(), 1);
		assert_eq!(config.tolerance(), 0.25);
		assert_eq!(config.top_k(), 3);
	}

	#[test]
	fn test_validate_deserialized() {
		let config: CorrectorConfig = postcard::from_bytes(&postcard::to_stdvec(&CorrectorConfig::default()).unwrap()).unwrap();
		assert!(config.validate().is_ok());

		let broken = CorrectorConfig { top_k: 0, ..CorrectorConfig::default() };
		assert!(broken.validate().is_err());
	}
}
