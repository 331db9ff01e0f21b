use serde::{Deserialize, Serialize};

use crate::error::{Result, SpellError};

/// Estimator used by the language model for unseen or rare n-grams.
///
/// Every variant assigns a strictly positive probability to each outcome
/// (vocabulary words, the end token and the out-of-vocabulary symbol), and the
/// probabilities of one context sum to 1.
///
/// # Variants
/// - `Laplace`: add-k on the highest order only. Unseen contexts are uniform.
/// - `Interpolated`: linear interpolation of the maximum-likelihood estimates of
///   every order with an add-k unigram. `weights` are `[unigram, bigram, trigram]`;
///   the weight of an unseen context is redistributed to the remaining levels.
/// - `AbsoluteDiscount`: subtracts `discount` from every observed count and
///   hands the freed mass to the next lower order, down to an add-k unigram.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum Smoothing {
	Laplace { k: f64 },
	Interpolated { weights: [f64; 3], k: f64 },
	AbsoluteDiscount { discount: f64, k: f64 },
}

impl Default for Smoothing {
	fn default() -> Self {
		Self::Interpolated { weights: [0.1, 0.3, 0.6], k: 0.5 }
	}
}

impl Smoothing {
	/// Checks the parameters of the estimator.
	///
	/// # Errors
	/// Returns `InvalidInput` if a pseudo count is not strictly positive, a
	/// weight is negative, the unigram weight is zero, or the discount is
	/// outside `(0, 1]`.
	pub fn validate(&self) -> Result<()> {
		let k = match *self {
			Self::Laplace { k } => k,
			Self::Interpolated { weights, k } => {
				if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
					return Err(SpellError::invalid_input(format!("interpolation weights must be >= 0, got {weights:?}")));
				}
				if weights[0] <= 0.0 {
					return Err(SpellError::invalid_input("unigram interpolation weight must be > 0"));
				}
				k
			}
			Self::AbsoluteDiscount { discount, k } => {
				if !(discount > 0.0 && discount <= 1.0) {
					return Err(SpellError::invalid_input(format!("discount must be in (0, 1], got {discount}")));
				}
				k
			}
		};

		if !(k.is_finite() && k > 0.0) {
			return Err(SpellError::invalid_input(format!("pseudo count must be > 0, got {k}")));
		}
		Ok(())
	}

	/// Pseudo count of the lowest level.
	pub fn k(&self) -> f64 {
		match *self {
			Self::Laplace { k } | Self::Interpolated { k, .. } | Self::AbsoluteDiscount { k, .. } => k,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_is_valid() {
		assert!(Smoothing::default().validate().is_ok());
	}

	#[test]
	fn test_invalid_parameters() {
		assert!(Smoothing::Laplace { k: 0.0 }.validate().is_err());
		assert!(Smoothing::Laplace { k: f64::INFINITY }.validate().is_err());
		assert!(Smoothing::Interpolated { weights: [0.0, 0.5, 0.5], k: 1.0 }.validate().is_err());
		assert!(Smoothing::Interpolated { weights: [0.5, -0.1, 0.6], k: 1.0 }.validate().is_err());
		assert!(Smoothing::AbsoluteDiscount { discount: 0.0, k: 1.0 }.validate().is_err());
		assert!(Smoothing::AbsoluteDiscount { discount: 1.5, k: 1.0 }.validate().is_err());
		assert!(Smoothing::AbsoluteDiscount { discount: 0.75, k: 1.0 }.validate().is_ok());
	}
}
