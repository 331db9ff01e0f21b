use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = SpellError> = std::result::Result<T, E>;

/// Errors raised while building, loading or querying spelling models.
///
/// Only construction-time faults are errors. Per-word outcomes such as an
/// uncorrectable word or a pair the error model cannot relate are reported
/// as values (`CorrectionStatus::Uncorrectable`, `None`), never through this type.
#[derive(Debug, Error)]
pub enum SpellError {
	/// Empty vocabulary, empty corpus, malformed tokens or invalid parameters.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Binary model state could not be encoded or decoded.
	#[error("serialization error: {0}")]
	Serialization(#[from] postcard::Error),

	#[error("regex error: {0}")]
	Regex(#[from] regex::Error),
}

impl SpellError {
	pub(crate) fn invalid_input<S: Into<String>>(msg: S) -> Self {
		Self::InvalidInput(msg.into())
	}
}
