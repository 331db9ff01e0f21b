//! Noisy-channel spelling correction library.
//!
//! This crate provides a statistical spelling corrector including:
//! - Word n-gram language models with pluggable smoothing
//! - An error model learned from misspelling/correction pairs
//! - Bounded candidate generation over elementary edits
//! - Sentence correction with left-to-right context propagation
//! - Binary persistence of trained models
//!
//! Trained models are immutable and shared by reference, so one model can
//! serve any number of concurrent correction requests.

/// Error type and result alias.
pub mod error;

/// Spelling models and correction logic.
pub mod model;

/// I/O utilities (corpus and dictionary loading, tokenizing, path helpers).
pub mod io;

pub use error::{Result, SpellError};
pub use model::corrector::{Candidate, CorrectionResult, CorrectionStatus, NoisyChannelCorrector};
pub use model::corrector_config::CorrectorConfig;
pub use model::spell_model::{ModelConfig, SpellModel};
