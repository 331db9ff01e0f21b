//! Top-level module for the noisy-channel spelling corrector.
//!
//! This module provides, from the leaves up:
//! - The closed set of known words (`Vocabulary`)
//! - Word n-gram count tables (`NGramModel`, `State`) and the smoothed
//!   `LanguageModel` built on them
//! - Edit alignment, confusion matrices and the `ErrorModel`
//! - Bounded candidate search (`CandidateGenerator`)
//! - The `NoisyChannelCorrector` and the persisted `SpellModel`

/// Known words with unigram counts and add-k probabilities.
pub mod vocabulary;

/// Internal representation of a single n-gram context.
///
/// Tracks outgoing transitions and supports weighted random sampling.
pub mod state;

/// Fixed-order word n-gram count table (`n >= 1`).
///
/// Handles sentence padding, transition counting and merging.
pub mod ngram_model;

/// Estimators turning sparse counts into probabilities.
pub mod smoothing;

/// Smoothed bigram/trigram language model.
pub mod language_model;

/// Elementary edits and the optimal string alignment.
pub mod edit;

/// Per-edit-kind error counts and their normalizing character statistics.
pub mod confusion_matrix;

/// Channel model: `P(observed | intended)`.
pub mod error_model;

/// Vocabulary words within a bounded edit distance.
pub mod candidate_generator;

/// Validated correction parameters.
pub mod corrector_config;

/// Left-to-right noisy-channel correction of sentences.
pub mod corrector;

/// Trained language and error models bundled for persistence and sharing.
///
/// Supports loading from a binary cache, or training from corpus files.
pub mod spell_model;
