// config.rs
//
// Tunable thresholds for the attribution stages. Every threshold is
// overridable per call by passing a non-default config.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Thresholds for flagging simultaneous multi-speaker speech on a word.
///
/// A word is flagged as overlap when the second-best speaker's overlap is
/// significant both relative to the word duration and relative to the best
/// speaker's overlap. Requiring both suppresses false flags near clean
/// transitions where a second interval barely touches the word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapConfig {
    /// Second-best overlap must be at least this fraction of the word duration
    pub min_word_fraction: Decimal,
    /// Second-best overlap must be at least this fraction of the best overlap
    pub min_best_fraction: Decimal,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            min_word_fraction: dec!(0.30),
            min_best_fraction: dec!(0.50),
        }
    }
}

/// Configuration for embedding-based boundary refinement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Window around each speaker transition (seconds) within which words
    /// are considered refinement candidates
    pub window_secs: f64,
    /// Words shorter than this (seconds) carry too little audio to embed
    pub min_word_duration: f64,
    /// Minimum cosine-similarity improvement required to reassign a word
    pub reassignment_margin: f32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            window_secs: 2.0,
            min_word_duration: 0.1,
            reassignment_margin: 0.05,
        }
    }
}

/// Configuration for cluster-to-name speaker identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyConfig {
    /// Minimum cosine similarity for accepting a cluster-to-name match
    pub match_threshold: f32,
    /// Diarization segments shorter than this (seconds) are skipped when
    /// building cluster embeddings
    pub min_segment_secs: Decimal,
    /// Embedded span per segment is capped at this length (seconds)
    pub max_segment_secs: Decimal,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.70,
            min_segment_secs: dec!(0.5),
            max_segment_secs: dec!(30),
        }
    }
}
